use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Pipeline tuning knobs. Defaults follow the reference deployment; none of
/// them are load-bearing constants and every deployment may override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
    /// Number of chunks to retrieve per query.
    pub top_k: usize,
    /// Rewrite the user's statement into an explicit question first.
    pub formulate_question: bool,
    /// Add a one-sentence conversational summary after parsing.
    pub conversational_summary: bool,
    /// Confidence scores below this attach a warning to the report.
    pub confidence_threshold: Option<f64>,
    /// Directory for persisted indexes, keyed by document fingerprint.
    /// Unset means every request rebuilds its index in memory.
    pub persist_dir: Option<PathBuf>,
    pub schema: PromptSchema,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            top_k: 5,
            formulate_question: true,
            conversational_summary: true,
            confidence_threshold: None,
            persist_dir: None,
            schema: PromptSchema::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(Error::Configuration("top_k must be positive".to_string()));
        }
        self.schema.validate()
    }
}

/// One field the model is instructed to emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl SchemaField {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
        }
    }
}

/// The answer contract handed to the model, as one enumerable field list.
/// Field order is the order used when reporting a missing required field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSchema {
    pub fields: Vec<SchemaField>,
}

impl Default for PromptSchema {
    fn default() -> Self {
        Self {
            fields: vec![
                SchemaField::required(
                    "decision",
                    "A clear 'yes', 'no' or 'partially' based on the context.",
                ),
                SchemaField::required(
                    "amount",
                    "The coverage amount if specified, otherwise 'Not Specified'.",
                ),
                SchemaField::required(
                    "justification",
                    "A concise explanation for the decision, quoting directly from the context.",
                ),
                SchemaField::required(
                    "source_clause",
                    "The specific clause or section number from the context that supports the decision.",
                ),
                SchemaField::optional(
                    "confidence_score",
                    "A number between 0 and 1 expressing how certain the answer is.",
                ),
            ],
        }
    }
}

impl PromptSchema {
    /// Required field names in declared order.
    pub fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Renders the schema as the JSON object sketch embedded in the prompt.
    pub fn render(&self) -> String {
        let body = self
            .fields
            .iter()
            .map(|f| format!("\"{}\": \"{}\"", f.name, f.description))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{}}}", body)
    }

    fn validate(&self) -> Result<()> {
        if !self.fields.iter().any(|f| f.name == "decision" && f.required) {
            return Err(Error::Configuration(
                "prompt schema must require a decision field".to_string(),
            ));
        }
        Ok(())
    }
}

/// Azure OpenAI wiring for the two providers, read once at startup and
/// passed into the services by reference.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub embedding_endpoint: String,
    pub embedding_api_key: String,
    pub embedding_deployment: String,
    pub generation_endpoint: String,
    pub generation_api_key: String,
    pub generation_deployment: String,
    pub api_version: String,
    /// Applied to both provider HTTP clients; a timeout surfaces as a
    /// provider error in whichever stage made the call.
    pub request_timeout_secs: u64,
}

impl AzureConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            embedding_api_key: require_var("EMBEDDING_AZURE_API_KEY")?,
            embedding_endpoint: require_var("EMBEDDING_AZURE_ENDPOINT")?,
            generation_api_key: require_var("GENERATION_AZURE_API_KEY")?,
            generation_endpoint: require_var("GENERATION_AZURE_ENDPOINT")?,
            embedding_deployment: env::var("EMBEDDING_AZURE_DEPLOYMENT")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            generation_deployment: env::var("GENERATION_AZURE_DEPLOYMENT")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            api_version: env::var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|_| "2024-02-01".to_string()),
            request_timeout_secs: 120,
        })
    }
}

fn require_var(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Configuration(format!("{} environment variable not set", name)))
}
