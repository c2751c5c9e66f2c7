use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AzureConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn build_client(timeout_secs: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_else(|_| "<no body>".to_string());
    Err(Error::Provider(format!("{} failed ({}): {}", what, status, body)))
}

/// Azure OpenAI embeddings deployment.
pub struct AzureEmbeddingService {
    client: Client,
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
}

impl AzureEmbeddingService {
    pub fn new(config: &AzureConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout_secs)?,
            endpoint: config.embedding_endpoint.trim_end_matches('/').to_string(),
            api_key: config.embedding_api_key.clone(),
            deployment: config.embedding_deployment.clone(),
            api_version: config.api_version.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for AzureEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            self.endpoint, self.deployment, self.api_version
        );

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&EmbeddingRequest { input: [text] })
            .send()
            .await?;
        let response = check_status(response, "embedding request").await?;

        let parsed: EmbeddingResponse = response.json().await?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Provider("embedding response contained no vectors".to_string()))
    }

    fn dimensions(&self) -> usize {
        // text-embedding-3-small
        1536
    }

    fn identity(&self) -> String {
        format!("azure-openai/{}", self.deployment)
    }
}

/// Azure OpenAI chat deployment, always invoked at temperature zero so the
/// same context yields the same verdict as far as the service allows.
pub struct AzureChatService {
    client: Client,
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
}

impl AzureChatService {
    pub fn new(config: &AzureConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout_secs)?,
            endpoint: config.generation_endpoint.trim_end_matches('/').to_string(),
            api_key: config.generation_api_key.clone(),
            deployment: config.generation_deployment.clone(),
            api_version: config.api_version.clone(),
        })
    }
}

#[async_trait]
impl LlmProvider for AzureChatService {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        );

        let request = ChatRequest {
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response, "completion request").await?;

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Provider("completion response contained no choices".to_string()))
    }

    fn identity(&self) -> String {
        format!("azure-openai/{}", self.deployment)
    }
}
