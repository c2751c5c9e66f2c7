use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::chunker::Chunker;
use crate::config::PipelineConfig;
use crate::document_loader::DocumentLoader;
use crate::error::{Error, Result};
use crate::formulator;
use crate::generator;
use crate::index::{Indexer, VectorIndex};
use crate::models::{
    AnalysisReport, Chunk, Decision, Document, DocumentInfo, ProcessingMetadata, RetrievedChunk,
};
use crate::parser;
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::retriever;

/// The pipeline states a request moves through. Transitions are sequential;
/// only Formulating and Summarizing may be skipped, and any failure goes
/// straight to Failed carrying the stage it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loading,
    Chunking,
    Indexing,
    Formulating,
    Retrieving,
    Generating,
    Parsing,
    Summarizing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Loading => "loading",
            Stage::Chunking => "chunking",
            Stage::Indexing => "indexing",
            Stage::Formulating => "formulating",
            Stage::Retrieving => "retrieving",
            Stage::Generating => "generating",
            Stage::Parsing => "parsing",
            Stage::Summarizing => "summarizing",
        };
        f.write_str(name)
    }
}

/// A stage failure. The pipeline never continues past the first failed
/// stage and never surfaces an error without its originating stage.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {error}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub error: Error,
}

impl PipelineFailure {
    pub fn report(&self) -> FailureReport {
        FailureReport {
            stage: self.stage,
            kind: self.error.kind().to_string(),
            message: self.error.to_string(),
            raw_evidence: self.error.raw_evidence().map(|s| s.to_string()),
        }
    }
}

/// Serializable failure payload: stage, kind, human-readable message and,
/// for parse failures, the raw model text that caused them.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub stage: Stage,
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_evidence: Option<String>,
}

fn at_stage<T>(stage: Stage, result: Result<T>) -> std::result::Result<T, PipelineFailure> {
    result.map_err(|error| PipelineFailure { stage, error })
}

/// A loaded, chunked and indexed document, reusable across queries. The
/// index is read-only once built, so any number of `answer` calls may share
/// one prepared document.
#[derive(Debug)]
pub struct PreparedDocument {
    pub document: Document,
    pub chunks: Vec<Chunk>,
    pub index: VectorIndex,
}

/// Sequences the whole document-to-verdict flow. Provider handles are
/// constructed once by the caller and shared for the pipeline's lifetime.
pub struct Pipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    config: PipelineConfig,
    loader: DocumentLoader,
    chunker: Chunker,
    indexer: Indexer,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
        let indexer = Indexer::new(config.persist_dir.clone());
        Ok(Self {
            embedder,
            llm,
            config,
            loader: DocumentLoader::new(),
            chunker,
            indexer,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loading, Chunking and Indexing for one uploaded document.
    pub async fn prepare(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> std::result::Result<PreparedDocument, PipelineFailure> {
        log::info!("stage {}: {}", Stage::Loading, filename);
        let document = at_stage(Stage::Loading, self.loader.load(filename, bytes))?;

        log::info!("stage {}", Stage::Chunking);
        let chunks = self.chunker.chunk_document(&document);

        log::info!("stage {}", Stage::Indexing);
        let index = at_stage(
            Stage::Indexing,
            self.indexer
                .build(&document, &chunks, self.embedder.as_ref())
                .await,
        )?;

        Ok(PreparedDocument {
            document,
            chunks,
            index,
        })
    }

    /// The per-query stages against an already prepared document.
    pub async fn answer(
        &self,
        prepared: &PreparedDocument,
        user_input: &str,
    ) -> std::result::Result<AnalysisReport, PipelineFailure> {
        self.answer_inner(prepared, user_input, Instant::now()).await
    }

    /// Everything in one call: prepare the document, then answer the query.
    /// The report's processing time covers both phases.
    pub async fn run(
        &self,
        filename: &str,
        bytes: &[u8],
        user_input: &str,
    ) -> std::result::Result<AnalysisReport, PipelineFailure> {
        let started = Instant::now();
        let prepared = self.prepare(filename, bytes).await?;
        self.answer_inner(&prepared, user_input, started).await
    }

    /// Prepares the document once and answers each query against the shared
    /// index. A prepare failure fails the batch; per-query failures are
    /// returned in place so one bad answer does not discard the rest.
    pub async fn run_batch(
        &self,
        filename: &str,
        bytes: &[u8],
        queries: &[String],
    ) -> std::result::Result<Vec<std::result::Result<AnalysisReport, PipelineFailure>>, PipelineFailure>
    {
        let prepared = self.prepare(filename, bytes).await?;
        let mut reports = Vec::with_capacity(queries.len());
        for query in queries {
            reports.push(self.answer(&prepared, query).await);
        }
        Ok(reports)
    }

    /// Runs the pipeline with a fixed summary request instead of a user
    /// question.
    pub async fn summarize_document(
        &self,
        prepared: &PreparedDocument,
    ) -> std::result::Result<AnalysisReport, PipelineFailure> {
        self.answer(prepared, "Generate a detailed summary of this document.")
            .await
    }

    async fn answer_inner(
        &self,
        prepared: &PreparedDocument,
        user_input: &str,
        started: Instant,
    ) -> std::result::Result<AnalysisReport, PipelineFailure> {
        let formulated_question = if self.config.formulate_question {
            log::info!("stage {}", Stage::Formulating);
            Some(at_stage(
                Stage::Formulating,
                formulator::formulate(user_input, self.llm.as_ref()).await,
            )?)
        } else {
            None
        };
        let question = formulated_question.as_deref().unwrap_or(user_input);

        log::info!("stage {}", Stage::Retrieving);
        let retrieved = at_stage(
            Stage::Retrieving,
            retriever::retrieve(
                &prepared.index,
                question,
                self.config.top_k,
                self.embedder.as_ref(),
            )
            .await,
        )?;

        log::info!("stage {}", Stage::Generating);
        let raw = at_stage(
            Stage::Generating,
            generator::generate_answer(&retrieved, question, self.llm.as_ref(), &self.config.schema)
                .await,
        )?;

        log::info!("stage {}", Stage::Parsing);
        let required = self.config.schema.required_fields();
        let (answer, warnings) = at_stage(
            Stage::Parsing,
            parser::parse(&raw, &required, self.config.confidence_threshold).map_err(Error::from),
        )?;

        let conversational_summary = if self.config.conversational_summary {
            log::info!("stage {}", Stage::Summarizing);
            Some(at_stage(
                Stage::Summarizing,
                generator::summarize_answer(
                    &answer.decision.to_string(),
                    &answer.justification,
                    self.llm.as_ref(),
                )
                .await,
            )?)
        } else {
            None
        };

        let statistics = ProcessingMetadata {
            processing_time_seconds: started.elapsed().as_secs_f64(),
            chunks_processed: prepared.chunks.len(),
            chunks_retrieved: retrieved.len(),
            timestamp: Utc::now(),
        };

        Ok(AnalysisReport {
            answer,
            conversational_summary,
            formulated_question,
            query: user_input.to_string(),
            retrieved_chunks: retrieved.iter().map(RetrievedChunk::from_scored).collect(),
            document: DocumentInfo {
                filename: prepared.document.filename.clone(),
                total_pages: prepared.document.page_count(),
            },
            statistics,
            warnings,
        })
    }
}

/// Caller-owned record of per-query outcomes. Nothing in the pipeline reads
/// or writes one implicitly; a deployment that wants history passes a log
/// and records into it, one that does not simply never creates one.
#[derive(Debug, Default, Serialize)]
pub struct AnalysisLog {
    entries: Vec<LogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub query: String,
    #[serde(flatten)]
    pub outcome: LogOutcome,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LogOutcome {
    Done { decision: Decision },
    Failed { stage: Stage, kind: String },
}

impl AnalysisLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        query: &str,
        outcome: &std::result::Result<AnalysisReport, PipelineFailure>,
    ) {
        let outcome = match outcome {
            Ok(report) => LogOutcome::Done {
                decision: report.answer.decision,
            },
            Err(failure) => LogOutcome::Failed {
                stage: failure.stage,
                kind: failure.error.kind().to_string(),
            },
        };
        self.entries.push(LogEntry {
            query: query.to_string(),
            outcome,
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
