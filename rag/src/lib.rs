pub mod azure_service;
pub mod chunker;
pub mod config;
pub mod document_loader;
pub mod error;
pub mod formulator;
pub mod generator;
pub mod index;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod providers;
pub mod retriever;

pub use azure_service::{AzureChatService, AzureEmbeddingService};
pub use chunker::Chunker;
pub use config::{AzureConfig, PipelineConfig, PromptSchema, SchemaField};
pub use document_loader::DocumentLoader;
pub use error::{Error, ParseError, Result};
pub use index::{IndexEntry, Indexer, VectorIndex};
pub use models::*;
pub use pipeline::{
    AnalysisLog, FailureReport, LogEntry, LogOutcome, Pipeline, PipelineFailure, PreparedDocument,
    Stage,
};
pub use providers::{EmbeddingProvider, LlmProvider};
