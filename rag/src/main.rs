use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use policy_rag::{
    AnalysisLog, AzureChatService, AzureConfig, AzureEmbeddingService, Pipeline, PipelineConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: policy_rag <policy.pdf> <question> [<question>...]");
            std::process::exit(2);
        }
    };
    let questions: Vec<String> = args.collect();
    if questions.is_empty() {
        eprintln!("usage: policy_rag <policy.pdf> <question> [<question>...]");
        std::process::exit(2);
    }

    let azure = AzureConfig::from_env()?;
    let embedder = Arc::new(AzureEmbeddingService::new(&azure)?);
    let llm = Arc::new(AzureChatService::new(&azure)?);
    let pipeline = Pipeline::new(embedder, llm, PipelineConfig::default())?;

    let bytes = std::fs::read(&path)?;
    let filename = Path::new(&path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.clone());

    let mut history = AnalysisLog::new();
    match pipeline.run_batch(&filename, &bytes, &questions).await {
        Ok(results) => {
            for (query, result) in questions.iter().zip(&results) {
                history.record(query, result);
                match result {
                    Ok(report) => println!("{}", serde_json::to_string_pretty(report)?),
                    Err(failure) => println!("{}", serde_json::to_string_pretty(&failure.report())?),
                }
            }
            log::info!("answered {} queries", history.len());
            Ok(())
        }
        Err(failure) => {
            eprintln!("{}", serde_json::to_string_pretty(&failure.report())?);
            std::process::exit(1);
        }
    }
}
