mod analyze_request;
mod analyze_response;
mod auth;
mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use policy_rag::{AzureChatService, AzureConfig, AzureEmbeddingService, Pipeline, PipelineConfig};

pub struct AppState {
    pub pipeline: Pipeline,
    pub http: reqwest::Client,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let azure = AzureConfig::from_env()?;
    let embedder = Arc::new(AzureEmbeddingService::new(&azure)?);
    let llm = Arc::new(AzureChatService::new(&azure)?);
    let pipeline = Pipeline::new(embedder, llm, PipelineConfig::default())?;

    let state = Arc::new(AppState {
        pipeline,
        http: reqwest::Client::new(),
    });

    let app = Router::new()
        .route("/analyze", post(handlers::handle_analyze))
        .route_layer(middleware::from_fn(auth::auth_middleware))
        .route("/health", get(handlers::handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    log::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
