use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use std::sync::Arc;

use policy_rag::AnalysisLog;

use crate::analyze_request::AnalyzeRequest;
use crate::analyze_response::{AnalyzeResponse, AnswerOutcome, ErrorResponse};
use crate::AppState;

pub async fn handle_health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn handle_analyze(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, (StatusCode, Json<ErrorResponse>)> {
    if payload.questions.is_empty() {
        return Err(bad_request("at least one question is required"));
    }

    let bytes = download_document(&state.http, &payload.documents)
        .await
        .map_err(|e| bad_request(&e))?;
    let filename = filename_from_url(&payload.documents);

    let results = state
        .pipeline
        .run_batch(&filename, &bytes, &payload.questions)
        .await
        .map_err(|failure| {
            log::error!("document preparation failed: {}", failure);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    status: "failed".to_string(),
                    error: failure.to_string(),
                }),
            )
        })?;

    let mut history = AnalysisLog::new();
    let mut answers = Vec::with_capacity(results.len());
    let mut succeeded = 0usize;
    for (query, result) in payload.questions.iter().zip(results) {
        history.record(query, &result);
        answers.push(match result {
            Ok(report) => {
                succeeded += 1;
                AnswerOutcome::Done(Box::new(report))
            }
            Err(failure) => AnswerOutcome::Failed(failure.report()),
        });
    }
    log::info!(
        "processed {} questions against {} ({} succeeded)",
        answers.len(),
        filename,
        succeeded
    );

    Ok(Json(AnalyzeResponse {
        status: "success".to_string(),
        answers,
    }))
}

async fn download_document(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("failed to fetch document: {}", e))?;
    if !response.status().is_success() {
        return Err(format!("failed to fetch document: HTTP {}", response.status()));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| format!("failed to read document body: {}", e))?;
    Ok(bytes.to_vec())
}

fn filename_from_url(url: &str) -> String {
    url.rsplit('/')
        .next()
        .and_then(|name| name.split('?').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("document.pdf")
        .to_string()
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            status: "failed".to_string(),
            error: message.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_taken_from_the_url_path() {
        assert_eq!(
            filename_from_url("https://example.com/docs/policy.pdf"),
            "policy.pdf"
        );
        assert_eq!(
            filename_from_url("https://example.com/docs/policy.pdf?sig=abc&x=1"),
            "policy.pdf"
        );
    }

    #[test]
    fn empty_path_falls_back_to_a_default_name() {
        assert_eq!(filename_from_url("https://example.com/"), "document.pdf");
    }
}
