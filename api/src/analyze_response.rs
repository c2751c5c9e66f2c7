use serde::Serialize;

use policy_rag::{AnalysisReport, FailureReport};

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub status: String,
    pub answers: Vec<AnswerOutcome>,
}

/// One entry per question: either a full report or the tagged failure for
/// that question, in request order.
#[derive(Serialize)]
#[serde(untagged)]
pub enum AnswerOutcome {
    Done(Box<AnalysisReport>),
    Failed(FailureReport),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}
