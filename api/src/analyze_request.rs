use serde::Deserialize;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    /// URL of the policy PDF to analyze.
    pub documents: String,
    pub questions: Vec<String>,
}
