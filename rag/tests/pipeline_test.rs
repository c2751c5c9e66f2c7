use async_trait::async_trait;
use std::sync::Arc;

use policy_rag::{
    AnalysisLog, Chunk, Decision, Document, EmbeddingProvider, Indexer, LlmProvider, Pipeline,
    PipelineConfig, PreparedDocument, Result, Stage,
};

const CHUNK_TEXTS: [&str; 3] = [
    "General exclusions apply to cosmetic procedures.",
    "Knee surgery is covered up to INR 500000 after a 90 day waiting period.",
    "Maternity benefits require a 2 year waiting period.",
];

const VALID_ANSWER: &str = "Here is the analysis: {\"decision\":\"yes\",\"amount\":\"INR 500000\",\
\"justification\":\"Knee surgery is covered up to INR 500000.\",\"source_clause\":\"4.2\"} Let me know if you need more.";

/// Deterministic embedder: each known chunk text maps to its own axis, any
/// other input (the query) lands closest to chunk 1.
struct MockEmbedder;

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = match CHUNK_TEXTS.iter().position(|t| *t == text) {
            Some(0) => vec![1.0, 0.0, 0.0],
            Some(1) => vec![0.0, 1.0, 0.0],
            Some(2) => vec![0.0, 0.0, 1.0],
            _ => vec![0.1, 0.9, 0.05],
        };
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn identity(&self) -> String {
        "mock-embed".to_string()
    }
}

/// Scripted chat model: recognizes each stage's prompt by its marker text.
struct MockLlm {
    answer: String,
}

impl MockLlm {
    fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.contains("statement of facts") {
            return Ok("Is knee surgery covered by the policy?".to_string());
        }
        if prompt.contains("Conversational Answer:") {
            return Ok("Yes, knee surgery is covered under the policy.".to_string());
        }
        Ok(self.answer.clone())
    }

    fn identity(&self) -> String {
        "mock-llm".to_string()
    }
}

fn test_document() -> Document {
    let text = CHUNK_TEXTS.join("\n\n");
    Document {
        id: "doc-1".to_string(),
        filename: "policy.pdf".to_string(),
        pages: vec![text.clone()],
        text,
        page_offsets: vec![0],
        fingerprint: "test-fingerprint".to_string(),
    }
}

fn test_chunks() -> Vec<Chunk> {
    CHUNK_TEXTS
        .iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            id: format!("chunk-{}", i),
            text: text.to_string(),
            source_page: 1,
            sequence_index: i,
            start_position: 0,
            end_position: text.len(),
        })
        .collect()
}

async fn prepared_document() -> PreparedDocument {
    let document = test_document();
    let chunks = test_chunks();
    let index = Indexer::new(None)
        .build(&document, &chunks, &MockEmbedder)
        .await
        .unwrap();
    PreparedDocument {
        document,
        chunks,
        index,
    }
}

fn pipeline(llm: MockLlm, config: PipelineConfig) -> Pipeline {
    Pipeline::new(Arc::new(MockEmbedder), Arc::new(llm), config).unwrap()
}

#[tokio::test]
async fn end_to_end_returns_a_done_report() {
    let prepared = prepared_document().await;
    let pipeline = pipeline(MockLlm::answering(VALID_ANSWER), PipelineConfig::default());

    let report = pipeline
        .answer(&prepared, "46M, knee surgery, Pune, 3-month policy")
        .await
        .unwrap();

    assert_eq!(report.answer.decision, Decision::Yes);
    assert_eq!(report.answer.amount, "INR 500000");
    assert_eq!(report.answer.source_clause, "4.2");
    assert_eq!(report.query, "46M, knee surgery, Pune, 3-month policy");
    assert_eq!(
        report.formulated_question.as_deref(),
        Some("Is knee surgery covered by the policy?")
    );
    assert_eq!(
        report.conversational_summary.as_deref(),
        Some("Yes, knee surgery is covered under the policy.")
    );

    // chunk 1 is closest to the query vector, then chunk 0, then chunk 2
    let order: Vec<usize> = report
        .retrieved_chunks
        .iter()
        .map(|c| c.sequence_index)
        .collect();
    assert_eq!(order, vec![1, 0, 2]);

    assert_eq!(report.statistics.chunks_processed, 3);
    assert_eq!(report.statistics.chunks_retrieved, 3);
    assert!(report.statistics.processing_time_seconds >= 0.0);
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn low_confidence_attaches_a_warning_without_changing_the_decision() {
    let prepared = prepared_document().await;
    let answer = "{\"decision\":\"yes\",\"amount\":\"INR 500000\",\"justification\":\"covered\",\
\"source_clause\":\"4.2\",\"confidence_score\":0.4}";
    let config = PipelineConfig {
        confidence_threshold: Some(0.7),
        ..PipelineConfig::default()
    };
    let pipeline = pipeline(MockLlm::answering(answer), config);

    let report = pipeline.answer(&prepared, "knee surgery?").await.unwrap();
    assert_eq!(report.answer.decision, Decision::Yes);
    assert_eq!(report.answer.confidence_score, Some(0.4));
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("below"));
}

#[tokio::test]
async fn non_json_output_fails_in_the_parsing_stage_with_evidence() {
    let prepared = prepared_document().await;
    let raw = "The policy does not mention this.";
    let pipeline = pipeline(MockLlm::answering(raw), PipelineConfig::default());

    let failure = pipeline.answer(&prepared, "knee surgery?").await.unwrap_err();
    assert_eq!(failure.stage, Stage::Parsing);

    let report = failure.report();
    assert_eq!(report.kind, "malformed_json");
    assert_eq!(report.raw_evidence.as_deref(), Some(raw));
}

#[tokio::test]
async fn missing_required_field_is_reported_by_name() {
    let prepared = prepared_document().await;
    let pipeline = pipeline(
        MockLlm::answering("{\"decision\":\"yes\"}"),
        PipelineConfig::default(),
    );

    let failure = pipeline.answer(&prepared, "knee surgery?").await.unwrap_err();
    assert_eq!(failure.stage, Stage::Parsing);
    let report = failure.report();
    assert_eq!(report.kind, "missing_field");
    assert!(report.message.contains("`amount`"));
}

#[tokio::test]
async fn disabling_formulation_uses_the_raw_input() {
    let prepared = prepared_document().await;
    let config = PipelineConfig {
        formulate_question: false,
        conversational_summary: false,
        ..PipelineConfig::default()
    };
    let pipeline = pipeline(MockLlm::answering(VALID_ANSWER), config);

    let report = pipeline.answer(&prepared, "Is knee surgery covered?").await.unwrap();
    assert!(report.formulated_question.is_none());
    assert!(report.conversational_summary.is_none());
    assert_eq!(report.query, "Is knee surgery covered?");
}

#[tokio::test]
async fn corrupt_document_fails_in_the_loading_stage() {
    let pipeline = pipeline(MockLlm::answering(VALID_ANSWER), PipelineConfig::default());

    let failure = pipeline
        .prepare("broken.pdf", b"definitely not a pdf")
        .await
        .unwrap_err();
    assert_eq!(failure.stage, Stage::Loading);
    assert_eq!(failure.report().kind, "load");
}

#[tokio::test]
async fn analysis_log_records_both_outcomes() {
    let prepared = prepared_document().await;
    let good = pipeline(MockLlm::answering(VALID_ANSWER), PipelineConfig::default());
    let bad = pipeline(MockLlm::answering("no json here"), PipelineConfig::default());

    let mut history = AnalysisLog::new();

    let ok = good.answer(&prepared, "knee surgery?").await;
    history.record("knee surgery?", &ok);
    let err = bad.answer(&prepared, "dental?").await;
    history.record("dental?", &err);

    assert_eq!(history.len(), 2);
    let serialized = serde_json::to_string(&history).unwrap();
    assert!(serialized.contains("\"status\":\"done\""));
    assert!(serialized.contains("\"status\":\"failed\""));
}
