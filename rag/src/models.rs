use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A loaded policy document. Immutable once built by the loader; discarded
/// after its chunks are indexed unless the caller keeps it for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    /// Normalized text of each page, in page order.
    pub pages: Vec<String>,
    /// All pages joined into one normalized text block.
    pub text: String,
    /// Byte offset into `text` where each page starts.
    pub page_offsets: Vec<usize>,
    /// sha256 of the raw uploaded bytes; keys the persisted index.
    pub fingerprint: String,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// 1-based page number containing the given byte offset into `text`.
    pub fn page_for_offset(&self, offset: usize) -> usize {
        match self.page_offsets.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(0) => 1,
            Err(i) => i,
        }
    }
}

/// The unit of retrieval: one bounded segment of document text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub source_page: usize,
    pub sequence_index: usize,
    /// Byte range into the document's normalized text.
    pub start_position: usize,
    pub end_position: usize,
}

/// A retrieved chunk together with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// Chunk view embedded in the final report.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub source_page: usize,
    pub sequence_index: usize,
    pub similarity: f32,
}

impl RetrievedChunk {
    pub fn from_scored(scored: &ScoredChunk) -> Self {
        Self {
            text: scored.chunk.text.clone(),
            source_page: scored.chunk.source_page,
            sequence_index: scored.chunk.sequence_index,
            similarity: scored.similarity,
        }
    }
}

/// The verdict enum. Anything else in the model output is a decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Yes,
    No,
    Partially,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Decision::Yes => "yes",
            Decision::No => "no",
            Decision::Partially => "partially",
        };
        f.write_str(name)
    }
}

pub const NOT_SPECIFIED: &str = "Not Specified";

fn not_specified() -> String {
    NOT_SPECIFIED.to_string()
}

/// The structured verdict decoded from the model output. The three core
/// fields are never absent: schema fields the model omitted (and the active
/// schema did not require) are filled with the "Not Specified" sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub decision: Decision,
    #[serde(default = "not_specified")]
    pub amount: String,
    #[serde(default = "not_specified")]
    pub justification: String,
    #[serde(default = "not_specified")]
    pub source_clause: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    /// Any extra fields the schema asked for (risk_factors and the like).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Observational statistics attached by the orchestrator. Nothing inside
/// the pipeline consumes these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub processing_time_seconds: f64,
    pub chunks_processed: usize,
    pub chunks_retrieved: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub total_pages: usize,
}

/// The enriched success response: answer fields flattened to the top level
/// plus everything a caller needs to display and audit the result.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub answer: AnswerRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversational_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formulated_question: Option<String>,
    pub query: String,
    pub retrieved_chunks: Vec<RetrievedChunk>,
    pub document: DocumentInfo,
    pub statistics: ProcessingMetadata,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Decision::Partially).unwrap(), "\"partially\"");
        let parsed: Decision = serde_json::from_str("\"yes\"").unwrap();
        assert_eq!(parsed, Decision::Yes);
    }

    #[test]
    fn decision_rejects_unknown_values() {
        assert!(serde_json::from_str::<Decision>("\"maybe\"").is_err());
    }

    #[test]
    fn answer_record_fills_missing_optional_fields_with_sentinel() {
        let record: AnswerRecord =
            serde_json::from_str("{\"decision\":\"no\",\"justification\":\"excluded by clause 4\"}").unwrap();
        assert_eq!(record.amount, NOT_SPECIFIED);
        assert_eq!(record.source_clause, NOT_SPECIFIED);
        assert_eq!(record.justification, "excluded by clause 4");
        assert!(record.confidence_score.is_none());
    }

    #[test]
    fn answer_record_keeps_auxiliary_fields() {
        let record: AnswerRecord = serde_json::from_str(
            "{\"decision\":\"yes\",\"amount\":\"5000\",\"justification\":\"x\",\"source_clause\":\"2.1\",\"risk_factors\":[\"age\"]}",
        )
        .unwrap();
        assert!(record.extra.contains_key("risk_factors"));
    }

    #[test]
    fn page_for_offset_maps_boundaries() {
        let doc = Document {
            id: "d".to_string(),
            filename: "policy.pdf".to_string(),
            pages: vec!["aaa".to_string(), "bbb".to_string(), "ccc".to_string()],
            text: "aaa\n\nbbb\n\nccc".to_string(),
            page_offsets: vec![0, 5, 10],
            fingerprint: "f".to_string(),
        };
        assert_eq!(doc.page_for_offset(0), 1);
        assert_eq!(doc.page_for_offset(2), 1);
        assert_eq!(doc.page_for_offset(5), 2);
        assert_eq!(doc.page_for_offset(7), 2);
        assert_eq!(doc.page_for_offset(12), 3);
    }
}
