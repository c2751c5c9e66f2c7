use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the analysis pipeline. Every failure a stage can
/// produce maps onto exactly one of these kinds.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad chunking/retrieval parameters or mismatched component wiring.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The uploaded document could not be read or contains no text.
    #[error("load error: {0}")]
    Load(String),

    /// An embedding or completion call failed (auth, quota, network, timeout).
    #[error("provider error: {0}")]
    Provider(String),

    /// The model output could not be turned into a valid answer record.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Index construction failed; a partial index is never kept.
    #[error("index error: {0}")]
    Index(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures while decoding the model's raw text. Both variants keep the
/// original output so a bad response can be diagnosed without re-running
/// the pipeline.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("model output contains no decodable JSON object")]
    MalformedJson { raw: String },

    #[error("model output is missing required field `{field}`")]
    MissingField { field: String, raw: String },
}

impl Error {
    /// Stable machine-readable tag used in failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::Load(_) => "load",
            Error::Provider(_) => "provider",
            Error::Parse(ParseError::MalformedJson { .. }) => "malformed_json",
            Error::Parse(ParseError::MissingField { .. }) => "missing_field",
            Error::Index(_) => "index",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
        }
    }

    /// The untrusted model text that caused a parse failure, if any.
    pub fn raw_evidence(&self) -> Option<&str> {
        match self {
            Error::Parse(ParseError::MalformedJson { raw })
            | Error::Parse(ParseError::MissingField { raw, .. }) => Some(raw),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Provider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_keeps_raw_evidence() {
        let err = Error::Parse(ParseError::MalformedJson {
            raw: "The policy does not mention this.".to_string(),
        });
        assert_eq!(err.kind(), "malformed_json");
        assert_eq!(err.raw_evidence(), Some("The policy does not mention this."));
    }

    #[test]
    fn missing_field_names_the_field() {
        let err = Error::Parse(ParseError::MissingField {
            field: "amount".to_string(),
            raw: "{\"decision\":\"yes\"}".to_string(),
        });
        assert_eq!(err.kind(), "missing_field");
        assert!(err.to_string().contains("`amount`"));
    }

    #[test]
    fn provider_errors_have_no_evidence() {
        let err = Error::Provider("quota exceeded".to_string());
        assert_eq!(err.kind(), "provider");
        assert!(err.raw_evidence().is_none());
    }
}
