use serde_json::Value;

use crate::error::ParseError;
use crate::models::AnswerRecord;

/// Locates the first top-level JSON object in the model output by slicing
/// from the first `{` to the last `}`, tolerating prose on either side.
/// Kept behind this module so a provider with a structured-output mode can
/// replace it without touching callers.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Decodes and validates the model's raw text into an [`AnswerRecord`].
/// `required_fields` are checked in order, so the first missing field is
/// reported deterministically. A confidence score under the threshold adds
/// a warning; low confidence is informative, not disqualifying.
pub fn parse(
    raw: &str,
    required_fields: &[&str],
    confidence_threshold: Option<f64>,
) -> Result<(AnswerRecord, Vec<String>), ParseError> {
    let malformed = || ParseError::MalformedJson {
        raw: raw.to_string(),
    };

    let json_str = extract_json_object(raw).ok_or_else(&malformed)?;
    let value: Value = serde_json::from_str(json_str).map_err(|_| malformed())?;
    let object = value.as_object().ok_or_else(&malformed)?;

    for field in required_fields {
        if !object.contains_key(*field) {
            return Err(ParseError::MissingField {
                field: field.to_string(),
                raw: raw.to_string(),
            });
        }
    }

    let record: AnswerRecord = serde_json::from_value(value).map_err(|_| malformed())?;

    let mut warnings = Vec::new();
    if let (Some(score), Some(threshold)) = (record.confidence_score, confidence_threshold) {
        if score < threshold {
            warnings.push(format!(
                "confidence score {:.2} is below the configured threshold {:.2}",
                score, threshold
            ));
        }
    }

    Ok((record, warnings))
}
