use crate::error::Result;
use crate::providers::LlmProvider;

const FORMULATION_PROMPT: &str = r#"You are an expert assistant. Convert the user's statement of facts into a clear, answerable question about insurance coverage.

Example 1:
User Statement: "46M, knee surgery, Pune, 3-month policy"
Question: "Is knee surgery covered by the policy?"

Example 2:
User Statement: "Car accident, frontal damage, Mumbai"
Question: "What is the coverage for accidental damage to a car in Mumbai?"

User Statement: "{user_input}"
Question:"#;

/// Rewrites an informal statement of facts into one explicit question to
/// improve retrieval. Callers that disable this stage use the raw input for
/// both retrieval and the final prompt.
pub async fn formulate(user_input: &str, llm: &dyn LlmProvider) -> Result<String> {
    let prompt = FORMULATION_PROMPT.replace("{user_input}", user_input);
    let response = llm.complete(&prompt).await?;

    let question = response.trim().trim_matches('"').trim().to_string();
    if question.is_empty() {
        return Ok(user_input.to_string());
    }

    log::info!("formulated question: {}", question);
    Ok(question)
}
