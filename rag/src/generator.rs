use crate::config::PromptSchema;
use crate::error::Result;
use crate::models::ScoredChunk;
use crate::providers::LlmProvider;

/// Concatenates retrieved chunks into the prompt context, each excerpt
/// numbered and annotated with its source page.
pub fn build_context(chunks: &[ScoredChunk]) -> String {
    let mut context = String::new();
    for (i, scored) in chunks.iter().enumerate() {
        context.push_str(&format!(
            "[Excerpt {} | page {}]\n{}\n\n",
            i + 1,
            scored.chunk.source_page,
            scored.chunk.text.trim()
        ));
    }
    context
}

pub fn build_prompt(question: &str, context: &str, schema: &PromptSchema) -> String {
    format!(
        r#"You are an expert insurance policy analyst. Based *only* on the CONTEXT provided, answer the user's QUESTION.
Generate a JSON object with the following schema:
{schema}
Respond with the JSON object only, no other text.

CONTEXT:
{context}

QUESTION: {question}

ANSWER (in JSON format):"#,
        schema = schema.render(),
        context = context,
        question = question
    )
}

/// One deterministic completion over the retrieved context. The raw text is
/// returned untouched; decoding is the parser's job.
pub async fn generate_answer(
    chunks: &[ScoredChunk],
    question: &str,
    llm: &dyn LlmProvider,
    schema: &PromptSchema,
) -> Result<String> {
    let prompt = build_prompt(question, &build_context(chunks), schema);
    llm.complete(&prompt).await
}

/// Turns a parsed verdict into a one-sentence conversational answer.
pub async fn summarize_answer(
    decision: &str,
    justification: &str,
    llm: &dyn LlmProvider,
) -> Result<String> {
    let prompt = format!(
        "Based on the following analysis, provide a simple, one-sentence conversational answer.\n\
         Analysis Decision: {}\n\
         Justification: {}\n\
         Example: If the decision is 'yes' for knee surgery, respond with 'Yes, knee surgery is covered under the policy.'\n\
         Conversational Answer:",
        decision, justification
    );
    Ok(llm.complete(&prompt).await?.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn scored(seq: usize, page: usize, text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: format!("c{}", seq),
                text: text.to_string(),
                source_page: page,
                sequence_index: seq,
                start_position: 0,
                end_position: text.len(),
            },
            similarity: 0.9,
        }
    }

    #[test]
    fn context_annotates_each_excerpt_with_its_page() {
        let context = build_context(&[
            scored(0, 2, "Knee surgery is covered."),
            scored(1, 7, "Waiting period is 90 days."),
        ]);
        assert!(context.contains("[Excerpt 1 | page 2]"));
        assert!(context.contains("[Excerpt 2 | page 7]"));
        assert!(context.contains("Knee surgery is covered."));
    }

    #[test]
    fn prompt_embeds_schema_context_and_question() {
        let schema = PromptSchema::default();
        let prompt = build_prompt("Is knee surgery covered?", "some context", &schema);
        assert!(prompt.contains("\"decision\""));
        assert!(prompt.contains("some context"));
        assert!(prompt.contains("QUESTION: Is knee surgery covered?"));
        assert!(prompt.contains("JSON object only"));
    }
}
