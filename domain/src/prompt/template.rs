//! Prompt templates for the ensemble flow

use crate::core::text::truncate_str;
use crate::synthesis::SynthesisCandidate;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for every provider slot
    pub fn provider_system() -> &'static str {
        r#"You are a knowledgeable assistant answering as one member of a panel.
Give an accurate, well-reasoned answer. Be concise but complete.
Support your points with reasoning or examples where they help."#
    }

    /// Prefix the user's prompt with remembered context
    pub fn with_memory_context(context: &str, prompt: &str) -> String {
        format!(
            r#"Relevant context from earlier conversations:
{}

Current question:
{}"#,
            context.trim(),
            prompt
        )
    }

    /// System prompt for the synthesis phase
    pub fn synthesis_system() -> &'static str {
        r#"You are a moderator combining several expert answers into one.
Keep what the answers agree on, resolve disagreements in favour of the better supported position,
and drop anything unsupported. Answer the question directly; do not mention the panel or the experts."#
    }

    /// User prompt for synthesis.
    ///
    /// Candidates are expected in descending weight order. Each one is cut to
    /// `per_response_chars` and candidates stop being added once
    /// `total_chars` is spent.
    pub fn synthesis_prompt(
        question: &str,
        candidates: &[SynthesisCandidate],
        per_response_chars: usize,
        total_chars: usize,
    ) -> String {
        let mut prompt = format!(
            r#"Original question: {}

Expert answers (weight shows how much the panel trusts each one):
"#,
            question
        );

        let mut spent = 0usize;
        for candidate in candidates {
            let remaining = total_chars.saturating_sub(spent);
            if remaining == 0 {
                break;
            }
            let body = truncate_str(candidate.content.trim(), per_response_chars.min(remaining));
            spent += body.len();
            prompt.push_str(&format!(
                "\n--- {} (weight {:.2}) ---\n{}\n",
                candidate.role, candidate.weight, body
            ));
        }

        prompt.push_str(
            r#"
Write a single, self-contained answer to the original question that combines the strongest points above."#,
        );
        prompt
    }

    /// System prompt for meta-voting
    pub fn meta_vote_system() -> &'static str {
        r#"You are an impartial judge comparing two answers to the same question.
Pick the answer that is more accurate and more useful."#
    }

    /// User prompt for meta-voting between two candidates
    pub fn meta_vote_prompt(
        question: &str,
        first: &SynthesisCandidate,
        second: &SynthesisCandidate,
        per_response_chars: usize,
    ) -> String {
        format!(
            r#"Question: {}

Answer A:
{}

Answer B:
{}

Respond with JSON only: {{"choice": "A" or "B", "reasoning": "<one sentence>"}}"#,
            question,
            truncate_str(first.content.trim(), per_response_chars),
            truncate_str(second.content.trim(), per_response_chars)
        )
    }
}
