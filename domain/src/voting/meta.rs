//! Meta-voting: asking the synthesizer model to pick between the top two
//! candidates when consensus is weak.
//!
//! The verdict is advisory. It is recorded next to the vote and never
//! changes weights or the winner.

use serde::{Deserialize, Serialize};

/// Which of the two presented candidates the model preferred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaChoice {
    First,
    Second,
}

/// Recorded meta-vote
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaVotingRecord {
    pub triggered: bool,
    /// Roles shown to the model, in presentation order
    pub candidates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agrees_with_winner: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetaVotingRecord {
    /// Record of a completed meta-vote
    pub fn decided(
        candidates: [&str; 2],
        choice: MetaChoice,
        reasoning: impl Into<String>,
        winner: Option<&str>,
    ) -> Self {
        let chosen = match choice {
            MetaChoice::First => candidates[0],
            MetaChoice::Second => candidates[1],
        };
        Self {
            triggered: true,
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
            choice: Some(chosen.to_string()),
            agrees_with_winner: winner.map(|w| w == chosen),
            reasoning: Some(reasoning.into()),
            error: None,
        }
    }

    /// Record of a meta-vote that could not be completed
    pub fn failed(candidates: [&str; 2], error: impl Into<String>) -> Self {
        Self {
            triggered: true,
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Deserialize)]
struct MetaVoteJson {
    choice: String,
    #[serde(default)]
    reasoning: String,
}

/// Parse a meta-vote answer.
///
/// Accepts `{"choice": "A", "reasoning": "..."}` or a `CHOICE: A` line with
/// an optional `REASON:` line. Returns `None` when no choice can be found.
pub fn parse_meta_vote(response: &str) -> Option<(MetaChoice, String)> {
    if let Some(start) = response.find('{')
        && let Some(end) = response.rfind('}')
        && end > start
        && let Ok(parsed) = serde_json::from_str::<MetaVoteJson>(&response[start..=end])
        && let Some(choice) = letter_choice(&parsed.choice)
    {
        return Some((choice, parsed.reasoning));
    }

    let mut choice = None;
    let mut reasoning = String::new();
    for line in response.lines() {
        let upper = line.trim().to_uppercase();
        if let Some(rest) = upper.strip_prefix("CHOICE:") {
            choice = choice.or_else(|| letter_choice(rest));
        } else if upper.starts_with("REASON:") {
            reasoning = line.trim()["REASON:".len()..].trim().to_string();
        }
    }
    choice.map(|c| (c, reasoning))
}

fn letter_choice(s: &str) -> Option<MetaChoice> {
    match s.trim().trim_matches(|c: char| !c.is_alphanumeric()).to_uppercase().as_str() {
        "A" | "1" => Some(MetaChoice::First),
        "B" | "2" => Some(MetaChoice::Second),
        _ => None,
    }
}
