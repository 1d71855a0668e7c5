//! Meta-voting
//!
//! When consensus is weak the synthesizer model is asked to judge between
//! the two heaviest candidates. The verdict is recorded next to the vote and
//! never changes it.

use crate::ports::llm_gateway::{CompletionRequest, LlmGateway};
use ensemble_domain::voting::parse_meta_vote;
use ensemble_domain::{
    MetaVotingRecord, PromptTemplate, SynthesisCandidate, TierConfig, VotingResult,
};
use std::sync::Arc;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

pub struct MetaVoteUseCase<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    per_response_chars: usize,
    max_tokens: u32,
}

impl<G: LlmGateway + 'static> MetaVoteUseCase<G> {
    pub fn new(gateway: Arc<G>, per_response_chars: usize, max_tokens: u32) -> Self {
        Self {
            gateway,
            per_response_chars,
            max_tokens,
        }
    }

    /// Whether a vote qualifies for arbitration
    pub fn applies(voting: &VotingResult, candidates: &[SynthesisCandidate]) -> bool {
        voting.consensus.is_weak() && candidates.len() >= 2
    }

    /// Judge the top two candidates. `candidates` must be ordered heaviest
    /// first; returns `None` when fewer than two are given.
    pub async fn execute(
        &self,
        question: &str,
        voting: &VotingResult,
        candidates: &[SynthesisCandidate],
        tier: &TierConfig,
        deadline: Instant,
    ) -> Option<MetaVotingRecord> {
        let [first, second, ..] = candidates else {
            return None;
        };
        let roles = [first.role.as_str(), second.role.as_str()];

        let now = Instant::now();
        if now >= deadline {
            return Some(MetaVotingRecord::failed(roles, "Pipeline deadline exceeded"));
        }

        let request = CompletionRequest::new(
            tier.synthesizer.clone(),
            PromptTemplate::meta_vote_system(),
            PromptTemplate::meta_vote_prompt(question, first, second, self.per_response_chars),
        )
        .with_max_tokens(self.max_tokens)
        .with_temperature(0.0);

        let limit = deadline.min(now + tier.provider_timeout);
        let record = match timeout_at(limit, self.gateway.invoke(&request)).await {
            Ok(Ok(answer)) => match parse_meta_vote(&answer) {
                Some((choice, reasoning)) => {
                    MetaVotingRecord::decided(roles, choice, reasoning, voting.winner.as_deref())
                }
                None => MetaVotingRecord::failed(roles, "Unparseable meta-vote answer"),
            },
            Ok(Err(e)) => MetaVotingRecord::failed(roles, e.to_string()),
            Err(_) => MetaVotingRecord::failed(roles, "Meta-vote timed out"),
        };

        match &record.error {
            Some(error) => warn!("Meta-vote failed: {}", error),
            None => debug!(
                choice = record.choice.as_deref().unwrap_or("-"),
                agrees = ?record.agrees_with_winner,
                "Meta-vote recorded"
            ),
        }
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::dispatch::tests::{Script, ScriptedGateway, reply};
    use ensemble_domain::{ConsensusGrade, Model};
    use std::time::Duration;

    fn candidate(role: &str, weight: f64) -> SynthesisCandidate {
        SynthesisCandidate {
            role: role.into(),
            model: Model::Gpt4oMini,
            content: format!("answer from {}", role),
            weight,
            confidence: 0.6,
        }
    }

    fn weak_vote() -> VotingResult {
        let mut voting = VotingResult::empty("2.1.0");
        voting.winner = Some("gpt4o".into());
        voting.consensus = ConsensusGrade::Weak;
        voting
    }

    #[test]
    fn test_applies_only_to_weak_consensus() {
        let two = [candidate("gpt4o", 0.52), candidate("claude", 0.48)];
        assert!(MetaVoteUseCase::<ScriptedGateway>::applies(&weak_vote(), &two));
        assert!(!MetaVoteUseCase::<ScriptedGateway>::applies(&weak_vote(), &two[..1]));

        let mut strong = weak_vote();
        strong.consensus = ConsensusGrade::Strong;
        assert!(!MetaVoteUseCase::<ScriptedGateway>::applies(&strong, &two));
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_disagreement_without_changing_vote() {
        let gateway = Arc::new(ScriptedGateway::new().with_meta_vote(reply(
            r#"{"choice": "B", "reasoning": "More precise."}"#,
            100,
        )));
        let use_case = MetaVoteUseCase::new(gateway, 2_000, 200);
        let voting = weak_vote();
        let candidates = [candidate("gpt4o", 0.52), candidate("claude", 0.48)];
        let deadline = Instant::now() + Duration::from_secs(30);

        let record = use_case
            .execute("q", &voting, &candidates, &TierConfig::free(), deadline)
            .await
            .unwrap();
        assert!(record.triggered);
        assert_eq!(record.choice.as_deref(), Some("claude"));
        assert_eq!(record.agrees_with_winner, Some(false));
        assert_eq!(voting.winner.as_deref(), Some("gpt4o"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparseable_answer_is_recorded() {
        let gateway = Arc::new(ScriptedGateway::new().with_meta_vote(reply("no idea", 10)));
        let use_case = MetaVoteUseCase::new(gateway, 2_000, 200);
        let candidates = [candidate("gpt4o", 0.52), candidate("claude", 0.48)];
        let deadline = Instant::now() + Duration::from_secs(30);

        let record = use_case
            .execute("q", &weak_vote(), &candidates, &TierConfig::free(), deadline)
            .await
            .unwrap();
        assert!(record.error.is_some());
        assert!(record.choice.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_recorded() {
        let gateway = Arc::new(ScriptedGateway::new().with_meta_vote(Script::Hang));
        let use_case = MetaVoteUseCase::new(gateway, 2_000, 200);
        let candidates = [candidate("gpt4o", 0.52), candidate("claude", 0.48)];
        let deadline = Instant::now() + Duration::from_secs(2);

        let record = use_case
            .execute("q", &weak_vote(), &candidates, &TierConfig::free(), deadline)
            .await
            .unwrap();
        assert_eq!(record.error.as_deref(), Some("Meta-vote timed out"));
    }
}
