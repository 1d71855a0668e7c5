//! Synthesis of the final answer
//!
//! Asks the tier's synthesizer model to merge the weighted candidates. Any
//! failure (error, blank answer, deadline) degrades to the deterministic
//! fallback composition; this use case never returns an error.

use crate::ports::llm_gateway::{CompletionRequest, LlmGateway};
use crate::ports::progress::{EnsemblePhase, ProgressNotifier};
use ensemble_domain::{
    ConsensusGrade, PromptTemplate, SynthesisCandidate, SynthesisConfig, SynthesisResult,
    TierConfig,
};
use std::sync::Arc;
use tokio::time::{Instant, timeout_at};
use tracing::{info, warn};

/// Inputs of one synthesis call
pub struct SynthesisInput<'a> {
    pub question: &'a str,
    /// Fulfilled responses, heaviest first
    pub candidates: &'a [SynthesisCandidate],
    pub diversity: f64,
    pub consensus: ConsensusGrade,
    pub tier: &'a TierConfig,
    pub deadline: Instant,
}

pub struct SynthesizeUseCase<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    config: SynthesisConfig,
}

impl<G: LlmGateway + 'static> SynthesizeUseCase<G> {
    pub fn new(gateway: Arc<G>, config: SynthesisConfig) -> Self {
        Self { gateway, config }
    }

    pub async fn execute(
        &self,
        input: SynthesisInput<'_>,
        progress: &dyn ProgressNotifier,
    ) -> SynthesisResult {
        if input.candidates.is_empty() {
            return SynthesisResult::error("No responses to synthesize");
        }

        progress.on_phase_start(EnsemblePhase::Synthesis, 1);
        let result = self.synthesize(&input).await;
        progress.on_phase_complete(EnsemblePhase::Synthesis);
        result
    }

    /// Deterministic composition without calling the synthesizer
    pub fn fallback(&self, candidates: &[SynthesisCandidate], reason: &str) -> SynthesisResult {
        SynthesisResult::fallback(candidates, reason, &self.config)
    }

    async fn synthesize(&self, input: &SynthesisInput<'_>) -> SynthesisResult {
        let now = Instant::now();
        if now >= input.deadline {
            warn!("Pipeline deadline exceeded before synthesis");
            return self.fallback(input.candidates, "Pipeline deadline exceeded");
        }

        let tier = input.tier;
        let prompt = PromptTemplate::synthesis_prompt(
            input.question,
            input.candidates,
            self.config.per_response_chars,
            self.config.total_chars,
        );
        let request = CompletionRequest::new(
            tier.synthesizer.clone(),
            PromptTemplate::synthesis_system(),
            prompt,
        )
        .with_max_tokens(tier.synthesis_max_tokens)
        .with_temperature(tier.synthesis_temperature);

        let limit = input.deadline.min(now + tier.provider_timeout);
        match timeout_at(limit, self.gateway.invoke(&request)).await {
            Ok(Ok(content)) if !content.trim().is_empty() => {
                let result = SynthesisResult::success(
                    content,
                    tier.synthesizer.clone(),
                    input.candidates,
                    input.diversity,
                    input.consensus,
                    &self.config,
                );
                info!(
                    model = %tier.synthesizer,
                    confidence = result.confidence,
                    "Synthesis complete"
                );
                result
            }
            Ok(Ok(_)) => {
                warn!(model = %tier.synthesizer, "Synthesizer returned empty content");
                self.fallback(input.candidates, "Synthesizer returned empty content")
            }
            Ok(Err(e)) => {
                warn!(model = %tier.synthesizer, "Synthesis failed: {}", e);
                self.fallback(input.candidates, &format!("Synthesis failed: {}", e))
            }
            Err(_) => {
                warn!(model = %tier.synthesizer, "Synthesis timed out");
                self.fallback(input.candidates, "Synthesis timed out")
            }
        }
    }
}
