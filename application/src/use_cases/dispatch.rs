//! Provider dispatch
//!
//! Fans one prompt out to every slot of a tier. Each call runs in its own
//! task under its own timeout; a shared deadline aborts whatever is still
//! outstanding. Responses come back in slot order regardless of which
//! provider finished first.

use crate::ports::llm_gateway::{CompletionRequest, LlmGateway};
use crate::ports::progress::{EnsemblePhase, ProgressNotifier};
use ensemble_domain::{PromptTemplate, ProviderResponse, RejectionKind, TierConfig};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

/// Settled slots of one dispatch
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// One response per slot, in slot order
    pub responses: Vec<ProviderResponse>,
    /// The pipeline deadline elapsed before every slot settled
    pub deadline_hit: bool,
}

impl DispatchOutcome {
    pub fn fulfilled(&self) -> usize {
        self.responses.iter().filter(|r| r.is_fulfilled()).count()
    }
}

/// Use case for querying all providers of a tier in parallel
pub struct DispatchUseCase<G: LlmGateway + 'static> {
    gateway: Arc<G>,
}

impl<G: LlmGateway + 'static> DispatchUseCase<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub async fn execute(
        &self,
        tier: &TierConfig,
        prompt: &str,
        deadline: Instant,
        progress: &dyn ProgressNotifier,
    ) -> DispatchOutcome {
        info!(
            tier = %tier.tier,
            providers = tier.slots.len(),
            "Dispatching prompt"
        );
        progress.on_phase_start(EnsemblePhase::Dispatch, tier.slots.len());

        let started = Instant::now();
        let mut join_set = JoinSet::new();

        for (index, slot) in tier.slots.iter().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            let role = slot.role.clone();
            let request =
                CompletionRequest::new(slot.model.clone(), PromptTemplate::provider_system(), prompt)
                    .with_max_tokens(tier.max_tokens)
                    .with_temperature(tier.temperature);
            let limit = tier.provider_timeout;

            join_set.spawn(async move {
                let call_started = Instant::now();
                let outcome = timeout(limit, gateway.invoke(&request)).await;
                let latency_ms = call_started.elapsed().as_millis() as u64;
                let model = request.model;
                let response = match outcome {
                    Ok(Ok(content)) => ProviderResponse::fulfilled(role, model, content, latency_ms),
                    Ok(Err(e)) => {
                        ProviderResponse::rejected(role, model, e.rejection_kind(), e.to_string(), latency_ms)
                    }
                    Err(_) => ProviderResponse::rejected(
                        role,
                        model,
                        RejectionKind::Timeout,
                        format!("Provider timed out after {}ms", limit.as_millis()),
                        latency_ms,
                    ),
                };
                (index, response)
            });
        }

        let mut settled: Vec<Option<ProviderResponse>> = vec![None; tier.slots.len()];
        let mut deadline_hit = false;
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                joined = join_set.join_next() => match joined {
                    Some(Ok((index, response))) => {
                        if response.is_fulfilled() {
                            debug!(
                                provider = %response.role,
                                latency_ms = response.latency_ms,
                                "Provider responded"
                            );
                        } else {
                            warn!(
                                provider = %response.role,
                                latency_ms = response.latency_ms,
                                "Provider rejected: {}",
                                response.error.as_deref().unwrap_or("unknown error")
                            );
                        }
                        progress.on_provider_complete(
                            &response.role,
                            response.is_fulfilled(),
                            response.latency_ms,
                        );
                        settled[index] = Some(response);
                    }
                    Some(Err(e)) => warn!("Provider task failed: {}", e),
                    None => break,
                },
                _ = &mut sleep => {
                    deadline_hit = true;
                    join_set.abort_all();
                    warn!(
                        pending = join_set.len(),
                        "Pipeline deadline exceeded during dispatch"
                    );
                    break;
                }
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let responses: Vec<ProviderResponse> = settled
            .into_iter()
            .zip(&tier.slots)
            .map(|(response, slot)| match response {
                Some(response) => response,
                None if deadline_hit => {
                    progress.on_provider_complete(&slot.role, false, elapsed_ms);
                    ProviderResponse::rejected(
                        slot.role.clone(),
                        slot.model.clone(),
                        RejectionKind::Timeout,
                        "Pipeline deadline exceeded",
                        elapsed_ms,
                    )
                }
                None => ProviderResponse::rejected(
                    slot.role.clone(),
                    slot.model.clone(),
                    RejectionKind::Error,
                    "Provider task failed",
                    elapsed_ms,
                ),
            })
            .collect();

        progress.on_phase_complete(EnsemblePhase::Dispatch);
        let outcome = DispatchOutcome {
            responses,
            deadline_hit,
        };
        info!(
            fulfilled = outcome.fulfilled(),
            total = outcome.responses.len(),
            elapsed_ms,
            "Dispatch complete"
        );
        outcome
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ports::llm_gateway::GatewayError;
    use crate::ports::progress::NoProgress;
    use async_trait::async_trait;
    use ensemble_domain::{Model, ProviderSlot, ResponseStatus};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// What a scripted model does when invoked
    #[derive(Debug, Clone)]
    pub(crate) enum Script {
        Reply { content: String, delay: Duration },
        Fail(GatewayError),
        /// Fail this many times, then reply
        FailTimes(usize, String),
        Hang,
    }

    pub(crate) fn reply(content: &str, delay_ms: u64) -> Script {
        Script::Reply {
            content: content.to_string(),
            delay: Duration::from_millis(delay_ms),
        }
    }

    /// Gateway answering by model name (and by system prompt for the
    /// synthesis and meta-vote calls)
    #[derive(Default)]
    pub(crate) struct ScriptedGateway {
        scripts: HashMap<String, Script>,
        synthesis: Option<Script>,
        meta_vote: Option<Script>,
        pub calls: Mutex<Vec<CompletionRequest>>,
        failures: Mutex<HashMap<String, usize>>,
    }

    impl ScriptedGateway {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with(mut self, model: Model, script: Script) -> Self {
            self.scripts.insert(model.to_string(), script);
            self
        }

        pub(crate) fn with_synthesis(mut self, script: Script) -> Self {
            self.synthesis = Some(script);
            self
        }

        pub(crate) fn with_meta_vote(mut self, script: Script) -> Self {
            self.meta_vote = Some(script);
            self
        }

        pub(crate) fn calls_to(&self, model: &Model) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| &c.model == model && c.system_prompt == PromptTemplate::provider_system())
                .count()
        }

        pub(crate) fn provider_calls(&self) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.system_prompt == PromptTemplate::provider_system())
                .count()
        }

        pub(crate) fn system_calls(&self, system_prompt: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.system_prompt == system_prompt)
                .count()
        }
    }

    #[async_trait]
    impl LlmGateway for ScriptedGateway {
        async fn invoke(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
            self.calls.lock().unwrap().push(request.clone());
            let script = if request.system_prompt == PromptTemplate::synthesis_system() {
                self.synthesis.clone()
            } else if request.system_prompt == PromptTemplate::meta_vote_system() {
                self.meta_vote.clone()
            } else {
                self.scripts.get(request.model.as_str()).cloned()
            };

            match script {
                Some(Script::Reply { content, delay }) => {
                    tokio::time::sleep(delay).await;
                    Ok(content)
                }
                Some(Script::Fail(e)) => Err(e),
                Some(Script::FailTimes(n, content)) => {
                    let mut failures = self.failures.lock().unwrap();
                    let seen = failures.entry(request.model.to_string()).or_insert(0);
                    if *seen < n {
                        *seen += 1;
                        Err(GatewayError::RequestFailed("scripted failure".into()))
                    } else {
                        Ok(content)
                    }
                }
                Some(Script::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(GatewayError::Timeout)
                }
                None => Err(GatewayError::ModelNotAvailable(request.model.to_string())),
            }
        }
    }

    fn tier() -> TierConfig {
        TierConfig::free().with_slots(vec![
            ProviderSlot::new("gpt4o", Model::Gpt4oMini),
            ProviderSlot::new("gemini", Model::Gemini20Flash),
            ProviderSlot::new("claude", Model::ClaudeHaiku35),
        ])
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_in_slot_order() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .with(Model::Gpt4oMini, reply("first slot", 3_000))
                .with(Model::Gemini20Flash, reply("second slot", 100))
                .with(Model::ClaudeHaiku35, reply("third slot", 1_000)),
        );
        let outcome = DispatchUseCase::new(gateway)
            .execute(&tier(), "hi", far_deadline(), &NoProgress)
            .await;

        let roles: Vec<_> = outcome.responses.iter().map(|r| r.role.as_str()).collect();
        assert_eq!(roles, ["gpt4o", "gemini", "claude"]);
        assert_eq!(outcome.fulfilled(), 3);
        assert!(!outcome.deadline_hit);
        assert_eq!(outcome.responses[0].latency_ms, 3_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout_is_isolated() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .with(Model::Gpt4oMini, reply("fast", 200))
                .with(Model::Gemini20Flash, Script::Hang)
                .with(Model::ClaudeHaiku35, reply("also fast", 400)),
        );
        let outcome = DispatchUseCase::new(gateway)
            .execute(&tier(), "hi", far_deadline(), &NoProgress)
            .await;

        assert_eq!(outcome.fulfilled(), 2);
        assert_eq!(
            outcome.responses[1].status,
            ResponseStatus::Rejected(RejectionKind::Timeout)
        );
        assert_eq!(outcome.responses[1].latency_ms, 12_000);
        assert!(!outcome.deadline_hit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_become_rejected_slots() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .with(Model::Gpt4oMini, Script::Fail(GatewayError::RateLimited("429".into())))
                .with(Model::Gemini20Flash, reply("   ", 10))
                .with(Model::ClaudeHaiku35, reply("ok", 10)),
        );
        let outcome = DispatchUseCase::new(gateway)
            .execute(&tier(), "hi", far_deadline(), &NoProgress)
            .await;

        assert_eq!(
            outcome.responses[0].status,
            ResponseStatus::Rejected(RejectionKind::Error)
        );
        assert!(outcome.responses[0].error.as_deref().unwrap().contains("429"));
        assert_eq!(
            outcome.responses[1].status,
            ResponseStatus::Rejected(RejectionKind::Malformed)
        );
        assert!(outcome.responses[2].is_fulfilled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_outstanding() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .with(Model::Gpt4oMini, reply("fast", 100))
                .with(Model::Gemini20Flash, reply("slow", 9_000))
                .with(Model::ClaudeHaiku35, reply("fast too", 200)),
        );
        let deadline = Instant::now() + Duration::from_secs(5);
        let outcome = DispatchUseCase::new(gateway)
            .execute(&tier(), "hi", deadline, &NoProgress)
            .await;

        assert!(outcome.deadline_hit);
        assert_eq!(outcome.fulfilled(), 2);
        let gemini = &outcome.responses[1];
        assert_eq!(gemini.status, ResponseStatus::Rejected(RejectionKind::Timeout));
        assert_eq!(gemini.error.as_deref(), Some("Pipeline deadline exceeded"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_parameters_follow_tier() {
        let gateway = Arc::new(ScriptedGateway::new().with(Model::Gpt4oMini, reply("ok", 1)));
        let tier = tier().with_slots(vec![ProviderSlot::new("gpt4o", Model::Gpt4oMini)]);
        DispatchUseCase::new(Arc::clone(&gateway))
            .execute(&tier, "the prompt", far_deadline(), &NoProgress)
            .await;

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].user_prompt, "the prompt");
        assert_eq!(calls[0].max_tokens, tier.max_tokens);
        assert_eq!(calls[0].temperature, tier.temperature);
    }
}
