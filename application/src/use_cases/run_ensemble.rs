//! Run Ensemble use case
//!
//! Orchestrates one request end to end: cache lookup, memory context,
//! dispatch, scoring, diversity, voting, meta-voting, synthesis, the
//! abstention gate with its bounded re-queries, and write-through.

use super::dispatch::DispatchUseCase;
use super::meta_vote::MetaVoteUseCase;
use super::requery::{RequeryPermit, RequeryTracker};
use super::synthesize::{SynthesisInput, SynthesizeUseCase};
use crate::cache::{CacheLookup, ResponseCache};
use crate::config::EnsembleConfig;
use crate::metrics::{EnsembleMetrics, MetricsSnapshot};
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::memory::{MemoryPort, MemoryRecord};
use crate::ports::progress::{EnsemblePhase, NoProgress, ProgressNotifier};
use crate::ports::reliability::{ReliabilityError, ReliabilityFeed};
use crate::ports::semantic_confidence::SemanticConfidencePort;
use ensemble_domain::synthesis::candidates;
use ensemble_domain::voting::ReliabilityTable;
use ensemble_domain::{
    AbstentionDecision, AbstentionGate, AbstentionReport, CacheFlags, ConfidenceScorer,
    DiversityAnalyzer, DiversityResult, DomainError, EnsembleRequest, EnsembleResult, Metadata,
    ProviderResponse, QualitySignals, RoleResult, ScoredResponse, SynthesisResult, Tier,
    TierConfig, VotingConfig, VotingEngine, VotingReport,
};
use futures::future::join_all;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

/// Errors that prevent a request from being built. Everything that goes
/// wrong after that is reported inside the [`EnsembleResult`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunEnsembleError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("No providers configured for tier {0}")]
    NoProviders(String),

    #[error("Tier {tier} has more than one provider with role {role}")]
    DuplicateRole { tier: String, role: String },
}

impl From<DomainError> for RunEnsembleError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NoProviders(tier) => RunEnsembleError::NoProviders(tier),
            DomainError::DuplicateRole { tier, role } => RunEnsembleError::DuplicateRole { tier, role },
            _ => RunEnsembleError::EmptyPrompt,
        }
    }
}

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub tier: Tier,
    /// Skip the cache read (results are still written through)
    pub bypass_cache: bool,
    /// Generated when absent
    pub correlation_id: Option<String>,
}

impl RunOptions {
    pub fn for_tier(tier: Tier) -> Self {
        Self {
            tier,
            ..Self::default()
        }
    }

    pub fn bypassing_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// One pass of the pipeline that produced at least one fulfilled response
struct Completed {
    scored: Vec<ScoredResponse>,
    diversity: DiversityResult,
    voting: VotingReport,
    synthesis: SynthesisResult,
}

impl Completed {
    fn evaluate(&self, gate: &AbstentionGate) -> AbstentionDecision {
        let signals = QualitySignals::collect(&self.scored, &self.voting.result, &self.diversity);
        gate.evaluate(&signals)
    }
}

enum PipelineOutcome {
    Completed(Box<Completed>),
    /// No provider fulfilled
    Degraded(String),
}

/// Use case for answering one prompt with the provider ensemble
pub struct RunEnsembleUseCase<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    config: EnsembleConfig,
    scorer: ConfidenceScorer,
    analyzer: DiversityAnalyzer,
    voting: RwLock<Arc<VotingEngine>>,
    gate: AbstentionGate,
    tracker: RequeryTracker,
    cache: Option<ResponseCache>,
    memory: Option<Arc<dyn MemoryPort>>,
    semantic: Option<Arc<dyn SemanticConfidencePort>>,
    reliability: Option<Arc<dyn ReliabilityFeed>>,
    metrics: EnsembleMetrics,
}

impl<G: LlmGateway + 'static> RunEnsembleUseCase<G> {
    pub fn new(gateway: Arc<G>, config: EnsembleConfig) -> Self {
        let abstention = &config.abstention;
        let tracker = RequeryTracker::new(
            abstention.max_requery_attempts,
            Duration::from_millis(abstention.cooldown_ms),
            Duration::from_secs(abstention.tracker_ttl_secs),
        );
        Self {
            gateway,
            scorer: ConfidenceScorer::new(config.scoring.clone()),
            analyzer: DiversityAnalyzer::new(config.diversity.clone()),
            voting: RwLock::new(Arc::new(VotingEngine::new(config.voting.clone()))),
            gate: AbstentionGate::new(config.abstention.clone()),
            tracker,
            cache: None,
            memory: None,
            semantic: None,
            reliability: None,
            metrics: EnsembleMetrics::new(),
            config,
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryPort>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_semantic_confidence(mut self, semantic: Arc<dyn SemanticConfidencePort>) -> Self {
        self.semantic = Some(semantic);
        self
    }

    pub fn with_reliability_feed(mut self, feed: Arc<dyn ReliabilityFeed>) -> Self {
        self.reliability = Some(feed);
        self
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Voting configuration currently in effect
    pub fn voting_config(&self) -> VotingConfig {
        self.voting_engine().config().clone()
    }

    fn voting_engine(&self) -> Arc<VotingEngine> {
        match self.voting.read() {
            Ok(engine) => Arc::clone(&engine),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Pull historical accuracy from the reliability feed and swap the
    /// reliability table. On failure the previous table stays in effect.
    /// Returns the number of providers in the new table.
    pub async fn refresh_reliability(&self) -> Result<usize, ReliabilityError> {
        let Some(feed) = &self.reliability else {
            return Ok(self.voting_engine().config().reliability.len());
        };

        let accuracy = match feed.provider_accuracy().await {
            Ok(accuracy) => accuracy,
            Err(e) => {
                warn!("Reliability refresh failed, keeping previous table: {}", e);
                return Err(e);
            }
        };

        let table = ReliabilityTable::from_accuracy(&accuracy);
        let providers = table.len();
        let engine = Arc::new(VotingEngine::new(
            self.voting_engine().config().clone().with_reliability(table),
        ));
        match self.voting.write() {
            Ok(mut current) => *current = engine,
            Err(poisoned) => *poisoned.into_inner() = engine,
        }
        info!(providers, "Reliability table refreshed");
        Ok(providers)
    }

    /// Answer a prompt with default (no-op) progress
    pub async fn run_ensemble(
        &self,
        prompt: &str,
        user_id: &str,
        session_id: &str,
        options: RunOptions,
    ) -> Result<EnsembleResult, RunEnsembleError> {
        self.run_with_progress(prompt, user_id, session_id, options, &NoProgress)
            .await
    }

    /// Answer a prompt with progress callbacks
    pub async fn run_with_progress(
        &self,
        prompt: &str,
        user_id: &str,
        session_id: &str,
        options: RunOptions,
        progress: &dyn ProgressNotifier,
    ) -> Result<EnsembleResult, RunEnsembleError> {
        let started = Instant::now();
        let correlation_id = options
            .correlation_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let tier = self.config.tiers.get(options.tier).clone();
        let mut request =
            EnsembleRequest::new(prompt, user_id, session_id, tier, correlation_id.clone())?;

        info!(
            correlation_id = %correlation_id,
            tier = %options.tier,
            "Starting ensemble"
        );

        let scope = self.config.cache.scope_value(options.tier, user_id);
        if !options.bypass_cache
            && let Some(cache) = &self.cache
            && let CacheLookup::Hit { result, flags } = cache.lookup(prompt, &scope).await
        {
            let similarity = flags.similarity.unwrap_or(1.0);
            progress.on_cache_hit(similarity);
            let result = self.finish_cached(*result, flags, &correlation_id, started);
            info!(
                correlation_id = %correlation_id,
                similarity,
                "Served from cache"
            );
            return Ok(result);
        }

        let deadline = started + self.config.pipeline.deadline;
        if let Some(memory) = &self.memory {
            let fetch =
                memory.get_memory_context(user_id, session_id, request.tier.memory_max_tokens);
            match timeout_at(self.auxiliary_deadline(deadline), fetch).await {
                Ok(Ok(context)) => request = request.with_memory_context(context),
                Ok(Err(e)) => {
                    warn!(correlation_id = %correlation_id, "Memory context unavailable: {}", e)
                }
                Err(_) => warn!(correlation_id = %correlation_id, "Memory context timed out"),
            }
        }

        self.tracker.purge_expired();
        let mut result = match self
            .run_pipeline(&request, &request.tier, deadline, progress)
            .await
        {
            PipelineOutcome::Degraded(error) => {
                warn!(correlation_id = %correlation_id, "Degraded result: {}", error);
                EnsembleResult::degraded(
                    &correlation_id,
                    options.tier.as_str(),
                    error,
                    self.voting_engine().config().version.clone(),
                )
            }
            PipelineOutcome::Completed(completed) => {
                let (completed, report) = self
                    .abstention_loop(&request, *completed, progress)
                    .await;
                self.assemble(&request, completed, report)
            }
        };

        result.metadata.processing_time_ms = started.elapsed().as_millis() as u64;
        result.metadata.timestamp = chrono::Utc::now().to_rfc3339();
        self.metrics.record(&result);

        if let Some(cache) = &self.cache {
            cache.store(prompt, &scope, &result).await;
        }
        self.remember(&request, &result);

        info!(
            correlation_id = %correlation_id,
            consensus = %result.voting.result.consensus,
            winner = result.winner().unwrap_or("-"),
            processing_ms = result.metadata.processing_time_ms,
            "Ensemble complete"
        );
        Ok(result)
    }

    /// One pass: dispatch, score, analyze, vote, arbitrate, synthesize.
    async fn run_pipeline(
        &self,
        request: &EnsembleRequest,
        tier: &TierConfig,
        deadline: Instant,
        progress: &dyn ProgressNotifier,
    ) -> PipelineOutcome {
        let prompt = request.effective_prompt();
        let dispatch = DispatchUseCase::new(Arc::clone(&self.gateway))
            .execute(tier, &prompt, deadline, progress)
            .await;

        if dispatch.fulfilled() == 0 {
            let error = if dispatch.deadline_hit {
                "All providers failed: pipeline deadline exceeded"
            } else {
                "All providers failed"
            };
            return PipelineOutcome::Degraded(error.to_string());
        }

        progress.on_phase_start(EnsemblePhase::Voting, dispatch.fulfilled());
        let scored = self.score(&dispatch.responses, deadline).await;
        let diversity = self.analyzer.analyze(&dispatch.responses);
        let voting = self.voting_engine().vote(&scored, &diversity);
        if voting.fallback_used {
            warn!(
                correlation_id = %request.correlation_id,
                "Voting fell back to equal weights: {}",
                voting.error.as_deref().unwrap_or("unknown error")
            );
        }
        debug!(
            correlation_id = %request.correlation_id,
            consensus = %voting.consensus,
            confidence = voting.confidence,
            diversity = diversity.overall,
            "Vote complete"
        );
        progress.on_phase_complete(EnsemblePhase::Voting);

        let candidates = candidates(&scored, &voting);
        let question = request.prompt.content();

        let meta_voting = if self.config.pipeline.meta_voting
            && !dispatch.deadline_hit
            && MetaVoteUseCase::<G>::applies(&voting, &candidates)
        {
            MetaVoteUseCase::new(
                Arc::clone(&self.gateway),
                self.config.synthesis.per_response_chars,
                self.config.pipeline.meta_vote_max_tokens,
            )
            .execute(question, &voting, &candidates, tier, deadline)
            .await
        } else {
            None
        };

        let synthesizer =
            SynthesizeUseCase::new(Arc::clone(&self.gateway), self.config.synthesis.clone());
        let synthesis = if dispatch.deadline_hit {
            synthesizer.fallback(&candidates, "Pipeline deadline exceeded")
        } else {
            synthesizer
                .execute(
                    SynthesisInput {
                        question,
                        candidates: &candidates,
                        diversity: diversity.overall,
                        consensus: voting.consensus,
                        tier,
                        deadline,
                    },
                    progress,
                )
                .await
        };

        let mut report = VotingReport::new(voting);
        report.meta_voting = meta_voting;
        PipelineOutcome::Completed(Box::new(Completed {
            scored,
            diversity,
            voting: report,
            synthesis,
        }))
    }

    fn auxiliary_deadline(&self, deadline: Instant) -> Instant {
        deadline.min(Instant::now() + self.config.pipeline.auxiliary_timeout)
    }

    /// Scores every response; semantic signals that miss the auxiliary
    /// bound fall back to structural-only scoring.
    async fn score(&self, responses: &[ProviderResponse], deadline: Instant) -> Vec<ScoredResponse> {
        let semantic = match &self.semantic {
            Some(port) => {
                let bound = self.auxiliary_deadline(deadline);
                join_all(responses.iter().map(|r| async move {
                    if !r.is_fulfilled() {
                        return None;
                    }
                    match timeout_at(bound, port.score(&r.content, r.latency_ms)).await {
                        Ok(Ok(signal)) => Some(signal),
                        Ok(Err(e)) => {
                            debug!(provider = %r.role, "Semantic confidence unavailable: {}", e);
                            None
                        }
                        Err(_) => {
                            warn!(provider = %r.role, "Semantic confidence timed out");
                            None
                        }
                    }
                }))
                .await
            }
            None => vec![None; responses.len()],
        };

        responses
            .iter()
            .zip(&semantic)
            .map(|(response, signal)| self.scorer.score(response, signal.as_ref()))
            .collect()
    }

    /// Gate the result and re-query while it keeps failing and attempts
    /// remain. A re-query replaces the current result only when its quality
    /// beats it by the configured ratio.
    async fn abstention_loop(
        &self,
        request: &EnsembleRequest,
        original: Completed,
        progress: &dyn ProgressNotifier,
    ) -> (Completed, AbstentionReport) {
        progress.on_phase_start(EnsemblePhase::Abstention, 1);
        let decision = original.evaluate(&self.gate);
        progress.on_phase_complete(EnsemblePhase::Abstention);

        let mut best = original;
        let mut report = AbstentionReport::new(decision);
        let correlation_id = request.correlation_id.as_str();

        self.metrics.record_abstention(&report.decision.reasons);

        while report.decision.triggered {
            let Some(kind) = report.decision.strategy else {
                break;
            };
            warn!(
                correlation_id,
                severity = ?report.decision.severity,
                strategy = %kind,
                quality = report.decision.quality_score,
                "Abstention triggered: {:?}",
                report.decision.reasons
            );

            let wait = match self.tracker.try_acquire(correlation_id) {
                RequeryPermit::Granted { attempt, wait } => {
                    report.attempts = attempt;
                    wait
                }
                RequeryPermit::Exhausted => {
                    report.attempts = self.tracker.attempts(correlation_id);
                    break;
                }
            };
            tokio::time::sleep(wait).await;

            let tier = self.config.strategies.get(kind).apply(&request.tier);
            progress.on_phase_start(EnsemblePhase::Requery, tier.slots.len());
            let deadline = Instant::now() + self.config.pipeline.deadline;
            let outcome = self.run_pipeline(request, &tier, deadline, progress).await;
            progress.on_phase_complete(EnsemblePhase::Requery);

            let PipelineOutcome::Completed(candidate) = outcome else {
                info!(correlation_id, attempt = report.attempts, "Re-query degraded, keeping result");
                self.metrics.record_requery(false);
                continue;
            };

            let decision = candidate.evaluate(&self.gate);
            self.metrics.record_abstention(&decision.reasons);
            let quality = decision.quality_score;
            report.requery_quality = Some(report.requery_quality.map_or(quality, |q| q.max(quality)));

            let accepted =
                quality > report.decision.quality_score * self.gate.config().improvement_ratio;
            self.metrics.record_requery(accepted);
            info!(
                correlation_id,
                attempt = report.attempts,
                quality,
                previous = report.decision.quality_score,
                accepted,
                "Re-query evaluated"
            );
            if accepted {
                best = *candidate;
                report.decision = decision;
                report.requery_accepted = true;
            }
        }

        report.quality_unverified = report.decision.triggered;
        if report.quality_unverified {
            warn!(correlation_id, "Re-queries exhausted, result quality unverified");
        }
        (best, report)
    }

    fn assemble(
        &self,
        request: &EnsembleRequest,
        completed: Completed,
        report: AbstentionReport,
    ) -> EnsembleResult {
        let Completed {
            scored,
            mut voting,
            synthesis,
            ..
        } = completed;
        voting.abstention = Some(report);
        EnsembleResult {
            synthesis,
            roles: scored.iter().map(RoleResult::from).collect(),
            voting,
            metadata: Metadata {
                processing_time_ms: 0,
                correlation_id: request.correlation_id.clone(),
                tier: request.tier.tier.to_string(),
                timestamp: String::new(),
                cache_flags: CacheFlags::default(),
                degraded: false,
                error: None,
            },
        }
    }

    fn finish_cached(
        &self,
        mut result: EnsembleResult,
        flags: CacheFlags,
        correlation_id: &str,
        started: Instant,
    ) -> EnsembleResult {
        result.metadata.correlation_id = correlation_id.to_string();
        result.metadata.cache_flags = flags;
        result.metadata.processing_time_ms = started.elapsed().as_millis() as u64;
        result.metadata.timestamp = chrono::Utc::now().to_rfc3339();
        self.metrics.record(&result);
        result
    }

    /// Store the exchange in memory without waiting for it
    fn remember(&self, request: &EnsembleRequest, result: &EnsembleResult) {
        let Some(memory) = &self.memory else {
            return;
        };
        if result.is_degraded() {
            return;
        }

        let records = [
            MemoryRecord {
                user_id: request.user_id.clone(),
                session_id: request.session_id.clone(),
                content: request.prompt.content().to_string(),
                is_user_prompt: true,
                quality_score: None,
                model: None,
                ensemble_mode: true,
            },
            MemoryRecord {
                user_id: request.user_id.clone(),
                session_id: request.session_id.clone(),
                content: result.synthesis.content.clone(),
                is_user_prompt: false,
                quality_score: result.quality_score(),
                model: result.synthesis.model.as_ref().map(|m| m.to_string()),
                ensemble_mode: true,
            },
        ];

        let memory = Arc::clone(memory);
        let correlation_id = request.correlation_id.clone();
        tokio::spawn(async move {
            for record in records {
                if let Err(e) = memory.store_memory(record).await {
                    warn!(correlation_id = %correlation_id, "Memory store failed: {}", e);
                }
            }
        });
    }
}
