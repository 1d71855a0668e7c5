//! Background cache warm-up
//!
//! Re-answers a fixed list of common prompts on an interval so their cache
//! entries stay fresh. The task stops when its cancellation token fires.

use super::run_ensemble::{RunEnsembleUseCase, RunOptions};
use crate::ports::llm_gateway::LlmGateway;
use ensemble_domain::{CacheScope, Tier};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const WARM_USER: &str = "cache-warmer";

pub struct CacheWarmer;

impl CacheWarmer {
    /// Spawn the warm-up loop. The first round runs immediately.
    pub fn spawn<G: LlmGateway + 'static>(
        use_case: Arc<RunEnsembleUseCase<G>>,
        interval: Duration,
        prompts: Vec<String>,
        tier: Tier,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            if prompts.is_empty() || use_case.cache().is_none() {
                debug!("Cache warmer has nothing to do");
                return;
            }
            if use_case.config().cache.scope == CacheScope::User {
                warn!("Cache warm-up skipped: entries are scoped per user");
                return;
            }

            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let warmed = Self::warm(&use_case, &prompts, tier, &cancel).await;
                        info!(warmed, total = prompts.len(), "Cache warm-up round complete");
                    }
                }
            }
            debug!("Cache warmer stopped");
        })
    }

    async fn warm<G: LlmGateway + 'static>(
        use_case: &RunEnsembleUseCase<G>,
        prompts: &[String],
        tier: Tier,
        cancel: &CancellationToken,
    ) -> usize {
        let mut warmed = 0;
        for prompt in prompts {
            if cancel.is_cancelled() {
                break;
            }
            let options = RunOptions::for_tier(tier).bypassing_cache();
            match use_case
                .run_ensemble(prompt, WARM_USER, WARM_USER, options)
                .await
            {
                Ok(result) if result.is_cacheable() => warmed += 1,
                Ok(_) => debug!(prompt = %prompt, "Warm-up result not cacheable"),
                Err(e) => warn!(prompt = %prompt, "Warm-up prompt rejected: {}", e),
            }
        }
        warmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::cache::service::tests::MapStore;
    use crate::config::{CacheSettings, EnsembleConfig};
    use crate::use_cases::dispatch::tests::{ScriptedGateway, reply};
    use ensemble_domain::{AbstentionConfig, Model};

    fn warm_use_case(scope: CacheScope) -> (Arc<ScriptedGateway>, Arc<MapStore>, Arc<RunEnsembleUseCase<ScriptedGateway>>) {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .with(Model::Gpt4oMini, reply("Ownership moves values. Borrowing lends them.", 100))
                .with(Model::Gemini20Flash, reply("Values have one owner; references borrow.", 100))
                .with(Model::ClaudeHaiku35, reply("Each value has a single owner at a time.", 100))
                .with_synthesis(reply("Each value has one owner and may be borrowed.", 100)),
        );
        let settings = CacheSettings::default().with_scope(scope);
        let config = EnsembleConfig::default()
            .with_abstention(AbstentionConfig {
                enabled: false,
                ..AbstentionConfig::default()
            })
            .with_cache(settings.clone());
        let store = Arc::new(MapStore::default());
        let use_case = RunEnsembleUseCase::new(Arc::clone(&gateway), config)
            .with_cache(ResponseCache::new(store.clone(), settings));
        (gateway, store, Arc::new(use_case))
    }

    #[tokio::test(start_paused = true)]
    async fn test_warms_then_stops_on_cancel() {
        let (gateway, store, use_case) = warm_use_case(CacheScope::Tier);
        let cancel = CancellationToken::new();
        let handle = CacheWarmer::spawn(
            use_case,
            Duration::from_secs(600),
            vec!["Explain Rust ownership".into(), "What is borrowing?".into()],
            Tier::Free,
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.entries.lock().unwrap().len(), 2);
        assert_eq!(gateway.provider_calls(), 6);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_scope_is_skipped() {
        let (gateway, store, use_case) = warm_use_case(CacheScope::User);
        let handle = CacheWarmer::spawn(
            use_case,
            Duration::from_secs(600),
            vec!["Explain Rust ownership".into()],
            Tier::Free,
            CancellationToken::new(),
        );
        handle.await.unwrap();
        assert!(store.entries.lock().unwrap().is_empty());
        assert_eq!(gateway.provider_calls(), 0);
    }
}
