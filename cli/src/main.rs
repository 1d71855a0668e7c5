//! CLI entrypoint for ensemble
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use ensemble_application::{
    CacheStore, CacheWarmer, NoProgress, ResponseCache, RunEnsembleUseCase, RunOptions,
};
use ensemble_infrastructure::{
    CacheStoreSettings, ConfigLoader, FileCacheStore, MemoryCacheStore, RoutingGateway,
    TieredCacheStore,
};
use ensemble_presentation::{Cli, ConsoleFormatter, OutputConfig, OutputFormatter, ProgressReporter};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(&cli);

    if cli.show_config {
        for line in ConfigLoader::describe_sources(cli.config.as_deref()) {
            println!("{}", line);
        }
        return Ok(());
    }

    // Load configuration
    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    let resolved = file_config.resolve()?;
    for issue in &resolved.warnings {
        warn!("config: {}", issue);
    }

    let output = OutputConfig::merge(
        cli.output.map(Into::into),
        cli.quiet,
        file_config.output.format,
        file_config.output.color,
        file_config.output.show_progress,
    );
    if !output.color {
        colored::control::set_override(false);
    }

    // === Dependency Injection ===
    let gateway = Arc::new(RoutingGateway::from_config(resolved.providers));
    let ensemble = resolved.ensemble;

    let mut use_case = RunEnsembleUseCase::new(gateway, ensemble.clone());
    if ensemble.cache.enabled {
        let store = open_cache_store(&resolved.cache_store).await;
        use_case = use_case.with_cache(ResponseCache::new(store, ensemble.cache.clone()));
    }
    let use_case = Arc::new(use_case);

    if cli.warm {
        return warm_until_interrupted(use_case).await;
    }

    let prompt = match cli.prompt {
        Some(p) => p,
        None => bail!("A prompt is required. Use --warm to only refresh the cache."),
    };

    let mut options = RunOptions::for_tier(cli.tier.into());
    if cli.no_cache {
        options = options.bypassing_cache();
    }

    let result = if output.show_progress {
        let progress = ProgressReporter::new();
        use_case
            .run_with_progress(&prompt, &cli.user, &cli.session, options, &progress)
            .await?
    } else {
        use_case
            .run_with_progress(&prompt, &cli.user, &cli.session, options, &NoProgress)
            .await?
    };

    println!("{}", ConsoleFormatter.render(output.format, &result));

    if cli.stats {
        println!("{}", ConsoleFormatter::format_stats(&use_case.metrics()));
    }

    Ok(())
}

/// Console logging filtered by `-v`, plus an optional daily log file
fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let (file_layer, guard) = match &cli.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "ensemble.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    guard
}

/// Memory in front of the file store; memory only when no directory is usable
async fn open_cache_store(settings: &CacheStoreSettings) -> Arc<dyn CacheStore> {
    let memory = MemoryCacheStore::new(settings.memory_capacity);
    let Some(dir) = settings
        .directory
        .clone()
        .or_else(ConfigLoader::default_cache_dir)
    else {
        warn!("No cache directory available, caching in memory only");
        return Arc::new(memory);
    };

    match FileCacheStore::open(&dir, settings.compress_min_bytes).await {
        Ok(file) => {
            info!(dir = %dir.display(), "Cache store opened");
            Arc::new(TieredCacheStore::new(memory, Arc::new(file)))
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cache directory unusable, caching in memory only");
            Arc::new(memory)
        }
    }
}

async fn warm_until_interrupted(
    use_case: Arc<RunEnsembleUseCase<RoutingGateway>>,
) -> Result<()> {
    let settings = use_case.config().cache.clone();
    if !settings.enabled || settings.warm_prompts.is_empty() {
        bail!("Nothing to warm: enable [cache] and set cache.warm_prompts");
    }

    let count = settings.warm_prompts.len();
    let cancel = CancellationToken::new();
    let handle = CacheWarmer::spawn(
        use_case,
        settings.warm_interval,
        settings.warm_prompts,
        settings.warm_tier,
        cancel.clone(),
    );
    println!("Warming {} prompt(s); press Ctrl-C to stop", count);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    cancel.cancel();
    handle.await.context("Cache warmer task failed")?;
    Ok(())
}
