//! CLI command definitions

use clap::{Parser, ValueEnum};
use ensemble_domain::{OutputFormat, Tier};
use std::path::PathBuf;

/// Output format for ensemble results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    /// Synthesis plus every provider answer and the vote
    Full,
    /// Only the final synthesis
    Synthesis,
    /// JSON output
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Full => OutputFormat::Full,
            OutputFormatArg::Synthesis => OutputFormat::Synthesis,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Service tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TierArg {
    Free,
    Premium,
}

impl From<TierArg> for Tier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Free => Tier::Free,
            TierArg::Premium => Tier::Premium,
        }
    }
}

/// CLI arguments for ensemble
#[derive(Parser, Debug)]
#[command(name = "ensemble")]
#[command(author, version, about = "Ask several LLMs at once and get one voted, synthesized answer")]
#[command(long_about = r#"
Ensemble sends your prompt to several LLM providers in parallel, scores and
votes on their answers, and synthesizes a final response. Weak results are
re-queried with an adjusted strategy; good ones are cached.

Configuration files are loaded from (in priority order):
1. ENSEMBLE_* environment variables
2. --config <path>     Explicit config file
3. ./ensemble.toml     Project-level config
4. ~/.config/ensemble/config.toml   Global config

Example:
  ensemble "What's the best way to handle errors in Rust?"
  ensemble --tier premium -o full "Compare tokio and async-std"
  ensemble --stats -o json "Explain the borrow checker"
"#)]
pub struct Cli {
    /// The prompt to answer
    pub prompt: Option<String>,

    /// Service tier (decides providers and budgets)
    #[arg(short, long, value_enum, default_value = "free")]
    pub tier: TierArg,

    /// User id (cache scope and memory)
    #[arg(long, default_value = "cli")]
    pub user: String,

    /// Session id (memory)
    #[arg(long, default_value = "default")]
    pub session: String,

    /// Output format (defaults to the config file, then "synthesis")
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormatArg>,

    /// Skip the cache lookup (the result is still written back)
    #[arg(long)]
    pub no_cache: bool,

    /// Print pipeline metrics after the answer
    #[arg(long)]
    pub stats: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Also write logs to daily rolling files in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Keep the configured warm-up prompts fresh in the cache until Ctrl-C
    #[arg(long)]
    pub warm: bool,
}
