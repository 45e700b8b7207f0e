//! The `cache` CLI subcommand -- result cache inspection and maintenance.

use anyhow::Context;
use tracing::info;

use takeoff_cache::ResultCache;

use crate::commands::cache_options;
use crate::ExitCode;

// ---------------------------------------------------------------------------
// CacheArgs
// ---------------------------------------------------------------------------

/// Inspect or clear the result cache.
#[derive(Debug, clap::Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache sub-subcommands.
#[derive(Debug, clap::Subcommand)]
pub enum CacheAction {
    /// Show cache counters and tier sizes.
    Stats,
    /// Drop every cached result from both tiers.
    Clear,
}

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

/// Executes the `cache` subcommand.
pub fn execute(args: CacheArgs) -> Result<ExitCode, anyhow::Error> {
    let config = takeoff_core::config::load_config(Some(std::path::Path::new(".")))
        .context("failed to load configuration")?;
    let cache = ResultCache::new(cache_options(&config));

    match args.action {
        CacheAction::Stats => {
            let metrics = cache.metrics();
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
        CacheAction::Clear => {
            cache.clear();
            info!("cache cleared");
            println!("Cache cleared.");
        }
    }
    Ok(ExitCode::Pass)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
