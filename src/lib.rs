pub mod analytics;
pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod models;
pub mod tools;

use std::sync::Arc;
use tracing::info;

use client::{CachedSearchConsole, HttpSearchConsole, SearchConsoleApi};
use config::Config;
use tools::ToolExecutor;

/// Wire the HTTP client, the optional response cache and the tool executor
/// from configuration.
pub fn build_executor(config: &Config) -> anyhow::Result<ToolExecutor> {
    let http = Arc::new(HttpSearchConsole::from_config(&config.search_console)?);

    let cache = &config.search_console.cache;
    let api: Arc<dyn SearchConsoleApi> = if cache.ttl_secs > 0 {
        info!(
            ttl_secs = cache.ttl_secs,
            max_entries = cache.max_entries,
            "Response cache enabled"
        );
        Arc::new(CachedSearchConsole::new(http, cache.max_entries, cache.ttl_secs))
    } else {
        info!("Response cache disabled");
        http
    };

    Ok(ToolExecutor::from_config(api, config))
}
