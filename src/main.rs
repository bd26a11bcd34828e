use anyhow::Result;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gsc_insights::api;
use gsc_insights::auth::AuthService;
use gsc_insights::build_executor;
use gsc_insights::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    let executor = Arc::new(build_executor(&config)?);

    // Initialize auth service
    let auth_service = Arc::new(AuthService::new(
        config.auth.enabled,
        config.auth.api_keys.clone(),
    ));
    if auth_service.is_enabled() {
        info!("🔐 API key authentication enabled");
    } else {
        info!("🔓 Authentication is disabled - all API requests are allowed");
    }

    if config.search_console.scope.allows_writes() {
        info!("Search Console scope: full (sitemap writes allowed)");
    } else {
        info!("Search Console scope: readonly");
    }

    let app = api::create_api_router(executor, auth_service).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 API server listening on http://{}", addr);
    info!("   - Tool catalogue at http://{}/api/tools", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
