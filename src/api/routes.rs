use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::auth::{auth_middleware, AuthService};
use crate::tools::ToolExecutor;

use super::handlers::{call_tool, health_check, list_tools, AppState};

pub fn create_api_router(executor: Arc<ToolExecutor>, auth_service: Arc<AuthService>) -> Router {
    let state = Arc::new(AppState { executor });

    let protected_routes = Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/{name}", post(call_tool))
        .route_layer(middleware::from_fn(move |headers, req, next| {
            let auth = Arc::clone(&auth_service);
            auth_middleware(auth, headers, req, next)
        }))
        .with_state(Arc::clone(&state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", protected_routes)
}
