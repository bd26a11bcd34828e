use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

pub const API_KEY_HEADER: &str = "X-API-Key";

pub struct AuthService {
    enabled: bool,
    api_keys: Arc<Vec<String>>,
}

impl AuthService {
    pub fn new(enabled: bool, api_keys: Vec<String>) -> Self {
        if enabled && api_keys.is_empty() {
            warn!("AUTH_ENABLED is set but API_KEYS is empty; every request will be accepted");
        }

        Self {
            enabled,
            api_keys: Arc::new(api_keys),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn validate_key(&self, key: &str) -> bool {
        // If authentication is disabled, allow all requests
        if !self.enabled {
            return true;
        }

        // No keys configured: local development
        if self.api_keys.is_empty() {
            return true;
        }

        self.api_keys.iter().any(|k| k == key)
    }
}

pub async fn auth_middleware(
    auth_service: Arc<AuthService>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if auth_service.validate_key(api_key) {
        next.run(request).await
    } else {
        debug!(path = %request.uri().path(), "Rejected request with invalid API key");
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid or missing API key"})),
        )
            .into_response()
    }
}
