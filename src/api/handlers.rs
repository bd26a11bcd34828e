use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::tools::{ToolError, ToolExecutor, ToolSchema};

pub struct AppState {
    pub executor: Arc<ToolExecutor>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

#[derive(Serialize)]
pub struct ToolList {
    pub count: usize,
    pub tools: Vec<ToolSchema>,
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// List every tool with its parameter schema
pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<ToolList> {
    let tools = state.executor.schemas();
    Json(ToolList {
        count: tools.len(),
        tools,
    })
}

/// Invoke one tool with the request body as its argument bag
pub async fn call_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let args = body.map(|Json(args)| args).unwrap_or(Value::Null);

    state
        .executor
        .try_execute(&name, args)
        .await
        .map(Json)
        .map_err(|err| {
            (
                status_for(&err),
                Json(ErrorResponse {
                    error: err.to_string(),
                    kind: err.kind(),
                }),
            )
        })
}

fn status_for(err: &ToolError) -> StatusCode {
    match err {
        ToolError::InvalidArguments(_) => StatusCode::BAD_REQUEST,
        ToolError::UnknownTool(_) => StatusCode::NOT_FOUND,
        ToolError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        ToolError::Remote(_) => StatusCode::BAD_GATEWAY,
        ToolError::Format(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
