use thiserror::Error;

use crate::analytics::FormatError;
use crate::client::RemoteError;

/// Returned for sitemap writes when only the read-only scope was granted.
pub const WRITE_SCOPE_REQUIRED: &str = "This operation requires write access to Search Console. \
Set GSC_SCOPE=full and re-authorize with the https://www.googleapis.com/auth/webmasters scope.";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("Search Console request failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Failed to format result: {0}")]
    Format(#[from] FormatError),
}

impl ToolError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ToolError::InvalidArguments(message.into())
    }

    /// Stable machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidArguments(_) => "invalid_arguments",
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::PermissionDenied(_) => "permission_denied",
            ToolError::Remote(_) => "remote_error",
            ToolError::Format(_) => "format_error",
        }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
