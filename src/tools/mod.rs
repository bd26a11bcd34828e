//! Tool layer: named, validated operations over the analytics engine.

pub mod args;
pub mod error;
pub mod executor;
pub mod schemas;

pub use error::{ToolError, ToolResult, WRITE_SCOPE_REQUIRED};
pub use executor::{ToolExecutor, ToolOutcome};
pub use schemas::{GscToolSchemas, ToolSchema};
