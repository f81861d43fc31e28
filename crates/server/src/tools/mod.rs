//! MCP tool implementations.
//!
//! This module contains all tools exposed by the remote-models server.

pub mod cache;
pub mod model_page;
pub mod model_query;

pub use model_page::ModelPageParams;
pub use model_query::ModelQueryParams;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use rmodels_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
