//! cache_refresh tool implementation.
//!
//! Invalidates one model's cache and resolves it again from the remote.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use rmodels_client::CacheState;
use rmodels_core::Error;

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the cache_refresh tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheRefreshParams {
    /// Configured model name.
    pub model: String,
}

/// Output from the cache_refresh tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheRefreshOutput {
    pub model: String,
    /// Whether a cache file was discarded.
    pub removed: bool,
    pub state: CacheState,
    pub rows: u64,
}

pub async fn refresh(state: &AppState, params: CacheRefreshParams) -> Result<CacheRefreshOutput, Error> {
    let entity = state.entity(&params.model)?;
    let removed = state.resolver.invalidate(entity.name()).await?;
    let handle = state.resolver.resolve(entity).await?;

    Ok(CacheRefreshOutput { model: params.model, removed, state: handle.state(), rows: handle.count().await? })
}

/// Implementation of the cache_refresh tool.
pub async fn refresh_impl(state: &AppState, params: CacheRefreshParams) -> Result<CallToolResult, McpError> {
    let output = refresh(state, params).await?;
    json_result(&output)
}
