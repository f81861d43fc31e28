//! cache_status tool implementation.
//!
//! Reports, per configured model, the state the resolver would pick right
//! now. No network access.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;

use rmodels_client::CacheState;
use rmodels_core::Error;

use crate::state::AppState;
use crate::tools::json_result;

/// Status of one configured model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub model: String,
    /// Decision for the next resolution.
    pub state: CacheState,
    /// Whether the model is already bound in this process.
    pub bound: bool,
    pub hosted: bool,
    pub cache_file: String,
}

pub async fn status(state: &AppState) -> Result<Vec<ModelStatus>, Error> {
    let mut report = Vec::with_capacity(state.catalog.len());
    for entity in state.catalog.iter() {
        report.push(ModelStatus {
            model: entity.name().to_string(),
            state: state.resolver.inspect(entity).await?,
            bound: state.resolver.is_bound(entity.name()).await,
            hosted: state.config.is_host_model(entity.name()),
            cache_file: state.resolver.cache_file(entity).display().to_string(),
        });
    }
    Ok(report)
}

/// Implementation of the cache_status tool.
pub async fn status_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let report = status(state).await?;
    json_result(&report)
}
