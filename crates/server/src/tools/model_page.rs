//! model_page tool implementation.
//!
//! Serves a hosted model's local store outward as paginated envelopes, the
//! same shape another instance's fetcher consumes.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use rmodels_core::page::DEFAULT_PER_PAGE;
use rmodels_core::{Envelope, Error};

use super::json_result;
use crate::state::AppState;

/// Parameters for the model_page tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ModelPageParams {
    /// Name of a hosted model.
    #[serde(default)]
    pub model: Option<String>,

    /// Shared secret.
    #[serde(default)]
    pub api_key: Option<String>,

    /// 1-based page number (default: 1).
    #[serde(default)]
    pub page: Option<u64>,
}

/// Validate the request and paginate the model's store.
pub async fn serve_page(state: &AppState, params: ModelPageParams) -> Result<Envelope, Error> {
    let model = params
        .model
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput("The model field is required.".into()))?;
    let api_key = params
        .api_key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::InvalidInput("The api key field is required.".into()))?;

    if state.config.api_key.as_deref() != Some(api_key.as_str()) {
        tracing::warn!(model, "rejected page request with mismatched api key");
        return Err(Error::Forbidden);
    }

    if !state.config.is_host_model(&model) {
        return Err(Error::ModelNotFound(format!("model `{model}` is not hosted")));
    }

    let handle = state.resolver.resolve(state.entity(&model)?).await?;
    handle.paginate(params.page.unwrap_or(1), Some(DEFAULT_PER_PAGE)).await
}

/// Implementation of the model_page tool.
pub async fn page_impl(state: &AppState, params: ModelPageParams) -> Result<CallToolResult, McpError> {
    let envelope = serve_page(state, params).await?;
    json_result(&envelope)
}
