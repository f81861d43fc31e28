//! model_query tool implementation.
//!
//! Resolves a configured model and reads rows from its local store.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use rmodels_client::{CacheState, ingest::coerce};
use rmodels_core::{Error, Record};

use super::json_result;
use crate::state::AppState;

/// Input parameters for model_query tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModelQueryParams {
    /// Configured model name.
    pub model: String,

    /// Column for an equality filter.
    #[serde(default)]
    pub column: Option<String>,

    /// Value the column must equal. Dates match in their stored form.
    #[serde(default)]
    pub value: Option<Value>,

    /// Maximum rows to return (default: 100).
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    100
}

/// Output structure for model_query tool.
#[derive(Debug, Clone, Serialize)]
pub struct ModelQueryOutput {
    pub model: String,
    /// State the model was bound in.
    pub state: CacheState,
    /// Total rows in the store.
    pub total: u64,
    pub rows: Vec<Record>,
}

pub async fn query(state: &AppState, params: ModelQueryParams) -> Result<ModelQueryOutput, Error> {
    let handle = state.resolver.resolve(state.entity(&params.model)?).await?;

    let rows = match (params.column, params.value) {
        (Some(column), Some(value)) => handle.where_eq(&column, coerce::value(&value), Some(params.limit)).await?,
        (None, None) => handle.store().rows(&handle.entity().table(), None, Some(params.limit), 0).await?,
        _ => return Err(Error::InvalidInput("column and value must be given together".into())),
    };

    Ok(ModelQueryOutput { model: params.model, state: handle.state(), total: handle.count().await?, rows })
}

/// Implementation of the model_query tool.
pub async fn query_impl(state: &AppState, params: ModelQueryParams) -> Result<CallToolResult, McpError> {
    let output = query(state, params).await?;
    json_result(&output)
}
