//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and refreshing model caches.

pub mod refresh;
pub mod status;

pub use refresh::{CacheRefreshParams, refresh_impl};
pub use status::status_impl;
