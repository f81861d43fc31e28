//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::{AppConfig, Transport};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_prefix` is empty or contains a path separator
    /// - `cache_ttl_secs` is 0
    /// - a model name is empty or declared twice
    /// - a `host_models` entry names no declared model
    ///
    /// Returns `ConfigError::Missing` if `transport = "post"` without `api_key`,
    /// or if `domain` is empty while a model relies on it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_prefix.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_prefix".into(), reason: "must not be empty".into() });
        }
        if self.cache_prefix.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                field: "cache_prefix".into(),
                reason: "must not contain path separators".into(),
            });
        }

        if self.cache_ttl_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: "must be greater than 0 (unset it to disable TTL tracking)".into(),
            });
        }

        if self.transport == Transport::Post {
            self.require_api_key()?;
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.name.trim().is_empty() {
                return Err(ConfigError::Invalid { field: "models".into(), reason: "model name must not be empty".into() });
            }
            if !seen.insert(model.name.as_str()) {
                return Err(ConfigError::Invalid {
                    field: "models".into(),
                    reason: format!("model `{}` declared more than once", model.name),
                });
            }
        }

        if let Some(unknown) = self.host_models.iter().find(|m| !seen.contains(m.as_str())) {
            return Err(ConfigError::Invalid {
                field: "host_models".into(),
                reason: format!("`{unknown}` is not a declared model"),
            });
        }

        if self.domain.trim().is_empty() {
            let relative = self
                .models
                .iter()
                .find(|m| !m.endpoint.as_deref().is_some_and(is_absolute_endpoint));
            if let Some(model) = relative {
                return Err(ConfigError::Missing {
                    field: "domain".into(),
                    hint: format!("model `{}` uses an endpoint relative to the remote domain", model.name),
                });
            }
        }

        Ok(())
    }
}

fn is_absolute_endpoint(endpoint: &str) -> bool {
    let lower = endpoint.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
