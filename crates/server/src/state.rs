//! Shared server state.

use rmodels_client::CacheResolver;
use rmodels_core::{AppConfig, Catalog, Entity, Error};

/// Configuration, model catalog and resolver shared by all tools.
pub struct AppState {
    pub config: AppConfig,
    pub catalog: Catalog,
    pub resolver: CacheResolver,
}

impl AppState {
    pub async fn from_config(config: AppConfig) -> Result<Self, Error> {
        let resolver = CacheResolver::from_config(&config).await?;
        let catalog = Catalog::from_config(&config);
        Ok(Self { config, catalog, resolver })
    }

    /// Look up a configured model by name.
    pub fn entity(&self, name: &str) -> Result<&Entity, Error> {
        self.catalog
            .get(name)
            .ok_or_else(|| Error::ModelNotFound(format!("model `{name}` is not configured")))
    }
}
