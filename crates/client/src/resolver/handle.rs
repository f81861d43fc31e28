//! Queryable handle to a resolved entity.

use rmodels_core::page::DEFAULT_PER_PAGE;
use rmodels_core::{Entity, Envelope, Error, LocalStore, Record, RowFilter, SqlValue, StoreLocation};

use super::CacheState;

/// A resolved entity bound to its local store.
///
/// Cloning is cheap; clones share the store connection.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    entity: Entity,
    table: String,
    store: LocalStore,
    state: CacheState,
}

impl ModelHandle {
    pub(crate) fn new(entity: Entity, store: LocalStore, state: CacheState) -> Self {
        let table = entity.table();
        Self { entity, table, store, state }
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// State the entity was bound in.
    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn location(&self) -> &StoreLocation {
        self.store.location()
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub async fn count(&self) -> Result<u64, Error> {
        self.store.count(&self.table, None).await
    }

    /// All rows in insertion order.
    pub async fn all(&self) -> Result<Vec<Record>, Error> {
        self.store.rows(&self.table, None, None, 0).await
    }

    pub async fn find(&self, id: i64) -> Result<Option<Record>, Error> {
        self.store.find(&self.table, id).await
    }

    /// Rows where `column` equals `value`, up to `limit`.
    pub async fn where_eq(
        &self, column: &str, value: impl Into<SqlValue>, limit: Option<u64>,
    ) -> Result<Vec<Record>, Error> {
        self.store
            .rows(&self.table, Some(RowFilter::eq(column, value)), limit, 0)
            .await
    }

    /// One page of rows; `per_page` defaults to 15.
    pub async fn paginate(&self, page: u64, per_page: Option<u64>) -> Result<Envelope, Error> {
        self.store
            .paginate(&self.table, page, per_page.unwrap_or(DEFAULT_PER_PAGE))
            .await
    }
}
