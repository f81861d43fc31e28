//! Ingest pipeline: remote pages into a local table.
//!
//! A build runs in two steps:
//!
//! 1. Schema materialization: resolve the schema (sampling page 1 when none
//!    is declared) and create the entity table. Losing the creation race to
//!    another caller ends the build early.
//! 2. Data load: fetch page 1, then follow `current_page`/`last_page` one
//!    page at a time, inserting each page in chunks of its `per_page`.

pub mod coerce;

use std::sync::Arc;

use crate::fetch::PageSource;
use rmodels_core::schema::{self, SchemaDescriptor};
use rmodels_core::{Entity, Error, LocalStore, TableCreation};

/// Result of a completed build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Loaded { rows: usize, pages: u64 },
    /// The table already existed; the load step was skipped.
    Raced,
}

/// Drives a page source into a local store.
#[derive(Clone)]
pub struct IngestPipeline {
    source: Arc<dyn PageSource>,
}

impl IngestPipeline {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self { source }
    }

    /// Create and populate the entity's table in `store`.
    ///
    /// # Errors
    ///
    /// `EmptySchema` when inference has no sample record (no table is created),
    /// `RemoteUnavailable` from any page fetch. Rows inserted before a failing
    /// page stay in place.
    pub async fn build(&self, entity: &Entity, store: &LocalStore) -> Result<BuildOutcome, Error> {
        let schema = schema::resolve(entity, || self.source.fetch_page(entity, 1)).await?;
        let table = entity.table();

        if store.create_table(&table, &schema).await? == TableCreation::AlreadyExists {
            tracing::warn!(entity = entity.name(), table, "table already exists, skipping load");
            return Ok(BuildOutcome::Raced);
        }

        let (rows, pages) = self.load(entity, store, &table, &schema).await?;
        tracing::info!(entity = entity.name(), rows, pages, "loaded remote data");

        Ok(BuildOutcome::Loaded { rows, pages })
    }

    async fn load(
        &self, entity: &Entity, store: &LocalStore, table: &str, schema: &SchemaDescriptor,
    ) -> Result<(usize, u64), Error> {
        let columns: Vec<String> = schema.names().map(String::from).collect();
        let mut rows = 0;
        let mut pages = 0;
        let mut next = Some(1);

        while let Some(page_no) = next {
            let page = self.source.fetch_page(entity, page_no).await?;
            pages += 1;

            let chunk_size = page.chunk_size();
            // A remote that does not advance its current_page would loop forever.
            next = page.next_page().filter(|n| *n > page_no);

            let records = page.into_records();
            for chunk in records.chunks(chunk_size) {
                let batch = chunk.iter().map(|record| coerce::row(record, schema)).collect();
                let written = store.insert_chunk(table, &columns, batch).await?;
                rows += written;
                tracing::debug!(entity = entity.name(), page = page_no, written, "inserted chunk");
            }
        }

        Ok((rows, pages))
    }
}
