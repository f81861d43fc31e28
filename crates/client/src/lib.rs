//! Client code for remote-models.
//!
//! This crate provides the remote page fetcher, the ingest pipeline that
//! mirrors pages into a local store, and the cache resolver shared by the
//! server and CLI.

pub mod fetch;
pub mod ingest;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use fetch::{FetchConfig, PageRequest, PageSource, RemoteFetcher};
pub use ingest::{BuildOutcome, IngestPipeline};
pub use resolver::{CacheResolver, CacheSettings, CacheState, ModelHandle};
