//! Core types and shared functionality for remote-models.
//!
//! This crate provides:
//! - Entity descriptors and the configuration-backed catalog
//! - Type inference and schema resolution
//! - The local SQLite store and the TTL marker database
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod entity;
pub mod error;
pub mod markers;
pub mod page;
pub mod schema;
pub mod store;
pub mod temporal;

pub use config::{AppConfig, ConfigError, ModelConfig, Transport};
pub use entity::{Catalog, Entity, RemoteBacked};
pub use error::Error;
pub use markers::MarkerDb;
pub use page::{Envelope, Page, Record};
pub use schema::{Column, ColumnType, SchemaDescriptor};
pub use store::{LocalStore, RowFilter, SqlRow, SqlValue, StoreLocation, TableCreation};
