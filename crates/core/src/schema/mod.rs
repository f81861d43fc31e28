//! Column types and schema resolution for mirrored tables.
//!
//! A `SchemaDescriptor` is either declared by the entity or inferred from the
//! first record of a sample page. In both cases the reserved columns (`id`,
//! `created_at`, `updated_at`) are stripped and re-added with fixed types, so
//! the table layout is always `id`, payload columns, then the two timestamps.

pub mod infer;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::entity::Entity;
use crate::page::Page;

pub use infer::infer;

/// Reserved identity column.
pub const ID_COLUMN: &str = "id";

/// Reserved columns, always present with fixed types.
pub const RESERVED_COLUMNS: [&str; 3] = [ID_COLUMN, "created_at", "updated_at"];

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Integer,
    Float,
    String,
    DateTime,
    Json,
}

impl ColumnType {
    /// SQL type used when creating the column.
    pub const fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::String => "varchar",
            ColumnType::DateTime => "datetime",
            ColumnType::Json => "text",
        }
    }

    /// Canonical type name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::DateTime => "dateTime",
            ColumnType::Json => "json",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    /// Accepts the canonical names plus the common aliases used in schema
    /// declarations (`int`, `double`, `text`, `datetime`, `timestamp`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" | "biginteger" | "bigint" => Ok(ColumnType::Integer),
            "float" | "double" | "decimal" | "real" => Ok(ColumnType::Float),
            "string" | "text" | "varchar" => Ok(ColumnType::String),
            "datetime" | "timestamp" | "date" => Ok(ColumnType::DateTime),
            "json" => Ok(ColumnType::Json),
            other => Err(Error::InvalidSchema(format!("unknown column type `{other}`"))),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.as_str().to_string()
    }
}

/// One column of a mirrored table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(alias = "type")]
    pub kind: ColumnType,
}

impl Column {
    /// Only the identity column is non-nullable.
    pub fn nullable(&self) -> bool {
        self.name != ID_COLUMN
    }
}

/// Ordered column name to column type mapping for an entity's table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaDescriptor {
    columns: Vec<Column>,
}

impl SchemaDescriptor {
    /// Build a descriptor from declared or inferred columns.
    ///
    /// Reserved columns are dropped from the input and re-added with their
    /// fixed types. Later duplicates of a name are ignored.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnType)>,
        S: Into<String>,
    {
        let mut normalized = vec![Column { name: ID_COLUMN.to_string(), kind: ColumnType::Integer }];

        for (name, kind) in columns {
            let name = name.into();
            if RESERVED_COLUMNS.contains(&name.as_str()) || normalized.iter().any(|c| c.name == name) {
                continue;
            }
            normalized.push(Column { name, kind });
        }

        normalized.push(Column { name: "created_at".to_string(), kind: ColumnType::DateTime });
        normalized.push(Column { name: "updated_at".to_string(), kind: ColumnType::DateTime });

        Self { columns: normalized }
    }

    /// Infer a descriptor from one record's keys and values.
    pub fn infer_from(record: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self::new(record.iter().map(|(name, value)| (name.clone(), infer(value))))
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<ColumnType> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    /// Columns other than the reserved ones.
    pub fn payload_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| !RESERVED_COLUMNS.contains(&c.name.as_str()))
    }
}

/// Produce the schema for an entity.
///
/// An explicit schema is used as declared and `sample` is never called.
/// Otherwise the first record of the sample page drives inference; an empty
/// sample fails with `Error::EmptySchema`.
pub async fn resolve<F, Fut>(entity: &Entity, sample: F) -> Result<SchemaDescriptor, Error>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Page, Error>>,
{
    if let Some(schema) = entity.schema() {
        tracing::debug!(entity = entity.name(), "using declared schema");
        return Ok(schema.clone());
    }

    let page = sample().await?;
    let first = page
        .records()
        .first()
        .ok_or_else(|| Error::EmptySchema(entity.name().to_string()))?;

    let schema = SchemaDescriptor::infer_from(first);
    tracing::debug!(entity = entity.name(), columns = schema.columns().len(), "inferred schema from sample");

    Ok(schema)
}
