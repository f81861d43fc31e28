//! Remote page shapes.
//!
//! A remote answers either with a paginated envelope
//! (`{data, per_page, current_page, last_page, total}`) or with a bare array
//! of records. The same envelope is used when a local store is paginated and
//! served outward.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One remote record: column name to raw JSON value.
pub type Record = Map<String, Value>;

/// Default chunk size when a page does not say how many records it holds.
pub const DEFAULT_PER_PAGE: u64 = 15;

/// Paginated envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub data: Vec<Record>,
    #[serde(default, deserialize_with = "lenient_u64", skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64", skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64", skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64", skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl Envelope {
    /// Next page to request, if this one is not the last.
    ///
    /// Continuation needs both `current_page` and `last_page`; with either
    /// missing the page is treated as the only one.
    pub fn next_page(&self) -> Option<u64> {
        match (self.current_page, self.last_page) {
            (Some(current), Some(last)) if current < last => Some(current + 1),
            _ => None,
        }
    }

    /// Chunk size for inserting this page's records.
    pub fn chunk_size(&self) -> usize {
        match self.per_page {
            Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
            _ => DEFAULT_PER_PAGE as usize,
        }
    }
}

/// Result of one remote fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Page {
    Paginated(Envelope),
    Bare(Vec<Record>),
}

impl Page {
    pub fn records(&self) -> &[Record] {
        match self {
            Page::Paginated(envelope) => &envelope.data,
            Page::Bare(records) => records,
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            Page::Paginated(envelope) => envelope.data,
            Page::Bare(records) => records,
        }
    }

    pub fn next_page(&self) -> Option<u64> {
        match self {
            Page::Paginated(envelope) => envelope.next_page(),
            Page::Bare(_) => None,
        }
    }

    pub fn chunk_size(&self) -> usize {
        match self {
            Page::Paginated(envelope) => envelope.chunk_size(),
            Page::Bare(_) => DEFAULT_PER_PAGE as usize,
        }
    }
}

/// Accept page counters sent as numbers or numeric strings.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
