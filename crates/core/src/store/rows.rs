//! Row insertion and read access.
//!
//! Inserts are append-only and chunked: each chunk is written inside one
//! transaction. Reads decode SQL values back into JSON records, parsing
//! `text` (json) columns into structured values.

use serde_json::{Number, Value};
use tokio_rusqlite::rusqlite::{self, params_from_iter, types::ValueRef};

use super::{LocalStore, quote_ident};
use crate::Error;
use crate::page::{Envelope, Record};

/// A value bound into an insert statement.
pub type SqlValue = rusqlite::types::Value;

/// Values for one row, in insert column order.
pub type SqlRow = Vec<SqlValue>;

/// Equality filter on one column.
#[derive(Debug, Clone)]
pub struct RowFilter {
    pub column: String,
    pub value: SqlValue,
}

impl RowFilter {
    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self { column: column.into(), value: value.into() }
    }
}

impl LocalStore {
    /// Insert one chunk of rows in a single transaction.
    ///
    /// Returns the number of rows written.
    pub async fn insert_chunk(&self, table: &str, columns: &[String], rows: Vec<SqlRow>) -> Result<usize, Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            column_list.join(", "),
            placeholders.join(", ")
        );

        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(&sql)?;
                    for row in &rows {
                        stmt.execute(params_from_iter(row.iter()))?;
                    }
                }
                tx.commit()?;
                Ok(rows.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Count rows, optionally filtered.
    pub async fn count(&self, table: &str, filter: Option<RowFilter>) -> Result<u64, Error> {
        let (clause, params) = self.where_clause(table, filter).await?;
        let sql = format!("SELECT COUNT(*) FROM {}{clause}", quote_ident(table));

        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
                Ok(u64::try_from(count).unwrap_or(0))
            })
            .await
            .map_err(Error::from)
    }

    /// Read rows in insertion order, optionally filtered.
    pub async fn rows(
        &self, table: &str, filter: Option<RowFilter>, limit: Option<u64>, offset: u64,
    ) -> Result<Vec<Record>, Error> {
        let columns = self.columns(table).await?;
        let (clause, params) = where_clause_for(&columns, filter)?;

        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let sql = format!(
            "SELECT * FROM {}{clause} ORDER BY rowid LIMIT {limit} OFFSET {offset}",
            quote_ident(table)
        );

        self.conn
            .call(move |conn| -> Result<Vec<Record>, Error> {
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query(params_from_iter(params.iter()))?;
                let mut records = Vec::new();

                while let Some(row) = rows.next()? {
                    let mut record = Record::new();
                    for (idx, (name, sql_type)) in columns.iter().enumerate() {
                        record.insert(name.clone(), decode(row.get_ref(idx)?, sql_type));
                    }
                    records.push(record);
                }

                Ok(records)
            })
            .await
            .map_err(Error::from)
    }

    /// First row with the given identity.
    pub async fn find(&self, table: &str, id: i64) -> Result<Option<Record>, Error> {
        let mut rows = self.rows(table, Some(RowFilter::eq("id", id)), Some(1), 0).await?;
        Ok(rows.pop())
    }

    /// Serve one page of the table as a paginated envelope.
    ///
    /// Pages are 1-based; `last_page` is at least 1 even for an empty table.
    pub async fn paginate(&self, table: &str, page: u64, per_page: u64) -> Result<Envelope, Error> {
        let page = page.max(1);
        let per_page = per_page.max(1);

        let total = self.count(table, None).await?;
        let last_page = total.div_ceil(per_page).max(1);
        let data = self
            .rows(table, None, Some(per_page), (page - 1).saturating_mul(per_page))
            .await?;

        Ok(Envelope {
            data,
            per_page: Some(per_page),
            current_page: Some(page),
            last_page: Some(last_page),
            total: Some(total),
        })
    }

    async fn where_clause(&self, table: &str, filter: Option<RowFilter>) -> Result<(String, Vec<SqlValue>), Error> {
        match filter {
            Some(filter) => where_clause_for(&self.columns(table).await?, Some(filter)),
            None => Ok((String::new(), Vec::new())),
        }
    }
}

fn where_clause_for(columns: &[(String, String)], filter: Option<RowFilter>) -> Result<(String, Vec<SqlValue>), Error> {
    let Some(filter) = filter else {
        return Ok((String::new(), Vec::new()));
    };

    if !columns.iter().any(|(name, _)| *name == filter.column) {
        return Err(Error::InvalidInput(format!("unknown column `{}`", filter.column)));
    }

    Ok((format!(" WHERE {} = ?1", quote_ident(&filter.column)), vec![filter.value]))
}

fn decode(value: ValueRef<'_>, sql_type: &str) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            if sql_type.eq_ignore_ascii_case("text") {
                serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.into_owned()))
            } else {
                Value::String(text.into_owned())
            }
        }
        ValueRef::Blob(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}
