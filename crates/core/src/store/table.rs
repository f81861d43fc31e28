//! Table creation from a schema descriptor.

use tokio_rusqlite::rusqlite;

use super::{LocalStore, quote_ident};
use crate::Error;
use crate::schema::SchemaDescriptor;

/// Outcome of a create-table attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableCreation {
    Created,
    /// Another caller created the table first.
    AlreadyExists,
}

impl LocalStore {
    /// Create the entity table with one column per descriptor entry.
    ///
    /// An "already exists" failure is reported as
    /// `TableCreation::AlreadyExists`; every other failure is an error.
    pub async fn create_table(&self, table: &str, schema: &SchemaDescriptor) -> Result<TableCreation, Error> {
        let ddl = create_table_sql(table, schema);
        tracing::debug!(table, "creating table");

        self.conn
            .call(move |conn| -> Result<TableCreation, Error> {
                match conn.execute_batch(&ddl) {
                    Ok(()) => Ok(TableCreation::Created),
                    Err(e) if is_already_exists(&e) => Ok(TableCreation::AlreadyExists),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Whether the table exists in this store.
    pub async fn has_table(&self, table: &str) -> Result<bool, Error> {
        let table = table.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                    [&table],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Column names and declared SQL types, in table order.
    pub async fn columns(&self, table: &str) -> Result<Vec<(String, String)>, Error> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table));
        self.conn
            .call(move |conn| -> Result<Vec<(String, String)>, Error> {
                let mut stmt = conn.prepare(&sql)?;
                let columns = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(columns)
            })
            .await
            .map_err(Error::from)
    }
}

fn create_table_sql(table: &str, schema: &SchemaDescriptor) -> String {
    let columns: Vec<String> = schema
        .columns()
        .iter()
        .map(|column| {
            let null = if column.nullable() { "" } else { " not null" };
            format!("{} {}{null}", quote_ident(&column.name), column.kind.sql_type())
        })
        .collect();

    format!("CREATE TABLE {} ({})", quote_ident(table), columns.join(", "))
}

fn is_already_exists(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("already exists"))
}
