//! SQLite sink
//!
//! Records go to an `agents` table with one column per schema field plus
//! the time the row was written.

use crate::output::traits::{Sink, SinkResult};
use crate::record::{CellValue, Field, FieldKind, ValidatedAgentRecord};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

const TABLE_NAME: &str = "agents";

/// Builds the `CREATE TABLE` statement from the field list
fn create_table_sql() -> String {
    let columns: Vec<String> = Field::ALL
        .iter()
        .map(|field| {
            let sql_type = match field.kind() {
                FieldKind::Text => "TEXT",
                FieldKind::Count => "INTEGER",
                FieldKind::Currency => "REAL",
            };
            format!("    {} {}", field.column_name(), sql_type)
        })
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    id INTEGER PRIMARY KEY AUTOINCREMENT,\n{},\n    scraped_at TEXT NOT NULL\n)",
        TABLE_NAME,
        columns.join(",\n")
    )
}

fn insert_sql() -> String {
    let columns: Vec<&str> = Field::ALL.iter().map(|f| f.column_name()).collect();
    let placeholders: Vec<String> = (1..=Field::ALL.len() + 1).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}, scraped_at) VALUES ({})",
        TABLE_NAME,
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn sql_value(cell: CellValue<'_>) -> Value {
    match cell {
        CellValue::Text(Some(text)) => Value::Text(text.to_string()),
        CellValue::Count(Some(count)) => Value::Integer(count),
        CellValue::Currency(Some(amount)) => Value::Real(amount),
        _ => Value::Null,
    }
}

/// SQLite sink backend
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Opens (or creates) the database and the `agents` table
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn open(path: &Path) -> SinkResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        Self::with_connection(conn)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> SinkResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> SinkResult<Self> {
        conn.execute_batch(&create_table_sql())?;
        Ok(Self { conn })
    }

    /// Number of stored records
    pub fn record_count(&self) -> SinkResult<i64> {
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", TABLE_NAME), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    fn insert(&self, record: &ValidatedAgentRecord) -> SinkResult<()> {
        let mut values: Vec<Value> = record.cells().map(|(_, cell)| sql_value(cell)).collect();
        values.push(Value::Text(Utc::now().to_rfc3339()));

        self.conn.execute(&insert_sql(), params_from_iter(values))?;
        Ok(())
    }
}

#[async_trait]
impl Sink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn persist(&mut self, record: &ValidatedAgentRecord) -> SinkResult<()> {
        self.insert(record)?;
        tracing::info!("Inserted record into {}", TABLE_NAME);
        Ok(())
    }
}
