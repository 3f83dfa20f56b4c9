//! Output module for persisting validated agent records
//!
//! This module handles:
//! - Appending rows to a CSV file
//! - Inserting rows into a local SQLite table
//! - Streaming rows into a BigQuery table, authenticated with a service account

mod bigquery;
mod credentials;
mod csv_sink;
mod sqlite_sink;
mod traits;

pub use bigquery::{sanitize_column_name, BigQuerySink};
pub use credentials::{Credentials, ServiceAccountKey, TokenProvider, BIGQUERY_SCOPE};
pub use csv_sink::CsvSink;
pub use sqlite_sink::SqliteSink;
pub use traits::{Sink, SinkError, SinkResult};

use crate::config::{Config, SinkKind};
use crate::HarvestError;
use reqwest::Client;
use std::path::Path;

/// Builds the sink selected by `[output] sink`
///
/// # Arguments
///
/// * `config` - The full configuration
/// * `client` - HTTP client shared with the crawler (BigQuery only)
///
/// # Returns
///
/// * `Ok(Box<dyn Sink>)` - Ready to persist records
/// * `Err(HarvestError::Sink)` - The destination could not be opened
pub fn build_sink(config: &Config, client: &Client) -> Result<Box<dyn Sink>, HarvestError> {
    let sink: Box<dyn Sink> = match config.output.sink {
        SinkKind::Csv => Box::new(CsvSink::new(&config.output.csv_path)),
        SinkKind::Sqlite => Box::new(SqliteSink::open(Path::new(&config.output.database_path))?),
        SinkKind::Bigquery => Box::new(BigQuerySink::from_config(&config.warehouse, client.clone())?),
    };

    tracing::info!("Using {} sink", sink.name());
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_csv_sink() {
        let config = Config::default();
        let sink = build_sink(&config, &Client::new()).unwrap();
        assert_eq!(sink.name(), "csv");
    }

    #[test]
    fn test_build_sqlite_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.sink = SinkKind::Sqlite;
        config.output.database_path = dir.path().join("agents.db").display().to_string();

        let sink = build_sink(&config, &Client::new()).unwrap();
        assert_eq!(sink.name(), "sqlite");
    }

    #[test]
    fn test_bigquery_without_credentials_fails() {
        let mut config = Config::default();
        config.output.sink = SinkKind::Bigquery;
        config.warehouse.project = Some("proj".to_string());
        config.warehouse.dataset = Some("ds".to_string());
        config.warehouse.table = Some("agents".to_string());
        config.warehouse.credentials_path = Some("/nonexistent/token.json".to_string());

        let result = build_sink(&config, &Client::new());
        assert!(matches!(
            result,
            Err(HarvestError::Sink(SinkError::Credentials(_)))
        ));
    }
}
