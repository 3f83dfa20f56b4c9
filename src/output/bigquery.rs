//! BigQuery sink
//!
//! Talks to the BigQuery v2 REST API with a bearer token from a
//! [`TokenProvider`]. On first use the
//! dataset and table are created if missing; afterwards each record is
//! streamed with `tabledata.insertAll`. Every column is a nullable STRING.

use crate::config::WarehouseConfig;
use crate::output::credentials::{Credentials, TokenProvider};
use crate::output::traits::{Sink, SinkError, SinkResult};
use crate::record::{Field, ValidatedAgentRecord};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::Path;

/// Normalizes a column name for the warehouse
///
/// Trims and lowercases, turns everything outside `[a-z0-9_]` into `_`,
/// collapses runs of `_` and strips leading and trailing `_`.
pub fn sanitize_column_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' };
        if c == '_' && sanitized.ends_with('_') {
            continue;
        }
        sanitized.push(c);
    }
    sanitized.trim_matches('_').to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<Value>,
}

/// Streams records into `<project>.<dataset>.<table>`
pub struct BigQuerySink {
    client: Client,
    api_base_url: String,
    project: String,
    dataset: String,
    table: String,
    location: String,
    tokens: TokenProvider,
    columns: Vec<String>,
    prepared: bool,
}

impl BigQuerySink {
    /// Creates the sink from the warehouse settings
    ///
    /// # Returns
    ///
    /// * `Ok(BigQuerySink)` - Identity complete and credentials readable
    /// * `Err(SinkError::Credentials)` - Missing identity or unusable credentials file
    pub fn from_config(config: &WarehouseConfig, client: Client) -> SinkResult<Self> {
        let missing = |what: &str| SinkError::Credentials(format!("warehouse {} is not set", what));
        let project = config.project.clone().ok_or_else(|| missing("project"))?;
        let dataset = config.dataset.clone().ok_or_else(|| missing("dataset"))?;
        let table = config.table.clone().ok_or_else(|| missing("table"))?;
        let credentials = config
            .credentials_path
            .as_deref()
            .ok_or_else(|| missing("credentials path"))?;
        let credentials = Credentials::from_file(Path::new(credentials))?;
        if let Credentials::ServiceAccount(key) = &credentials {
            tracing::debug!("Authenticating as {}", key.client_email);
        }
        let tokens = TokenProvider::new(client.clone(), credentials);

        tracing::info!(
            "Connected to BigQuery target {}.{}.{}",
            project,
            dataset,
            table
        );

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            project,
            dataset,
            table,
            location: config.location.clone(),
            tokens,
            columns: Field::ALL
                .iter()
                .map(|f| sanitize_column_name(f.column_name()))
                .collect(),
            prepared: false,
        })
    }

    fn dataset_url(&self) -> String {
        format!(
            "{}/projects/{}/datasets/{}",
            self.api_base_url, self.project, self.dataset
        )
    }

    fn table_url(&self) -> String {
        format!("{}/tables/{}", self.dataset_url(), self.table)
    }

    /// True when the resource exists, false on 404
    async fn exists(&self, url: &str, token: &str) -> SinkResult<bool> {
        let response = self.client.get(url).bearer_auth(token).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(rejected(response).await),
        }
    }

    /// Creates a resource; a concurrent creation (409) counts as success
    async fn create(&self, url: String, body: Value, token: &str) -> SinkResult<()> {
        let response = self.client.post(url).bearer_auth(token).json(&body).send().await?;
        match response.status() {
            StatusCode::CONFLICT => Ok(()),
            status if status.is_success() => Ok(()),
            _ => Err(rejected(response).await),
        }
    }

    async fn ensure_dataset(&self, token: &str) -> SinkResult<()> {
        if self.exists(&self.dataset_url(), token).await? {
            tracing::debug!("Dataset {}.{} exists", self.project, self.dataset);
            return Ok(());
        }

        tracing::info!(
            "Creating dataset {}.{} in {}",
            self.project,
            self.dataset,
            self.location
        );
        let body = json!({
            "datasetReference": {"projectId": self.project, "datasetId": self.dataset},
            "location": self.location,
        });
        self.create(
            format!("{}/projects/{}/datasets", self.api_base_url, self.project),
            body,
            token,
        )
        .await
    }

    async fn ensure_table(&self, token: &str) -> SinkResult<()> {
        if self.exists(&self.table_url(), token).await? {
            return Ok(());
        }

        tracing::info!("Creating table {}", self.table);
        let fields: Vec<Value> = self
            .columns
            .iter()
            .map(|name| json!({"name": name, "type": "STRING", "mode": "NULLABLE"}))
            .collect();
        let body = json!({
            "tableReference": {
                "projectId": self.project,
                "datasetId": self.dataset,
                "tableId": self.table,
            },
            "schema": {"fields": fields},
        });
        self.create(format!("{}/tables", self.dataset_url()), body, token)
            .await
    }

    /// One `insertAll` row with every value as a string or null
    fn row(&self, record: &ValidatedAgentRecord) -> Value {
        let mut row = Map::new();
        for (column, (_, cell)) in self.columns.iter().zip(record.cells()) {
            let value = cell.to_text().map_or(Value::Null, Value::String);
            row.insert(column.clone(), value);
        }
        Value::Object(row)
    }

    async fn insert(&self, record: &ValidatedAgentRecord, token: &str) -> SinkResult<()> {
        let body = json!({
            "kind": "bigquery#tableDataInsertAllRequest",
            "rows": [{"json": self.row(record)}],
        });
        let response = self
            .client
            .post(format!("{}/insertAll", self.table_url()))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        let result: InsertAllResponse = response.json().await?;
        if !result.insert_errors.is_empty() {
            return Err(SinkError::Rejected(format!(
                "row errors: {}",
                Value::Array(result.insert_errors)
            )));
        }
        Ok(())
    }

    async fn write(&mut self, record: &ValidatedAgentRecord, token: &str) -> SinkResult<()> {
        if !self.prepared {
            self.ensure_dataset(token).await?;
            self.ensure_table(token).await?;
            self.prepared = true;
        }
        self.insert(record, token).await
    }
}

async fn rejected(response: Response) -> SinkError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    SinkError::Rejected(format!("HTTP {}: {}", status, body.trim()))
}

fn is_unauthorized(error: &SinkError) -> bool {
    matches!(error, SinkError::Rejected(message) if message.starts_with("HTTP 401"))
}

#[async_trait]
impl Sink for BigQuerySink {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    async fn persist(&mut self, record: &ValidatedAgentRecord) -> SinkResult<()> {
        let token = self.tokens.access_token().await?;
        let result = self.write(record, &token).await;
        if let Err(error) = &result {
            if is_unauthorized(error) {
                // Next record mints a fresh token
                self.tokens.invalidate();
            }
        }
        result?;

        tracing::info!(
            "Inserted 1 row into {}.{}.{}",
            self.project,
            self.dataset,
            self.table
        );
        Ok(())
    }
}
