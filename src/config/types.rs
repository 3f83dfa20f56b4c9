use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Agent-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawl: CrawlConfig,
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub output: OutputConfig,
    pub warehouse: WarehouseConfig,
    pub logging: LoggingConfig,
}

/// Target site locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site root; the home page and session endpoint hang off it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Paginated agent directory
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Optional `priceRange` filter sent with every listing request
    #[serde(rename = "price-range")]
    pub price_range: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.zillow.com".to_string(),
            listing_url:
                "https://www.zillow.com/professionals/real-estate-agent-reviews/raleigh-nc/"
                    .to_string(),
            price_range: Some("250000,700000".to_string()),
        }
    }
}

/// Crawl loop behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// First listing page to request
    #[serde(rename = "start-page")]
    pub start_page: u32,

    /// Last listing page to request (inclusive)
    #[serde(rename = "max-page")]
    pub max_page: u32,

    /// Pause before every listing page request (milliseconds)
    #[serde(rename = "page-interval-ms")]
    pub page_interval_ms: u64,

    /// Detail page extraction strategy
    pub parser: ParserStrategy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_page: 1,
            max_page: 25,
            page_interval_ms: 5000,
            parser: ParserStrategy::EmbeddedJson,
        }
    }
}

impl CrawlConfig {
    pub fn page_interval(&self) -> Duration {
        Duration::from_millis(self.page_interval_ms)
    }
}

/// Which detail page parser to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParserStrategy {
    /// Read the `__NEXT_DATA__` JSON blob
    EmbeddedJson,
    /// Select rendered markup nodes
    Markup,
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Timeout for home, session and listing requests (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Timeout for detail page requests (seconds)
    #[serde(rename = "detail-timeout-secs")]
    pub detail_timeout_secs: u64,

    /// Proxy applied to both http and https traffic
    #[serde(rename = "proxy-url")]
    pub proxy_url: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36"
                .to_string(),
            timeout_secs: 10,
            detail_timeout_secs: 15,
            proxy_url: None,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }
}

/// Retry settings shared by every fetch call site
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per request, including the first one
    pub attempts: u32,

    /// Delay between home, session and listing attempts (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Delay between detail page attempts (milliseconds)
    #[serde(rename = "detail-delay-ms")]
    pub detail_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 12,
            delay_ms: 2000,
            detail_delay_ms: 3000,
        }
    }
}

/// Where validated records go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SinkKind {
    Csv,
    Sqlite,
    Bigquery,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub sink: SinkKind,

    /// Path to the CSV file (csv sink)
    #[serde(rename = "csv-path")]
    pub csv_path: String,

    /// Path to the SQLite database file (sqlite sink)
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Csv,
            csv_path: "zillow_agents_data.csv".to_string(),
            database_path: "agents.db".to_string(),
        }
    }
}

/// BigQuery destination
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub project: Option<String>,
    pub dataset: Option<String>,
    pub table: Option<String>,

    /// File holding a bearer token, bare or as `{"access_token": ...}`
    #[serde(rename = "credentials-path")]
    pub credentials_path: Option<String>,

    /// Dataset location used when the dataset has to be created
    pub location: String,

    #[serde(rename = "api-base-url")]
    pub api_base_url: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            project: None,
            dataset: None,
            table: None,
            credentials_path: None,
            location: "US".to_string(),
            api_base_url: "https://bigquery.googleapis.com/bigquery/v2".to_string(),
        }
    }
}

impl WarehouseConfig {
    /// Fully-qualified `<project>.<dataset>.<table>` identity, if complete
    pub fn full_table_id(&self) -> Option<String> {
        match (&self.project, &self.dataset, &self.table) {
            (Some(p), Some(d), Some(t)) => Some(format!("{}.{}.{}", p, d, t)),
            _ => None,
        }
    }
}

/// Log file configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Debug-level log file, truncated on every run; blank turns it off
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: Some("logs/app.log".to_string()),
        }
    }
}

impl LoggingConfig {
    /// The log file to write, if file logging is on
    pub fn file_path(&self) -> Option<&str> {
        self.file.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }
}
