//! Agent-Harvest: a real-estate agent profile harvester
//!
//! This crate walks the paginated agent directory of a listings site,
//! bootstraps a cookie session, extracts one profile record per detail page,
//! validates it against a fixed schema and appends it to a CSV file, a SQLite
//! table or a BigQuery table.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod record;

use thiserror::Error;

/// Main error type for Agent-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {target} failed after {attempts} attempt(s): {reason}")]
    Transport {
        target: String,
        attempts: u32,
        reason: String,
    },

    #[error("Session cookies missing: {missing}")]
    MissingSessionCookies { missing: String },

    #[error("Parse error ({context}): {message}")]
    Parse { context: String, message: String },

    #[error("Invalid value {value:?} for field {field}: {reason}")]
    Validation {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Sink error: {0}")]
    Sink(#[from] output::SinkError),
}

impl HarvestError {
    /// Builds a parse error with a short context label
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Returns the coarse kind the crawl loop uses for its continue/abort policy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Client(_) => ErrorKind::Config,
            Self::Transport { .. } | Self::MissingSessionCookies { .. } => ErrorKind::Transport,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Sink(_) => ErrorKind::Sink,
        }
    }
}

/// Closed set of failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Parse,
    Validation,
    Sink,
    Config,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Agent-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Termination};
pub use record::{validate, Field, RawAgentRecord, RawValue, ValidatedAgentRecord};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let transport = HarvestError::Transport {
            target: "https://example.com/".to_string(),
            attempts: 3,
            reason: "HTTP 503".to_string(),
        };
        assert_eq!(transport.kind(), ErrorKind::Transport);

        let missing = HarvestError::MissingSessionCookies {
            missing: "zguid".to_string(),
        };
        assert_eq!(missing.kind(), ErrorKind::Transport);

        assert_eq!(HarvestError::parse("x", "y").kind(), ErrorKind::Parse);

        let sink = HarvestError::from(output::SinkError::Rejected("nope".to_string()));
        assert_eq!(sink.kind(), ErrorKind::Sink);
    }

    #[test]
    fn test_transport_message() {
        let err = HarvestError::Transport {
            target: "listing page 4".to_string(),
            attempts: 12,
            reason: "HTTP 403".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Request to listing page 4 failed after 12 attempt(s): HTTP 403"
        );
    }
}
