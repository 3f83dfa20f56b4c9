use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Environment variables that override the file configuration
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_PROJECT: &str = "PROJECT_ID";
pub const ENV_DATASET: &str = "DATASET_ID";
pub const ENV_TABLE: &str = "TABLE_ID";
pub const ENV_PROXY: &str = "AGENT_HARVEST_PROXY_URL";

/// Loads and parses a configuration file from the given path
///
/// The environment is not consulted; see [`load_config_with_env`].
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = parse_config_file(path)?;
    validate(&config)?;
    Ok(config)
}

/// Loads the configuration the way the binary does
///
/// Reads the TOML file when one is given (defaults otherwise), loads `.env`
/// if present, applies environment overrides, then validates.
///
/// # Example
///
/// ```no_run
/// use agent_harvest::config::load_config_with_env;
/// use std::path::Path;
///
/// let config = load_config_with_env(Some(Path::new("harvest.toml"))).unwrap();
/// println!("Last page: {}", config.crawl.max_page);
/// ```
pub fn load_config_with_env(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config_file(path)?,
        None => Config::default(),
    };

    if let Ok(env_path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", env_path.display());
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Overlays environment-sourced values onto the configuration
///
/// Empty values are ignored. `lookup` is `std::env::var` in production.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(ENV_CREDENTIALS) {
        config.warehouse.credentials_path = Some(v);
    }
    if let Some(v) = get(ENV_PROJECT) {
        config.warehouse.project = Some(v);
    }
    if let Some(v) = get(ENV_DATASET) {
        config.warehouse.dataset = Some(v);
    }
    if let Some(v) = get(ENV_TABLE) {
        config.warehouse.table = Some(v);
    }
    if let Some(v) = get(ENV_PROXY) {
        config.http.proxy_url = Some(v);
    }
}

fn parse_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}
