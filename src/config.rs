//! Configuration management for the Metrica bridge.
//!
//! Supports configuration via CLI arguments, environment variables,
//! and a JSON configuration file with sensible defaults.

use crate::error::{MetrikaError, Result};
use crate::query::DEFAULT_BASE_URL;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI arguments for the Metrica bridge.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "metrika",
    version,
    about = "Typed, retrying client for the Yandex Metrica reporting API",
    long_about = "Builds validated report URLs for the Yandex Metrica management and\n\
                  statistics APIs and executes them with a bounded, linear-backoff retry policy.",
    after_help = "EXAMPLES:\n    \
        metrika list\n    \
        metrika url get_sources_summary --params '{\"counter_id\":\"44147844\"}'\n    \
        metrika call get_data_by_time --params '{\"counter_id\":\"44147844\",\"metrics\":[\"ym:s:visits\"]}'"
)]
pub struct Args {
    /// OAuth access token
    #[arg(long, env = "METRIKA_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Request timeout in milliseconds
    #[arg(long, env = "METRIKA_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Maximum attempts per request (at least 1)
    #[arg(long, env = "METRIKA_RETRIES")]
    pub retries: Option<u32>,

    /// Base retry delay in milliseconds, multiplied by the attempt number
    #[arg(long, env = "METRIKA_RETRY_DELAY_MS")]
    pub retry_delay_ms: Option<u64>,

    /// API origin
    #[arg(long, env = "METRIKA_BASE_URL")]
    pub base_url: Option<String>,

    /// Path to a JSON configuration file
    #[arg(short, long, env = "METRIKA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, env = "METRIKA_VERBOSE")]
    pub verbose: bool,

    /// Output logs as JSON
    #[arg(long, env = "METRIKA_JSON_LOGS")]
    pub json_logs: bool,

    /// Action to perform
    #[command(subcommand)]
    pub command: Command,
}

/// What the CLI should do.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List every operation with its parameters
    List,

    /// Build and print the request URL without sending it
    Url {
        /// Operation name, e.g. get_sources_summary
        operation: String,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Execute an operation and print the JSON response
    Call {
        /// Operation name, e.g. get_sources_summary
        operation: String,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },
}

impl Args {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Transport tunables. Immutable once a client is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Per-attempt request timeout.
    #[serde(with = "millis", default = "default_timeout")]
    pub timeout: Duration,

    /// Maximum attempts per logical call, at least 1.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Base retry delay; attempt `n` waits `retry_delay * n`.
    #[serde(with = "millis", default = "default_retry_delay")]
    pub retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_millis(30_000)
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(1_000)
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OAuth access token.
    #[serde(default, skip_serializing)]
    pub token: String,

    /// API origin.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Transport settings.
    #[serde(default)]
    pub client: ClientConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Config {
    /// Configuration with default settings for the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: default_base_url(),
            client: ClientConfig::default(),
        }
    }

    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MetrikaError::ConfigFileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| MetrikaError::ConfigParse { source: e })
    }

    /// Create configuration from CLI arguments.
    ///
    /// The config file, if any, is loaded first; explicit arguments override it.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::new(String::new()),
        };

        config.token = args.token.clone();
        if let Some(base_url) = &args.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(ms) = args.timeout_ms {
            config.client.timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = args.retries {
            config.client.retries = retries;
        }
        if let Some(ms) = args.retry_delay_ms {
            config.client.retry_delay = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(MetrikaError::MissingToken);
        }

        if self.base_url.is_empty() {
            return Err(MetrikaError::InvalidConfig(
                "base URL cannot be empty".to_string(),
            ));
        }

        if self.client.retries == 0 {
            return Err(MetrikaError::InvalidConfig(
                "retries must be at least 1".to_string(),
            ));
        }

        if self.client.timeout.is_zero() {
            return Err(MetrikaError::InvalidConfig(
                "timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Duration (de)serialization as milliseconds.
///
/// Accepts `"250ms"`, `"30s"` or a bare millisecond count (number or string).
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = match Raw::deserialize(deserializer)? {
            Raw::Number(ms) => return Ok(Duration::from_millis(ms)),
            Raw::Text(s) => s,
        };

        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else {
            s.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(token: &str) -> Args {
        Args::parse_from(["metrika", "--token", token, "list"])
    }

    #[test]
    fn test_client_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(30_000));
        assert_eq!(config.retries, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(1_000));
    }

    #[test]
    fn test_partial_config_gets_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"token": "t", "client": {"timeout": "250ms", "retry_delay": 10}}"#,
        )
        .unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.client.timeout, Duration::from_millis(250));
        assert_eq!(config.client.retry_delay, Duration::from_millis(10));
        assert_eq!(config.client.retries, 3);
    }

    #[test]
    fn test_seconds_suffix() {
        let config: ClientConfig = serde_json::from_str(r#"{"timeout": "5s"}"#).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_validate() {
        assert!(Config::new("token").validate().is_ok());
        assert!(matches!(
            Config::new("  ").validate(),
            Err(MetrikaError::MissingToken)
        ));

        let mut config = Config::new("token");
        config.client.retries = 0;
        assert!(matches!(
            config.validate(),
            Err(MetrikaError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_args_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"base_url": "http://localhost:9999", "client": {{"retries": 5, "timeout": 1000}}}}"#
        )
        .unwrap();

        let mut args = args("secret");
        args.config = Some(file.path().to_path_buf());
        args.timeout_ms = Some(2_000);

        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.token, "secret");
        assert_eq!(config.base_url, "http://localhost:9999");
        assert_eq!(config.client.retries, 5);
        assert_eq!(config.client.timeout, Duration::from_millis(2_000));
    }

    #[test]
    fn test_empty_token_refuses_to_start() {
        assert!(matches!(
            Config::from_args(&args("")),
            Err(MetrikaError::MissingToken)
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let mut args = args("secret");
        args.config = Some(PathBuf::from("/nonexistent/metrika.json"));
        assert!(matches!(
            Config::from_args(&args),
            Err(MetrikaError::ConfigFileRead { .. })
        ));
    }
}
