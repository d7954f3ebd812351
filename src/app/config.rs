use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing destination bucket: set --dest-bucket or DEST_BUCKET")]
    MissingDestinationBucket,
    #[error("missing notification queue URL: set --queue-url or NOTIFICATION_QUEUE_URL")]
    MissingQueueUrl,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("file error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Destination bucket for converted NDJSON objects
    #[arg(long, env = "DEST_BUCKET")]
    pub dest_bucket: Option<String>,

    /// SQS queue delivering S3 object-created notifications
    #[arg(long, env = "NOTIFICATION_QUEUE_URL")]
    pub queue_url: Option<String>,

    /// Source object suffix accepted by the converter
    #[arg(long, env = "SOURCE_SUFFIX", default_value = ".ceff")]
    pub source_suffix: String,

    /// Maximum notifications processed concurrently within one batch
    #[arg(long, env = "MAX_IN_FLIGHT", default_value = "8")]
    pub max_in_flight: usize,

    /// SQS long-poll wait in seconds (0-20)
    #[arg(long, env = "POLL_WAIT_SECS", default_value = "20")]
    pub poll_wait_secs: i32,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dest_bucket: None,
            queue_url: None,
            source_suffix: ".ceff".to_string(),
            max_in_flight: 8,
            poll_wait_secs: 20,
            log_level: LogLevel::Info,
            log_json: false,
            config_file: None,
        }
    }
}

impl Config {
    pub fn from_args_and_env<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(|err| ConfigError::InvalidConfig(err.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Validate startup requirements. A missing destination bucket or
    /// queue URL is fatal here, before any notification is consumed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dest_bucket.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::MissingDestinationBucket);
        }
        if self.queue_url.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::MissingQueueUrl);
        }
        if !(0..=20).contains(&self.poll_wait_secs) {
            return Err(ConfigError::InvalidConfig(format!(
                "poll_wait_secs must be within 0-20, got {}",
                self.poll_wait_secs
            )));
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_in_flight must be at least 1".to_string(),
            ));
        }
        if self.source_suffix.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "source_suffix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
