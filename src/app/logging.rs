use super::config::Config;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log filter {filter:?}: {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize tracing once at startup. The AWS SDK crates are noisy at
/// info level, so they get their own directives.
pub fn setup_logging(config: &Config) -> Result<(), LoggingError> {
    let filter_string = format!(
        "{},aws_config=warn,aws_smithy_runtime=warn,aws_sdk_s3=warn,aws_sdk_sqs=warn,hyper=warn",
        config.log_level.as_str()
    );

    let env_filter =
        EnvFilter::try_new(&filter_string).map_err(|source| LoggingError::InvalidFilter {
            filter: filter_string.clone(),
            source,
        })?;

    if config.log_json {
        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true).with_level(true));
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_level(true).compact());
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
