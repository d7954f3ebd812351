pub mod config;
pub mod consumer;
pub mod logging;

pub use config::{Config, ConfigError, LogLevel};
pub use consumer::{ConsumerError, SqsConsumer};
pub use logging::{LoggingError, setup_logging};

use crate::pipeline::NotificationProcessor;
use crate::storage::S3Store;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

pub struct App {
    consumer: SqsConsumer,
}

impl App {
    pub async fn from_args<I, T>(args: I) -> Result<Self, Box<dyn std::error::Error + Send + Sync>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::from_args_and_env(args)?;
        Self::from_config(config).await
    }

    pub async fn from_config(
        config: Config,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        // Load config file if specified
        let final_config = if let Some(config_file) = &config.config_file {
            eprintln!("Loading configuration from file: {}", config_file.display());
            Config::from_file(config_file)?
        } else {
            config
        };

        final_config.validate()?;
        setup_logging(&final_config)?;

        let dest_bucket = final_config
            .dest_bucket
            .clone()
            .ok_or(ConfigError::MissingDestinationBucket)?;
        let queue_url = final_config
            .queue_url
            .clone()
            .ok_or(ConfigError::MissingQueueUrl)?;

        info!("Starting cef-log-converter v{}", env!("CARGO_PKG_VERSION"));
        info!(
            "Configuration: dest_bucket={}, queue_url={}, source_suffix={}, max_in_flight={}",
            dest_bucket, queue_url, final_config.source_suffix, final_config.max_in_flight
        );

        let aws_config = aws_config::load_from_env().await;
        let store = Arc::new(S3Store::new(aws_sdk_s3::Client::new(&aws_config)));
        let processor = Arc::new(NotificationProcessor::new(
            store,
            dest_bucket,
            final_config.max_in_flight,
        ));

        let consumer = SqsConsumer::new(
            aws_sdk_sqs::Client::new(&aws_config),
            queue_url,
            final_config.poll_wait_secs,
            final_config.source_suffix.clone(),
            processor,
        );

        Ok(Self { consumer })
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.consumer.run().await;
        info!("cef-log-converter stopped.");
        Ok(())
    }
}

// Main entry point for the application
pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args: Vec<String> = std::env::args().collect();

    match App::from_args(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("Application error: {e}");
                process::exit(1);
            }
        }
        Err(e) => {
            // Logging may not be initialized yet on the config path
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    }

    Ok(())
}
