pub mod config;
pub mod error;
pub mod http;
pub mod retry;

pub use config::{Config, EndpointConfig, ForecastConfig, LocationConfig, ValidationResult};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt};
pub use retry::{with_retry, RetryConfig};

use anyhow::Result;

/// Initialize tracing; `RUST_LOG` overrides `default_level`.
pub fn init(default_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("Floodcast core initialized");
    Ok(())
}
