use config::ConfigError;
use thiserror::Error;

use crate::monitoring::MonitoringError;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("unable to load config: {0}")]
    ConfigLoadError(#[source] ConfigError),
    #[error("unable to show config: {0}")]
    ConfigShowError(#[source] ConfigError),
    #[error("invalid config value: {0}")]
    InvalidConfigValueError(String),
    #[error("unable to create log file: {0}")]
    LogFileCreationError(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("unable to initialize tracing subscriber: {0}")]
    TracingSubscriberInitError(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("unable to initialize monitoring agent: {0}")]
    MonitoringError(#[from] MonitoringError),
    #[error("server boot failed: {0:#}")]
    ServerBootError(#[source] anyhow::Error),
    #[error("unable to build service provider: {0}")]
    ServiceProviderError(String),
}
