//! Process bootstrap: configuration, logging, optional performance monitoring, and the
//! hand-off to the server module.

pub mod bootstrap;
pub mod config;
pub mod environment;
pub mod error;
pub mod log;
pub mod module;
pub mod monitoring;
pub mod serde;
pub mod server;

pub use bootstrap::Bootstrap;
pub use environment::{ACCOUNT_KEY_VAR, Environment};
pub use error::BootstrapError;
pub use monitoring::{MonitoringAgent, MonitoringFailurePolicy, NoopAgent, PrometheusAgent};
pub use server::ServerModule;
