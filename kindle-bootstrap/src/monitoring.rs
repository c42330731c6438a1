//! Performance monitoring agent.
//!
//! The agent is always linked into the binary; [`crate::bootstrap::Bootstrap`] decides
//! whether it is initialized, based on the account key found in the environment.

use std::{
    net::SocketAddr,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError, Sender},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::{
    config::ConfigPrefix,
    serde::{non_blank, positive},
};

#[derive(Debug, Error)]
pub enum MonitoringError {
    #[error("monitoring agent is already initialized")]
    AlreadyInitialized,
    #[error("account key must not be blank")]
    InvalidAccountKey,
    #[error("invalid listen address `{0}`")]
    InvalidListenAddress(String),
    #[error("unable to install prometheus exporter: {0}")]
    ExporterError(#[source] BuildError),
    #[error("unable to start sampler thread: {0}")]
    SamplerError(#[source] std::io::Error),
    #[error("invalid monitoring config: {0}")]
    InvalidConfig(#[source] config::ConfigError),
}

/// What the bootstrap does when the agent fails to initialize.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringFailurePolicy {
    /// Log the failure and boot the server without monitoring.
    #[default]
    Continue,
    /// Fail the startup; the server is never booted.
    Abort,
}

/// The `monitoring` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitoringConfig {
    failure_policy: MonitoringFailurePolicy,
    #[serde(deserialize_with = "non_blank")]
    app_name: String,
    #[serde(deserialize_with = "non_blank")]
    listen_address: String,
    #[serde(deserialize_with = "positive")]
    sample_interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            failure_policy: MonitoringFailurePolicy::default(),
            app_name: "kindle".to_string(),
            listen_address: "127.0.0.1:9464".to_string(),
            sample_interval_secs: 15,
        }
    }
}

impl ConfigPrefix for MonitoringConfig {
    const PREFIX: &'static str = "monitoring";
}

impl MonitoringConfig {
    pub fn failure_policy(&self) -> MonitoringFailurePolicy {
        self.failure_policy
    }

    /// Builds the configuration handed to [`MonitoringAgent::initialize`].
    pub fn agent_config(&self, account_key: &str) -> AgentConfig {
        AgentConfig::builder()
            .account_key(account_key)
            .app_name(self.app_name.clone())
            .listen_address(self.listen_address.clone())
            .sample_interval(Duration::from_secs(self.sample_interval_secs))
            .build()
    }
}

/// Options passed to the agent when it is initialized.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct AgentConfig {
    #[builder(setter(into))]
    account_key: String,
    #[builder(default = "kindle".to_string(), setter(into))]
    app_name: String,
    #[builder(default = "127.0.0.1:9464".to_string(), setter(into))]
    listen_address: String,
    #[builder(default = Duration::from_secs(15))]
    sample_interval: Duration,
}

impl AgentConfig {
    pub fn account_key(&self) -> &str {
        &self.account_key
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn listen_address(&self) -> &str {
        &self.listen_address
    }

    pub fn sample_interval(&self) -> Duration {
        self.sample_interval
    }
}

/// A monitoring integration with an explicit lifecycle.
pub trait MonitoringAgent: Send + Sync {
    fn initialize(&self, config: &AgentConfig) -> Result<(), MonitoringError>;

    /// Stops whatever `initialize` started. Must be safe to call more than once.
    fn shutdown(&self);
}

/// An agent that accepts any configuration and does nothing.
#[derive(Debug, Default)]
pub struct NoopAgent;

impl MonitoringAgent for NoopAgent {
    fn initialize(&self, _config: &AgentConfig) -> Result<(), MonitoringError> {
        Ok(())
    }

    fn shutdown(&self) {}
}

// the metrics recorder is global, so is the flag guarding its installation
static RECORDER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Exposes process metrics on a Prometheus scrape endpoint.
///
/// Every series carries the `app` label and the `account` label, the latter holding
/// [`account_fingerprint`] rather than the key itself. Besides whatever the rest of the
/// process records through the `metrics` macros, the agent keeps
/// `kindle_process_uptime_seconds` current from a sampler thread.
#[derive(Default)]
pub struct PrometheusAgent {
    sampler: Mutex<Option<Sampler>>,
}

struct Sampler {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl PrometheusAgent {
    pub fn new() -> Self {
        Self::default()
    }

    fn install_recorder(config: &AgentConfig, addr: SocketAddr) -> Result<(), MonitoringError> {
        if RECORDER_INSTALLED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MonitoringError::AlreadyInitialized);
        }
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .add_global_label("app", config.app_name())
            .add_global_label("account", account_fingerprint(config.account_key()))
            .install()
            .map_err(|e| {
                RECORDER_INSTALLED.store(false, Ordering::Release);
                MonitoringError::ExporterError(e)
            })
    }

    fn start_sampler(interval: Duration) -> Result<Sampler, MonitoringError> {
        let (stop_tx, stopped) = mpsc::channel::<()>();
        let started = Instant::now();
        let handle = thread::Builder::new()
            .name("kindle-sampler".to_string())
            .spawn(move || {
                loop {
                    metrics::gauge!("kindle_process_uptime_seconds")
                        .set(started.elapsed().as_secs_f64());
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(MonitoringError::SamplerError)?;
        Ok(Sampler { stop_tx, handle })
    }
}

impl MonitoringAgent for PrometheusAgent {
    fn initialize(&self, config: &AgentConfig) -> Result<(), MonitoringError> {
        if config.account_key().trim().is_empty() {
            return Err(MonitoringError::InvalidAccountKey);
        }
        let addr: SocketAddr = config
            .listen_address()
            .parse()
            .map_err(|_| MonitoringError::InvalidListenAddress(config.listen_address().into()))?;

        // the recorder cannot be uninstalled, so everything that can fail goes first
        let sampler = Self::start_sampler(config.sample_interval())?;
        if let Err(e) = Self::install_recorder(config, addr) {
            sampler.stop();
            return Err(e);
        }
        metrics::gauge!("kindle_agent_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

        if let Ok(mut slot) = self.sampler.lock() {
            let _ = slot.insert(sampler);
        }
        tracing::info!(
            address = %addr,
            app = config.app_name(),
            "prometheus exporter listening"
        );
        Ok(())
    }

    fn shutdown(&self) {
        let sampler = match self.sampler.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(sampler) = sampler {
            sampler.stop();
            tracing::debug!("monitoring agent stopped");
        }
    }
}

impl Sampler {
    fn stop(self) {
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            tracing::warn!("sampler thread panicked");
        }
    }
}

/// Short, non-reversible identifier of an account key: the first 12 hex digits of its
/// SHA-256 digest.
pub fn account_fingerprint(account_key: &str) -> String {
    let digest = Sha256::digest(account_key.as_bytes());
    hex::encode(&digest[..6])
}
