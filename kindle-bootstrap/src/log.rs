use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    config::{Config, ConfigPrefix},
    error::BootstrapError,
};

/// The `logging` section.
///
/// ```toml
/// [logging]
/// level = "info"
/// loggers = [{ target = "tower_http", level = "debug" }]
///
/// [logging.console]
/// enable = true
///
/// [logging.file]
/// enable = true
/// path = "logs/kindle.log"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    level: Level,
    loggers: Vec<Logger>,
    console: ConsoleAppenderConfig,
    file: FileAppenderConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::default(),
            loggers: Vec::new(),
            console: ConsoleAppenderConfig::default(),
            file: FileAppenderConfig::default(),
        }
    }
}

impl LoggingConfig {
    pub fn new(config: &Config) -> Result<Self, BootstrapError> {
        let logging: LoggingConfig = config.get().map_err(BootstrapError::ConfigLoadError)?;
        logging.validate()?;
        Ok(logging)
    }

    fn validate(&self) -> Result<(), BootstrapError> {
        if self.console.enable && self.console.write_level == Level::Off {
            return Err(BootstrapError::InvalidConfigValueError(
                "logging.console.write_level=Off".to_string(),
            ));
        }
        if self.file.enable {
            if self.file.write_level == Level::Off {
                return Err(BootstrapError::InvalidConfigValueError(
                    "logging.file.write_level=Off".to_string(),
                ));
            }
            if self.file.path.as_os_str().is_empty() {
                return Err(BootstrapError::InvalidConfigValueError(
                    "logging.file.path is empty".to_string(),
                ));
            }
        }
        if let Some(logger) = self.loggers.iter().find(|l| l.target.trim().is_empty()) {
            return Err(BootstrapError::InvalidConfigValueError(format!(
                "logging.loggers[?].target is empty (level={})",
                logger.level
            )));
        }
        Ok(())
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn loggers(&self) -> &[Logger] {
        &self.loggers
    }

    pub fn console_appender_config(&self) -> &ConsoleAppenderConfig {
        &self.console
    }

    pub fn file_appender_config(&self) -> &FileAppenderConfig {
        &self.file
    }
}

impl ConfigPrefix for LoggingConfig {
    const PREFIX: &'static str = "logging";
}

/// A per-target level override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Logger {
    target: String,
    level: Level,
}

impl Logger {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleAppenderConfig {
    enable: bool,
    write_level: Level,
}

impl Default for ConsoleAppenderConfig {
    fn default() -> Self {
        Self {
            enable: true,
            write_level: Level::Trace,
        }
    }
}

impl ConsoleAppenderConfig {
    pub fn enable(&self) -> bool {
        self.enable
    }

    pub fn write_level(&self) -> Level {
        self.write_level
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileAppenderConfig {
    enable: bool,
    path: PathBuf,
    max_size: u64,
    max_count: usize,
    write_level: Level,
}

impl Default for FileAppenderConfig {
    fn default() -> Self {
        Self {
            enable: false,
            path: PathBuf::from("logs/kindle.log"),
            max_size: 10 * 1024 * 1024,
            max_count: 5,
            write_level: Level::Trace,
        }
    }
}

impl FileAppenderConfig {
    pub fn enable(&self) -> bool {
        self.enable
    }

    pub fn file_path(&self) -> &PathBuf {
        &self.path
    }

    pub fn file_max_size(&self) -> u64 {
        self.max_size
    }

    pub fn file_max_count(&self) -> usize {
        self.max_count
    }

    pub fn write_level(&self) -> Level {
        self.write_level
    }
}

/// Keeps the non-blocking writers flushing until the process ends.
pub struct AppenderGuard {
    _guards: Vec<WorkerGuard>,
}

impl AppenderGuard {
    pub fn new(guards: Vec<WorkerGuard>) -> Self {
        Self { _guards: guards }
    }
}

#[derive(Debug, Default, Copy, Clone, Serialize, PartialEq, Eq)]
pub enum Level {
    /// The "trace" level.
    Trace,
    /// The "debug" level.
    Debug,
    /// The "info" level.
    #[default]
    Info,
    /// The "warn" level.
    Warn,
    /// The "error" level.
    Error,
    /// Off level.
    Off,
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        const VARIANTS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|_| <D::Error as serde::de::Error>::unknown_variant(&s, &VARIANTS))
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct ParseLevelError;

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("trace") => Ok(Level::Trace),
            s if s.eq_ignore_ascii_case("debug") => Ok(Level::Debug),
            s if s.eq_ignore_ascii_case("info") => Ok(Level::Info),
            s if s.eq_ignore_ascii_case("warn") => Ok(Level::Warn),
            s if s.eq_ignore_ascii_case("error") => Ok(Level::Error),
            s if s.eq_ignore_ascii_case("off") => Ok(Level::Off),
            _ => Err(ParseLevelError),
        }
    }
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "Trace",
            Level::Debug => "Debug",
            Level::Info => "Info",
            Level::Warn => "Warn",
            Level::Error => "Error",
            Level::Off => "Off",
        }
    }

    pub fn as_tracing_level(&self) -> Option<tracing::Level> {
        match self {
            Level::Trace => Some(tracing::Level::TRACE),
            Level::Debug => Some(tracing::Level::DEBUG),
            Level::Info => Some(tracing::Level::INFO),
            Level::Warn => Some(tracing::Level::WARN),
            Level::Error => Some(tracing::Level::ERROR),
            Level::Off => None,
        }
    }

    pub fn as_tracing_level_filter(&self) -> tracing::level_filters::LevelFilter {
        match self {
            Level::Trace => tracing::level_filters::LevelFilter::TRACE,
            Level::Debug => tracing::level_filters::LevelFilter::DEBUG,
            Level::Info => tracing::level_filters::LevelFilter::INFO,
            Level::Warn => tracing::level_filters::LevelFilter::WARN,
            Level::Error => tracing::level_filters::LevelFilter::ERROR,
            Level::Off => tracing::level_filters::LevelFilter::OFF,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
