use std::{
    collections::BTreeMap,
    env,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use config::{ConfigError, File, ValueKind};
use serde::Deserialize;

/// Environment variable naming the folder that holds `config.toml`.
pub const CONFIG_FOLDER_VAR: &str = "KINDLE_CONFIG";

static DEFAULT_CONFIG_FOLDER: LazyLock<PathBuf> = LazyLock::new(|| {
    if let Ok(dir) = env::var(CONFIG_FOLDER_VAR) {
        return PathBuf::from(dir);
    }
    let mut root_path = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    root_path.push("etc");
    root_path
});

/// Config is the configuration of the application.
///
/// It is loaded from the `config.toml` file in the `etc` folder of the application, then
/// overridden by environment variables such as `KINDLE__SERVER__BIND_ADDRESS`.
///
/// # Example
/// ```
/// use kindle_bootstrap::config::{Config, ConfigPrefix};
/// use serde::Deserialize;
///
/// #[derive(Deserialize, Default)]
/// #[serde(default)]
/// struct PortConfig {
///     port: u16,
/// }
/// impl ConfigPrefix for PortConfig {
///     const PREFIX: &'static str = "port";
/// }
///
/// let config = Config::load(Some("KINDLE"), "__").unwrap();
/// let _port = config.get::<PortConfig>().unwrap().port;
/// ```
#[derive(Clone)]
pub struct Config {
    inner: config::Config,
}

impl Config {
    pub fn new(inner: config::Config) -> Self {
        Self { inner }
    }

    pub fn default_folder() -> &'static Path {
        DEFAULT_CONFIG_FOLDER.as_path()
    }

    pub fn load(
        env_config_prefix: Option<&str>,
        env_config_split: &str,
    ) -> Result<Self, ConfigError> {
        Self::from_folder(Self::default_folder(), env_config_prefix, env_config_split)
    }

    pub fn from_folder(
        path: &Path,
        env_config_prefix: Option<&str>,
        env_config_split: &str,
    ) -> Result<Self, ConfigError> {
        let cfg = path.join("config.toml");
        let mut builder = config::Config::builder();

        if cfg.exists() {
            builder = builder.add_source(File::from(cfg));
        } else {
            // logging is not up yet, this only shows when a subscriber is already installed
            tracing::warn!("not found config `{}`", cfg.display());
        }
        // add environment variables to config
        if let Some(prefix) = env_config_prefix {
            builder = builder.add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator(env_config_split)
                    .separator(env_config_split),
            );
        } else {
            builder =
                builder.add_source(config::Environment::default().separator(env_config_split));
        }
        let config = builder.build()?;

        Ok(Self { inner: config })
    }

    /// Reads the section named by `T::PREFIX`.
    ///
    /// A missing section is deserialized from an empty table, so sections whose fields all
    /// carry serde defaults never fail with `NotFound`.
    pub fn get<'de, T>(&self) -> Result<T, ConfigError>
    where
        T: ConfigPrefix + Deserialize<'de>,
    {
        match self.inner.get::<T>(T::PREFIX) {
            Ok(o) => Ok(o),
            Err(e) => {
                let ConfigError::NotFound(_) = &e else {
                    return Err(e);
                };
                let v = config::Value::new(None, ValueKind::Table(Default::default()));

                match T::deserialize(v) {
                    Ok(o) => Ok(o),
                    Err(_) => Err(e),
                }
            }
        }
    }

    /// Reads a single dotted key such as `monitoring.failure_policy`.
    pub fn get_value<'de, T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: Deserialize<'de>,
    {
        self.inner.get::<T>(key)
    }

    pub fn to_properties(&self) -> Result<Properties, ConfigError> {
        Properties::from_config(self)
    }
}

/// ConfigPrefix is a trait that is used to identify the section of a configuration.
pub trait ConfigPrefix {
    const PREFIX: &'static str;
}

const REDACTED: &str = "******";
const SECRET_MARKERS: [&str; 4] = ["key", "secret", "password", "token"];

/// Flattened `dotted.key[index] = value` view of a [`Config`], used to print it.
pub struct Properties {
    properties: BTreeMap<String, String>,
}

pub struct PropertiesConfig {
    array_split: bool,
    separator: char,
    redact_secrets: bool,
}

impl Default for PropertiesConfig {
    fn default() -> Self {
        PropertiesConfig {
            array_split: true,
            separator: '.',
            redact_secrets: true,
        }
    }
}

impl Properties {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::from_config_opt(config, &PropertiesConfig::default())
    }

    pub fn from_config_opt(
        config: &Config,
        properties_config: &PropertiesConfig,
    ) -> Result<Self, ConfigError> {
        let mut properties = BTreeMap::new();
        let config_map: BTreeMap<String, config::Value> =
            config.inner.clone().try_deserialize()?;
        for (key, value) in &config_map {
            Self::handle_value(key, value, &mut properties, properties_config);
        }
        Ok(Self { properties })
    }

    fn handle_value(
        key: &str,
        value: &config::Value,
        properties: &mut BTreeMap<String, String>,
        properties_config: &PropertiesConfig,
    ) {
        let rendered = match &value.kind {
            ValueKind::Table(nested) => {
                for (name, item) in nested {
                    let nested_key = format!("{}{}{}", key, properties_config.separator, name);
                    Self::handle_value(&nested_key, item, properties, properties_config);
                }
                return;
            }
            ValueKind::Array(arr) if properties_config.array_split => {
                for (index, item) in arr.iter().enumerate() {
                    let array_key = format!("{}[{}]", key, index);
                    Self::handle_value(&array_key, item, properties, properties_config);
                }
                return;
            }
            ValueKind::Array(arr) => arr
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<String>>()
                .join(","),
            ValueKind::Float(f) => format!("{:.2}", f),
            ValueKind::Nil => "Null".to_string(),
            _ => value.to_string(),
        };
        let rendered = if properties_config.redact_secrets && is_secret(key) {
            REDACTED.to_string()
        } else {
            rendered
        };
        properties.insert(key.to_string(), rendered);
    }

    /// Renders `key = value` lines in key order.
    pub fn to_lines(&self) -> Vec<String> {
        self.properties
            .iter()
            .map(|(key, value)| format!("{} = {}", key, value))
            .collect()
    }

    pub fn get_properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

fn is_secret(key: &str) -> bool {
    let leaf = key
        .rsplit('.')
        .next()
        .unwrap_or(key)
        .to_ascii_lowercase();
    SECRET_MARKERS.iter().any(|marker| leaf.contains(marker))
}
