//! Typed settings loaded from the stocktake YAML file
//!
//! Section and key names follow the existing configuration files: upper-case
//! section names, upper-case keys in GENERAL/LOGGING/RABBIT and lower-case
//! keyword arguments inside the Elasticsearch session and generator sections.

use super::error::{ConfigError, ConfigResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "STAC_STOCKTAKE_CONFIGURATION_FILE";

/// File looked up in the working directory when nothing else names one
pub const DEFAULT_CONFIG_FILE: &str = ".stac_stocktake.yml";

const REDACTED: &str = "********";

/// Complete, validated settings
///
/// Built once at startup and shared read-only for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "GENERAL", alias = "STOCKTAKE")]
    pub general: GeneralSettings,

    #[serde(rename = "LOGGING", default)]
    pub logging: LoggingSettings,

    #[serde(rename = "RABBIT", default, skip_serializing_if = "Option::is_none")]
    pub rabbit: Option<RabbitSettings>,

    #[serde(rename = "ELASTICSEARCH")]
    pub elasticsearch: ElasticsearchSettings,

    #[serde(rename = "GENERATOR")]
    pub generator: GeneratorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    #[serde(rename = "FBI_INDEX")]
    pub fbi_index: String,

    #[serde(rename = "STAC_INDEX")]
    pub stac_index: String,

    /// Index holding slice checkpoints; file checkpoints are used when absent
    #[serde(rename = "STATE_INDEX", default, skip_serializing_if = "Option::is_none")]
    pub state_index: Option<String>,

    #[serde(rename = "MAX_SLICES", default = "default_max_slices")]
    pub max_slices: u32,

    #[serde(rename = "START_SLICE", default)]
    pub start_slice: u32,

    /// Exclusive upper bound of the slice range
    #[serde(rename = "END_SLICE", default, skip_serializing_if = "Option::is_none")]
    pub end_slice: Option<u32>,

    #[serde(rename = "PIT_KEEP_ALIVE", default)]
    pub pit_keep_alive: KeepAlive,

    #[serde(rename = "SEARCH_SIZE", default = "default_search_size")]
    pub search_size: usize,

    #[serde(rename = "SEARCH_PER_CHUNK", default = "default_search_per_chunk")]
    pub search_per_chunk: usize,

    #[serde(rename = "PARALLEL_SLICES", default = "default_parallel_slices")]
    pub parallel_slices: usize,

    #[serde(rename = "WORKING_DIRECTORY", default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,

    #[serde(rename = "DATA_DIRECTORY", default, skip_serializing_if = "Option::is_none")]
    pub data_directory: Option<PathBuf>,
}

fn default_max_slices() -> u32 {
    10
}

fn default_search_size() -> usize {
    10_000
}

fn default_search_per_chunk() -> usize {
    10
}

fn default_parallel_slices() -> usize {
    1
}

impl GeneralSettings {
    /// Exclusive end of the slice range, clamped to `MAX_SLICES`
    pub fn effective_end_slice(&self) -> u32 {
        self.end_slice
            .unwrap_or(self.max_slices)
            .min(self.max_slices)
    }

    pub fn working_directory(&self) -> PathBuf {
        match &self.working_directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Root of the chunk spool and file checkpoints
    pub fn data_directory(&self) -> PathBuf {
        match &self.data_directory {
            Some(dir) => dir.clone(),
            None => self.working_directory().join("data"),
        }
    }
}

/// Elasticsearch time value such as `5m` or `30s`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeepAlive(String);

static KEEP_ALIVE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(d|h|m|s|ms|micros|nanos)$").expect("valid keep-alive regex"));

impl KeepAlive {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for KeepAlive {
    fn default() -> Self {
        KeepAlive("5m".to_string())
    }
}

impl TryFrom<String> for KeepAlive {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if KEEP_ALIVE_PATTERN.is_match(trimmed) {
            Ok(KeepAlive(trimmed.to_string()))
        } else {
            Err(format!(
                "'{value}' is not an Elasticsearch time value (expected e.g. 5m, 30s, 1h)"
            ))
        }
    }
}

impl From<KeepAlive> for String {
    fn from(value: KeepAlive) -> Self {
        value.0
    }
}

impl std::fmt::Display for KeepAlive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(rename = "LEVEL", default = "default_log_level")]
    pub level: String,

    /// `text`, `ext` or `json`
    #[serde(rename = "FORMAT", default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(rename = "FILE", default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchSettings {
    #[serde(rename = "SESSION_KWARGS")]
    pub session: ElasticsearchSession,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchSession {
    /// One host or a list; entries without a scheme get one from `use_ssl`
    #[serde(deserialize_with = "one_or_many")]
    pub hosts: Vec<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    #[serde(default)]
    pub use_ssl: bool,

    #[serde(default = "default_true")]
    pub verify_certs: bool,

    #[serde(default = "default_true")]
    pub ssl_show_warn: bool,

    /// Extra headers sent with every request (API keys and the like)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

fn default_timeout() -> f64 {
    30.0
}

fn default_true() -> bool {
    true
}

impl ElasticsearchSession {
    /// Host base URLs with scheme and without a trailing slash
    pub fn base_urls(&self) -> Vec<String> {
        let scheme = if self.use_ssl { "https" } else { "http" };
        self.hosts
            .iter()
            .map(|host| {
                let host = host.trim().trim_end_matches('/');
                if host.contains("://") {
                    host.to_string()
                } else {
                    format!("{scheme}://{host}")
                }
            })
            .collect()
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.timeout.max(0.0))
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(host) => vec![host],
        OneOrMany::Many(hosts) => hosts,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RabbitSettings {
    #[serde(rename = "SESSION_KWARGS")]
    pub session: RabbitSession,

    /// Informational only for fanout exchanges
    #[serde(rename = "ROUTING_KEY", default)]
    pub routing_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RabbitSession {
    #[serde(rename = "USER")]
    pub user: String,

    #[serde(rename = "PASSWORD")]
    pub password: String,

    #[serde(rename = "VHOST", default = "default_vhost")]
    pub vhost: String,

    #[serde(rename = "HOST")]
    pub host: String,

    #[serde(rename = "PORT", default = "default_amqp_port")]
    pub port: u16,

    /// Heartbeat interval in seconds
    #[serde(rename = "HEARTBEAT", default = "default_heartbeat")]
    pub heartbeat: u16,

    #[serde(rename = "EXCHANGE")]
    pub exchange: ExchangeSettings,
}

fn default_vhost() -> String {
    "/".to_string()
}

fn default_amqp_port() -> u16 {
    5672
}

fn default_heartbeat() -> u16 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeSettings {
    #[serde(rename = "NAME")]
    pub name: String,

    #[serde(rename = "TYPE", default)]
    pub kind: ExchangeType,

    #[serde(rename = "KWARGS", default)]
    pub options: ExchangeOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeType {
    #[default]
    Fanout,
    Topic,
    Direct,
    Headers,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeOptions {
    #[serde(default)]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub internal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSettings {
    pub generator: GeneratorMode,

    pub collection_descriptions: CollectionDescriptionSource,

    #[serde(default)]
    pub outputs: Vec<OutputSettings>,
}

/// Which kind of STAC record the generator produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    Asset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDescriptionSource {
    pub root_directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(alias = "name")]
    pub method: OutputMethod,

    #[serde(default, alias = "path", skip_serializing_if = "Option::is_none")]
    pub filepath: Option<PathBuf>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutputMethod {
    JsonFile,
    TextFile,
    #[serde(alias = "rabbitmq")]
    RabbitMq,
}

impl OutputMethod {
    pub fn needs_filepath(self) -> bool {
        matches!(self, OutputMethod::JsonFile | OutputMethod::TextFile)
    }
}

impl Settings {
    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate settings from YAML text
    pub fn from_yaml_str(contents: &str) -> ConfigResult<Self> {
        let settings: Settings = serde_yaml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let general = &self.general;

        if general.fbi_index.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "GENERAL.FBI_INDEX".to_string(),
            });
        }
        if general.stac_index.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "GENERAL.STAC_INDEX".to_string(),
            });
        }
        if general.max_slices == 0 {
            return Err(ConfigError::invalid("GENERAL.MAX_SLICES", "must be at least 1"));
        }
        if general.start_slice >= general.effective_end_slice() {
            return Err(ConfigError::invalid(
                "GENERAL.START_SLICE",
                format!(
                    "{} is not below END_SLICE {} (MAX_SLICES {})",
                    general.start_slice,
                    general.effective_end_slice(),
                    general.max_slices
                ),
            ));
        }
        if general.search_size == 0 {
            return Err(ConfigError::invalid("GENERAL.SEARCH_SIZE", "must be at least 1"));
        }
        if general.search_per_chunk == 0 {
            return Err(ConfigError::invalid(
                "GENERAL.SEARCH_PER_CHUNK",
                "must be at least 1",
            ));
        }
        if general.parallel_slices == 0 {
            return Err(ConfigError::invalid(
                "GENERAL.PARALLEL_SLICES",
                "must be at least 1",
            ));
        }

        if self.elasticsearch.session.hosts.is_empty() {
            return Err(ConfigError::Missing {
                key: "ELASTICSEARCH.SESSION_KWARGS.hosts".to_string(),
            });
        }
        if !self.elasticsearch.session.timeout.is_finite() || self.elasticsearch.session.timeout <= 0.0 {
            return Err(ConfigError::invalid(
                "ELASTICSEARCH.SESSION_KWARGS.timeout",
                "must be a positive number of seconds",
            ));
        }

        if let Some(rabbit) = &self.rabbit {
            if rabbit.session.exchange.name.trim().is_empty() {
                return Err(ConfigError::Missing {
                    key: "RABBIT.SESSION_KWARGS.EXCHANGE.NAME".to_string(),
                });
            }
        }

        if self.generator.outputs.is_empty() {
            return Err(ConfigError::Missing {
                key: "GENERATOR.outputs".to_string(),
            });
        }
        for (position, output) in self.generator.outputs.iter().enumerate() {
            if output.method.needs_filepath() && output.filepath.is_none() {
                return Err(ConfigError::Missing {
                    key: format!("GENERATOR.outputs[{position}].filepath"),
                });
            }
            if output.method == OutputMethod::RabbitMq && self.rabbit.is_none() {
                return Err(ConfigError::invalid(
                    &format!("GENERATOR.outputs[{position}].method"),
                    "rabbit_mq output requires a RABBIT section",
                ));
            }
        }

        Ok(())
    }

    /// Routing key for stocktake events and the `rabbit_mq` output
    pub fn routing_key(&self) -> &str {
        self.rabbit
            .as_ref()
            .map(|rabbit| rabbit.routing_key.as_str())
            .unwrap_or_default()
    }

    /// Copy of the settings with credentials masked, for display
    pub fn redacted(&self) -> Settings {
        let mut copy = self.clone();
        if let Some(rabbit) = copy.rabbit.as_mut() {
            rabbit.session.password = REDACTED.to_string();
        }
        for (name, value) in copy.elasticsearch.session.headers.iter_mut() {
            let lowered = name.to_ascii_lowercase();
            if lowered.contains("auth") || lowered.contains("key") || lowered.contains("token") {
                *value = REDACTED.to_string();
            }
        }
        copy
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }
}

/// Resolve which configuration file to load
///
/// Order: explicit path, then `STAC_STOCKTAKE_CONFIGURATION_FILE`, then
/// `.stac_stocktake.yml` in the working directory.
pub fn discover_config_path(explicit: Option<&Path>) -> ConfigResult<PathBuf> {
    let candidate = match explicit {
        Some(path) => path.to_path_buf(),
        None => match std::env::var_os(CONFIG_ENV_VAR) {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(DEFAULT_CONFIG_FILE),
        },
    };

    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(ConfigError::NotFound { path: candidate })
    }
}
