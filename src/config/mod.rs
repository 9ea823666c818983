//! Configuration loading
//!
//! The stocktake is configured from one YAML file with the sections GENERAL,
//! LOGGING, RABBIT, ELASTICSEARCH and GENERATOR. Settings are immutable after
//! loading and are shared by reference.

mod error;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use settings::{
    discover_config_path, CollectionDescriptionSource, ElasticsearchSession,
    ElasticsearchSettings, ExchangeOptions, ExchangeSettings, ExchangeType, GeneralSettings,
    GeneratorMode, GeneratorSettings, KeepAlive, LoggingSettings, OutputMethod, OutputSettings,
    RabbitSession, RabbitSettings, Settings, CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE,
};

#[cfg(test)]
mod tests;
