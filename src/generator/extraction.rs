//! Property extraction methods of a collection description

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// An extraction method as written in a description
///
/// ```yaml
/// extraction_methods:
///   - method: regex
///     inputs:
///       regex: '^/badc/cmip6/data/(?P<mip_era>[^/]+)/(?P<activity_id>[^/]+)/'
///   - method: default
///     inputs:
///       defaults:
///         platform: model
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", content = "inputs", rename_all = "snake_case")]
pub enum ExtractionConfig {
    Regex { regex: String },
    Default { defaults: BTreeMap<String, Value> },
}

/// A compiled extraction method
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "ExtractionConfig")]
pub enum Extractor {
    /// Named capture groups become string properties
    Regex(Regex),
    /// Fixed properties, never overriding an extracted value
    Default(BTreeMap<String, Value>),
}

impl TryFrom<ExtractionConfig> for Extractor {
    type Error = String;

    fn try_from(config: ExtractionConfig) -> Result<Self, Self::Error> {
        match config {
            ExtractionConfig::Regex { regex } => Regex::new(&regex)
                .map(Extractor::Regex)
                .map_err(|e| format!("invalid regex '{regex}': {e}")),
            ExtractionConfig::Default { defaults } => Ok(Extractor::Default(defaults)),
        }
    }
}

impl Extractor {
    pub fn apply(&self, uri: &str, properties: &mut BTreeMap<String, Value>) {
        match self {
            Extractor::Regex(regex) => {
                let Some(captures) = regex.captures(uri) else {
                    log::debug!("Regex {} does not match {}", regex.as_str(), uri);
                    return;
                };
                for name in regex.capture_names().flatten() {
                    if let Some(value) = captures.name(name) {
                        properties.insert(name.to_string(), Value::String(value.as_str().to_string()));
                    }
                }
            }
            Extractor::Default(defaults) => {
                for (key, value) in defaults {
                    properties
                        .entry(key.clone())
                        .or_insert_with(|| value.clone());
                }
            }
        }
    }
}
