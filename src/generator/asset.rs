//! STAC asset records

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Hex SHA-256 of the URI
    pub id: String,
    pub collection_id: String,
    pub properties: AssetProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetProperties {
    pub uri: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Values from the collection's extraction methods
    #[serde(flatten)]
    pub extracted: BTreeMap<String, Value>,
}

pub fn asset_id(uri: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(uri.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn filename(uri: &str) -> &str {
    uri.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(uri)
}

fn extension(filename: &str) -> Option<String> {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_string()),
        _ => None,
    }
}

impl Asset {
    pub fn new(uri: &str, collection_id: &str, extracted: BTreeMap<String, Value>) -> Self {
        let filename = filename(uri).to_string();
        Self {
            id: asset_id(uri),
            collection_id: collection_id.to_string(),
            properties: AssetProperties {
                uri: uri.to_string(),
                extension: extension(&filename),
                filename,
                extracted,
            },
        }
    }

    pub fn uri(&self) -> &str {
        &self.properties.uri
    }
}
