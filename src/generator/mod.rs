//! Asset generation from collection descriptions

pub mod asset;
pub mod description;
pub mod error;
pub mod extraction;

pub use asset::{asset_id, Asset, AssetProperties};
pub use description::{load_descriptions, CollectionDescription};
pub use error::{GeneratorError, GeneratorResult};

use crate::config::GeneratorSettings;
use std::collections::BTreeMap;

/// Assets derived from a set of URIs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedBatch {
    pub assets: Vec<Asset>,
    /// URIs no collection description covers
    pub unmatched: Vec<String>,
}

impl GeneratedBatch {
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty() && self.unmatched.is_empty()
    }
}

/// Derives asset records for URIs
///
/// The description with the longest path covering a URI wins; ties go to the
/// description loaded first.
#[derive(Debug, Clone)]
pub struct AssetGenerator {
    descriptions: Vec<CollectionDescription>,
}

impl AssetGenerator {
    pub fn new(descriptions: Vec<CollectionDescription>) -> Self {
        Self { descriptions }
    }

    pub fn from_settings(settings: &GeneratorSettings) -> GeneratorResult<Self> {
        log::debug!("Generator mode: {:?}", settings.generator);
        let root = &settings.collection_descriptions.root_directory;
        let descriptions = load_descriptions(root)?;
        log::info!(
            "Loaded {} collection descriptions from {}",
            descriptions.len(),
            root.display()
        );
        Ok(Self::new(descriptions))
    }

    pub fn descriptions(&self) -> &[CollectionDescription] {
        &self.descriptions
    }

    pub fn description_for(&self, uri: &str) -> Option<&CollectionDescription> {
        let mut best: Option<(usize, &CollectionDescription)> = None;
        for description in &self.descriptions {
            if let Some(length) = description.match_length(uri) {
                if best.map_or(true, |(best_length, _)| length > best_length) {
                    best = Some((length, description));
                }
            }
        }
        best.map(|(_, description)| description)
    }

    /// Asset for one URI, `None` when no description covers it
    pub fn process(&self, uri: &str) -> Option<Asset> {
        let description = self.description_for(uri)?;
        let mut properties = BTreeMap::new();
        for extractor in &description.asset.extraction_methods {
            extractor.apply(uri, &mut properties);
        }
        Some(Asset::new(uri, &description.collection.id, properties))
    }

    pub fn process_all<I, S>(&self, uris: I) -> GeneratedBatch
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batch = GeneratedBatch::default();
        for uri in uris {
            let uri = uri.as_ref();
            match self.process(uri) {
                Some(asset) => batch.assets.push(asset),
                None => {
                    log::warn!("No collection description matches {}", uri);
                    batch.unmatched.push(uri.to_string());
                }
            }
        }
        batch
    }
}
