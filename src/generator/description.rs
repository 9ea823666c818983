//! Collection descriptions
//!
//! A description names the URI prefixes it covers, the collection its assets
//! belong to and how asset properties are extracted:
//!
//! ```yaml
//! paths:
//!   - /badc/cmip6/data
//! collection:
//!   id: cmip6
//! asset:
//!   extraction_methods:
//!     - method: default
//!       inputs:
//!         defaults:
//!           project: CMIP6
//! ```

use super::error::{GeneratorError, GeneratorResult};
use super::extraction::Extractor;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DESCRIPTION_EXTENSIONS: [&str; 3] = ["yml", "yaml", "json"];

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionDescription {
    pub paths: Vec<String>,
    pub collection: CollectionInfo,
    #[serde(default)]
    pub asset: AssetSection,
    #[serde(skip)]
    pub source: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetSection {
    #[serde(default)]
    pub extraction_methods: Vec<Extractor>,
}

impl CollectionDescription {
    /// Length of the longest of `paths` covering `uri`
    ///
    /// A path covers a URI when it equals it or is a whole-segment prefix.
    pub fn match_length(&self, uri: &str) -> Option<usize> {
        self.paths
            .iter()
            .map(|path| path.trim_end_matches('/'))
            .filter(|prefix| {
                uri == *prefix
                    || uri
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .map(str::len)
            .max()
    }

    fn validate(self, source: &Path) -> GeneratorResult<Self> {
        let malformed = |message: &str| GeneratorError::Description {
            path: source.to_path_buf(),
            message: message.to_string(),
        };
        if self.paths.is_empty() {
            return Err(malformed("no paths listed"));
        }
        if self.collection.id.trim().is_empty() {
            return Err(malformed("empty collection id"));
        }
        Ok(Self {
            source: source.to_path_buf(),
            ..self
        })
    }
}

/// Parse one description file, JSON or YAML by extension
pub fn parse_description(path: &Path, contents: &str) -> GeneratorResult<CollectionDescription> {
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let parsed: Result<CollectionDescription, String> = if is_json {
        serde_json::from_str(contents).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(contents).map_err(|e| e.to_string())
    };

    parsed
        .map_err(|message| GeneratorError::Description {
            path: path.to_path_buf(),
            message,
        })?
        .validate(path)
}

/// Load every description below `root`, in path order
pub fn load_descriptions(root: &Path) -> GeneratorResult<Vec<CollectionDescription>> {
    if !root.is_dir() {
        return Err(GeneratorError::MissingRoot {
            path: root.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for extension in DESCRIPTION_EXTENSIONS {
        let pattern = format!("{}/**/*.{}", glob::Pattern::escape(&root.to_string_lossy()), extension);
        let entries = glob::glob(&pattern).map_err(|source| GeneratorError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        for entry in entries {
            match entry {
                Ok(path) => files.push(path),
                Err(e) => log::warn!("Skipping unreadable description path: {}", e),
            }
        }
    }
    files.sort();

    let mut descriptions = Vec::with_capacity(files.len());
    for path in files {
        let contents = std::fs::read_to_string(&path).map_err(|source| GeneratorError::Io {
            path: path.clone(),
            source,
        })?;
        let description = parse_description(&path, &contents)?;
        log::debug!(
            "Loaded collection description {} from {}",
            description.collection.id,
            path.display()
        );
        descriptions.push(description);
    }
    Ok(descriptions)
}
