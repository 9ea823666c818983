//! Shared fixtures for stocktake integration tests
//!
//! A fixture owns a temporary directory holding the collection descriptions,
//! the chunk spool, checkpoints and file outputs, plus settings pointing at it.

#![allow(dead_code)]

use stac_stocktake::config::Settings;
use stac_stocktake::generator::Asset;
use stac_stocktake::search::{MemorySearch, SearchBackend};
use stac_stocktake::stocktake::{Stocktake, StocktakeBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const FBI_INDEX: &str = "fbi-test";
pub const STAC_INDEX: &str = "stac-test";

const BADC_DESCRIPTION: &str = r#"
paths:
  - /badc
collection:
  id: badc
asset:
  extraction_methods:
    - method: regex
      inputs:
        regex: '^/badc/(?P<dataset>[^/]+)/'
    - method: default
      inputs:
        defaults:
          source: fbi
"#;

const RABBIT_SECTION: &str = r#"
RABBIT:
  SESSION_KWARGS:
    USER: guest
    PASSWORD: guest
    HOST: localhost
    EXCHANGE:
      NAME: stocktake-test
      TYPE: fanout
  ROUTING_KEY: stac.stocktake
"#;

/// Slice layout and page sizes of a fixture
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub max_slices: u32,
    pub start_slice: u32,
    pub end_slice: u32,
    pub search_size: usize,
    pub search_per_chunk: usize,
}

impl Layout {
    /// One slice, pages of 3, two pages per chunk
    pub fn unsliced() -> Self {
        Self {
            max_slices: 1,
            start_slice: 0,
            end_slice: 1,
            search_size: 3,
            search_per_chunk: 2,
        }
    }

    pub fn sliced(max_slices: u32) -> Self {
        Self {
            max_slices,
            end_slice: max_slices,
            ..Self::unsliced()
        }
    }

    pub fn range(mut self, start_slice: u32, end_slice: u32) -> Self {
        self.start_slice = start_slice;
        self.end_slice = end_slice;
        self
    }
}

pub struct Fixture {
    pub temp: TempDir,
    pub settings: Arc<Settings>,
}

impl Fixture {
    pub fn new(layout: Layout) -> Self {
        Self::build(layout, false)
    }

    /// Fixture with a RABBIT section and a `rabbit_mq` output
    pub fn with_rabbit(layout: Layout) -> Self {
        Self::build(layout, true)
    }

    fn build(layout: Layout, rabbit: bool) -> Self {
        let temp = TempDir::new().expect("temp dir");
        let descriptions = temp.path().join("descriptions");
        std::fs::create_dir_all(&descriptions).expect("descriptions dir");
        std::fs::write(descriptions.join("badc.yml"), BADC_DESCRIPTION).expect("description");

        let yaml = format!(
            r#"
GENERAL:
  FBI_INDEX: {FBI_INDEX}
  STAC_INDEX: {STAC_INDEX}
  MAX_SLICES: {max}
  START_SLICE: {start}
  END_SLICE: {end}
  SEARCH_SIZE: {size}
  SEARCH_PER_CHUNK: {per_chunk}
  PARALLEL_SLICES: 2
  DATA_DIRECTORY: {data}
{rabbit_section}
ELASTICSEARCH:
  SESSION_KWARGS:
    hosts: [http://localhost:9200]

GENERATOR:
  generator: asset
  collection_descriptions:
    root_directory: {descriptions}
  outputs:
    - method: json_file
      filepath: {json}
    - method: text_file
      filepath: {text}
{rabbit_output}"#,
            max = layout.max_slices,
            start = layout.start_slice,
            end = layout.end_slice,
            size = layout.search_size,
            per_chunk = layout.search_per_chunk,
            data = temp.path().join("data").display(),
            rabbit_section = if rabbit { RABBIT_SECTION } else { "" },
            descriptions = descriptions.display(),
            json = temp.path().join("out/assets.json").display(),
            text = temp.path().join("out/assets.txt").display(),
            rabbit_output = if rabbit { "    - method: rabbit_mq\n" } else { "" },
        );
        let settings = Settings::from_yaml_str(&yaml).expect("fixture settings");

        Self {
            temp,
            settings: Arc::new(settings),
        }
    }

    pub fn builder(&self, search: &MemorySearch) -> StocktakeBuilder {
        let backend: Arc<dyn SearchBackend> = Arc::new(search.clone());
        Stocktake::builder(self.settings.clone(), backend)
    }

    pub fn stocktake(&self, search: &MemorySearch) -> Stocktake {
        self.builder(search).build().expect("stocktake")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    pub fn json_path(&self) -> PathBuf {
        self.temp.path().join("out/assets.json")
    }

    pub fn text_path(&self) -> PathBuf {
        self.temp.path().join("out/assets.txt")
    }

    /// Assets written to the JSON file output
    pub fn json_assets(&self) -> Vec<Asset> {
        read_lines(&self.json_path())
            .iter()
            .map(|line| serde_json::from_str(line).expect("asset json"))
            .collect()
    }

    /// `(uri, collection_id, id)` rows of the text file output
    pub fn text_rows(&self) -> Vec<(String, String, String)> {
        read_lines(&self.text_path())
            .iter()
            .map(|line| {
                let fields: Vec<&str> = line.split('\t').collect();
                assert_eq!(fields.len(), 3, "text row: {line}");
                (
                    fields[0].to_string(),
                    fields[1].to_string(),
                    fields[2].to_string(),
                )
            })
            .collect()
    }

    /// URIs of the JSON output, sorted
    pub fn generated_uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self
            .json_assets()
            .iter()
            .map(|asset| asset.properties.uri.clone())
            .collect();
        uris.sort();
        uris
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents.lines().map(str::to_string).collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => panic!("reading {}: {e}", path.display()),
    }
}

/// `/badc/{dataset}/file{n}.nc` paths in sorted order
pub fn badc_paths(dataset: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|n| format!("/badc/{dataset}/file{n:03}.nc"))
        .collect()
}
