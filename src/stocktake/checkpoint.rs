//! Per-slice progress checkpoints
//!
//! A checkpoint is saved after every chunk so an interrupted slice resumes
//! strictly after the last path it finished.

use super::counts::Counts;
use super::error::{StocktakeError, StocktakeResult};
use crate::search::SearchBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;

const CHECKPOINT_FILE: &str = "checkpoint.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub slice_id: u32,
    pub max_slices: u32,
    /// Chunk number the next spooled chunk gets
    pub next_chunk: usize,
    /// Last FBI path of the last finished chunk
    pub last_path: Option<String>,
    pub counts: Counts,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(slice_id: u32, max_slices: u32) -> Self {
        Self {
            slice_id,
            max_slices,
            next_chunk: 0,
            last_path: None,
            counts: Counts::default(),
            completed: false,
            updated_at: Utc::now(),
        }
    }

    pub fn record_chunk(&mut self, last_path: Option<String>, counts: Counts) {
        self.next_chunk += 1;
        if last_path.is_some() {
            self.last_path = last_path;
        }
        self.counts += counts;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
        self.updated_at = Utc::now();
    }

    /// Whether this checkpoint was written for the same partitioning
    pub fn applies_to(&self, slice_id: u32, max_slices: u32) -> bool {
        self.slice_id == slice_id && self.max_slices == max_slices
    }
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self, slice_id: u32) -> StocktakeResult<Option<Checkpoint>>;

    async fn save(&self, checkpoint: &Checkpoint) -> StocktakeResult<()>;
}

/// Checkpoints as `{data_directory}/{slice}/checkpoint.json`
#[derive(Debug, Clone)]
pub struct FileStateStore {
    root: PathBuf,
}

impl FileStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, slice_id: u32) -> PathBuf {
        self.root.join(slice_id.to_string()).join(CHECKPOINT_FILE)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self, slice_id: u32) -> StocktakeResult<Option<Checkpoint>> {
        let path = self.path_for(slice_id);
        let location = path.display().to_string();
        let contents = match fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StocktakeError::checkpoint(location, e)),
        };
        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|e| StocktakeError::checkpoint(location, e))
    }

    async fn save(&self, checkpoint: &Checkpoint) -> StocktakeResult<()> {
        let path = self.path_for(checkpoint.slice_id);
        let location = path.display().to_string();
        let contents = serde_json::to_vec_pretty(checkpoint)
            .map_err(|e| StocktakeError::checkpoint(&location, e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StocktakeError::checkpoint(&location, e))?;
        }
        // Replace atomically so a crash never leaves half a checkpoint
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, contents)
            .await
            .map_err(|e| StocktakeError::checkpoint(&location, e))?;
        fs::rename(&temp, &path)
            .await
            .map_err(|e| StocktakeError::checkpoint(&location, e))
    }
}

/// Checkpoints as documents `slice-{n}` in an Elasticsearch index
pub struct IndexStateStore {
    backend: Arc<dyn SearchBackend>,
    index: String,
}

impl IndexStateStore {
    pub fn new(backend: Arc<dyn SearchBackend>, index: impl Into<String>) -> Self {
        Self {
            backend,
            index: index.into(),
        }
    }

    pub fn document_id(slice_id: u32) -> String {
        format!("slice-{slice_id}")
    }

    fn location(&self, slice_id: u32) -> String {
        format!("{}/{}", self.index, Self::document_id(slice_id))
    }
}

#[async_trait]
impl StateStore for IndexStateStore {
    async fn load(&self, slice_id: u32) -> StocktakeResult<Option<Checkpoint>> {
        let document = self
            .backend
            .get_document(&self.index, &Self::document_id(slice_id))
            .await?;
        document
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| StocktakeError::checkpoint(self.location(slice_id), e))
    }

    async fn save(&self, checkpoint: &Checkpoint) -> StocktakeResult<()> {
        let body = serde_json::to_value(checkpoint)
            .map_err(|e| StocktakeError::checkpoint(self.location(checkpoint.slice_id), e))?;
        self.backend
            .put_document(&self.index, &Self::document_id(checkpoint.slice_id), &body)
            .await?;
        Ok(())
    }
}
