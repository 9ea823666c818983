//! On-disk chunk spool
//!
//! Layout under the data directory:
//!
//! ```text
//! {slice}/{chunk}/input/data            one FBI path per line
//! {slice}/{chunk}/output/summary.json   counts written after reconciliation
//! ```

use super::error::{ScanError, ScanResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone)]
pub struct ChunkSpool {
    root: PathBuf,
}

impl ChunkSpool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn slice_dir(&self, slice: u32) -> PathBuf {
        self.root.join(slice.to_string())
    }

    pub fn chunk_dir(&self, slice: u32, chunk: usize) -> PathBuf {
        self.slice_dir(slice).join(chunk.to_string())
    }

    pub fn input_path(&self, slice: u32, chunk: usize) -> PathBuf {
        self.chunk_dir(slice, chunk).join("input").join("data")
    }

    pub fn summary_path(&self, slice: u32, chunk: usize) -> PathBuf {
        self.chunk_dir(slice, chunk).join("output").join("summary.json")
    }

    async fn write_file(path: &Path, contents: Vec<u8>) -> ScanResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ScanError::io(parent, e))?;
        }
        fs::write(path, contents)
            .await
            .map_err(|e| ScanError::io(path, e))
    }

    pub async fn write_chunk(&self, slice: u32, chunk: usize, paths: &[String]) -> ScanResult<PathBuf> {
        let path = self.input_path(slice, chunk);
        let mut contents = String::with_capacity(paths.iter().map(|p| p.len() + 1).sum());
        for line in paths {
            contents.push_str(line);
            contents.push('\n');
        }
        Self::write_file(&path, contents.into_bytes()).await?;
        log::debug!(
            "Spooled {} paths for slice {} chunk {} to {}",
            paths.len(),
            slice,
            chunk,
            path.display()
        );
        Ok(path)
    }

    pub async fn read_chunk(&self, slice: u32, chunk: usize) -> ScanResult<Vec<String>> {
        let path = self.input_path(slice, chunk);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScanError::MissingChunk { slice, chunk, path });
            }
            Err(e) => return Err(ScanError::io(path, e)),
        };
        Ok(contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub async fn write_summary<T: Serialize>(
        &self,
        slice: u32,
        chunk: usize,
        summary: &T,
    ) -> ScanResult<PathBuf> {
        let path = self.summary_path(slice, chunk);
        let contents = serde_json::to_vec_pretty(summary)
            .map_err(|e| ScanError::io(&path, std::io::Error::other(e)))?;
        Self::write_file(&path, contents).await?;
        Ok(path)
    }

    /// Remove every spooled chunk of a slice
    pub async fn clear_slice(&self, slice: u32) -> ScanResult<()> {
        let dir = self.slice_dir(slice);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ScanError::io(dir, e)),
        }
    }
}
