//! Sliced scan of the FBI index

use super::error::{ScanError, ScanResult};
use super::pit::PointInTime;
use crate::search::{FbiPageRequest, SearchBackend, SliceSpec};
use futures::Stream;
use serde_json::Value;
use std::sync::Arc;

/// Pages of FBI file paths for one slice, in path order
///
/// Each request carries the PIT and its keep-alive and continues from the
/// sort values of the previous page. The PIT is only released by
/// [`close`](SliceScanner::close).
pub struct SliceScanner {
    backend: Arc<dyn SearchBackend>,
    pit: PointInTime,
    slice: Option<SliceSpec>,
    page_size: usize,
    search_after: Option<Vec<Value>>,
    after_path: Option<String>,
    pages: usize,
    finished: bool,
}

impl SliceScanner {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        pit: PointInTime,
        slice: Option<SliceSpec>,
        page_size: usize,
    ) -> Self {
        Self {
            backend,
            pit,
            slice,
            page_size: page_size.max(1),
            search_after: None,
            after_path: None,
            pages: 0,
            finished: false,
        }
    }

    /// Skip every path up to and including `path`
    pub fn resume_after(mut self, path: Option<String>) -> Self {
        self.after_path = path;
        self
    }

    pub fn pages_read(&self) -> usize {
        self.pages
    }

    pub fn pit(&self) -> &PointInTime {
        &self.pit
    }

    /// Next page of paths, `None` once the slice is exhausted
    pub async fn next_page(&mut self) -> ScanResult<Option<Vec<String>>> {
        if self.finished {
            return Ok(None);
        }

        let request = FbiPageRequest {
            pit_id: self.pit.id().to_string(),
            keep_alive: self.pit.keep_alive().to_string(),
            slice: self.slice,
            size: self.page_size,
            search_after: self.search_after.clone(),
            after_path: self.after_path.clone(),
        };
        let page = self.backend.fbi_page(&request).await?;
        self.pit.refresh(page.pit_id.clone());

        let Some(last) = page.hits.last() else {
            self.finished = true;
            return Ok(None);
        };
        self.search_after = Some(if last.sort.is_empty() {
            vec![Value::String(last.path.clone())]
        } else {
            last.sort.clone()
        });
        if page.hits.len() < self.page_size {
            self.finished = true;
        }

        self.pages += 1;
        log::trace!(
            "Slice {:?} page {}: {} paths",
            self.slice.map(|s| s.id),
            self.pages,
            page.hits.len()
        );
        Ok(Some(page.hits.into_iter().map(|hit| hit.path).collect()))
    }

    /// The remaining pages as a stream
    pub fn pages(&mut self) -> impl Stream<Item = ScanResult<Vec<String>>> + '_ {
        futures::stream::try_unfold(self, |scanner| async move {
            Ok::<_, ScanError>(scanner.next_page().await?.map(|page| (page, scanner)))
        })
    }

    /// Release the PIT when this process owns it
    pub async fn close(self) -> ScanResult<()> {
        let backend = self.backend.clone();
        self.pit.close(backend.as_ref()).await?;
        Ok(())
    }
}
