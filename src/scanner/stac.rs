//! Ordered cursor over STAC asset URIs

use super::error::ScanResult;
use crate::search::{SearchBackend, StacPageRequest, UriBound};
use std::collections::VecDeque;
use std::sync::Arc;

/// Lazily pages `properties.uri` values of the STAC index in ascending order
pub struct StacCursor {
    backend: Arc<dyn SearchBackend>,
    index: String,
    page_size: usize,
    next_bound: UriBound,
    buffer: VecDeque<String>,
    exhausted: bool,
}

impl StacCursor {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        index: impl Into<String>,
        from: UriBound,
        page_size: usize,
    ) -> Self {
        Self {
            backend,
            index: index.into(),
            page_size: page_size.max(1),
            next_bound: from,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    async fn fill(&mut self) -> ScanResult<()> {
        if !self.buffer.is_empty() || self.exhausted {
            return Ok(());
        }

        let request = StacPageRequest {
            index: self.index.clone(),
            from: self.next_bound.clone(),
            size: self.page_size,
        };
        let page = self.backend.stac_page(&request).await?;

        if page.hits.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.hits.last() {
            self.next_bound = UriBound::Exclusive(last.path.clone());
        }
        self.buffer.extend(page.hits.into_iter().map(|hit| hit.path));
        Ok(())
    }

    /// The next URI without consuming it
    pub async fn peek(&mut self) -> ScanResult<Option<&str>> {
        self.fill().await?;
        Ok(self.buffer.front().map(String::as_str))
    }

    pub async fn next_uri(&mut self) -> ScanResult<Option<String>> {
        self.fill().await?;
        Ok(self.buffer.pop_front())
    }
}
