//! In-process search backend
//!
//! Holds an FBI index, a STAC index and plain documents in memory and answers
//! the same requests as [`ElasticClient`](super::ElasticClient). Points in time
//! freeze a snapshot of the FBI documents, slices partition documents by a hash
//! of their id, and failures can be injected to exercise error paths.

use super::error::{SearchError, SearchResult};
use super::types::{FbiPageRequest, Page, PageHit, StacPageRequest};
use super::SearchBackend;
use crate::config::KeepAlive;
use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// A record in the FBI index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FbiDocument {
    pub id: String,
    pub path: String,
    pub kind: String,
    pub removed: bool,
}

impl FbiDocument {
    pub fn file(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: path.clone(),
            path,
            kind: "file".to_string(),
            removed: false,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            kind: "dir".to_string(),
            ..Self::file(path)
        }
    }

    /// A file record carrying a `removed` marker
    pub fn removed_file(path: impl Into<String>) -> Self {
        Self {
            removed: true,
            ..Self::file(path)
        }
    }

    fn is_live_file(&self) -> bool {
        self.kind == "file" && !self.removed
    }
}

/// Partition a document id falls into when the index is scanned in `max` slices
pub fn slice_of(id: &str, max: u32) -> u32 {
    let digest = Sha256::digest(id.as_bytes());
    let mut prefix = [0u8; 4];
    prefix.copy_from_slice(&digest[..4]);
    u32::from_be_bytes(prefix) % max.max(1)
}

#[derive(Debug, Default)]
struct MemoryState {
    fbi: Vec<FbiDocument>,
    stac: BTreeSet<String>,
    documents: HashMap<(String, String), Value>,
    pits: HashMap<String, Arc<Vec<FbiDocument>>>,
    next_pit: u64,
    pits_opened: usize,
    pits_closed: usize,
    fbi_requests: Vec<FbiPageRequest>,
    stac_requests: Vec<StacPageRequest>,
    fail_fbi_after: Option<usize>,
    fbi_pages_served: usize,
}

/// [`SearchBackend`] kept entirely in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySearch {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, S>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_documents(paths.into_iter().map(FbiDocument::file));
        self
    }

    pub fn with_stac_uris<I, S>(self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_stac_uris(uris);
        self
    }

    pub fn add_documents(&self, documents: impl IntoIterator<Item = FbiDocument>) {
        self.state().fbi.extend(documents);
    }

    pub fn add_stac_uris<I, S>(&self, uris: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().stac.extend(uris.into_iter().map(Into::into));
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Failure injection and request inspection
///
/// These exist for tests that drive a stocktake against this backend; nothing
/// in a production run calls them.
impl MemorySearch {
    /// Fail every FBI page request after `pages` successful ones
    pub fn fail_fbi_pages_after(&self, pages: usize) {
        self.state().fail_fbi_after = Some(pages);
    }

    pub fn clear_failures(&self) {
        self.state().fail_fbi_after = None;
    }

    pub fn pits_opened(&self) -> usize {
        self.state().pits_opened
    }

    pub fn pits_closed(&self) -> usize {
        self.state().pits_closed
    }

    /// Points in time opened and not yet closed
    pub fn open_pits(&self) -> usize {
        self.state().pits.len()
    }

    pub fn fbi_requests(&self) -> Vec<FbiPageRequest> {
        self.state().fbi_requests.clone()
    }

    pub fn stac_requests(&self) -> Vec<StacPageRequest> {
        self.state().stac_requests.clone()
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.state()
            .documents
            .get(&(index.to_string(), id.to_string()))
            .cloned()
    }
}

fn after_cursor(request: &FbiPageRequest) -> Option<String> {
    let search_after = request
        .search_after
        .as_ref()
        .and_then(|values| values.first())
        .and_then(Value::as_str);

    match (search_after, request.after_path.as_deref()) {
        (Some(a), Some(b)) => Some(a.max(b).to_string()),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    }
}

#[async_trait]
impl SearchBackend for MemorySearch {
    async fn open_point_in_time(
        &self,
        index: &str,
        _keep_alive: &KeepAlive,
    ) -> SearchResult<String> {
        let mut state = self.state();
        let mut snapshot: Vec<FbiDocument> = state
            .fbi
            .iter()
            .filter(|doc| doc.is_live_file())
            .cloned()
            .collect();
        snapshot.sort_by(|a, b| a.path.cmp(&b.path));

        state.next_pit += 1;
        state.pits_opened += 1;
        let pit_id = format!("{index}-pit-{}", state.next_pit);
        state.pits.insert(pit_id.clone(), Arc::new(snapshot));
        Ok(pit_id)
    }

    async fn close_point_in_time(&self, pit_id: &str) -> SearchResult<()> {
        let mut state = self.state();
        if state.pits.remove(pit_id).is_some() {
            state.pits_closed += 1;
        }
        Ok(())
    }

    async fn fbi_page(&self, request: &FbiPageRequest) -> SearchResult<Page> {
        let snapshot = {
            let mut state = self.state();
            state.fbi_requests.push(request.clone());

            if let Some(limit) = state.fail_fbi_after {
                if state.fbi_pages_served >= limit {
                    return Err(SearchError::Status {
                        url: "memory:///_search".to_string(),
                        status: 503,
                        body: "injected failure".to_string(),
                    });
                }
            }
            state.fbi_pages_served += 1;

            state
                .pits
                .get(&request.pit_id)
                .cloned()
                .ok_or_else(|| SearchError::PitNotFound {
                    pit_id: request.pit_id.clone(),
                })?
        };

        let after = after_cursor(request);
        let hits = snapshot
            .iter()
            .filter(|doc| match request.slice {
                Some(slice) => slice_of(&doc.id, slice.max) == slice.id,
                None => true,
            })
            .filter(|doc| after.as_deref().map_or(true, |after| doc.path.as_str() > after))
            .take(request.size)
            .map(|doc| PageHit {
                path: doc.path.clone(),
                sort: vec![Value::String(doc.path.clone())],
            })
            .collect();

        Ok(Page {
            hits,
            pit_id: Some(request.pit_id.clone()),
        })
    }

    async fn stac_page(&self, request: &StacPageRequest) -> SearchResult<Page> {
        let mut state = self.state();
        state.stac_requests.push(request.clone());

        let hits = state
            .stac
            .iter()
            .filter(|uri| request.from.admits(uri))
            .take(request.size)
            .map(|uri| PageHit {
                path: uri.clone(),
                sort: vec![Value::String(uri.clone())],
            })
            .collect();

        Ok(Page { hits, pit_id: None })
    }

    async fn get_document(&self, index: &str, id: &str) -> SearchResult<Option<Value>> {
        Ok(self.document(index, id))
    }

    async fn put_document(&self, index: &str, id: &str, body: &Value) -> SearchResult<()> {
        self.state()
            .documents
            .insert((index.to_string(), id.to_string()), body.clone());
        Ok(())
    }
}
