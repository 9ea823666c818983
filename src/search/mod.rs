//! Search index access
//!
//! The stocktake talks to Elasticsearch through the [`SearchBackend`] trait.
//! [`ElasticClient`] implements it over the HTTP API; [`MemorySearch`] keeps the
//! same contract in process so scans can be exercised without a cluster.

mod client;
mod error;
pub mod memory;
pub mod query;
mod types;

pub use client::ElasticClient;
pub use error::{SearchError, SearchResult};
pub use memory::MemorySearch;
pub use types::{FbiPageRequest, Page, PageHit, SliceSpec, StacPageRequest, UriBound};

use crate::config::KeepAlive;
use async_trait::async_trait;
use serde_json::Value;

/// Operations the stocktake needs from a search cluster
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Open a point in time on `index`, returning its id
    async fn open_point_in_time(&self, index: &str, keep_alive: &KeepAlive)
        -> SearchResult<String>;

    /// Release a point in time
    async fn close_point_in_time(&self, pit_id: &str) -> SearchResult<()>;

    /// One page of FBI file paths in path order
    async fn fbi_page(&self, request: &FbiPageRequest) -> SearchResult<Page>;

    /// One page of STAC asset URIs in URI order
    async fn stac_page(&self, request: &StacPageRequest) -> SearchResult<Page>;

    /// Fetch a document's `_source`, `None` when it does not exist
    async fn get_document(&self, index: &str, id: &str) -> SearchResult<Option<Value>>;

    /// Create or replace a document
    async fn put_document(&self, index: &str, id: &str, body: &Value) -> SearchResult<()>;
}
