//! Request and response types shared by search backends

use serde_json::Value;

/// One partition of a sliced scroll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceSpec {
    pub id: u32,
    pub max: u32,
}

/// A page request against the FBI index inside a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct FbiPageRequest {
    pub pit_id: String,
    pub keep_alive: String,
    /// `None` scans the whole index
    pub slice: Option<SliceSpec>,
    pub size: usize,
    /// Sort values of the last hit of the previous page
    pub search_after: Option<Vec<Value>>,
    /// Only paths strictly after this one (checkpoint resume)
    pub after_path: Option<String>,
}

/// Where a STAC page starts in `properties.uri` order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriBound {
    Unbounded,
    Inclusive(String),
    Exclusive(String),
}

impl UriBound {
    pub fn admits(&self, uri: &str) -> bool {
        match self {
            UriBound::Unbounded => true,
            UriBound::Inclusive(from) => uri >= from.as_str(),
            UriBound::Exclusive(after) => uri > after.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StacPageRequest {
    pub index: String,
    pub from: UriBound,
    pub size: usize,
}

/// A single hit: the sort key the scan cares about plus its sort values
#[derive(Debug, Clone, PartialEq)]
pub struct PageHit {
    pub path: String,
    pub sort: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub hits: Vec<PageHit>,
    /// Refreshed PIT id, when the cluster returned one
    pub pit_id: Option<String>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|hit| hit.path.as_str())
    }
}
