//! Stocktake events

use crate::stocktake::Counts;
use serde::{Deserialize, Serialize};

/// A message published to the stocktake exchange
///
/// Serialised with an `action` tag:
///
/// ```json
/// {"action": "add", "uri": "/badc/x.nc", "slice": 0, "chunk": 3}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StocktakeEvent {
    /// FBI file with no STAC asset; an asset was generated for it
    Add { uri: String, slice: u32, chunk: usize },
    /// STAC asset with no FBI file
    Remove { uri: String, slice: u32, chunk: usize },
    /// End of a chunk
    Summary {
        slice: u32,
        chunk: usize,
        counts: Counts,
    },
}

impl StocktakeEvent {
    pub fn action(&self) -> &'static str {
        match self {
            StocktakeEvent::Add { .. } => "add",
            StocktakeEvent::Remove { .. } => "remove",
            StocktakeEvent::Summary { .. } => "summary",
        }
    }
}
