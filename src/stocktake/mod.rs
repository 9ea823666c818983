//! Stocktake of FBI files against STAC assets
//!
//! Each slice of the FBI index is scanned inside a point in time, spooled to
//! disk in chunks and merge-joined against the STAC index. Files without an
//! asset go through the generator to every configured output; progress is
//! checkpointed after each chunk.

pub mod checkpoint;
pub mod counts;
pub mod error;
pub mod reconcile;
pub mod runner;

pub use checkpoint::{Checkpoint, FileStateStore, IndexStateStore, StateStore};
pub use counts::Counts;
pub use error::{StocktakeError, StocktakeResult};
pub use reconcile::{reconcile_chunk, ChunkOutcome, ReconcileOptions};
pub use runner::{RunReport, SliceReport, Stocktake, StocktakeBuilder};
