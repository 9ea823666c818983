//! FBI and STAC scanning
//!
//! - [`SliceRange`]: which partitions of the FBI index a run addresses
//! - [`PointInTime`]: owned or borrowed PIT, closed on every exit path
//! - [`SliceScanner`]: sorted pages of FBI file paths for one slice
//! - [`StacCursor`]: sorted STAC asset URIs from a start bound
//! - [`ChunkSpool`]: spooled chunk input and summary files

pub mod error;
pub mod fbi;
pub mod pit;
pub mod slice;
pub mod spool;
pub mod stac;

pub use error::{ScanError, ScanResult};
pub use fbi::SliceScanner;
pub use pit::PointInTime;
pub use slice::SliceRange;
pub use spool::ChunkSpool;
pub use stac::StacCursor;
