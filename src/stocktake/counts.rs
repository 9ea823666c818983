//! Reconciliation tallies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// FBI paths examined
    pub total: u64,
    /// FBI paths without a STAC asset
    pub new: u64,
    pub exists: u64,
    /// STAC assets without an FBI path
    pub removed: u64,
    /// New paths no collection description covers
    pub unmatched: u64,
}

impl AddAssign for Counts {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.new += other.new;
        self.exists += other.exists;
        self.removed += other.removed;
        self.unmatched += other.unmatched;
    }
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total: {} | new: {} | exists: {} | removed: {} | unmatched: {}",
            self.total, self.new, self.exists, self.removed, self.unmatched
        )
    }
}
