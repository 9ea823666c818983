//! Slice range addressed by one run

use super::error::{ScanError, ScanResult};
use crate::config::GeneralSettings;
use crate::search::SliceSpec;
use std::ops::Range;

/// Slices `start..end` out of `max` partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRange {
    start: u32,
    end: u32,
    max: u32,
}

impl SliceRange {
    /// `end` is exclusive and clamped to `max`
    pub fn new(start: u32, end: u32, max: u32) -> Self {
        let max = max.max(1);
        let end = end.min(max);
        Self {
            start: start.min(end),
            end,
            max,
        }
    }

    pub fn from_settings(general: &GeneralSettings) -> Self {
        Self::new(
            general.start_slice,
            general.effective_end_slice(),
            general.max_slices,
        )
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn iter(&self) -> Range<u32> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether the whole index is scanned as one partition
    pub fn is_unsliced(&self) -> bool {
        self.max == 1
    }

    /// Slice clause for `slice_id`; `None` when the index is not partitioned
    pub fn spec_for(&self, slice_id: u32) -> ScanResult<Option<SliceSpec>> {
        if slice_id >= self.max {
            return Err(ScanError::SliceOutOfRange {
                slice: slice_id,
                max: self.max,
            });
        }
        Ok((!self.is_unsliced()).then_some(SliceSpec {
            id: slice_id,
            max: self.max,
        }))
    }
}
