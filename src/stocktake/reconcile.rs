//! Merge-join of FBI paths against STAC asset URIs

use super::counts::Counts;
use crate::scanner::{ScanResult, StacCursor};
use std::cmp::Ordering;

/// Paths between progress lines
const PROGRESS_INTERVAL: u64 = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Report STAC URIs with no FBI path; only sound when the scan sees every path
    pub detect_removed: bool,
    /// Also report STAC URIs after the last FBI path
    pub drain_tail: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkOutcome {
    /// FBI paths with no STAC asset
    pub missing: Vec<String>,
    /// STAC URIs with no FBI path
    pub removed: Vec<String>,
    pub counts: Counts,
    pub last_path: Option<String>,
}

/// Walk sorted `paths` and the STAC cursor in step
///
/// - STAC exhausted or ahead: the path is new
/// - STAC behind: the URI has no file (reported when `detect_removed`)
/// - equal: the asset exists
pub async fn reconcile_chunk(
    paths: &[String],
    stac: &mut StacCursor,
    options: ReconcileOptions,
) -> ScanResult<ChunkOutcome> {
    let mut outcome = ChunkOutcome {
        last_path: paths.last().cloned(),
        ..ChunkOutcome::default()
    };

    let mut index = 0;
    while let Some(path) = paths.get(index) {
        let order = stac.peek().await?.map(|uri| uri.cmp(path.as_str()));
        match order {
            None | Some(Ordering::Greater) => {
                outcome.counts.new += 1;
                outcome.missing.push(path.clone());
                index += 1;
            }
            Some(Ordering::Less) => {
                if let Some(uri) = stac.next_uri().await? {
                    if options.detect_removed {
                        outcome.counts.removed += 1;
                        outcome.removed.push(uri);
                    }
                }
                continue;
            }
            Some(Ordering::Equal) => {
                outcome.counts.exists += 1;
                stac.next_uri().await?;
                index += 1;
            }
        }

        outcome.counts.total += 1;
        if outcome.counts.total % PROGRESS_INTERVAL == 0 {
            log::info!("{} | {}", path, outcome.counts);
        }
    }

    if options.detect_removed && options.drain_tail {
        while let Some(uri) = stac.next_uri().await? {
            outcome.counts.removed += 1;
            outcome.removed.push(uri);
        }
    }

    Ok(outcome)
}
