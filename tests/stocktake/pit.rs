//! Point in time lifecycle

use crate::common::{badc_paths, Fixture, Layout, FBI_INDEX};
use stac_stocktake::config::KeepAlive;
use stac_stocktake::search::{MemorySearch, SearchBackend};
use stac_stocktake::stocktake::StocktakeError;

#[tokio::test]
async fn test_every_slice_releases_its_pit() {
    let fixture = Fixture::new(Layout::sliced(3));
    let search = MemorySearch::new().with_files(badc_paths("cru", 20));

    fixture.stocktake(&search).run(false).await.unwrap();

    assert_eq!(search.pits_opened(), 3);
    assert_eq!(search.pits_closed(), 3);
    assert_eq!(search.open_pits(), 0);
}

#[tokio::test]
async fn test_pit_released_when_scan_fails() {
    let fixture = Fixture::new(Layout::unsliced());
    let search = MemorySearch::new().with_files(badc_paths("cru", 20));
    search.fail_fbi_pages_after(1);

    let error = fixture.stocktake(&search).run(false).await.unwrap_err();

    match error {
        StocktakeError::SlicesFailed { total, failures } => {
            assert_eq!(total, 1);
            assert_eq!(failures.len(), 1);
            assert!(failures[0].starts_with("slice 0:"), "{}", failures[0]);
        }
        other => panic!("expected slice failure, got {other:?}"),
    }
    assert_eq!(search.pits_opened(), 1);
    assert_eq!(search.open_pits(), 0);
}

#[tokio::test]
async fn test_borrowed_pit_is_left_open() {
    let fixture = Fixture::new(Layout::sliced(2));
    let search = MemorySearch::new().with_files(badc_paths("cru", 10));
    let pit_id = search
        .open_point_in_time(FBI_INDEX, &KeepAlive::default())
        .await
        .unwrap();

    let stocktake = fixture.stocktake(&search);
    let first = stocktake
        .run_batch(0, Some(pit_id.clone()), false)
        .await
        .unwrap();
    let second = stocktake.run_batch(1, Some(pit_id.clone()), false).await.unwrap();

    assert_eq!(first.counts.total + second.counts.total, 10);
    assert_eq!(search.pits_opened(), 1);
    assert_eq!(search.pits_closed(), 0);
    assert!(search
        .fbi_requests()
        .iter()
        .all(|request| request.pit_id == pit_id));
}
