//! Slice partitioning

use crate::common::{badc_paths, Fixture, Layout};
use stac_stocktake::search::memory::{slice_of, FbiDocument};
use stac_stocktake::search::{MemorySearch, SliceSpec};
use std::collections::BTreeSet;

#[tokio::test]
async fn test_first_of_three_slices_addresses_one_partition() {
    let fixture = Fixture::new(Layout::sliced(3).range(0, 1));
    let paths = badc_paths("cru", 40);
    let search = MemorySearch::new().with_files(paths.clone());

    let report = fixture.stocktake(&search).run(false).await.unwrap();

    let expected: Vec<String> = paths
        .iter()
        .filter(|path| slice_of(path, 3) == 0)
        .cloned()
        .collect();
    assert!(!expected.is_empty() && expected.len() < paths.len());

    assert_eq!(report.slices.len(), 1);
    assert_eq!(report.slices[0].slice_id, 0);
    assert_eq!(report.counts.total as usize, expected.len());
    assert_eq!(fixture.generated_uris(), expected);

    let requests = search.fbi_requests();
    assert!(!requests.is_empty());
    assert!(requests
        .iter()
        .all(|request| request.slice == Some(SliceSpec { id: 0, max: 3 })));
}

#[tokio::test]
async fn test_union_of_slices_is_the_whole_index() {
    let fixture = Fixture::new(Layout::sliced(3));
    let mut paths = badc_paths("cru", 25);
    paths.extend(badc_paths("faam", 20));
    let search = MemorySearch::new().with_files(paths.clone());

    let report = fixture.stocktake(&search).run(false).await.unwrap();

    let slice_ids: Vec<u32> = report.slices.iter().map(|slice| slice.slice_id).collect();
    assert_eq!(slice_ids, vec![0, 1, 2]);

    let generated = fixture.generated_uris();
    let unique: BTreeSet<&String> = generated.iter().collect();
    assert_eq!(unique.len(), generated.len(), "no path generated twice");

    let mut expected = paths;
    expected.sort();
    assert_eq!(generated, expected);
    assert_eq!(report.counts.total, 45);
    assert_eq!(report.counts.new, 45);
}

#[tokio::test]
async fn test_only_live_files_are_scanned() {
    let fixture = Fixture::new(Layout::unsliced());
    let search = MemorySearch::new().with_files(["/badc/cru/kept.nc"]);
    search.add_documents([
        FbiDocument::directory("/badc/cru"),
        FbiDocument::removed_file("/badc/cru/deleted.nc"),
    ]);

    let report = fixture.stocktake(&search).run(false).await.unwrap();

    assert_eq!(report.counts.total, 1);
    assert_eq!(fixture.generated_uris(), vec!["/badc/cru/kept.nc".to_string()]);
}

#[tokio::test]
async fn test_slice_outside_range_is_rejected() {
    let fixture = Fixture::new(Layout::sliced(3));
    let search = MemorySearch::new().with_files(badc_paths("cru", 3));

    let error = fixture
        .stocktake(&search)
        .run_batch(5, None, false)
        .await
        .unwrap_err();

    assert!(error.to_string().contains('5'), "{error}");
    assert_eq!(search.pits_opened(), 0);
}
