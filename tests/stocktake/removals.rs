//! STAC assets whose files are gone

use crate::common::{badc_paths, Fixture, Layout};
use stac_stocktake::messaging::{FanoutExchange, StocktakeEvent};
use stac_stocktake::search::MemorySearch;
use std::sync::Arc;

#[tokio::test]
async fn test_unsliced_scan_reports_removed_assets() {
    let fixture = Fixture::with_rabbit(Layout::unsliced());
    let paths = badc_paths("cru", 12);
    let mut stac: Vec<String> = paths.clone();
    // Before the first file, between chunks, and after the last file
    let gone = vec![
        "/badc/aaa/gone.nc".to_string(),
        "/badc/cru/file005b.nc".to_string(),
        "/badc/zzz/gone.nc".to_string(),
    ];
    stac.extend(gone.iter().cloned());
    let search = MemorySearch::new()
        .with_files(paths)
        .with_stac_uris(stac);

    let exchange = FanoutExchange::new("stocktake-test");
    let queue = exchange.bind("removals").unwrap();
    let report = fixture
        .builder(&search)
        .publisher(Arc::new(exchange.clone()))
        .build()
        .unwrap()
        .run(false)
        .await
        .unwrap();

    assert_eq!(report.counts.removed, 3);
    assert_eq!(report.counts.exists, 12);
    assert_eq!(report.counts.new, 0);
    assert!(fixture.json_assets().is_empty());

    let mut removed: Vec<String> = queue
        .drain()
        .unwrap()
        .iter()
        .filter_map(|delivery| match delivery.json::<StocktakeEvent>() {
            Ok(StocktakeEvent::Remove { uri, .. }) => Some(uri),
            _ => None,
        })
        .collect();
    removed.sort();
    assert_eq!(removed, gone);
}

#[tokio::test]
async fn test_empty_index_reports_every_asset_removed() {
    let fixture = Fixture::new(Layout::unsliced());
    let search = MemorySearch::new().with_stac_uris(["/badc/cru/a.nc", "/badc/cru/b.nc"]);

    let report = fixture.stocktake(&search).run(false).await.unwrap();

    assert_eq!(report.counts.total, 0);
    assert_eq!(report.counts.removed, 2);
}

#[tokio::test]
async fn test_sliced_scan_never_reports_removals() {
    let fixture = Fixture::new(Layout::sliced(3));
    let paths = badc_paths("cru", 15);
    let mut stac = paths.clone();
    stac.push("/badc/cru/file007b.nc".to_string());
    stac.push("/badc/zzz/gone.nc".to_string());
    let search = MemorySearch::new().with_files(paths).with_stac_uris(stac);

    let report = fixture.stocktake(&search).run(false).await.unwrap();

    assert_eq!(report.counts.removed, 0);
    assert_eq!(report.counts.exists, 15);
    assert_eq!(report.counts.new, 0);
}
