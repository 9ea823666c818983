//! File outputs and explicit generation

use crate::common::{badc_paths, Fixture, Layout};
use serde_json::json;
use stac_stocktake::generator::asset_id;
use stac_stocktake::search::MemorySearch;

#[tokio::test]
async fn test_json_and_text_outputs_are_equivalent() {
    let fixture = Fixture::new(Layout::unsliced());
    let paths = badc_paths("cru", 8);
    let search = MemorySearch::new().with_files(paths.clone());

    fixture.stocktake(&search).run(false).await.unwrap();

    let assets = fixture.json_assets();
    let rows = fixture.text_rows();
    assert_eq!(assets.len(), paths.len());
    assert_eq!(rows.len(), assets.len());

    for (asset, (uri, collection_id, id)) in assets.iter().zip(&rows) {
        assert_eq!(&asset.properties.uri, uri);
        assert_eq!(&asset.collection_id, collection_id);
        assert_eq!(&asset.id, id);
        assert_eq!(asset.id, asset_id(uri));
    }
}

#[tokio::test]
async fn test_assets_carry_extracted_properties() {
    let fixture = Fixture::new(Layout::unsliced());
    let search = MemorySearch::new().with_files(["/badc/faam/core_20230101.nc"]);

    fixture.stocktake(&search).run(false).await.unwrap();

    let assets = fixture.json_assets();
    assert_eq!(assets.len(), 1);
    let asset = &assets[0];
    assert_eq!(asset.collection_id, "badc");
    assert_eq!(asset.properties.filename, "core_20230101.nc");
    assert_eq!(asset.properties.extension.as_deref(), Some("nc"));
    assert_eq!(asset.properties.extracted["dataset"], json!("faam"));
    assert_eq!(asset.properties.extracted["source"], json!("fbi"));
}

#[tokio::test]
async fn test_existing_assets_are_not_generated() {
    let fixture = Fixture::new(Layout::sliced(2));
    let paths = badc_paths("cru", 10);
    let catalogued: Vec<String> = paths.iter().step_by(2).cloned().collect();
    let search = MemorySearch::new()
        .with_files(paths.clone())
        .with_stac_uris(catalogued.clone());

    let report = fixture.stocktake(&search).run(false).await.unwrap();

    let expected: Vec<String> = paths.iter().skip(1).step_by(2).cloned().collect();
    assert_eq!(fixture.generated_uris(), expected);
    assert_eq!(report.counts.exists as usize, catalogued.len());
    assert_eq!(report.counts.new as usize, expected.len());
    assert_eq!(report.counts.removed, 0);
}

#[tokio::test]
async fn test_paths_without_description_are_unmatched() {
    let fixture = Fixture::new(Layout::unsliced());
    let search = MemorySearch::new().with_files(["/badc/cru/a.nc", "/neodc/sentinel/b.zip"]);

    let report = fixture.stocktake(&search).run(false).await.unwrap();

    assert_eq!(report.counts.new, 2);
    assert_eq!(report.counts.unmatched, 1);
    assert_eq!(fixture.generated_uris(), vec!["/badc/cru/a.nc".to_string()]);
}

#[tokio::test]
async fn test_generate_writes_explicit_uris() {
    let fixture = Fixture::new(Layout::unsliced());
    let search = MemorySearch::new();
    let uris = vec![
        "/badc/cru/x.nc".to_string(),
        "/other/y.nc".to_string(),
        "/badc/ukmo/z.pp".to_string(),
    ];

    let batch = fixture.stocktake(&search).generate(&uris).await.unwrap();

    assert_eq!(batch.assets.len(), 2);
    assert_eq!(batch.unmatched, vec!["/other/y.nc".to_string()]);
    assert_eq!(
        fixture.generated_uris(),
        vec!["/badc/cru/x.nc".to_string(), "/badc/ukmo/z.pp".to_string()]
    );
    assert_eq!(fixture.text_rows().len(), 2);
    assert_eq!(search.pits_opened(), 0);
}
