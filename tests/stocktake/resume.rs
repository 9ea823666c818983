//! Checkpoints, resume and chunk reruns

use crate::common::{badc_paths, Fixture, Layout};
use async_trait::async_trait;
use serde_json::Value;
use stac_stocktake::config::KeepAlive;
use stac_stocktake::core::shutdown::ShutdownCoordinator;
use stac_stocktake::search::{
    FbiPageRequest, MemorySearch, Page, SearchBackend, SearchResult, StacPageRequest,
};
use stac_stocktake::stocktake::{FileStateStore, StateStore, Stocktake, StocktakeError};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Requests shutdown once `pages` FBI pages have been served, as a signal would
struct InterruptAfterPages {
    inner: MemorySearch,
    shutdown: ShutdownCoordinator,
    pages: usize,
    served: AtomicUsize,
}

#[async_trait]
impl SearchBackend for InterruptAfterPages {
    async fn open_point_in_time(&self, index: &str, keep_alive: &KeepAlive) -> SearchResult<String> {
        self.inner.open_point_in_time(index, keep_alive).await
    }

    async fn close_point_in_time(&self, pit_id: &str) -> SearchResult<()> {
        self.inner.close_point_in_time(pit_id).await
    }

    async fn fbi_page(&self, request: &FbiPageRequest) -> SearchResult<Page> {
        let page = self.inner.fbi_page(request).await?;
        if self.served.fetch_add(1, Ordering::SeqCst) + 1 >= self.pages {
            self.shutdown.trigger_shutdown();
        }
        Ok(page)
    }

    async fn stac_page(&self, request: &StacPageRequest) -> SearchResult<Page> {
        self.inner.stac_page(request).await
    }

    async fn get_document(&self, index: &str, id: &str) -> SearchResult<Option<Value>> {
        self.inner.get_document(index, id).await
    }

    async fn put_document(&self, index: &str, id: &str, body: &Value) -> SearchResult<()> {
        self.inner.put_document(index, id, body).await
    }
}

#[tokio::test]
async fn test_failed_slice_resumes_after_checkpoint() {
    let fixture = Fixture::new(Layout::unsliced());
    let paths = badc_paths("cru", 12);
    let search = MemorySearch::new().with_files(paths.clone());
    search.fail_fbi_pages_after(2);

    // Two pages of three make the first chunk; the third page fails
    let error = fixture.stocktake(&search).run(false).await.unwrap_err();
    assert!(matches!(error, StocktakeError::SlicesFailed { .. }));

    let store = FileStateStore::new(fixture.data_dir());
    let checkpoint = store.load(0).await.unwrap().unwrap();
    assert!(!checkpoint.completed);
    assert_eq!(checkpoint.next_chunk, 1);
    assert_eq!(checkpoint.last_path.as_deref(), Some(paths[5].as_str()));
    assert_eq!(fixture.generated_uris(), paths[..6].to_vec());

    search.clear_failures();
    let requests_before = search.fbi_requests().len();
    let report = fixture.stocktake(&search).run(false).await.unwrap();

    let resumed = &search.fbi_requests()[requests_before..];
    assert!(!resumed.is_empty());
    assert!(resumed
        .iter()
        .all(|request| request.after_path.as_deref() == Some(paths[5].as_str())));

    let generated = fixture.generated_uris();
    let unique: BTreeSet<&String> = generated.iter().collect();
    assert_eq!(unique.len(), generated.len(), "resume must not regenerate");
    assert_eq!(generated, paths);

    assert_eq!(report.counts.total, 12);
    assert_eq!(report.counts.new, 12);
    let checkpoint = store.load(0).await.unwrap().unwrap();
    assert!(checkpoint.completed);
}

#[tokio::test]
async fn test_completed_slice_is_skipped_unless_restarted() {
    let fixture = Fixture::new(Layout::sliced(2));
    let search = MemorySearch::new().with_files(badc_paths("cru", 10));

    let first = fixture.stocktake(&search).run(false).await.unwrap();
    assert!(first.slices.iter().all(|slice| !slice.skipped));
    let pits = search.pits_opened();

    let second = fixture.stocktake(&search).run(false).await.unwrap();
    assert!(second.slices.iter().all(|slice| slice.skipped));
    assert_eq!(second.counts, first.counts);
    assert_eq!(search.pits_opened(), pits);
    assert_eq!(fixture.json_assets().len(), 10);

    let restarted = fixture.stocktake(&search).run(true).await.unwrap();
    assert!(restarted.slices.iter().all(|slice| !slice.skipped));
    assert_eq!(restarted.counts.total, 10);
    // File outputs append, so a restart writes everything again
    assert_eq!(fixture.json_assets().len(), 20);
}

#[tokio::test]
async fn test_checkpoint_for_other_partitioning_is_ignored() {
    let search = MemorySearch::new().with_files(badc_paths("cru", 6));

    let sliced = Fixture::new(Layout::sliced(2).range(0, 1));
    sliced.stocktake(&search).run(false).await.unwrap();

    // Same data directory, but the index is now scanned as a whole
    let unsliced = Fixture::new(Layout::unsliced());
    std::fs::remove_dir_all(unsliced.data_dir()).ok();
    copy_dir(&sliced.data_dir(), &unsliced.data_dir());

    let report = unsliced.stocktake(&search).run(false).await.unwrap();
    assert!(!report.slices[0].skipped);
    assert_eq!(report.counts.total, 6);
}

#[tokio::test]
async fn test_chunk_rerun_reconciles_spooled_paths() {
    let fixture = Fixture::new(Layout::unsliced());
    let paths = badc_paths("cru", 9);
    let search = MemorySearch::new().with_files(paths.clone());

    let stocktake = fixture.stocktake(&search);
    stocktake.run(false).await.unwrap();

    let spooled = stocktake.spool().read_chunk(0, 0).await.unwrap();
    assert_eq!(spooled, paths[..6].to_vec());
    assert!(stocktake.spool().summary_path(0, 0).is_file());

    // The catalogue has caught up with the first chunk since the run
    search.add_stac_uris(paths[..6].iter().cloned());
    let counts = stocktake.run_chunk(0, 0).await.unwrap();
    assert_eq!(counts.total, 6);
    assert_eq!(counts.exists, 6);
    assert_eq!(counts.new, 0);

    let missing = stocktake.run_chunk(0, 7).await.unwrap_err();
    assert!(missing.to_string().contains("chunk 7"), "{missing}");
}

#[tokio::test]
async fn test_shutdown_before_start_opens_no_pit() {
    let fixture = Fixture::new(Layout::unsliced());
    let paths = badc_paths("cru", 12);
    let search = MemorySearch::new().with_files(paths.clone());
    let shutdown = ShutdownCoordinator::new();
    shutdown.trigger_shutdown();

    let error = fixture
        .builder(&search)
        .shutdown(shutdown)
        .build()
        .unwrap()
        .run(false)
        .await
        .unwrap_err();

    assert!(matches!(error, StocktakeError::Interrupted), "{error:?}");
    assert_eq!(search.pits_opened(), 0);
    assert!(fixture.json_assets().is_empty());

    let report = fixture.stocktake(&search).run(false).await.unwrap();
    assert_eq!(report.counts.total, 12);
    assert_eq!(report.counts.new, 12);
    assert_eq!(fixture.generated_uris(), paths);
}

#[tokio::test]
async fn test_shutdown_mid_scan_keeps_checkpoint_and_releases_pit() {
    let fixture = Fixture::new(Layout::unsliced());
    let paths = badc_paths("cru", 12);
    let search = MemorySearch::new().with_files(paths.clone());
    let shutdown = ShutdownCoordinator::new();

    // Two pages of three make the first chunk, then the signal arrives
    let backend = InterruptAfterPages {
        inner: search.clone(),
        shutdown: shutdown.clone(),
        pages: 2,
        served: AtomicUsize::new(0),
    };
    let error = Stocktake::builder(fixture.settings.clone(), Arc::new(backend))
        .shutdown(shutdown)
        .build()
        .unwrap()
        .run(false)
        .await
        .unwrap_err();

    assert!(matches!(error, StocktakeError::Interrupted), "{error:?}");
    assert_eq!(search.pits_opened(), 1);
    assert_eq!(search.open_pits(), 0);

    let store = FileStateStore::new(fixture.data_dir());
    let checkpoint = store.load(0).await.unwrap().unwrap();
    assert!(!checkpoint.completed);
    assert_eq!(checkpoint.next_chunk, 1);
    assert_eq!(checkpoint.last_path.as_deref(), Some(paths[5].as_str()));
    assert_eq!(fixture.generated_uris(), paths[..6].to_vec());

    let requests_before = search.fbi_requests().len();
    let report = fixture.stocktake(&search).run(false).await.unwrap();

    assert!(search.fbi_requests()[requests_before..]
        .iter()
        .all(|request| request.after_path.as_deref() == Some(paths[5].as_str())));
    let generated = fixture.generated_uris();
    let unique: BTreeSet<&String> = generated.iter().collect();
    assert_eq!(unique.len(), generated.len(), "rerun must not regenerate");
    assert_eq!(generated, paths);
    assert_eq!(report.counts.total, 12);
    assert_eq!(report.counts.new, 12);
    assert!(store.load(0).await.unwrap().unwrap().completed);
    assert_eq!(search.open_pits(), 0);
}

fn copy_dir(from: &std::path::Path, to: &std::path::Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), target).unwrap();
        }
    }
}
