//! Slice, batch and chunk drivers

use super::checkpoint::{Checkpoint, FileStateStore, IndexStateStore, StateStore};
use super::counts::Counts;
use super::error::{StocktakeError, StocktakeResult};
use super::reconcile::{reconcile_chunk, ChunkOutcome, ReconcileOptions};
use crate::config::Settings;
use crate::core::shutdown::ShutdownCoordinator;
use crate::generator::{AssetGenerator, GeneratedBatch};
use crate::messaging::{EventPublisher, StocktakeEvent};
use crate::output::{build_sinks, FanoutWriter, OutputSink};
use crate::scanner::{ChunkSpool, PointInTime, SliceRange, SliceScanner, StacCursor};
use crate::search::{SearchBackend, UriBound};
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of one slice
#[derive(Debug, Clone, PartialEq)]
pub struct SliceReport {
    pub slice_id: u32,
    /// Chunks processed by this invocation
    pub chunks: usize,
    /// Totals across every run of the slice
    pub counts: Counts,
    /// The checkpoint said the slice was already complete
    pub skipped: bool,
}

/// Result of a full run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub slices: Vec<SliceReport>,
    pub counts: Counts,
}

/// Contents of `output/summary.json`
#[derive(Debug, Serialize)]
struct ChunkSummary<'a> {
    slice: u32,
    chunk: usize,
    first_path: Option<&'a str>,
    last_path: Option<&'a str>,
    counts: Counts,
    finished_at: DateTime<Utc>,
}

/// Where a chunk sits in its slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkPosition {
    Intermediate,
    Final,
}

pub struct Stocktake {
    settings: Arc<Settings>,
    range: SliceRange,
    backend: Arc<dyn SearchBackend>,
    publisher: Option<Arc<dyn EventPublisher>>,
    state: Arc<dyn StateStore>,
    generator: Arc<AssetGenerator>,
    writer: Mutex<FanoutWriter>,
    spool: ChunkSpool,
    shutdown: ShutdownCoordinator,
}

/// Builder for [`Stocktake`]
///
/// Anything not supplied is derived from the settings: the generator from
/// `GENERATOR`, sinks from `GENERATOR.outputs`, the state store from
/// `GENERAL.STATE_INDEX` (or checkpoint files under the data directory).
pub struct StocktakeBuilder {
    settings: Arc<Settings>,
    backend: Arc<dyn SearchBackend>,
    publisher: Option<Arc<dyn EventPublisher>>,
    state: Option<Arc<dyn StateStore>>,
    generator: Option<AssetGenerator>,
    sinks: Option<Vec<Box<dyn OutputSink>>>,
    shutdown: Option<ShutdownCoordinator>,
}

impl StocktakeBuilder {
    pub fn new(settings: Arc<Settings>, backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            settings,
            backend,
            publisher: None,
            state: None,
            generator: None,
            sinks: None,
            shutdown: None,
        }
    }

    /// Publisher for stocktake events and the `rabbit_mq` output
    pub fn publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn state_store(mut self, state: Arc<dyn StateStore>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn generator(mut self, generator: AssetGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn sinks(mut self, sinks: Vec<Box<dyn OutputSink>>) -> Self {
        self.sinks = Some(sinks);
        self
    }

    pub fn shutdown(mut self, shutdown: ShutdownCoordinator) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn build(self) -> StocktakeResult<Stocktake> {
        let general = &self.settings.general;
        let data_directory = general.data_directory();

        let generator = match self.generator {
            Some(generator) => generator,
            None => AssetGenerator::from_settings(&self.settings.generator)?,
        };

        let state: Arc<dyn StateStore> = match (self.state, &general.state_index) {
            (Some(state), _) => state,
            (None, Some(index)) => Arc::new(IndexStateStore::new(self.backend.clone(), index)),
            (None, None) => Arc::new(FileStateStore::new(&data_directory)),
        };

        let sinks = match self.sinks {
            Some(sinks) => sinks,
            None => build_sinks(
                &self.settings.generator.outputs,
                self.publisher.clone(),
                self.settings.routing_key(),
            )?,
        };

        Ok(Stocktake {
            range: SliceRange::from_settings(general),
            spool: ChunkSpool::new(data_directory),
            settings: self.settings,
            backend: self.backend,
            publisher: self.publisher,
            state,
            generator: Arc::new(generator),
            writer: Mutex::new(FanoutWriter::new(sinks)),
            shutdown: self.shutdown.unwrap_or_default(),
        })
    }
}

impl Stocktake {
    pub fn builder(settings: Arc<Settings>, backend: Arc<dyn SearchBackend>) -> StocktakeBuilder {
        StocktakeBuilder::new(settings, backend)
    }

    pub fn range(&self) -> SliceRange {
        self.range
    }

    pub fn spool(&self) -> &ChunkSpool {
        &self.spool
    }

    /// Every slice of the configured range, at most `PARALLEL_SLICES` at once
    ///
    /// A failing slice does not stop the others; failures are reported
    /// together once every slice has finished.
    pub async fn run(&self, restart: bool) -> StocktakeResult<RunReport> {
        let parallel = self.settings.general.parallel_slices.max(1);
        log::info!(
            "Stocktake of slices {}..{} of {} ({} in parallel)",
            self.range.start(),
            self.range.end(),
            self.range.max(),
            parallel
        );

        self.writer.lock().await.open_all().await?;
        let results: Vec<(u32, StocktakeResult<SliceReport>)> = futures::stream::iter(self.range.iter())
            .map(|slice_id| async move { (slice_id, self.run_slice(slice_id, None, restart).await) })
            .buffer_unordered(parallel)
            .collect()
            .await;
        let closed = self.writer.lock().await.close_all().await;

        let mut report = RunReport::default();
        let mut failures = Vec::new();
        let mut interrupted = false;
        for (slice_id, result) in results {
            match result {
                Ok(slice) => {
                    report.counts += slice.counts;
                    report.slices.push(slice);
                }
                Err(StocktakeError::Interrupted) => interrupted = true,
                Err(e) => {
                    log::error!("Slice {} failed: {}", slice_id, e);
                    failures.push(format!("slice {slice_id}: {e}"));
                }
            }
        }
        report.slices.sort_by_key(|slice| slice.slice_id);

        if interrupted {
            return Err(StocktakeError::Interrupted);
        }
        if !failures.is_empty() {
            return Err(StocktakeError::SlicesFailed {
                total: self.range.len(),
                failures,
            });
        }
        closed?;

        log::info!("STOCKTAKE FINISHED: {}", report.counts);
        Ok(report)
    }

    /// One slice, optionally inside a point in time opened elsewhere
    pub async fn run_batch(
        &self,
        slice_id: u32,
        pit_id: Option<String>,
        restart: bool,
    ) -> StocktakeResult<SliceReport> {
        self.writer.lock().await.open_all().await?;
        let result = self.run_slice(slice_id, pit_id, restart).await;
        let closed = self.writer.lock().await.close_all().await;
        let report = result?;
        closed?;
        Ok(report)
    }

    async fn run_slice(
        &self,
        slice_id: u32,
        pit_id: Option<String>,
        restart: bool,
    ) -> StocktakeResult<SliceReport> {
        if self.shutdown.is_shutdown_requested() {
            return Err(StocktakeError::Interrupted);
        }
        let slice = self.range.spec_for(slice_id)?;
        let max_slices = self.range.max();

        let stored = if restart {
            None
        } else {
            self.state.load(slice_id).await?
        };
        let mut checkpoint = match stored {
            Some(checkpoint) if checkpoint.applies_to(slice_id, max_slices) => checkpoint,
            Some(_) => {
                log::warn!(
                    "Ignoring checkpoint of slice {} written for a different MAX_SLICES",
                    slice_id
                );
                Checkpoint::new(slice_id, max_slices)
            }
            None => Checkpoint::new(slice_id, max_slices),
        };

        if checkpoint.completed {
            log::info!("Slice {} already complete: {}", slice_id, checkpoint.counts);
            return Ok(SliceReport {
                slice_id,
                chunks: 0,
                counts: checkpoint.counts,
                skipped: true,
            });
        }
        if restart {
            self.spool.clear_slice(slice_id).await?;
            self.state.save(&checkpoint).await?;
        } else if let Some(last_path) = &checkpoint.last_path {
            log::info!(
                "Resuming slice {} at chunk {} after {}",
                slice_id,
                checkpoint.next_chunk,
                last_path
            );
        }

        let general = &self.settings.general;
        let pit = match pit_id {
            Some(id) => PointInTime::borrowed(id, &general.pit_keep_alive),
            None => {
                PointInTime::open(self.backend.as_ref(), &general.fbi_index, &general.pit_keep_alive)
                    .await?
            }
        };
        let mut scanner = SliceScanner::new(self.backend.clone(), pit, slice, general.search_size)
            .resume_after(checkpoint.last_path.clone());

        let scanned = self.scan_slice(slice_id, &mut scanner, &mut checkpoint).await;
        if let Err(e) = scanner.close().await {
            log::warn!("Failed to release point in time of slice {}: {}", slice_id, e);
        }
        let chunks = scanned?;

        checkpoint.mark_completed();
        self.state.save(&checkpoint).await?;
        log::info!("SLICE FINISHED: {} | {}", slice_id, checkpoint.counts);

        Ok(SliceReport {
            slice_id,
            chunks,
            counts: checkpoint.counts,
            skipped: false,
        })
    }

    /// Group pages into chunks and process each, checkpointing as it goes
    async fn scan_slice(
        &self,
        slice_id: u32,
        scanner: &mut SliceScanner,
        checkpoint: &mut Checkpoint,
    ) -> StocktakeResult<usize> {
        let pages_per_chunk = self.settings.general.search_per_chunk.max(1);
        let mut buffer: Vec<String> = Vec::new();
        let mut pages_buffered = 0;
        let mut chunks = 0;

        let pages = scanner.pages();
        futures::pin_mut!(pages);
        while let Some(page) = pages.try_next().await? {
            buffer.extend(page);
            pages_buffered += 1;

            if pages_buffered == pages_per_chunk {
                let paths = std::mem::take(&mut buffer);
                self.spool_chunk(slice_id, checkpoint, &paths, ChunkPosition::Intermediate)
                    .await?;
                pages_buffered = 0;
                chunks += 1;
            }

            if self.shutdown.is_shutdown_requested() {
                log::warn!(
                    "Stopping slice {} at chunk {}; rerun to resume",
                    slice_id,
                    checkpoint.next_chunk
                );
                return Err(StocktakeError::Interrupted);
            }
        }

        // An unsliced scan always closes with a final chunk to report trailing removals
        if !buffer.is_empty() || self.range.is_unsliced() {
            self.spool_chunk(slice_id, checkpoint, &buffer, ChunkPosition::Final)
                .await?;
            chunks += 1;
        }
        Ok(chunks)
    }

    async fn spool_chunk(
        &self,
        slice_id: u32,
        checkpoint: &mut Checkpoint,
        paths: &[String],
        position: ChunkPosition,
    ) -> StocktakeResult<()> {
        let chunk = checkpoint.next_chunk;
        self.spool.write_chunk(slice_id, chunk, paths).await?;

        let from = self.stac_bound(paths, checkpoint.last_path.as_deref());
        let outcome = self
            .process_chunk(slice_id, chunk, paths, from, position)
            .await?;

        checkpoint.record_chunk(outcome.last_path, outcome.counts);
        self.state.save(checkpoint).await?;
        Ok(())
    }

    /// STAC start bound for a chunk
    ///
    /// Unsliced scans continue after the previous chunk so URIs between chunks
    /// are seen. Sliced scans only look from the chunk's first path.
    fn stac_bound(&self, paths: &[String], previous_last_path: Option<&str>) -> UriBound {
        if self.range.is_unsliced() {
            match previous_last_path {
                Some(path) => UriBound::Exclusive(path.to_string()),
                None => UriBound::Unbounded,
            }
        } else {
            match paths.first() {
                Some(first) => UriBound::Inclusive(first.clone()),
                None => UriBound::Unbounded,
            }
        }
    }

    async fn process_chunk(
        &self,
        slice_id: u32,
        chunk: usize,
        paths: &[String],
        from: UriBound,
        position: ChunkPosition,
    ) -> StocktakeResult<ChunkOutcome> {
        let general = &self.settings.general;
        let options = ReconcileOptions {
            detect_removed: self.range.is_unsliced(),
            drain_tail: self.range.is_unsliced() && position == ChunkPosition::Final,
        };

        let mut stac = StacCursor::new(self.backend.clone(), &general.stac_index, from, general.search_size);
        let mut outcome = reconcile_chunk(paths, &mut stac, options).await?;

        let batch = self.generator.process_all(&outcome.missing);
        outcome.counts.unmatched = batch.unmatched.len() as u64;
        self.writer.lock().await.write_all(&batch.assets).await?;

        for asset in &batch.assets {
            log::debug!("ADD_MISSING_STAC_ASSET: {}", asset.uri());
            self.publish(StocktakeEvent::Add {
                uri: asset.uri().to_string(),
                slice: slice_id,
                chunk,
            })
            .await?;
        }
        for uri in &outcome.removed {
            log::debug!("REMOVED_FBI_FILE: {}", uri);
            self.publish(StocktakeEvent::Remove {
                uri: uri.clone(),
                slice: slice_id,
                chunk,
            })
            .await?;
        }
        self.publish(StocktakeEvent::Summary {
            slice: slice_id,
            chunk,
            counts: outcome.counts,
        })
        .await?;

        let summary = ChunkSummary {
            slice: slice_id,
            chunk,
            first_path: paths.first().map(String::as_str),
            last_path: outcome.last_path.as_deref(),
            counts: outcome.counts,
            finished_at: Utc::now(),
        };
        self.spool.write_summary(slice_id, chunk, &summary).await?;

        log::info!(
            "CHUNK FINISHED: slice {} chunk {} | {}",
            slice_id,
            chunk,
            outcome.counts
        );
        Ok(outcome)
    }

    async fn publish(&self, event: StocktakeEvent) -> StocktakeResult<()> {
        if let Some(publisher) = &self.publisher {
            publisher
                .publish_event(self.settings.routing_key(), &event)
                .await?;
        }
        Ok(())
    }

    /// Reconcile an already spooled chunk again
    pub async fn run_chunk(&self, slice_id: u32, chunk: usize) -> StocktakeResult<Counts> {
        self.range.spec_for(slice_id)?;
        let paths = self.spool.read_chunk(slice_id, chunk).await?;

        let previous_last_path = if self.range.is_unsliced() && chunk > 0 {
            self.spool
                .read_chunk(slice_id, chunk - 1)
                .await?
                .last()
                .cloned()
        } else {
            None
        };
        let from = self.stac_bound(&paths, previous_last_path.as_deref());

        let position = match self.state.load(slice_id).await? {
            Some(checkpoint) if checkpoint.completed && checkpoint.next_chunk == chunk + 1 => {
                ChunkPosition::Final
            }
            _ => ChunkPosition::Intermediate,
        };

        self.writer.lock().await.open_all().await?;
        let result = self
            .process_chunk(slice_id, chunk, &paths, from, position)
            .await;
        let closed = self.writer.lock().await.close_all().await;
        let outcome = result?;
        closed?;
        Ok(outcome.counts)
    }

    /// Generate assets for explicit URIs and send them to every output
    pub async fn generate(&self, uris: &[String]) -> StocktakeResult<GeneratedBatch> {
        let batch = self.generator.process_all(uris);

        let mut writer = self.writer.lock().await;
        writer.open_all().await?;
        let written = writer.write_all(&batch.assets).await;
        let closed = writer.close_all().await;
        written?;
        closed?;

        log::info!(
            "Generated {} assets ({} unmatched)",
            batch.assets.len(),
            batch.unmatched.len()
        );
        Ok(batch)
    }
}
