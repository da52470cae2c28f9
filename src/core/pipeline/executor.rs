//! Pipeline execution implementation.

use super::progress::{CancellationToken, ProgressCounters, ProgressSnapshot};
use crate::core::hasher::{
    canonical_order, HashAlgorithmKind, HashBackend, HashRecord, HasherConfig,
};
use crate::core::scanner::{AssetEnumerator, Selection};
use crate::core::store::{PersistMode, RecordSchema, RecordStore, RecordWriter};
use crate::error::{CatalogError, HashError, ScanError, StoreError};
use crate::events::{
    null_sender, Event, EventSender, HashEvent, HashProgress, PipelineEvent, PipelinePhase,
    PipelineSummary,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Terminal counts of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTally {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Assets never started because the run was cancelled
    pub cancelled: usize,
}

/// What happened to one submitted asset
#[derive(Debug)]
pub struct AssetOutcome {
    /// Position in the submitted list
    pub index: usize,
    pub path: PathBuf,
    pub result: Result<HashRecord, HashError>,
}

/// Result of pipeline execution
#[derive(Debug)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub tally: RunTally,
    /// Terminal outcomes in submission order. Cancelled assets are absent.
    pub outcomes: Vec<AssetOutcome>,
    /// Data rows the store writer committed
    pub rows_written: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineResult {
    fn empty(run_id: Uuid) -> Self {
        Self {
            run_id,
            tally: RunTally::default(),
            outcomes: Vec::new(),
            rows_written: 0,
            duration_ms: 0,
        }
    }

    /// Successful records, submission order
    pub fn records(&self) -> impl Iterator<Item = &HashRecord> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Failed assets with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &HashError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.path.as_path(), e)))
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            run_id: self.run_id,
            total: self.tally.total,
            succeeded: self.tally.succeeded,
            failed: self.tally.failed,
            cancelled: self.tally.cancelled,
            rows_written: self.rows_written,
            duration_ms: self.duration_ms,
        }
    }
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Algorithms computed for every asset
    pub algorithms: Vec<HashAlgorithmKind>,
    /// Number of worker threads
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            algorithms: vec![
                HashAlgorithmKind::Average,
                HashAlgorithmKind::Perceptual,
                HashAlgorithmKind::Difference,
            ],
            concurrency: default_concurrency(),
        }
    }
}

/// Available parallelism, falling back to one worker
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    backend: Option<Arc<dyn HashBackend>>,
    cancellation: Option<CancellationToken>,
    progress: Option<Arc<ProgressCounters>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            backend: None,
            cancellation: None,
            progress: None,
        }
    }

    /// Set the algorithms to compute
    pub fn algorithms(mut self, algorithms: &[HashAlgorithmKind]) -> Self {
        self.config.algorithms = algorithms.to_vec();
        self
    }

    /// Set the worker count
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Use a custom hashing backend
    pub fn backend(mut self, backend: Arc<dyn HashBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Share a cancellation token with the caller
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Share progress counters with the caller
    pub fn progress(mut self, progress: Arc<ProgressCounters>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<HashPipeline, CatalogError> {
        let PipelineConfig {
            algorithms,
            concurrency,
        } = self.config;

        if concurrency == 0 {
            return Err(CatalogError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        let algorithms = canonical_order(&algorithms);
        if algorithms.is_empty() {
            return Err(CatalogError::Config(
                "at least one hash algorithm is required".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|i| format!("hash-worker-{i}"))
            .build()
            .map_err(|e| CatalogError::Config(format!("failed to start workers: {e}")))?;

        Ok(HashPipeline {
            config: PipelineConfig {
                algorithms,
                concurrency,
            },
            backend: self
                .backend
                .unwrap_or_else(|| Arc::new(HasherConfig::new().build()) as Arc<dyn HashBackend>),
            cancellation: self.cancellation.unwrap_or_default(),
            progress: self.progress.unwrap_or_default(),
            pool,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Hashes a batch of assets on a fixed-size worker pool.
///
/// Workers never touch the store. Each finished asset travels back over a
/// channel to the calling thread, which alone feeds the [`RecordWriter`].
pub struct HashPipeline {
    config: PipelineConfig,
    backend: Arc<dyn HashBackend>,
    cancellation: CancellationToken,
    progress: Arc<ProgressCounters>,
    pool: rayon::ThreadPool,
}

/// Accepts records and keeps none of them
struct DiscardWriter;

impl RecordWriter for DiscardWriter {
    fn accept(&mut self, _index: usize, _record: &HashRecord) -> Result<(), StoreError> {
        Ok(())
    }

    fn finish(&mut self) -> Result<usize, StoreError> {
        Ok(0)
    }
}

impl HashPipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn algorithms(&self) -> &[HashAlgorithmKind] {
        &self.config.algorithms
    }

    pub fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    /// Store schema matching this pipeline's algorithms
    pub fn schema(&self) -> RecordSchema {
        RecordSchema::new(&self.config.algorithms)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Hash `assets` without persisting anything
    pub fn run(&self, assets: &[PathBuf]) -> PipelineResult {
        let mut discard = DiscardWriter;
        match self.run_with_events(assets, &mut discard, &null_sender()) {
            Ok(result) => result,
            // DiscardWriter never fails
            Err(_) => PipelineResult::empty(Uuid::nil()),
        }
    }

    /// Hash `assets`, handing each success to `writer` as it arrives.
    ///
    /// A writer error stops new work from starting and is returned once
    /// in-flight assets drain. Per-asset hash failures never abort.
    pub fn run_with_events(
        &self,
        assets: &[PathBuf],
        writer: &mut dyn RecordWriter,
        events: &EventSender,
    ) -> Result<PipelineResult, CatalogError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("hash_run", %run_id);
        let _guard = span.enter();

        let start_time = Instant::now();
        let total = assets.len();
        self.progress.begin(total);

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Hashing,
        }));
        events.send(Event::Hash(HashEvent::Started {
            total_assets: total,
            concurrency: self.config.concurrency,
        }));
        tracing::info!(
            assets = total,
            concurrency = self.config.concurrency,
            algorithms = ?self.config.algorithms,
            "hash run started"
        );

        let (tx, rx) = crossbeam_channel::unbounded::<AssetOutcome>();
        let halted = AtomicBool::new(false);
        let mut outcomes = Vec::with_capacity(total);
        let mut store_error: Option<StoreError> = None;

        self.pool.in_place_scope(|scope| {
            for (index, path) in assets.iter().enumerate() {
                let tx = tx.clone();
                let halted = &halted;
                let backend = self.backend.as_ref();
                let algorithms = self.config.algorithms.as_slice();
                let progress = self.progress.as_ref();
                let cancellation = &self.cancellation;

                scope.spawn(move |_| {
                    if cancellation.is_cancelled() || halted.load(Ordering::SeqCst) {
                        return;
                    }

                    let result = hash_asset(backend, path, algorithms);
                    let snapshot = progress.record(result.is_ok());

                    if let Err(e) = &result {
                        tracing::warn!(path = %path.display(), error = %e, "asset failed");
                        events.send(Event::Hash(HashEvent::Error {
                            path: path.clone(),
                            message: e.to_string(),
                        }));
                    }
                    events.send(Event::Hash(HashEvent::Progress(HashProgress {
                        processed: snapshot.processed,
                        total,
                        current_path: path.clone(),
                    })));

                    let _ = tx.send(AssetOutcome {
                        index,
                        path: path.clone(),
                        result,
                    });
                });
            }
            drop(tx);

            for outcome in rx.iter() {
                if store_error.is_none() {
                    if let Ok(record) = &outcome.result {
                        if let Err(e) = writer.accept(outcome.index, record) {
                            tracing::error!(error = %e, "store write failed, halting run");
                            halted.store(true, Ordering::SeqCst);
                            store_error = Some(e);
                        }
                    }
                }
                outcomes.push(outcome);
            }
        });

        if let Some(e) = store_error {
            return Err(e.into());
        }

        let was_cancelled = self.cancellation.is_cancelled() && outcomes.len() < total;
        if was_cancelled {
            tracing::info!(started = outcomes.len(), total, "hash run cancelled");
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
        }

        outcomes.sort_by_key(|o| o.index);

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Writing,
        }));
        let rows_written = writer.finish()?;

        let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
        let failed = outcomes.len() - succeeded;
        let tally = RunTally {
            total,
            succeeded,
            failed,
            cancelled: total - outcomes.len(),
        };

        events.send(Event::Hash(HashEvent::Completed {
            succeeded,
            failed,
            cancelled: tally.cancelled,
        }));

        let result = PipelineResult {
            run_id,
            tally,
            outcomes,
            rows_written,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        tracing::info!(
            succeeded,
            failed,
            cancelled = tally.cancelled,
            rows_written,
            duration_ms = result.duration_ms,
            "hash run finished"
        );
        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: result.summary(),
        }));

        Ok(result)
    }
}

fn hash_asset(
    backend: &dyn HashBackend,
    path: &Path,
    algorithms: &[HashAlgorithmKind],
) -> Result<HashRecord, HashError> {
    // the store cannot hold a path it would have to rewrite
    if path.to_str().is_none() {
        return Err(HashError::NonUtf8Path {
            path: path.to_path_buf(),
        });
    }
    let image = backend.open(path)?;
    let mut record = HashRecord::new(path);
    for &algorithm in algorithms {
        record.insert(algorithm, backend.compute(path, &image, algorithm)?);
    }
    Ok(record)
}

/// A full catalogue run: enumerate, hash, persist
#[derive(Debug)]
pub struct CatalogRun {
    /// Entries the enumerator could not read
    pub scan_errors: Vec<ScanError>,
    /// The selection matched nothing; no work was done
    pub empty_selection: bool,
    pub result: PipelineResult,
}

/// Enumerate `selection`, hash it, and persist the records to `store`.
///
/// An empty selection leaves the store untouched.
pub fn catalogue(
    enumerator: &dyn AssetEnumerator,
    selection: &Selection,
    pipeline: &HashPipeline,
    store: &RecordStore,
    mode: PersistMode,
    events: &EventSender,
) -> Result<CatalogRun, CatalogError> {
    events.send(Event::Pipeline(PipelineEvent::Started {
        run_id: Uuid::new_v4(),
    }));
    events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
        phase: PipelinePhase::Scanning,
    }));

    let scan = enumerator.enumerate_with_events(selection, events)?;
    for error in &scan.errors {
        tracing::warn!(error = %error, "skipped during enumeration");
    }

    if scan.is_empty_selection() {
        tracing::info!("selection matched no images");
        return Ok(CatalogRun {
            scan_errors: scan.errors,
            empty_selection: true,
            result: PipelineResult::empty(Uuid::new_v4()),
        });
    }

    let mut writer = store.open_writer(mode, pipeline.schema())?;
    let result = pipeline.run_with_events(&scan.assets, writer.as_mut(), events)?;

    Ok(CatalogRun {
        scan_errors: scan.errors,
        empty_selection: false,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::HashString;
    use image::DynamicImage;
    use std::sync::atomic::AtomicUsize;

    /// Hashes file names; fails any path containing "broken"
    struct NameBackend {
        opened: AtomicUsize,
    }

    impl NameBackend {
        fn new() -> Self {
            Self {
                opened: AtomicUsize::new(0),
            }
        }
    }

    impl HashBackend for NameBackend {
        fn open(&self, path: &Path) -> Result<DynamicImage, HashError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            if path.to_string_lossy().contains("broken") {
                return Err(HashError::Decode {
                    path: path.to_path_buf(),
                    reason: "not an image".to_string(),
                });
            }
            Ok(DynamicImage::new_rgb8(1, 1))
        }

        fn compute(
            &self,
            path: &Path,
            _image: &DynamicImage,
            algorithm: HashAlgorithmKind,
        ) -> Result<HashString, HashError> {
            let name = path.file_name().unwrap().to_string_lossy();
            Ok(HashString::new(format!("{}-{}", algorithm.short_name(), name)))
        }
    }

    /// Records the order writes arrive in
    #[derive(Default)]
    struct CollectingWriter {
        accepted: Vec<usize>,
        fail_after: Option<usize>,
    }

    impl RecordWriter for CollectingWriter {
        fn accept(&mut self, index: usize, _record: &HashRecord) -> Result<(), StoreError> {
            if Some(self.accepted.len()) == self.fail_after {
                return Err(StoreError::Io {
                    path: PathBuf::from("/store.csv"),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.accepted.push(index);
            Ok(())
        }

        fn finish(&mut self) -> Result<usize, StoreError> {
            Ok(self.accepted.len())
        }
    }

    fn assets(n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| PathBuf::from(format!("/photos/img{i:03}.png")))
            .collect()
    }

    fn pipeline(backend: Arc<NameBackend>, concurrency: usize) -> HashPipeline {
        HashPipeline::builder()
            .algorithms(&[HashAlgorithmKind::Difference, HashAlgorithmKind::Average])
            .concurrency(concurrency)
            .backend(backend)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_rejects_zero_concurrency() {
        let result = HashPipeline::builder().concurrency(0).build();
        assert!(matches!(result, Err(CatalogError::Config(_))));
    }

    #[test]
    fn builder_rejects_empty_algorithm_set() {
        let result = HashPipeline::builder().algorithms(&[]).build();
        assert!(matches!(result, Err(CatalogError::Config(_))));
    }

    #[test]
    fn builder_orders_algorithms() {
        let pipeline = pipeline(Arc::new(NameBackend::new()), 2);
        assert_eq!(
            pipeline.algorithms(),
            &[HashAlgorithmKind::Average, HashAlgorithmKind::Difference]
        );
        assert_eq!(pipeline.concurrency(), 2);
    }

    #[test]
    fn every_asset_gets_one_outcome() {
        let backend = Arc::new(NameBackend::new());
        let pipeline = pipeline(Arc::clone(&backend), 3);
        let mut list = assets(20);
        list[4] = PathBuf::from("/photos/broken.png");

        let result = pipeline.run(&list);

        assert_eq!(result.tally.total, 20);
        assert_eq!(result.tally.succeeded, 19);
        assert_eq!(result.tally.failed, 1);
        assert_eq!(result.tally.cancelled, 0);
        assert_eq!(backend.opened.load(Ordering::SeqCst), 20);

        let indices: Vec<usize> = result.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, (0..20).collect::<Vec<_>>());
        assert_eq!(pipeline.progress().processed, 20);
    }

    #[test]
    fn records_carry_every_requested_algorithm() {
        let pipeline = pipeline(Arc::new(NameBackend::new()), 1);
        let result = pipeline.run(&assets(1));

        let record = result.records().next().unwrap();
        assert_eq!(
            record.hash(HashAlgorithmKind::Average).unwrap().as_str(),
            "aHash-img000.png"
        );
        assert_eq!(
            record.algorithms(),
            vec![HashAlgorithmKind::Average, HashAlgorithmKind::Difference]
        );
    }

    #[test]
    fn failures_are_not_written() {
        let pipeline = pipeline(Arc::new(NameBackend::new()), 4);
        let mut list = assets(6);
        list[2] = PathBuf::from("/photos/broken-a.png");
        let mut writer = CollectingWriter::default();

        let result = pipeline
            .run_with_events(&list, &mut writer, &null_sender())
            .unwrap();

        let mut written = writer.accepted.clone();
        written.sort();
        assert_eq!(written, vec![0, 1, 3, 4, 5]);
        assert_eq!(result.rows_written, 5);
        assert_eq!(result.failures().count(), 1);
    }

    #[test]
    fn cancelled_run_starts_no_new_work() {
        let backend = Arc::new(NameBackend::new());
        let token = CancellationToken::new();
        token.cancel();
        let pipeline = HashPipeline::builder()
            .concurrency(2)
            .backend(backend.clone())
            .cancellation(token)
            .build()
            .unwrap();

        let result = pipeline.run(&assets(10));

        assert_eq!(result.tally.cancelled, 10);
        assert_eq!(result.tally.succeeded + result.tally.failed, 0);
        assert_eq!(backend.opened.load(Ordering::SeqCst), 0);
    }

    /// Sleeps in `open`, tracks peak concurrency and cancels after a quota
    struct SlowBackend {
        active: AtomicUsize,
        peak: AtomicUsize,
        opened: AtomicUsize,
        cancel_after: usize,
        token: CancellationToken,
    }

    impl HashBackend for SlowBackend {
        fn open(&self, _path: &Path) -> Result<DynamicImage, HashError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if self.opened.fetch_add(1, Ordering::SeqCst) + 1 == self.cancel_after {
                self.token.cancel();
            }
            std::thread::sleep(std::time::Duration::from_millis(15));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(DynamicImage::new_rgb8(1, 1))
        }

        fn compute(
            &self,
            _path: &Path,
            _image: &DynamicImage,
            _algorithm: HashAlgorithmKind,
        ) -> Result<HashString, HashError> {
            Ok(HashString::new("00"))
        }
    }

    fn slow_pipeline(concurrency: usize, cancel_after: usize) -> (Arc<SlowBackend>, HashPipeline) {
        let token = CancellationToken::new();
        let backend = Arc::new(SlowBackend {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            opened: AtomicUsize::new(0),
            cancel_after,
            token: token.clone(),
        });
        let pipeline = HashPipeline::builder()
            .algorithms(&[HashAlgorithmKind::Average])
            .concurrency(concurrency)
            .backend(backend.clone())
            .cancellation(token)
            .build()
            .unwrap();
        (backend, pipeline)
    }

    #[test]
    fn active_hashes_never_exceed_concurrency() {
        let (backend, pipeline) = slow_pipeline(3, usize::MAX);

        let result = pipeline.run(&assets(24));

        let peak = backend.peak.load(Ordering::SeqCst);
        assert!((1..=3).contains(&peak), "peak was {peak}");
        assert_eq!(result.tally.succeeded, 24);
        assert_eq!(pipeline.progress().processed, 24);
    }

    #[test]
    fn cancelling_mid_run_drains_started_work() {
        let (backend, pipeline) = slow_pipeline(3, 10);
        let mut writer = CollectingWriter::default();

        let result = pipeline
            .run_with_events(&assets(60), &mut writer, &null_sender())
            .unwrap();

        let tally = result.tally;
        let opened = backend.opened.load(Ordering::SeqCst);
        assert!(backend.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(tally.total, 60);
        assert_eq!(tally.succeeded + tally.failed + tally.cancelled, 60);
        assert!(tally.cancelled > 0);
        // every started asset ran to completion
        assert_eq!(tally.succeeded + tally.failed, opened);
        assert!(opened >= 10);
        assert_eq!(pipeline.progress().processed, opened);
        assert_eq!(writer.accepted.len(), tally.succeeded);
        assert_eq!(result.rows_written, tally.succeeded);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_path_fails_that_asset_only() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let backend = Arc::new(NameBackend::new());
        let pipeline = pipeline(Arc::clone(&backend), 2);
        let mut list = assets(3);
        list[1] = PathBuf::from(OsStr::from_bytes(b"/photos/bad\xff.png"));
        let mut writer = CollectingWriter::default();

        let result = pipeline
            .run_with_events(&list, &mut writer, &null_sender())
            .unwrap();

        assert_eq!(result.tally.succeeded, 2);
        assert_eq!(result.tally.failed, 1);
        assert!(matches!(
            result.outcomes[1].result,
            Err(HashError::NonUtf8Path { .. })
        ));
        assert_eq!(backend.opened.load(Ordering::SeqCst), 2);
        let mut written = writer.accepted.clone();
        written.sort();
        assert_eq!(written, vec![0, 2]);
    }

    #[test]
    fn store_failure_is_fatal() {
        let pipeline = pipeline(Arc::new(NameBackend::new()), 2);
        let mut writer = CollectingWriter {
            fail_after: Some(0),
            ..CollectingWriter::default()
        };

        let result = pipeline.run_with_events(&assets(8), &mut writer, &null_sender());
        assert!(matches!(result, Err(CatalogError::Store(StoreError::Io { .. }))));
    }

    #[test]
    fn empty_batch_is_a_clean_run() {
        let pipeline = pipeline(Arc::new(NameBackend::new()), 2);
        let result = pipeline.run(&[]);
        assert_eq!(result.tally, RunTally::default());
        assert!(result.outcomes.is_empty());
    }
}
