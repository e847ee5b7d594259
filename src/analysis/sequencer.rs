//! Simulated analysis sequencer.
//!
//! Walks a fixed list of stage labels on a repeating timer, then makes
//! up a result: a random diagnosis, a random confidence (drawn
//! independently of the diagnosis), the canned recommendations and a
//! fresh id. The record is stored and persisted before the run returns.

use crate::analysis::progress::ProgressReporter;
use crate::error::AnalysisError;
use crate::models::{AnalysisRecord, Diagnosis, CONFIDENCE_CANDIDATES};
use crate::store::{KeyValueStorage, ResultStore};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Stage labels, in the order they are shown.
pub const STAGES: [&str; 7] = [
    "Uploading image...",
    "Preprocessing image data...",
    "Running AI analysis...",
    "Identifying patterns...",
    "Generating diagnosis...",
    "Preparing recommendations...",
    "Finalizing results...",
];

const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Timing of a run.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Time between stages.
    pub stage_interval: Duration,
    /// Pause after the result is stored, before the run returns.
    pub completion_delay: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            stage_interval: Duration::from_millis(800),
            completion_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&crate::config::AnalysisConfig> for SequencerConfig {
    fn from(config: &crate::config::AnalysisConfig) -> Self {
        Self {
            stage_interval: Duration::from_millis(config.stage_interval_ms),
            completion_delay: Duration::from_millis(config.completion_delay_ms),
        }
    }
}

/// Clears the busy flag when dropped.
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct Sequencer {
    config: SequencerConfig,
    rng: Mutex<StdRng>,
    busy: AtomicBool,
}

impl Sequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// A sequencer whose picks are reproducible.
    pub fn with_seed(config: SequencerConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SequencerConfig, rng: StdRng) -> Self {
        Self {
            config,
            rng: Mutex::new(rng),
            busy: AtomicBool::new(false),
        }
    }

    #[allow(dead_code)] // Status query
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Mark the sequencer busy. `None` if a run is already in flight.
    pub fn try_begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { flag: &self.busy })
    }

    /// Run every stage, then store the made-up result.
    ///
    /// Returns the id of the new record. If persisting fails the record
    /// is taken back out of the store.
    pub async fn run<S: KeyValueStorage>(
        &self,
        store: &mut ResultStore<S>,
        image: String,
        progress: &dyn ProgressReporter,
    ) -> Result<String, AnalysisError> {
        let _guard = self.try_begin().ok_or(AnalysisError::Busy)?;

        // tokio rejects a zero period
        let period = self.config.stage_interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let total = STAGES.len();
        for (index, label) in STAGES.iter().enumerate() {
            ticker.tick().await;
            debug!("Stage {}/{}: {}", index + 1, total, label);
            progress.stage(index, total, label);
        }
        ticker.tick().await;

        let record = self.synthesize(store, image, Utc::now());
        let id = record.id.clone();
        info!(
            "Analysis {} complete: {} ({}%)",
            id, record.diagnosis, record.confidence
        );

        store.insert_front(record)?;
        if let Err(e) = store.persist() {
            store.remove_by_id(&id);
            return Err(e.into());
        }
        progress.finish();

        if !self.config.completion_delay.is_zero() {
            tokio::time::sleep(self.config.completion_delay).await;
        }

        Ok(id)
    }

    /// Make up a record with an id not yet present in `store`.
    pub fn synthesize<S: KeyValueStorage>(
        &self,
        store: &ResultStore<S>,
        image: String,
        now: DateTime<Utc>,
    ) -> AnalysisRecord {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        let diagnosis = Diagnosis::ALL
            .choose(&mut *rng)
            .cloned()
            .unwrap_or(Diagnosis::Healthy);
        let confidence = *CONFIDENCE_CANDIDATES
            .choose(&mut *rng)
            .unwrap_or(&CONFIDENCE_CANDIDATES[0]);

        let mut id = generate_id(&mut *rng, now);
        while store.find_by_id(&id).is_some() {
            id = generate_id(&mut *rng, now);
        }

        AnalysisRecord::new(id, now, diagnosis, confidence, image)
    }
}

/// `analysis_<unix millis>_<9 base36 chars>`
pub fn generate_id<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_SUFFIX_ALPHABET[rng.gen_range(0..ID_SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("analysis_{}_{}", now.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::progress::NullReporter;
    use crate::error::StoreError;
    use crate::store::{MemoryStorage, DEFAULT_STORE_KEY};
    use std::cell::RefCell;
    use std::collections::HashSet;

    fn fast_config() -> SequencerConfig {
        SequencerConfig {
            stage_interval: Duration::from_millis(1),
            completion_delay: Duration::ZERO,
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        stages: RefCell<Vec<(usize, usize, String)>>,
        finished: RefCell<bool>,
    }

    impl ProgressReporter for RecordingReporter {
        fn stage(&self, index: usize, total: usize, label: &str) {
            self.stages
                .borrow_mut()
                .push((index, total, label.to_string()));
        }

        fn finish(&self) {
            *self.finished.borrow_mut() = true;
        }
    }

    struct FailingStorage;

    impl KeyValueStorage for FailingStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_stores_new_record_first() {
        let storage = MemoryStorage::new();
        let mut store = ResultStore::load(&storage, DEFAULT_STORE_KEY);
        let before = store.len();

        let sequencer = Sequencer::with_seed(fast_config(), 7);
        let reporter = RecordingReporter::default();
        let id = sequencer
            .run(&mut store, "data:image/png;base64,AAAA".to_string(), &reporter)
            .await
            .unwrap();

        assert_eq!(store.len(), before + 1);
        assert_eq!(store.records()[0].id, id);
        assert_eq!(store.records()[0].image, "data:image/png;base64,AAAA");
        assert!(!sequencer.is_busy());

        let reloaded = ResultStore::load(&storage, DEFAULT_STORE_KEY);
        assert_eq!(reloaded.find_by_id(&id), store.find_by_id(&id));
    }

    #[tokio::test]
    async fn test_run_reports_every_stage_in_order() {
        let mut store = ResultStore::load(MemoryStorage::new(), DEFAULT_STORE_KEY);
        let sequencer = Sequencer::with_seed(fast_config(), 1);
        let reporter = RecordingReporter::default();

        sequencer
            .run(&mut store, String::new(), &reporter)
            .await
            .unwrap();

        let stages = reporter.stages.borrow();
        assert_eq!(stages.len(), STAGES.len());
        for (i, (index, total, label)) in stages.iter().enumerate() {
            assert_eq!(*index, i);
            assert_eq!(*total, STAGES.len());
            assert_eq!(label, STAGES[i]);
        }
        assert!(*reporter.finished.borrow());
    }

    struct TimingReporter {
        start: Instant,
        stage_times: RefCell<Vec<Duration>>,
    }

    impl ProgressReporter for TimingReporter {
        fn stage(&self, _index: usize, _total: usize, _label: &str) {
            self.stage_times.borrow_mut().push(self.start.elapsed());
        }

        fn finish(&self) {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_follows_stage_timing() {
        let config = SequencerConfig::default();
        let mut store = ResultStore::load(MemoryStorage::new(), DEFAULT_STORE_KEY);
        let sequencer = Sequencer::with_seed(config.clone(), 13);

        let start = Instant::now();
        let reporter = TimingReporter {
            start,
            stage_times: RefCell::new(Vec::new()),
        };
        sequencer
            .run(&mut store, String::new(), &reporter)
            .await
            .unwrap();

        let interval = config.stage_interval;
        let expected: Vec<Duration> = (1..=STAGES.len() as u32).map(|n| interval * n).collect();
        assert_eq!(*reporter.stage_times.borrow(), expected);

        let ticks = STAGES.len() as u32 + 1;
        assert_eq!(start.elapsed(), interval * ticks + config.completion_delay);
    }

    #[test]
    fn test_run_rejected_while_busy() {
        let mut store = ResultStore::load(MemoryStorage::new(), DEFAULT_STORE_KEY);
        let sequencer = Sequencer::with_seed(fast_config(), 3);

        let guard = sequencer.try_begin().unwrap();
        assert!(sequencer.is_busy());
        assert!(sequencer.try_begin().is_none());

        let result = tokio_test::block_on(sequencer.run(&mut store, String::new(), &NullReporter));
        assert!(matches!(result, Err(AnalysisError::Busy)));
        assert_eq!(store.len(), 5);

        drop(guard);
        assert!(!sequencer.is_busy());
        assert!(sequencer.try_begin().is_some());
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_store_unchanged() {
        let mut store = ResultStore::load(FailingStorage, DEFAULT_STORE_KEY);
        let sequencer = Sequencer::with_seed(fast_config(), 5);

        let result = sequencer.run(&mut store, String::new(), &NullReporter).await;
        assert!(matches!(result, Err(AnalysisError::Store(StoreError::Io { .. }))));
        assert_eq!(store.len(), 5);
        assert!(!sequencer.is_busy());
    }

    #[test]
    fn test_synthesize_draws_from_fixed_sets() {
        let store = ResultStore::load(MemoryStorage::new(), DEFAULT_STORE_KEY);
        let sequencer = Sequencer::with_seed(fast_config(), 42);

        let mut diagnoses = HashSet::new();
        let mut confidences = HashSet::new();
        for _ in 0..500 {
            let record = sequencer.synthesize(&store, String::new(), Utc::now());
            assert!(Diagnosis::ALL.contains(&record.diagnosis));
            assert!(CONFIDENCE_CANDIDATES.contains(&record.confidence));
            let expected: Vec<String> = record
                .diagnosis
                .recommendations()
                .iter()
                .map(|s| s.to_string())
                .collect();
            assert_eq!(record.recommendations, expected);

            diagnoses.insert(record.diagnosis.clone());
            confidences.insert(record.confidence.to_bits());
        }

        assert_eq!(diagnoses.len(), Diagnosis::ALL.len());
        assert_eq!(confidences.len(), CONFIDENCE_CANDIDATES.len());
    }

    #[test]
    fn test_same_seed_same_picks() {
        let store = ResultStore::load(MemoryStorage::new(), DEFAULT_STORE_KEY);
        let now = Utc::now();
        let a = Sequencer::with_seed(fast_config(), 9).synthesize(&store, String::new(), now);
        let b = Sequencer::with_seed(fast_config(), 9).synthesize(&store, String::new(), now);
        assert_eq!(a, b);
    }

    #[test]
    fn test_generate_id_format() {
        let mut rng = StdRng::seed_from_u64(0);
        let now = Utc::now();
        let id = generate_id(&mut rng, now);

        let prefix = format!("analysis_{}_", now.timestamp_millis());
        assert!(id.starts_with(&prefix));
        let suffix = &id[prefix.len()..];
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_ids_are_unique() {
        let store = ResultStore::load(MemoryStorage::new(), DEFAULT_STORE_KEY);
        let sequencer = Sequencer::with_seed(fast_config(), 11);
        let now = Utc::now();

        let ids: HashSet<String> = (0..200)
            .map(|_| sequencer.synthesize(&store, String::new(), now).id)
            .collect();
        assert_eq!(ids.len(), 200);
    }
}
