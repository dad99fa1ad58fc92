use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};

use crate::core::config::UploadConfig;
use crate::core::error::{AppError, Result};
use crate::features::files::dtos::content_type_for;
use crate::features::files::models::{File, FileCategory};
use crate::features::files::services::UploadTask;

/// File rows as seen by the worker
#[async_trait]
pub trait FileLedger: Send + Sync {
    async fn find(&self, file_id: i64) -> Result<Option<File>>;

    /// Rows neither stored nor failed, created more than `older_than` ago
    async fn pending(&self, older_than: Duration) -> Result<Vec<File>>;

    async fn mark_stored(&self, file_id: i64) -> Result<()>;

    /// Record a dead-lettered upload; rows already stored are left alone
    async fn mark_failed(&self, file_id: i64, error: &str) -> Result<()>;
}

/// Moves bytes from a staged upload into durable storage
#[async_trait]
pub trait ObjectTransfer: Send + Sync {
    /// Read the source, refusing anything larger than `max_size` bytes
    async fn fetch(&self, source: &str, max_size: usize) -> Result<Vec<u8>>;

    /// Store under the catalog area at `file_path`
    async fn store(&self, file_path: &str, data: Vec<u8>, content_type: &str) -> Result<()>;

    /// Drop a staged source once it has been copied; failures are only logged
    async fn release(&self, _source: &str) {}
}

/// Exponential backoff between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base,
            backoff_max: config.backoff_max,
        }
    }

    /// Delay after a failed `attempt` (1-based): `base * 2^(attempt-1)`, capped
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_max)
    }

    /// Total backoff a task waits through before it gives up
    pub fn window(&self) -> Duration {
        (1..self.max_attempts.max(1))
            .map(|attempt| self.delay(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Largest accepted file per category, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub image: usize,
    pub model: usize,
}

impl SizeLimits {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            image: config.max_image_size,
            model: config.max_model_size,
        }
    }

    pub fn for_category(&self, category: FileCategory) -> usize {
        match category {
            FileCategory::Images => self.image,
            FileCategory::Models => self.model,
        }
    }
}

/// Reject `size` bytes from `source` when over `max_size`
pub fn check_size(source: &str, size: u64, max_size: usize) -> Result<()> {
    if size > max_size as u64 {
        return Err(AppError::BadRequest(format!(
            "{} is {} bytes; the limit is {} bytes",
            source, size, max_size
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Stored { attempts: u32 },
    /// The File row never became visible; its transaction was rolled back
    Discarded,
    /// Attempts exhausted; the error is recorded on the File row
    DeadLettered { attempts: u32, error: String },
}

enum AttemptError {
    MissingRow,
    Failed(String),
}

/// Background consumer of the upload queue
///
/// Besides queued tasks, the worker sweeps the ledger for rows that are still
/// pending: rows whose transaction committed after their task gave up, and
/// rows whose task was lost with a restart.
pub struct UploadWorker<L, T> {
    ledger: Arc<L>,
    transfer: Arc<T>,
    policy: RetryPolicy,
    limits: SizeLimits,
    concurrency: usize,
    in_flight: Mutex<HashSet<i64>>,
}

impl<L, T> UploadWorker<L, T>
where
    L: FileLedger + 'static,
    T: ObjectTransfer + 'static,
{
    pub fn new(
        ledger: Arc<L>,
        transfer: Arc<T>,
        policy: RetryPolicy,
        limits: SizeLimits,
        concurrency: usize,
    ) -> Self {
        Self {
            ledger,
            transfer,
            policy,
            limits,
            concurrency: concurrency.max(1),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Consume tasks until every queue handle is dropped, sweeping for pending
    /// rows on start and then every `sweep_every`
    pub async fn run(
        self: Arc<Self>,
        mut receiver: mpsc::UnboundedReceiver<UploadTask>,
        sweep_every: Duration,
    ) {
        tracing::info!(
            "Starting upload worker (concurrency={}, max_attempts={}, sweep_every={:?})",
            self.concurrency,
            self.policy.max_attempts,
            sweep_every
        );

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut sweep = tokio::time::interval(sweep_every.max(Duration::from_secs(1)));
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                task = receiver.recv() => {
                    let Some(task) = task else { break };
                    if !self.dispatch(&permits, task).await {
                        break;
                    }
                }
                _ = sweep.tick() => {
                    for task in self.pending_tasks().await {
                        if !self.dispatch(&permits, task).await {
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("Upload queue closed; upload worker stopping");
    }

    /// Spawn `task` once a permit is free; false when the worker is shutting down
    async fn dispatch(self: &Arc<Self>, permits: &Arc<Semaphore>, task: UploadTask) -> bool {
        if !self.claim(task.file_id) {
            tracing::debug!("Upload for file {} already in flight", task.file_id);
            return true;
        }
        let Ok(permit) = Arc::clone(permits).acquire_owned().await else {
            self.unclaim(task.file_id);
            return false;
        };

        let worker = Arc::clone(self);
        tokio::spawn(async move {
            let _permit = permit;
            worker.process(&task).await;
            worker.unclaim(task.file_id);
        });
        true
    }

    fn claim(&self, file_id: i64) -> bool {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.insert(file_id)
    }

    fn unclaim(&self, file_id: i64) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&file_id);
    }

    /// Tasks for rows still waiting on bytes, skipping those being handled now
    ///
    /// Only rows older than the retry window are picked up, so a row whose
    /// queued task is still backing off is left to that task.
    pub async fn pending_tasks(&self) -> Vec<UploadTask> {
        let files = match self.ledger.pending(self.policy.window()).await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("Failed to load pending uploads: {:?}", e);
                return Vec::new();
            }
        };

        let in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let tasks: Vec<UploadTask> = files
            .into_iter()
            .filter(|file| !in_flight.contains(&file.id))
            .filter_map(|file| {
                let Some(category) = FileCategory::parse(&file.category) else {
                    tracing::warn!(
                        "File {} has unknown category '{}'; not requeued",
                        file.id,
                        file.category
                    );
                    return None;
                };
                Some(UploadTask {
                    file_id: file.id,
                    source: file.source,
                    category,
                })
            })
            .collect();

        if !tasks.is_empty() {
            tracing::info!("Requeueing {} pending upload(s)", tasks.len());
        }
        tasks
    }

    /// Run one task to completion, retrying with backoff
    pub async fn process(&self, task: &UploadTask) -> UploadOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = AttemptError::MissingRow;

        for attempt in 1..=max_attempts {
            match self.attempt(task).await {
                Ok(()) => {
                    tracing::info!(
                        "Stored {} file {} after {} attempt(s)",
                        task.category,
                        task.file_id,
                        attempt
                    );
                    self.transfer.release(&task.source).await;
                    return UploadOutcome::Stored { attempts: attempt };
                }
                Err(e) => {
                    if let AttemptError::Failed(ref message) = e {
                        tracing::warn!(
                            "Upload attempt {}/{} for file {} failed: {}",
                            attempt,
                            max_attempts,
                            task.file_id,
                            message
                        );
                    }
                    last_error = e;
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.delay(attempt)).await;
            }
        }

        match last_error {
            AttemptError::MissingRow => {
                tracing::info!(
                    "Discarding upload for file {}: row never became visible",
                    task.file_id
                );
                UploadOutcome::Discarded
            }
            AttemptError::Failed(error) => {
                if let Err(e) = self.ledger.mark_failed(task.file_id, &error).await {
                    tracing::warn!(
                        "Failed to record upload error for file {}: {:?}",
                        task.file_id,
                        e
                    );
                }
                tracing::error!(
                    "Upload for file {} dead-lettered after {} attempts (source={}): {}",
                    task.file_id,
                    max_attempts,
                    task.source,
                    error
                );
                UploadOutcome::DeadLettered {
                    attempts: max_attempts,
                    error,
                }
            }
        }
    }

    async fn attempt(&self, task: &UploadTask) -> std::result::Result<(), AttemptError> {
        let failed = |e: AppError| AttemptError::Failed(e.to_string());

        let file = self
            .ledger
            .find(task.file_id)
            .await
            .map_err(failed)?
            .ok_or(AttemptError::MissingRow)?;

        if file.stored_at.is_some() {
            tracing::debug!("File {} already stored; skipping", file.id);
            return Ok(());
        }

        let max_size = self.limits.for_category(task.category);
        let data = self
            .transfer
            .fetch(&task.source, max_size)
            .await
            .map_err(failed)?;
        check_size(&task.source, data.len() as u64, max_size).map_err(failed)?;

        self.transfer
            .store(&file.file_path, data, content_type_for(&file.file_name))
            .await
            .map_err(failed)?;
        self.ledger.mark_stored(file.id).await.map_err(failed)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fake::faker::lorem::en::Word;
    use fake::Fake;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeLedger {
        files: Mutex<HashMap<i64, File>>,
        /// Lookups that report the row missing before it shows up
        hidden_lookups: AtomicUsize,
        failures: Mutex<Vec<(i64, String)>>,
    }

    fn row(file_id: i64, file_name: &str, category: FileCategory) -> File {
        let now = Utc::now();
        File {
            id: file_id,
            file_name: file_name.to_string(),
            file_path: category.storage_path("products", file_name),
            uploaded_by: "u1".to_string(),
            category: category.as_str().to_string(),
            source: format!(
                "http://localhost:9000/asset-catalog/staging/{}/{}/{}",
                category, file_id, file_name
            ),
            stored_at: None,
            upload_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    impl FakeLedger {
        fn with_files(files: Vec<File>) -> Self {
            let ledger = Self::default();
            ledger
                .files
                .lock()
                .unwrap()
                .extend(files.into_iter().map(|file| (file.id, file)));
            ledger
        }

        fn with_file(file_id: i64, file_name: &str) -> Self {
            Self::with_files(vec![row(file_id, file_name, FileCategory::Models)])
        }

        fn hidden_for(self, lookups: usize) -> Self {
            self.hidden_lookups.store(lookups, Ordering::SeqCst);
            self
        }
    }

    #[async_trait]
    impl FileLedger for FakeLedger {
        async fn find(&self, file_id: i64) -> Result<Option<File>> {
            let hidden = self.hidden_lookups.load(Ordering::SeqCst);
            if hidden > 0 {
                self.hidden_lookups.store(hidden - 1, Ordering::SeqCst);
                return Ok(None);
            }
            Ok(self.files.lock().unwrap().get(&file_id).cloned())
        }

        async fn pending(&self, older_than: Duration) -> Result<Vec<File>> {
            let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap();
            let mut files: Vec<File> = self
                .files
                .lock()
                .unwrap()
                .values()
                .filter(|f| f.stored_at.is_none() && f.upload_error.is_none())
                .filter(|f| f.created_at <= cutoff)
                .cloned()
                .collect();
            files.sort_by_key(|f| f.id);
            Ok(files)
        }

        async fn mark_stored(&self, file_id: i64) -> Result<()> {
            if let Some(file) = self.files.lock().unwrap().get_mut(&file_id) {
                file.stored_at = Some(Utc::now());
            }
            Ok(())
        }

        async fn mark_failed(&self, file_id: i64, error: &str) -> Result<()> {
            if let Some(file) = self.files.lock().unwrap().get_mut(&file_id) {
                if file.stored_at.is_none() {
                    file.upload_error = Some(error.to_string());
                }
            }
            self.failures
                .lock()
                .unwrap()
                .push((file_id, error.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeTransfer {
        failures_left: AtomicUsize,
        fetches: AtomicUsize,
        limits_seen: Mutex<Vec<usize>>,
        stored: Mutex<Vec<(String, String)>>,
        released: Mutex<Vec<String>>,
    }

    impl FakeTransfer {
        fn failing(times: usize) -> Self {
            let transfer = Self::default();
            transfer.failures_left.store(times, Ordering::SeqCst);
            transfer
        }
    }

    #[async_trait]
    impl ObjectTransfer for FakeTransfer {
        async fn fetch(&self, source: &str, max_size: usize) -> Result<Vec<u8>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.limits_seen.lock().unwrap().push(max_size);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(AppError::ExternalServiceError(format!(
                    "source {} unavailable",
                    source
                )));
            }
            Ok(source.as_bytes().to_vec())
        }

        async fn store(&self, file_path: &str, _data: Vec<u8>, content_type: &str) -> Result<()> {
            self.stored
                .lock()
                .unwrap()
                .push((file_path.to_string(), content_type.to_string()));
            Ok(())
        }

        async fn release(&self, source: &str) {
            self.released.lock().unwrap().push(source.to_string());
        }
    }

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_base: Duration::ZERO,
            backoff_max: Duration::ZERO,
        }
    }

    const LIMITS: SizeLimits = SizeLimits {
        image: 1024,
        model: 4096,
    };

    fn task(file_id: i64) -> UploadTask {
        let word: String = Word().fake();
        UploadTask {
            file_id,
            source: format!(
                "http://localhost:9000/asset-catalog/staging/models/{}/{}.glb",
                file_id, word
            ),
            category: FileCategory::Models,
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(3),
        };
        assert_eq!(policy.delay(1), Duration::from_millis(500));
        assert_eq!(policy.delay(2), Duration::from_millis(1000));
        assert_eq!(policy.delay(3), Duration::from_millis(2000));
        assert_eq!(policy.delay(4), Duration::from_secs(3));
        assert_eq!(policy.delay(40), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_stores_file_and_marks_row() {
        let ledger = Arc::new(FakeLedger::with_file(1, "chair.glb"));
        let transfer = Arc::new(FakeTransfer::default());
        let worker = UploadWorker::new(
            Arc::clone(&ledger),
            Arc::clone(&transfer),
            instant_policy(3),
            LIMITS,
            1,
        );

        let task = task(1);
        let outcome = worker.process(&task).await;

        assert_eq!(outcome, UploadOutcome::Stored { attempts: 1 });
        assert_eq!(
            transfer.stored.lock().unwrap().as_slice(),
            &[(
                "products/models/chair.glb".to_string(),
                "model/gltf-binary".to_string()
            )]
        );
        assert_eq!(transfer.released.lock().unwrap().as_slice(), &[task.source]);
        assert!(ledger.files.lock().unwrap()[&1].stored_at.is_some());
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let ledger = Arc::new(FakeLedger::with_file(1, "chair.glb"));
        let transfer = Arc::new(FakeTransfer::failing(2));
        let worker = UploadWorker::new(ledger, Arc::clone(&transfer), instant_policy(5), LIMITS, 1);

        let outcome = worker.process(&task(1)).await;

        assert_eq!(outcome, UploadOutcome::Stored { attempts: 3 });
        assert_eq!(transfer.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_waits_for_uncommitted_row() {
        let ledger = Arc::new(FakeLedger::with_file(1, "chair.glb").hidden_for(2));
        let worker = UploadWorker::new(
            ledger,
            Arc::new(FakeTransfer::default()),
            instant_policy(5),
            LIMITS,
            1,
        );

        assert_eq!(
            worker.process(&task(1)).await,
            UploadOutcome::Stored { attempts: 3 }
        );
    }

    #[tokio::test]
    async fn test_discards_rolled_back_row() {
        let ledger = Arc::new(FakeLedger::default());
        let transfer = Arc::new(FakeTransfer::default());
        let worker = UploadWorker::new(
            Arc::clone(&ledger),
            Arc::clone(&transfer),
            instant_policy(3),
            LIMITS,
            1,
        );

        assert_eq!(worker.process(&task(42)).await, UploadOutcome::Discarded);
        assert_eq!(transfer.fetches.load(Ordering::SeqCst), 0);
        assert!(ledger.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dead_letters_after_exhaustion() {
        let ledger = Arc::new(FakeLedger::with_file(1, "chair.glb"));
        let transfer = Arc::new(FakeTransfer::failing(10));
        let worker = UploadWorker::new(
            Arc::clone(&ledger),
            Arc::clone(&transfer),
            instant_policy(3),
            LIMITS,
            1,
        );

        let outcome = worker.process(&task(1)).await;

        let UploadOutcome::DeadLettered { attempts, error } = outcome else {
            panic!("expected dead letter, got {:?}", outcome);
        };
        assert_eq!(attempts, 3);
        assert!(error.contains("unavailable"));
        assert_eq!(transfer.fetches.load(Ordering::SeqCst), 3);

        let failures = ledger.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
        assert!(ledger.files.lock().unwrap()[&1].stored_at.is_none());
    }

    #[tokio::test]
    async fn test_already_stored_file_is_not_copied_again() {
        let ledger = Arc::new(FakeLedger::with_file(1, "chair.glb"));
        ledger.mark_stored(1).await.unwrap();
        let transfer = Arc::new(FakeTransfer::default());
        let worker = UploadWorker::new(ledger, Arc::clone(&transfer), instant_policy(3), LIMITS, 1);

        assert_eq!(
            worker.process(&task(1)).await,
            UploadOutcome::Stored { attempts: 1 }
        );
        assert_eq!(transfer.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_drains_queue_until_closed() {
        let ledger = Arc::new(FakeLedger::with_file(1, "chair.glb"));
        let transfer = Arc::new(FakeTransfer::default());
        let worker = Arc::new(UploadWorker::new(
            Arc::clone(&ledger),
            Arc::clone(&transfer),
            instant_policy(1),
            LIMITS,
            2,
        ));

        let (sender, receiver) = mpsc::unbounded_channel();
        sender.send(task(1)).unwrap();
        drop(sender);

        worker.run(receiver, Duration::from_secs(60)).await;

        // Spawned tasks finish shortly after the loop exits
        for _ in 0..50 {
            if ledger.files.lock().unwrap()[&1].stored_at.is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(ledger.files.lock().unwrap()[&1].stored_at.is_some());
    }

    #[test]
    fn test_window_sums_backoff_between_attempts() {
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
        };
        assert_eq!(policy.window(), Duration::from_millis(7500));
        assert_eq!(instant_policy(1).window(), Duration::ZERO);
    }

    #[test]
    fn test_size_limits_follow_category() {
        assert_eq!(LIMITS.for_category(FileCategory::Images), 1024);
        assert_eq!(LIMITS.for_category(FileCategory::Models), 4096);
    }

    #[test]
    fn test_check_size_allows_limit_and_rejects_above() {
        assert!(check_size("a.png", 10, 10).is_ok());
        let err = check_size("a.png", 11, 10).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref msg) if msg.contains("limit is 10")));
    }

    #[tokio::test]
    async fn test_oversized_image_dead_letters() {
        let ledger = Arc::new(FakeLedger::with_files(vec![row(
            1,
            "poster.png",
            FileCategory::Images,
        )]));
        let transfer = Arc::new(FakeTransfer::default());
        let limits = SizeLimits {
            image: 16,
            model: 100 * 1024 * 1024,
        };
        let worker = UploadWorker::new(
            Arc::clone(&ledger),
            Arc::clone(&transfer),
            instant_policy(2),
            limits,
            1,
        );

        // The fake serves the source URL itself, which is longer than 16 bytes
        let task = UploadTask {
            file_id: 1,
            source: ledger.files.lock().unwrap()[&1].source.clone(),
            category: FileCategory::Images,
        };
        let outcome = worker.process(&task).await;

        let UploadOutcome::DeadLettered { error, .. } = outcome else {
            panic!("expected dead letter, got {:?}", outcome);
        };
        assert!(error.contains("limit is 16 bytes"));
        assert_eq!(transfer.limits_seen.lock().unwrap().as_slice(), &[16, 16]);
        assert!(transfer.stored.lock().unwrap().is_empty());
        assert!(ledger.files.lock().unwrap()[&1].upload_error.is_some());
    }

    #[tokio::test]
    async fn test_models_get_the_model_limit() {
        let ledger = Arc::new(FakeLedger::with_file(1, "chair.glb"));
        let transfer = Arc::new(FakeTransfer::default());
        let worker = UploadWorker::new(ledger, Arc::clone(&transfer), instant_policy(1), LIMITS, 1);

        assert_eq!(
            worker.process(&task(1)).await,
            UploadOutcome::Stored { attempts: 1 }
        );
        assert_eq!(transfer.limits_seen.lock().unwrap().as_slice(), &[4096]);
    }

    #[tokio::test]
    async fn test_pending_rows_are_requeued_from_the_ledger() {
        let mut stored = row(2, "stored.glb", FileCategory::Models);
        stored.stored_at = Some(Utc::now());
        let mut failed = row(3, "failed.png", FileCategory::Images);
        failed.upload_error = Some("gone".to_string());
        let pending = row(4, "lost.png", FileCategory::Images);
        let ledger = Arc::new(FakeLedger::with_files(vec![
            row(1, "chair.glb", FileCategory::Models),
            stored,
            failed,
            pending.clone(),
        ]));
        let transfer = Arc::new(FakeTransfer::default());
        let worker = UploadWorker::new(
            Arc::clone(&ledger),
            Arc::clone(&transfer),
            instant_policy(1),
            LIMITS,
            1,
        );

        let tasks = worker.pending_tasks().await;

        let ids: Vec<i64> = tasks.iter().map(|t| t.file_id).collect();
        assert_eq!(ids, vec![1, 4]);
        assert_eq!(tasks[1].source, pending.source);
        assert_eq!(tasks[1].category, FileCategory::Images);

        for task in &tasks {
            assert_eq!(
                worker.process(task).await,
                UploadOutcome::Stored { attempts: 1 }
            );
        }
        assert!(worker.pending_tasks().await.is_empty());
        assert!(ledger.files.lock().unwrap()[&4].stored_at.is_some());
    }

    #[tokio::test]
    async fn test_pending_skips_rows_in_flight_and_within_window() {
        let mut recent = row(2, "recent.glb", FileCategory::Models);
        recent.created_at = Utc::now() + chrono::Duration::seconds(60);
        let ledger = Arc::new(FakeLedger::with_files(vec![
            row(1, "chair.glb", FileCategory::Models),
            recent,
        ]));
        let worker = UploadWorker::new(
            ledger,
            Arc::new(FakeTransfer::default()),
            instant_policy(1),
            LIMITS,
            1,
        );

        assert!(worker.claim(1));
        assert!(!worker.claim(1));
        assert!(worker.pending_tasks().await.is_empty());

        worker.unclaim(1);
        let ids: Vec<i64> = worker
            .pending_tasks()
            .await
            .iter()
            .map(|t| t.file_id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn test_failure_is_not_recorded_on_stored_row() {
        let ledger = FakeLedger::with_file(1, "chair.glb");
        ledger.mark_stored(1).await.unwrap();
        ledger.mark_failed(1, "late failure").await.unwrap();

        assert!(ledger.files.lock().unwrap()[&1].upload_error.is_none());
    }
}
