//! Background extraction jobs

use crate::config::JobConfig;
use crate::error::JobError;
use crate::metrics::JobMetrics;
use crate::store::{InMemoryTaskStore, TaskStore};
use async_trait::async_trait;
use sift_domain::progress::{estimate_eta, ProgressSample};
use sift_domain::traits::KnowledgeStore;
use sift_domain::{now_millis, ExtractionTask, TaskUpdate};
use sift_extractor::{ExtractionOptions, Extractor, ProgressSink};
use sift_llm::TextGenerator;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A task as seen by a poller
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    /// Task state
    pub task: ExtractionTask,

    /// Seconds remaining, when a sane projection exists
    pub eta_secs: Option<f64>,
}

/// Progress sink that merges every update into a [`TaskStore`]
pub struct TaskStoreSink<T: TaskStore> {
    tasks: Arc<T>,
    task_id: String,
}

impl<T: TaskStore> TaskStoreSink<T> {
    /// Sink writing to `task_id` in `tasks`
    pub fn new(tasks: Arc<T>, task_id: impl Into<String>) -> Self {
        Self {
            tasks,
            task_id: task_id.into(),
        }
    }
}

#[async_trait]
impl<T: TaskStore> ProgressSink for TaskStoreSink<T> {
    async fn report(&self, update: TaskUpdate) {
        match self.tasks.merge(&self.task_id, update).await {
            Ok(true) => {}
            Ok(false) => debug!("Task {} is gone; update dropped", self.task_id),
            Err(e) => warn!("Failed to record progress for {}: {}", self.task_id, e),
        }
    }
}

/// Runs batch extractions in the background and tracks their tasks
pub struct JobRunner<G, S, T = InMemoryTaskStore>
where
    G: TextGenerator,
    S: KnowledgeStore,
    T: TaskStore,
{
    extractor: Arc<Extractor<G, S>>,
    tasks: Arc<T>,
    config: JobConfig,
    metrics: Arc<Mutex<JobMetrics>>,
}

impl<G, S> JobRunner<G, S, InMemoryTaskStore>
where
    G: TextGenerator + 'static,
    S: KnowledgeStore + 'static,
{
    /// Runner keeping its tasks in memory
    pub fn new(extractor: Arc<Extractor<G, S>>, config: JobConfig) -> Result<Self, JobError> {
        Self::with_store(extractor, Arc::new(InMemoryTaskStore::new()), config)
    }
}

impl<G, S, T> JobRunner<G, S, T>
where
    G: TextGenerator + 'static,
    S: KnowledgeStore + 'static,
    T: TaskStore + 'static,
{
    /// Runner keeping its tasks in `tasks`
    pub fn with_store(
        extractor: Arc<Extractor<G, S>>,
        tasks: Arc<T>,
        config: JobConfig,
    ) -> Result<Self, JobError> {
        config.validate().map_err(JobError::Config)?;
        Ok(Self {
            extractor,
            tasks,
            config,
            metrics: Arc::new(Mutex::new(JobMetrics::new())),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Snapshot of the runner's counters
    pub fn metrics(&self) -> JobMetrics {
        lock(&self.metrics).clone()
    }

    /// Start extracting `document_ids` into `collection_id`
    ///
    /// Returns the new task id immediately; the batch runs on a spawned
    /// task. The job ends `completed` with the batch counts, or `failed`
    /// with a short message when the batch cannot proceed at all.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for an empty document list, or a task store error.
    pub async fn start(
        &self,
        document_ids: Vec<String>,
        collection_id: impl Into<String>,
        options: ExtractionOptions,
    ) -> Result<String, JobError> {
        if document_ids.is_empty() {
            return Err(JobError::InvalidRequest("no documents to extract".to_string()));
        }

        let task_id = Uuid::now_v7().to_string();
        self.tasks
            .set(ExtractionTask::new(task_id.clone(), document_ids.len(), now_millis()))
            .await?;
        lock(&self.metrics).record_start();

        info!("Started task {} for {} documents", task_id, document_ids.len());

        let extractor = Arc::clone(&self.extractor);
        let metrics = Arc::clone(&self.metrics);
        let sink = TaskStoreSink::new(Arc::clone(&self.tasks), task_id.clone());
        let collection_id = collection_id.into();

        tokio::spawn(async move {
            let result = extractor
                .extract_from_documents_with_progress(
                    &document_ids,
                    &collection_id,
                    &options,
                    &sink,
                )
                .await;

            let update = match result {
                Ok(outcome) => {
                    info!(
                        "Task {} completed: {} documents, {} items",
                        sink.task_id, outcome.processed_items, outcome.extracted_count
                    );
                    lock(&metrics).record_completion(&outcome);
                    TaskUpdate::completed(
                        outcome.processed_items,
                        outcome.extracted_count,
                        outcome.knowledge_item_ids,
                    )
                }
                Err(e) => {
                    error!("Task {} failed: {}", sink.task_id, e);
                    lock(&metrics).record_failure();
                    TaskUpdate::failed(e.user_message())
                }
            };
            sink.report(update).await;
        });

        Ok(task_id)
    }

    /// Current state of a task plus its ETA
    pub async fn task(&self, task_id: &str) -> Result<Option<TaskSnapshot>, JobError> {
        let task = self.tasks.get(task_id).await?;
        Ok(task.map(|task| {
            let eta_secs = self.eta(&task);
            TaskSnapshot { task, eta_secs }
        }))
    }

    /// Poll until the task is terminal
    ///
    /// # Errors
    ///
    /// `NotFound` when the task does not exist or is discarded while waiting.
    pub async fn wait(&self, task_id: &str) -> Result<TaskSnapshot, JobError> {
        let mut ticker = interval(self.config.poll_interval());
        loop {
            ticker.tick().await;
            let snapshot = self
                .task(task_id)
                .await?
                .ok_or_else(|| JobError::NotFound(task_id.to_string()))?;
            if snapshot.task.status.is_terminal() {
                return Ok(snapshot);
            }
        }
    }

    /// Forget a task
    ///
    /// A job still running keeps going; its updates are dropped.
    pub async fn discard(&self, task_id: &str) -> Result<bool, JobError> {
        let removed = self.tasks.remove(task_id).await?;
        if removed {
            debug!("Discarded task {}", task_id);
        }
        Ok(removed)
    }

    fn eta(&self, task: &ExtractionTask) -> Option<f64> {
        if task.status.is_terminal() {
            return None;
        }
        let samples: Vec<ProgressSample> = task.progress_history.iter().copied().collect();
        let start = samples.len().saturating_sub(self.config.history_window);
        estimate_eta(&samples[start..], self.config.eta_ceiling_secs)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
