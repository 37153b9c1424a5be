//! Extraction task state and the partial-update merge rule

use crate::item::ItemId;
use crate::progress::{estimate_eta, ProgressSample, Stage, HISTORY_WINDOW, MIN_VISIBLE_PROGRESS};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Lifecycle status of a batch extraction task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// The job is running
    Processing,
    /// The job finished; counts are final
    Completed,
    /// The job could not proceed
    Failed,
}

impl TaskStatus {
    /// Whether no further progress will be reported
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Processing)
    }
}

/// State of one batch extraction job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionTask {
    /// Task identifier
    pub id: String,

    /// Lifecycle status
    pub status: TaskStatus,

    /// Current stage of the document being processed
    pub stage: Stage,

    /// Number of documents in the batch
    pub total_items: usize,

    /// Documents processed so far, including failed ones
    pub processed_items: usize,

    /// Knowledge items persisted so far
    pub extracted_count: usize,

    /// Overall percentage
    pub progress: u8,

    /// Ids of every item persisted by this task
    pub knowledge_item_ids: Vec<ItemId>,

    /// Recent progress samples used for the ETA
    pub progress_history: VecDeque<ProgressSample>,

    /// Start time (ms since epoch)
    pub start_time: u64,

    /// Document currently being processed
    pub current_document: Option<String>,

    /// Short user-facing failure message
    pub error: Option<String>,
}

/// A partial update to an [`ExtractionTask`]
///
/// Absent fields leave the task untouched. In particular an absent
/// `knowledge_item_ids` keeps the accumulated ids; a present one replaces them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    /// New status
    pub status: Option<TaskStatus>,
    /// New stage
    pub stage: Option<Stage>,
    /// New document total
    pub total_items: Option<usize>,
    /// New processed count
    pub processed_items: Option<usize>,
    /// New extracted count
    pub extracted_count: Option<usize>,
    /// New progress percentage
    pub progress: Option<u8>,
    /// Full replacement for the accumulated id list
    pub knowledge_item_ids: Option<Vec<ItemId>>,
    /// Document now being processed
    pub current_document: Option<String>,
    /// Failure message
    pub error: Option<String>,
}

impl TaskUpdate {
    /// Update moving the current document to `stage` at `progress`
    pub fn stage(stage: Stage, progress: u8) -> Self {
        Self {
            stage: Some(stage),
            progress: Some(progress),
            ..Default::default()
        }
    }

    /// Terminal update for a finished job
    pub fn completed(processed_items: usize, extracted_count: usize, ids: Vec<ItemId>) -> Self {
        Self {
            status: Some(TaskStatus::Completed),
            stage: Some(Stage::Completed),
            processed_items: Some(processed_items),
            extracted_count: Some(extracted_count),
            progress: Some(100),
            knowledge_item_ids: Some(ids),
            ..Default::default()
        }
    }

    /// Terminal update for a job that could not proceed
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(TaskStatus::Failed),
            stage: Some(Stage::Failed),
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Whether this update ends the task
    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(|s| s.is_terminal())
    }
}

impl ExtractionTask {
    /// A freshly started task, already showing the minimum visible progress
    pub fn new(id: impl Into<String>, total_items: usize, now_ms: u64) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::Processing,
            stage: Stage::Parsing,
            total_items,
            processed_items: 0,
            extracted_count: 0,
            progress: MIN_VISIBLE_PROGRESS,
            knowledge_item_ids: Vec::new(),
            progress_history: VecDeque::with_capacity(HISTORY_WINDOW),
            start_time: now_ms,
            current_document: None,
            error: None,
        }
    }

    /// Merge a partial update into the task
    ///
    /// Once the task is terminal, only another terminal update is applied.
    /// While processing, progress never moves backwards.
    pub fn apply(&mut self, update: TaskUpdate, now_ms: u64) {
        if self.status.is_terminal() && !update.is_terminal() {
            return;
        }

        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(stage) = update.stage {
            self.stage = stage;
        }
        if let Some(total) = update.total_items {
            self.total_items = total;
        }
        if let Some(processed) = update.processed_items {
            self.processed_items = processed;
        }
        if let Some(extracted) = update.extracted_count {
            self.extracted_count = extracted;
        }
        if let Some(ids) = update.knowledge_item_ids {
            self.knowledge_item_ids = ids;
        }
        if let Some(document) = update.current_document {
            self.current_document = Some(document);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(progress) = update.progress {
            let progress = progress.min(100);
            if progress > self.progress || self.status.is_terminal() {
                self.progress = progress;
                self.record_sample(now_ms);
            }
        }
    }

    /// Seconds remaining, projected from recent progress
    pub fn eta_secs(&self, ceiling_secs: f64) -> Option<f64> {
        if self.status.is_terminal() {
            return None;
        }
        let samples: Vec<ProgressSample> = self.progress_history.iter().copied().collect();
        estimate_eta(&samples, ceiling_secs)
    }

    fn record_sample(&mut self, now_ms: u64) {
        if self.progress_history.len() == HISTORY_WINDOW {
            self.progress_history.pop_front();
        }
        self.progress_history.push_back(ProgressSample {
            progress: self.progress,
            timestamp_ms: now_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ETA_CEILING_SECS;

    #[test]
    fn test_new_task_shows_minimum_progress() {
        let mut task = ExtractionTask::new("t1", 3, 0);
        assert_eq!(task.progress, MIN_VISIBLE_PROGRESS);
        assert!(task.progress_history.is_empty());

        // The tracker's floor adds nothing new
        task.apply(TaskUpdate::stage(Stage::Parsing, MIN_VISIBLE_PROGRESS), 10);
        assert_eq!(task.progress, MIN_VISIBLE_PROGRESS);
        assert!(task.progress_history.is_empty());
    }

    #[test]
    fn test_update_without_ids_preserves_them() {
        let mut task = ExtractionTask::new("t1", 2, 0);
        let ids = vec![ItemId::new(), ItemId::new()];
        task.apply(
            TaskUpdate {
                knowledge_item_ids: Some(ids.clone()),
                ..Default::default()
            },
            10,
        );

        task.apply(TaskUpdate::stage(Stage::Extracting, 30), 20);

        assert_eq!(task.knowledge_item_ids, ids);
        assert_eq!(task.stage, Stage::Extracting);
        assert_eq!(task.progress, 30);
    }

    #[test]
    fn test_update_with_ids_replaces_them() {
        let mut task = ExtractionTask::new("t1", 1, 0);
        task.knowledge_item_ids = vec![ItemId::new()];
        let replacement = vec![ItemId::new(), ItemId::new(), ItemId::new()];

        task.apply(
            TaskUpdate {
                knowledge_item_ids: Some(replacement.clone()),
                ..Default::default()
            },
            5,
        );

        assert_eq!(task.knowledge_item_ids, replacement);
    }

    #[test]
    fn test_progress_does_not_regress() {
        let mut task = ExtractionTask::new("t1", 1, 0);
        task.apply(TaskUpdate::stage(Stage::Saving, 60), 1);
        task.apply(TaskUpdate::stage(Stage::Parsing, 20), 2);
        assert_eq!(task.progress, 60);
        assert_eq!(task.stage, Stage::Parsing);
        assert_eq!(task.progress_history.len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut task = ExtractionTask::new("t1", 1, 0);
        for i in 1..=10u8 {
            task.apply(TaskUpdate::stage(Stage::Extracting, i * 5), i as u64 * 100);
        }
        assert_eq!(task.progress_history.len(), HISTORY_WINDOW);
        assert_eq!(task.progress_history.back().map(|s| s.progress), Some(50));
    }

    #[test]
    fn test_terminal_task_ignores_progress() {
        let mut task = ExtractionTask::new("t1", 1, 0);
        task.apply(TaskUpdate::completed(1, 0, Vec::new()), 1);
        task.apply(TaskUpdate::stage(Stage::Extracting, 40), 2);
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.stage, Stage::Completed);
        assert_eq!(task.progress, 100);
        assert_eq!(task.eta_secs(ETA_CEILING_SECS), None);
    }

    #[test]
    fn test_failed_update() {
        let mut task = ExtractionTask::new("t1", 1, 0);
        task.apply(TaskUpdate::failed("no documents"), 1);
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.stage, Stage::Failed);
        assert_eq!(task.error.as_deref(), Some("no documents"));
    }

    #[test]
    fn test_eta_from_history() {
        let mut task = ExtractionTask::new("t1", 1, 0);
        task.apply(TaskUpdate::stage(Stage::Parsing, 10), 0);
        assert_eq!(task.eta_secs(ETA_CEILING_SECS), None);
        task.apply(TaskUpdate::stage(Stage::Extracting, 20), 1000);
        let eta = task.eta_secs(ETA_CEILING_SECS).unwrap();
        assert!((eta - 8.0).abs() < 0.01);
    }
}
