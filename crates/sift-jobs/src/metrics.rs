//! Counters for jobs run by a [`JobRunner`](crate::JobRunner)

use sift_extractor::BatchOutcome;

/// Totals across every job a runner has started
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobMetrics {
    /// Jobs started
    pub jobs_started: usize,

    /// Jobs that ended `completed`
    pub jobs_completed: usize,

    /// Jobs that ended `failed`
    pub jobs_failed: usize,

    /// Documents processed by completed jobs
    pub documents_processed: usize,

    /// Knowledge items saved by completed jobs
    pub items_extracted: usize,
}

impl JobMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a job start
    pub fn record_start(&mut self) {
        self.jobs_started += 1;
    }

    /// Record a completed job and its counts
    pub fn record_completion(&mut self, outcome: &BatchOutcome) {
        self.jobs_completed += 1;
        self.documents_processed += outcome.processed_items;
        self.items_extracted += outcome.extracted_count;
    }

    /// Record a failed job
    pub fn record_failure(&mut self) {
        self.jobs_failed += 1;
    }

    /// Jobs that have not reached a terminal state
    pub fn jobs_running(&self) -> usize {
        self.jobs_started
            .saturating_sub(self.jobs_completed + self.jobs_failed)
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        [
            "Job Metrics Summary".to_string(),
            "===================".to_string(),
            format!(
                "Jobs: {} started, {} completed, {} failed, {} running",
                self.jobs_started,
                self.jobs_completed,
                self.jobs_failed,
                self.jobs_running()
            ),
            format!("Documents processed: {}", self.documents_processed),
            format!("Items extracted: {}", self.items_extracted),
        ]
        .join("\n")
    }
}
