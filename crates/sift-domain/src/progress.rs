//! Weighted multi-stage progress and ETA estimation
//!
//! A document moves through four stages with fixed weights that sum to 1.
//! Batch progress interpolates between whole documents using the current
//! document's stage fraction; the ETA is projected from the velocity of the
//! most recent progress samples.

use serde::{Deserialize, Serialize};

/// Number of samples kept for ETA estimation
pub const HISTORY_WINDOW: usize = 5;

/// Progress shown while a job is running but has not measurably advanced
pub const MIN_VISIBLE_PROGRESS: u8 = 5;

/// Projections above this many seconds are treated as noise
pub const ETA_CEILING_SECS: f64 = 3600.0;

/// Phase of a document (or of the task as a whole)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Reading, cleaning and chunking the document
    Parsing,
    /// Issuing generation calls chunk by chunk
    Extracting,
    /// Validating and classifying drafts
    Summarizing,
    /// Persisting items
    Saving,
    /// Terminal: the job could not proceed
    Failed,
    /// Terminal: all documents processed
    Completed,
}

impl Stage {
    /// The four working stages in order
    pub const PIPELINE: [Stage; 4] = [
        Stage::Parsing,
        Stage::Extracting,
        Stage::Summarizing,
        Stage::Saving,
    ];

    /// Share of a document's progress attributed to this stage
    pub fn weight(&self) -> f64 {
        match self {
            Stage::Parsing => 0.20,
            Stage::Extracting => 0.40,
            Stage::Summarizing => 0.20,
            Stage::Saving => 0.20,
            Stage::Failed | Stage::Completed => 0.0,
        }
    }

    /// Get the stage name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Parsing => "parsing",
            Stage::Extracting => "extracting",
            Stage::Summarizing => "summarizing",
            Stage::Saving => "saving",
            Stage::Failed => "failed",
            Stage::Completed => "completed",
        }
    }

    /// Whether the stage ends the task
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Failed | Stage::Completed)
    }
}

/// Fraction of one document completed, in `[0, 1]`
///
/// Sum of the weights of fully completed stages plus the current stage's
/// weight scaled by `fraction`.
pub fn stage_progress(stage: Stage, fraction: f64) -> f64 {
    match stage {
        Stage::Completed => 1.0,
        Stage::Failed => 0.0,
        current => {
            let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
            let done: f64 = Stage::PIPELINE
                .iter()
                .take_while(|s| **s != current)
                .map(Stage::weight)
                .sum();
            (done + current.weight() * fraction).clamp(0.0, 1.0)
        }
    }
}

/// Tracks document-level progress for a batch
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_documents: usize,
    completed_documents: usize,
}

impl ProgressTracker {
    /// Create a tracker for a batch of `total_documents`
    pub fn new(total_documents: usize) -> Self {
        Self {
            total_documents,
            completed_documents: 0,
        }
    }

    /// Total documents in the batch
    pub fn total_documents(&self) -> usize {
        self.total_documents
    }

    /// Documents fully processed so far
    pub fn completed_documents(&self) -> usize {
        self.completed_documents
    }

    /// Mark the current document as done
    pub fn complete_document(&mut self) {
        self.completed_documents = (self.completed_documents + 1).min(self.total_documents);
    }

    /// Overall percentage while the current document is at `stage`/`fraction`
    ///
    /// Clamped to `[0, 100]` and floored at [`MIN_VISIBLE_PROGRESS`].
    pub fn progress(&self, stage: Stage, fraction: f64) -> u8 {
        if self.total_documents == 0 {
            return 100;
        }
        let current = if self.completed_documents >= self.total_documents {
            0.0
        } else {
            stage_progress(stage, fraction)
        };
        let overall =
            (self.completed_documents as f64 + current) / self.total_documents as f64 * 100.0;
        let overall = overall.clamp(0.0, 100.0).round() as u8;
        overall.max(MIN_VISIBLE_PROGRESS)
    }

    /// Percentage at a document boundary
    pub fn document_boundary(&self) -> u8 {
        self.progress(Stage::Parsing, 0.0)
    }
}

/// One observation of task progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSample {
    /// Percentage at the time of the sample
    pub progress: u8,
    /// Milliseconds since epoch
    pub timestamp_ms: u64,
}

/// Estimate the seconds remaining from recent samples
///
/// Averages seconds-per-point over consecutive sample pairs with a positive
/// progress delta and projects the remaining points. Returns `None` without a
/// usable pair, when the latest progress is 0 or complete, or when the
/// projection is negative or above `ceiling_secs`.
pub fn estimate_eta(history: &[ProgressSample], ceiling_secs: f64) -> Option<f64> {
    let window = &history[history.len().saturating_sub(HISTORY_WINDOW)..];
    let current = window.last()?.progress;
    if current == 0 || current >= 100 {
        return None;
    }

    let rates: Vec<f64> = window
        .windows(2)
        .filter(|pair| pair[1].progress > pair[0].progress)
        .map(|pair| {
            let dt = pair[1].timestamp_ms as f64 - pair[0].timestamp_ms as f64;
            let dp = (pair[1].progress - pair[0].progress) as f64;
            dt / 1000.0 / dp
        })
        .collect();

    if rates.is_empty() {
        return None;
    }

    let secs_per_point = rates.iter().sum::<f64>() / rates.len() as f64;
    let eta = secs_per_point * (100 - current) as f64;

    if !eta.is_finite() || eta < 0.0 || eta > ceiling_secs {
        return None;
    }
    Some(eta)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Batch progress always stays within the visible range
        #[test]
        fn test_progress_in_range(
            total in 1usize..50,
            completed in 0usize..60,
            stage_idx in 0usize..4,
            fraction in -1.0f64..2.0,
        ) {
            let mut tracker = ProgressTracker::new(total);
            for _ in 0..completed {
                tracker.complete_document();
            }
            let p = tracker.progress(Stage::PIPELINE[stage_idx], fraction);
            prop_assert!((MIN_VISIBLE_PROGRESS..=100).contains(&p));
        }

        /// Any ETA returned is within the sanity bounds
        #[test]
        fn test_eta_bounded(points in proptest::collection::vec((0u8..=100, 0u64..10_000_000), 0..8)) {
            let mut history: Vec<ProgressSample> = points
                .into_iter()
                .map(|(progress, timestamp_ms)| ProgressSample { progress, timestamp_ms })
                .collect();
            history.sort_by_key(|s| s.timestamp_ms);
            if let Some(eta) = estimate_eta(&history, ETA_CEILING_SECS) {
                prop_assert!((0.0..=ETA_CEILING_SECS).contains(&eta));
            }
        }
    }
}
