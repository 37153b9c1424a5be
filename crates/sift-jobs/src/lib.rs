//! Sift Jobs
//!
//! Runs batch extractions in the background and keeps their task state
//! available for polling.
//!
//! # Overview
//!
//! - **Start**: [`JobRunner::start`] records a fresh task, spawns the batch
//!   and returns the task id immediately
//! - **Track**: every progress update from the extractor is merged into a
//!   [`TaskStore`]; [`JobRunner::task`] returns the task with its ETA
//! - **Finish**: the job ends `completed` with the batch counts, or `failed`
//!   with a short message when the batch could not start
//! - **Discard**: [`JobRunner::discard`] forgets a task; there is no
//!   cancellation, a running job simply reports into the void
//!
//! # Usage
//!
//! ```no_run
//! use sift_extractor::{ExtractionOptions, Extractor, ExtractorConfig};
//! use sift_jobs::{JobConfig, JobRunner};
//! use sift_llm::MockGenerator;
//! use sift_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let extractor = Extractor::new(Arc::new(MockGenerator::new("[]")), store, ExtractorConfig::default());
//! let runner = JobRunner::new(Arc::new(extractor), JobConfig::default())?;
//!
//! let task_id = runner
//!     .start(vec!["doc-1".to_string()], "kb", ExtractionOptions::default())
//!     .await?;
//! let done = runner.wait(&task_id).await?;
//! println!("{} items", done.task.extracted_count);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [jobs]
//! history_window = 5
//! eta_ceiling_secs = 3600.0
//! poll_interval_ms = 500
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod metrics;
mod runner;
mod store;

pub use config::JobConfig;
pub use error::JobError;
pub use metrics::JobMetrics;
pub use runner::{JobRunner, TaskSnapshot, TaskStoreSink};
pub use store::{InMemoryTaskStore, TaskStore};
