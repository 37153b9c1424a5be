//! Sift Domain Layer
//!
//! Core data model and pure algorithms for the knowledge-extraction pipeline.
//! Nothing in this crate performs I/O; the traits in [`traits`] describe the
//! collaborators (persistence, similarity cache) that other crates implement.
//!
//! ## Key Concepts
//!
//! - **Knowledge item**: a single extracted fact or concept with a title,
//!   content, an integer confidence in `[0, 100]` and up to five tags
//! - **Category**: one of exactly four fixed top-level buckets, optionally
//!   refined by a configured [`Subcategory`]
//! - **Extraction task**: the mutable state of one batch job, updated through
//!   partial [`TaskUpdate`]s with an additive merge rule
//! - **Stage**: one of the weighted phases a document passes through, used
//!   by the [`ProgressTracker`] to compute progress and ETA

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod category;
pub mod item;
pub mod progress;
pub mod task;
pub mod traits;

// Re-exports for convenience
pub use category::{Category, Subcategory};
pub use item::{
    now_millis, ItemDraft, ItemId, ItemStatus, KnowledgeItem, NewItem, DEFAULT_CONFIDENCE, MAX_TAGS,
};
pub use progress::{ProgressSample, ProgressTracker, Stage};
pub use task::{ExtractionTask, TaskStatus, TaskUpdate};
