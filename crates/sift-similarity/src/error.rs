//! Error types for similarity lookups

use thiserror::Error;

/// Errors surfaced by store-backed similarity operations
///
/// Scoring itself never fails; only reading the items to score can.
#[derive(Error, Debug)]
pub enum SimilarityError {
    /// The item to find neighbours for does not exist
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Persistence error
    #[error("Store error: {0}")]
    Store(String),
}
