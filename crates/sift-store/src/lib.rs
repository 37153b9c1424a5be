//! Sift Storage Layer
//!
//! Implementations of the [`KnowledgeStore`] and [`SimilarityCache`] traits.
//!
//! - [`SqliteStore`]: durable storage for items, source documents,
//!   subcategories and cached similarity scores in a single SQLite file
//! - [`MemoryStore`]: process-local storage with injectable failures, used
//!   by tests
//!
//! # Examples
//!
//! ```no_run
//! use sift_store::SqliteStore;
//!
//! let store = SqliteStore::new("sift.db").unwrap();
//! store.add_document("doc-1", "Rust has no garbage collector.").unwrap();
//! ```
//!
//! [`KnowledgeStore`]: sift_domain::traits::KnowledgeStore
//! [`SimilarityCache`]: sift_domain::traits::SimilarityCache

#![warn(missing_docs)]

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Item or document not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The store refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::InvalidData(e.to_string())
    }
}
