//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the extraction core and the
//! persistence layer. Implementations live in other crates (`sift-store`
//! ships an in-memory one).

use crate::{ItemId, KnowledgeItem, NewItem, Subcategory};
use async_trait::async_trait;

/// Persistence capability consumed by the extraction pipeline
///
/// Methods take `&self`: saves run concurrently, so implementations provide
/// their own interior synchronization.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Error type for store operations
    type Error: std::fmt::Display + Send + Sync + 'static;

    /// Persist a new item and return its id
    async fn create_item(&self, item: NewItem) -> Result<ItemId, Self::Error>;

    /// Get an item by id
    async fn get_item(&self, id: ItemId) -> Result<Option<KnowledgeItem>, Self::Error>;

    /// List every item in a collection
    async fn list_items(&self, collection_id: &str) -> Result<Vec<KnowledgeItem>, Self::Error>;

    /// Raw text content of a source document
    async fn document_content(&self, document_id: &str) -> Result<String, Self::Error>;

    /// Configured subcategories in declaration order
    async fn subcategories(&self) -> Result<Vec<Subcategory>, Self::Error>;

    /// Whether the document has already been extracted
    async fn is_extracted(&self, document_id: &str) -> Result<bool, Self::Error>;

    /// Set or clear the document's extracted flag
    async fn mark_extracted(&self, document_id: &str, extracted: bool) -> Result<(), Self::Error>;
}

/// Cache of pairwise similarity scores keyed by the unordered item pair
#[async_trait]
pub trait SimilarityCache: Send + Sync {
    /// Error type for cache operations
    type Error: std::fmt::Display + Send + Sync + 'static;

    /// Previously computed score for the pair, if any
    async fn cached_similarity(&self, a: ItemId, b: ItemId) -> Result<Option<u8>, Self::Error>;

    /// Remember the score for the pair
    async fn store_similarity(&self, a: ItemId, b: ItemId, score: u8) -> Result<(), Self::Error>;
}

/// Canonical key for an unordered pair
pub fn pair_key(a: ItemId, b: ItemId) -> (ItemId, ItemId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
