//! In-memory store

use crate::StoreError;
use async_trait::async_trait;
use sift_domain::traits::{pair_key, KnowledgeStore, SimilarityCache};
use sift_domain::{now_millis, ItemId, KnowledgeItem, NewItem, Subcategory};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    items: Vec<KnowledgeItem>,
    documents: HashMap<String, String>,
    extracted: HashSet<String>,
    subcategories: Vec<Subcategory>,
    similarities: HashMap<(ItemId, ItemId), u8>,
}

#[derive(Default)]
struct Faults {
    documents: HashSet<String>,
    create_titles: Vec<String>,
    subcategories: bool,
}

/// Process-local implementation of the persistence traits
///
/// Items keep insertion order. Failures can be injected per document, per
/// item title, or for the subcategory configuration.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    faults: Mutex<Faults>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a source document
    pub fn add_document(&self, id: impl Into<String>, content: impl Into<String>) {
        lock(&self.state).documents.insert(id.into(), content.into());
    }

    /// Replace the configured subcategories
    pub fn set_subcategories(&self, subcategories: Vec<Subcategory>) {
        lock(&self.state).subcategories = subcategories;
    }

    /// Persist an item without going through the async trait
    pub fn insert_item(&self, item: NewItem) -> ItemId {
        let id = ItemId::new();
        lock(&self.state)
            .items
            .push(KnowledgeItem::from_new(id, item, now_millis()));
        id
    }

    /// Every stored item, in insertion order
    pub fn all_items(&self) -> Vec<KnowledgeItem> {
        lock(&self.state).items.clone()
    }

    /// Number of cached similarity scores
    pub fn cached_pair_count(&self) -> usize {
        lock(&self.state).similarities.len()
    }

    /// Make reads of `document_id` fail
    pub fn fail_document(&self, document_id: impl Into<String>) {
        lock(&self.faults).documents.insert(document_id.into());
    }

    /// Make saving any item whose title contains `needle` fail
    pub fn fail_items_titled(&self, needle: impl Into<String>) {
        lock(&self.faults).create_titles.push(needle.into());
    }

    /// Make the subcategory configuration unreadable
    pub fn fail_subcategories(&self) {
        lock(&self.faults).subcategories = true;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    type Error = StoreError;

    async fn create_item(&self, item: NewItem) -> Result<ItemId, Self::Error> {
        let rejected = lock(&self.faults)
            .create_titles
            .iter()
            .any(|needle| item.draft.title.contains(needle.as_str()));
        if rejected {
            return Err(StoreError::Unavailable(format!(
                "refusing to save '{}'",
                item.draft.title
            )));
        }
        Ok(self.insert_item(item))
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<KnowledgeItem>, Self::Error> {
        Ok(lock(&self.state).items.iter().find(|i| i.id == id).cloned())
    }

    async fn list_items(&self, collection_id: &str) -> Result<Vec<KnowledgeItem>, Self::Error> {
        Ok(lock(&self.state)
            .items
            .iter()
            .filter(|i| i.collection_id == collection_id)
            .cloned()
            .collect())
    }

    async fn document_content(&self, document_id: &str) -> Result<String, Self::Error> {
        if lock(&self.faults).documents.contains(document_id) {
            return Err(StoreError::Unavailable(format!(
                "document '{}' cannot be read",
                document_id
            )));
        }
        lock(&self.state)
            .documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("document '{}'", document_id)))
    }

    async fn subcategories(&self) -> Result<Vec<Subcategory>, Self::Error> {
        if lock(&self.faults).subcategories {
            return Err(StoreError::Unavailable("subcategories".to_string()));
        }
        Ok(lock(&self.state).subcategories.clone())
    }

    async fn is_extracted(&self, document_id: &str) -> Result<bool, Self::Error> {
        Ok(lock(&self.state).extracted.contains(document_id))
    }

    async fn mark_extracted(&self, document_id: &str, extracted: bool) -> Result<(), Self::Error> {
        let mut state = lock(&self.state);
        if extracted {
            state.extracted.insert(document_id.to_string());
        } else {
            state.extracted.remove(document_id);
        }
        Ok(())
    }
}

#[async_trait]
impl SimilarityCache for MemoryStore {
    type Error = StoreError;

    async fn cached_similarity(&self, a: ItemId, b: ItemId) -> Result<Option<u8>, Self::Error> {
        Ok(lock(&self.state).similarities.get(&pair_key(a, b)).copied())
    }

    async fn store_similarity(&self, a: ItemId, b: ItemId, score: u8) -> Result<(), Self::Error> {
        lock(&self.state).similarities.insert(pair_key(a, b), score);
        Ok(())
    }
}
