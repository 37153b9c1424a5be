//! "Related items" lookup

use crate::engine::SimilarityEngine;
use crate::error::SimilarityError;
use futures::future::join_all;
use sift_domain::traits::KnowledgeStore;
use sift_domain::{ItemId, KnowledgeItem};
use sift_llm::TextGenerator;
use tracing::debug;

/// An item together with its similarity to the query item
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedItem {
    /// The related item
    pub item: KnowledgeItem,
    /// Similarity in `[0, 100]`
    pub score: u8,
}

impl<G: TextGenerator> SimilarityEngine<G> {
    /// Items in the same collection most similar to `item_id`
    ///
    /// Candidates are scored concurrently, kept when at or above
    /// `min_similarity`, sorted by descending score and truncated to `limit`.
    pub async fn related_items<S: KnowledgeStore>(
        &self,
        store: &S,
        item_id: ItemId,
        limit: usize,
        min_similarity: u8,
        credential: Option<&str>,
    ) -> Result<Vec<RelatedItem>, SimilarityError> {
        let item = store
            .get_item(item_id)
            .await
            .map_err(|e| SimilarityError::Store(e.to_string()))?
            .ok_or_else(|| SimilarityError::ItemNotFound(item_id.to_string()))?;

        let candidates: Vec<KnowledgeItem> = store
            .list_items(&item.collection_id)
            .await
            .map_err(|e| SimilarityError::Store(e.to_string()))?
            .into_iter()
            .filter(|c| c.id != item.id)
            .collect();

        let scores = join_all(
            candidates
                .iter()
                .map(|candidate| self.similarity(&item, candidate, credential)),
        )
        .await;

        let mut related: Vec<RelatedItem> = candidates
            .into_iter()
            .zip(scores)
            .filter(|(_, score)| *score >= min_similarity)
            .map(|(item, score)| RelatedItem { item, score })
            .collect();

        related.sort_by(|a, b| b.score.cmp(&a.score));
        related.truncate(limit);

        debug!("{} related items for {}", related.len(), item_id);
        Ok(related)
    }
}
