//! Bounded-neighbourhood similarity graph

use crate::engine::SimilarityEngine;
use sift_domain::traits::SimilarityCache;
use sift_domain::{ItemId, KnowledgeItem};
use sift_llm::TextGenerator;
use tracing::{debug, warn};

/// An undirected edge between two similar items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarityEdge {
    /// Earlier item in the input order
    pub source: ItemId,
    /// Later item in the input order
    pub target: ItemId,
    /// Similarity in `[0, 100]`
    pub score: u8,
}

/// Edges plus bookkeeping about how they were obtained
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityGraph {
    /// Edges at or above the configured minimum
    pub edges: Vec<SimilarityEdge>,
    /// Pairs considered
    pub compared_pairs: usize,
    /// Pairs answered from the cache
    pub cache_hits: usize,
}

impl<G: TextGenerator> SimilarityEngine<G> {
    /// Build a similarity graph over `items`
    ///
    /// Each item is compared only with the items at most `graph_window`
    /// positions after it, so the work grows linearly with the item count.
    /// Scores are read from and written to `cache`; a second build over the
    /// same items computes nothing. Cache failures are logged and ignored.
    pub async fn build_graph<C: SimilarityCache>(
        &self,
        items: &[KnowledgeItem],
        cache: &C,
        credential: Option<&str>,
    ) -> SimilarityGraph {
        let window = self.config().graph_window;
        let min_similarity = self.config().graph_min_similarity;
        let mut graph = SimilarityGraph::default();

        for (i, a) in items.iter().enumerate() {
            let end = (i + window + 1).min(items.len());
            for b in &items[i + 1..end] {
                graph.compared_pairs += 1;

                let cached = match cache.cached_similarity(a.id, b.id).await {
                    Ok(score) => score,
                    Err(e) => {
                        warn!("Similarity cache read failed: {}", e);
                        None
                    }
                };

                let score = match cached {
                    Some(score) => {
                        graph.cache_hits += 1;
                        score
                    }
                    None => {
                        let score = self.similarity(a, b, credential).await;
                        if let Err(e) = cache.store_similarity(a.id, b.id, score).await {
                            warn!("Similarity cache write failed: {}", e);
                        }
                        score
                    }
                };

                if score >= min_similarity {
                    graph.edges.push(SimilarityEdge {
                        source: a.id,
                        target: b.id,
                        score,
                    });
                }
            }
        }

        debug!(
            "Graph over {} items: {} pairs, {} cached, {} edges",
            items.len(),
            graph.compared_pairs,
            graph.cache_hits,
            graph.edges.len()
        );
        graph
    }
}
