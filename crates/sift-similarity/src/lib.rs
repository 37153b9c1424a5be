//! Sift Similarity
//!
//! Cost-aware pairwise similarity between knowledge items, used for
//! deduplication graphs and "related items" recommendations.
//!
//! # Scoring
//!
//! ```text
//! tag      = shared tags / larger tag set × 100
//! category = 100 if same category else 0
//! fast     = (tag×0.2 + category×0.1) / 0.3
//! semantic = min(100, fast×1.2)        when fast ≥ fast_path_threshold
//!          = model rating (0-100)      otherwise
//! score    = round(semantic×0.7 + tag×0.2 + category×0.1)
//! ```
//!
//! Scoring never fails. Without a usable credential the model rating is
//! replaced by word-token overlap; any other model failure rates 50.
//!
//! # Example Usage
//!
//! ```no_run
//! use sift_llm::MockGenerator;
//! use sift_similarity::{SimilarityConfig, SimilarityEngine};
//! use sift_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let engine = SimilarityEngine::new(Arc::new(MockGenerator::new("80")), SimilarityConfig::default());
//! let store = MemoryStore::new();
//! let graph = engine.build_graph(&store.all_items(), &store, None).await;
//! println!("{} edges", graph.edges.len());
//! # }
//! ```

#![warn(missing_docs)]

mod config;
pub mod engine;
mod error;
mod graph;
mod related;

pub use config::SimilarityConfig;
pub use engine::SimilarityEngine;
pub use error::SimilarityError;
pub use graph::{SimilarityEdge, SimilarityGraph};
pub use related::RelatedItem;
