//! Sift Extractor
//!
//! Turns long, noisy documents into discrete, classified knowledge items
//! using a text-generation model.
//!
//! # Overview
//!
//! Each document passes through the same stages:
//!
//! ```text
//! raw text → preprocess → chunk → generate (per chunk) → parse/repair
//!          → classify → save (sub-batches) → mark extracted
//! ```
//!
//! Oversized documents are split into overlapping chunks at paragraph,
//! heading or list boundaries and sent to the model one at a time. Model
//! replies are repaired when they are not quite JSON. A failing chunk or
//! document is logged and skipped; only credential failures abort a
//! document, and only setup problems fail a batch.
//!
//! # Example Usage
//!
//! ```no_run
//! use sift_extractor::{ExtractionOptions, Extractor, ExtractorConfig};
//! use sift_llm::MockGenerator;
//! use sift_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = MockGenerator::new(r#"[{"title": "Ownership", "content": "Each value has one owner."}]"#);
//! let store = Arc::new(MemoryStore::new());
//! store.add_document("doc-1", "Rust values have exactly one owner at a time.");
//!
//! let extractor = Extractor::new(Arc::new(generator), store, ExtractorConfig::default());
//! let outcome = extractor
//!     .extract_from_documents(&["doc-1".to_string()], "notes", &ExtractionOptions::default())
//!     .await?;
//!
//! println!("Extracted {} items", outcome.extracted_count);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod chunking;
pub mod classifier;
mod config;
mod error;
mod extractor;
pub mod parser;
pub mod preprocess;
mod prompt;
mod types;

#[cfg(test)]
mod tests;

pub use chunking::{Chunk, TextChunker};
pub use classifier::classify;
pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::{Extractor, NoopProgress, ProgressSink};
pub use preprocess::{clean, CleanedContent};
pub use types::{
    BatchOutcome, Classification, ExtractionOptions, RawDraft, SaveFailure, SaveOutcome,
};
