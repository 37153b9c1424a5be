//! Core Extractor implementation

use crate::chunking::TextChunker;
use crate::classifier::classify;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::parse;
use crate::preprocess;
use crate::prompt::PromptBuilder;
use crate::types::{BatchOutcome, ExtractionOptions, RawDraft, SaveFailure, SaveOutcome};
use async_trait::async_trait;
use futures::future::join_all;
use sift_domain::traits::KnowledgeStore;
use sift_domain::{
    ItemDraft, ItemId, NewItem, ProgressTracker, Stage, Subcategory, TaskUpdate,
    DEFAULT_CONFIDENCE,
};
use sift_llm::{GenerationOptions, Message, TextGenerator};
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Receives progress updates while a batch runs
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Deliver one partial update
    async fn report(&self, update: TaskUpdate);
}

/// A sink that discards every update
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

#[async_trait]
impl ProgressSink for NoopProgress {
    async fn report(&self, _update: TaskUpdate) {}
}

/// Translates stage positions of the current document into batch progress
struct StageReporter<'a> {
    sink: &'a dyn ProgressSink,
    tracker: &'a ProgressTracker,
}

impl StageReporter<'_> {
    async fn report(&self, stage: Stage, fraction: f64) {
        let progress = self.tracker.progress(stage, fraction);
        self.sink.report(TaskUpdate::stage(stage, progress)).await;
    }
}

/// The Extractor turns documents into classified knowledge items
pub struct Extractor<G, S>
where
    G: TextGenerator,
    S: KnowledgeStore,
{
    generator: Arc<G>,
    store: Arc<S>,
    config: ExtractorConfig,
}

impl<G, S> Extractor<G, S>
where
    G: TextGenerator + 'static,
    S: KnowledgeStore + 'static,
{
    /// Create a new Extractor
    pub fn new(generator: Arc<G>, store: Arc<S>, config: ExtractorConfig) -> Self {
        Self {
            generator,
            store,
            config,
        }
    }

    /// The store items are saved to
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract classified drafts from raw document text
    ///
    /// Empty content yields no drafts. Oversized content is chunked and the
    /// chunks are sent one at a time; a failing chunk is skipped unless the
    /// failure is a credential problem, which aborts the document.
    pub async fn extract_from_content(
        &self,
        content: &str,
        source_document_id: &str,
        source_page: Option<u32>,
        credential: Option<&str>,
    ) -> Result<Vec<ItemDraft>, ExtractorError> {
        let subcategories = self.load_subcategories().await?;
        let tracker = ProgressTracker::new(1);
        let reporter = StageReporter {
            sink: &NoopProgress,
            tracker: &tracker,
        };
        self.extract_document(
            content,
            source_document_id,
            source_page,
            credential,
            &subcategories,
            &reporter,
        )
        .await
    }

    /// Extract and save items from stored documents
    ///
    /// See [`Extractor::extract_from_documents_with_progress`].
    pub async fn extract_from_documents(
        &self,
        document_ids: &[String],
        target_collection_id: &str,
        options: &ExtractionOptions,
    ) -> Result<BatchOutcome, ExtractorError> {
        self.extract_from_documents_with_progress(
            document_ids,
            target_collection_id,
            options,
            &NoopProgress,
        )
        .await
    }

    /// Extract and save items from stored documents, reporting progress
    ///
    /// Documents run one after another. A document that fails is logged,
    /// counted as processed and skipped. After each document the accumulated
    /// item ids are reported as a full list.
    ///
    /// # Errors
    ///
    /// Only setup problems fail the batch: an empty id list, or subcategory
    /// configuration that cannot be read.
    pub async fn extract_from_documents_with_progress(
        &self,
        document_ids: &[String],
        target_collection_id: &str,
        options: &ExtractionOptions,
        sink: &dyn ProgressSink,
    ) -> Result<BatchOutcome, ExtractorError> {
        if document_ids.is_empty() {
            return Err(ExtractorError::InvalidRequest(
                "no documents to extract".to_string(),
            ));
        }
        let subcategories = self.load_subcategories().await?;

        let total = document_ids.len();
        let mut tracker = ProgressTracker::new(total);
        let mut outcome = BatchOutcome {
            total_items: total,
            ..Default::default()
        };

        info!(
            "Starting batch extraction of {} documents into collection '{}'",
            total, target_collection_id
        );

        for document_id in document_ids {
            sink.report(TaskUpdate {
                stage: Some(Stage::Parsing),
                progress: Some(tracker.document_boundary()),
                current_document: Some(document_id.clone()),
                ..Default::default()
            })
            .await;

            let reporter = StageReporter {
                sink,
                tracker: &tracker,
            };
            match self
                .process_document(
                    document_id,
                    target_collection_id,
                    options,
                    &subcategories,
                    &reporter,
                )
                .await
            {
                Ok(saved) => {
                    outcome.extracted_count += saved.len();
                    outcome.knowledge_item_ids.extend(saved);
                }
                Err(e) => warn!("Skipping document '{}': {}", document_id, e),
            }

            tracker.complete_document();
            outcome.processed_items += 1;

            sink.report(TaskUpdate {
                processed_items: Some(outcome.processed_items),
                extracted_count: Some(outcome.extracted_count),
                knowledge_item_ids: Some(outcome.knowledge_item_ids.clone()),
                progress: Some(tracker.document_boundary()),
                ..Default::default()
            })
            .await;
        }

        info!(
            "Batch extraction complete: {} documents, {} items",
            outcome.processed_items, outcome.extracted_count
        );
        Ok(outcome)
    }

    /// Persist drafts into a collection
    ///
    /// Drafts are saved concurrently in sub-batches of
    /// `save_batch_size`. Each draft succeeds or fails on its own.
    pub async fn save_drafts(&self, drafts: Vec<ItemDraft>, collection_id: &str) -> SaveOutcome {
        self.save_in_batches(drafts, collection_id, None).await
    }

    async fn process_document(
        &self,
        document_id: &str,
        collection_id: &str,
        options: &ExtractionOptions,
        subcategories: &[Subcategory],
        reporter: &StageReporter<'_>,
    ) -> Result<Vec<ItemId>, ExtractorError> {
        if options.skip_extracted && self.store.is_extracted(document_id).await.map_err(store_error)? {
            info!("Document '{}' already extracted, skipping", document_id);
            return Ok(Vec::new());
        }

        let content = self
            .store
            .document_content(document_id)
            .await
            .map_err(store_error)?;

        let drafts = self
            .extract_document(
                &content,
                document_id,
                None,
                options.credential_override.as_deref(),
                subcategories,
                reporter,
            )
            .await?;

        reporter.report(Stage::Saving, 0.0).await;
        let saved = self
            .save_in_batches(drafts, collection_id, Some(reporter))
            .await;
        for failure in &saved.failures {
            warn!("Item '{}' not saved: {}", failure.title, failure.reason);
        }

        if let Err(e) = self.store.mark_extracted(document_id, true).await {
            warn!("Could not flag document '{}' as extracted: {}", document_id, e);
        }

        info!(
            "Document '{}': {} items saved, {} failed",
            document_id,
            saved.saved.len(),
            saved.failures.len()
        );
        Ok(saved.saved)
    }

    async fn extract_document(
        &self,
        content: &str,
        source_document_id: &str,
        source_page: Option<u32>,
        credential: Option<&str>,
        subcategories: &[Subcategory],
        reporter: &StageReporter<'_>,
    ) -> Result<Vec<ItemDraft>, ExtractorError> {
        reporter.report(Stage::Parsing, 0.0).await;

        let cleaned = preprocess::clean(content);
        if cleaned.text.trim().is_empty() {
            debug!("Document '{}' is empty after cleaning", source_document_id);
            return Ok(Vec::new());
        }

        let chunks = TextChunker::new(self.config.chunk_size, self.config.chunk_overlap)
            .with_search_window(self.config.boundary_search_window)
            .split(&cleaned.text);
        reporter.report(Stage::Parsing, 1.0).await;

        info!(
            "Extracting '{}': {} chars in {} chunk(s)",
            source_document_id,
            cleaned.text.len(),
            chunks.len()
        );
        reporter.report(Stage::Extracting, 0.0).await;

        let raw = if chunks.len() == 1 {
            self.extract_chunk(&chunks[0].text, source_document_id, 0, 1, Vec::new(), credential)
                .await?
        } else {
            let total = chunks.len();
            let mut raw = Vec::new();
            for (index, chunk) in chunks.iter().enumerate() {
                if index > 0 {
                    sleep(self.config.chunk_delay()).await;
                }

                let known: Vec<String> = raw
                    .iter()
                    .filter_map(|d: &RawDraft| d.title.clone())
                    .collect();
                match self
                    .extract_chunk(&chunk.text, source_document_id, index, total, known, credential)
                    .await
                {
                    Ok(drafts) => raw.extend(drafts),
                    Err(e) if e.aborts_document() => return Err(e),
                    Err(e) => {
                        let e = ExtractorError::ChunkProcessing {
                            index,
                            reason: e.to_string(),
                        };
                        warn!("Document '{}': {}", source_document_id, e);
                    }
                }
                reporter
                    .report(Stage::Extracting, (index + 1) as f64 / total as f64)
                    .await;
            }
            raw
        };

        reporter.report(Stage::Summarizing, 0.0).await;
        let drafts: Vec<ItemDraft> = raw
            .into_iter()
            .map(|r| finish_draft(r, source_document_id, source_page, subcategories))
            .collect();
        reporter.report(Stage::Summarizing, 1.0).await;

        Ok(drafts)
    }

    async fn extract_chunk(
        &self,
        text: &str,
        source_document_id: &str,
        index: usize,
        total: usize,
        known_titles: Vec<String>,
        credential: Option<&str>,
    ) -> Result<Vec<RawDraft>, ExtractorError> {
        let messages = PromptBuilder::new(text, source_document_id)
            .with_chunk(index, total)
            .with_known_titles(known_titles)
            .build();
        debug!(
            "Chunk {}/{} prompt: {} chars",
            index + 1,
            total,
            messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let response = self.generate(&messages, credential).await?;
        debug!("Chunk {}/{} response: {} chars", index + 1, total, response.len());

        let drafts = parse(&response)?;
        debug!("Chunk {}/{} parsed {} items", index + 1, total, drafts.len());
        Ok(drafts)
    }

    async fn generate(
        &self,
        messages: &[Message],
        credential: Option<&str>,
    ) -> Result<String, ExtractorError> {
        let options = GenerationOptions {
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            timeout_ms: self.config.generation_timeout().as_millis() as u64,
            credential_override: credential.map(str::to_string),
        };

        // The provider bounds each attempt; this bounds the call with its retries
        timeout(
            self.config.call_budget(),
            self.generator.generate(messages, &options),
        )
        .await
        .map_err(|_| ExtractorError::Timeout)?
        .map_err(ExtractorError::from)
    }

    async fn save_in_batches(
        &self,
        drafts: Vec<ItemDraft>,
        collection_id: &str,
        reporter: Option<&StageReporter<'_>>,
    ) -> SaveOutcome {
        let mut outcome = SaveOutcome::default();
        let total = drafts.len();
        let batch_size = self.config.save_batch_size.max(1);
        let mut done = 0;

        let mut remaining = drafts.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<ItemDraft> = remaining.by_ref().take(batch_size).collect();
            done += batch.len();

            let results = join_all(batch.into_iter().map(|draft| self.save_one(draft, collection_id))).await;
            for result in results {
                match result {
                    Ok(id) => outcome.saved.push(id),
                    Err(failure) => outcome.failures.push(failure),
                }
            }

            if let Some(reporter) = reporter {
                reporter.report(Stage::Saving, done as f64 / total as f64).await;
            }
        }

        outcome
    }

    async fn save_one(&self, draft: ItemDraft, collection_id: &str) -> Result<ItemId, SaveFailure> {
        if let Err(reason) = draft.validate() {
            return Err(SaveFailure {
                title: draft.title,
                reason: ExtractorError::Validation(reason).to_string(),
            });
        }

        let title = draft.title.clone();
        self.store
            .create_item(NewItem::extracted(draft, collection_id))
            .await
            .map_err(|e| SaveFailure {
                title,
                reason: store_error(e).to_string(),
            })
    }

    async fn load_subcategories(&self) -> Result<Vec<Subcategory>, ExtractorError> {
        self.store
            .subcategories()
            .await
            .map_err(|e| ExtractorError::Config(format!("subcategories unavailable: {}", e)))
    }
}

fn store_error<E: std::fmt::Display>(e: E) -> ExtractorError {
    ExtractorError::Store(e.to_string())
}

/// Turn a parsed draft into a classified item draft
fn finish_draft(
    raw: RawDraft,
    source_document_id: &str,
    source_page: Option<u32>,
    subcategories: &[Subcategory],
) -> ItemDraft {
    let tags = raw.tags();
    let classification = classify(&tags, subcategories);

    ItemDraft {
        title: raw.title.as_deref().unwrap_or_default().trim().to_string(),
        content: raw.content.as_deref().unwrap_or_default().trim().to_string(),
        summary: raw.summary.clone().filter(|s| !s.trim().is_empty()),
        key_conclusions: raw.key_conclusions(),
        confidence: raw.confidence().unwrap_or(DEFAULT_CONFIDENCE),
        tags,
        source_document_id: source_document_id.to_string(),
        source_page: source_page.or_else(|| raw.source_page()),
        source_excerpt: raw.source_excerpt.clone().filter(|s| !s.trim().is_empty()),
        category: classification.category,
        subcategory_id: classification.subcategory_id,
    }
}
