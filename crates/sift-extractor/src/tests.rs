//! Integration tests for the Extractor

#[cfg(test)]
mod tests {
    use crate::{
        clean, BatchOutcome, ExtractionOptions, Extractor, ExtractorConfig, ExtractorError,
        ProgressSink, TextChunker,
    };
    use async_trait::async_trait;
    use sift_domain::traits::KnowledgeStore;
    use sift_domain::{Category, ItemDraft, ItemStatus, Subcategory, TaskUpdate};
    use sift_llm::{GenerationOptions, LlmError, Message, MockGenerator, TextGenerator};
    use sift_store::MemoryStore;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    const TWO_ITEMS: &str = r#"[
        {
            "title": "Ownership",
            "content": "Every Rust value has exactly one owner.",
            "confidence": 92,
            "tags": ["rust", "memory"],
            "keyConclusions": ["Values are dropped when the owner goes out of scope"]
        },
        {
            "title": "Borrowing",
            "content": "References borrow values without taking ownership.",
            "tags": ["rust"]
        }
    ]"#;

    fn setup(generator: &MockGenerator) -> (Extractor<MockGenerator, MemoryStore>, Arc<MemoryStore>) {
        setup_with(generator, ExtractorConfig::default())
    }

    fn setup_with(
        generator: &MockGenerator,
        config: ExtractorConfig,
    ) -> (Extractor<MockGenerator, MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let extractor = Extractor::new(Arc::new(generator.clone()), store.clone(), config);
        (extractor, store)
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn long_document() -> String {
        (0..12)
            .map(|i| format!("Paragraph {} explains ownership and borrowing in Rust programs.\n\n", i))
            .collect()
    }

    fn small_chunks() -> ExtractorConfig {
        ExtractorConfig {
            chunk_size: 200,
            chunk_overlap: 20,
            boundary_search_window: 100,
            ..Default::default()
        }
    }

    fn draft(title: &str, content: &str) -> ItemDraft {
        ItemDraft {
            title: title.to_string(),
            content: content.to_string(),
            summary: None,
            key_conclusions: Vec::new(),
            confidence: 70,
            tags: Vec::new(),
            source_document_id: "doc".to_string(),
            source_page: None,
            source_excerpt: None,
            category: Category::General,
            subcategory_id: None,
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<TaskUpdate>>,
    }

    #[async_trait]
    impl ProgressSink for RecordingSink {
        async fn report(&self, update: TaskUpdate) {
            self.updates.lock().unwrap().push(update);
        }
    }

    /// Answers every call with no items after `latency`, recording call times
    struct PacedGenerator {
        latency: Duration,
        calls: Mutex<Vec<Instant>>,
    }

    impl PacedGenerator {
        fn new(latency: Duration) -> Self {
            Self {
                latency,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for PacedGenerator {
        async fn generate(
            &self,
            _messages: &[Message],
            _options: &GenerationOptions,
        ) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(Instant::now());
            tokio::time::sleep(self.latency).await;
            Ok("[]".to_string())
        }
    }

    #[tokio::test]
    async fn test_full_extraction_flow() {
        let generator = MockGenerator::new(TWO_ITEMS);
        let (extractor, store) = setup(&generator);
        store.add_document("doc-1", "Rust values have exactly one owner at a time.");

        let outcome = extractor
            .extract_from_documents(&ids(&["doc-1"]), "kb-1", &ExtractionOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.total_items, 1);
        assert_eq!(outcome.processed_items, 1);
        assert_eq!(outcome.extracted_count, 2);
        assert_eq!(outcome.knowledge_item_ids.len(), 2);

        let items = store.list_items("kb-1").await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.status == ItemStatus::Pending));
        assert!(items.iter().all(|i| i.draft.source_document_id == "doc-1"));
        assert!(store.is_extracted("doc-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_failing_document_is_skipped() {
        let generator = MockGenerator::new(TWO_ITEMS);
        let (extractor, store) = setup(&generator);
        store.add_document("d1", "first document");
        store.add_document("d2", "second document");
        store.fail_document("d1");

        let outcome = extractor
            .extract_from_documents(&ids(&["d1", "d2"]), "kb", &ExtractionOptions::default())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            BatchOutcome {
                total_items: 2,
                processed_items: 2,
                extracted_count: 2,
                knowledge_item_ids: outcome.knowledge_item_ids.clone(),
            }
        );
        assert_eq!(outcome.knowledge_item_ids.len(), 2);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_document_list_is_rejected() {
        let generator = MockGenerator::new(TWO_ITEMS);
        let (extractor, _store) = setup(&generator);

        let result = extractor
            .extract_from_documents(&[], "kb", &ExtractionOptions::default())
            .await;
        assert!(matches!(result, Err(ExtractorError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_unreadable_subcategories_fail_the_batch() {
        let generator = MockGenerator::new(TWO_ITEMS);
        let (extractor, store) = setup(&generator);
        store.add_document("d1", "text");
        store.fail_subcategories();

        let result = extractor
            .extract_from_documents(&ids(&["d1"]), "kb", &ExtractionOptions::default())
            .await;
        assert!(matches!(result, Err(ExtractorError::Config(_))));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_skip_extracted_documents() {
        let generator = MockGenerator::new(TWO_ITEMS);
        let (extractor, store) = setup(&generator);
        store.add_document("d1", "text");
        store.mark_extracted("d1", true).await.unwrap();

        let options = ExtractionOptions {
            skip_extracted: true,
            ..Default::default()
        };
        let outcome = extractor
            .extract_from_documents(&ids(&["d1"]), "kb", &options)
            .await
            .unwrap();

        assert_eq!(outcome.processed_items, 1);
        assert_eq!(outcome.extracted_count, 0);
        assert_eq!(generator.call_count(), 0);

        // Without the option the document is extracted again
        let outcome = extractor
            .extract_from_documents(&ids(&["d1"]), "kb", &ExtractionOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.extracted_count, 2);
    }

    #[tokio::test]
    async fn test_empty_content_makes_no_calls() {
        let generator = MockGenerator::new(TWO_ITEMS);
        let (extractor, _store) = setup(&generator);

        let drafts = extractor.extract_from_content("   \n\n ", "doc", None, None).await.unwrap();
        assert!(drafts.is_empty());
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_credential_keyword_in_response() {
        let generator = MockGenerator::new("Error: invalid API key. Please check your settings.");
        let (extractor, _store) = setup(&generator);

        let result = extractor.extract_from_content("Some text", "doc", None, None).await;
        assert!(matches!(result, Err(ExtractorError::Credential(_))));
    }

    #[tokio::test]
    async fn test_drafts_are_normalized_and_classified() {
        let generator = MockGenerator::new(TWO_ITEMS);
        let (extractor, store) = setup(&generator);
        store.set_subcategories(vec![
            Subcategory::new("lang", Category::Technology, "Languages", &["rust"]),
            Subcategory::new("misc", Category::General, "Misc", &["notes"]),
        ]);

        let drafts = extractor
            .extract_from_content("Ownership text", "doc-9", Some(4), None)
            .await
            .unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].confidence, 92);
        assert_eq!(drafts[1].confidence, 70);
        assert_eq!(drafts[0].key_conclusions.len(), 1);
        assert_eq!(drafts[0].source_document_id, "doc-9");
        assert_eq!(drafts[0].source_page, Some(4));
        assert!(drafts.iter().all(|d| d.category == Category::Technology));
        assert!(drafts.iter().all(|d| d.subcategory_id.as_deref() == Some("lang")));
    }

    #[tokio::test]
    async fn test_credential_override_reaches_generator() {
        let generator = MockGenerator::new(TWO_ITEMS);
        let (extractor, _store) = setup(&generator);

        extractor
            .extract_from_content("Some text", "doc", None, Some("user-key"))
            .await
            .unwrap();

        let options = generator.recorded_options();
        assert_eq!(options[0].credential_override.as_deref(), Some("user-key"));
        assert_eq!(options[0].max_tokens, ExtractorConfig::default().max_tokens);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_chunk_skips_failed_chunk() {
        let generator = MockGenerator::new(TWO_ITEMS);
        let (extractor, _store) = setup_with(&generator, small_chunks());

        let content = long_document();
        let chunk_count = TextChunker::new(200, 20)
            .with_search_window(100)
            .split(&clean(&content).text)
            .len();
        assert!(chunk_count > 2);

        generator.push_response(TWO_ITEMS);
        generator.push_error(LlmError::RateLimited("slow down".into()));

        let drafts = extractor.extract_from_content(&content, "doc", None, None).await.unwrap();
        assert_eq!(generator.call_count(), chunk_count);
        assert_eq!(drafts.len(), (chunk_count - 1) * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_chunk_credential_error_aborts_document() {
        let generator = MockGenerator::new(TWO_ITEMS);
        let (extractor, _store) = setup_with(&generator, small_chunks());

        generator.push_response(TWO_ITEMS);
        generator.push_error(LlmError::Credential("revoked".into()));

        let result = extractor
            .extract_from_content(&long_document(), "doc", None, None)
            .await;
        assert!(matches!(result, Err(ExtractorError::Credential(_))));
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_chunks_see_earlier_titles() {
        let generator = MockGenerator::new("[]");
        let (extractor, _store) = setup_with(&generator, small_chunks());
        generator.push_response(TWO_ITEMS);

        extractor
            .extract_from_content(&long_document(), "doc", None, None)
            .await
            .unwrap();

        let prompts = generator.prompts();
        assert!(!prompts[0].contains("- Ownership"));
        assert!(prompts[1].contains("- Ownership"));
        assert!(prompts[1].contains("part 2 of"));
    }

    #[tokio::test]
    async fn test_save_drafts_isolates_failures() {
        let generator = MockGenerator::new("[]");
        let (extractor, store) = setup(&generator);

        let drafts = vec![
            draft("One", "a"),
            draft("Two", "b"),
            draft("Three", ""),
            draft("Four", "d"),
            draft("Five", "e"),
        ];
        let outcome = extractor.save_drafts(drafts, "kb").await;

        assert_eq!(outcome.saved.len(), 4);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].title, "Three");
        assert_eq!(store.list_items("kb").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_save_drafts_persistence_failure() {
        let generator = MockGenerator::new("[]");
        let config = ExtractorConfig {
            save_batch_size: 2,
            ..Default::default()
        };
        let (extractor, store) = setup_with(&generator, config);
        store.fail_items_titled("Broken");

        let drafts = (0..7)
            .map(|i| {
                let title = if i == 3 { "Broken item".to_string() } else { format!("Item {}", i) };
                draft(&title, "body")
            })
            .collect();
        let outcome = extractor.save_drafts(drafts, "kb").await;

        assert_eq!(outcome.saved.len(), 6);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].reason.contains("Store error"));
    }

    #[tokio::test]
    async fn test_progress_reports() {
        let generator = MockGenerator::new(TWO_ITEMS);
        let (extractor, store) = setup(&generator);
        store.add_document("d1", "first");
        store.add_document("d2", "second");
        let sink = RecordingSink::default();

        extractor
            .extract_from_documents_with_progress(
                &ids(&["d1", "d2"]),
                "kb",
                &ExtractionOptions::default(),
                &sink,
            )
            .await
            .unwrap();

        let updates = sink.updates.lock().unwrap().clone();
        let progress: Vec<u8> = updates.iter().filter_map(|u| u.progress).collect();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{:?}", progress);
        assert!(progress.iter().all(|p| *p >= 5));
        assert_eq!(progress.last(), Some(&100));

        let id_lists: Vec<usize> = updates
            .iter()
            .filter_map(|u| u.knowledge_item_ids.as_ref().map(Vec::len))
            .collect();
        assert_eq!(id_lists, vec![2, 4]);

        assert!(updates
            .iter()
            .any(|u| u.current_document.as_deref() == Some("d2")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunk_calls_are_spaced_by_delay() {
        let generator = Arc::new(PacedGenerator::new(Duration::ZERO));
        let store = Arc::new(MemoryStore::new());
        let config = small_chunks();
        let delay = config.chunk_delay();
        let extractor = Extractor::new(generator.clone(), store, config);

        let started = Instant::now();
        extractor
            .extract_from_content(&long_document(), "doc", None, None)
            .await
            .unwrap();

        let calls = generator.calls.lock().unwrap().clone();
        assert!(calls.len() >= 3);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= delay);
        }
        assert!(started.elapsed() >= delay * (calls.len() as u32 - 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_budget_covers_slow_attempts() {
        let config = ExtractorConfig {
            generation_timeout_secs: 1,
            call_budget_secs: 5,
            ..Default::default()
        };

        // Slower than one attempt's timeout, but inside the call budget
        let generator = Arc::new(PacedGenerator::new(Duration::from_secs(3)));
        let extractor = Extractor::new(generator, Arc::new(MemoryStore::new()), config.clone());
        let drafts = extractor
            .extract_from_content("Some text", "doc", None, None)
            .await
            .unwrap();
        assert!(drafts.is_empty());

        let generator = Arc::new(PacedGenerator::new(Duration::from_secs(6)));
        let extractor = Extractor::new(generator, Arc::new(MemoryStore::new()), config);
        let result = extractor.extract_from_content("Some text", "doc", None, None).await;
        assert!(matches!(result, Err(ExtractorError::Timeout)));
    }
}
