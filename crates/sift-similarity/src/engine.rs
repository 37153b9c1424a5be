//! Pairwise similarity scoring
//!
//! The score blends three signals: tag overlap (weight 0.2), category match
//! (0.1) and a model rating of the two texts (0.7). When the cheap signals
//! alone are strong enough, the rating is extrapolated from them instead of
//! asking the model.

use crate::config::SimilarityConfig;
use regex::Regex;
use sift_domain::KnowledgeItem;
use sift_llm::{GenerationOptions, LlmError, Message, TextGenerator};
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Weight of the semantic rating in the final score
pub const SEMANTIC_WEIGHT: f64 = 0.7;

/// Weight of tag overlap in the final score
pub const TAG_WEIGHT: f64 = 0.2;

/// Weight of category agreement in the final score
pub const CATEGORY_WEIGHT: f64 = 0.1;

/// Rating used when the model fails or gives no number
pub const NEUTRAL_SEMANTIC_SCORE: f64 = 50.0;

static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid regex"));

const RATING_INSTRUCTIONS: &str = "You compare two knowledge items and rate how similar \
their meaning is on a scale from 0 (unrelated) to 100 (the same idea). \
Reply with the number only.";

/// Scores pairs of knowledge items
pub struct SimilarityEngine<G: TextGenerator> {
    generator: Arc<G>,
    config: SimilarityConfig,
}

impl<G: TextGenerator> SimilarityEngine<G> {
    /// Create a new engine
    pub fn new(generator: Arc<G>, config: SimilarityConfig) -> Self {
        Self { generator, config }
    }

    /// Active configuration
    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Similarity of two items in `[0, 100]`
    ///
    /// Never fails: a credential problem falls back to word-token overlap
    /// and any other generation problem to a neutral rating of 50.
    pub async fn similarity(
        &self,
        a: &KnowledgeItem,
        b: &KnowledgeItem,
        credential: Option<&str>,
    ) -> u8 {
        let tag = tag_score(a.tags(), b.tags());
        let category = category_score(a, b);

        let fast = fast_path_score(tag, category);
        let semantic = if fast >= self.config.fast_path_threshold {
            debug!("Fast path for {} / {} ({:.1})", a.id, b.id, fast);
            (fast * 1.2).min(100.0)
        } else {
            self.semantic_score(a, b, credential).await
        };

        combine(semantic, tag, category)
    }

    async fn semantic_score(
        &self,
        a: &KnowledgeItem,
        b: &KnowledgeItem,
        credential: Option<&str>,
    ) -> f64 {
        let messages = [
            Message::system(RATING_INSTRUCTIONS),
            Message::user(format!(
                "Item A:\n{}\n\nItem B:\n{}",
                self.item_text(a),
                self.item_text(b)
            )),
        ];
        let options = GenerationOptions {
            max_tokens: self.config.max_tokens,
            temperature: 0.0,
            timeout_ms: self.config.timeout().as_millis() as u64,
            credential_override: credential.map(str::to_string),
        };

        let reply = match timeout(self.config.timeout(), self.generator.generate(&messages, &options)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(options.timeout_ms)),
        };

        match reply {
            Ok(text) => parse_rating(&text).unwrap_or_else(|| {
                warn!("Unreadable similarity rating: {:?}", text);
                NEUTRAL_SEMANTIC_SCORE
            }),
            Err(e) if e.is_credential() => {
                warn!("Similarity rating unavailable ({}), using token overlap", e);
                token_overlap(&full_text(a), &full_text(b))
            }
            Err(e) => {
                warn!("Similarity rating failed: {}", e);
                NEUTRAL_SEMANTIC_SCORE
            }
        }
    }

    fn item_text(&self, item: &KnowledgeItem) -> String {
        full_text(item).chars().take(self.config.max_text_chars).collect()
    }
}

fn full_text(item: &KnowledgeItem) -> String {
    format!("{}\n{}", item.draft.title, item.draft.content)
}

/// Shared tags over the larger tag set, as a percentage
///
/// Comparison ignores case; two untagged items score 0.
pub fn tag_score(a: &[String], b: &[String]) -> f64 {
    let a: HashSet<String> = a.iter().map(|t| t.trim().to_lowercase()).collect();
    let b: HashSet<String> = b.iter().map(|t| t.trim().to_lowercase()).collect();
    let larger = a.len().max(b.len());
    if larger == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / larger as f64 * 100.0
}

/// 100 when both items share a category, else 0
pub fn category_score(a: &KnowledgeItem, b: &KnowledgeItem) -> f64 {
    if a.category() == b.category() {
        100.0
    } else {
        0.0
    }
}

/// Weighted mean of the cheap signals on a 0-100 scale
pub fn fast_path_score(tag: f64, category: f64) -> f64 {
    (tag * TAG_WEIGHT + category * CATEGORY_WEIGHT) / (TAG_WEIGHT + CATEGORY_WEIGHT)
}

/// Blend the three signals into the final score
pub fn combine(semantic: f64, tag: f64, category: f64) -> u8 {
    let score = semantic * SEMANTIC_WEIGHT + tag * TAG_WEIGHT + category * CATEGORY_WEIGHT;
    score.round().clamp(0.0, 100.0) as u8
}

/// First integer in a model reply, clamped to `[0, 100]`
pub fn parse_rating(reply: &str) -> Option<f64> {
    let digits = INTEGER_RE.find(reply)?.as_str();
    // Overlong digit runs are above 100 anyway
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    Some(value.min(100) as f64)
}

/// Jaccard overlap of lower-cased word tokens, as a percentage
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens = |text: &str| -> HashSet<String> {
        TOKEN_RE
            .find_iter(&text.to_lowercase())
            .map(|m| m.as_str().to_string())
            .collect()
    };
    let a = tokens(a);
    let b = tokens(b);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_tag_score() {
        let score = tag_score(&tags(&["a", "b"]), &tags(&["B", "c", "d"]));
        assert!((score - 33.33).abs() < 0.01);
        assert_eq!(tag_score(&[], &[]), 0.0);
        assert_eq!(tag_score(&tags(&["x"]), &[]), 0.0);
        assert_eq!(tag_score(&tags(&["x"]), &tags(&["X"])), 100.0);
    }

    #[test]
    fn test_fast_path_score() {
        assert!((fast_path_score(100.0, 100.0) - 100.0).abs() < 1e-9);
        assert_eq!(fast_path_score(0.0, 0.0), 0.0);
        assert!((fast_path_score(50.0, 100.0) - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine(100.0, 100.0, 100.0), 100);
        assert_eq!(combine(50.0, 0.0, 0.0), 35);
        assert_eq!(combine(80.0, 50.0, 100.0), 76);
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("85"), Some(85.0));
        assert_eq!(parse_rating("Similarity: 42/100"), Some(42.0));
        assert_eq!(parse_rating("250"), Some(100.0));
        assert_eq!(parse_rating("99999999999999999999999"), Some(100.0));
        assert_eq!(parse_rating("very similar"), None);
    }

    #[test]
    fn test_token_overlap() {
        assert_eq!(token_overlap("Rust ownership", "rust OWNERSHIP"), 100.0);
        assert!((token_overlap("a b", "b c") - 33.33).abs() < 0.01);
        assert_eq!(token_overlap("", "  "), 0.0);
    }
}
