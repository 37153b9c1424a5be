//! Request and response types for extraction

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use sift_domain::{Category, ItemId, MAX_TAGS};

/// Per-call options for an extraction
#[derive(Debug, Clone, Default)]
pub struct ExtractionOptions {
    /// Credential to use instead of the provider's configured one
    pub credential_override: Option<String>,

    /// Skip documents whose extracted flag is already set
    pub skip_extracted: bool,
}

impl ExtractionOptions {
    /// Options carrying a caller-supplied credential
    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            credential_override: Some(credential.into()),
            ..Default::default()
        }
    }
}

/// Result of a batch extraction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Documents requested
    pub total_items: usize,

    /// Documents processed, including the ones that failed or were skipped
    pub processed_items: usize,

    /// Items successfully saved
    pub extracted_count: usize,

    /// Ids of the saved items in save order
    pub knowledge_item_ids: Vec<ItemId>,
}

/// Result of persisting a set of drafts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveOutcome {
    /// Ids of the items that were persisted
    pub saved: Vec<ItemId>,

    /// Drafts that could not be persisted
    pub failures: Vec<SaveFailure>,
}

/// A draft that was not persisted
#[derive(Debug, Clone, PartialEq)]
pub struct SaveFailure {
    /// Title of the draft (possibly blank)
    pub title: String,

    /// Why it failed
    pub reason: String,
}

/// Category assignment for a set of tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Top-level category
    pub category: Category,

    /// Best matching subcategory, if any
    pub subcategory_id: Option<String>,
}

/// One item as the model reported it, before validation
///
/// Field names are accepted in camelCase and snake_case and value types are
/// deliberately loose; [`RawDraft::confidence`], [`RawDraft::tags`] and
/// [`RawDraft::key_conclusions`] normalize them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDraft {
    /// Item title
    #[serde(default, deserialize_with = "loose_string")]
    pub title: Option<String>,

    /// Item body
    #[serde(default, deserialize_with = "loose_string")]
    pub content: Option<String>,

    /// Optional summary
    #[serde(default, deserialize_with = "loose_string")]
    pub summary: Option<String>,

    #[serde(default, alias = "key_conclusions")]
    key_conclusions: Option<Value>,

    #[serde(default)]
    confidence: Option<Value>,

    #[serde(default)]
    tags: Option<Value>,

    #[serde(default, alias = "source_page")]
    source_page: Option<Value>,

    /// Supporting excerpt
    #[serde(default, alias = "source_excerpt", deserialize_with = "loose_string")]
    pub source_excerpt: Option<String>,
}

impl RawDraft {
    /// Reason the draft cannot become an item, if any
    pub fn rejection(&self) -> Option<&'static str> {
        if is_blank(&self.title) {
            return Some("missing title");
        }
        if is_blank(&self.content) {
            return Some("missing content");
        }
        None
    }

    /// Confidence clamped into `[0, 100]`, or `None` when absent or unreadable
    pub fn confidence(&self) -> Option<u8> {
        let value = match self.confidence.as_ref()? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if !value.is_finite() {
            return None;
        }
        Some(value.round().clamp(0.0, 100.0) as u8)
    }

    /// Non-blank tags, at most [`MAX_TAGS`]
    pub fn tags(&self) -> Vec<String> {
        let tags: Vec<String> = match self.tags.as_ref() {
            Some(Value::Array(values)) => values.iter().filter_map(scalar_text).collect(),
            Some(Value::String(s)) => s.split(',').map(|t| t.trim().to_string()).collect(),
            _ => Vec::new(),
        };
        tags.into_iter()
            .filter(|t| !t.is_empty())
            .take(MAX_TAGS)
            .collect()
    }

    /// Key conclusions as a list
    pub fn key_conclusions(&self) -> Vec<String> {
        match self.key_conclusions.as_ref() {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(scalar_text)
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            _ => Vec::new(),
        }
    }

    /// Page number, when the model gave a usable one
    pub fn source_page(&self) -> Option<u32> {
        match self.source_page.as_ref()? {
            Value::Number(n) => n.as_u64().and_then(|p| u32::try_from(p).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accept strings, numbers and nulls where a string is expected
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_text))
}
