//! Knowledge items - the unit of extracted knowledge

use crate::category::Category;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum number of tags kept on an item
pub const MAX_TAGS: usize = 5;

/// Confidence assigned when the model does not provide one
pub const DEFAULT_CONFIDENCE: u8 = 70;

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Unique identifier for a knowledge item based on UUIDv7
///
/// UUIDv7 keeps identifiers chronologically sortable, so items created by one
/// extraction run list in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ItemId(u128);

impl ItemId {
    /// Generate a new UUIDv7-based ItemId
    ///
    /// # Examples
    ///
    /// ```
    /// use sift_domain::ItemId;
    ///
    /// let id = ItemId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an ItemId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse an ItemId from its UUID string form
    ///
    /// # Examples
    ///
    /// ```
    /// use sift_domain::ItemId;
    ///
    /// let id = ItemId::new();
    /// let parsed = ItemId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid item id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for ItemId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_string(&value)
    }
}

/// Review status of a persisted item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Extracted by the model, awaiting review
    Pending,
    /// Accepted by a reviewer, or created manually
    Confirmed,
    /// Rejected by a reviewer
    Rejected,
}

impl ItemStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Confirmed => "confirmed",
            ItemStatus::Rejected => "rejected",
        }
    }

    /// Parse a status name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ItemStatus::Pending),
            "confirmed" => Some(ItemStatus::Confirmed),
            "rejected" => Some(ItemStatus::Rejected),
            _ => None,
        }
    }
}

/// A validated, not yet persisted knowledge item
///
/// Produced from one chunk's model output and enriched with a category by the
/// classifier before it is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    /// Short title (never blank)
    pub title: String,

    /// Body text (never blank)
    pub content: String,

    /// Optional one-paragraph summary
    pub summary: Option<String>,

    /// Ordered key conclusions
    pub key_conclusions: Vec<String>,

    /// Confidence in `[0, 100]`
    pub confidence: u8,

    /// At most [`MAX_TAGS`] tags
    pub tags: Vec<String>,

    /// Document the item was extracted from
    pub source_document_id: String,

    /// Page within the source document, when known
    pub source_page: Option<u32>,

    /// Verbatim excerpt supporting the item
    pub source_excerpt: Option<String>,

    /// Top-level category assigned by the classifier
    pub category: Category,

    /// Subcategory assigned by the classifier
    pub subcategory_id: Option<String>,
}

impl ItemDraft {
    /// Check the fields a persisted item requires
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is empty".to_string());
        }
        if self.content.trim().is_empty() {
            return Err("content is empty".to_string());
        }
        if self.confidence > 100 {
            return Err(format!("confidence {} out of range [0, 100]", self.confidence));
        }
        if self.tags.len() > MAX_TAGS {
            return Err(format!("{} tags exceeds the limit of {}", self.tags.len(), MAX_TAGS));
        }
        Ok(())
    }
}

/// Request to persist a knowledge item
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    /// The item fields
    pub draft: ItemDraft,

    /// Collection the item belongs to
    pub collection_id: String,

    /// Initial review status
    pub status: ItemStatus,
}

impl NewItem {
    /// An item produced by extraction; always starts as pending
    pub fn extracted(draft: ItemDraft, collection_id: impl Into<String>) -> Self {
        Self {
            draft,
            collection_id: collection_id.into(),
            status: ItemStatus::Pending,
        }
    }

    /// An item entered by hand; may be confirmed directly
    pub fn manual(draft: ItemDraft, collection_id: impl Into<String>, status: ItemStatus) -> Self {
        Self {
            draft,
            collection_id: collection_id.into(),
            status,
        }
    }
}

/// A persisted knowledge item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    /// Unique identifier
    pub id: ItemId,

    /// Collection the item belongs to
    pub collection_id: String,

    /// Review status
    pub status: ItemStatus,

    /// Item fields
    #[serde(flatten)]
    pub draft: ItemDraft,

    /// Creation time (ms since epoch)
    pub created_at: u64,

    /// Last update time (ms since epoch)
    pub updated_at: u64,
}

impl KnowledgeItem {
    /// Materialize a stored item from a creation request
    pub fn from_new(id: ItemId, new_item: NewItem, now: u64) -> Self {
        Self {
            id,
            collection_id: new_item.collection_id,
            status: new_item.status,
            draft: new_item.draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// Title of the item
    pub fn title(&self) -> &str {
        &self.draft.title
    }

    /// Tags of the item
    pub fn tags(&self) -> &[String] {
        &self.draft.tags
    }

    /// Category of the item
    pub fn category(&self) -> Category {
        self.draft.category
    }
}

#[cfg(test)]
pub(crate) fn sample_draft(title: &str, content: &str) -> ItemDraft {
    ItemDraft {
        title: title.to_string(),
        content: content.to_string(),
        summary: None,
        key_conclusions: Vec::new(),
        confidence: DEFAULT_CONFIDENCE,
        tags: vec!["rust".to_string()],
        source_document_id: "doc-1".to_string(),
        source_page: None,
        source_excerpt: None,
        category: Category::General,
        subcategory_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_ordering() {
        let id1 = ItemId::from_value(1000);
        let id2 = ItemId::from_value(2000);
        assert!(id1 < id2);
    }

    #[test]
    fn test_item_id_display_and_parse() {
        let id = ItemId::new();
        let id_str = id.to_string();
        assert_eq!(id_str.len(), 36);
        assert_eq!(ItemId::from_string(&id_str).unwrap(), id);
        assert!(ItemId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_item_id_serializes_as_string() {
        let id = ItemId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: ItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_draft_validation() {
        assert!(sample_draft("Title", "Body").validate().is_ok());
        assert!(sample_draft("  ", "Body").validate().is_err());
        assert!(sample_draft("Title", "").validate().is_err());

        let mut draft = sample_draft("Title", "Body");
        draft.confidence = 101;
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_extracted_items_start_pending() {
        let item = NewItem::extracted(sample_draft("T", "C"), "kb-1");
        assert_eq!(item.status, ItemStatus::Pending);

        let manual = NewItem::manual(sample_draft("T", "C"), "kb-1", ItemStatus::Confirmed);
        assert_eq!(manual.status, ItemStatus::Confirmed);
    }

    #[test]
    fn test_from_new_sets_timestamps() {
        let id = ItemId::new();
        let item = KnowledgeItem::from_new(id, NewItem::extracted(sample_draft("T", "C"), "kb"), 42);
        assert_eq!(item.created_at, 42);
        assert_eq!(item.updated_at, 42);
        assert_eq!(item.title(), "T");
    }
}
