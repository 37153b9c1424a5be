//! SQLite-backed store

use crate::StoreError;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sift_domain::traits::{pair_key, KnowledgeStore, SimilarityCache};
use sift_domain::{
    now_millis, Category, ItemDraft, ItemId, ItemStatus, KnowledgeItem, NewItem, Subcategory,
};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const ITEM_COLUMNS: &str = "id, collection_id, status, title, content, summary, key_conclusions, \
     confidence, tags, source_document_id, source_page, source_excerpt, category, subcategory_id, \
     created_at, updated_at";

/// SQLite-based implementation of the persistence traits
///
/// The connection sits behind a mutex so the store can be shared between
/// the concurrent saves of an extraction batch.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at `path`
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a fresh in-memory store
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add or replace a source document
    ///
    /// The extracted flag is cleared only when the content changes.
    pub fn add_document(&self, id: &str, content: &str) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO documents (id, content, extracted, added_at) VALUES (?1, ?2, 0, ?3)
             ON CONFLICT(id) DO UPDATE SET
                 extracted = CASE WHEN documents.content = excluded.content
                                  THEN documents.extracted ELSE 0 END,
                 content = excluded.content",
            params![id, content, now_millis() as i64],
        )?;
        debug!("Stored document '{}' ({} bytes)", id, content.len());
        Ok(())
    }

    /// Ids of every stored document
    pub fn document_ids(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id FROM documents ORDER BY added_at, id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Replace the configured subcategories, keeping their order
    pub fn set_subcategories(&self, subcategories: &[Subcategory]) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM subcategories", [])?;
        for (position, sub) in subcategories.iter().enumerate() {
            tx.execute(
                "INSERT INTO subcategories (position, id, category, name, keywords)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    position as i64,
                    &sub.id,
                    sub.category.as_str(),
                    &sub.name,
                    serde_json::to_string(&sub.keywords)?,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn id_to_bytes(id: ItemId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    fn bytes_to_id(bytes: &[u8]) -> Result<ItemId, StoreError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| {
            StoreError::InvalidData(format!("Expected 16 bytes for ItemId, got {}", bytes.len()))
        })?;
        Ok(ItemId::from_value(u128::from_be_bytes(arr)))
    }

    fn row_to_item(row: &Row<'_>) -> rusqlite::Result<KnowledgeItem> {
        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_id(&id_bytes).map_err(|e| conversion(0, e))?;

        let status: String = row.get(2)?;
        let status = ItemStatus::parse(&status)
            .ok_or_else(|| conversion(2, StoreError::InvalidData(format!("status '{}'", status))))?;

        let key_conclusions: String = row.get(6)?;
        let key_conclusions: Vec<String> =
            serde_json::from_str(&key_conclusions).map_err(|e| conversion(6, e.into()))?;

        let tags: String = row.get(8)?;
        let tags: Vec<String> = serde_json::from_str(&tags).map_err(|e| conversion(8, e.into()))?;

        let category: String = row.get(12)?;
        let category = Category::parse(&category).ok_or_else(|| {
            conversion(12, StoreError::InvalidData(format!("category '{}'", category)))
        })?;

        let source_page: Option<i64> = row.get(10)?;

        Ok(KnowledgeItem {
            id,
            collection_id: row.get(1)?,
            status,
            draft: ItemDraft {
                title: row.get(3)?,
                content: row.get(4)?,
                summary: row.get(5)?,
                key_conclusions,
                confidence: row.get::<_, i64>(7)?.clamp(0, 100) as u8,
                tags,
                source_document_id: row.get(9)?,
                source_page: source_page.and_then(|p| u32::try_from(p).ok()),
                source_excerpt: row.get(11)?,
                category,
                subcategory_id: row.get(13)?,
            },
            created_at: row.get::<_, i64>(14)? as u64,
            updated_at: row.get::<_, i64>(15)? as u64,
        })
    }
}

fn conversion(column: usize, e: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

#[async_trait]
impl KnowledgeStore for SqliteStore {
    type Error = StoreError;

    async fn create_item(&self, item: NewItem) -> Result<ItemId, Self::Error> {
        let id = ItemId::new();
        let now = now_millis() as i64;
        let draft = &item.draft;

        self.conn().execute(
            &format!(
                "INSERT INTO items ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                ITEM_COLUMNS
            ),
            params![
                Self::id_to_bytes(id),
                &item.collection_id,
                item.status.as_str(),
                &draft.title,
                &draft.content,
                &draft.summary,
                serde_json::to_string(&draft.key_conclusions)?,
                draft.confidence as i64,
                serde_json::to_string(&draft.tags)?,
                &draft.source_document_id,
                draft.source_page.map(|p| p as i64),
                &draft.source_excerpt,
                draft.category.as_str(),
                &draft.subcategory_id,
                now,
                now,
            ],
        )?;

        Ok(id)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<KnowledgeItem>, Self::Error> {
        let item = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM items WHERE id = ?1", ITEM_COLUMNS),
                params![Self::id_to_bytes(id)],
                Self::row_to_item,
            )
            .optional()?;
        Ok(item)
    }

    async fn list_items(&self, collection_id: &str) -> Result<Vec<KnowledgeItem>, Self::Error> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM items WHERE collection_id = ?1 ORDER BY created_at, id",
            ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map(params![collection_id], Self::row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn document_content(&self, document_id: &str) -> Result<String, Self::Error> {
        self.conn()
            .query_row(
                "SELECT content FROM documents WHERE id = ?1",
                params![document_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("document '{}'", document_id)))
    }

    async fn subcategories(&self) -> Result<Vec<Subcategory>, Self::Error> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, category, name, keywords FROM subcategories ORDER BY position",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, category, name, keywords)| {
                let category = Category::parse(&category)
                    .ok_or_else(|| StoreError::InvalidData(format!("category '{}'", category)))?;
                Ok(Subcategory {
                    id,
                    category,
                    name,
                    keywords: serde_json::from_str(&keywords)?,
                })
            })
            .collect()
    }

    async fn is_extracted(&self, document_id: &str) -> Result<bool, Self::Error> {
        let flag: Option<i64> = self
            .conn()
            .query_row(
                "SELECT extracted FROM documents WHERE id = ?1",
                params![document_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(flag.is_some_and(|f| f != 0))
    }

    async fn mark_extracted(&self, document_id: &str, extracted: bool) -> Result<(), Self::Error> {
        let changed = self.conn().execute(
            "UPDATE documents SET extracted = ?1 WHERE id = ?2",
            params![extracted as i64, document_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("document '{}'", document_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl SimilarityCache for SqliteStore {
    type Error = StoreError;

    async fn cached_similarity(&self, a: ItemId, b: ItemId) -> Result<Option<u8>, Self::Error> {
        let (a, b) = pair_key(a, b);
        let score: Option<i64> = self
            .conn()
            .query_row(
                "SELECT score FROM similarity_cache WHERE item_a = ?1 AND item_b = ?2",
                params![Self::id_to_bytes(a), Self::id_to_bytes(b)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(score.map(|s| s.clamp(0, 100) as u8))
    }

    async fn store_similarity(&self, a: ItemId, b: ItemId, score: u8) -> Result<(), Self::Error> {
        let (a, b) = pair_key(a, b);
        self.conn().execute(
            "INSERT INTO similarity_cache (item_a, item_b, score, computed_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(item_a, item_b) DO UPDATE SET
             score = excluded.score, computed_at = excluded.computed_at",
            params![
                Self::id_to_bytes(a),
                Self::id_to_bytes(b),
                score as i64,
                now_millis() as i64,
            ],
        )?;
        Ok(())
    }
}
