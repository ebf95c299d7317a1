// src/db/models/content_item.rs

//! Content item model - the stable identity of a module or collection

use crate::content::ContentKind;
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

/// A ContentItem is the durable identity of one piece of content. The
/// human-facing `content_id` and the internal uuid never change; everything
/// that can change lives on version rows.
#[derive(Debug, Clone)]
pub struct ContentItem {
    pub id: Option<i64>,
    /// Repository identifier, e.g. `m10000` or `col11405`
    pub content_id: String,
    pub uuid: String,
    pub kind: ContentKind,
    pub created_at: Option<String>,
}

impl ContentItem {
    /// Create a new item with a freshly minted uuid
    pub fn new(content_id: String, kind: ContentKind) -> Self {
        Self {
            id: None,
            content_id,
            uuid: Uuid::new_v4().to_string(),
            kind,
            created_at: None,
        }
    }

    /// Insert this item into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO content_items (content_id, uuid, kind) VALUES (?1, ?2, ?3)",
            params![&self.content_id, &self.uuid, self.kind.as_str()],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find an item by its repository identifier
    pub fn find_by_content_id(conn: &Connection, content_id: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, content_id, uuid, kind, created_at
             FROM content_items WHERE content_id = ?1",
        )?;

        let item = stmt.query_row([content_id], Self::from_row).optional()?;

        Ok(item)
    }

    /// Find an item by its uuid
    pub fn find_by_uuid(conn: &Connection, uuid: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, content_id, uuid, kind, created_at
             FROM content_items WHERE uuid = ?1",
        )?;

        let item = stmt.query_row([uuid], Self::from_row).optional()?;

        Ok(item)
    }

    /// List all items of one kind
    pub fn list_by_kind(conn: &Connection, kind: ContentKind) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, content_id, uuid, kind, created_at
             FROM content_items WHERE kind = ?1 ORDER BY content_id",
        )?;

        let items = stmt
            .query_map([kind.as_str()], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Convert a database row to a ContentItem
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let kind_str: String = row.get(3)?;
        let kind = kind_str.parse::<ContentKind>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?;

        Ok(Self {
            id: Some(row.get(0)?),
            content_id: row.get(1)?,
            uuid: row.get(2)?,
            kind,
            created_at: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_find() {
        let conn = setup_test_db();

        let mut item = ContentItem::new("m10000".to_string(), ContentKind::Module);
        let id = item.insert(&conn).unwrap();
        assert!(id > 0);

        let found = ContentItem::find_by_content_id(&conn, "m10000")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, Some(id));
        assert_eq!(found.uuid, item.uuid);
        assert_eq!(found.kind, ContentKind::Module);

        let by_uuid = ContentItem::find_by_uuid(&conn, &item.uuid).unwrap().unwrap();
        assert_eq!(by_uuid.content_id, "m10000");
    }

    #[test]
    fn test_find_missing_returns_none() {
        let conn = setup_test_db();
        let found = ContentItem::find_by_content_id(&conn, "m99999").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_duplicate_content_id_conflicts() {
        let conn = setup_test_db();

        let mut first = ContentItem::new("m10000".to_string(), ContentKind::Module);
        first.insert(&conn).unwrap();

        let mut second = ContentItem::new("m10000".to_string(), ContentKind::Module);
        let err = second.insert(&conn).unwrap_err();
        assert!(matches!(err, crate::error::Error::ConflictError(_)));
    }

    #[test]
    fn test_list_by_kind() {
        let conn = setup_test_db();

        ContentItem::new("m2".to_string(), ContentKind::Module)
            .insert(&conn)
            .unwrap();
        ContentItem::new("m1".to_string(), ContentKind::Module)
            .insert(&conn)
            .unwrap();
        ContentItem::new("col1".to_string(), ContentKind::Collection)
            .insert(&conn)
            .unwrap();

        let modules = ContentItem::list_by_kind(&conn, ContentKind::Module).unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].content_id, "m1");

        let collections = ContentItem::list_by_kind(&conn, ContentKind::Collection).unwrap();
        assert_eq!(collections.len(), 1);
    }
}
