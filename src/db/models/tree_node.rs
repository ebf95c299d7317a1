// src/db/models/tree_node.rs

//! Tree node model - the frozen shape of a collection version

use crate::content::ContentKind;
use crate::db::models::{ContentItem, VersionEntry};
use crate::error::{Error, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

/// One node of a collection tree.
///
/// The root node references the collection version that owns the tree.
/// Leaf nodes reference module versions, nested collection references work
/// the same way, and heading nodes reference nothing at all. Trees are
/// frozen: a republish writes a whole new tree rather than editing one.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: Option<i64>,
    pub parent_id: Option<i64>,
    /// Version ident this node points at, `None` for headings
    pub document_version_id: Option<i64>,
    pub title: Option<String>,
    pub child_order: i64,
    /// Whether this reference tracks the latest version rather than a pin
    pub latest: bool,
}

impl TreeNode {
    pub fn new(
        parent_id: Option<i64>,
        document_version_id: Option<i64>,
        title: Option<String>,
        child_order: i64,
        latest: bool,
    ) -> Self {
        Self {
            id: None,
            parent_id,
            document_version_id,
            title,
            child_order,
            latest,
        }
    }

    /// The store-internal ident of this node
    pub fn ident(&self) -> Result<i64> {
        self.id
            .ok_or_else(|| Error::NotFound("tree node has not been inserted".to_string()))
    }

    /// Insert this node into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO tree_nodes (parent_id, document_version_id, title, child_order, latest)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.parent_id,
                self.document_version_id,
                &self.title,
                self.child_order,
                self.latest,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find the root node of the tree owned by a collection version
    pub fn find_root(conn: &Connection, version_id: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, parent_id, document_version_id, title, child_order, latest
             FROM tree_nodes WHERE document_version_id = ?1 AND parent_id IS NULL",
        )?;

        let node = stmt.query_row([version_id], Self::from_row).optional()?;

        Ok(node)
    }

    /// Direct children of a node, in tree order
    pub fn children_of(conn: &Connection, node_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, parent_id, document_version_id, title, child_order, latest
             FROM tree_nodes WHERE parent_id = ?1 ORDER BY child_order, id",
        )?;

        let nodes = stmt
            .query_map([node_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(nodes)
    }

    /// Find the collections whose current tree contains any version of the
    /// given items.
    ///
    /// Walks up from every node referencing one of the items to the root of
    /// its tree, then keeps the roots that belong to the latest version of
    /// their collection. Old trees never trigger anything: a collection that
    /// has since dropped the item is left alone.
    pub fn find_containing_collections(
        conn: &Connection,
        item_uuids: &[String],
    ) -> Result<Vec<String>> {
        if item_uuids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; item_uuids.len()].join(", ");
        let sql = format!(
            "WITH RECURSIVE containing(id, parent_id, document_version_id) AS (
                 SELECT tn.id, tn.parent_id, tn.document_version_id
                   FROM tree_nodes tn
                   JOIN versions v ON v.id = tn.document_version_id
                  WHERE v.item_uuid IN ({placeholders})
                 UNION
                 SELECT p.id, p.parent_id, p.document_version_id
                   FROM tree_nodes p
                   JOIN containing c ON c.parent_id = p.id
             )
             SELECT DISTINCT root.item_uuid
               FROM containing c
               JOIN versions root ON root.id = c.document_version_id
              WHERE c.parent_id IS NULL
                AND root.id = (SELECT v2.id FROM versions v2
                                WHERE v2.item_uuid = root.item_uuid
                                ORDER BY v2.major DESC, v2.minor DESC LIMIT 1)
              ORDER BY root.item_uuid"
        );

        let mut stmt = conn.prepare(&sql)?;
        let uuids = stmt
            .query_map(params_from_iter(item_uuids.iter()), |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(uuids)
    }

    /// Convert a database row to a TreeNode
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            parent_id: row.get(1)?,
            document_version_id: row.get(2)?,
            title: row.get(3)?,
            child_order: row.get(4)?,
            latest: row.get(5)?,
        })
    }
}

/// Exportable view of a collection tree, in the shape the legacy
/// repository's consumers expect
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TreeSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<TreeSummary>>,
}

/// Render the tree of a collection version for export
pub fn tree_summary(conn: &Connection, version_id: i64) -> Result<TreeSummary> {
    let root = TreeNode::find_root(conn, version_id)?
        .ok_or_else(|| Error::NotFound(format!("no tree for version {version_id}")))?;
    summarize(conn, &root)
}

fn summarize(conn: &Connection, node: &TreeNode) -> Result<TreeSummary> {
    let (id, version, title, is_container) = match node.document_version_id {
        Some(ident) => {
            let entry = VersionEntry::find_by_id(conn, ident)?
                .ok_or_else(|| Error::NotFound(format!("version {ident} is missing")))?;
            let item = ContentItem::find_by_uuid(conn, &entry.item_uuid)?
                .ok_or_else(|| Error::NotFound(format!("item {} is missing", entry.item_uuid)))?;
            let title = node.title.clone().unwrap_or_else(|| entry.title.clone());
            (
                item.content_id,
                Some(entry.version().to_legacy_string()),
                Some(title),
                item.kind == ContentKind::Collection,
            )
        }
        None => ("subcol".to_string(), None, node.title.clone(), true),
    };

    let contents = if is_container {
        let children = TreeNode::children_of(conn, node.ident()?)?;
        let mut summaries = Vec::with_capacity(children.len());
        for child in &children {
            summaries.push(summarize(conn, child)?);
        }
        Some(summaries)
    } else {
        None
    };

    Ok(TreeSummary {
        id,
        version,
        title,
        contents,
    })
}
