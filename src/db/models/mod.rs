// src/db/models/mod.rs

//! Data models for publishing store entities
//!
//! This module defines Rust structs that correspond to database tables
//! and provides methods for creating and reading the append-only records.

mod content_item;
mod file_entry;
mod tree_node;
mod version_entry;

pub use content_item::ContentItem;
pub use file_entry::{FileEntry, VersionFile};
pub use tree_node::{TreeNode, TreeSummary, tree_summary};
pub use version_entry::VersionEntry;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentKind, Submission};
    use crate::db::schema;
    use crate::error::Error;
    use crate::metadata::DocumentMetadata;
    use crate::version::{Revision, Version};
    use rusqlite::Connection;
    use tempfile::NamedTempFile;

    fn create_test_db() -> (NamedTempFile, Connection) {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = Connection::open(temp_file.path()).unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        schema::migrate(&conn).unwrap();
        (temp_file, conn)
    }

    fn sample_metadata(title: &str) -> DocumentMetadata {
        DocumentMetadata {
            title: title.to_string(),
            language: "en".to_string(),
            license_url: "http://creativecommons.org/licenses/by/4.0/".to_string(),
            created: "2024/01/01 00:00:00 GMT-5".to_string(),
            revised: "2024/02/01 00:00:00 GMT-5".to_string(),
            version: "1.1".to_string(),
            authors: vec!["alice".to_string()],
            ..DocumentMetadata::default()
        }
    }

    #[test]
    fn test_item_version_chain() {
        let (_temp, conn) = create_test_db();

        let mut item = ContentItem::new("m10000".to_string(), ContentKind::Module);
        item.insert(&conn).unwrap();

        let submission = Submission::new("alice", "initial publish");
        let mut first = VersionEntry::new(
            item.uuid.clone(),
            Version::first(ContentKind::Module),
            &sample_metadata("Kinematics"),
            &submission,
        );
        first.insert(&conn).unwrap();

        let next = Version::first(ContentKind::Module).next(ContentKind::Module, Revision::Major);
        let mut second = VersionEntry::new(
            item.uuid.clone(),
            next,
            &sample_metadata("Kinematics, revised"),
            &submission,
        );
        second.insert(&conn).unwrap();

        let latest = VersionEntry::find_latest(&conn, &item.uuid).unwrap().unwrap();
        assert_eq!(latest.version(), Version::new(2, None));
        assert_eq!(latest.title, "Kinematics, revised");

        let history = VersionEntry::history(&conn, &item.uuid).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version(), Version::new(2, None));
        assert_eq!(history[1].version(), Version::new(1, None));
    }

    #[test]
    fn test_version_requires_a_known_item() {
        let (_temp, conn) = create_test_db();

        let mut orphan = VersionEntry::new(
            "no-such-uuid".to_string(),
            Version::first(ContentKind::Module),
            &sample_metadata("Orphan"),
            &Submission::new("alice", "bad publish"),
        );
        let result = orphan.insert(&conn);
        assert!(matches!(result, Err(Error::ConflictError(_))));
    }

    #[test]
    fn test_full_publication_graph() {
        let (_temp, conn) = create_test_db();

        let mut module = ContentItem::new("m10000".to_string(), ContentKind::Module);
        module.insert(&conn).unwrap();
        let mut collection = ContentItem::new("col11405".to_string(), ContentKind::Collection);
        collection.insert(&conn).unwrap();

        let submission = Submission::new("alice", "initial publish");
        let mut module_version = VersionEntry::new(
            module.uuid.clone(),
            Version::first(ContentKind::Module),
            &sample_metadata("Kinematics"),
            &submission,
        );
        let module_ident = module_version.insert(&conn).unwrap();

        let mut collection_version = VersionEntry::new(
            collection.uuid.clone(),
            Version::first(ContentKind::Collection),
            &sample_metadata("College Physics"),
            &submission,
        );
        let collection_ident = collection_version.insert(&conn).unwrap();

        let mut document = FileEntry::new("text/xml", b"<document/>".to_vec());
        let document_id = document.insert_or_find(&conn).unwrap();
        VersionFile::new(module_ident, document_id, "index.cnxml")
            .insert(&conn)
            .unwrap();

        let mut root = TreeNode::new(None, Some(collection_ident), None, 0, true);
        let root_id = root.insert(&conn).unwrap();
        TreeNode::new(Some(root_id), Some(module_ident), None, 0, true)
            .insert(&conn)
            .unwrap();

        let digests = VersionFile::digest_map(&conn, module_ident).unwrap();
        assert_eq!(digests.len(), 1);
        assert!(digests.contains_key("index.cnxml"));

        let summary = tree_summary(&conn, collection_ident).unwrap();
        assert_eq!(summary.id, "col11405");
        assert_eq!(summary.contents.as_ref().unwrap()[0].id, "m10000");

        let containing =
            TreeNode::find_containing_collections(&conn, &[module.uuid.clone()]).unwrap();
        assert_eq!(containing, vec![collection.uuid.clone()]);
    }
}
