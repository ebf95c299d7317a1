// src/publish/mod.rs

//! Publish operations
//!
//! This module provides the publishing workflow:
//! - Publishing a single module or collection submission
//! - Publishing a whole upload (modules plus the collection that binds them)
//! - Cascading republication of collections containing changed content
//!
//! Everything here expects to run inside one caller-managed transaction, so
//! a failed publish leaves no partial rows behind.

mod collection;
mod module;
mod republish;

// Re-export main types and functions
pub use collection::publish_collection;
pub use module::publish_module;
pub use republish::republish_ancestors;

use crate::collxml::{ReferenceUpdate, point_module_references};
use crate::content::{CollectionSource, ModuleSource, Submission};
use crate::db::models::{FileEntry, VersionFile};
use crate::error::{Error, Result};
use crate::version::Version;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Versions assigned during one publish, by item uuid.
///
/// Iteration order is deterministic so cascades behave the same on every
/// run over the same store.
pub type ChangeMap = BTreeMap<String, Version>;

/// Identity and version assigned to one published document
#[derive(Debug, Clone, Serialize)]
pub struct PublishedItem {
    pub content_id: String,
    pub uuid: String,
    pub version: Version,
    /// Store-internal ident of the new version row
    pub ident: i64,
}

/// Outcome of publishing a whole upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    /// Submitted content id to published identity, for everything that
    /// actually produced a new version
    pub id_map: BTreeMap<String, PublishedItem>,
    /// Containing collections republished by the cascade, as
    /// `(content_id, legacy version)` pairs
    pub republished: Vec<(String, String)>,
}

/// Publish a complete upload: every changed module, then the collection
/// that binds them, then every containing collection.
///
/// Unchanged modules are skipped rather than failed; the upload as a whole
/// is `Unchanged` only when no module and not the collection produced a new
/// version. The collection document's module references are rewritten to
/// the freshly assigned versions before the collection itself is published.
pub fn publish_upload(
    conn: &Connection,
    modules: &[ModuleSource],
    collection: &CollectionSource,
    submission: &Submission,
) -> Result<UploadResult> {
    let mut id_map = BTreeMap::new();
    let mut change_map = ChangeMap::new();
    let mut updates: HashMap<String, ReferenceUpdate> = HashMap::new();

    for source in modules {
        match publish_module(conn, source, submission) {
            Ok(published) => {
                updates.insert(
                    source.content_id.clone(),
                    ReferenceUpdate {
                        document: published.content_id.clone(),
                        legacy_version: published.version.to_legacy_string(),
                    },
                );
                change_map.insert(published.uuid.clone(), published.version);
                id_map.insert(source.content_id.clone(), published);
            }
            Err(Error::Unchanged(content_id)) => {
                debug!("module {} is unchanged, skipping", content_id);
            }
            Err(e) => return Err(e),
        }
    }

    // Only rewrite when something changed: re-serializing an untouched
    // document would perturb its bytes and defeat the unchanged check.
    let prepared = if updates.is_empty() {
        collection.clone()
    } else {
        let document = point_module_references(&collection.document, &updates)?;
        CollectionSource {
            content_id: collection.content_id.clone(),
            document,
            resources: collection.resources.clone(),
        }
    };

    let published_collection = match publish_collection(conn, &prepared, submission) {
        Ok(published) => {
            change_map.insert(published.uuid.clone(), published.version);
            id_map.insert(collection.content_id.clone(), published.clone());
            Some(published)
        }
        Err(Error::Unchanged(content_id)) if !change_map.is_empty() => {
            // Changed modules the collection does not reference: the
            // collection stays as submitted, but the cascade below may
            // still bump it as a containing ancestor.
            debug!("collection {} is unchanged, skipping", content_id);
            None
        }
        Err(e) => return Err(e),
    };

    let exclude = published_collection.as_ref().map(|p| p.uuid.as_str());
    let republished = republish_ancestors(conn, &change_map, exclude)?;

    info!(
        "upload published {} items, republished {} ancestors",
        id_map.len(),
        republished.len()
    );

    Ok(UploadResult { id_map, republished })
}

/// Store one file body under a filename of a version
pub(crate) fn store_file(
    conn: &Connection,
    version_id: i64,
    filename: &str,
    media_type: &str,
    data: Vec<u8>,
) -> Result<()> {
    let mut body = FileEntry::new(media_type, data);
    let file_id = body.insert_or_find(conn)?;
    VersionFile::new(version_id, file_id, filename).insert(conn)?;
    Ok(())
}
