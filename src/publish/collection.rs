// src/publish/collection.rs

//! Publishing a collection submission and freezing its tree

use crate::classify;
use crate::collxml::{self, Element, set_identity};
use crate::content::{CollectionSource, ContentKind, Submission};
use crate::db::models::{ContentItem, TreeNode, VersionEntry, VersionFile};
use crate::error::{Error, Result};
use crate::guard::{self, DigestSet};
use crate::metadata::parse_collection_metadata;
use crate::publish::module::check_claimed_id;
use crate::publish::{PublishedItem, store_file};
use crate::version::{Revision, Version};
use rusqlite::Connection;
use tracing::info;

/// Publish one collection: classify the revision against the stored
/// document, append a new version row, store its files, and freeze the
/// submitted table of contents as tree rows.
///
/// Classification falls back to a minor bump when nothing the classifier
/// watches has changed, since the submission already passed the unchanged
/// guard on raw bytes. Every document the tree references must already be
/// published; an unresolvable reference aborts the publish.
pub fn publish_collection(
    conn: &Connection,
    source: &CollectionSource,
    submission: &Submission,
) -> Result<PublishedItem> {
    let root = collxml::parse(&source.document)?;
    let metadata = parse_collection_metadata(&root)?;
    check_claimed_id(&metadata.id, &source.content_id)?;
    let primary = ContentKind::Collection.primary_filename();

    let (item, previous) = resolve_item(conn, &source.content_id)?;

    let version = match &previous {
        Some(prev) => {
            guard::check_not_stale(
                &source.content_id,
                &metadata.version,
                &prev.version().to_legacy_string(),
            )?;
            let digests = DigestSet::from(VersionFile::digest_map(conn, prev.ident()?)?);
            if guard::is_unchanged(&source.document, primary, &source.resources, &digests) {
                return Err(Error::Unchanged(source.content_id.clone()));
            }

            let stored = VersionFile::find_file(conn, prev.ident()?, primary)?.ok_or_else(|| {
                Error::NotFound(format!(
                    "stored {} for '{}' version {} is missing",
                    primary,
                    source.content_id,
                    prev.version()
                ))
            })?;
            let before = collxml::parse(&stored.data)?;
            let revision = classify::classify(&before, &root).unwrap_or(Revision::Minor);
            prev.version().next(ContentKind::Collection, revision)
        }
        None => Version::first(ContentKind::Collection),
    };

    let mut entry = VersionEntry::new(item.uuid.clone(), version, &metadata, submission);
    if let Some(prev) = &previous {
        entry.created = prev.created.clone();
    }
    let ident = entry.insert(conn)?;

    if let Some(prev) = &previous {
        let mut shadowed: Vec<String> =
            source.resources.iter().map(|r| r.filename.clone()).collect();
        shadowed.push(primary.to_string());
        VersionFile::carry_forward(conn, prev.ident()?, ident, &shadowed)?;
    }

    let document = set_identity(&source.document, &item.content_id, &version)?;
    store_file(conn, ident, primary, "text/xml", document)?;
    for resource in &source.resources {
        store_file(conn, ident, &resource.filename, &resource.media_type, resource.data.clone())?;
    }

    build_tree(conn, &root, ident, &metadata.title)?;

    info!("published collection {} at {}", item.content_id, version);

    Ok(PublishedItem {
        content_id: item.content_id,
        uuid: item.uuid,
        version,
        ident,
    })
}

/// Look up the item for a content id, minting it on first publish
fn resolve_item(
    conn: &Connection,
    content_id: &str,
) -> Result<(ContentItem, Option<VersionEntry>)> {
    match ContentItem::find_by_content_id(conn, content_id)? {
        Some(item) => {
            if item.kind != ContentKind::Collection {
                return Err(Error::ConflictError(format!(
                    "'{content_id}' is already published as a {}",
                    item.kind
                )));
            }
            let previous = VersionEntry::find_latest(conn, &item.uuid)?;
            Ok((item, previous))
        }
        None => {
            let mut item = ContentItem::new(content_id.to_string(), ContentKind::Collection);
            item.insert(conn)?;
            Ok((item, None))
        }
    }
}

/// Freeze the submitted table of contents as tree rows for this version
fn build_tree(
    conn: &Connection,
    root_doc: &Element,
    collection_ident: i64,
    title: &str,
) -> Result<()> {
    let content = root_doc
        .child("content")
        .ok_or_else(|| Error::ParseError("collection document has no <content>".to_string()))?;

    let mut root = TreeNode::new(None, Some(collection_ident), Some(title.to_string()), 0, true);
    let root_id = root.insert(conn)?;
    insert_children(conn, content, root_id)
}

fn insert_children(conn: &Connection, parent: &Element, parent_id: i64) -> Result<()> {
    let mut order = 0;
    for child in &parent.children {
        match child.tag.as_str() {
            "module" => {
                insert_reference(conn, child, parent_id, order)?;
                order += 1;
            }
            "subcollection" => {
                let title = child.child("title").map(|t| t.all_text());
                let mut heading = TreeNode::new(Some(parent_id), None, title, order, true);
                let heading_id = heading.insert(conn)?;
                order += 1;

                let content = child.child("content").ok_or_else(|| {
                    Error::ParseError("subcollection has no <content>".to_string())
                })?;
                insert_children(conn, content, heading_id)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Insert one document reference, resolving it to a published version.
///
/// `version="latest"` (or no version attribute) tracks the latest published
/// version; any other value pins the reference to the version whose legacy
/// rendering matches.
fn insert_reference(conn: &Connection, node: &Element, parent_id: i64, order: i64) -> Result<()> {
    let document = node.require_attr("document")?;
    let item = ContentItem::find_by_content_id(conn, document)?
        .ok_or_else(|| Error::NotFound(format!("referenced document '{document}' is not published")))?;

    let requested = node.attr("version").unwrap_or("latest");
    let (entry, latest) = if requested == "latest" {
        let entry = VersionEntry::find_latest(conn, &item.uuid)?.ok_or_else(|| {
            Error::NotFound(format!("referenced document '{document}' has no published version"))
        })?;
        (entry, true)
    } else {
        let entry = VersionEntry::history(conn, &item.uuid)?
            .into_iter()
            .find(|e| e.version().to_legacy_string() == requested)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "referenced document '{document}' has no published version {requested}"
                ))
            })?;
        (entry, false)
    };

    let title = node.child("title").map(|t| t.all_text());
    TreeNode::new(Some(parent_id), Some(entry.ident()?), title, order, latest).insert(conn)?;
    Ok(())
}
