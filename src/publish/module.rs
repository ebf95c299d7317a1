// src/publish/module.rs

//! Publishing a single module submission

use crate::collxml::{self, set_identity};
use crate::content::{ContentKind, ModuleSource, Submission};
use crate::db::models::{ContentItem, VersionEntry, VersionFile};
use crate::error::{Error, Result};
use crate::guard::{self, DigestSet};
use crate::metadata::parse_module_metadata;
use crate::publish::{PublishedItem, store_file};
use crate::version::{Revision, Version};
use rusqlite::Connection;
use tracing::info;

/// Publish one module: append a new version row, store its files, and
/// rewrite the published identity into the document.
///
/// A first publish mints the ContentItem with a fresh uuid and starts at
/// major 1. Every later publish takes a major step, after the staleness and
/// unchanged guards have passed. Files of the previous version that the
/// submission does not replace are carried forward; the primary document is
/// always written fresh because its identity section changes.
pub fn publish_module(
    conn: &Connection,
    source: &ModuleSource,
    submission: &Submission,
) -> Result<PublishedItem> {
    let root = collxml::parse(&source.document)?;
    let metadata = parse_module_metadata(&root)?;
    check_claimed_id(&metadata.id, &source.content_id)?;
    let primary = ContentKind::Module.primary_filename();

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
            prev.version().next(ContentKind::Module, Revision::Major)
        }
        None => Version::first(ContentKind::Module),
    };

    let mut entry = VersionEntry::new(item.uuid.clone(), version, &metadata, submission);
    if let Some(prev) = &previous {
        // The creation timestamp belongs to the item, not the submission
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

    info!("published module {} at {}", item.content_id, version);

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
            if item.kind != ContentKind::Module {
                return Err(Error::ConflictError(format!(
                    "'{content_id}' is already published as a {}",
                    item.kind
                )));
            }
            let previous = VersionEntry::find_latest(conn, &item.uuid)?;
            Ok((item, previous))
        }
        None => {
            let mut item = ContentItem::new(content_id.to_string(), ContentKind::Module);
            item.insert(conn)?;
            Ok((item, None))
        }
    }
}

/// The id inside the document, when present, must agree with the submitted id
pub(crate) fn check_claimed_id(claimed: &Option<String>, content_id: &str) -> Result<()> {
    match claimed.as_deref() {
        Some(id) if id != content_id => Err(Error::ParseError(format!(
            "document claims content id '{id}' but was submitted as '{content_id}'"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Resource;
    use crate::db::schema;
    use crate::hash;
    use crate::metadata;

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        schema::migrate(&conn).unwrap();
        conn
    }

    fn module_document(content_id: &str, version: &str, body: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0"?>
<document xmlns="http://cnx.rice.edu/cnxml" xmlns:md="http://cnx.rice.edu/mdml">
  <title>Kinematics</title>
  <metadata>
    <md:content-id>{content_id}</md:content-id>
    <md:title>Kinematics</md:title>
    <md:version>{version}</md:version>
    <md:created>2010/01/01 00:00:00 -0600</md:created>
    <md:revised>2010/06/01 00:00:00 -0600</md:revised>
    <md:language>en</md:language>
    <md:license url="http://creativecommons.org/licenses/by/4.0/"/>
  </metadata>
  <content>
    <para id="intro">{body}</para>
  </content>
</document>
"#
        )
        .into_bytes()
    }

    fn submission() -> Submission {
        Submission::new("alice", "routine update")
    }

    #[test]
    fn test_first_publish_mints_item_and_version() {
        let conn = setup_test_db();
        let source = ModuleSource::new("m10000", module_document("m10000", "1.1", "Motion."));

        let published = publish_module(&conn, &source, &submission()).unwrap();
        assert_eq!(published.content_id, "m10000");
        assert_eq!(published.version, Version::new(1, None));

        let item = ContentItem::find_by_content_id(&conn, "m10000")
            .unwrap()
            .unwrap();
        assert_eq!(item.uuid, published.uuid);
        assert_eq!(item.kind, ContentKind::Module);

        // The stored document carries the published identity
        let stored = VersionFile::find_file(&conn, published.ident, "index.cnxml")
            .unwrap()
            .unwrap();
        let tree = collxml::parse(&stored.data).unwrap();
        let stored_metadata = metadata::parse_module_metadata(&tree).unwrap();
        assert_eq!(stored_metadata.id.as_deref(), Some("m10000"));
        assert_eq!(stored_metadata.version, "1.1");
    }

    #[test]
    fn test_republish_takes_a_major_step() {
        let conn = setup_test_db();
        let first = ModuleSource::new("m10000", module_document("m10000", "1.1", "Motion."));
        publish_module(&conn, &first, &submission()).unwrap();

        let second =
            ModuleSource::new("m10000", module_document("m10000", "1.1", "Motion, revised."));
        let published = publish_module(&conn, &second, &submission()).unwrap();
        assert_eq!(published.version, Version::new(2, None));

        let stored = VersionFile::find_file(&conn, published.ident, "index.cnxml")
            .unwrap()
            .unwrap();
        let tree = collxml::parse(&stored.data).unwrap();
        assert_eq!(
            metadata::parse_module_metadata(&tree).unwrap().version,
            "1.2"
        );
    }

    #[test]
    fn test_identical_submission_is_unchanged() {
        let conn = setup_test_db();
        let document = module_document("m10000", "1.1", "Motion.");
        let source = ModuleSource::new("m10000", document.clone());
        let published = publish_module(&conn, &source, &submission()).unwrap();

        // Resubmit exactly what the store now holds
        let stored = VersionFile::find_file(&conn, published.ident, "index.cnxml")
            .unwrap()
            .unwrap();
        let resubmit = ModuleSource::new("m10000", stored.data);
        let err = publish_module(&conn, &resubmit, &submission()).unwrap_err();
        assert!(matches!(err, Error::Unchanged(_)));

        let history = VersionEntry::history(
            &conn,
            &ContentItem::find_by_content_id(&conn, "m10000")
                .unwrap()
                .unwrap()
                .uuid,
        )
        .unwrap();
        assert_eq!(history.len(), 1, "no version row for an unchanged publish");
    }

    #[test]
    fn test_stale_base_version_is_rejected() {
        let conn = setup_test_db();
        publish_module(
            &conn,
            &ModuleSource::new("m10000", module_document("m10000", "1.1", "One.")),
            &submission(),
        )
        .unwrap();
        publish_module(
            &conn,
            &ModuleSource::new("m10000", module_document("m10000", "1.1", "Two.")),
            &submission(),
        )
        .unwrap();

        // An editor still working from 1.1 while 1.2 is current
        let err = publish_module(
            &conn,
            &ModuleSource::new("m10000", module_document("m10000", "1.1", "Three.")),
            &submission(),
        )
        .unwrap_err();
        match err {
            Error::StaleVersion { item, claimed, current } => {
                assert_eq!(item, "m10000");
                assert_eq!(claimed, "1.1");
                assert_eq!(current, "1.2");
            }
            other => panic!("expected StaleVersion, got {other:?}"),
        }
    }

    #[test]
    fn test_resources_carry_forward_unless_replaced() {
        let conn = setup_test_db();
        let first = ModuleSource::new("m10000", module_document("m10000", "1.1", "One."))
            .with_resource(Resource::new("kept.png", "image/png", b"kept".to_vec()))
            .with_resource(Resource::new("replaced.png", "image/png", b"old".to_vec()));
        publish_module(&conn, &first, &submission()).unwrap();

        let second = ModuleSource::new("m10000", module_document("m10000", "1.1", "Two."))
            .with_resource(Resource::new("replaced.png", "image/png", b"new".to_vec()));
        let published = publish_module(&conn, &second, &submission()).unwrap();

        let digests = VersionFile::digest_map(&conn, published.ident).unwrap();
        assert_eq!(digests.len(), 3);
        assert_eq!(digests["kept.png"], hash::sha1(b"kept"));
        assert_eq!(digests["replaced.png"], hash::sha1(b"new"));
        assert!(digests.contains_key("index.cnxml"));
    }

    #[test]
    fn test_mismatched_document_id_is_rejected() {
        let conn = setup_test_db();
        let source = ModuleSource::new("m99999", module_document("m10000", "1.1", "One."));
        let err = publish_module(&conn, &source, &submission()).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn test_content_id_cannot_switch_kinds() {
        let conn = setup_test_db();
        let mut item = ContentItem::new("m10000".to_string(), ContentKind::Collection);
        item.insert(&conn).unwrap();

        let source = ModuleSource::new("m10000", module_document("m10000", "1.1", "One."));
        let err = publish_module(&conn, &source, &submission()).unwrap_err();
        assert!(matches!(err, Error::ConflictError(_)));
    }
}
