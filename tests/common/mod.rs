// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

use bindery::db;
use rusqlite::Connection;
use tempfile::TempDir;

/// Create an initialized content store in a temporary directory.
///
/// Returns (TempDir, Connection) - keep the TempDir alive to prevent cleanup.
pub fn setup_store() -> (TempDir, Connection) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir
        .path()
        .join("bindery.db")
        .to_str()
        .unwrap()
        .to_string();

    db::init(&db_path).unwrap();
    let conn = db::open(&db_path).unwrap();
    (temp_dir, conn)
}

/// A minimal but complete cnxml module document
pub fn module_document(content_id: &str, version: &str, body: &str) -> Vec<u8> {
    format!(
        r#"<?xml version="1.0"?>
<document xmlns="http://cnx.rice.edu/cnxml" xmlns:md="http://cnx.rice.edu/mdml">
  <title>A module</title>
  <metadata>
    <md:content-id>{content_id}</md:content-id>
    <md:title>A module</md:title>
    <md:version>{version}</md:version>
    <md:created>2010/01/01 00:00:00 -0600</md:created>
    <md:revised>2010/06/01 00:00:00 -0600</md:revised>
    <md:language>en</md:language>
    <md:license url="http://creativecommons.org/licenses/by/4.0/"/>
  </metadata>
  <content>
    <para id="p1">{body}</para>
  </content>
</document>
"#
    )
    .into_bytes()
}

/// A minimal but complete collxml collection document wrapping `content`
pub fn collection_document(content_id: &str, version: &str, title: &str, content: &str) -> Vec<u8> {
    format!(
        r#"<?xml version="1.0"?>
<col:collection xmlns:col="http://cnx.rice.edu/collxml" xmlns:md="http://cnx.rice.edu/mdml" xmlns:cnxorg="http://cnx.rice.edu/system-info">
  <col:metadata>
    <md:content-id>{content_id}</md:content-id>
    <md:title>{title}</md:title>
    <md:version>{version}</md:version>
    <md:created>2011/07/26 16:23:54 -0500</md:created>
    <md:revised>2018/01/19 10:05:21 -0600</md:revised>
    <md:language>en</md:language>
    <md:license url="http://creativecommons.org/licenses/by/4.0/"/>
  </col:metadata>
  <col:content>
{content}
  </col:content>
</col:collection>
"#
    )
    .into_bytes()
}

/// A single latest-tracking reference line for a collection document
pub fn module_reference(document: &str) -> String {
    format!(r#"    <col:module document="{document}" version="latest"/>"#)
}
