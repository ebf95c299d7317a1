// src/db/models/version_entry.rs

//! Version model - one append-only row per published version

use crate::content::Submission;
use crate::error::{Error, Result};
use crate::metadata::DocumentMetadata;
use crate::version::Version;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// A VersionEntry freezes everything about one published version: the
/// version number, the document metadata, and who submitted it. Rows are
/// never updated, so `id` doubles as the store-internal version ident that
/// tree nodes and file links point at.
#[derive(Debug, Clone)]
pub struct VersionEntry {
    pub id: Option<i64>,
    pub item_uuid: String,
    pub major: i64,
    pub minor: Option<i64>,
    pub title: String,
    pub language: String,
    pub license_url: String,
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub maintainers: Vec<String>,
    pub licensors: Vec<String>,
    pub keywords: Vec<String>,
    pub subjects: Vec<String>,
    pub print_style: Option<String>,
    pub submitter: String,
    pub submitlog: String,
    pub created: String,
    pub revised: String,
}

impl VersionEntry {
    /// Build the row for a fresh publication from parsed metadata
    pub fn new(
        item_uuid: String,
        version: Version,
        metadata: &DocumentMetadata,
        submission: &Submission,
    ) -> Self {
        Self {
            id: None,
            item_uuid,
            major: version.major,
            minor: version.minor,
            title: metadata.title.clone(),
            language: metadata.language.clone(),
            license_url: metadata.license_url.clone(),
            abstract_text: metadata.abstract_text.clone(),
            authors: metadata.authors.clone(),
            maintainers: metadata.maintainers.clone(),
            licensors: metadata.licensors.clone(),
            keywords: metadata.keywords.clone(),
            subjects: metadata.subjects.clone(),
            print_style: metadata.print_style.clone(),
            submitter: submission.publisher.clone(),
            submitlog: submission.message.clone(),
            created: metadata.created.clone(),
            revised: Utc::now().to_rfc3339(),
        }
    }

    /// Copy of this row at a new version number, revised now.
    ///
    /// Used when a collection is republished on behalf of a changed module:
    /// nobody submitted new metadata, so the previous version's metadata and
    /// submission details carry over.
    pub fn republication(&self, version: Version) -> Self {
        Self {
            id: None,
            major: version.major,
            minor: version.minor,
            revised: Utc::now().to_rfc3339(),
            ..self.clone()
        }
    }

    /// The version number of this row
    pub fn version(&self) -> Version {
        Version::new(self.major, self.minor)
    }

    /// The store-internal ident of this row
    pub fn ident(&self) -> Result<i64> {
        self.id
            .ok_or_else(|| Error::NotFound("version entry has not been inserted".to_string()))
    }

    /// Insert this version into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        let authors = to_json(&self.authors, "authors")?;
        let maintainers = to_json(&self.maintainers, "maintainers")?;
        let licensors = to_json(&self.licensors, "licensors")?;
        let keywords = to_json(&self.keywords, "keywords")?;
        let subjects = to_json(&self.subjects, "subjects")?;

        conn.execute(
            "INSERT INTO versions
             (item_uuid, major, minor, title, language, license_url, abstract,
              authors, maintainers, licensors, keywords, subjects, print_style,
              submitter, submitlog, created, revised)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                &self.item_uuid,
                self.major,
                self.minor,
                &self.title,
                &self.language,
                &self.license_url,
                &self.abstract_text,
                authors,
                maintainers,
                licensors,
                keywords,
                subjects,
                &self.print_style,
                &self.submitter,
                &self.submitlog,
                &self.created,
                &self.revised,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a version by its store-internal ident
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, item_uuid, major, minor, title, language, license_url, abstract,
                    authors, maintainers, licensors, keywords, subjects, print_style,
                    submitter, submitlog, created, revised
             FROM versions WHERE id = ?1",
        )?;

        let entry = stmt.query_row([id], Self::from_row).optional()?;

        Ok(entry)
    }

    /// Find the latest published version of an item
    pub fn find_latest(conn: &Connection, item_uuid: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, item_uuid, major, minor, title, language, license_url, abstract,
                    authors, maintainers, licensors, keywords, subjects, print_style,
                    submitter, submitlog, created, revised
             FROM versions WHERE item_uuid = ?1
             ORDER BY major DESC, minor DESC LIMIT 1",
        )?;

        let entry = stmt.query_row([item_uuid], Self::from_row).optional()?;

        Ok(entry)
    }

    /// Find one specific version of an item
    pub fn find_by_version(
        conn: &Connection,
        item_uuid: &str,
        version: Version,
    ) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, item_uuid, major, minor, title, language, license_url, abstract,
                    authors, maintainers, licensors, keywords, subjects, print_style,
                    submitter, submitlog, created, revised
             FROM versions WHERE item_uuid = ?1 AND major = ?2 AND minor IS ?3",
        )?;

        let entry = stmt
            .query_row(params![item_uuid, version.major, version.minor], Self::from_row)
            .optional()?;

        Ok(entry)
    }

    /// Full version history of an item, newest first
    pub fn history(conn: &Connection, item_uuid: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, item_uuid, major, minor, title, language, license_url, abstract,
                    authors, maintainers, licensors, keywords, subjects, print_style,
                    submitter, submitlog, created, revised
             FROM versions WHERE item_uuid = ?1
             ORDER BY major DESC, minor DESC",
        )?;

        let entries = stmt
            .query_map([item_uuid], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Convert a database row to a VersionEntry
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            item_uuid: row.get(1)?,
            major: row.get(2)?,
            minor: row.get(3)?,
            title: row.get(4)?,
            language: row.get(5)?,
            license_url: row.get(6)?,
            abstract_text: row.get(7)?,
            authors: from_json(row, 8)?,
            maintainers: from_json(row, 9)?,
            licensors: from_json(row, 10)?,
            keywords: from_json(row, 11)?,
            subjects: from_json(row, 12)?,
            print_style: row.get(13)?,
            submitter: row.get(14)?,
            submitlog: row.get(15)?,
            created: row.get(16)?,
            revised: row.get(17)?,
        })
    }
}

fn to_json(values: &[String], field: &str) -> Result<String> {
    serde_json::to_string(values)
        .map_err(|e| Error::ParseError(format!("Failed to serialize {field}: {e}")))
}

fn from_json(row: &Row, index: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(index)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}
