// src/db/models/file_entry.rs

//! File models - content-addressed bodies and the per-version name table

use crate::error::Result;
use crate::hash;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::collections::HashMap;

/// A stored file body, addressed by its SHA-1 digest.
///
/// Bodies are shared: publishing the same bytes twice stores them once,
/// and versions point at them through [`VersionFile`] rows.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub id: Option<i64>,
    pub sha1: String,
    pub sha256: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl FileEntry {
    /// Create a new FileEntry, computing both digests from the body
    pub fn new(media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id: None,
            sha1: hash::sha1(&data),
            sha256: hash::sha256(&data),
            media_type: media_type.into(),
            data,
        }
    }

    /// Insert this body, or adopt the existing row with the same digest
    pub fn insert_or_find(&mut self, conn: &Connection) -> Result<i64> {
        if let Some(found) = Self::find_by_sha1(conn, &self.sha1)? {
            if let Some(id) = found.id {
                self.id = Some(id);
                return Ok(id);
            }
        }

        conn.execute(
            "INSERT INTO files (sha1, sha256, media_type, data)
             VALUES (?1, ?2, ?3, ?4)",
            params![&self.sha1, &self.sha256, &self.media_type, &self.data],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a stored body by its SHA-1 digest
    pub fn find_by_sha1(conn: &Connection, sha1: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, sha1, sha256, media_type, data FROM files WHERE sha1 = ?1",
        )?;

        let file = stmt.query_row([sha1], Self::from_row).optional()?;

        Ok(file)
    }

    /// Convert a database row to a FileEntry
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            sha1: row.get(1)?,
            sha256: row.get(2)?,
            media_type: row.get(3)?,
            data: row.get(4)?,
        })
    }
}

/// A filename inside one version, pointing at a stored body.
///
/// The pair (version, filename) is unique, so a version is exactly a set
/// of named files. Republishing carries these rows forward rather than
/// copying the bodies they point at.
#[derive(Debug, Clone)]
pub struct VersionFile {
    pub id: Option<i64>,
    pub version_id: i64,
    pub file_id: i64,
    pub filename: String,
}

impl VersionFile {
    pub fn new(version_id: i64, file_id: i64, filename: impl Into<String>) -> Self {
        Self {
            id: None,
            version_id,
            file_id,
            filename: filename.into(),
        }
    }

    /// Insert this name row into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO version_files (version_id, file_id, filename)
             VALUES (?1, ?2, ?3)",
            params![self.version_id, self.file_id, &self.filename],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// All name rows of a version
    pub fn find_by_version(conn: &Connection, version_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, version_id, file_id, filename
             FROM version_files WHERE version_id = ?1 ORDER BY filename",
        )?;

        let files = stmt
            .query_map([version_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }

    /// Map every filename of a version to the SHA-1 of its body
    pub fn digest_map(conn: &Connection, version_id: i64) -> Result<HashMap<String, String>> {
        let mut stmt = conn.prepare(
            "SELECT vf.filename, f.sha1
             FROM version_files vf JOIN files f ON f.id = vf.file_id
             WHERE vf.version_id = ?1",
        )?;

        let pairs = stmt
            .query_map([version_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<HashMap<String, String>, _>>()?;

        Ok(pairs)
    }

    /// Load the stored body behind a filename of a version
    pub fn find_file(
        conn: &Connection,
        version_id: i64,
        filename: &str,
    ) -> Result<Option<FileEntry>> {
        let mut stmt = conn.prepare(
            "SELECT f.id, f.sha1, f.sha256, f.media_type, f.data
             FROM version_files vf JOIN files f ON f.id = vf.file_id
             WHERE vf.version_id = ?1 AND vf.filename = ?2",
        )?;

        let file = stmt
            .query_row(params![version_id, filename], FileEntry::from_row)
            .optional()?;

        Ok(file)
    }

    /// Copy the name rows of one version onto another, skipping the given
    /// filenames. Returns the number of rows carried.
    pub fn carry_forward(
        conn: &Connection,
        from_version_id: i64,
        to_version_id: i64,
        exclude: &[String],
    ) -> Result<usize> {
        let mut sql = String::from(
            "INSERT INTO version_files (version_id, file_id, filename)
             SELECT ?1, file_id, filename FROM version_files WHERE version_id = ?2",
        );
        let mut bind: Vec<&dyn ToSql> = vec![&to_version_id, &from_version_id];

        if !exclude.is_empty() {
            let placeholders = vec!["?"; exclude.len()].join(", ");
            sql.push_str(&format!(" AND filename NOT IN ({placeholders})"));
            for name in exclude {
                bind.push(name);
            }
        }

        let carried = conn.execute(&sql, &bind[..])?;
        Ok(carried)
    }

    /// Convert a database row to a VersionFile
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            version_id: row.get(1)?,
            file_id: row.get(2)?,
            filename: row.get(3)?,
        })
    }
}
