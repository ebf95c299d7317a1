// src/db/schema.rs

//! Database schema definitions and migrations for the content store
//!
//! This module defines the SQLite schema for all core tables and provides
//! a migration system to evolve the schema over time.

use crate::error::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Apply all pending migrations to bring the database up to date
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    info!("Current schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        info!("Schema is up to date");
        return Ok(());
    }

    // Apply migrations in order
    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!(
        "Schema migration complete. Now at version {}",
        SCHEMA_VERSION
    );
    Ok(())
}

/// Apply a specific migration version
fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => panic!("Unknown migration version: {}", version),
    }
}

/// Initial schema - Version 1
///
/// Creates all core tables for the content store:
/// - content_items: Stable identity of every module and collection
/// - versions: Append-only version history with full metadata
/// - tree_nodes: Frozen collection trees, one per collection version
/// - files: Content-addressed file bodies
/// - version_files: Filename links from versions to files
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        -- Content items: one row per module or collection, identity only
        CREATE TABLE content_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content_id TEXT NOT NULL UNIQUE,
            uuid TEXT NOT NULL UNIQUE,
            kind TEXT NOT NULL CHECK(kind IN ('Module', 'Collection')),
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        -- Versions: append-only, metadata frozen at publish time
        CREATE TABLE versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_uuid TEXT NOT NULL,
            major INTEGER NOT NULL,
            minor INTEGER,
            title TEXT NOT NULL,
            language TEXT NOT NULL,
            license_url TEXT NOT NULL,
            abstract TEXT,
            authors TEXT NOT NULL DEFAULT '[]',
            maintainers TEXT NOT NULL DEFAULT '[]',
            licensors TEXT NOT NULL DEFAULT '[]',
            keywords TEXT NOT NULL DEFAULT '[]',
            subjects TEXT NOT NULL DEFAULT '[]',
            print_style TEXT,
            submitter TEXT NOT NULL,
            submitlog TEXT NOT NULL,
            created TEXT NOT NULL,
            revised TEXT NOT NULL,
            FOREIGN KEY (item_uuid) REFERENCES content_items(uuid)
        );

        CREATE INDEX idx_versions_item_uuid ON versions(item_uuid);

        -- SQLite treats NULLs as distinct in plain UNIQUE constraints, so
        -- module versions (minor always NULL) need the COALESCE form to
        -- make duplicate inserts collide
        CREATE UNIQUE INDEX idx_versions_identity
            ON versions(item_uuid, major, COALESCE(minor, -1));

        -- Tree nodes: the frozen shape of one collection version. The root
        -- points at the owning collection version; leaf nodes point at
        -- module versions; heading nodes point at nothing.
        CREATE TABLE tree_nodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_id INTEGER,
            document_version_id INTEGER,
            title TEXT,
            child_order INTEGER NOT NULL DEFAULT 0,
            latest INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY (parent_id) REFERENCES tree_nodes(id),
            FOREIGN KEY (document_version_id) REFERENCES versions(id)
        );

        CREATE INDEX idx_tree_nodes_parent ON tree_nodes(parent_id);
        CREATE INDEX idx_tree_nodes_document ON tree_nodes(document_version_id);

        -- Files: deduplicated bodies, addressed by SHA-1 with a SHA-256
        -- integrity digest alongside
        CREATE TABLE files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sha1 TEXT NOT NULL UNIQUE,
            sha256 TEXT NOT NULL,
            media_type TEXT NOT NULL,
            data BLOB NOT NULL
        );

        -- Version files: filename links from a version to its file bodies
        CREATE TABLE version_files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version_id INTEGER NOT NULL,
            file_id INTEGER NOT NULL,
            filename TEXT NOT NULL,
            UNIQUE(version_id, filename),
            FOREIGN KEY (version_id) REFERENCES versions(id),
            FOREIGN KEY (file_id) REFERENCES files(id)
        );

        CREATE INDEX idx_version_files_version ON version_files(version_id);
        ",
    )?;

    Ok(())
}
