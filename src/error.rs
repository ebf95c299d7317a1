// src/error.rs

//! Error types for the bindery publishing engine

use thiserror::Error;

/// Errors surfaced by publish and store operations
#[derive(Error, Debug)]
pub enum Error {
    /// Submitted content is byte-for-byte identical to the latest published version
    #[error("content of '{0}' is identical to the latest published version")]
    Unchanged(String),

    /// Submission was derived from a version that is no longer the latest
    #[error("stale version for '{item}': derived from {claimed} but latest published is {current}")]
    StaleVersion {
        item: String,
        claimed: String,
        current: String,
    },

    /// A concurrent writer won the race for the same version slot
    #[error("conflict: {0}")]
    ConflictError(String),

    /// Referenced content does not exist in the store
    #[error("not found: {0}")]
    NotFound(String),

    /// Document or metadata is structurally invalid
    #[error("parse error: {0}")]
    ParseError(String),

    /// Underlying SQLite failure
    #[error("database error: {0}")]
    DatabaseError(#[source] rusqlite::Error),

    /// XML reader or writer failure
    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// I/O failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// Busy, locked, and constraint failures are how SQLite reports a lost race
// between two writers publishing the same version slot. Callers are expected
// to re-read the latest version and retry, so those surface as ConflictError
// rather than a plain database error.
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(cause, _) = &err {
            match cause.code {
                rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked
                | rusqlite::ErrorCode::ConstraintViolation => {
                    return Error::ConflictError(err.to_string());
                }
                _ => {}
            }
        }
        Error::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
