// src/guard.rs

//! Pre-publish guards: reject unchanged uploads and stale submissions

use crate::content::Resource;
use crate::error::{Error, Result};
use crate::hash;
use std::collections::HashMap;

/// SHA-1 digests of the files attached to a published version, by filename
#[derive(Debug, Clone, Default)]
pub struct DigestSet {
    digests: HashMap<String, String>,
}

impl DigestSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, filename: impl Into<String>, sha1: impl Into<String>) {
        self.digests.insert(filename.into(), sha1.into());
    }

    pub fn get(&self, filename: &str) -> Option<&str> {
        self.digests.get(filename).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

impl From<HashMap<String, String>> for DigestSet {
    fn from(digests: HashMap<String, String>) -> Self {
        Self { digests }
    }
}

impl FromIterator<(String, String)> for DigestSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            digests: iter.into_iter().collect(),
        }
    }
}

/// Decide whether an upload is identical to the published version.
///
/// Identical means the primary document hashes to the stored digest, every
/// submitted resource matches the stored file of the same name, and no
/// submitted filename is new. Files present in the store but absent from the
/// upload do not count as a change.
pub fn is_unchanged(
    primary_document: &[u8],
    primary_filename: &str,
    resources: &[Resource],
    published: &DigestSet,
) -> bool {
    match published.get(primary_filename) {
        Some(stored) if stored == hash::sha1(primary_document) => {}
        _ => return false,
    }

    resources
        .iter()
        .all(|res| published.get(&res.filename) == Some(res.sha1.as_str()))
}

/// Reject a submission derived from anything but the latest published
/// version. Comparison is on the rendered legacy string, the only identifier
/// authors ever see.
pub fn check_not_stale(item: &str, claimed: &str, current: &str) -> Result<()> {
    if claimed != current {
        return Err(Error::StaleVersion {
            item: item.to_string(),
            claimed: claimed.to_string(),
            current: current.to_string(),
        });
    }
    Ok(())
}
