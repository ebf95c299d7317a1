// src/version.rs

//! Version numbers and the revision policy
//!
//! Every published version carries a major number, and collection versions
//! additionally carry a minor number. Modules only ever move along the major
//! axis. Collections bump the minor for metadata-level edits and the major
//! for structural edits, and the minor is carried across a major bump rather
//! than reset, so `(1, 2)` steps to `(2, 2)`.

use crate::content::ContentKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How far a new version steps from its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revision {
    /// Structural change: membership, ordering, or content sequence
    Major,
    /// Metadata-level change
    Minor,
}

/// A published version number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: i64,
    /// Present for collections, absent for modules
    pub minor: Option<i64>,
}

impl Version {
    pub fn new(major: i64, minor: Option<i64>) -> Self {
        Self { major, minor }
    }

    /// The version assigned to a first publication
    pub fn first(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Module => Self::new(1, None),
            ContentKind::Collection => Self::new(1, Some(1)),
        }
    }

    /// Compute the successor version under the revision policy.
    ///
    /// Modules always take a major step regardless of the requested
    /// revision, since they have no minor axis to move along.
    pub fn next(&self, kind: ContentKind, revision: Revision) -> Self {
        match kind {
            ContentKind::Module => Self::new(self.major + 1, None),
            ContentKind::Collection => match revision {
                Revision::Major => Self::new(self.major + 1, self.minor),
                Revision::Minor => Self::new(self.major, Some(self.minor.unwrap_or(0) + 1)),
            },
        }
    }

    /// Render the identifier the legacy repository understands.
    ///
    /// The legacy scheme is single-axis and always prefixed `1.`: a module at
    /// major 3 is `1.3`, a collection at (2, 5) is `1.5`. Round-tripping the
    /// two-axis number through this form is lossy, which is why staleness is
    /// checked against the rendered string rather than a parsed version.
    pub fn to_legacy_string(&self) -> String {
        format!("1.{}", self.minor.unwrap_or(self.major))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minor {
            Some(minor) => write!(f, "{}.{}", self.major, minor),
            None => write!(f, "{}", self.major),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_versions() {
        assert_eq!(Version::first(ContentKind::Module), Version::new(1, None));
        assert_eq!(
            Version::first(ContentKind::Collection),
            Version::new(1, Some(1))
        );
    }

    #[test]
    fn test_module_bump_is_always_major() {
        let v = Version::new(4, None);
        assert_eq!(v.next(ContentKind::Module, Revision::Major), Version::new(5, None));
        assert_eq!(v.next(ContentKind::Module, Revision::Minor), Version::new(5, None));
    }

    #[test]
    fn test_collection_minor_bump() {
        let v = Version::new(1, Some(2));
        assert_eq!(
            v.next(ContentKind::Collection, Revision::Minor),
            Version::new(1, Some(3))
        );
    }

    #[test]
    fn test_collection_major_bump_carries_minor() {
        let v = Version::new(1, Some(2));
        assert_eq!(
            v.next(ContentKind::Collection, Revision::Major),
            Version::new(2, Some(2))
        );
    }

    #[test]
    fn test_versions_are_monotonic() {
        let mut v = Version::first(ContentKind::Collection);
        for revision in [Revision::Minor, Revision::Major, Revision::Minor, Revision::Major] {
            let bumped = v.next(ContentKind::Collection, revision);
            assert!(bumped > v, "{bumped} should sort after {v}");
            v = bumped;
        }
        assert_eq!(v, Version::new(3, Some(3)));
    }

    #[test]
    fn test_legacy_string() {
        assert_eq!(Version::new(3, None).to_legacy_string(), "1.3");
        assert_eq!(Version::new(2, Some(5)).to_legacy_string(), "1.5");
        assert_eq!(Version::first(ContentKind::Module).to_legacy_string(), "1.1");
        assert_eq!(
            Version::first(ContentKind::Collection).to_legacy_string(),
            "1.1"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Version::new(2, None).to_string(), "2");
        assert_eq!(Version::new(2, Some(4)).to_string(), "2.4");
    }
}
