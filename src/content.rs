// src/content.rs

//! Core content types: kinds, submissions, and upload payloads

use crate::hash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two kinds of publishable content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// A leaf document
    Module,
    /// An ordered tree of modules and nested collections
    Collection,
}

impl ContentKind {
    pub fn as_str(&self) -> &str {
        match self {
            ContentKind::Module => "Module",
            ContentKind::Collection => "Collection",
        }
    }

    /// Filename of the primary document inside an upload of this kind
    pub fn primary_filename(&self) -> &'static str {
        match self {
            ContentKind::Module => "index.cnxml",
            ContentKind::Collection => "collection.xml",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Module" => Ok(ContentKind::Module),
            "Collection" => Ok(ContentKind::Collection),
            _ => Err(format!("Invalid content kind: {s}")),
        }
    }
}

/// Who is publishing, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Account name of the publisher
    pub publisher: String,
    /// Publication message recorded on every version this submission creates
    pub message: String,
}

impl Submission {
    pub fn new(publisher: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            publisher: publisher.into(),
            message: message.into(),
        }
    }
}

/// An auxiliary file accompanying a document, e.g. an image
#[derive(Debug, Clone)]
pub struct Resource {
    pub filename: String,
    pub media_type: String,
    pub data: Vec<u8>,
    /// SHA-1 content address, computed at construction
    pub sha1: String,
}

impl Resource {
    pub fn new(filename: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        let sha1 = hash::sha1(&data);
        Self {
            filename: filename.into(),
            media_type: media_type.into(),
            data,
            sha1,
        }
    }
}

/// A module as it arrives in an upload
#[derive(Debug, Clone)]
pub struct ModuleSource {
    /// Repository identifier, e.g. `m10000`
    pub content_id: String,
    /// Raw `index.cnxml` bytes
    pub document: Vec<u8>,
    pub resources: Vec<Resource>,
}

impl ModuleSource {
    pub fn new(content_id: impl Into<String>, document: Vec<u8>) -> Self {
        Self {
            content_id: content_id.into(),
            document,
            resources: Vec::new(),
        }
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }
}

/// A collection as it arrives in an upload
#[derive(Debug, Clone)]
pub struct CollectionSource {
    /// Repository identifier, e.g. `col11405`
    pub content_id: String,
    /// Raw `collection.xml` bytes
    pub document: Vec<u8>,
    pub resources: Vec<Resource>,
}

impl CollectionSource {
    pub fn new(content_id: impl Into<String>, document: Vec<u8>) -> Self {
        Self {
            content_id: content_id.into(),
            document,
            resources: Vec::new(),
        }
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [ContentKind::Module, ContentKind::Collection] {
            let parsed = kind.as_str().parse::<ContentKind>().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("Folder".parse::<ContentKind>().is_err());
    }

    #[test]
    fn test_primary_filenames() {
        assert_eq!(ContentKind::Module.primary_filename(), "index.cnxml");
        assert_eq!(ContentKind::Collection.primary_filename(), "collection.xml");
    }

    #[test]
    fn test_resource_addresses_its_data() {
        let resource = Resource::new("figure1.png", "image/png", b"not really a png".to_vec());
        assert_eq!(resource.sha1, hash::sha1(b"not really a png"));
    }
}
