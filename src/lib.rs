// src/lib.rs

//! Bindery - versioned publishing for modular educational content
//!
//! A library that republishes structured content into an append-only
//! SQLite store, reproducing the legacy repository's versioning behavior.
//!
//! # Architecture
//!
//! - Database-first: every published version is a frozen row, never edited
//! - Modules: leaf documents, versioned along a single major axis
//! - Collections: ordered trees of references, versioned (major, minor)
//! - Content-addressed files: bodies stored once per digest, shared across
//!   versions
//! - Cascading republication: changing a module minor-bumps every
//!   collection whose current tree contains it, to any depth

pub mod classify;
pub mod collxml;
pub mod config;
pub mod content;
pub mod db;
mod error;
pub mod guard;
pub mod hash;
pub mod logging;
pub mod metadata;
pub mod publish;
pub mod version;

pub use classify::{classify, needs_major_revision, needs_minor_revision};
pub use collxml::{Element, ElementKey};
pub use config::Settings;
pub use content::{CollectionSource, ContentKind, ModuleSource, Resource, Submission};
pub use error::{Error, Result};
pub use guard::DigestSet;
pub use hash::{Hash, HashAlgorithm, Hasher};
pub use metadata::DocumentMetadata;
pub use publish::{
    ChangeMap, PublishedItem, UploadResult, publish_collection, publish_module, publish_upload,
    republish_ancestors,
};
pub use version::{Revision, Version};
