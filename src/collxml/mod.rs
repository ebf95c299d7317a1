// src/collxml/mod.rs

//! In-memory model of collection and module XML documents
//!
//! Documents are parsed into a namespace-agnostic [`Element`] tree: tags and
//! attribute names keep only their local part, and whitespace-only text is
//! dropped. Equality of elements for revision classification is defined by
//! [`ElementKey`], which looks at the tag, the text, the trailing tail text,
//! and the `document` attribute that module references carry. Everything
//! else (ids, styling attributes) is deliberately outside the identity.

mod parser;
mod rewrite;

pub use parser::parse;
pub use rewrite::{point_module_references, set_identity, ReferenceUpdate};

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// One node of a parsed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Local tag name, namespace prefix stripped
    pub tag: String,
    /// Attributes by local name
    pub attrs: BTreeMap<String, String>,
    /// Text before the first child, empty when absent
    pub text: String,
    /// Text between this element's close tag and the next sibling
    pub tail: String,
    pub children: Vec<Element>,
}

/// Identity of an element for revision classification
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey {
    pub tag: String,
    pub text: String,
    pub tail: String,
    /// The `document` attribute, empty for elements that have none
    pub document: String,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            text: String::new(),
            tail: String::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Look up an attribute that the document format requires
    pub fn require_attr(&self, name: &str) -> Result<&str> {
        self.attr(name).ok_or_else(|| {
            Error::ParseError(format!("<{}> element has no '{}' attribute", self.tag, name))
        })
    }

    /// Depth-first iterator over this element and all descendants
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    /// First element with the given tag, in document order, self included
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.iter().find(|e| e.tag == tag)
    }

    /// All elements with the given tag, in document order, self included
    pub fn find_all(&self, tag: &str) -> Vec<&Element> {
        self.iter().filter(|e| e.tag == tag).collect()
    }

    /// First direct child with the given tag
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|e| e.tag == tag)
    }

    /// Direct children with the given tag
    pub fn children_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |e| e.tag == tag)
    }

    /// Walk a `/`-separated path of tags, descending through the first
    /// matching child at each step. The leading segment may name this
    /// element itself, so `collection/metadata/title` works from the root.
    pub fn find_by_path(&self, path: &str) -> Option<&Element> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let first = segments.next()?;

        let mut current = if self.tag == first {
            self
        } else {
            self.child(first)?
        };
        for segment in segments {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Concatenated text content: this element's text plus every
    /// descendant's text and tail, in document order, space separated
    pub fn all_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        self.collect_text(&mut parts);
        parts.join(" ")
    }

    fn collect_text<'a>(&'a self, parts: &mut Vec<&'a str>) {
        if !self.text.is_empty() {
            parts.push(&self.text);
        }
        for child in &self.children {
            child.collect_text(parts);
            if !child.tail.is_empty() {
                parts.push(&child.tail);
            }
        }
    }

    /// Identity of this element for revision classification
    pub fn key(&self) -> ElementKey {
        ElementKey {
            tag: self.tag.clone(),
            text: self.text.clone(),
            tail: self.tail.clone(),
            document: self.attr("document").unwrap_or("").to_string(),
        }
    }
}

pub struct Iter<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<&'a Element> {
        let node = self.stack.pop()?;
        // Children pushed in reverse so the first child is visited next
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (name, value) in &self.attrs {
            write!(f, " {}=\"{}\"", name, value)?;
        }
        write!(f, ">{}</{}>", self.text, self.tag)?;
        if !self.tail.is_empty() {
            write!(f, "{}", self.tail)?;
        }
        Ok(())
    }
}
