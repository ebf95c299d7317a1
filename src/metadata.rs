// src/metadata.rs

//! Metadata extraction from parsed documents
//!
//! Both document kinds carry the same metadata section; collections add a
//! print style parameter outside it. Extraction is scoped to the `metadata`
//! subtree so a document-level `<title>` never shadows the metadata title.

use crate::collxml::Element;
use crate::error::{Error, Result};

/// Metadata common to modules and collections
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentMetadata {
    /// Repository identifier the author claims, absent for new content
    pub id: Option<String>,
    /// The legacy version the submission was derived from
    pub version: String,
    pub created: String,
    pub revised: String,
    pub title: String,
    pub license_url: String,
    pub language: String,
    pub authors: Vec<String>,
    pub maintainers: Vec<String>,
    pub licensors: Vec<String>,
    pub keywords: Vec<String>,
    pub subjects: Vec<String>,
    pub abstract_text: Option<String>,
    /// Collections only, from the `print-style` parameter
    pub print_style: Option<String>,
}

/// Extract metadata from a parsed module document
pub fn parse_module_metadata(root: &Element) -> Result<DocumentMetadata> {
    parse_common(root)
}

/// Extract metadata from a parsed collection document
pub fn parse_collection_metadata(root: &Element) -> Result<DocumentMetadata> {
    let mut metadata = parse_common(root)?;
    metadata.print_style = print_style(root);
    Ok(metadata)
}

fn parse_common(root: &Element) -> Result<DocumentMetadata> {
    let md = root
        .find("metadata")
        .ok_or_else(|| Error::ParseError("document has no <metadata> section".to_string()))?;

    Ok(DocumentMetadata {
        id: optional_text(md, "content-id"),
        version: required_text(md, "version")?,
        created: required_text(md, "created")?,
        revised: required_text(md, "revised")?,
        title: required_text(md, "title")?,
        license_url: license_url(md)?,
        language: required_text(md, "language")?,
        authors: role_members(md, "author"),
        maintainers: role_members(md, "maintainer"),
        licensors: role_members(md, "licensor"),
        keywords: list_values(md, "keywordlist", "keyword"),
        subjects: list_values(md, "subjectlist", "subject"),
        abstract_text: optional_text(md, "abstract"),
        print_style: None,
    })
}

fn required_text(md: &Element, tag: &str) -> Result<String> {
    let text = md
        .find(tag)
        .ok_or_else(|| Error::ParseError(format!("missing metadata element <{tag}>")))?
        .all_text();
    if text.is_empty() {
        return Err(Error::ParseError(format!("metadata element <{tag}> is empty")));
    }
    Ok(text)
}

fn optional_text(md: &Element, tag: &str) -> Option<String> {
    md.find(tag)
        .map(|e| e.all_text())
        .filter(|text| !text.is_empty())
}

fn license_url(md: &Element) -> Result<String> {
    let license = md
        .find("license")
        .ok_or_else(|| Error::ParseError("missing metadata element <license>".to_string()))?;
    Ok(license.require_attr("url")?.to_string())
}

/// Members of the first role element of the given type, whitespace separated
fn role_members(md: &Element, role_type: &str) -> Vec<String> {
    md.find_all("role")
        .into_iter()
        .find(|role| role.attr("type") == Some(role_type))
        .map(|role| role.text.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn list_values(md: &Element, list_tag: &str, item_tag: &str) -> Vec<String> {
    md.find(list_tag)
        .map(|list| list.children_tagged(item_tag).map(|e| e.all_text()).collect())
        .unwrap_or_default()
}

fn print_style(root: &Element) -> Option<String> {
    root.find_all("param")
        .into_iter()
        .find(|param| param.attr("name") == Some("print-style"))
        .and_then(|param| param.attr("value"))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
