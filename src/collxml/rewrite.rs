// src/collxml/rewrite.rs

//! Streaming rewrites of submitted documents
//!
//! Published documents must carry the identity the store assigned, not
//! whatever the author left in the upload: the first `content-id` and
//! `version` elements get their text replaced before the bytes are stored,
//! and collection documents get their `module` references repointed at the
//! just-published versions. Everything else passes through untouched.

use crate::error::Result;
use crate::version::Version;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;

/// Replacement reference for one `module` element, keyed by the submitted
/// `document` attribute
#[derive(Debug, Clone)]
pub struct ReferenceUpdate {
    /// Published document identifier
    pub document: String,
    /// Published version in legacy notation
    pub legacy_version: String,
}

/// Rewrite the document's own identity to the published one.
///
/// Replaces the text of the first `content-id` and first `version` elements.
/// An empty `<md:version/>` is expanded into an open/close pair so the text
/// has somewhere to live.
pub fn set_identity(document: &[u8], content_id: &str, version: &Version) -> Result<Vec<u8>> {
    let legacy = version.to_legacy_string();
    let mut reader = Reader::from_reader(document);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();

    let mut content_id_done = false;
    let mut version_done = false;
    // Qualified name of the element whose original text is being dropped
    let mut swallowing: Option<Vec<u8>> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                let replacement = replacement_for(
                    &start,
                    content_id,
                    &legacy,
                    &mut content_id_done,
                    &mut version_done,
                );
                let name = start.name().as_ref().to_vec();
                writer.write_event(Event::Start(start))?;
                if let Some(value) = replacement {
                    writer.write_event(Event::Text(BytesText::new(&value)))?;
                    swallowing = Some(name);
                }
            }
            Event::Empty(start) => {
                let replacement = replacement_for(
                    &start,
                    content_id,
                    &legacy,
                    &mut content_id_done,
                    &mut version_done,
                );
                match replacement {
                    Some(value) => {
                        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                        let mut open = BytesStart::new(name.clone());
                        for attr in start.attributes() {
                            let attr = attr.map_err(quick_xml::Error::from)?;
                            open.push_attribute(attr);
                        }
                        writer.write_event(Event::Start(open))?;
                        writer.write_event(Event::Text(BytesText::new(&value)))?;
                        writer.write_event(Event::End(BytesEnd::new(name)))?;
                    }
                    None => writer.write_event(Event::Empty(start))?,
                }
            }
            Event::Text(text) => {
                if swallowing.is_none() {
                    writer.write_event(Event::Text(text))?;
                }
            }
            Event::CData(cdata) => {
                if swallowing.is_none() {
                    writer.write_event(Event::CData(cdata))?;
                }
            }
            Event::End(end) => {
                if swallowing.as_deref() == Some(end.name().as_ref()) {
                    swallowing = None;
                }
                writer.write_event(Event::End(end))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

fn replacement_for(
    start: &BytesStart<'_>,
    content_id: &str,
    legacy: &str,
    content_id_done: &mut bool,
    version_done: &mut bool,
) -> Option<String> {
    match start.local_name().as_ref() {
        b"content-id" if !*content_id_done => {
            *content_id_done = true;
            Some(content_id.to_string())
        }
        b"version" if !*version_done => {
            *version_done = true;
            Some(legacy.to_string())
        }
        _ => None,
    }
}

/// Repoint `module` elements at freshly published versions.
///
/// Each `module` element whose `document` attribute appears in `updates` gets
/// that attribute replaced with the published identifier and its
/// `version-at-this-collection-version` attribute set to the published legacy
/// version, added if the element did not carry one. Module elements not in
/// the map pass through unchanged.
pub fn point_module_references(
    document: &[u8],
    updates: &HashMap<String, ReferenceUpdate>,
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(document);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => match rewrite_module_start(&start, updates)? {
                Some(rebuilt) => writer.write_event(Event::Start(rebuilt))?,
                None => writer.write_event(Event::Start(start))?,
            },
            Event::Empty(start) => match rewrite_module_start(&start, updates)? {
                Some(rebuilt) => writer.write_event(Event::Empty(rebuilt))?,
                None => writer.write_event(Event::Empty(start))?,
            },
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

fn rewrite_module_start(
    start: &BytesStart<'_>,
    updates: &HashMap<String, ReferenceUpdate>,
) -> Result<Option<BytesStart<'static>>> {
    if start.local_name().as_ref() != b"module" {
        return Ok(None);
    }

    let mut update: Option<&ReferenceUpdate> = None;
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == b"document" {
            update = updates.get(attr.unescape_value()?.as_ref());
            break;
        }
    }
    let Some(update) = update else {
        return Ok(None);
    };

    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut rebuilt = BytesStart::new(name);
    let mut has_version_attr = false;

    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == b"document" {
            rebuilt.push_attribute(("document", update.document.as_str()));
        } else if attr.key.local_name().as_ref() == b"version-at-this-collection-version" {
            has_version_attr = true;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            rebuilt.push_attribute((key.as_str(), update.legacy_version.as_str()));
        } else {
            rebuilt.push_attribute(attr);
        }
    }
    if !has_version_attr {
        // Collection roots declare the cnxorg prefix, so the qualified
        // name can be added without touching the namespace declarations.
        rebuilt.push_attribute((
            "cnxorg:version-at-this-collection-version",
            update.legacy_version.as_str(),
        ));
    }

    Ok(Some(rebuilt))
}
