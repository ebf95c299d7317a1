// src/collxml/parser.rs

//! Streaming XML to [`Element`] tree conversion

use super::Element;
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parse a document into an [`Element`] tree.
///
/// Namespace prefixes are stripped from tags and attribute names, and
/// whitespace-only text is dropped. Text between a child's close tag and the
/// next sibling lands on that child's `tail`.
pub fn parse(document: &[u8]) -> Result<Element> {
    let mut reader = Reader::from_reader(document);
    let mut buf = Vec::new();

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                // The reader rejects mismatched close tags, so the stack
                // top is always the element being closed.
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::ParseError("unexpected close tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let unescaped = text.unescape()?;
                attach_text(&mut stack, unescaped.trim());
            }
            Event::CData(cdata) => {
                let raw = cdata.into_inner();
                let decoded = String::from_utf8_lossy(&raw);
                attach_text(&mut stack, decoded.trim());
            }
            Event::Eof => break,
            _ => {} // declaration, comments, processing instructions
        }
        buf.clear();
    }

    root.ok_or_else(|| Error::ParseError("document has no root element".to_string()))
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element> {
    let tag = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut element = Element::new(tag);

    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attrs.insert(name, value);
    }

    Ok(element)
}

fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_some() {
                return Err(Error::ParseError(
                    "document has more than one root element".to_string(),
                ));
            }
            *root = Some(element);
        }
    }
    Ok(())
}

fn attach_text(stack: &mut [Element], content: &str) {
    if content.is_empty() {
        return;
    }
    // Text outside the root element carries no content worth keeping
    let Some(current) = stack.last_mut() else {
        return;
    };

    let target = match current.children.last_mut() {
        Some(last_child) => &mut last_child.tail,
        None => &mut current.text,
    };
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(content);
}
