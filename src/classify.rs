// src/classify.rs

//! Revision classification for collection republishes
//!
//! Given the previously published document and the incoming one, decide how
//! far the version must step. Structural differences force a major revision;
//! metadata-level differences settle for a minor one. Major always wins, so
//! the minor checks only run when every structural check passes.

use crate::collxml::{Element, ElementKey};
use crate::version::Revision;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Classify the difference between two parsed collection documents.
///
/// Returns `None` when neither a structural nor a metadata-level difference
/// is found; the caller then falls back to its own policy (a content change
/// that slips past both checks still deserves a minor bump).
pub fn classify(before: &Element, after: &Element) -> Option<Revision> {
    if needs_major_revision(before, after) {
        Some(Revision::Major)
    } else if needs_minor_revision(before, after) {
        Some(Revision::Minor)
    } else {
        None
    }
}

/// Structural comparison: module membership, the leading title, and the
/// full depth-first content sequence.
pub fn needs_major_revision(before: &Element, after: &Element) -> bool {
    // Membership is a set comparison, so reordering alone does not trip it
    let before_modules: HashSet<ElementKey> =
        before.find_all("module").into_iter().map(Element::key).collect();
    let after_modules: HashSet<ElementKey> =
        after.find_all("module").into_iter().map(Element::key).collect();
    if before_modules != after_modules {
        return true;
    }

    let before_title = before.find("title").map(Element::all_text);
    let after_title = after.find("title").map(Element::all_text);
    if before_title != after_title {
        return true;
    }

    // The sequence comparison covers ordering and length, which is where a
    // reorder of otherwise identical modules gets caught
    match (before.find("content"), after.find("content")) {
        (Some(b), Some(a)) => !b.iter().map(Element::key).eq(a.iter().map(Element::key)),
        (None, None) => false,
        _ => true,
    }
}

/// Metadata-level comparison: abstract, subjects, parameters, actors,
/// and role assignments.
pub fn needs_minor_revision(before: &Element, after: &Element) -> bool {
    let abstract_of = |root: &Element| root.find("abstract").map(Element::key);
    if abstract_of(before) != abstract_of(after) {
        return true;
    }

    let subjects_of = |root: &Element| -> BTreeSet<String> {
        root.find("subjectlist")
            .map(|list| list.children_tagged("subject").map(Element::all_text).collect())
            .unwrap_or_default()
    };
    if subjects_of(before) != subjects_of(after) {
        return true;
    }

    let params_of = |root: &Element| -> HashMap<String, String> {
        root.find_all("param")
            .into_iter()
            .map(|param| {
                (
                    param.attr("name").unwrap_or("").to_string(),
                    param.attr("value").unwrap_or("").to_string(),
                )
            })
            .collect()
    };
    if params_of(before) != params_of(after) {
        return true;
    }

    let actors_of = |root: &Element| -> BTreeSet<(String, String, String)> {
        root.find_all("person")
            .into_iter()
            .map(|person| {
                let field = |tag| {
                    person
                        .child(tag)
                        .map(|e| e.text.clone())
                        .unwrap_or_default()
                };
                (field("firstname"), field("surname"), field("fullname"))
            })
            .collect()
    };
    if actors_of(before) != actors_of(after) {
        return true;
    }

    let roles_of = |root: &Element| -> HashMap<String, BTreeSet<String>> {
        root.find_all("role")
            .into_iter()
            .map(|role| {
                (
                    role.attr("type").unwrap_or("").to_string(),
                    role.text.split_whitespace().map(str::to_string).collect(),
                )
            })
            .collect()
    };
    roles_of(before) != roles_of(after)
}
