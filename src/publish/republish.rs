// src/publish/republish.rs

//! Cascading republication of containing collections
//!
//! When content changes, every collection whose current tree contains it
//! gets exactly one new minor version whose tree references the new
//! versions. Containment is transitive, so discovery keeps feeding freshly
//! affected collections back in until nothing new appears. All versions
//! are minted before any tree is rebuilt, which makes the rebuild order
//! irrelevant even when affected collections contain each other.

use crate::content::ContentKind;
use crate::db::models::{ContentItem, TreeNode, VersionEntry, VersionFile};
use crate::error::{Error, Result};
use crate::publish::ChangeMap;
use crate::version::Revision;
use rusqlite::Connection;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Republish every collection containing something in the change map.
///
/// `exclude` names a collection that must not be republished even though it
/// references changed content, used for the collection published in the
/// same request. Uuids already in the change map are likewise never
/// republished. Returns `(content_id, legacy version)` for each collection
/// the cascade touched; an empty change map touches nothing.
pub fn republish_ancestors(
    conn: &Connection,
    change_map: &ChangeMap,
    exclude: Option<&str>,
) -> Result<Vec<(String, String)>> {
    if change_map.is_empty() {
        return Ok(Vec::new());
    }

    let mut working = change_map.clone();
    let mut seen: BTreeSet<String> = working.keys().cloned().collect();
    if let Some(uuid) = exclude {
        seen.insert(uuid.to_string());
    }

    // Discovery to a fixpoint. The excluded collection seeds discovery like
    // any changed item: it will not be republished, but its containers are
    // affected by it.
    let mut affected: Vec<String> = Vec::new();
    let mut frontier: Vec<String> = seen.iter().cloned().collect();
    while !frontier.is_empty() {
        let containing = TreeNode::find_containing_collections(conn, &frontier)?;
        frontier = containing
            .into_iter()
            .filter(|uuid| seen.insert(uuid.clone()))
            .collect();
        affected.extend(frontier.iter().cloned());
    }

    if affected.is_empty() {
        return Ok(Vec::new());
    }

    // Mint every new version before rebuilding any tree, so each rebuild
    // sees the complete map of replacement versions.
    let mut minted: Vec<(String, VersionEntry, i64)> = Vec::new();
    for uuid in &affected {
        let previous = VersionEntry::find_latest(conn, uuid)?.ok_or_else(|| {
            Error::NotFound(format!("collection '{uuid}' has no published version"))
        })?;
        let version = previous.version().next(ContentKind::Collection, Revision::Minor);
        let mut entry = previous.republication(version);
        let ident = entry.insert(conn)?;
        VersionFile::carry_forward(conn, previous.ident()?, ident, &[])?;

        debug!("minted {} for collection {}", version, uuid);
        working.insert(uuid.clone(), version);
        minted.push((uuid.clone(), entry, previous.ident()?));
    }

    let mut republished = Vec::new();
    for (uuid, entry, previous_ident) in &minted {
        rebuild_tree(conn, *previous_ident, entry, &working)?;
        let item = ContentItem::find_by_uuid(conn, uuid)?
            .ok_or_else(|| Error::NotFound(format!("item '{uuid}' is missing")))?;

        info!(
            "republished collection {} at {}",
            item.content_id,
            entry.version()
        );
        republished.push((item.content_id, entry.version().to_legacy_string()));
    }

    Ok(republished)
}

/// Copy the previous version's tree for a freshly minted collection
/// version, substituting changed references.
fn rebuild_tree(
    conn: &Connection,
    previous_ident: i64,
    entry: &VersionEntry,
    change: &ChangeMap,
) -> Result<()> {
    let root = TreeNode::find_root(conn, previous_ident)?
        .ok_or_else(|| Error::NotFound(format!("no tree for version {previous_ident}")))?;

    let mut arena = Arena::load(conn, &root)?;
    arena.substitute(entry.ident()?, |old_ident| {
        let target = VersionEntry::find_by_id(conn, old_ident)?
            .ok_or_else(|| Error::NotFound(format!("version {old_ident} is missing")))?;
        match change.get(&target.item_uuid) {
            Some(version) => {
                let replacement =
                    VersionEntry::find_by_version(conn, &target.item_uuid, *version)?.ok_or_else(
                        || {
                            Error::NotFound(format!(
                                "item '{}' has no version {version}",
                                target.item_uuid
                            ))
                        },
                    )?;
                Ok(Some(replacement.ident()?))
            }
            None => Ok(None),
        }
    })?;

    arena.insert_with(|parent_id, node| {
        TreeNode::new(
            parent_id,
            node.document_version_id,
            node.title.clone(),
            node.child_order,
            node.latest,
        )
        .insert(conn)
    })?;

    Ok(())
}

/// Flattened copy of one stored tree, parent always before child
struct Arena {
    nodes: Vec<ArenaNode>,
}

struct ArenaNode {
    parent: Option<usize>,
    document_version_id: Option<i64>,
    title: Option<String>,
    child_order: i64,
    latest: bool,
}

impl Arena {
    /// Read a stored tree into the arena in depth-first pre-order
    fn load(conn: &Connection, root: &TreeNode) -> Result<Self> {
        let mut nodes = Vec::new();
        let mut stack: Vec<(TreeNode, Option<usize>)> = vec![(root.clone(), None)];

        while let Some((node, parent)) = stack.pop() {
            let index = nodes.len();
            let children = TreeNode::children_of(conn, node.ident()?)?;
            nodes.push(ArenaNode {
                parent,
                document_version_id: node.document_version_id,
                title: node.title,
                child_order: node.child_order,
                latest: node.latest,
            });
            for child in children.into_iter().rev() {
                stack.push((child, Some(index)));
            }
        }

        Ok(Self { nodes })
    }

    /// Point the root at the minted version and every latest-tracking node
    /// at whatever the resolver maps its old version to. Pinned nodes and
    /// headings are left alone.
    fn substitute<F>(&mut self, root_ident: i64, mut resolve: F) -> Result<()>
    where
        F: FnMut(i64) -> Result<Option<i64>>,
    {
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if index == 0 {
                node.document_version_id = Some(root_ident);
                continue;
            }
            if !node.latest {
                continue;
            }
            if let Some(old_ident) = node.document_version_id {
                if let Some(new_ident) = resolve(old_ident)? {
                    node.document_version_id = Some(new_ident);
                }
            }
        }
        Ok(())
    }

    /// Run `insert` over the arena parent-before-child, handing each call
    /// the store id its parent was assigned. Returns the assigned ids by
    /// arena index.
    fn insert_with<F>(&self, mut insert: F) -> Result<Vec<i64>>
    where
        F: FnMut(Option<i64>, &ArenaNode) -> Result<i64>,
    {
        let mut assigned: Vec<i64> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let parent_id = node.parent.map(|index| assigned[index]);
            assigned.push(insert(parent_id, node)?);
        }
        Ok(assigned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Submission;
    use crate::db::schema;
    use crate::metadata::DocumentMetadata;
    use crate::version::Version;
    use std::collections::HashMap;

    fn leaf(parent: usize, ident: i64, latest: bool) -> ArenaNode {
        ArenaNode {
            parent: Some(parent),
            document_version_id: Some(ident),
            title: None,
            child_order: 0,
            latest,
        }
    }

    #[test]
    fn test_arena_insert_is_parent_before_child() {
        let arena = Arena {
            nodes: vec![
                ArenaNode {
                    parent: None,
                    document_version_id: Some(10),
                    title: None,
                    child_order: 0,
                    latest: true,
                },
                ArenaNode {
                    parent: Some(0),
                    document_version_id: None,
                    title: Some("Part".to_string()),
                    child_order: 0,
                    latest: true,
                },
                leaf(1, 20, true),
                leaf(0, 21, true),
            ],
        };

        let mut next_id = 100;
        let mut parents = Vec::new();
        let assigned = arena
            .insert_with(|parent_id, _| {
                parents.push(parent_id);
                next_id += 1;
                Ok(next_id)
            })
            .unwrap();

        assert_eq!(assigned, vec![101, 102, 103, 104]);
        assert_eq!(parents, vec![None, Some(101), Some(102), Some(101)]);
    }

    #[test]
    fn test_substitute_respects_latest_flag_and_root() {
        let mut arena = Arena {
            nodes: vec![
                ArenaNode {
                    parent: None,
                    document_version_id: Some(10),
                    title: None,
                    child_order: 0,
                    latest: true,
                },
                leaf(0, 20, true),
                leaf(0, 21, false),
                ArenaNode {
                    parent: Some(0),
                    document_version_id: None,
                    title: Some("Heading".to_string()),
                    child_order: 3,
                    latest: true,
                },
            ],
        };

        let replacements: HashMap<i64, i64> = HashMap::from([(20, 200), (21, 210)]);
        arena
            .substitute(99, |old| Ok(replacements.get(&old).copied()))
            .unwrap();

        let idents: Vec<Option<i64>> =
            arena.nodes.iter().map(|n| n.document_version_id).collect();
        assert_eq!(idents, vec![Some(99), Some(200), Some(21), None]);
    }

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        schema::migrate(&conn).unwrap();
        conn
    }

    fn publish_bare(
        conn: &Connection,
        content_id: &str,
        kind: ContentKind,
        version: Version,
    ) -> (String, i64) {
        let item = match ContentItem::find_by_content_id(conn, content_id).unwrap() {
            Some(item) => item,
            None => {
                let mut item = ContentItem::new(content_id.to_string(), kind);
                item.insert(conn).unwrap();
                item
            }
        };

        let metadata = DocumentMetadata {
            title: format!("Title of {content_id}"),
            language: "en".to_string(),
            license_url: "url".to_string(),
            created: "c".to_string(),
            revised: "r".to_string(),
            version: "1.1".to_string(),
            ..DocumentMetadata::default()
        };
        let mut entry = VersionEntry::new(
            item.uuid.clone(),
            version,
            &metadata,
            &Submission::new("tester", "test"),
        );
        let ident = entry.insert(conn).unwrap();
        (item.uuid, ident)
    }

    /// Module at v1 and v2, collection at (1,1) whose tree holds the module
    /// at v1. Returns (module uuid, module v2 version, collection uuid).
    fn containment_fixture(conn: &Connection, latest_reference: bool) -> (String, Version, String) {
        let (module_uuid, module_v1) =
            publish_bare(conn, "m10000", ContentKind::Module, Version::new(1, None));
        let (_, _) = publish_bare(conn, "m10000", ContentKind::Module, Version::new(2, None));
        let (col_uuid, col_ident) = publish_bare(
            conn,
            "col11405",
            ContentKind::Collection,
            Version::new(1, Some(1)),
        );

        let mut root = TreeNode::new(None, Some(col_ident), Some("Book".to_string()), 0, true);
        let root_id = root.insert(conn).unwrap();
        TreeNode::new(Some(root_id), Some(module_v1), None, 0, latest_reference)
            .insert(conn)
            .unwrap();

        (module_uuid, Version::new(2, None), col_uuid)
    }

    #[test]
    fn test_cascade_bumps_containing_collection() {
        let conn = setup_test_db();
        let (module_uuid, module_v2, col_uuid) = containment_fixture(&conn, true);

        let mut change_map = ChangeMap::new();
        change_map.insert(module_uuid.clone(), module_v2);

        let republished = republish_ancestors(&conn, &change_map, None).unwrap();
        assert_eq!(republished, vec![("col11405".to_string(), "1.2".to_string())]);

        let latest = VersionEntry::find_latest(&conn, &col_uuid).unwrap().unwrap();
        assert_eq!(latest.version(), Version::new(1, Some(2)));
        assert_eq!(latest.title, "Title of col11405");

        // The new tree references the module's new version
        let root = TreeNode::find_root(&conn, latest.ident().unwrap())
            .unwrap()
            .unwrap();
        let children = TreeNode::children_of(&conn, root.ident().unwrap()).unwrap();
        let target = VersionEntry::find_by_id(&conn, children[0].document_version_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(target.item_uuid, module_uuid);
        assert_eq!(target.version(), Version::new(2, None));
    }

    #[test]
    fn test_pinned_reference_survives_the_cascade() {
        let conn = setup_test_db();
        let (module_uuid, module_v2, col_uuid) = containment_fixture(&conn, false);

        let mut change_map = ChangeMap::new();
        change_map.insert(module_uuid.clone(), module_v2);

        // Discovery still counts the pinned reference as containment
        let republished = republish_ancestors(&conn, &change_map, None).unwrap();
        assert_eq!(republished.len(), 1);

        let latest = VersionEntry::find_latest(&conn, &col_uuid).unwrap().unwrap();
        let root = TreeNode::find_root(&conn, latest.ident().unwrap())
            .unwrap()
            .unwrap();
        let children = TreeNode::children_of(&conn, root.ident().unwrap()).unwrap();
        let target = VersionEntry::find_by_id(&conn, children[0].document_version_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(target.version(), Version::new(1, None), "pin must hold");
    }

    #[test]
    fn test_excluded_collection_is_not_republished() {
        let conn = setup_test_db();
        let (module_uuid, module_v2, col_uuid) = containment_fixture(&conn, true);

        let mut change_map = ChangeMap::new();
        change_map.insert(module_uuid, module_v2);

        let republished = republish_ancestors(&conn, &change_map, Some(&col_uuid)).unwrap();
        assert!(republished.is_empty());

        let latest = VersionEntry::find_latest(&conn, &col_uuid).unwrap().unwrap();
        assert_eq!(latest.version(), Version::new(1, Some(1)));
    }

    #[test]
    fn test_empty_change_map_is_a_no_op() {
        let conn = setup_test_db();
        containment_fixture(&conn, true);

        let republished = republish_ancestors(&conn, &ChangeMap::new(), None).unwrap();
        assert!(republished.is_empty());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM versions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 3, "no rows written for an empty change map");
    }

    #[test]
    fn test_republished_collection_keeps_its_files() {
        let conn = setup_test_db();
        let (module_uuid, module_v2, col_uuid) = containment_fixture(&conn, true);

        let col_v1 = VersionEntry::find_latest(&conn, &col_uuid).unwrap().unwrap();
        let mut body = crate::db::models::FileEntry::new("text/xml", b"<collection/>".to_vec());
        let file_id = body.insert_or_find(&conn).unwrap();
        VersionFile::new(col_v1.ident().unwrap(), file_id, "collection.xml")
            .insert(&conn)
            .unwrap();

        let mut change_map = ChangeMap::new();
        change_map.insert(module_uuid, module_v2);
        republish_ancestors(&conn, &change_map, None).unwrap();

        let latest = VersionEntry::find_latest(&conn, &col_uuid).unwrap().unwrap();
        let digests = VersionFile::digest_map(&conn, latest.ident().unwrap()).unwrap();
        assert!(digests.contains_key("collection.xml"));
    }
}
