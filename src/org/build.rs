//! Tree builder: turns a parsed listing into a [`Forest`].
//!
//! Nested listings convert directly; ownership through `children` makes
//! cycles unrepresentable, so only duplicate keys can fail. Flat
//! listings go through three passes: duplicate check, parent-chain cycle
//! check, then bottom-up assembly from a children-by-parent map. Records
//! whose declared parent is never found land in the detached bucket
//! instead of being promoted to roots or dropped.

use std::collections::{HashMap, HashSet};

use crate::error::{AppError, Result};
use crate::org::node::{Forest, NodeDetail, NodeKey, NodeKind, OrgNode};
use crate::org::payload::{DepartmentEntry, FlatEntry, InstitutionEntry, OrgListing};

/// Result of a build: the forest plus any orphaned subtrees.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub forest: Forest,
    /// Subtrees whose declared parent was absent from the listing.
    pub detached: Vec<OrgNode>,
}

/// Build a forest from a listing of either shape.
///
/// Identical input yields value-equal output; on error no output is
/// produced at all (the caller's previous forest stays intact).
pub fn build(listing: &OrgListing) -> Result<BuildOutput> {
    match listing {
        OrgListing::Nested(entries) => build_nested(entries),
        OrgListing::Flat(entries) => build_flat(entries),
    }
}

fn build_nested(entries: &[InstitutionEntry]) -> Result<BuildOutput> {
    let roots = entries
        .iter()
        .map(|entry| convert_institution(entry, None))
        .collect();
    Ok(BuildOutput {
        forest: Forest::new(roots)?,
        detached: Vec::new(),
    })
}

fn convert_institution(entry: &InstitutionEntry, parent: Option<NodeKey>) -> OrgNode {
    let key = NodeKey::new(NodeKind::Institution, entry.id);
    let mut node = OrgNode::new(
        key,
        entry.name.clone(),
        entry.short_name.clone(),
        NodeDetail::Institution {
            type_label: entry.institution_type.clone(),
            level: entry.level,
        },
        entry.is_active,
    );
    node.parent = parent;
    // Sub-institutions first, then departments, as the server lists them.
    node.children = entry
        .children
        .iter()
        .map(|child| convert_institution(child, Some(key)))
        .chain(
            entry
                .departments
                .iter()
                .map(|dept| convert_department(dept, Some(key))),
        )
        .collect();
    node
}

fn convert_department(entry: &DepartmentEntry, parent: Option<NodeKey>) -> OrgNode {
    let key = NodeKey::new(NodeKind::Department, entry.id);
    let mut node = OrgNode::new(
        key,
        entry.name.clone(),
        entry.short_name.clone(),
        NodeDetail::Department {
            category: entry.department_type.clone(),
        },
        entry.is_active,
    );
    node.parent = parent;
    node.children = entry
        .children
        .iter()
        .map(|child| convert_department(child, Some(key)))
        .collect();
    node
}

fn build_flat(entries: &[FlatEntry]) -> Result<BuildOutput> {
    // Pass 1: parse kinds, materialize childless nodes, reject duplicates.
    let mut nodes: HashMap<NodeKey, OrgNode> = HashMap::new();
    let mut parents: HashMap<NodeKey, NodeKey> = HashMap::new();
    let mut order: Vec<NodeKey> = Vec::with_capacity(entries.len());

    for entry in entries {
        let kind = NodeKind::from_wire(&entry.kind)?;
        let key = NodeKey::new(kind, entry.id);
        if nodes.contains_key(&key) {
            return Err(AppError::DuplicateNode(key));
        }
        if let Some(parent_key) = parent_key_of(entry)? {
            parents.insert(key, parent_key);
        }
        nodes.insert(key, convert_flat(entry, key));
        order.push(key);
    }

    // Pass 2: parent-chain cycle check. Each chain is walked with the set
    // of keys on the current path; keys proven acyclic once are skipped on
    // later walks.
    let mut acyclic: HashSet<NodeKey> = HashSet::new();
    for &start in &order {
        let mut path: Vec<NodeKey> = Vec::new();
        let mut on_path: HashSet<NodeKey> = HashSet::new();
        let mut current = Some(start);
        while let Some(key) = current {
            if acyclic.contains(&key) {
                break;
            }
            if !on_path.insert(key) {
                return Err(AppError::Cycle(key));
            }
            path.push(key);
            current = parents.get(&key).copied().filter(|p| nodes.contains_key(p));
        }
        acyclic.extend(path);
    }

    // Pass 3: group children by parent, split roots from orphans, then
    // assemble each tree bottom-up.
    let mut child_keys: HashMap<NodeKey, Vec<NodeKey>> = HashMap::new();
    let mut roots: Vec<NodeKey> = Vec::new();
    let mut orphans: Vec<NodeKey> = Vec::new();
    for &key in &order {
        match parents.get(&key) {
            Some(parent_key) if nodes.contains_key(parent_key) => {
                if let Some(node) = nodes.get_mut(&key) {
                    node.parent = Some(*parent_key);
                }
                child_keys.entry(*parent_key).or_default().push(key);
            }
            Some(_) => orphans.push(key),
            None => roots.push(key),
        }
    }

    let root_nodes: Vec<OrgNode> = roots
        .into_iter()
        .filter_map(|key| assemble(key, &mut nodes, &child_keys))
        .collect();
    let detached: Vec<OrgNode> = orphans
        .into_iter()
        .filter_map(|key| assemble(key, &mut nodes, &child_keys))
        .collect();

    Ok(BuildOutput {
        forest: Forest::new(root_nodes)?,
        detached,
    })
}

fn parent_key_of(entry: &FlatEntry) -> Result<Option<NodeKey>> {
    let Some(parent_id) = entry.parent_id else {
        return Ok(None);
    };
    let parent_kind = match &entry.parent_kind {
        Some(kind) => NodeKind::from_wire(kind)?,
        None => NodeKind::Institution,
    };
    Ok(Some(NodeKey::new(parent_kind, parent_id)))
}

fn convert_flat(entry: &FlatEntry, key: NodeKey) -> OrgNode {
    let detail = match key.kind() {
        NodeKind::Institution => NodeDetail::Institution {
            type_label: entry.institution_type.clone().unwrap_or_default(),
            level: entry.level.unwrap_or(1),
        },
        NodeKind::Department => NodeDetail::Department {
            category: entry.department_type.clone().unwrap_or_default(),
        },
    };
    OrgNode::new(
        key,
        entry.name.clone(),
        entry.short_name.clone(),
        detail,
        entry.is_active,
    )
}

/// Attach children to parents starting from the deepest nodes, so that a
/// node's subtree is complete before it is moved into its own parent.
/// Stack depth is bounded by heap, not the call stack.
fn assemble(
    root: NodeKey,
    nodes: &mut HashMap<NodeKey, OrgNode>,
    child_keys: &HashMap<NodeKey, Vec<NodeKey>>,
) -> Option<OrgNode> {
    let mut preorder: Vec<NodeKey> = Vec::new();
    let mut stack = vec![root];
    while let Some(key) = stack.pop() {
        preorder.push(key);
        if let Some(kids) = child_keys.get(&key) {
            stack.extend(kids.iter().copied());
        }
    }
    // Reverse pre-order visits every child before its parent.
    for &key in preorder.iter().rev() {
        let Some(kids) = child_keys.get(&key) else {
            continue;
        };
        let assembled: Vec<OrgNode> = kids.iter().filter_map(|kid| nodes.remove(kid)).collect();
        if let Some(node) = nodes.get_mut(&key) {
            node.children = assembled;
        }
    }
    nodes.remove(&root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::org::payload::OrgListing;

    fn flat_entry(id: u64, kind: &str, name: &str, parent: Option<(u64, &str)>) -> FlatEntry {
        FlatEntry {
            id,
            kind: kind.to_string(),
            name: name.to_string(),
            short_name: String::new(),
            institution_type: None,
            level: None,
            department_type: None,
            is_active: true,
            parent_id: parent.map(|(id, _)| id),
            parent_kind: parent.map(|(_, kind)| kind.to_string()),
        }
    }

    fn nested_listing() -> OrgListing {
        OrgListing::from_json(
            r#"[
            {
                "id": 1, "name": "Ministry", "type": "ministry", "level": 1,
                "children": [
                    { "id": 2, "name": "Region", "type": "region", "level": 2,
                      "children": [
                        { "id": 3, "name": "Sector", "type": "sector", "level": 3 }
                      ] }
                ],
                "departments": [
                    { "id": 9, "name": "HR", "department_type": "administrative" }
                ]
            }
        ]"#,
        )
        .unwrap()
    }

    #[test]
    fn nested_build_preserves_structure_and_order() {
        let out = build(&nested_listing()).unwrap();
        assert!(out.detached.is_empty());
        assert_eq!(out.forest.len(), 4);

        let ministry = &out.forest.roots()[0];
        assert_eq!(ministry.id(), 1);
        // Sub-institutions come before departments.
        assert_eq!(ministry.children[0].kind(), NodeKind::Institution);
        assert_eq!(ministry.children[1].kind(), NodeKind::Department);
        assert_eq!(ministry.children[1].name, "HR");

        let sector = out.forest.get(NodeKey::new(NodeKind::Institution, 3)).unwrap();
        assert_eq!(sector.parent, Some(NodeKey::new(NodeKind::Institution, 2)));
    }

    #[test]
    fn nested_build_is_idempotent() {
        let listing = nested_listing();
        let first = build(&listing).unwrap();
        let second = build(&listing).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn nested_build_rejects_duplicate_institution_ids() {
        let listing = OrgListing::from_json(
            r#"[
            { "id": 1, "name": "A", "children": [ { "id": 1, "name": "A again" } ] }
        ]"#,
        )
        .unwrap();
        let err = build(&listing).unwrap_err();
        assert!(matches!(err, AppError::DuplicateNode(key)
            if key == NodeKey::new(NodeKind::Institution, 1)));
    }

    #[test]
    fn flat_build_matches_nested_equivalent() {
        let flat = OrgListing::Flat(vec![
            flat_entry(1, "institution", "Ministry", None),
            flat_entry(2, "institution", "Region", Some((1, "institution"))),
            flat_entry(3, "institution", "Sector", Some((2, "institution"))),
            flat_entry(9, "department", "HR", Some((1, "institution"))),
        ]);
        let out = build(&flat).unwrap();
        assert!(out.detached.is_empty());
        assert_eq!(out.forest.len(), 4);
        assert_eq!(out.forest.roots().len(), 1);

        let ministry = &out.forest.roots()[0];
        let child_ids: Vec<(NodeKind, u64)> =
            ministry.children.iter().map(|c| (c.kind(), c.id())).collect();
        assert_eq!(
            child_ids,
            vec![(NodeKind::Institution, 2), (NodeKind::Department, 9)]
        );
        let region = &ministry.children[0];
        assert_eq!(region.children[0].id(), 3);
        assert_eq!(region.children[0].parent, Some(region.key));
    }

    #[test]
    fn flat_build_is_idempotent() {
        let flat = OrgListing::Flat(vec![
            flat_entry(1, "institution", "Ministry", None),
            flat_entry(2, "institution", "Region", Some((1, "institution"))),
        ]);
        assert_eq!(build(&flat).unwrap(), build(&flat).unwrap());
    }

    #[test]
    fn orphan_goes_to_detached_bucket_with_its_subtree() {
        let flat = OrgListing::Flat(vec![
            flat_entry(1, "institution", "Ministry", None),
            // Parent 77 never appears in the listing.
            flat_entry(5, "institution", "Lost Sector", Some((77, "institution"))),
            flat_entry(6, "institution", "Lost School", Some((5, "institution"))),
        ]);
        let out = build(&flat).unwrap();
        assert_eq!(out.forest.len(), 1);
        assert_eq!(out.detached.len(), 1);
        let lost = &out.detached[0];
        assert_eq!(lost.name, "Lost Sector");
        assert_eq!(lost.children.len(), 1);
        assert_eq!(lost.children[0].name, "Lost School");
        // Detached roots are not part of the forest.
        assert!(!out.forest.contains(lost.key));
    }

    #[test]
    fn two_node_cycle_is_rejected() {
        let flat = OrgListing::Flat(vec![
            flat_entry(1, "institution", "A", Some((2, "institution"))),
            flat_entry(2, "institution", "B", Some((1, "institution"))),
        ]);
        let err = build(&flat).unwrap_err();
        assert!(matches!(err, AppError::Cycle(_)));
    }

    #[test]
    fn self_parent_is_rejected() {
        let flat = OrgListing::Flat(vec![flat_entry(
            3,
            "institution",
            "Self",
            Some((3, "institution")),
        )]);
        let err = build(&flat).unwrap_err();
        assert!(matches!(err, AppError::Cycle(key)
            if key == NodeKey::new(NodeKind::Institution, 3)));
    }

    #[test]
    fn duplicate_flat_record_is_rejected() {
        let flat = OrgListing::Flat(vec![
            flat_entry(1, "institution", "A", None),
            flat_entry(1, "institution", "A again", None),
        ]);
        let err = build(&flat).unwrap_err();
        assert!(matches!(err, AppError::DuplicateNode(_)));
    }

    #[test]
    fn same_id_across_kinds_is_not_a_duplicate() {
        let flat = OrgListing::Flat(vec![
            flat_entry(4, "institution", "School", None),
            flat_entry(4, "department", "Accounting", Some((4, "institution"))),
        ]);
        let out = build(&flat).unwrap();
        assert_eq!(out.forest.len(), 2);
    }

    #[test]
    fn unknown_kind_is_rejected_at_the_boundary() {
        let flat = OrgListing::Flat(vec![flat_entry(1, "faculty", "X", None)]);
        let err = build(&flat).unwrap_err();
        assert!(matches!(err, AppError::UnknownKind(ref s) if s == "faculty"));
    }

    #[test]
    fn missing_parent_kind_defaults_to_institution() {
        let flat = OrgListing::Flat(vec![
            flat_entry(1, "institution", "School", None),
            FlatEntry {
                parent_kind: None,
                ..flat_entry(2, "department", "Library", Some((1, "institution")))
            },
        ]);
        let out = build(&flat).unwrap();
        let school = &out.forest.roots()[0];
        assert_eq!(school.children.len(), 1);
        assert_eq!(school.children[0].name, "Library");
    }

    #[test]
    fn flat_children_keep_listing_order() {
        let flat = OrgListing::Flat(vec![
            flat_entry(1, "institution", "Region", None),
            flat_entry(10, "institution", "School C", Some((1, "institution"))),
            flat_entry(11, "institution", "School A", Some((1, "institution"))),
            flat_entry(12, "department", "Inspection", Some((1, "institution"))),
        ]);
        let out = build(&flat).unwrap();
        let names: Vec<&str> = out.forest.roots()[0]
            .children
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["School C", "School A", "Inspection"]);
    }
}
