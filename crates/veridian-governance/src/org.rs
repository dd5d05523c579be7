//! Organizational unit hierarchy queries.
//!
//! The organizational tree is owned and edited elsewhere; this module only
//! answers the read-side questions the registers need: flattening for
//! indentation-aware selectors, full path strings for display and filter
//! matching, and descendant sets for "this unit and everything beneath it"
//! scoping.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::types::OrgUnitId;

/// A node of the organizational tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnit {
    /// Unique identifier.
    pub id: OrgUnitId,
    /// Display name.
    pub name: String,
    /// Parent unit, `None` for a root.
    pub parent_id: Option<OrgUnitId>,
    /// Child units, in display order.
    pub children: Vec<OrgUnit>,
}

impl OrgUnit {
    /// Create a root unit with no children.
    pub fn new(id: OrgUnitId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: None,
            children: Vec::new(),
        }
    }

    /// Attach a child unit, fixing up its `parent_id`.
    #[must_use]
    pub fn with_child(mut self, mut child: OrgUnit) -> Self {
        child.parent_id = Some(self.id);
        self.children.push(child);
        self
    }
}

/// One row of a flattened organizational tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatUnit {
    /// Unit identifier.
    pub id: OrgUnitId,
    /// Unit name.
    pub name: String,
    /// Depth in the tree, 0 for roots.
    pub depth: usize,
}

/// Flatten a forest in pre-order: every parent precedes its children,
/// siblings keep their given order.
#[must_use]
pub fn flatten(roots: &[OrgUnit]) -> Vec<FlatUnit> {
    let mut out = Vec::new();
    for root in roots {
        flatten_into(root, 0, &mut out);
    }
    out
}

fn flatten_into(unit: &OrgUnit, depth: usize, out: &mut Vec<FlatUnit>) {
    out.push(FlatUnit {
        id: unit.id,
        name: unit.name.clone(),
        depth,
    });
    for child in &unit.children {
        flatten_into(child, depth + 1, out);
    }
}

/// Build the `id → "Parent / Child / Grandchild"` path map for a forest.
///
/// Built once per tree and reused for display and filter matching.
#[must_use]
pub fn build_path_map(roots: &[OrgUnit]) -> HashMap<OrgUnitId, String> {
    let mut map = HashMap::new();
    for root in roots {
        build_paths_into(root, "", &mut map);
    }
    map
}

fn build_paths_into(unit: &OrgUnit, prefix: &str, map: &mut HashMap<OrgUnitId, String>) {
    let path = if prefix.is_empty() {
        unit.name.clone()
    } else {
        format!("{} / {}", prefix, unit.name)
    };
    map.insert(unit.id, path.clone());
    for child in &unit.children {
        build_paths_into(child, &path, map);
    }
}

/// Collect `root_id` plus the ids of its whole subtree.
///
/// Returns the empty set when `root_id` is not present in the forest; an
/// unknown unit scopes a report to nothing rather than failing it.
#[must_use]
pub fn collect_descendant_ids(roots: &[OrgUnit], root_id: OrgUnitId) -> HashSet<OrgUnitId> {
    let mut out = HashSet::new();
    if let Some(unit) = find(roots, root_id) {
        collect_into(unit, &mut out);
    }
    out
}

/// Find a unit by id anywhere in the forest.
#[must_use]
pub fn find(roots: &[OrgUnit], id: OrgUnitId) -> Option<&OrgUnit> {
    for root in roots {
        if root.id == id {
            return Some(root);
        }
        if let Some(found) = find(&root.children, id) {
            return Some(found);
        }
    }
    None
}

fn collect_into(unit: &OrgUnit, out: &mut HashSet<OrgUnitId>) {
    out.insert(unit.id);
    for child in &unit.children {
        collect_into(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_forest() -> Vec<OrgUnit> {
        // Company
        // ├── Engineering
        // │   ├── Platform
        // │   └── Security
        // └── Finance
        // Subsidiary
        vec![
            OrgUnit::new(OrgUnitId(1), "Company")
                .with_child(
                    OrgUnit::new(OrgUnitId(2), "Engineering")
                        .with_child(OrgUnit::new(OrgUnitId(3), "Platform"))
                        .with_child(OrgUnit::new(OrgUnitId(4), "Security")),
                )
                .with_child(OrgUnit::new(OrgUnitId(5), "Finance")),
            OrgUnit::new(OrgUnitId(6), "Subsidiary"),
        ]
    }

    #[test]
    fn test_flatten_preorder_and_depth() {
        let flat = flatten(&sample_forest());
        let ids: Vec<i64> = flat.iter().map(|u| u.id.into_inner()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);

        let depths: Vec<usize> = flat.iter().map(|u| u.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 2, 1, 0]);
    }

    #[test]
    fn test_flatten_parent_precedes_every_descendant() {
        let forest = sample_forest();
        let flat = flatten(&forest);
        let index = |id: OrgUnitId| flat.iter().position(|u| u.id == id).unwrap();

        for unit in flat.iter() {
            for descendant in collect_descendant_ids(&forest, unit.id) {
                assert!(index(unit.id) <= index(descendant));
            }
        }
    }

    #[test]
    fn test_build_path_map() {
        let paths = build_path_map(&sample_forest());
        assert_eq!(paths[&OrgUnitId(1)], "Company");
        assert_eq!(paths[&OrgUnitId(3)], "Company / Engineering / Platform");
        assert_eq!(paths[&OrgUnitId(5)], "Company / Finance");
        assert_eq!(paths[&OrgUnitId(6)], "Subsidiary");
    }

    #[test]
    fn test_collect_descendants_includes_root() {
        let ids = collect_descendant_ids(&sample_forest(), OrgUnitId(2));
        assert_eq!(
            ids,
            [OrgUnitId(2), OrgUnitId(3), OrgUnitId(4)].into_iter().collect()
        );
    }

    #[test]
    fn test_collect_descendants_superset_of_child_sets() {
        let forest = sample_forest();
        let parent = collect_descendant_ids(&forest, OrgUnitId(1));
        for child in [OrgUnitId(2), OrgUnitId(3), OrgUnitId(4), OrgUnitId(5)] {
            assert!(parent.is_superset(&collect_descendant_ids(&forest, child)));
        }
    }

    #[test]
    fn test_collect_descendants_unknown_root_is_empty() {
        let ids = collect_descendant_ids(&sample_forest(), OrgUnitId(999));
        assert!(ids.is_empty());
    }

    #[test]
    fn test_leaf_descendants_is_only_itself() {
        let ids = collect_descendant_ids(&sample_forest(), OrgUnitId(5));
        assert_eq!(ids, [OrgUnitId(5)].into_iter().collect());
    }
}
