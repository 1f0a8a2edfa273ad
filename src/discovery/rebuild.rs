//! Hierarchy reconstruction from the accumulated registry
//!
//! The registry holds every row ever observed, in whatever order the crawl
//! happened to surface them. Reconstruction is a pure function of that final
//! registry: it resolves parent links through an id lookup, prefers
//! completeness over a perfectly single-rooted tree (unresolvable entries
//! become extra roots instead of being dropped), and sorts children by name
//! so two crawls of the same widget produce identical output.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;

use crate::discovery::classify::NodeType;
use crate::discovery::tracker::Registry;

/// One node of the reconstructed hierarchy
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HierarchyNode {
    pub id: String,
    pub name: String,
    pub node_type: NodeType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyNode>,
    /// Number of coverage leaves aggregated directly under this node
    pub coverage_count: usize,
    /// Set when the node's placement or classification rests on a fallback
    /// rule: an unresolvable parent reference, a cyclic parent chain, or an
    /// unclassified type
    pub low_confidence: bool,
}

impl HierarchyNode {
    /// Total nodes in this subtree, self included
    pub fn count_nodes(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::count_nodes).sum::<usize>()
    }

    /// Count descendants (self included) of a given type
    pub fn count_of_type(&self, node_type: &NodeType) -> usize {
        let own = usize::from(self.node_type == *node_type);
        own + self.children.iter().map(|c| c.count_of_type(node_type)).sum::<usize>()
    }

    /// Find a node by id anywhere in this subtree
    pub fn find(&self, id: &str) -> Option<&HierarchyNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// Result of reconstruction: root forest plus per-type counts
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BuiltHierarchy {
    /// Root nodes; more than one is legal output and signals either a
    /// genuinely forest-shaped widget or a crawl that never saw some parents
    pub roots: Vec<HierarchyNode>,
    /// Count of every tracked id by classified type, coverage leaves included
    pub type_counts: HashMap<NodeType, usize>,
}

/// Rebuild the hierarchy from a finished registry.
///
/// Every primary entry lands in exactly one position: under its resolved
/// parent, or in the root forest when the parent id is absent, never tracked,
/// self-referential, or part of a cycle.
pub fn build(registry: &Registry) -> BuiltHierarchy {
    let nodes = registry.nodes();

    if let Some(min_depth) = nodes.values().map(|n| n.depth).min() {
        log::debug!("rebuilding hierarchy: {} nodes, min depth {}", nodes.len(), min_depth);
    }

    // Pass 1: resolve parents. Entries whose parent id does not resolve to a
    // tracked node are root candidates rather than casualties.
    let mut children_of: IndexMap<&str, Vec<&str>> = IndexMap::new();
    let mut root_ids: Vec<&str> = Vec::new();
    let mut unresolved: HashSet<&str> = HashSet::new();

    for (id, node) in nodes {
        let resolved_parent = node
            .parent_id
            .as_deref()
            .filter(|p| *p != id.as_str() && nodes.contains_key(*p));

        match resolved_parent {
            Some(parent) => children_of.entry(parent).or_default().push(id.as_str()),
            None => {
                if node.parent_id.is_some() {
                    log::debug!("parent of {:?} ({:?}) never tracked; promoting to root", id, node.parent_id);
                    unresolved.insert(id.as_str());
                }
                root_ids.push(id.as_str());
            }
        }
    }

    // Coverage aggregation onto resolved parents
    let mut coverage_of: HashMap<&str, usize> = HashMap::new();
    for leaf in registry.noise().values() {
        match leaf.parent_id.as_deref().filter(|p| nodes.contains_key(*p)) {
            Some(parent) => *coverage_of.entry(parent).or_default() += 1,
            None => log::debug!("coverage leaf {:?} has no resolvable parent", leaf.id),
        }
    }

    // Pass 2: depth-first serialization with a visited guard
    let mut visited: HashSet<&str> = HashSet::new();
    let mut roots: Vec<HierarchyNode> = root_ids
        .iter()
        .map(|&id| emit(id, registry, &children_of, &coverage_of, &unresolved, &mut visited, false))
        .collect();

    // Entries trapped in a parent cycle are reachable from no root; demote
    // them so nothing is lost.
    let cycle_ids: Vec<&str> = nodes
        .keys()
        .map(String::as_str)
        .filter(|id| !visited.contains(id))
        .collect();
    for id in cycle_ids {
        if visited.contains(id) {
            continue;
        }
        log::warn!("node {:?} is part of a parent cycle; demoting to root", id);
        roots.push(emit(id, registry, &children_of, &coverage_of, &unresolved, &mut visited, true));
    }

    sort_siblings(&mut roots);

    let mut type_counts: HashMap<NodeType, usize> = HashMap::new();
    for node in nodes.values() {
        *type_counts.entry(node.node_type.clone()).or_default() += 1;
    }
    for leaf in registry.noise().values() {
        *type_counts.entry(leaf.node_type.clone()).or_default() += 1;
    }

    BuiltHierarchy { roots, type_counts }
}

fn emit<'a>(
    id: &'a str,
    registry: &'a Registry,
    children_of: &IndexMap<&'a str, Vec<&'a str>>,
    coverage_of: &HashMap<&'a str, usize>,
    unresolved: &HashSet<&'a str>,
    visited: &mut HashSet<&'a str>,
    in_cycle: bool,
) -> HierarchyNode {
    visited.insert(id);
    let node = &registry.nodes()[id];

    let mut children: Vec<HierarchyNode> = Vec::new();
    if let Some(child_ids) = children_of.get(id) {
        for &child in child_ids {
            if visited.contains(child) {
                continue;
            }
            children.push(emit(child, registry, children_of, coverage_of, unresolved, visited, false));
        }
    }
    sort_siblings(&mut children);

    HierarchyNode {
        id: node.id.clone(),
        name: node.name.clone(),
        node_type: node.node_type.clone(),
        children,
        coverage_count: coverage_of.get(id).copied().unwrap_or(0),
        low_confidence: in_cycle || unresolved.contains(id) || node.node_type == NodeType::Unknown,
    }
}

fn sort_siblings(nodes: &mut [HierarchyNode]) {
    nodes.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
}
