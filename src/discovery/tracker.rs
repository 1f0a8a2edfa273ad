//! Row identity tracking across virtualization
//!
//! The widget recycles DOM nodes as the viewport moves, so element handles are
//! worthless as identity. The registry keys everything on the widget's own
//! opaque row id and accumulates observations across expansion iterations:
//! rows that scrolled out of the DOM long ago stay in the registry until the
//! reconstructor consumes it.

use indexmap::IndexMap;
use serde::Serialize;

use crate::discovery::classify::{self, NodeType};
use crate::ui::RowSnapshot;

/// One row ever observed during a discovery run
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrackedNode {
    /// Stable widget-assigned identity
    pub id: String,

    /// Display label as of the most recent observation
    pub name: String,

    /// Indentation level as of the most recent observation
    pub depth: usize,

    /// Classified semantic tag
    pub node_type: NodeType,

    /// Inferred parent id; `None` does not imply the node is the true root,
    /// only that no parent was on-screen together with it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Collapsed state at the most recent observation; snapshot-local, not
    /// authoritative afterwards
    pub collapsed_at_observation: bool,

    /// Iteration at which the row was first observed; immutable once set
    pub first_seen_iteration: u32,

    /// Iteration at which the row was most recently observed
    pub last_seen_iteration: u32,
}

/// A synthetic coverage leaf, kept out of the primary hierarchy
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NoiseLeaf {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub node_type: NodeType,
}

/// Diagnostic record of one controller pass
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub visible_count: usize,
    pub seen_ids: Vec<String>,
}

/// Accumulated observations for one discovery run
///
/// Append/update-only: nodes are created on first sight and updated on every
/// re-sight, never removed. Insertion order (first-observation order) is
/// preserved, which keeps downstream output deterministic for a given crawl.
#[derive(Debug, Default)]
pub struct Registry {
    nodes: IndexMap<String, TrackedNode>,
    noise: IndexMap<String, NoiseLeaf>,
    iterations: Vec<IterationRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot of the currently visible rows.
    ///
    /// Unseen ids create a node with `first_seen_iteration = iteration`; known
    /// ids update their mutable fields and `last_seen_iteration`. Rows without
    /// a widget-assigned id are skipped. Coverage noise rows are diverted into
    /// a separate id-keyed set so they only ever contribute counts. Tracking
    /// the same snapshot twice at the same iteration is a no-op the second
    /// time.
    ///
    /// Returns the number of ids seen for the first time.
    pub fn track(&mut self, rows: &[RowSnapshot], iteration: u32) -> usize {
        let mut newly_seen = 0;

        for row in rows {
            if row.id.is_empty() {
                log::debug!("skipping row without id (name: {:?})", row.name);
                continue;
            }

            let node_type = classify::classify(row);
            let parent_id = infer_parent_id(&row.ancestor_chain, &row.id);

            if classify::is_noise(row) {
                if !self.noise.contains_key(&row.id) {
                    newly_seen += 1;
                }
                let leaf = self.noise.entry(row.id.clone()).or_insert_with(|| NoiseLeaf {
                    id: row.id.clone(),
                    parent_id: None,
                    node_type: node_type.clone(),
                });
                if parent_id.is_some() {
                    leaf.parent_id = parent_id;
                }
                continue;
            }

            match self.nodes.get_mut(&row.id) {
                Some(node) => {
                    node.name = row.name.clone();
                    node.depth = row.depth;
                    node.node_type = node_type;
                    // A later snapshot can supply a parent the first one
                    // lacked; absence never erases earlier knowledge.
                    if parent_id.is_some() {
                        node.parent_id = parent_id;
                    }
                    node.collapsed_at_observation = row.is_collapsed;
                    node.last_seen_iteration = iteration;
                }
                None => {
                    newly_seen += 1;
                    self.nodes.insert(
                        row.id.clone(),
                        TrackedNode {
                            id: row.id.clone(),
                            name: row.name.clone(),
                            depth: row.depth,
                            node_type,
                            parent_id,
                            collapsed_at_observation: row.is_collapsed,
                            first_seen_iteration: iteration,
                            last_seen_iteration: iteration,
                        },
                    );
                }
            }
        }

        newly_seen
    }

    /// Append the diagnostic record for one controller pass
    pub fn record_iteration(&mut self, iteration: u32, rows: &[RowSnapshot]) {
        self.iterations.push(IterationRecord {
            iteration,
            visible_count: rows.len(),
            seen_ids: rows.iter().map(|r| r.id.clone()).collect(),
        });
    }

    /// Primary tracked nodes, in first-observation order
    pub fn nodes(&self) -> &IndexMap<String, TrackedNode> {
        &self.nodes
    }

    /// Tracked coverage leaves, in first-observation order
    pub fn noise(&self) -> &IndexMap<String, NoiseLeaf> {
        &self.noise
    }

    /// Per-pass diagnostic records
    pub fn iteration_records(&self) -> &[IterationRecord] {
        &self.iterations
    }

    /// Total distinct ids ever tracked, coverage leaves included
    pub fn total_tracked(&self) -> usize {
        self.nodes.len() + self.noise.len()
    }

    /// Export the registry as JSON for diagnostics
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct Export<'a> {
            nodes: Vec<&'a TrackedNode>,
            noise: Vec<&'a NoiseLeaf>,
            iterations: &'a [IterationRecord],
        }
        serde_json::to_string_pretty(&Export {
            nodes: self.nodes.values().collect(),
            noise: self.noise.values().collect(),
            iterations: &self.iterations,
        })
    }
}

/// Derive the parent id from a row's ancestor spacer chain.
///
/// The chain mirrors depth and conventionally ends with the row's own id, in
/// which case the parent is the second-to-last marker. A chain that does not
/// end with the row itself is all ancestors, so the parent is its last
/// marker. A single-marker chain denotes a parent only when the marker is not
/// the row's own id.
fn infer_parent_id(chain: &[String], own_id: &str) -> Option<String> {
    match chain {
        [] => None,
        [only] => (only != own_id).then(|| only.clone()),
        [.., parent, last] if last == own_id => Some(parent.clone()),
        [.., last] => Some(last.clone()),
    }
}
