//! Heuristic node-type classification
//!
//! The widget does not expose one reliable type signal for every row kind:
//! some rows carry a `node-*` class token, some only an icon, and some carry
//! nothing but their indentation. Classification is therefore an ordered rule
//! list that degrades from the strongest signal down to a positional guess,
//! never a failure.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::ui::RowSnapshot;

/// Semantic tag assigned to a tracked row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Group,
    Network,
    Campus,
    Building,
    Floor,
    Zone,
    Area,
    Controller,
    /// Synthetic coverage-region leaf; aggregated into counts, never a
    /// first-class hierarchy node
    Coverage,
    /// Recognizable type token that is not in the fixed lookup table,
    /// preserved title-cased
    Other(String),
    /// No classification has been attempted yet
    Unknown,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Root => write!(f, "Root"),
            NodeType::Group => write!(f, "Group"),
            NodeType::Network => write!(f, "Network"),
            NodeType::Campus => write!(f, "Campus"),
            NodeType::Building => write!(f, "Building"),
            NodeType::Floor => write!(f, "Floor"),
            NodeType::Zone => write!(f, "Zone"),
            NodeType::Area => write!(f, "Area"),
            NodeType::Controller => write!(f, "Controller"),
            NodeType::Coverage => write!(f, "Coverage"),
            NodeType::Other(name) => write!(f, "{}", name),
            NodeType::Unknown => write!(f, "Unknown"),
        }
    }
}

// Serialized as its display name so it can key JSON maps (type counts).
impl Serialize for NodeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Class tokens of this form carry the widget's own type annotation,
/// e.g. `node-campus`
const CLASS_TOKEN_PREFIX: &str = "node-";

/// Classify a row by its strongest available signal
///
/// Rule order: depth 0, explicit class token, icon token, positional
/// fallback (depth 1 is a floor, anything deeper an area).
pub fn classify(row: &RowSnapshot) -> NodeType {
    if row.depth == 0 {
        return NodeType::Root;
    }

    if let Some(token) = class_token(row) {
        return map_token(&token);
    }

    if let Some(token) = icon_token(row) {
        return map_token(&token);
    }

    if row.depth == 1 { NodeType::Floor } else { NodeType::Area }
}

/// Whether a row is a synthetic coverage leaf that should be aggregated into
/// a per-parent count instead of entering the hierarchy
pub fn is_noise(row: &RowSnapshot) -> bool {
    if classify(row) == NodeType::Coverage {
        return true;
    }
    row.name.to_ascii_lowercase().starts_with("coverage")
}

/// Extract the explicit type token from the row's class list, if present
fn class_token(row: &RowSnapshot) -> Option<String> {
    row.class_tokens
        .iter()
        .find_map(|c| c.strip_prefix(CLASS_TOKEN_PREFIX))
        .map(str::to_string)
}

/// Extract a type token from a background-image reference such as
/// `url(/static/icons/building.svg)`
fn icon_token(row: &RowSnapshot) -> Option<String> {
    let icon_ref = row.icon_ref.as_deref()?;

    let path = icon_ref
        .trim_start_matches("url(")
        .trim_end_matches(')')
        .trim_matches(|c| c == '"' || c == '\'');

    let file = path.rsplit('/').next()?;
    let stem = file.split('.').next()?;

    if stem.is_empty() { None } else { Some(stem.to_string()) }
}

/// Map a raw token through the fixed lookup table, title-casing anything the
/// table does not recognize
fn map_token(token: &str) -> NodeType {
    match token.to_ascii_lowercase().as_str() {
        "group" => NodeType::Group,
        "network" => NodeType::Network,
        "campus" => NodeType::Campus,
        "building" => NodeType::Building,
        "floor" => NodeType::Floor,
        "zone" => NodeType::Zone,
        "area" | "subarea" | "sub-area" => NodeType::Area,
        "controller" => NodeType::Controller,
        "coverage" => NodeType::Coverage,
        _ => NodeType::Other(title_case(token)),
    }
}

fn title_case(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
