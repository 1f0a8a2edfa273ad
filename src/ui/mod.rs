//! Tree widget abstraction
//!
//! The discovery engine never talks to a concrete DOM directly. Everything it
//! needs from the live page is expressed through the [`TreeUi`] trait:
//! snapshot the currently rendered rows, click an expander, scroll, and probe
//! a couple of readiness/extent signals. The [`chrome`] module provides a
//! Chrome DevTools Protocol implementation; tests drive the engine with an
//! in-memory fixture implementing the same trait.

#[cfg(feature = "chrome")]
pub mod chrome;

use serde::{Deserialize, Serialize};

#[cfg(feature = "chrome")]
pub use chrome::{ChromeTreeUi, TreeSelectors};

/// One rendered tree row, captured at a single instant
///
/// A snapshot is only valid for the moment it was taken: virtualization
/// recycles DOM nodes continuously, so the "same" row may be detached and
/// recreated between two reads. The `id` is the widget's own stable identity
/// and is the only field safe to correlate across snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowSnapshot {
    /// Opaque row identity assigned by the widget; unique among rows that are
    /// simultaneously visible
    pub id: String,

    /// Display label; may be empty for placeholder rows mid-render
    #[serde(default)]
    pub name: String,

    /// Indentation level; not guaranteed contiguous across the tree
    #[serde(default)]
    pub depth: usize,

    /// CSS class tokens carried by the row element
    #[serde(default)]
    pub class_tokens: Vec<String>,

    /// Background-image reference of the row's icon, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_ref: Option<String>,

    /// Whether the row currently shows a collapsed expander
    #[serde(default)]
    pub is_collapsed: bool,

    /// Ordered chain of ancestor spacer ids mirroring the row's depth,
    /// usually ending with the row's own id
    #[serde(default)]
    pub ancestor_chain: Vec<String>,
}

impl RowSnapshot {
    /// Create a minimal snapshot with the given identity
    pub fn new(id: impl Into<String>, name: impl Into<String>, depth: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            depth,
            class_tokens: Vec::new(),
            icon_ref: None,
            is_collapsed: false,
            ancestor_chain: Vec::new(),
        }
    }

    /// Builder method: set class tokens
    pub fn with_class_tokens(mut self, tokens: Vec<String>) -> Self {
        self.class_tokens = tokens;
        self
    }

    /// Builder method: set the icon reference
    pub fn with_icon(mut self, icon_ref: impl Into<String>) -> Self {
        self.icon_ref = Some(icon_ref.into());
        self
    }

    /// Builder method: mark the row collapsed
    pub fn collapsed(mut self, collapsed: bool) -> Self {
        self.is_collapsed = collapsed;
        self
    }

    /// Builder method: set the ancestor spacer chain
    pub fn with_ancestor_chain(mut self, chain: Vec<String>) -> Self {
        self.ancestor_chain = chain;
        self
    }

    /// Check whether the row carries a specific class token
    pub fn has_class(&self, token: &str) -> bool {
        self.class_tokens.iter().any(|c| c == token)
    }
}

/// Driver-side view of a virtualized tree widget
///
/// Implementations are expected to be infallible at this surface: a read that
/// fails transiently should be logged and reported as an empty/zero value, so
/// the caller's bounded waits and rescans can absorb it. All methods take
/// `&self` because the mutable resource is the foreign document, not the
/// adapter itself.
pub trait TreeUi {
    /// Whether the root scroll container exists in the document yet
    fn container_ready(&self) -> bool;

    /// Snapshot every row currently attached to the DOM, in render order
    fn visible_rows(&self) -> Vec<RowSnapshot>;

    /// Click the expander of the row with the given id. Best effort; the
    /// caller verifies the outcome by re-reading the rows.
    fn expand(&self, id: &str);

    /// Scroll the container to its maximum extent and return the resulting
    /// scroll offset in pixels
    fn scroll_to_max(&self) -> f64;

    /// Current scrollable content extent, used as the stability measure
    /// after a scroll
    fn content_extent(&self) -> f64;

    /// Fire-and-forget progress sink; must never block
    fn report_progress(&self, _message: &str) {}
}
