//! Virtualized hierarchy discovery engine
//!
//! This module is the core of the crate. It reconstructs a complete location
//! hierarchy from a tree widget that never renders more than a scrolled
//! window of itself:
//! - [`controller`]: frontier expansion state machine driving the widget to a
//!   provable fixed point
//! - [`tracker`]: id-keyed registry accumulating row observations across
//!   passes
//! - [`classify`]: ordered-rule node-type classification
//! - [`rebuild`]: pure reconstruction of the hierarchy from the final
//!   registry

pub mod classify;
pub mod controller;
pub mod rebuild;
pub mod tracker;

pub use classify::{NodeType, classify, is_noise};
pub use controller::{
    ControllerState, DiscoveryConfig, DiscoveryReport, HierarchyDiscovery, discover_hierarchy,
};
pub use rebuild::{BuiltHierarchy, HierarchyNode, build};
pub use tracker::{IterationRecord, NoiseLeaf, Registry, TrackedNode};
