//! Frontier expansion controller
//!
//! Drives the virtualized tree widget to a fixed point: expand every visible
//! collapsed row, snapshot what is rendered, scroll to pull more rows into
//! existence, repeat. The widget only ever materializes a scrolled window of
//! the structure, so convergence has to be proven from indirect signals — no
//! new expansions, no effective scroll movement, and an unchanged count of
//! collapsed rows across two consecutive passes.
//!
//! All work is strictly serialized. Concurrent clicks against a virtualized
//! widget race on DOM identity, so every successful expansion restarts the
//! scan from a fresh snapshot instead of continuing over a stale row list.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::Serialize;

use crate::discovery::classify::NodeType;
use crate::discovery::rebuild::{self, HierarchyNode};
use crate::discovery::tracker::Registry;
use crate::error::{DiscoveryError, Result};
use crate::ui::TreeUi;
use crate::wait;

/// Phase of the discovery state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Expanding,
    Scrolling,
    Converged,
}

/// Tuning knobs for a discovery run
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Absolute cap on outer iterations; guarantees termination even against
    /// a widget that never stops producing collapsed rows
    pub max_iterations: u32,

    /// How long to wait for the tree container to appear before giving up on
    /// the run entirely
    pub initial_load_wait: Duration,

    /// How long to wait for a single expand click to take effect
    pub expand_wait: Duration,

    /// How long to wait for the scrollable extent to settle after a scroll
    pub scroll_settle_wait: Duration,

    /// Polling interval for all waits
    pub poll_interval: Duration,

    /// Consecutive identical extent samples required to call a scroll settled
    pub stable_checks: u32,

    /// Total failed-click attempts tolerated per row before it is skipped for
    /// the rest of the run
    pub max_expand_attempts: u32,

    /// Cap on successful expansions within a single pass. A widget that mints
    /// a fresh collapsed row for every one expanded would otherwise pin the
    /// expand loop forever; this bound returns control to the outer loop so
    /// `max_iterations` stays an absolute guarantee.
    pub max_expansions_per_iteration: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            initial_load_wait: Duration::from_secs(15),
            expand_wait: Duration::from_secs(2),
            scroll_settle_wait: Duration::from_secs(3),
            poll_interval: Duration::from_millis(50),
            stable_checks: 3,
            max_expand_attempts: 3,
            max_expansions_per_iteration: 200,
        }
    }
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the outer iteration cap
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Builder method: set the per-click expansion wait
    pub fn expand_wait(mut self, expand_wait: Duration) -> Self {
        self.expand_wait = expand_wait;
        self
    }

    /// Builder method: set the initial container wait
    pub fn initial_load_wait(mut self, initial_load_wait: Duration) -> Self {
        self.initial_load_wait = initial_load_wait;
        self
    }

    /// Builder method: set the post-scroll settle wait
    pub fn scroll_settle_wait(mut self, scroll_settle_wait: Duration) -> Self {
        self.scroll_settle_wait = scroll_settle_wait;
        self
    }

    /// Builder method: set the polling interval
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Builder method: set the per-pass expansion cap
    pub fn max_expansions_per_iteration(mut self, max_expansions: u32) -> Self {
        self.max_expansions_per_iteration = max_expansions;
        self
    }
}

/// Result of a discovery run
///
/// Always produced, converged or not: a partial hierarchy is still useful
/// output, and `converged: false` means "best effort, possibly incomplete"
/// rather than an error.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiscoveryReport {
    /// Reconstructed root forest
    pub roots: Vec<HierarchyNode>,

    /// Count of every tracked id by classified type
    pub type_counts: HashMap<NodeType, usize>,

    /// Total distinct row ids ever tracked, coverage leaves included
    pub total_tracked: usize,

    /// Outer iterations performed
    pub iterations: u32,

    /// Whether the run reached its fixed point before the iteration cap
    pub converged: bool,
}

impl DiscoveryReport {
    /// Export the report as pretty-printed JSON
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One discovery run against a tree widget
pub struct HierarchyDiscovery<'a, U: TreeUi + ?Sized> {
    ui: &'a U,
    config: DiscoveryConfig,
    registry: Registry,
    state: ControllerState,
    last_scroll_offset: f64,
    failed_expands: HashMap<String, u32>,
}

impl<'a, U: TreeUi + ?Sized> HierarchyDiscovery<'a, U> {
    pub fn new(ui: &'a U) -> Self {
        Self::with_config(ui, DiscoveryConfig::default())
    }

    pub fn with_config(ui: &'a U, config: DiscoveryConfig) -> Self {
        Self {
            ui,
            config,
            registry: Registry::new(),
            state: ControllerState::Idle,
            last_scroll_offset: 0.0,
            failed_expands: HashMap::new(),
        }
    }

    /// Current phase of the state machine
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Observations accumulated so far
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run discovery to convergence or the iteration cap.
    ///
    /// The only error case is the tree container never appearing at all;
    /// every other failure degrades into the returned report.
    pub fn run(mut self) -> Result<DiscoveryReport> {
        let ui = self.ui;

        if !wait::wait_for_condition(
            || ui.container_ready(),
            self.config.initial_load_wait,
            self.config.poll_interval,
        ) {
            return Err(DiscoveryError::ContainerNeverAppeared(self.config.initial_load_wait));
        }

        let mut converged = false;
        let mut iteration = 0u32;
        // Collapsed-row count at the end of the previous pass; part of the
        // fixed-point test from the first iteration on.
        let mut prev_collapsed = 0usize;

        while iteration < self.config.max_iterations {
            iteration += 1;

            self.state = ControllerState::Expanding;
            let expansions = self.expand_visible();

            let rows = ui.visible_rows();
            let newly_tracked = self.registry.track(&rows, iteration);
            self.registry.record_iteration(iteration, &rows);

            let collapsed = rows.iter().filter(|r| r.is_collapsed).count();
            log::debug!(
                "iteration {}: {} visible, {} new, {} expanded, {} still collapsed",
                iteration,
                rows.len(),
                newly_tracked,
                expansions,
                collapsed
            );
            ui.report_progress(&format!(
                "Scanning locations... {} found (pass {})",
                self.registry.total_tracked(),
                iteration
            ));

            // Even with nothing collapsed, one final scroll check is owed:
            // virtualization may be withholding rows it never rendered.
            self.state = ControllerState::Scrolling;
            let moved = self.scroll_and_settle();

            if expansions == 0 && !moved && collapsed == prev_collapsed {
                self.state = ControllerState::Converged;
                converged = true;
                break;
            }
            prev_collapsed = collapsed;
        }

        if converged {
            ui.report_progress("Location scan complete");
        } else {
            log::warn!("discovery hit the iteration cap ({}) before converging", iteration);
            ui.report_progress("Location scan stopped at iteration cap; results may be partial");
        }

        let built = rebuild::build(&self.registry);
        Ok(DiscoveryReport {
            roots: built.roots,
            type_counts: built.type_counts,
            total_tracked: self.registry.total_tracked(),
            iterations: iteration,
            converged,
        })
    }

    /// Expand every visible collapsed row until a full scan finds no
    /// remaining candidate.
    ///
    /// After each successful click the scan restarts from a fresh snapshot;
    /// the click may have shifted or regenerated neighboring rows, so
    /// continuing over the old list would act on stale identities. Rows
    /// already attempted this pass are excluded from "remaining", which keeps
    /// a row whose click never takes from pinning the loop, and total
    /// successful expansions per pass are capped so a widget that mints new
    /// collapsed rows on every click cannot pin it either.
    fn expand_visible(&mut self) -> u64 {
        let ui = self.ui;
        let mut expansions = 0u64;
        let mut attempted: HashSet<String> = HashSet::new();

        loop {
            if expansions >= u64::from(self.config.max_expansions_per_iteration) {
                log::debug!(
                    "expansion cap ({}) reached this pass; yielding to the outer loop",
                    self.config.max_expansions_per_iteration
                );
                break;
            }

            let rows = ui.visible_rows();
            let before_count = rows.len();

            let candidate = rows.into_iter().find(|r| {
                r.is_collapsed
                    && !r.id.is_empty()
                    && !attempted.contains(&r.id)
                    && self.failed_expands.get(&r.id).copied().unwrap_or(0) < self.config.max_expand_attempts
            });
            let Some(row) = candidate else {
                break;
            };

            attempted.insert(row.id.clone());
            ui.expand(&row.id);

            let id = row.id.clone();
            let expanded = wait::wait_for_condition(
                || {
                    let rows = ui.visible_rows();
                    match rows.iter().find(|r| r.id == id) {
                        // Expansion confirmed by the flag flipping...
                        Some(r) => !r.is_collapsed,
                        // ...or by the click having regenerated the window
                        None => rows.len() != before_count,
                    }
                },
                self.config.expand_wait,
                self.config.poll_interval,
            );

            if expanded {
                expansions += 1;
            } else {
                let failures = self.failed_expands.entry(row.id.clone()).or_insert(0);
                *failures += 1;
                log::warn!(
                    "expand click on {:?} ({:?}) had no effect within {:?} (attempt {})",
                    row.id,
                    row.name,
                    self.config.expand_wait,
                    failures
                );
            }
        }

        expansions
    }

    /// Scroll to the maximum extent, wait for the content extent to settle,
    /// and report whether the scroll position effectively moved.
    fn scroll_and_settle(&mut self) -> bool {
        let ui = self.ui;
        let offset = ui.scroll_to_max();

        if !wait::wait_for_stable(
            || ui.content_extent(),
            self.config.scroll_settle_wait,
            self.config.poll_interval,
            self.config.stable_checks,
        ) {
            log::debug!("content extent still changing after {:?}", self.config.scroll_settle_wait);
        }

        let moved = (offset - self.last_scroll_offset).abs() > 0.5;
        self.last_scroll_offset = offset;
        moved
    }
}

/// Run a discovery with the given configuration against any tree UI.
///
/// This is the single entry point callers need; [`HierarchyDiscovery`] is
/// exposed for callers that want to hold the run as a value.
pub fn discover_hierarchy<U: TreeUi + ?Sized>(ui: &U, config: DiscoveryConfig) -> Result<DiscoveryReport> {
    HierarchyDiscovery::with_config(ui, config).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::RowSnapshot;
    use std::cell::RefCell;

    fn fast() -> DiscoveryConfig {
        DiscoveryConfig {
            max_iterations: 8,
            initial_load_wait: Duration::from_millis(30),
            expand_wait: Duration::from_millis(30),
            scroll_settle_wait: Duration::from_millis(30),
            poll_interval: Duration::from_millis(2),
            stable_checks: 2,
            max_expand_attempts: 2,
            max_expansions_per_iteration: 6,
        }
    }

    /// Minimal fixture: a fully rendered, non-virtualized row list whose
    /// collapsed rows reveal children on click.
    struct StaticTree {
        rows: RefCell<Vec<RowSnapshot>>,
        hidden: RefCell<Vec<(String, Vec<RowSnapshot>)>>,
    }

    impl StaticTree {
        fn new(rows: Vec<RowSnapshot>) -> Self {
            Self { rows: RefCell::new(rows), hidden: RefCell::new(Vec::new()) }
        }

        fn with_hidden_children(self, parent: &str, children: Vec<RowSnapshot>) -> Self {
            self.hidden.borrow_mut().push((parent.to_string(), children));
            self
        }
    }

    impl TreeUi for StaticTree {
        fn container_ready(&self) -> bool {
            true
        }

        fn visible_rows(&self) -> Vec<RowSnapshot> {
            self.rows.borrow().clone()
        }

        fn expand(&self, id: &str) {
            let mut rows = self.rows.borrow_mut();
            let Some(pos) = rows.iter().position(|r| r.id == id && r.is_collapsed) else {
                return;
            };
            rows[pos].is_collapsed = false;

            let mut hidden = self.hidden.borrow_mut();
            if let Some(entry_pos) = hidden.iter().position(|(p, _)| p == id) {
                let (_, children) = hidden.remove(entry_pos);
                for (i, child) in children.into_iter().enumerate() {
                    rows.insert(pos + 1 + i, child);
                }
            }
        }

        fn scroll_to_max(&self) -> f64 {
            0.0
        }

        fn content_extent(&self) -> f64 {
            self.rows.borrow().len() as f64 * 24.0
        }
    }

    fn chain(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fully_visible_tree_converges_in_one_iteration() {
        let ui = StaticTree::new(vec![
            RowSnapshot::new("root", "Acme", 0).with_ancestor_chain(chain(&["root"])),
            RowSnapshot::new("c1", "East", 1)
                .with_class_tokens(vec!["node-campus".to_string()])
                .with_ancestor_chain(chain(&["root", "c1"])),
        ]);

        let report = discover_hierarchy(&ui, fast()).unwrap();
        assert!(report.converged);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.total_tracked, 2);
        assert_eq!(report.roots.len(), 1);
    }

    #[test]
    fn test_collapsed_row_is_expanded_before_convergence() {
        let ui = StaticTree::new(vec![
            RowSnapshot::new("root", "Acme", 0).with_ancestor_chain(chain(&["root"])),
            RowSnapshot::new("c1", "East", 1)
                .with_class_tokens(vec!["node-campus".to_string()])
                .with_ancestor_chain(chain(&["root", "c1"]))
                .collapsed(true),
        ])
        .with_hidden_children(
            "c1",
            vec![
                RowSnapshot::new("b1", "Tower A", 2)
                    .with_class_tokens(vec!["node-building".to_string()])
                    .with_ancestor_chain(chain(&["root", "c1", "b1"])),
            ],
        );

        let report = discover_hierarchy(&ui, fast()).unwrap();
        assert!(report.converged);
        assert_eq!(report.total_tracked, 3);
        assert_eq!(report.roots[0].find("b1").unwrap().name, "Tower A");
    }

    #[test]
    fn test_stuck_collapsed_row_does_not_prevent_convergence() {
        struct StuckTree(StaticTree);
        impl TreeUi for StuckTree {
            fn container_ready(&self) -> bool {
                true
            }
            fn visible_rows(&self) -> Vec<RowSnapshot> {
                self.0.visible_rows()
            }
            fn expand(&self, _id: &str) {
                // Click never takes effect
            }
            fn scroll_to_max(&self) -> f64 {
                0.0
            }
            fn content_extent(&self) -> f64 {
                self.0.content_extent()
            }
        }

        let ui = StuckTree(StaticTree::new(vec![
            RowSnapshot::new("root", "Acme", 0).with_ancestor_chain(chain(&["root"])),
            RowSnapshot::new("c1", "East", 1)
                .with_class_tokens(vec!["node-campus".to_string()])
                .with_ancestor_chain(chain(&["root", "c1"]))
                .collapsed(true),
        ]));

        let report = discover_hierarchy(&ui, fast()).unwrap();
        assert!(report.converged);
        assert_eq!(report.total_tracked, 2);
        assert_eq!(report.type_counts[&NodeType::Campus], 1);
    }

    #[test]
    fn test_missing_container_is_fatal() {
        struct NoContainer;
        impl TreeUi for NoContainer {
            fn container_ready(&self) -> bool {
                false
            }
            fn visible_rows(&self) -> Vec<RowSnapshot> {
                Vec::new()
            }
            fn expand(&self, _id: &str) {}
            fn scroll_to_max(&self) -> f64 {
                0.0
            }
            fn content_extent(&self) -> f64 {
                0.0
            }
        }

        let err = discover_hierarchy(&NoContainer, fast()).unwrap_err();
        assert!(matches!(err, DiscoveryError::ContainerNeverAppeared(_)));
    }

    #[test]
    fn test_expansion_minting_widget_terminates_at_iteration_cap() {
        // Every expansion reveals exactly one fresh collapsed row, so the
        // supply of candidates never dries up on its own.
        struct CollapseMint {
            generation: RefCell<u32>,
        }

        impl TreeUi for CollapseMint {
            fn container_ready(&self) -> bool {
                true
            }

            fn visible_rows(&self) -> Vec<RowSnapshot> {
                let generation = *self.generation.borrow();
                (0..=generation)
                    .map(|i| {
                        RowSnapshot::new(format!("n{i}"), format!("Area {i}"), 2)
                            .with_class_tokens(vec!["node-area".to_string()])
                            .collapsed(i == generation)
                    })
                    .collect()
            }

            fn expand(&self, id: &str) {
                let mut generation = self.generation.borrow_mut();
                if id == format!("n{}", *generation) {
                    *generation += 1;
                }
            }

            fn scroll_to_max(&self) -> f64 {
                0.0
            }

            fn content_extent(&self) -> f64 {
                f64::from(*self.generation.borrow() + 1) * 24.0
            }
        }

        let ui = CollapseMint { generation: RefCell::new(0) };
        let config = DiscoveryConfig { max_iterations: 3, ..fast() };

        let report = discover_hierarchy(&ui, config).unwrap();

        assert!(!report.converged);
        assert_eq!(report.iterations, 3);
        // Per pass: the expansion cap's worth of new rows, all tracked
        assert_eq!(report.total_tracked, 3 * 6 + 1);
    }

    #[test]
    fn test_config_builder() {
        let config = DiscoveryConfig::new()
            .max_iterations(7)
            .expand_wait(Duration::from_millis(100))
            .poll_interval(Duration::from_millis(5))
            .max_expansions_per_iteration(9);

        assert_eq!(config.max_iterations, 7);
        assert_eq!(config.expand_wait, Duration::from_millis(100));
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(config.max_expansions_per_iteration, 9);
    }

    #[test]
    fn test_report_to_json() {
        let ui = StaticTree::new(vec![
            RowSnapshot::new("root", "Acme", 0).with_ancestor_chain(chain(&["root"])),
        ]);
        let report = discover_hierarchy(&ui, fast()).unwrap();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"converged\": true"));
        assert!(json.contains("Acme"));
    }
}
