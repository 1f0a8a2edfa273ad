//! # treecrawl
//!
//! A Rust library for exhaustively discovering virtualized, lazily-rendered
//! tree widgets: it drives expand/scroll cycles against a live UI and
//! reconstructs the full hierarchy from the partial scrolled snapshots the
//! widget is willing to render.
//!
//! ## The problem
//!
//! Virtualized tree widgets never materialize more than a window of their
//! content: rows are recycled as the viewport moves, children exist only
//! after an explicit expand click, and every read races against asynchronous
//! batched re-renders. Enumerating such a tree completely means solving three
//! coupled problems at once:
//!
//! - driving the widget until it has rendered everything at least once
//! - keeping row identity stable while the DOM beneath you is recycled
//! - proving you are done while only ever seeing a local window
//!
//! ## Features
//!
//! - **Frontier expansion controller**: expand-and-scroll state machine that
//!   runs to a provable fixed point, with an absolute iteration cap for
//!   pathological widgets
//! - **Element tracking**: id-keyed registry accumulating row observations
//!   across passes, with parent inference from indentation spacer chains
//! - **Hierarchy reconstruction**: deterministic, name-sorted tree built as a
//!   pure function of the final registry; unresolvable entries surface as
//!   extra roots instead of being dropped
//! - **Chrome adapter**: drive a real page over the Chrome DevTools Protocol
//!   (enabled by the default `chrome` feature)
//!
//! ## Example
//!
//! ```rust,no_run
//! use treecrawl::{ChromeTreeUi, DiscoveryConfig, discover_hierarchy};
//! use headless_chrome::Browser;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let browser = Browser::default()?;
//! let tab = browser.new_tab()?;
//!
//! let ui = ChromeTreeUi::new(tab);
//! ui.navigate("https://dashboard.example.com/locations")?;
//!
//! let report = discover_hierarchy(&ui, DiscoveryConfig::default())?;
//! println!(
//!     "{} locations tracked across {} roots (converged: {})",
//!     report.total_tracked,
//!     report.roots.len(),
//!     report.converged
//! );
//! # Ok(())
//! # }
//! ```
//!
//! Any widget can be driven by implementing [`TreeUi`]; the engine itself
//! never touches a DOM directly, which is also how the test suite exercises
//! it against in-memory fixtures.
//!
//! ## Module Overview
//!
//! - [`discovery`]: the discovery engine (controller, tracker, classifier,
//!   reconstructor)
//! - [`ui`]: the [`TreeUi`] collaborator trait, row snapshots, and the
//!   Chrome adapter
//! - [`wait`]: deadline-bounded predicate/stability polling
//! - [`error`]: error types and result alias

pub mod discovery;
pub mod error;
pub mod ui;
pub mod wait;

pub use discovery::{
    DiscoveryConfig, DiscoveryReport, HierarchyDiscovery, HierarchyNode, NodeType, Registry,
    TrackedNode, discover_hierarchy,
};
pub use error::{DiscoveryError, Result};
pub use ui::{RowSnapshot, TreeUi};

#[cfg(feature = "chrome")]
pub use ui::{ChromeTreeUi, TreeSelectors};
