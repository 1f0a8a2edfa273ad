use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while driving a tree UI or attaching to a browser
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The root scroll container never appeared within the allotted wait.
    ///
    /// This is the only condition that aborts a discovery run outright. Every
    /// other failure mode (a click that never takes, a row that cannot be
    /// classified, an iteration budget that runs out) degrades into the
    /// returned report instead of becoming an error.
    #[error("tree container did not appear within {0:?}")]
    ContainerNeverAppeared(Duration),

    /// Failed to navigate to the page hosting the tree widget
    #[error("failed to navigate to {url}: {reason}")]
    NavigationFailed { url: String, reason: String },

    /// A script evaluated against the live page returned something unusable
    #[error("failed to read tree rows from page: {0}")]
    RowHarvestFailed(String),
}

/// Result type alias for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;
