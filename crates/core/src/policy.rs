//! Reconciliation policies shared by the extractor and the synchronizer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What to do when two elements in fetched markup carry the same identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// Keep one section per key, holding the content of the last occurrence.
    #[default]
    LastWins,
    /// Treat the markup as unusable.
    Reject,
}

/// Knobs for one page synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// How long a stored page is served before the source is re-fetched.
    pub page_ttl: Duration,
    /// Delete stored sections whose keys are absent from a refreshed source.
    pub prune_missing: bool,
    pub duplicates: DuplicateKeyPolicy,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self { page_ttl: Duration::from_secs(3_600), prune_missing: false, duplicates: DuplicateKeyPolicy::LastWins }
    }
}
