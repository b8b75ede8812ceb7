//! Freshness gate for synchronized pages.
//!
//! Pure: the caller supplies the timestamps, so the verdict is reproducible.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Verdict for a stored page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Serve the stored page as-is.
    Hit,
    /// Re-fetch and reconcile.
    Miss,
}

impl Freshness {
    pub fn is_hit(self) -> bool {
        self == Freshness::Hit
    }
}

/// Decide whether a page last synchronized at `updated_at` is still fresh at `now`.
///
/// `Hit` when `now - updated_at <= ttl`. A `now` earlier than `updated_at`
/// (clock skew between writers) counts as fresh.
pub fn evaluate(updated_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> Freshness {
    let Ok(ttl) = TimeDelta::from_std(ttl) else {
        return Freshness::Hit;
    };

    if now.signed_duration_since(updated_at) <= ttl { Freshness::Hit } else { Freshness::Miss }
}
