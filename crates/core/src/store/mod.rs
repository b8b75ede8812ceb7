//! SQLite-backed store for synchronized pages and their sections.
//!
//! This module provides the relational side of page synchronization using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Atomic first-time store of a page with all of its sections
//! - Per-key reconciliation of sections on refresh (insert missing, update existing)
//! - Editorial section overrides
//! - Arbitrary parametrized reads for the query cache
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod migrations;
pub mod pages;
pub mod query;
pub mod sections;

pub use crate::Error;

pub use connection::PageDb;
pub use pages::{NewPage, Page, StoreOutcome, SyncReport};
pub use sections::{Section, SectionContent, collapse_duplicate_keys};

use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::rusqlite;

/// Encode a timestamp the way every table stores it.
pub(crate) fn encode_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored timestamp from column `idx`.
pub(crate) fn decode_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

/// `?a, ?b, ...` numbered placeholders for `count` values starting at `first`.
pub(crate) fn numbered_placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|n| format!("?{n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_roundtrip_keeps_micros() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:20:30.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let encoded = encode_ts(at);
        assert_eq!(encoded, "2024-05-01T10:20:30.123456Z");
        assert_eq!(decode_ts(0, &encoded).unwrap(), at);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_ts(3, "yesterday").is_err());
    }

    #[test]
    fn test_numbered_placeholders() {
        assert_eq!(numbered_placeholders(2, 3), "?2, ?3, ?4");
        assert_eq!(numbered_placeholders(1, 0), "");
    }
}
