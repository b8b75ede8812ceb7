//! Core types and shared functionality for pagesync.
//!
//! This crate provides:
//! - Page and section store with SQLite backend
//! - Freshness evaluation and synchronization policy
//! - Read-through query cache
//! - Unified error types
//! - Configuration structures

pub mod clock;
pub mod config;
pub mod error;
pub mod freshness;
pub mod policy;
pub mod query_cache;
pub mod store;
pub mod title;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::Error;
pub use freshness::Freshness;
pub use policy::{DuplicateKeyPolicy, SyncPolicy};
pub use query_cache::{QueryCache, QueryStore, ResultSet, SqlValue};
pub use store::{NewPage, Page, PageDb, Section, SectionContent, StoreOutcome, SyncReport};
