//! Client code for pagesync.
//!
//! This crate provides the HTTP fetch of source pages, section extraction,
//! markup rewriting and the page cache that ties them to the store.

pub mod extract;
pub mod fetch;
pub mod sync;

pub use extract::{Rewrite, extract_sections, replace_sections, rewrite_sections};
pub use fetch::{ContentSource, FetchClient, FetchConfig};
pub use sync::{PageCache, PageView, SingleFlight};
