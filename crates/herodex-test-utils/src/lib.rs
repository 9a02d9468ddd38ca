//! Shared test utilities for herodex integration tests.
//!
//! This crate provides:
//! - [`TracingMemoryBackend`]: In-memory storage with operation recording
//! - [`TestContext`]: Catalog and list stores over the sample dataset
//! - [`CountingSource`]: Dataset source with read counters and fault injection
//! - Custom assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use herodex_test_utils::{TestContext, assert_conflict};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let ctx = TestContext::new();
//!     let bounds = ctx.catalog.load().await.unwrap().bounds();
//!     ctx.lists.create("favs").await.unwrap();
//!     ctx.lists.add_member("favs", 1, bounds).await.unwrap();
//!     assert_conflict(&ctx.lists.add_member("favs", 1, bounds).await);
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;
pub mod storage;

pub use assertions::*;
pub use fixtures::*;
pub use storage::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("herodex=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
