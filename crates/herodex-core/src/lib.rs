//! # herodex-core
//!
//! Core abstractions shared by the herodex crates:
//!
//! - **Error Types**: Shared error definitions and result types
//! - **Storage**: The conditional-write storage contract used for durable
//!   curated lists, with in-memory and local-directory backends
//! - **Observability**: Logging initialisation and span helpers
//!
//! ## Example
//!
//! ```rust
//! use herodex_core::prelude::*;
//!
//! let backend = MemoryBackend::new();
//! let precondition = WritePrecondition::DoesNotExist;
//! # let _ = (backend, precondition);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod file_storage;
pub mod observability;
pub mod storage;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::file_storage::FileBackend;
    pub use crate::storage::{
        MemoryBackend, ObjectMeta, StorageBackend, VersionedObject, WritePrecondition,
        WriteResult,
    };
}

pub use error::{Error, Result};
pub use file_storage::FileBackend;
pub use observability::{LogFormat, init_logging};
pub use storage::{
    MemoryBackend, ObjectMeta, StorageBackend, VersionedObject, WritePrecondition, WriteResult,
};
