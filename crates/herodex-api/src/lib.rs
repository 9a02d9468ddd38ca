//! # herodex-api
//!
//! HTTP composition layer for the herodex superhero catalog.
//!
//! This crate provides the API surface, handling:
//!
//! - **Routing**: catalog query and curated-list endpoints
//! - **Error mapping**: domain errors to stable JSON error bodies
//! - **Service Wiring**: dataset source, list storage and middleware
//! - **Observability**: request IDs, request tracing and health checks
//!
//! All query, validation and list semantics live in `herodex-catalog`.
//!
//! ## Endpoints
//!
//! ```text
//! GET    /health                              - Health check
//! GET    /ready                               - Readiness (catalog loaded)
//! GET    /openapi.json                        - OpenAPI document
//! GET    /api/superheroes                     - Filter / sort / limit
//! GET    /api/superheroes/{id}                - Single superhero
//! GET    /api/lists                           - List names
//! POST   /api/lists                           - Create list
//! GET    /api/lists/{name}                    - Member ids
//! DELETE /api/lists/{name}                    - Delete list
//! GET    /api/lists/{name}/superheroes        - Member records
//! POST   /api/lists/{name}/superheroes        - Add member
//! DELETE /api/lists/{name}/superheroes/{id}   - Remove member
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use herodex_api::server::Server;
//!
//! let server = Server::builder()
//!     .http_port(8080)
//!     .debug(true)
//!     .build();
//!
//! server.serve().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod context;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::context::RequestContext;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::server::{Server, ServerBuilder};
}
