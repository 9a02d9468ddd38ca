//! # herodex-catalog
//!
//! Domain logic for the herodex service.
//!
//! ## Components
//!
//! - **Catalog store** ([`CatalogStore`]): loads the entity and attribute
//!   datasets once, single-flight, into an immutable [`CatalogSnapshot`]
//! - **Join** ([`normalize`]): attaches to each entity the attribute names
//!   flagged true in its attribute row
//! - **Query engine** ([`query()`]): case-insensitive filters, a typed
//!   [`SortKey`] and a result cap
//! - **Validation** ([`validation`]): sanitising and range-checking raw input,
//!   reporting every offending parameter at once
//! - **List store** ([`ListStore`]): durable curated lists with
//!   compare-and-swap membership updates
//!
//! ## Example
//!
//! ```rust
//! use herodex_catalog::{AttributeRow, CatalogStore, QueryParams, RawEntity, StaticSource, query};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = CatalogStore::new(StaticSource::new(
//!     vec![RawEntity::new(1, "Wolverine").with_race("Mutant")],
//!     vec![AttributeRow::from_flags("Wolverine", [("Agility", true)])],
//! ));
//! let snapshot = store.load().await.unwrap();
//! let params = QueryParams { power: Some("agil".into()), ..QueryParams::default() };
//! assert_eq!(query(&snapshot, &params).len(), 1);
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod lists;
pub mod normalize;
pub mod query;
pub mod record;
pub mod source;
pub mod store;
pub mod validation;

pub use error::{CatalogError, FieldIssue, Result, ValidationError};
pub use lists::{CuratedList, ListStore};
pub use normalize::LoadReport;
pub use query::{QueryParams, SortKey, find_by_id, query};
pub use record::{AttributeRow, EntityId, EntityRecord, RawEntity};
pub use source::{DatasetSource, JsonFileSource, StaticSource};
pub use store::{CatalogBounds, CatalogSnapshot, CatalogStore};
pub use validation::{
    RawQuery, parse_entity_id, sanitize_filter, validate_entity_id, validate_list_name,
    validate_query,
};
