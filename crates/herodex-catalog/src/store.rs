//! Lazily loaded, immutable catalog snapshot.
//!
//! The store reads both datasets at most once per load generation. Concurrent
//! callers share a single in-flight load through a `tokio::sync::OnceCell` and
//! all observe its outcome, including failure. A failed generation is retired
//! afterwards so the next `load()` starts a fresh attempt; partial data is never
//! cached.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use herodex_core::observability::catalog_span;
use tokio::sync::OnceCell;
use tracing::Instrument;

use crate::error::Result;
use crate::normalize::{LoadReport, join};
use crate::record::{AttributeRow, EntityId, EntityRecord, RawEntity};
use crate::source::DatasetSource;

type LoadOutcome = Result<Arc<CatalogSnapshot>>;
type LoadCell = Arc<OnceCell<LoadOutcome>>;

/// Range limits derived from a loaded catalog, used to validate numeric inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogBounds {
    /// Highest entity id present, `None` for an empty catalog.
    pub max_id: Option<EntityId>,
    /// Number of entities.
    pub size: usize,
}

/// Normalized, read-only view of the catalog.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    records: Vec<EntityRecord>,
    by_id: HashMap<EntityId, usize>,
    max_id: Option<EntityId>,
    report: LoadReport,
}

impl CatalogSnapshot {
    /// Joins raw datasets into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DataUnavailable` if the entity ids are not unique.
    pub fn build(entities: Vec<RawEntity>, attribute_rows: &[AttributeRow]) -> Result<Self> {
        let (records, report) = join(entities, attribute_rows)?;
        let by_id = records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.id, index))
            .collect();
        let max_id = records.iter().map(|record| record.id).max();
        Ok(Self {
            records,
            by_id,
            max_id,
            report,
        })
    }

    /// All records in dataset order.
    #[must_use]
    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.by_id.get(&id).map(|&index| &self.records[index])
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` for an empty catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Numeric limits for `id` and `limit` validation.
    #[must_use]
    pub fn bounds(&self) -> CatalogBounds {
        CatalogBounds {
            max_id: self.max_id,
            size: self.records.len(),
        }
    }

    /// Counters recorded while building this snapshot.
    #[must_use]
    pub fn report(&self) -> LoadReport {
        self.report
    }
}

/// Owner of the catalog snapshot and its load lifecycle.
pub struct CatalogStore {
    source: Arc<dyn DatasetSource>,
    current: RwLock<LoadCell>,
}

impl fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogStore")
            .field("source", &self.source.describe())
            .field("loaded", &self.snapshot().is_some())
            .finish()
    }
}

impl CatalogStore {
    /// Creates a store that loads from `source` on first use.
    pub fn new(source: impl DatasetSource) -> Self {
        Self::from_shared(Arc::new(source))
    }

    /// Creates a store over an already shared source.
    #[must_use]
    pub fn from_shared(source: Arc<dyn DatasetSource>) -> Self {
        Self {
            source,
            current: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    /// Returns the snapshot, loading it first if needed.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DataUnavailable` if either dataset cannot be read
    /// or joined. Every caller that awaited the same attempt receives the same error.
    pub async fn load(&self) -> Result<Arc<CatalogSnapshot>> {
        let cell = self.current_cell();
        let outcome = cell.get_or_init(|| self.build()).await.clone();
        if outcome.is_err() {
            self.retire(&cell);
        }
        outcome
    }

    /// Returns the snapshot if a load has completed successfully.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<CatalogSnapshot>> {
        self.current_cell()
            .get()
            .and_then(|outcome| outcome.as_ref().ok().cloned())
    }

    /// Discards the cached snapshot; the next `load()` re-reads the sources.
    pub fn reload(&self) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(OnceCell::new());
        tracing::info!("catalog snapshot discarded");
    }

    fn current_cell(&self) -> LoadCell {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn retire(&self, failed: &LoadCell) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if Arc::ptr_eq(&current, failed) {
            *current = Arc::new(OnceCell::new());
        }
    }

    async fn build(&self) -> LoadOutcome {
        self.read_and_join().instrument(catalog_span("load")).await
    }

    async fn read_and_join(&self) -> LoadOutcome {
        let (entities, attribute_rows) =
            tokio::try_join!(self.source.read_entities(), self.source.read_attributes())
                .inspect_err(|error| {
                    tracing::error!(source = %self.source.describe(), %error, "catalog read failed");
                })?;
        let snapshot = CatalogSnapshot::build(entities, &attribute_rows).inspect_err(|error| {
            tracing::error!(source = %self.source.describe(), %error, "catalog join failed");
        })?;

        let report = snapshot.report();
        tracing::info!(
            source = %self.source.describe(),
            entities = report.entities,
            attribute_rows = report.attribute_rows,
            unmatched_entities = report.unmatched_entities,
            duplicate_attribute_rows = report.duplicate_attribute_rows,
            "catalog loaded"
        );
        Ok(Arc::new(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::source::StaticSource;

    fn source() -> StaticSource {
        StaticSource::new(
            vec![RawEntity::new(0, "A-Bomb"), RawEntity::new(5, "Abe Sapien")],
            vec![AttributeRow::from_flags("A-Bomb", [("Durability", true)])],
        )
    }

    #[tokio::test]
    async fn load_caches_snapshot() {
        let store = CatalogStore::new(source());
        assert!(store.snapshot().is_none());

        let first = store.load().await.expect("load");
        let second = store.load().await.expect("load");

        assert!(Arc::ptr_eq(&first, &second));
        assert!(store.snapshot().is_some());
        assert_eq!(first.len(), 2);
        assert_eq!(first.get(0).map(|r| r.attributes.clone()), Some(vec!["Durability".to_string()]));
    }

    #[tokio::test]
    async fn bounds_reflect_catalog() {
        let store = CatalogStore::new(source());
        let snapshot = store.load().await.expect("load");

        assert_eq!(
            snapshot.bounds(),
            CatalogBounds {
                max_id: Some(5),
                size: 2
            }
        );
        assert_eq!(CatalogSnapshot::build(vec![], &[]).expect("empty").bounds().max_id, None);
    }

    #[tokio::test]
    async fn reload_builds_a_new_snapshot() {
        let store = CatalogStore::new(source());
        let first = store.load().await.expect("load");

        store.reload();
        assert!(store.snapshot().is_none());

        let second = store.load().await.expect("load");
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn duplicate_ids_fail_the_load_and_nothing_is_cached() {
        let store = CatalogStore::new(StaticSource::new(
            vec![RawEntity::new(1, "A"), RawEntity::new(1, "B")],
            vec![],
        ));

        let err = store.load().await.expect_err("duplicate ids");
        assert!(matches!(err, CatalogError::DataUnavailable { .. }));
        assert!(store.snapshot().is_none());
    }
}
