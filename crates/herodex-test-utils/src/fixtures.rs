//! Pre-built test fixtures for common test scenarios.
//!
//! Provides sample datasets, dataset sources with instrumentation, and a test
//! context wiring a catalog store and a list store together.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use herodex_catalog::{
    AttributeRow, CatalogError, CatalogStore, DatasetSource, ListStore, RawEntity, StaticSource,
};

use crate::storage::TracingMemoryBackend;

/// Entity rows of the sample dataset, in dataset order.
///
/// Includes placeholder values (`"-"`, negative height), a name shared by two
/// ids, and an entity without an attribute row.
#[must_use]
pub fn sample_entities() -> Vec<RawEntity> {
    let mut a_bomb = RawEntity::new(0, "A-Bomb")
        .with_race("Human")
        .with_publisher("Marvel Comics");
    a_bomb.gender = Some("Male".into());
    a_bomb.height = Some(203.0);
    a_bomb.weight = Some(441.0);

    let mut abe = RawEntity::new(2, "Abe Sapien")
        .with_race("Icthyo Sapien")
        .with_publisher("Dark Horse Comics");
    abe.skin_color = Some("blue".into());

    let mut unknown = RawEntity::new(3, "Abraxas")
        .with_race("-")
        .with_publisher("Marvel Comics");
    unknown.height = Some(-99.0);

    vec![
        a_bomb,
        RawEntity::new(1, "Wolverine")
            .with_race("Mutant")
            .with_publisher("Marvel"),
        abe,
        unknown,
        RawEntity::new(4, "batman")
            .with_race("Human")
            .with_publisher("DC Comics"),
        RawEntity::new(5, "Batgirl")
            .with_race("Human")
            .with_publisher("DC Comics"),
        RawEntity::new(6, "Storm")
            .with_race("Mutant")
            .with_publisher("Marvel Comics"),
        RawEntity::new(7, "Batgirl").with_publisher("DC Comics"),
    ]
}

/// Attribute rows of the sample dataset.
#[must_use]
pub fn sample_attributes() -> Vec<AttributeRow> {
    vec![
        AttributeRow::from_flags(
            "A-Bomb",
            [("Agility", false), ("Durability", true), ("Super Strength", true)],
        ),
        AttributeRow::from_flags("Wolverine", [("Agility", true), ("Stealth", false)]),
        AttributeRow::from_flags("Abe Sapien", [("Agility", true), ("Durability", true)]),
        AttributeRow::from_flags("batman", [("Stealth", true), ("Intelligence", true)]),
        AttributeRow::from_flags(
            "Storm",
            [("Flight", true), ("Weather Control", true), ("Agility", true)],
        ),
        AttributeRow::from_flags("Batgirl", [("Agility", true)]),
    ]
}

/// In-memory source serving the sample dataset.
#[must_use]
pub fn sample_source() -> StaticSource {
    StaticSource::new(sample_entities(), sample_attributes())
}

/// Sample info dataset as it appears on disk (source key spelling).
pub const SAMPLE_INFO_JSON: &str = r#"[
  {"id": 0, "name": "A-Bomb", "Gender": "Male", "Eye color": "yellow", "Race": "Human", "Hair color": "No Hair", "Height": 203.0, "Publisher": "Marvel Comics", "Skin color": "-", "Alignment": "good", "Weight": 441.0},
  {"id": 1, "name": "Wolverine", "Gender": "Male", "Eye color": "blue", "Race": "Mutant", "Hair color": "Black", "Height": 160.0, "Publisher": "Marvel", "Skin color": "-", "Alignment": "good", "Weight": 135.0},
  {"id": 2, "name": "Abe Sapien", "Gender": "Male", "Eye color": "blue", "Race": "Icthyo Sapien", "Hair color": "No Hair", "Height": 191.0, "Publisher": "Dark Horse Comics", "Skin color": "blue", "Alignment": "good", "Weight": 65.0},
  {"id": 3, "name": "Abraxas", "Gender": "Male", "Eye color": "blue", "Race": "-", "Hair color": "Black", "Height": -99.0, "Publisher": "Marvel Comics", "Skin color": "-", "Alignment": "bad", "Weight": -99.0}
]"#;

/// Sample powers dataset as it appears on disk.
pub const SAMPLE_POWERS_JSON: &str = r#"[
  {"hero_names": "A-Bomb", "Agility": "False", "Durability": "True", "Super Strength": "True"},
  {"hero_names": "Wolverine", "Agility": "True", "Durability": "False", "Stealth": "False"},
  {"hero_names": "Abe Sapien", "Agility": "True", "Durability": "True", "Stealth": "False"}
]"#;

/// File name of the on-disk info dataset.
pub const INFO_FILE: &str = "superhero_info.json";
/// File name of the on-disk powers dataset.
pub const POWERS_FILE: &str = "superhero_powers.json";

/// Writes the on-disk sample datasets into `dir`.
pub fn write_sample_dataset(dir: &Path) {
    std::fs::write(dir.join(INFO_FILE), SAMPLE_INFO_JSON).expect("write info dataset");
    std::fs::write(dir.join(POWERS_FILE), SAMPLE_POWERS_JSON).expect("write powers dataset");
}

/// Dataset source that counts reads and can delay or fail them.
#[derive(Debug)]
pub struct CountingSource<S> {
    inner: S,
    entity_reads: AtomicUsize,
    attribute_reads: AtomicUsize,
    delay: Option<Duration>,
    fail_first: AtomicUsize,
}

impl<S: DatasetSource> CountingSource<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            entity_reads: AtomicUsize::new(0),
            attribute_reads: AtomicUsize::new(0),
            delay: None,
            fail_first: AtomicUsize::new(0),
        }
    }

    /// Sleeps for `delay` before every entity read.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes the first `attempts` entity reads fail with `DataUnavailable`.
    #[must_use]
    pub fn failing_first(self, attempts: usize) -> Self {
        self.fail_first.store(attempts, Ordering::SeqCst);
        self
    }

    /// Number of entity dataset reads so far.
    pub fn entity_reads(&self) -> usize {
        self.entity_reads.load(Ordering::SeqCst)
    }

    /// Number of attribute dataset reads so far.
    pub fn attribute_reads(&self) -> usize {
        self.attribute_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: DatasetSource> DatasetSource for CountingSource<S> {
    async fn read_entities(&self) -> herodex_catalog::Result<Vec<RawEntity>> {
        self.entity_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let should_fail = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(CatalogError::DataUnavailable {
                message: "injected read failure".into(),
            });
        }
        self.inner.read_entities().await
    }

    async fn read_attributes(&self) -> herodex_catalog::Result<Vec<AttributeRow>> {
        self.attribute_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_attributes().await
    }

    fn describe(&self) -> String {
        format!("counting({})", self.inner.describe())
    }
}

/// Test context with a catalog over the sample dataset and an empty list store.
pub struct TestContext {
    /// Shared storage backend behind the list store.
    pub storage: Arc<TracingMemoryBackend>,
    /// Read counters of the catalog source.
    pub source: Arc<CountingSource<StaticSource>>,
    /// Catalog store over the sample dataset.
    pub catalog: Arc<CatalogStore>,
    /// List store over `storage`.
    pub lists: Arc<ListStore>,
}

impl TestContext {
    /// Creates a new context; nothing is loaded yet.
    #[must_use]
    pub fn new() -> Self {
        Self::with_storage(TracingMemoryBackend::new())
    }

    /// Creates a context whose list store uses `storage`.
    #[must_use]
    pub fn with_storage(storage: TracingMemoryBackend) -> Self {
        let storage = Arc::new(storage);
        let source = Arc::new(CountingSource::new(sample_source()));
        let catalog = Arc::new(CatalogStore::from_shared(source.clone()));
        let lists = Arc::new(ListStore::new(storage.clone()));
        Self {
            storage,
            source,
            catalog,
            lists,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counting_source_fails_then_recovers() {
        let source = CountingSource::new(sample_source()).failing_first(1);

        assert!(source.read_entities().await.is_err());
        assert_eq!(
            source.read_entities().await.expect("second read").len(),
            sample_entities().len()
        );
        assert_eq!(source.entity_reads(), 2);
    }

    #[test]
    fn on_disk_sample_parses() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_sample_dataset(dir.path());
        let info = std::fs::read(dir.path().join(INFO_FILE)).expect("read");
        let rows: Vec<RawEntity> = serde_json::from_slice(&info).expect("parse");
        assert_eq!(rows.len(), 4);
    }
}
