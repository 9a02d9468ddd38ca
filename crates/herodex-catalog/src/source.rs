//! Dataset sources feeding the catalog store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{CatalogError, Result};
use crate::record::{AttributeRow, RawEntity};

/// Supplies the two raw datasets the catalog is built from.
///
/// Implementations return `CatalogError::DataUnavailable` when a dataset cannot
/// be read or parsed.
#[async_trait]
pub trait DatasetSource: Send + Sync + 'static {
    /// Reads the entity dataset.
    async fn read_entities(&self) -> Result<Vec<RawEntity>>;

    /// Reads the attribute (power flag) table.
    async fn read_attributes(&self) -> Result<Vec<AttributeRow>>;

    /// Human-readable origin of the data, used in logs.
    fn describe(&self) -> String;
}

/// Reads the datasets from two JSON array files.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    info_path: PathBuf,
    powers_path: PathBuf,
}

impl JsonFileSource {
    /// Creates a source reading `info_path` (entities) and `powers_path` (attributes).
    #[must_use]
    pub fn new(info_path: impl Into<PathBuf>, powers_path: impl Into<PathBuf>) -> Self {
        Self {
            info_path: info_path.into(),
            powers_path: powers_path.into(),
        }
    }

    /// Creates a source for the two files inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>, info_file: &str, powers_file: &str) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(info_file), dir.join(powers_file))
    }
}

async fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        CatalogError::data_unavailable(format!("failed to read {}: {e}", path.display()))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        CatalogError::data_unavailable(format!("failed to parse {}: {e}", path.display()))
    })
}

#[async_trait]
impl DatasetSource for JsonFileSource {
    async fn read_entities(&self) -> Result<Vec<RawEntity>> {
        read_json_array(&self.info_path).await
    }

    async fn read_attributes(&self) -> Result<Vec<AttributeRow>> {
        read_json_array(&self.powers_path).await
    }

    fn describe(&self) -> String {
        format!(
            "files {} + {}",
            self.info_path.display(),
            self.powers_path.display()
        )
    }
}

/// Serves datasets held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    entities: Vec<RawEntity>,
    attributes: Vec<AttributeRow>,
}

impl StaticSource {
    /// Creates a source from ready-made rows.
    #[must_use]
    pub fn new(entities: Vec<RawEntity>, attributes: Vec<AttributeRow>) -> Self {
        Self {
            entities,
            attributes,
        }
    }
}

#[async_trait]
impl DatasetSource for StaticSource {
    async fn read_entities(&self) -> Result<Vec<RawEntity>> {
        Ok(self.entities.clone())
    }

    async fn read_attributes(&self) -> Result<Vec<AttributeRow>> {
        Ok(self.attributes.clone())
    }

    fn describe(&self) -> String {
        format!("static ({} entities)", self.entities.len())
    }
}
