//! Durable local-directory storage backend.
//!
//! Objects are plain files under a root directory; the object path is the
//! relative file path. The version token of an object is the hex SHA-256 digest
//! of its bytes, so a version always describes exactly the content it was read
//! with.
//!
//! Writes land in a temporary sibling file and are renamed into place, so a
//! reader never observes a half-written document. Check-and-write sequences are
//! serialised by an async mutex owned by the backend; one `FileBackend` must own
//! a given root directory.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::storage::{ObjectMeta, StorageBackend, VersionedObject, WritePrecondition, WriteResult};

const TEMP_PREFIX: &str = ".tmp-";

/// Storage backend persisting objects as files below a root directory.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Opens (and creates if needed) a file backend rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if the root directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            Error::storage_with_source(format!("create storage root {}", root.display()), e)
        })?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let is_plain = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(Error::InvalidInput(format!(
                "object path must be relative without '..': {path}"
            )));
        }
        Ok(self.root.join(relative))
    }

    async fn read_optional(&self, file: &Path) -> Result<Option<Bytes>> {
        match tokio::fs::read(file).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage_with_source(
                format!("read {}", file.display()),
                e,
            )),
        }
    }

    async fn write_atomic(&self, file: &Path, data: &[u8]) -> Result<()> {
        let parent = file.parent().unwrap_or(&self.root);
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            Error::storage_with_source(format!("create directory {}", parent.display()), e)
        })?;

        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = parent.join(format!("{TEMP_PREFIX}{}-{file_name}", ulid::Ulid::new()));

        tokio::fs::write(&temp, data)
            .await
            .map_err(|e| Error::storage_with_source(format!("write {}", temp.display()), e))?;
        if let Err(e) = tokio::fs::rename(&temp, file).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(Error::storage_with_source(
                format!("rename into {}", file.display()),
                e,
            ));
        }
        Ok(())
    }

    fn object_path(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    async fn meta_for(&self, path: String, file: &Path) -> Result<Option<ObjectMeta>> {
        let Some(data) = self.read_optional(file).await? else {
            return Ok(None);
        };
        let last_modified = tokio::fs::metadata(file)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);
        Ok(Some(ObjectMeta {
            path,
            size: data.len() as u64,
            version: content_version(&data),
            last_modified,
        }))
    }
}

/// Returns the version token for a byte payload.
#[must_use]
pub fn content_version(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let file = self.resolve(path)?;
        self.read_optional(&file)
            .await?
            .ok_or_else(|| Error::NotFound(format!("object not found: {path}")))
    }

    async fn get_versioned(&self, path: &str) -> Result<Option<VersionedObject>> {
        let file = self.resolve(path)?;
        Ok(self.read_optional(&file).await?.map(|data| VersionedObject {
            version: content_version(&data),
            data,
        }))
    }

    async fn put(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> Result<WriteResult> {
        let file = self.resolve(path)?;
        let _guard = self.write_lock.lock().await;
        let current = self.read_optional(&file).await?;

        match (&precondition, &current) {
            (WritePrecondition::DoesNotExist, Some(existing)) => {
                return Ok(WriteResult::PreconditionFailed {
                    current_version: content_version(existing),
                });
            }
            (WritePrecondition::MatchesVersion(_), None) => {
                return Ok(WriteResult::PreconditionFailed {
                    current_version: String::new(),
                });
            }
            (WritePrecondition::MatchesVersion(expected), Some(existing)) => {
                let current_version = content_version(existing);
                if &current_version != expected {
                    return Ok(WriteResult::PreconditionFailed { current_version });
                }
            }
            _ => {}
        }

        self.write_atomic(&file, &data).await?;
        tracing::debug!(path, bytes = data.len(), "wrote object");

        Ok(WriteResult::Success {
            version: content_version(&data),
        })
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let file = self.resolve(path)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::storage_with_source(
                format!("delete {}", file.display()),
                e,
            )),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let mut pending = vec![self.root.clone()];
        let mut objects = Vec::new();

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(Error::storage_with_source(
                        format!("list {}", dir.display()),
                        e,
                    ));
                }
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| Error::storage_with_source(format!("list {}", dir.display()), e))?
            {
                let file = entry.path();
                let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
                if is_dir {
                    pending.push(file);
                    continue;
                }
                if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                    continue;
                }
                let Some(path) = self.object_path(&file) else {
                    continue;
                };
                if !path.starts_with(prefix) {
                    continue;
                }
                if let Some(meta) = self.meta_for(path, &file).await? {
                    objects.push(meta);
                }
            }
        }

        Ok(objects)
    }
}
