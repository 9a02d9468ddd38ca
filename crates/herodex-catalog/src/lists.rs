//! Durable curated lists of entity ids.
//!
//! Each list is one JSON document `lists/<hex(name)>.json` holding the list name
//! and its ordered, duplicate-free member ids. Creation is an insert-if-absent
//! write; membership changes are read-modify-write cycles guarded by the
//! document version and retried when another writer got there first. The
//! membership rules are evaluated again on every attempt, against fresh state.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use herodex_core::observability::list_span;
use herodex_core::{StorageBackend, WritePrecondition, WriteResult};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::error::{CatalogError, Result, ValidationError};
use crate::query::find_by_id;
use crate::record::{EntityId, EntityRecord};
use crate::store::{CatalogBounds, CatalogSnapshot};
use crate::validation::{parse_entity_id, validate_entity_id, validate_list_name};

const LIST_PREFIX: &str = "lists/";
const LIST_SUFFIX: &str = ".json";
const DEFAULT_CAS_RETRIES: u32 = 10;
const MEMBER_FIELD: &str = "superheroId";

/// A named, ordered, duplicate-free sequence of entity ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratedList {
    /// List name as stored (trimmed).
    pub name: String,
    /// Member ids in insertion order.
    pub member_ids: Vec<EntityId>,
}

impl CuratedList {
    fn empty(name: String) -> Self {
        Self {
            name,
            member_ids: Vec::new(),
        }
    }

    fn contains(&self, id: EntityId) -> bool {
        self.member_ids.contains(&id)
    }
}

/// Store for curated lists over a conditional-write backend.
pub struct ListStore {
    backend: Arc<dyn StorageBackend>,
    cas_max_retries: u32,
}

impl fmt::Debug for ListStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListStore")
            .field("cas_max_retries", &self.cas_max_retries)
            .finish_non_exhaustive()
    }
}

impl ListStore {
    /// Creates a list store over `backend`.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            cas_max_retries: DEFAULT_CAS_RETRIES,
        }
    }

    /// Sets the maximum number of attempts for a membership update.
    #[must_use]
    pub fn with_cas_retries(mut self, retries: u32) -> Self {
        self.cas_max_retries = retries.max(1);
        self
    }

    /// Creates an empty list.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed name and `AlreadyExists` if a list
    /// with the same trimmed name exists.
    pub async fn create(&self, name: &str) -> Result<CuratedList> {
        let name = validate_list_name(name)?;
        let span = list_span("create", &name);
        self.insert(CuratedList::empty(name)).instrument(span).await
    }

    /// Deletes a list.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such list exists.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let name = validate_list_name(name)?;
        let removed = self.backend.delete(&list_path(&name)).await?;
        if !removed {
            return Err(CatalogError::list_not_found(&name));
        }
        tracing::info!(list = %name, "list deleted");
        Ok(())
    }

    /// Reads a list.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such list exists.
    pub async fn get(&self, name: &str) -> Result<CuratedList> {
        let name = validate_list_name(name)?;
        match self.backend.get(&list_path(&name)).await {
            Ok(data) => decode(&data),
            Err(herodex_core::Error::NotFound(_)) => Err(CatalogError::list_not_found(&name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the member ids of a list in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such list exists.
    pub async fn members(&self, name: &str) -> Result<Vec<EntityId>> {
        Ok(self.get(name).await?.member_ids)
    }

    /// Returns the full records of a list's members, in list order.
    ///
    /// Ids no longer present in the catalog are skipped.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such list exists.
    pub async fn member_details(
        &self,
        name: &str,
        catalog: &CatalogSnapshot,
    ) -> Result<Vec<EntityRecord>> {
        let list = self.get(name).await?;
        let records = list
            .member_ids
            .iter()
            .filter_map(|&id| {
                let record = find_by_id(catalog, id);
                if record.is_none() {
                    tracing::warn!(list = %list.name, superhero_id = id, "list member missing from catalog");
                }
                record
            })
            .collect();
        Ok(records)
    }

    /// Returns the names of all lists, sorted.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the backend cannot be listed.
    pub async fn list_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .backend
            .list(LIST_PREFIX)
            .await?
            .into_iter()
            .filter_map(|meta| name_from_path(&meta.path))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Appends `id` to a list.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `id` is outside the catalog's id range,
    /// `NotFound` for an unknown list and `Conflict` if `id` is already a member.
    pub async fn add_member(
        &self,
        name: &str,
        id: i64,
        bounds: CatalogBounds,
    ) -> Result<CuratedList> {
        let (name, id) =
            validate_membership(name, validate_entity_id(MEMBER_FIELD, id, bounds))?;
        self.update(&name, "add_member", |list| {
            if list.contains(id) {
                return Err(CatalogError::Conflict {
                    message: format!("superhero {id} is already in list {}", list.name),
                });
            }
            list.member_ids.push(id);
            Ok(())
        })
        .await
    }

    /// Removes `id` from a list.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `id` is outside the catalog's id range,
    /// `NotFound` for an unknown list and `Conflict` if `id` is not a member.
    pub async fn remove_member(
        &self,
        name: &str,
        id: i64,
        bounds: CatalogBounds,
    ) -> Result<CuratedList> {
        let checked = validate_membership(name, validate_entity_id(MEMBER_FIELD, id, bounds))?;
        self.remove_checked(checked).await
    }

    /// Removes a member id given as text, such as a path segment.
    ///
    /// The name and the id are validated together, so a request with both
    /// wrong reports both.
    ///
    /// # Errors
    ///
    /// As [`ListStore::remove_member`], plus `Validation` if `id` is not an
    /// integer.
    pub async fn remove_member_text(
        &self,
        name: &str,
        id: &str,
        bounds: CatalogBounds,
    ) -> Result<CuratedList> {
        let checked = validate_membership(name, parse_entity_id(MEMBER_FIELD, id, bounds))?;
        self.remove_checked(checked).await
    }

    async fn remove_checked(&self, (name, id): (String, EntityId)) -> Result<CuratedList> {
        self.update(&name, "remove_member", |list| {
            let Some(position) = list.member_ids.iter().position(|&member| member == id) else {
                return Err(CatalogError::Conflict {
                    message: format!("superhero {id} is not in list {}", list.name),
                });
            };
            list.member_ids.remove(position);
            Ok(())
        })
        .await
    }

    async fn insert(&self, list: CuratedList) -> Result<CuratedList> {
        let path = list_path(&list.name);
        match self
            .backend
            .put(&path, encode(&list)?, WritePrecondition::DoesNotExist)
            .await?
        {
            WriteResult::Success { .. } => {
                tracing::info!("list created");
                Ok(list)
            }
            WriteResult::PreconditionFailed { .. } => Err(CatalogError::AlreadyExists {
                entity: "list",
                name: list.name,
            }),
        }
    }

    async fn update<F>(&self, name: &str, operation: &str, mutate: F) -> Result<CuratedList>
    where
        F: Fn(&mut CuratedList) -> Result<()> + Send + Sync,
    {
        self.compare_and_swap(name, mutate)
            .instrument(list_span(operation, name))
            .await
    }

    async fn compare_and_swap<F>(&self, name: &str, mutate: F) -> Result<CuratedList>
    where
        F: Fn(&mut CuratedList) -> Result<()> + Send + Sync,
    {
        let path = list_path(name);
        for attempt in 1..=self.cas_max_retries {
            let Some(current) = self.backend.get_versioned(&path).await? else {
                return Err(CatalogError::list_not_found(name));
            };
            let mut list = decode(&current.data)?;
            mutate(&mut list)?;

            match self
                .backend
                .put(
                    &path,
                    encode(&list)?,
                    WritePrecondition::MatchesVersion(current.version),
                )
                .await?
            {
                WriteResult::Success { .. } => {
                    tracing::info!(members = list.member_ids.len(), "list updated");
                    return Ok(list);
                }
                WriteResult::PreconditionFailed { .. } => {
                    tracing::debug!(attempt, "list changed concurrently, retrying");
                }
            }
        }

        tracing::warn!(attempts = self.cas_max_retries, "list update gave up");
        Err(CatalogError::Storage {
            message: format!(
                "list {name} changed concurrently {} times, giving up",
                self.cas_max_retries
            ),
        })
    }
}

fn validate_membership(
    name: &str,
    id: std::result::Result<EntityId, ValidationError>,
) -> Result<(String, EntityId)> {
    let name = validate_list_name(name);
    match (name, id) {
        (Ok(name), Ok(id)) => Ok((name, id)),
        (Err(mut issues), Err(more)) => {
            issues.merge(more);
            Err(issues.into())
        }
        (Err(issues), Ok(_)) | (Ok(_), Err(issues)) => Err(issues.into()),
    }
}

fn list_path(name: &str) -> String {
    let key: String = name.bytes().map(|b| format!("{b:02x}")).collect();
    format!("{LIST_PREFIX}{key}{LIST_SUFFIX}")
}

fn name_from_path(path: &str) -> Option<String> {
    let key = path.strip_prefix(LIST_PREFIX)?.strip_suffix(LIST_SUFFIX)?;
    if key.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..key.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(key.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

fn encode(list: &CuratedList) -> Result<Bytes> {
    serde_json::to_vec(list)
        .map(Bytes::from)
        .map_err(|e| CatalogError::Storage {
            message: format!("failed to encode list {}: {e}", list.name),
        })
}

fn decode(data: &[u8]) -> Result<CuratedList> {
    serde_json::from_slice(data).map_err(|e| CatalogError::Storage {
        message: format!("corrupt list document: {e}"),
    })
}
