//! Integration tests for concurrent list mutation safety.
//!
//! These tests verify the list store's CAS retry loop under contention.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use herodex_catalog::{CatalogBounds, CatalogError, ListStore};
use herodex_test_utils::TracingMemoryBackend;

const BOUNDS: CatalogBounds = CatalogBounds {
    max_id: Some(50),
    size: 51,
};

fn contended_store() -> (Arc<TracingMemoryBackend>, Arc<ListStore>) {
    let backend = Arc::new(TracingMemoryBackend::with_latency(Duration::from_millis(5)));
    let store = Arc::new(ListStore::new(backend.clone()).with_cas_retries(20));
    (backend, store)
}

/// Two concurrent adds of the same id: exactly one succeeds, the other conflicts.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_add_race_has_one_winner() {
    let (_backend, store) = contended_store();
    store.create("racers").await.unwrap();

    let success = Arc::new(AtomicU32::new(0));
    let conflict = Arc::new(AtomicU32::new(0));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let store = store.clone();
            let success = success.clone();
            let conflict = conflict.clone();
            tokio::spawn(async move {
                match store.add_member("racers", 9, BOUNDS).await {
                    Ok(_) => {
                        success.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(CatalogError::Conflict { .. }) => {
                        conflict.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(success.load(Ordering::SeqCst), 1);
    assert_eq!(conflict.load(Ordering::SeqCst), 1);
    assert_eq!(store.members("racers").await.unwrap(), vec![9]);
}

/// Concurrent adds of distinct ids all land; none is lost to a lost race.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_adds() {
    let (backend, store) = contended_store();
    store.create("crowd").await.unwrap();

    let handles: Vec<_> = (0..8_i64)
        .map(|id| {
            let store = store.clone();
            tokio::spawn(async move { store.add_member("crowd", id, BOUNDS).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut members = store.members("crowd").await.unwrap();
    members.sort_unstable();
    assert_eq!(members, (0..8).collect::<Vec<u32>>());
    assert!(backend.rejected_writes() > 0, "contention should force retries");
}

/// Concurrent creates of one name: one succeeds, the rest see `AlreadyExists`.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_create_race() {
    let (_backend, store) = contended_store();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.create("only one").await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(CatalogError::AlreadyExists { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
}

/// A list deleted mid-update makes the update fail with `NotFound`, not resurrect it.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_update_racing_delete_does_not_resurrect() {
    let (_backend, store) = contended_store();
    store.create("doomed").await.unwrap();

    let adder = {
        let store = store.clone();
        tokio::spawn(async move { store.add_member("doomed", 1, BOUNDS).await })
    };
    let deleter = {
        let store = store.clone();
        tokio::spawn(async move { store.delete("doomed").await })
    };

    let added = adder.await.unwrap();
    deleter.await.unwrap().unwrap();

    assert!(matches!(added, Ok(_) | Err(CatalogError::NotFound { .. })));
    assert!(matches!(
        store.members("doomed").await,
        Err(CatalogError::NotFound { .. })
    ));
}

/// Retries are bounded: a backend that keeps changing underneath yields a storage error.
#[tokio::test]
async fn test_exhausted_retries_surface_as_storage_error() {
    use bytes::Bytes;
    use herodex_core::{StorageBackend, WritePrecondition, WriteResult};

    /// Backend whose conditional writes always lose.
    #[derive(Debug, Default)]
    struct AlwaysStale(TracingMemoryBackend);

    #[async_trait::async_trait]
    impl StorageBackend for AlwaysStale {
        async fn get(&self, path: &str) -> herodex_core::Result<Bytes> {
            self.0.get(path).await
        }
        async fn get_versioned(
            &self,
            path: &str,
        ) -> herodex_core::Result<Option<herodex_core::VersionedObject>> {
            self.0.get_versioned(path).await
        }
        async fn put(
            &self,
            path: &str,
            data: Bytes,
            precondition: WritePrecondition,
        ) -> herodex_core::Result<WriteResult> {
            if matches!(precondition, WritePrecondition::MatchesVersion(_)) {
                return Ok(WriteResult::PreconditionFailed {
                    current_version: "moved".into(),
                });
            }
            self.0.put(path, data, precondition).await
        }
        async fn delete(&self, path: &str) -> herodex_core::Result<bool> {
            self.0.delete(path).await
        }
        async fn list(&self, prefix: &str) -> herodex_core::Result<Vec<herodex_core::ObjectMeta>> {
            self.0.list(prefix).await
        }    }

    let store = ListStore::new(Arc::new(AlwaysStale::default())).with_cas_retries(3);
    store.create("stuck").await.unwrap();

    let err = store.add_member("stuck", 1, BOUNDS).await.unwrap_err();
    assert!(matches!(err, CatalogError::Storage { .. }), "got {err:?}");
    assert!(store.members("stuck").await.unwrap().is_empty());
}
