//! Custom assertion helpers for integration tests.

use herodex_catalog::{CatalogError, EntityRecord};

use crate::storage::StorageOp;

/// Asserts that a result failed with `Conflict`.
///
/// # Panics
///
/// Panics if the result is `Ok` or a different error.
pub fn assert_conflict<T: std::fmt::Debug>(result: &Result<T, CatalogError>) {
    assert!(
        matches!(result, Err(CatalogError::Conflict { .. })),
        "Expected Conflict, got {result:?}"
    );
}

/// Asserts that a result failed with `NotFound`.
///
/// # Panics
///
/// Panics if the result is `Ok` or a different error.
pub fn assert_not_found<T: std::fmt::Debug>(result: &Result<T, CatalogError>) {
    assert!(
        matches!(result, Err(CatalogError::NotFound { .. })),
        "Expected NotFound, got {result:?}"
    );
}

/// Asserts that a result failed validation on exactly `fields`, in order.
///
/// # Panics
///
/// Panics if the result is not a validation error over those fields.
pub fn assert_validation_fields<T: std::fmt::Debug>(
    result: &Result<T, CatalogError>,
    fields: &[&str],
) {
    let Err(CatalogError::Validation(error)) = result else {
        panic!("Expected validation error on {fields:?}, got {result:?}");
    };
    let actual: Vec<&str> = error.issues().iter().map(|i| i.field.as_str()).collect();
    assert_eq!(actual, fields, "Unexpected validation fields");
}

/// Asserts that records are ordered by name, ignoring case.
///
/// # Panics
///
/// Panics on the first adjacent pair out of order.
pub fn assert_sorted_by_name(records: &[EntityRecord]) {
    for pair in records.windows(2) {
        assert!(
            pair[0].name.to_lowercase() <= pair[1].name.to_lowercase(),
            "{} sorted before {}",
            pair[0].name,
            pair[1].name
        );
    }
}

/// Asserts that no storage write was attempted.
///
/// # Panics
///
/// Panics if any put or delete was recorded.
pub fn assert_no_writes(ops: &[StorageOp]) {
    let writes: Vec<_> = ops
        .iter()
        .filter(|op| matches!(op, StorageOp::Put { .. } | StorageOp::Delete { .. }))
        .collect();
    assert!(writes.is_empty(), "Expected no writes, got {writes:?}");
}
