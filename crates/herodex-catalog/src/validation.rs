//! Parameter sanitisation and constraint checks.
//!
//! Every check records its issue into a [`ValidationError`] instead of
//! returning early, so one request reports all of its offending parameters.

use serde::Deserialize;

use crate::error::ValidationError;
use crate::query::{QueryParams, SortKey};
use crate::record::EntityId;
use crate::store::CatalogBounds;

/// Minimum length of a trimmed list name.
pub const MIN_LIST_NAME_LEN: usize = 3;

/// Query parameters exactly as received, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawQuery {
    /// Exact entity id.
    pub id: Option<String>,
    /// Name substring.
    pub name: Option<String>,
    /// Race substring.
    pub race: Option<String>,
    /// Publisher substring.
    pub publisher: Option<String>,
    /// Attribute substring.
    pub power: Option<String>,
    /// Sort key name.
    pub sort: Option<String>,
    /// Result count cap.
    pub limit: Option<String>,
}

/// Strips every character outside `[A-Za-z0-9.-]`.
///
/// Returns `None` when nothing is left, meaning "no constraint".
#[must_use]
pub fn sanitize_filter(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Validates a curated list name and returns it trimmed.
///
/// # Errors
///
/// Returns a `ValidationError` on field `listName` if the trimmed name is
/// shorter than three characters or contains anything but ASCII letters,
/// digits and spaces.
pub fn validate_list_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.chars().count() < MIN_LIST_NAME_LEN {
        return Err(ValidationError::single(
            "listName",
            format!("must be at least {MIN_LIST_NAME_LEN} characters"),
        ));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ')
    {
        return Err(ValidationError::single(
            "listName",
            "may contain only letters, digits and spaces",
        ));
    }
    Ok(trimmed.to_string())
}

/// Validates an entity id against the loaded catalog's id range.
///
/// # Errors
///
/// Returns a `ValidationError` on `field` if `id` is negative or above the
/// highest id in the catalog.
pub fn validate_entity_id(
    field: &str,
    id: i64,
    bounds: CatalogBounds,
) -> Result<EntityId, ValidationError> {
    let max_id = bounds.max_id.map_or(-1, i64::from);
    if id < 0 || id > max_id {
        return Err(ValidationError::single(field, range_message(max_id)));
    }
    EntityId::try_from(id).map_err(|_| ValidationError::single(field, range_message(max_id)))
}

/// Parses an entity id received as text, such as a path segment.
///
/// # Errors
///
/// Returns a `ValidationError` on `field` if `value` is not an integer or is
/// outside the catalog's id range.
pub fn parse_entity_id(
    field: &str,
    value: &str,
    bounds: CatalogBounds,
) -> Result<EntityId, ValidationError> {
    let max_id = bounds.max_id.map_or(-1, i64::from);
    let id = parse_bounded(value.trim(), max_id)
        .map_err(|message| ValidationError::single(field, message))?;
    EntityId::try_from(id).map_err(|_| ValidationError::single(field, range_message(max_id)))
}

/// Validates raw query parameters against the catalog bounds.
///
/// # Errors
///
/// Returns a `ValidationError` listing every offending parameter.
pub fn validate_query(raw: &RawQuery, bounds: CatalogBounds) -> Result<QueryParams, ValidationError> {
    let mut issues = ValidationError::new();

    let id = present(raw.id.as_deref()).and_then(|value| {
        let max_id = bounds.max_id.map_or(-1, i64::from);
        match parse_bounded(value, max_id) {
            Ok(id) => EntityId::try_from(id).ok(),
            Err(message) => {
                issues.push("id", message);
                None
            }
        }
    });

    let limit = present(raw.limit.as_deref()).and_then(|value| {
        let size = i64::try_from(bounds.size).unwrap_or(i64::MAX);
        match parse_bounded(value, size) {
            Ok(limit) => usize::try_from(limit).ok(),
            Err(message) => {
                issues.push("limit", message);
                None
            }
        }
    });

    let sort = present(raw.sort.as_deref()).and_then(|value| match value.parse::<SortKey>() {
        Ok(key) => Some(key),
        Err(message) => {
            issues.push("sort", message);
            None
        }
    });

    issues.into_result(QueryParams {
        id,
        name: raw.name.as_deref().and_then(sanitize_filter),
        race: raw.race.as_deref().and_then(sanitize_filter),
        publisher: raw.publisher.as_deref().and_then(sanitize_filter),
        power: raw.power.as_deref().and_then(sanitize_filter),
        sort,
        limit,
    })
}

/// Trimmed value, or `None` for a missing or blank parameter.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bounded(value: &str, max: i64) -> Result<i64, String> {
    let parsed: i64 = value
        .parse()
        .map_err(|_| format!("must be a non-negative integer, got '{value}'"))?;
    if parsed < 0 || parsed > max {
        return Err(range_message(max));
    }
    Ok(parsed)
}

fn range_message(max: i64) -> String {
    if max < 0 {
        "no value is valid for an empty catalog".to_string()
    } else {
        format!("must be between 0 and {max}")
    }
}
