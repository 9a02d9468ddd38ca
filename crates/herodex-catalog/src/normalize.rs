//! Join of the entity dataset with the attribute table.

use std::collections::{HashMap, HashSet};

use crate::error::{CatalogError, Result};
use crate::record::{AttributeRow, EntityRecord, RawEntity};

/// Counters describing one catalog build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Entities read from the entity dataset.
    pub entities: usize,
    /// Rows read from the attribute table.
    pub attribute_rows: usize,
    /// Entities with no attribute row (empty attribute set).
    pub unmatched_entities: usize,
    /// Attribute rows ignored because an earlier row had the same join key.
    pub duplicate_attribute_rows: usize,
}

/// Joins every entity with its attribute row by exact name.
///
/// The first attribute row for a name wins; later duplicates are logged and
/// counted. Entity order is preserved.
///
/// # Errors
///
/// Returns `CatalogError::DataUnavailable` if two entities share an id.
pub fn join(
    entities: Vec<RawEntity>,
    attribute_rows: &[AttributeRow],
) -> Result<(Vec<EntityRecord>, LoadReport)> {
    let mut report = LoadReport {
        entities: entities.len(),
        attribute_rows: attribute_rows.len(),
        ..LoadReport::default()
    };

    let mut by_name: HashMap<&str, &AttributeRow> = HashMap::with_capacity(attribute_rows.len());
    for row in attribute_rows {
        if by_name.contains_key(row.hero_name.as_str()) {
            report.duplicate_attribute_rows += 1;
            tracing::warn!(hero_name = %row.hero_name, "duplicate attribute row ignored");
            continue;
        }
        by_name.insert(row.hero_name.as_str(), row);
    }

    let mut seen_ids = HashSet::with_capacity(entities.len());
    let mut records = Vec::with_capacity(entities.len());
    for raw in entities {
        if !seen_ids.insert(raw.id) {
            return Err(CatalogError::data_unavailable(format!(
                "duplicate entity id {} in entity dataset",
                raw.id
            )));
        }
        let attributes = match by_name.get(raw.name.as_str()) {
            Some(row) => row.set_attributes().map(str::to_string).collect(),
            None => {
                report.unmatched_entities += 1;
                Vec::new()
            }
        };
        records.push(EntityRecord::from_raw(raw, attributes));
    }

    Ok((records, report))
}
