//! Filter, sort and limit over a catalog snapshot.

use std::fmt;
use std::str::FromStr;

use crate::record::{EntityId, EntityRecord};
use crate::store::CatalogSnapshot;

/// Field a query result can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Display name.
    Name,
    /// Race.
    Race,
    /// Publisher.
    Publisher,
    /// Number of attributes.
    Power,
}

/// Ordering value extracted from a record for one sort key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    /// Lowercased text; absent values are the empty string.
    Text(String),
    /// A count.
    Count(usize),
}

impl SortKey {
    /// Every accepted key, in the order reported to callers.
    pub const ACCEPTED: [Self; 4] = [Self::Name, Self::Race, Self::Publisher, Self::Power];

    /// Query-string spelling of the key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Race => "race",
            Self::Publisher => "publisher",
            Self::Power => "power",
        }
    }

    /// Extracts the ordering value of `record` for this key.
    #[must_use]
    pub fn value(self, record: &EntityRecord) -> SortValue {
        match self {
            Self::Name => text_value(Some(&record.name)),
            Self::Race => text_value(record.race.as_deref()),
            Self::Publisher => text_value(record.publisher.as_deref()),
            Self::Power => SortValue::Count(record.attributes.len()),
        }
    }

    fn accepted_list() -> String {
        Self::ACCEPTED
            .iter()
            .map(|key| key.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn text_value(value: Option<&str>) -> SortValue {
    SortValue::Text(value.unwrap_or_default().to_lowercase())
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ACCEPTED
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("must be one of: {}", Self::accepted_list()))
    }
}

/// Validated query parameters.
///
/// Text filters are already sanitised; `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Exact id match.
    pub id: Option<EntityId>,
    /// Case-insensitive name substring.
    pub name: Option<String>,
    /// Case-insensitive race substring.
    pub race: Option<String>,
    /// Case-insensitive publisher substring.
    pub publisher: Option<String>,
    /// Case-insensitive substring of any attribute.
    pub power: Option<String>,
    /// Result ordering; dataset order when absent.
    pub sort: Option<SortKey>,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

struct Needles {
    name: Option<String>,
    race: Option<String>,
    publisher: Option<String>,
    power: Option<String>,
}

impl Needles {
    fn new(params: &QueryParams) -> Self {
        let lower = |value: &Option<String>| value.as_deref().map(str::to_lowercase);
        Self {
            name: lower(&params.name),
            race: lower(&params.race),
            publisher: lower(&params.publisher),
            power: lower(&params.power),
        }
    }

    fn matches(&self, record: &EntityRecord) -> bool {
        contains(Some(&record.name), self.name.as_deref())
            && contains(record.race.as_deref(), self.race.as_deref())
            && contains(record.publisher.as_deref(), self.publisher.as_deref())
            && self.power.as_deref().is_none_or(|needle| {
                record
                    .attributes
                    .iter()
                    .any(|attribute| attribute.to_lowercase().contains(needle))
            })
    }
}

/// A missing record value never matches a present needle.
fn contains(haystack: Option<&str>, needle: Option<&str>) -> bool {
    match (haystack, needle) {
        (_, None) => true,
        (Some(haystack), Some(needle)) => haystack.to_lowercase().contains(needle),
        (None, Some(_)) => false,
    }
}

/// Runs a query: filters (all must match), then sort, then limit.
///
/// The snapshot is left untouched; the result holds copies of the matching records.
#[must_use]
pub fn query(snapshot: &CatalogSnapshot, params: &QueryParams) -> Vec<EntityRecord> {
    if params.limit == Some(0) {
        return Vec::new();
    }

    let needles = Needles::new(params);
    let mut matches: Vec<EntityRecord> = snapshot
        .records()
        .iter()
        .filter(|record| params.id.is_none_or(|id| record.id == id))
        .filter(|record| needles.matches(record))
        .cloned()
        .collect();

    if let Some(key) = params.sort {
        matches.sort_by_cached_key(|record| key.value(record));
    }
    if let Some(limit) = params.limit {
        matches.truncate(limit);
    }

    tracing::debug!(
        results = matches.len(),
        sort = params.sort.map(SortKey::as_str),
        "catalog query"
    );
    matches
}

/// Returns a copy of the record with `id`, if present.
#[must_use]
pub fn find_by_id(snapshot: &CatalogSnapshot, id: EntityId) -> Option<EntityRecord> {
    snapshot.get(id).cloned()
}
