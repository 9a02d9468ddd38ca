//! Raw dataset rows and the normalized entity record.
//!
//! The two raw shapes mirror the source files: `superhero_info.json` rows use
//! capitalised, space-separated keys, and `superhero_powers.json` rows carry a
//! `hero_names` join key next to one flag column per power.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stable identifier of a catalog entity.
pub type EntityId = u32;

/// Placeholder the source dataset uses for unknown text values.
const UNKNOWN_TEXT: &str = "-";

/// One row of the entity dataset, as stored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawEntity {
    /// Unique identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Gender.
    #[serde(rename = "Gender", default)]
    pub gender: Option<String>,
    /// Eye colour.
    #[serde(rename = "Eye color", default)]
    pub eye_color: Option<String>,
    /// Race or species.
    #[serde(rename = "Race", default)]
    pub race: Option<String>,
    /// Hair colour.
    #[serde(rename = "Hair color", default)]
    pub hair_color: Option<String>,
    /// Height in centimetres.
    #[serde(rename = "Height", default)]
    pub height: Option<f64>,
    /// Publishing company.
    #[serde(rename = "Publisher", default)]
    pub publisher: Option<String>,
    /// Skin colour.
    #[serde(rename = "Skin color", default)]
    pub skin_color: Option<String>,
    /// Moral alignment.
    #[serde(rename = "Alignment", default)]
    pub alignment: Option<String>,
    /// Weight in kilograms.
    #[serde(rename = "Weight", default)]
    pub weight: Option<f64>,
}

impl RawEntity {
    /// Creates a row with only the identifying fields set.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            gender: None,
            eye_color: None,
            race: None,
            hair_color: None,
            height: None,
            publisher: None,
            skin_color: None,
            alignment: None,
            weight: None,
        }
    }

    /// Sets the race.
    #[must_use]
    pub fn with_race(mut self, race: impl Into<String>) -> Self {
        self.race = Some(race.into());
        self
    }

    /// Sets the publisher.
    #[must_use]
    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }
}

/// One row of the attribute (power flag) table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttributeRow {
    /// Entity name this row joins to (exact, case-sensitive).
    #[serde(rename = "hero_names")]
    pub hero_name: String,
    /// Attribute name to flag, in file order. The join key is not included.
    #[serde(flatten)]
    pub flags: Map<String, Value>,
}

impl AttributeRow {
    /// Builds a row from `(attribute, is_set)` pairs using the dataset's `"True"`/`"False"` markers.
    #[must_use]
    pub fn from_flags<'a>(
        hero_name: impl Into<String>,
        flags: impl IntoIterator<Item = (&'a str, bool)>,
    ) -> Self {
        let flags = flags
            .into_iter()
            .map(|(attribute, set)| {
                let marker = if set { "True" } else { "False" };
                (attribute.to_string(), Value::String(marker.to_string()))
            })
            .collect();
        Self {
            hero_name: hero_name.into(),
            flags,
        }
    }

    /// Attribute names whose flag carries the canonical true marker, in row order.
    pub fn set_attributes(&self) -> impl Iterator<Item = &str> {
        self.flags
            .iter()
            .filter(|(_, flag)| is_true_marker(flag))
            .map(|(attribute, _)| attribute.as_str())
    }
}

/// `"True"` as written by the dataset; a JSON `true` is accepted as well.
fn is_true_marker(flag: &Value) -> bool {
    match flag {
        Value::String(s) => s == "True",
        Value::Bool(b) => *b,
        _ => false,
    }
}

/// A catalog entity joined with its attribute set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Unique identifier.
    pub id: EntityId,
    /// Display name; not guaranteed unique.
    pub name: String,
    /// Race or species.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    /// Publishing company.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Gender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Eye colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eye_color: Option<String>,
    /// Hair colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hair_color: Option<String>,
    /// Skin colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_color: Option<String>,
    /// Moral alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
    /// Height in centimetres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Weight in kilograms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Names of the attributes flagged true, in attribute-table order.
    #[serde(rename = "powers", default)]
    pub attributes: Vec<String>,
}

impl EntityRecord {
    /// Builds a record from a raw row and its resolved attributes.
    ///
    /// Placeholder values (`"-"`, blank text, negative measurements) become `None`.
    #[must_use]
    pub fn from_raw(raw: RawEntity, attributes: Vec<String>) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            race: known_text(raw.race),
            publisher: known_text(raw.publisher),
            gender: known_text(raw.gender),
            eye_color: known_text(raw.eye_color),
            hair_color: known_text(raw.hair_color),
            skin_color: known_text(raw.skin_color),
            alignment: known_text(raw.alignment),
            height: known_measure(raw.height),
            weight: known_measure(raw.weight),
            attributes,
        }
    }
}

fn known_text(value: Option<String>) -> Option<String> {
    value.filter(|v| {
        let v = v.trim();
        !v.is_empty() && v != UNKNOWN_TEXT
    })
}

fn known_measure(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}
