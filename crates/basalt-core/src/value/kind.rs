use serde_json::Value as JsonValue;
use std::fmt::{self, Display};

///
/// DataValueKind
///
/// The closed set of value kinds the store recognises inside snaks. Parsing
/// is an explicit dispatch table keyed by datatype string, not polymorphism,
/// so the core stays dependency-free here.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DataValueKind {
    Entity,
    String,
    Time,
    Quantity,
    Globe,
    Monolingual,
    ExternalIdentifier,
    CommonsMedia,
    GeoShape,
    TabularData,
    MusicalNotation,
    Url,
    Math,
    EntitySchema,
}

impl DataValueKind {
    /// Whether a datavalue payload of this kind has the expected JSON shape.
    /// This is the shallow structural check the write path performs; deep
    /// schema validation is an external collaborator.
    #[must_use]
    pub fn payload_shape_ok(self, payload: &JsonValue) -> bool {
        match self {
            Self::String
            | Self::ExternalIdentifier
            | Self::CommonsMedia
            | Self::GeoShape
            | Self::TabularData
            | Self::MusicalNotation
            | Self::Url
            | Self::Math
            | Self::EntitySchema => payload.is_string(),
            Self::Entity => payload
                .as_object()
                .is_some_and(|o| o.contains_key("id") || o.contains_key("numeric-id")),
            Self::Time => payload
                .as_object()
                .is_some_and(|o| o.get("time").is_some_and(JsonValue::is_string)),
            Self::Quantity => payload
                .as_object()
                .is_some_and(|o| o.get("amount").is_some_and(JsonValue::is_string)),
            Self::Globe => payload.as_object().is_some_and(|o| {
                o.get("latitude").is_some_and(JsonValue::is_number)
                    && o.get("longitude").is_some_and(JsonValue::is_number)
            }),
            Self::Monolingual => payload.as_object().is_some_and(|o| {
                o.get("language").is_some_and(JsonValue::is_string)
                    && o.get("text").is_some_and(JsonValue::is_string)
            }),
        }
    }
}

impl Display for DataValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Entity => "entity",
            Self::String => "string",
            Self::Time => "time",
            Self::Quantity => "quantity",
            Self::Globe => "globe",
            Self::Monolingual => "monolingual",
            Self::ExternalIdentifier => "external_id",
            Self::CommonsMedia => "commons_media",
            Self::GeoShape => "geo_shape",
            Self::TabularData => "tabular_data",
            Self::MusicalNotation => "musical_notation",
            Self::Url => "url",
            Self::Math => "math",
            Self::EntitySchema => "entity_schema",
        };
        f.write_str(label)
    }
}

// Dispatch table for `datavalue.type` strings as they appear in snaks.
const DATAVALUE_TABLE: &[(&str, DataValueKind)] = &[
    ("globecoordinate", DataValueKind::Globe),
    ("monolingualtext", DataValueKind::Monolingual),
    ("quantity", DataValueKind::Quantity),
    ("string", DataValueKind::String),
    ("time", DataValueKind::Time),
    ("wikibase-entityid", DataValueKind::Entity),
];

// Dispatch table for property datatype strings; these refine the string
// kind into its specialized interpretations.
const PROPERTY_DATATYPE_TABLE: &[(&str, DataValueKind)] = &[
    ("commonsMedia", DataValueKind::CommonsMedia),
    ("entity-schema", DataValueKind::EntitySchema),
    ("external-id", DataValueKind::ExternalIdentifier),
    ("geo-shape", DataValueKind::GeoShape),
    ("globe-coordinate", DataValueKind::Globe),
    ("math", DataValueKind::Math),
    ("monolingualtext", DataValueKind::Monolingual),
    ("musical-notation", DataValueKind::MusicalNotation),
    ("quantity", DataValueKind::Quantity),
    ("string", DataValueKind::String),
    ("tabular-data", DataValueKind::TabularData),
    ("time", DataValueKind::Time),
    ("url", DataValueKind::Url),
    ("wikibase-item", DataValueKind::Entity),
    ("wikibase-lexeme", DataValueKind::Entity),
    ("wikibase-property", DataValueKind::Entity),
];

/// Classify a snak `datavalue.type` string.
#[must_use]
pub fn datavalue_kind(datatype: &str) -> Option<DataValueKind> {
    DATAVALUE_TABLE
        .iter()
        .find(|(name, _)| *name == datatype)
        .map(|(_, kind)| *kind)
}

/// Classify a property datatype string.
#[must_use]
pub fn property_datatype_kind(datatype: &str) -> Option<DataValueKind> {
    PROPERTY_DATATYPE_TABLE
        .iter()
        .find(|(name, _)| *name == datatype)
        .map(|(_, kind)| *kind)
}

///
/// TESTS
///
