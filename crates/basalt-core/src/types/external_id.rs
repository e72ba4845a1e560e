//! Module: external_id
//! Responsibility: validated external identifiers and entity-type prefixes.
//! Does not own: internal-id allocation or the mapping relation.
//!
//! Invariants:
//! - External ids are ASCII, case-sensitive, and permanent once issued.
//! - Shape is one type prefix (`Q`/`P`/`L`) followed by decimal digits with
//!   no leading zero.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use thiserror::Error as ThisError;

const MAX_EXTERNAL_ID_LEN: usize = 24;

///
/// ExternalIdError
///

#[derive(Debug, ThisError)]
pub enum ExternalIdError {
    #[error("external id is empty")]
    Empty,

    #[error("external id length {len} exceeds max {max}")]
    TooLong { len: usize, max: usize },

    #[error("external id has unknown type prefix '{prefix}'")]
    UnknownPrefix { prefix: char },

    #[error("external id '{id}' is not a prefix followed by digits")]
    Malformed { id: String },

    #[error("external id '{id}' has a leading zero")]
    LeadingZero { id: String },
}

///
/// EntityType
///
/// The entity namespaces the store accepts. The discriminant doubles as the
/// external-id prefix character.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Item,
    Property,
    Lexeme,
}

impl EntityType {
    #[must_use]
    pub const fn prefix(self) -> char {
        match self {
            Self::Item => 'Q',
            Self::Property => 'P',
            Self::Lexeme => 'L',
        }
    }

    #[must_use]
    pub const fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            'Q' => Some(Self::Item),
            'P' => Some(Self::Property),
            'L' => Some(Self::Lexeme),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Property => "property",
            Self::Lexeme => "lexeme",
        }
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// ExternalId
///
/// Opaque, human-readable, permanent identifier (`Q42`, `P31`, `L99`).
/// Construction validates shape; the stored form is the canonical string.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalId {
    id: String,
    entity_type: EntityType,
}

impl ExternalId {
    /// Validate and construct an external id from its canonical string form.
    pub fn try_from_str(id: &str) -> Result<Self, ExternalIdError> {
        let len = id.len();
        if len == 0 {
            return Err(ExternalIdError::Empty);
        }
        if len > MAX_EXTERNAL_ID_LEN {
            return Err(ExternalIdError::TooLong {
                len,
                max: MAX_EXTERNAL_ID_LEN,
            });
        }

        let mut chars = id.chars();
        let prefix = chars.next().unwrap_or('\0');
        let entity_type = EntityType::from_prefix(prefix)
            .ok_or(ExternalIdError::UnknownPrefix { prefix })?;

        let digits = &id[1..];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ExternalIdError::Malformed { id: id.to_string() });
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return Err(ExternalIdError::LeadingZero { id: id.to_string() });
        }

        Ok(Self {
            id: id.to_string(),
            entity_type,
        })
    }

    /// Compose an external id from a type and its numeric part.
    #[must_use]
    pub fn from_parts(entity_type: EntityType, number: u64) -> Self {
        Self {
            id: format!("{}{number}", entity_type.prefix()),
            entity_type,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
    }
}

impl Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl TryFrom<String> for ExternalId {
    type Error = ExternalIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from_str(&value)
    }
}

impl From<ExternalId> for String {
    fn from(value: ExternalId) -> Self {
        value.id
    }
}

///
/// TESTS
///
