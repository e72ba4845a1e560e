//! Module: validate
//! Responsibility: the structural checks the write path performs on entity
//! bodies before hashing.
//! Does not own: deep JSON-schema validation (external collaborator keeps
//! `validation_status = pending` until it reports).

use crate::{
    types::{EntityType, ExternalId},
    value::{datavalue_kind, property_datatype_kind},
};
use serde_json::Value as JsonValue;
use thiserror::Error as ThisError;

///
/// ValidateError
///

#[derive(Debug, ThisError)]
pub enum ValidateError {
    #[error("entity body must be a JSON object")]
    NotAnObject,

    #[error("body id '{body_id}' does not match target '{target}'")]
    IdMismatch { body_id: String, target: String },

    #[error("body type '{body_type}' does not match entity type '{expected}'")]
    TypeMismatch {
        body_type: String,
        expected: EntityType,
    },

    #[error("term map '{field}' must map language codes to term objects")]
    MalformedTermMap { field: &'static str },

    #[error("term in '{field}' for language '{language}' is malformed")]
    MalformedTerm {
        field: &'static str,
        language: String,
    },

    #[error("property declares unknown datatype '{datatype}'")]
    UnknownPropertyDatatype { datatype: String },

    #[error("claim on property '{property}' has unknown datavalue type '{datatype}'")]
    UnknownDataValueType { property: String, datatype: String },

    #[error("claim on property '{property}' has unknown snak datatype '{datatype}'")]
    UnknownSnakDatatype { property: String, datatype: String },

    #[error("claim on property '{property}' has a malformed datavalue payload")]
    MalformedDataValue { property: String },
}

/// Validate the structural shape of one entity body against its target id.
///
/// Empty bodies are valid; redirect and deletion tombstones carry them.
pub fn validate_entity_body(
    target: &ExternalId,
    body: &JsonValue,
) -> Result<(), ValidateError> {
    let Some(obj) = body.as_object() else {
        return Err(ValidateError::NotAnObject);
    };

    if let Some(body_id) = obj.get("id") {
        let body_id = body_id.as_str().unwrap_or_default();
        if body_id != target.as_str() {
            return Err(ValidateError::IdMismatch {
                body_id: body_id.to_string(),
                target: target.to_string(),
            });
        }
    }

    if let Some(body_type) = obj.get("type") {
        let body_type = body_type.as_str().unwrap_or_default();
        if body_type != target.entity_type().as_str() {
            return Err(ValidateError::TypeMismatch {
                body_type: body_type.to_string(),
                expected: target.entity_type(),
            });
        }
    }

    // Property entities declare the datatype their statements carry.
    if target.entity_type() == EntityType::Property
        && let Some(datatype) = obj.get("datatype")
    {
        let datatype = datatype.as_str().unwrap_or_default();
        if property_datatype_kind(datatype).is_none() {
            return Err(ValidateError::UnknownPropertyDatatype {
                datatype: datatype.to_string(),
            });
        }
    }

    for field in ["labels", "descriptions"] {
        if let Some(terms) = obj.get(field) {
            validate_term_map(field, terms)?;
        }
    }

    if let Some(claims) = obj.get("claims") {
        validate_claims(claims)?;
    }

    Ok(())
}

fn validate_term_map(field: &'static str, terms: &JsonValue) -> Result<(), ValidateError> {
    let Some(map) = terms.as_object() else {
        return Err(ValidateError::MalformedTermMap { field });
    };

    for (language, term) in map {
        let shape_ok = term.as_object().is_some_and(|t| {
            t.get("language").is_some_and(JsonValue::is_string)
                && t.get("value").is_some_and(JsonValue::is_string)
        });
        if !shape_ok {
            return Err(ValidateError::MalformedTerm {
                field,
                language: language.clone(),
            });
        }
    }

    Ok(())
}

fn validate_claims(claims: &JsonValue) -> Result<(), ValidateError> {
    let Some(by_property) = claims.as_object() else {
        // Claims may also arrive as a bare list in some exports; accept and
        // skip the per-property walk.
        return Ok(());
    };

    for (property, statements) in by_property {
        let Some(statements) = statements.as_array() else {
            continue;
        };
        for statement in statements {
            let Some(snak) = statement.get("mainsnak") else {
                continue;
            };
            // Snaks may annotate the declaring property's datatype.
            if let Some(datatype) = snak.get("datatype") {
                let datatype = datatype.as_str().unwrap_or_default();
                if property_datatype_kind(datatype).is_none() {
                    return Err(ValidateError::UnknownSnakDatatype {
                        property: property.clone(),
                        datatype: datatype.to_string(),
                    });
                }
            }
            let Some(datavalue) = snak.get("datavalue") else {
                // novalue / somevalue snaks carry no datavalue.
                continue;
            };
            let datatype = datavalue
                .get("type")
                .and_then(JsonValue::as_str)
                .unwrap_or_default();
            let Some(kind) = datavalue_kind(datatype) else {
                return Err(ValidateError::UnknownDataValueType {
                    property: property.clone(),
                    datatype: datatype.to_string(),
                });
            };
            let payload = datavalue.get("value").unwrap_or(&JsonValue::Null);
            if !kind.payload_shape_ok(payload) {
                return Err(ValidateError::MalformedDataValue {
                    property: property.clone(),
                });
            }
        }
    }

    Ok(())
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn q42() -> ExternalId {
        ExternalId::try_from_str("Q42").expect("valid id")
    }

    #[test]
    fn accepts_a_well_formed_item() {
        let body = json!({
            "id": "Q42",
            "type": "item",
            "labels": {"en": {"language": "en", "value": "Douglas Adams"}},
            "claims": {
                "P31": [{
                    "mainsnak": {
                        "snaktype": "value",
                        "property": "P31",
                        "datavalue": {
                            "type": "wikibase-entityid",
                            "value": {"entity-type": "item", "id": "Q5"}
                        }
                    }
                }]
            }
        });
        assert!(validate_entity_body(&q42(), &body).is_ok());
    }

    #[test]
    fn accepts_an_empty_body() {
        assert!(validate_entity_body(&q42(), &json!({})).is_ok());
    }

    #[test]
    fn rejects_id_and_type_mismatches() {
        assert!(matches!(
            validate_entity_body(&q42(), &json!({"id": "Q43"})),
            Err(ValidateError::IdMismatch { .. })
        ));
        assert!(matches!(
            validate_entity_body(&q42(), &json!({"type": "property"})),
            Err(ValidateError::TypeMismatch { .. })
        ));
        assert!(matches!(
            validate_entity_body(&q42(), &json!([])),
            Err(ValidateError::NotAnObject)
        ));
    }

    #[test]
    fn rejects_malformed_terms() {
        assert!(matches!(
            validate_entity_body(&q42(), &json!({"labels": {"en": "A"}})),
            Err(ValidateError::MalformedTerm { field: "labels", .. })
        ));
        assert!(matches!(
            validate_entity_body(&q42(), &json!({"descriptions": []})),
            Err(ValidateError::MalformedTermMap {
                field: "descriptions"
            })
        ));
    }

    #[test]
    fn property_datatype_declarations_are_classified() {
        let p31 = ExternalId::try_from_str("P31").expect("valid id");

        let body = json!({
            "id": "P31",
            "type": "property",
            "datatype": "wikibase-item"
        });
        assert!(validate_entity_body(&p31, &body).is_ok());

        let body = json!({"id": "P31", "type": "property", "datatype": "hologram"});
        assert!(matches!(
            validate_entity_body(&p31, &body),
            Err(ValidateError::UnknownPropertyDatatype { datatype }) if datatype == "hologram"
        ));

        // Items never declare a datatype; an item body stays unaffected.
        let body = json!({"id": "Q42", "type": "item"});
        assert!(validate_entity_body(&q42(), &body).is_ok());
    }

    #[test]
    fn snak_datatype_annotations_are_classified() {
        let body = json!({
            "claims": {
                "P569": [{
                    "mainsnak": {
                        "snaktype": "value",
                        "property": "P569",
                        "datatype": "time",
                        "datavalue": {
                            "type": "time",
                            "value": {"time": "+1952-03-11T00:00:00Z"}
                        }
                    }
                }]
            }
        });
        assert!(validate_entity_body(&q42(), &body).is_ok());

        let body = json!({
            "claims": {
                "P569": [{
                    "mainsnak": {
                        "snaktype": "novalue",
                        "property": "P569",
                        "datatype": "hologram"
                    }
                }]
            }
        });
        assert!(matches!(
            validate_entity_body(&q42(), &body),
            Err(ValidateError::UnknownSnakDatatype { property, .. }) if property == "P569"
        ));
    }

    #[test]
    fn rejects_unknown_datavalue_types() {
        let body = json!({
            "claims": {
                "P1": [{
                    "mainsnak": {
                        "datavalue": {"type": "hologram", "value": "x"}
                    }
                }]
            }
        });
        assert!(matches!(
            validate_entity_body(&q42(), &body),
            Err(ValidateError::UnknownDataValueType { .. })
        ));
    }

    #[test]
    fn novalue_snaks_are_accepted() {
        let body = json!({
            "claims": {
                "P1": [{"mainsnak": {"snaktype": "novalue", "property": "P1"}}]
            }
        });
        assert!(validate_entity_body(&q42(), &body).is_ok());
    }
}
