//! Module: value
//! Responsibility: the datavalue vocabulary the write path can inspect.
//! Does not own: full schema validation (an external collaborator) or the
//! canonical text form (canon.rs).
//!
//! Entity bodies are schema-flexible JSON and travel opaquely; the core only
//! classifies datavalues where hashing and validation need to look inside.

mod kind;

pub use kind::{DataValueKind, datavalue_kind, property_datatype_kind};
