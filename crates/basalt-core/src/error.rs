use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    pub fn not_found(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, origin, message)
    }

    pub fn conflict(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Conflict, origin, message)
    }

    pub fn corruption(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, origin, message)
    }

    pub fn unavailable(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unavailable, origin, message)
    }

    pub fn invariant(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, origin, message)
    }

    pub fn serialize(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Serialize, origin, message)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.class, ErrorClass::Conflict)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    NotFound,
    Internal,
    Conflict,
    Unsupported,
    Unavailable,
    Serialize,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Conflict => "conflict",
            Self::Unsupported => "unsupported",
            Self::Unavailable => "unavailable",
            Self::Serialize => "serialize",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Allocator,
    Cache,
    Event,
    Meta,
    Pipeline,
    Poller,
    Reconciler,
    Serialize,
    Snapshot,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Allocator => "allocator",
            Self::Cache => "cache",
            Self::Event => "event",
            Self::Meta => "meta",
            Self::Pipeline => "pipeline",
            Self::Poller => "poller",
            Self::Reconciler => "reconciler",
            Self::Serialize => "serialize",
            Self::Snapshot => "snapshot",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
