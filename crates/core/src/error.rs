//! Domain error model.

use serde::Serialize;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// A single field-level validation failure.
///
/// Mutating operations surface *all* violations for a payload at once, so
/// callers can render a per-field error list instead of fixing one field at a
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl core::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn render_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// permissions, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more fields of an input payload failed validation.
    #[error("validation failed: {}", render_violations(.0))]
    Validation(Vec<FieldViolation>),

    /// The actor lacks a required role.
    ///
    /// Intentionally carries no detail: callers must not learn which role
    /// would have sufficed.
    #[error("forbidden")]
    Forbidden,

    /// A referenced entity does not exist.
    #[error("not found")]
    NotFound,

    /// A conflict occurred (protective foreign key, unique-key race, stale
    /// state-machine transition). Callers should re-fetch and retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An invariant violation that indicates a programming error rather than
    /// recoverable user input. Not a normal request failure.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl DomainError {
    /// Single-field validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldViolation::new(field, message)])
    }

    pub fn validation_all(violations: Vec<FieldViolation>) -> Self {
        Self::Validation(violations)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
