//! # Row Operation Results
//!
//! Every fallible row operation returns `RowResult<T>` instead of panicking.
//! `RowError` is a small `Copy` code so that failed reads and writes on the hot
//! path cost no allocation.
//!
//! | Code | Meaning |
//! |------|---------|
//! | `NotFound` | path or column absent; for schematized writes it is a fallback signal |
//! | `Exists` | insert over an existing value, or duplicate in a set/map |
//! | `TypeMismatch` | stored runtime type differs from the requested accessor |
//! | `TypeConstraint` | write violates the enclosing scope's or column's declared type |
//! | `TooBig` | value exceeds a declared length, or the resizer refused to grow |
//! | `Failure` | misuse of the API (wrong scope, unpositioned cursor, ...) |
//! | `InvalidRow` | malformed bytes detected while decoding |
//!
//! `Ok(..)` plays the role of `Success`.

use crate::encoding::VarintError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowError {
    Failure,
    NotFound,
    Exists,
    TooBig,
    TypeMismatch,
    TypeConstraint,
    InvalidRow,
}

impl RowError {
    pub fn name(&self) -> &'static str {
        match self {
            RowError::Failure => "Failure",
            RowError::NotFound => "NotFound",
            RowError::Exists => "Exists",
            RowError::TooBig => "TooBig",
            RowError::TypeMismatch => "TypeMismatch",
            RowError::TypeConstraint => "TypeConstraint",
            RowError::InvalidRow => "InvalidRow",
        }
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let detail = match self {
            RowError::Failure => "operation not valid in the current state",
            RowError::NotFound => "no value at the requested path or column",
            RowError::Exists => "a value already exists at the requested path",
            RowError::TooBig => "value exceeds the permitted size",
            RowError::TypeMismatch => "stored type does not match the requested type",
            RowError::TypeConstraint => "value violates the declared type of its scope or column",
            RowError::InvalidRow => "row bytes are malformed",
        };
        write!(f, "{}: {}", self.name(), detail)
    }
}

impl std::error::Error for RowError {}

impl From<VarintError> for RowError {
    fn from(_: VarintError) -> Self {
        RowError::InvalidRow
    }
}

pub type RowResult<T> = std::result::Result<T, RowError>;

/// Conflict policy of a sparse write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UpdateOptions {
    /// Overwrite an existing value; fail with `NotFound` when absent.
    Update,
    /// Create a new value; fail with `Exists` when present.
    Insert,
    /// Overwrite when present, create when absent.
    #[default]
    Upsert,
    /// In an indexed scope, insert before the current element without replacing it.
    InsertAt,
}
