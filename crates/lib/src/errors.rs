use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::files::FileStorageError;

/// The accumulated result of validating an answer map against a form's
/// fields. Errors are keyed by field name, each carrying every message
/// produced for that field, so callers always see the full picture rather
/// than the first failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {}", messages.join(", "))?;
            first = false;
        }
        Ok(())
    }
}

/// Custom error types for the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("a form named '{0}' already exists")]
    DuplicateName(String),
    #[error("the form already has a field named '{0}'")]
    DuplicateFieldName(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("storage connection error: {0}")]
    StorageConnection(String),
    #[error("storage operation failed: {0}")]
    StorageOperationFailed(String),
    #[error("data integrity error: {0}")]
    DataIntegrity(String),
    #[error(transparent)]
    FileStorage(#[from] FileStorageError),
    #[error("failed to serialize value: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<turso::Error> for StoreError {
    fn from(err: turso::Error) -> Self {
        StoreError::StorageOperationFailed(err.to_string())
    }
}
