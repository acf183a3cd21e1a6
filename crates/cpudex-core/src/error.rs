//! # Error Module
//!
//! Unified error type for the record engine.
//!
//! Per-record import failures are NOT represented here: the importer collects
//! those as `RowError` entries in its report and keeps going. This enum covers
//! the failures that abort an operation outright.

use crate::record::RecordId;
use thiserror::Error;

/// Errors produced by the record engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A record failed validation; names the offending field.
    #[error("validation failed for field `{field}`: {reason}")]
    Validation {
        /// The field that failed validation.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// No record with the given identifier exists.
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// The import source could not be read at all (missing file, bad header).
    /// Raised before any write happens for that import call.
    #[error("import source unreadable: {0}")]
    ImportSource(String),

    /// Underlying database could not be opened.
    #[error("storage failure: {0}")]
    Database(#[from] redb::DatabaseError),

    /// A transaction could not be started.
    #[error("storage failure: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// A table could not be opened.
    #[error("storage failure: {0}")]
    Table(#[from] redb::TableError),

    /// A read or write inside a transaction failed.
    #[error("storage failure: {0}")]
    Storage(#[from] redb::StorageError),

    /// A transaction failed to commit.
    #[error("storage failure: {0}")]
    Commit(#[from] redb::CommitError),

    /// A stored record could not be encoded or decoded.
    #[error("record encoding failed: {0}")]
    Codec(#[from] postcard::Error),

    /// CSV serialization failed mid-stream (export path).
    #[error("csv processing failed: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet workbook generation failed.
    #[error("spreadsheet export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl Error {
    /// Build a validation error for `field`.
    #[must_use]
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// True for errors the caller caused (bad input), as opposed to faults.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::NotFound(_) | Self::ImportSource(_)
        )
    }
}

/// Convenience result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordId;

    #[test]
    fn validation_names_field() {
        let err = Error::validation("Cores", "must be non-negative");
        assert!(err.to_string().contains("`Cores`"));
        assert!(err.is_client_error());
    }

    #[test]
    fn not_found_is_client_error() {
        assert!(Error::NotFound(RecordId(7)).is_client_error());
    }

    #[test]
    fn storage_is_not_client_error() {
        let err = Error::Codec(postcard::Error::DeserializeUnexpectedEnd);
        assert!(!err.is_client_error());
    }
}
