//! # cpudex-core
//!
//! Deterministic record engine for the cpudex CPU specification catalog.
//!
//! This crate owns everything that does not touch the network:
//! - [`record`]: the `CpuRecord` schema, validation and partial updates
//! - [`locale`]: decimal-comma numeric parsing for the import format
//! - [`generation`]: CPU generation codename inference
//! - [`storage`]: the redb-backed record store (ACID, MVCC, monotonic ids)
//! - [`importer`]: semicolon-CSV import with per-row error reporting
//! - [`query`]: pagination, lookup, search and aggregate statistics
//! - [`export`]: CSV and XLSX dumps in the import column order
//!
//! The HTTP server, CLI and access gate live in the app layer
//! (`apps/cpudex`), which passes an explicit [`RedbStore`] handle to the
//! components here - no ambient singleton connection.

pub mod error;
pub mod export;
pub mod generation;
pub mod importer;
pub mod locale;
pub mod query;
pub mod record;
pub mod storage;

pub use error::{Error, Result};
pub use importer::{ImportOptions, ImportReport, Importer, RowError};
pub use query::{FieldSummary, MAX_PAGE_SIZE, Page, QueryService, Stats};
pub use record::{CpuRecord, RecordDraft, RecordId, RecordPatch};
pub use storage::{RedbStore, UpsertOutcome};
