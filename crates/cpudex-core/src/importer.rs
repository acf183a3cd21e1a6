//! # Importer
//!
//! Streams a semicolon-delimited CSV source into the store.
//!
//! Contract:
//! - an unreadable source or unusable header aborts before any write
//!   (`Error::ImportSource`)
//! - a row that fails validation is recorded in the report and never aborts
//!   the run
//! - rows are upserted on exact, case-sensitive model name; each upsert is
//!   its own transaction, so a mid-run failure leaves earlier rows committed
//! - blank numeric cells mean "no value", never zero
//!
//! File handling lives in the app layer; this module accepts any `io::Read`.

use crate::error::{Error, Result};
use crate::generation;
use crate::locale;
use crate::record::{RecordDraft, columns};
use crate::storage::{RedbStore, UpsertOutcome};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;

// =============================================================================
// OPTIONS / REPORT
// =============================================================================

/// Import behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Remove all existing records before importing. Irreversible; the id
    /// counter survives, so cleared identifiers are not reused.
    pub clear_existing: bool,
    /// Replace all fields of an existing record when a row matches its
    /// model name. Without this, matching rows are skipped.
    pub overwrite: bool,
}

/// One row that failed validation. The row number is 1-based and counts the
/// header, matching what a user sees in a spreadsheet editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: u64,
    pub reason: String,
}

/// Outcome of an import run. Every rejected row is enumerated; nothing is
/// dropped silently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    /// Rows that made it into storage in any form.
    #[must_use]
    pub fn applied(&self) -> u64 {
        self.inserted + self.updated
    }
}

// =============================================================================
// IMPORTER
// =============================================================================

/// CSV-to-store importer over an explicit storage handle.
#[derive(Debug)]
pub struct Importer<'s> {
    store: &'s RedbStore,
    options: ImportOptions,
}

impl<'s> Importer<'s> {
    #[must_use]
    pub fn new(store: &'s RedbStore, options: ImportOptions) -> Self {
        Self { store, options }
    }

    /// Run the import against `source`.
    ///
    /// `max_launch_year` bounds the plausible launch-year window (callers
    /// pass current year + 2; the engine never reads a clock).
    pub fn run<R: Read>(&self, source: R, max_launch_year: i32) -> Result<ImportReport> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_reader(source);

        // Header problems abort before any write happens.
        let header_index = match reader.headers() {
            Ok(headers) => index_columns(headers),
            Err(err) => return Err(Error::ImportSource(err.to_string())),
        };
        if !header_index.contains_key(columns::MODEL_NAME) {
            return Err(Error::ImportSource(format!(
                "header is missing the `{}` column",
                columns::MODEL_NAME
            )));
        }

        if self.options.clear_existing {
            self.store.clear()?;
        }

        let mut report = ImportReport::default();
        for (index, row) in reader.records().enumerate() {
            // Row 1 is the header; data starts at row 2.
            let row_number = index as u64 + 2;
            let record = match row {
                Ok(record) => record,
                Err(err) => {
                    report.errors.push(RowError {
                        row: row_number,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            match row_to_draft(&record, &header_index, max_launch_year) {
                Ok(draft) => {
                    match self.store.upsert_by_name(draft, self.options.overwrite)? {
                        UpsertOutcome::Inserted(_) => report.inserted += 1,
                        UpsertOutcome::Updated(_) => report.updated += 1,
                        UpsertOutcome::Skipped(_) => report.skipped += 1,
                    }
                }
                Err(reason) => report.errors.push(RowError {
                    row: row_number,
                    reason,
                }),
            }
        }
        Ok(report)
    }
}

// =============================================================================
// ROW MAPPING
// =============================================================================

/// Map header names to positions, stripping the UTF-8 BOM some exports
/// prepend to the first cell.
fn index_columns(headers: &csv::StringRecord) -> BTreeMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim_start_matches('\u{feff}').trim().to_string(), i))
        .collect()
}

fn cell<'r>(
    record: &'r csv::StringRecord,
    index: &BTreeMap<String, usize>,
    column: &str,
) -> &'r str {
    index
        .get(column)
        .and_then(|&i| record.get(i))
        .unwrap_or("")
        .trim()
}

fn text_cell(
    record: &csv::StringRecord,
    index: &BTreeMap<String, usize>,
    column: &str,
) -> Option<String> {
    let value = cell(record, index, column);
    (!value.is_empty()).then(|| value.to_string())
}

fn numeric_cell<T>(
    raw: &str,
    column: &str,
    parse: impl Fn(&str) -> std::result::Result<Option<T>, locale::ParseNumberError>,
) -> std::result::Result<Option<T>, String> {
    parse(raw).map_err(|err| format!("field `{column}`: {err}"))
}

/// Translate one CSV row into a validated draft, or a reason string.
fn row_to_draft(
    record: &csv::StringRecord,
    index: &BTreeMap<String, usize>,
    max_launch_year: i32,
) -> std::result::Result<RecordDraft, String> {
    let model_name = cell(record, index, columns::MODEL_NAME);
    if model_name.is_empty() {
        return Err(format!("missing {}", columns::MODEL_NAME));
    }

    let mut draft = RecordDraft::named(model_name);
    draft.family = text_cell(record, index, columns::FAMILY);
    draft.model_code = text_cell(record, index, columns::MODEL_CODE);
    draft.codename = text_cell(record, index, columns::CODENAME);
    draft.cores = numeric_cell(cell(record, index, columns::CORES), columns::CORES, |s| {
        locale::parse_count(s)
    })?;
    draft.threads = numeric_cell(
        cell(record, index, columns::THREADS),
        columns::THREADS,
        |s| locale::parse_count(s),
    )?;
    draft.max_turbo_ghz = numeric_cell(
        cell(record, index, columns::MAX_TURBO_GHZ),
        columns::MAX_TURBO_GHZ,
        |s| locale::parse_decimal(s),
    )?;
    draft.l3_cache_mb = numeric_cell(
        cell(record, index, columns::L3_CACHE_MB),
        columns::L3_CACHE_MB,
        |s| locale::parse_decimal(s),
    )?;
    draft.tdp_watts = numeric_cell(
        cell(record, index, columns::TDP_WATTS),
        columns::TDP_WATTS,
        |s| locale::parse_decimal(s),
    )?;
    draft.launch_year = numeric_cell(
        cell(record, index, columns::LAUNCH_YEAR),
        columns::LAUNCH_YEAR,
        |s| locale::parse_year(s),
    )?;
    draft.max_memory_tb = numeric_cell(
        cell(record, index, columns::MAX_MEMORY_TB),
        columns::MAX_MEMORY_TB,
        |s| locale::parse_decimal(s),
    )?;

    // Fill in the generation codename when the source left it out.
    if draft.codename.is_none() {
        if let (Some(code), Some(year)) = (draft.model_code.as_deref(), draft.launch_year) {
            draft.codename = generation::infer_codename(code, year, draft.family.as_deref())
                .map(str::to_string);
        }
    }

    draft.validate(max_launch_year).map_err(|e| e.to_string())?;
    Ok(draft)
}

// =============================================================================
// TESTS
// =============================================================================
