//! # Export Module
//!
//! Serializes the full record set as semicolon-delimited CSV or as an XLSX
//! workbook. Both use the import column order, with an extra leading `ID`
//! column. CSV output writes period decimals; the importer accepts either
//! convention, so an exported file re-imports to numerically equal values.
//!
//! Pure format conversion over `io::Write` / byte buffers; file handling
//! lives in the app layer.

use crate::error::Result;
use crate::record::{CpuRecord, columns};
use rust_xlsxwriter::Workbook;
use std::io::Write;

/// Column order of the export formats: `ID` plus the import columns.
pub const EXPORT_HEADER: [&str; 12] = [
    "ID",
    columns::MODEL_NAME,
    columns::FAMILY,
    columns::MODEL_CODE,
    columns::CODENAME,
    columns::CORES,
    columns::THREADS,
    columns::MAX_TURBO_GHZ,
    columns::L3_CACHE_MB,
    columns::TDP_WATTS,
    columns::LAUNCH_YEAR,
    columns::MAX_MEMORY_TB,
];

const XLSX_SHEET_NAME: &str = "CPU Specifications";

// =============================================================================
// CSV
// =============================================================================

/// Write all records as semicolon-delimited CSV.
pub fn write_csv<W: Write>(records: &[CpuRecord], out: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(out);
    writer.write_record(EXPORT_HEADER)?;
    for record in records {
        writer.write_record(csv_row(record))?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Render all records as an in-memory CSV string.
pub fn to_csv_string(records: &[CpuRecord]) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(records, &mut buffer)?;
    // The writer only ever emits UTF-8.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn csv_row(record: &CpuRecord) -> [String; 12] {
    [
        record.id.to_string(),
        record.model_name.clone(),
        text(record.family.as_deref()),
        text(record.model_code.as_deref()),
        text(record.codename.as_deref()),
        count(record.cores),
        count(record.threads),
        decimal(record.max_turbo_ghz),
        decimal(record.l3_cache_mb),
        decimal(record.tdp_watts),
        year(record.launch_year),
        decimal(record.max_memory_tb),
    ]
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or("").to_string()
}

fn count(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn year(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn decimal(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// =============================================================================
// XLSX
// =============================================================================

/// Render all records as an XLSX workbook, returned as raw bytes.
pub fn to_xlsx_bytes(records: &[CpuRecord]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(XLSX_SHEET_NAME)?;

    for (col, name) in EXPORT_HEADER.iter().enumerate() {
        sheet.write(0, col as u16, *name)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write(row, 0, record.id.0 as f64)?;
        sheet.write(row, 1, record.model_name.as_str())?;
        write_text(sheet, row, 2, record.family.as_deref())?;
        write_text(sheet, row, 3, record.model_code.as_deref())?;
        write_text(sheet, row, 4, record.codename.as_deref())?;
        write_number(sheet, row, 5, record.cores.map(f64::from))?;
        write_number(sheet, row, 6, record.threads.map(f64::from))?;
        write_number(sheet, row, 7, record.max_turbo_ghz)?;
        write_number(sheet, row, 8, record.l3_cache_mb)?;
        write_number(sheet, row, 9, record.tdp_watts)?;
        write_number(sheet, row, 10, record.launch_year.map(f64::from))?;
        write_number(sheet, row, 11, record.max_memory_tb)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_text(
    sheet: &mut rust_xlsxwriter::Worksheet,
    row: u32,
    col: u16,
    value: Option<&str>,
) -> Result<()> {
    if let Some(v) = value {
        sheet.write(row, col, v)?;
    }
    Ok(())
}

fn write_number(
    sheet: &mut rust_xlsxwriter::Worksheet,
    row: u32,
    col: u16,
    value: Option<f64>,
) -> Result<()> {
    if let Some(v) = value {
        sheet.write(row, col, v)?;
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
