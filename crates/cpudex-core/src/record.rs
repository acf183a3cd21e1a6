//! # Record Schema
//!
//! The `CpuRecord` entity and its validation rules.
//!
//! Invariants:
//! - `model_name` is required and non-empty; it is the dedup key for import
//! - every numeric field, when present, is finite and non-negative
//! - `launch_year` falls in a plausible window (1990 ..= current year + 2)
//! - identifiers are assigned by the store, immutable, and never reused
//!
//! Validation here is pure: no side effects, no storage access.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Earliest plausible launch year for a catalogued CPU.
pub const MIN_LAUNCH_YEAR: i32 = 1990;

/// Canonical CSV column names, shared by the importer and the exporters.
pub mod columns {
    pub const MODEL_NAME: &str = "CPU Model Name";
    pub const FAMILY: &str = "Family";
    pub const MODEL_CODE: &str = "CPU Model";
    pub const CODENAME: &str = "Codename";
    pub const CORES: &str = "Cores";
    pub const THREADS: &str = "Threads";
    pub const MAX_TURBO_GHZ: &str = "Max Turbo Frequency (GHz)";
    pub const L3_CACHE_MB: &str = "L3 Cache (MB)";
    pub const TDP_WATTS: &str = "TDP (W)";
    pub const LAUNCH_YEAR: &str = "Launch Year";
    pub const MAX_MEMORY_TB: &str = "Max Memory (TB)";

    /// Column order of the import format (no ID column; ids are assigned).
    pub const IMPORT_ORDER: [&str; 11] = [
        MODEL_NAME,
        FAMILY,
        MODEL_CODE,
        CODENAME,
        CORES,
        THREADS,
        MAX_TURBO_GHZ,
        L3_CACHE_MB,
        TDP_WATTS,
        LAUNCH_YEAR,
        MAX_MEMORY_TB,
    ];
}

// =============================================================================
// IDENTIFIER
// =============================================================================

/// Unique record identifier.
///
/// Assigned from a monotonic counter on creation; never reused after
/// deletion, even across a `clear_existing` import.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// One CPU specification record - the sole entity of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuRecord {
    pub id: RecordId,
    pub model_name: String,
    pub family: Option<String>,
    pub model_code: Option<String>,
    pub codename: Option<String>,
    pub cores: Option<u32>,
    pub threads: Option<u32>,
    pub max_turbo_ghz: Option<f64>,
    pub l3_cache_mb: Option<f64>,
    pub tdp_watts: Option<f64>,
    pub launch_year: Option<i32>,
    pub max_memory_tb: Option<f64>,
}

// =============================================================================
// DRAFT (create / import input)
// =============================================================================

/// A record candidate without an identifier yet.
///
/// Produced by the importer from a CSV row or deserialized from a create
/// request. `validate` must pass before the draft reaches storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub model_name: String,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub model_code: Option<String>,
    #[serde(default)]
    pub codename: Option<String>,
    #[serde(default)]
    pub cores: Option<u32>,
    #[serde(default)]
    pub threads: Option<u32>,
    #[serde(default)]
    pub max_turbo_ghz: Option<f64>,
    #[serde(default)]
    pub l3_cache_mb: Option<f64>,
    #[serde(default)]
    pub tdp_watts: Option<f64>,
    #[serde(default)]
    pub launch_year: Option<i32>,
    #[serde(default)]
    pub max_memory_tb: Option<f64>,
}

impl RecordDraft {
    /// Create a draft with just a model name; other fields default to absent.
    #[must_use]
    pub fn named(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            family: None,
            model_code: None,
            codename: None,
            cores: None,
            threads: None,
            max_turbo_ghz: None,
            l3_cache_mb: None,
            tdp_watts: None,
            launch_year: None,
            max_memory_tb: None,
        }
    }

    /// Validate the draft against the schema invariants.
    ///
    /// `max_launch_year` is supplied by the caller (current year + 2); the
    /// engine itself never reads a clock.
    pub fn validate(&self, max_launch_year: i32) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(Error::validation(
                columns::MODEL_NAME,
                "must be non-empty",
            ));
        }
        check_non_negative(columns::MAX_TURBO_GHZ, self.max_turbo_ghz)?;
        check_non_negative(columns::L3_CACHE_MB, self.l3_cache_mb)?;
        check_non_negative(columns::TDP_WATTS, self.tdp_watts)?;
        check_non_negative(columns::MAX_MEMORY_TB, self.max_memory_tb)?;
        check_launch_year(self.launch_year, max_launch_year)?;
        Ok(())
    }

    /// Attach an identifier, turning the draft into a full record.
    #[must_use]
    pub fn into_record(self, id: RecordId) -> CpuRecord {
        CpuRecord {
            id,
            model_name: self.model_name,
            family: self.family,
            model_code: self.model_code,
            codename: self.codename,
            cores: self.cores,
            threads: self.threads,
            max_turbo_ghz: self.max_turbo_ghz,
            l3_cache_mb: self.l3_cache_mb,
            tdp_watts: self.tdp_watts,
            launch_year: self.launch_year,
            max_memory_tb: self.max_memory_tb,
        }
    }
}

impl From<CpuRecord> for RecordDraft {
    fn from(record: CpuRecord) -> Self {
        Self {
            model_name: record.model_name,
            family: record.family,
            model_code: record.model_code,
            codename: record.codename,
            cores: record.cores,
            threads: record.threads,
            max_turbo_ghz: record.max_turbo_ghz,
            l3_cache_mb: record.l3_cache_mb,
            tdp_watts: record.tdp_watts,
            launch_year: record.launch_year,
            max_memory_tb: record.max_memory_tb,
        }
    }
}

// =============================================================================
// PATCH (partial update input)
// =============================================================================

/// Partial field replacement for an existing record.
///
/// Absent fields are left unchanged. A present field replaces the stored
/// value; there is no way to null out a populated field through a patch.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordPatch {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub model_code: Option<String>,
    #[serde(default)]
    pub codename: Option<String>,
    #[serde(default)]
    pub cores: Option<u32>,
    #[serde(default)]
    pub threads: Option<u32>,
    #[serde(default)]
    pub max_turbo_ghz: Option<f64>,
    #[serde(default)]
    pub l3_cache_mb: Option<f64>,
    #[serde(default)]
    pub tdp_watts: Option<f64>,
    #[serde(default)]
    pub launch_year: Option<i32>,
    #[serde(default)]
    pub max_memory_tb: Option<f64>,
}

impl RecordPatch {
    /// Validate only the fields the patch carries.
    ///
    /// A record that was valid before a valid patch stays valid after it.
    pub fn validate(&self, max_launch_year: i32) -> Result<()> {
        if let Some(name) = &self.model_name {
            if name.trim().is_empty() {
                return Err(Error::validation(
                    columns::MODEL_NAME,
                    "must be non-empty",
                ));
            }
        }
        check_non_negative(columns::MAX_TURBO_GHZ, self.max_turbo_ghz)?;
        check_non_negative(columns::L3_CACHE_MB, self.l3_cache_mb)?;
        check_non_negative(columns::TDP_WATTS, self.tdp_watts)?;
        check_non_negative(columns::MAX_MEMORY_TB, self.max_memory_tb)?;
        check_launch_year(self.launch_year, max_launch_year)?;
        Ok(())
    }

    /// Apply the patch to `record`, replacing only the fields present.
    pub fn apply(self, record: &mut CpuRecord) {
        if let Some(v) = self.model_name {
            record.model_name = v;
        }
        if let Some(v) = self.family {
            record.family = Some(v);
        }
        if let Some(v) = self.model_code {
            record.model_code = Some(v);
        }
        if let Some(v) = self.codename {
            record.codename = Some(v);
        }
        if let Some(v) = self.cores {
            record.cores = Some(v);
        }
        if let Some(v) = self.threads {
            record.threads = Some(v);
        }
        if let Some(v) = self.max_turbo_ghz {
            record.max_turbo_ghz = Some(v);
        }
        if let Some(v) = self.l3_cache_mb {
            record.l3_cache_mb = Some(v);
        }
        if let Some(v) = self.tdp_watts {
            record.tdp_watts = Some(v);
        }
        if let Some(v) = self.launch_year {
            record.launch_year = Some(v);
        }
        if let Some(v) = self.max_memory_tb {
            record.max_memory_tb = Some(v);
        }
    }

    /// True when the patch carries no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// =============================================================================
// VALIDATION HELPERS
// =============================================================================

fn check_non_negative(field: &'static str, value: Option<f64>) -> Result<()> {
    if let Some(v) = value {
        if !v.is_finite() || v < 0.0 {
            return Err(Error::validation(
                field,
                format!("must be a non-negative finite number, got {v}"),
            ));
        }
    }
    Ok(())
}

fn check_launch_year(value: Option<i32>, max_launch_year: i32) -> Result<()> {
    if let Some(year) = value {
        if year < MIN_LAUNCH_YEAR || year > max_launch_year {
            return Err(Error::validation(
                columns::LAUNCH_YEAR,
                format!("must be between {MIN_LAUNCH_YEAR} and {max_launch_year}, got {year}"),
            ));
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
