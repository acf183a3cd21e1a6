//! Environment-driven configuration.
//!
//! Everything has a sane default except the admin password: without
//! `CPUDEX_ADMIN_PASSWORD` the server still answers reads, but token issuance
//! reports a configuration error and every mutating request is rejected.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8000;

/// Average Gregorian year in seconds; close enough for a year-granular bound.
const SECONDS_PER_YEAR: u64 = 31_556_952;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    /// Shared secret checked by the login endpoint. Absent = writes disabled.
    pub admin_password: Option<String>,
    /// Key material for token signing; falls back to the admin password.
    pub token_secret: Option<String>,
    /// CSV auto-imported at startup when the store is empty.
    pub seed_csv: PathBuf,
    pub static_dir: PathBuf,
}

impl Config {
    /// Load from `CPUDEX_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: parse_var("CPUDEX_PORT", DEFAULT_PORT),
            db_path: path_var("CPUDEX_DB", "cpudex.redb"),
            admin_password: secret_var("CPUDEX_ADMIN_PASSWORD"),
            token_secret: secret_var("CPUDEX_TOKEN_SECRET"),
            seed_csv: path_var("CPUDEX_SEED_CSV", "cpu_specifications.csv"),
            static_dir: path_var("CPUDEX_STATIC_DIR", "static"),
        }
    }
}

/// Upper bound for plausible launch years: current year plus two, so records
/// for announced-but-unreleased parts still validate.
#[must_use]
pub fn max_launch_year() -> i32 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    1970 + (now / SECONDS_PER_YEAR) as i32 + 2
}

fn parse_var<T: FromStr + Display + Copy>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|err| {
            warn!("invalid {key} value ({err}), using default {default}");
            default
        }),
        Err(_) => default,
    }
}

fn path_var(key: &str, default: &str) -> PathBuf {
    env::var(key).map_or_else(|_| PathBuf::from(default), PathBuf::from)
}

fn secret_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// =============================================================================
// TESTS
// =============================================================================
