//! # Storage Module
//!
//! Disk-backed record storage using redb.
//!
//! Uses the redb embedded database for:
//! - ACID transactions (every mutation is its own write transaction)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)

mod redb_store;

pub use redb_store::{RedbStore, UpsertOutcome};
