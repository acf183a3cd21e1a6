//! redb-backed record store.
//!
//! Layout:
//! - `records`: u64 id -> postcard-encoded [`CpuRecord`]
//! - `meta`:    "next_id" -> monotonic id counter
//!
//! The counter only ever moves forward, so identifiers are never reused
//! after deletion - not even when an import clears the whole table first.
//! Every mutating method runs inside a single write transaction; a
//! partially-applied mutation is never visible to readers.

use crate::error::{Error, Result};
use crate::record::{CpuRecord, RecordDraft, RecordId, RecordPatch};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

const RECORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("records");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_ID_KEY: &str = "next_id";
const FIRST_ID: u64 = 1;

/// Result of an import upsert keyed on model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record with that model name existed; a new one was inserted.
    Inserted(RecordId),
    /// A record existed and overwrite was requested; all fields replaced.
    Updated(RecordId),
    /// A record existed and overwrite was not requested; row left alone.
    Skipped(RecordId),
}

/// The shared storage handle.
///
/// One `RedbStore` is opened per process and passed explicitly to the
/// components that need it - there is no ambient singleton connection.
/// redb gives MVCC internally, so `&self` methods are safe to call from
/// concurrent readers while a single writer proceeds.
#[derive(Debug)]
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open (or create) the store at `path` and ensure tables exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path)?;
        let tx = db.begin_write()?;
        {
            tx.open_table(RECORDS)?;
            tx.open_table(META)?;
        }
        tx.commit()?;
        Ok(Self { db })
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Insert a draft as a new record with a freshly assigned identifier.
    pub fn insert(&self, draft: RecordDraft) -> Result<CpuRecord> {
        let tx = self.db.begin_write()?;
        let record;
        {
            let mut meta = tx.open_table(META)?;
            let id = meta.get(NEXT_ID_KEY)?.map_or(FIRST_ID, |g| g.value());
            meta.insert(NEXT_ID_KEY, id + 1)?;

            record = draft.into_record(RecordId(id));
            let mut records = tx.open_table(RECORDS)?;
            records.insert(id, postcard::to_allocvec(&record)?.as_slice())?;
        }
        tx.commit()?;
        Ok(record)
    }

    /// Apply a partial update to an existing record.
    pub fn update(&self, id: RecordId, patch: RecordPatch) -> Result<CpuRecord> {
        let tx = self.db.begin_write()?;
        let record;
        {
            let mut records = tx.open_table(RECORDS)?;
            let mut current: CpuRecord = match records.get(id.0)? {
                Some(guard) => postcard::from_bytes(guard.value())?,
                None => return Err(Error::NotFound(id)),
            };
            patch.apply(&mut current);
            records.insert(id.0, postcard::to_allocvec(&current)?.as_slice())?;
            record = current;
        }
        tx.commit()?;
        Ok(record)
    }

    /// Replace every field of an existing record (import overwrite path).
    pub fn replace(&self, id: RecordId, draft: RecordDraft) -> Result<CpuRecord> {
        let tx = self.db.begin_write()?;
        let record;
        {
            let mut records = tx.open_table(RECORDS)?;
            if records.get(id.0)?.is_none() {
                return Err(Error::NotFound(id));
            }
            record = draft.into_record(id);
            records.insert(id.0, postcard::to_allocvec(&record)?.as_slice())?;
        }
        tx.commit()?;
        Ok(record)
    }

    /// Delete a record by identifier.
    pub fn delete(&self, id: RecordId) -> Result<()> {
        let tx = self.db.begin_write()?;
        {
            let mut records = tx.open_table(RECORDS)?;
            if records.remove(id.0)?.is_none() {
                return Err(Error::NotFound(id));
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove every record. The id counter survives, so cleared identifiers
    /// are never handed out again. Returns the number of records removed.
    pub fn clear(&self) -> Result<u64> {
        let tx = self.db.begin_write()?;
        let removed;
        {
            let records = tx.open_table(RECORDS)?;
            removed = records.len()?;
        }
        tx.delete_table(RECORDS)?;
        {
            tx.open_table(RECORDS)?;
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Insert-or-update keyed on exact, case-sensitive model name.
    ///
    /// The lookup and the write share one transaction, so two concurrent
    /// imports cannot both insert the same name.
    pub fn upsert_by_name(&self, draft: RecordDraft, overwrite: bool) -> Result<UpsertOutcome> {
        let tx = self.db.begin_write()?;
        let outcome;
        {
            let mut records = tx.open_table(RECORDS)?;

            let mut existing: Option<RecordId> = None;
            for entry in records.iter()? {
                let (_, value) = entry?;
                let record: CpuRecord = postcard::from_bytes(value.value())?;
                if record.model_name == draft.model_name {
                    existing = Some(record.id);
                    break;
                }
            }

            match existing {
                Some(id) if overwrite => {
                    let replaced = draft.into_record(id);
                    records.insert(id.0, postcard::to_allocvec(&replaced)?.as_slice())?;
                    outcome = UpsertOutcome::Updated(id);
                }
                Some(id) => outcome = UpsertOutcome::Skipped(id),
                None => {
                    let mut meta = tx.open_table(META)?;
                    let id = meta.get(NEXT_ID_KEY)?.map_or(FIRST_ID, |g| g.value());
                    meta.insert(NEXT_ID_KEY, id + 1)?;

                    let record = draft.into_record(RecordId(id));
                    records.insert(id, postcard::to_allocvec(&record)?.as_slice())?;
                    outcome = UpsertOutcome::Inserted(RecordId(id));
                }
            }
        }
        tx.commit()?;
        Ok(outcome)
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Fetch a record by identifier.
    pub fn get(&self, id: RecordId) -> Result<Option<CpuRecord>> {
        let tx = self.db.begin_read()?;
        let records = tx.open_table(RECORDS)?;
        match records.get(id.0)? {
            Some(guard) => Ok(Some(postcard::from_bytes(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<u64> {
        let tx = self.db.begin_read()?;
        let records = tx.open_table(RECORDS)?;
        Ok(records.len()?)
    }

    /// All records in ascending id order.
    pub fn all(&self) -> Result<Vec<CpuRecord>> {
        let tx = self.db.begin_read()?;
        let records = tx.open_table(RECORDS)?;
        let mut out = Vec::new();
        for entry in records.iter()? {
            let (_, value) = entry?;
            out.push(postcard::from_bytes(value.value())?);
        }
        Ok(out)
    }

    /// One window of records in ascending id order, plus the total count.
    ///
    /// A single pass over the table serves both the window and the total, so
    /// the two are consistent with each other.
    pub fn page(&self, offset: u64, limit: u64) -> Result<(Vec<CpuRecord>, u64)> {
        let tx = self.db.begin_read()?;
        let records = tx.open_table(RECORDS)?;
        let mut items = Vec::new();
        let mut total: u64 = 0;
        for entry in records.iter()? {
            let (_, value) = entry?;
            if total >= offset && (items.len() as u64) < limit {
                items.push(postcard::from_bytes(value.value())?);
            }
            total += 1;
        }
        Ok((items, total))
    }

    /// Find a record by exact, case-sensitive model name.
    pub fn find_by_name(&self, name: &str) -> Result<Option<CpuRecord>> {
        let tx = self.db.begin_read()?;
        let records = tx.open_table(RECORDS)?;
        for entry in records.iter()? {
            let (_, value) = entry?;
            let record: CpuRecord = postcard::from_bytes(value.value())?;
            if record.model_name == name {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

// =============================================================================
// TESTS
// =============================================================================
