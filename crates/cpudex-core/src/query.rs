//! # Query Service
//!
//! Read-only operations over the record set: pagination, lookup, substring
//! search and aggregate statistics. Every operation is side-effect-free and
//! runs against a redb read transaction, so concurrent reads need no
//! coordination.

use crate::error::{Error, Result};
use crate::record::{CpuRecord, RecordId};
use crate::storage::RedbStore;
use serde::Serialize;
use std::collections::BTreeSet;

// =============================================================================
// PAGINATION
// =============================================================================

/// Hard cap on a single page, regardless of the requested limit.
pub const MAX_PAGE_SIZE: u64 = 500;

/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// One window of records plus enough context to paginate further.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub items: Vec<CpuRecord>,
    /// Total records matching the query, not just this window.
    pub total: u64,
    pub offset: u64,
    /// The effective (clamped) limit.
    pub limit: u64,
}

/// Clamp a requested limit into `1..=MAX_PAGE_SIZE`.
#[must_use]
pub fn clamp_limit(limit: u64) -> u64 {
    limit.clamp(1, MAX_PAGE_SIZE)
}

// =============================================================================
// STATISTICS
// =============================================================================

/// Aggregate over one numeric field, computed only across records that carry
/// a value for it. A field nobody fills in reports as `None` in [`Stats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Aggregate figures over the whole record set.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total: u64,
    pub distinct_families: u64,
    pub cores: Option<FieldSummary>,
    pub threads: Option<FieldSummary>,
    pub max_turbo_ghz: Option<FieldSummary>,
    pub l3_cache_mb: Option<FieldSummary>,
    pub tdp_watts: Option<FieldSummary>,
    pub launch_year: Option<FieldSummary>,
    pub max_memory_tb: Option<FieldSummary>,
}

#[derive(Default)]
struct Accumulator {
    count: u64,
    min: f64,
    max: f64,
    sum: f64,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    fn finish(&self) -> Option<FieldSummary> {
        (self.count > 0).then(|| FieldSummary {
            count: self.count,
            min: self.min,
            max: self.max,
            avg: self.sum / self.count as f64,
        })
    }
}

// =============================================================================
// QUERY SERVICE
// =============================================================================

/// Read-side API over an explicit storage handle.
#[derive(Debug, Clone, Copy)]
pub struct QueryService<'s> {
    store: &'s RedbStore,
}

impl<'s> QueryService<'s> {
    #[must_use]
    pub fn new(store: &'s RedbStore) -> Self {
        Self { store }
    }

    /// Records in stable id-ascending order, restricted to the requested
    /// window. The limit is clamped to [`MAX_PAGE_SIZE`].
    pub fn list(&self, offset: u64, limit: u64) -> Result<Page> {
        let limit = clamp_limit(limit);
        let (items, total) = self.store.page(offset, limit)?;
        Ok(Page {
            items,
            total,
            offset,
            limit,
        })
    }

    /// Fetch one record or fail with `NotFound`.
    pub fn get_by_id(&self, id: RecordId) -> Result<CpuRecord> {
        self.store.get(id)?.ok_or(Error::NotFound(id))
    }

    /// Case-insensitive substring search over model name, family, model code
    /// and codename. Same pagination contract as [`Self::list`].
    pub fn search(&self, query: &str, offset: u64, limit: u64) -> Result<Page> {
        let limit = clamp_limit(limit);
        let needle = query.to_lowercase();

        let mut items = Vec::new();
        let mut total: u64 = 0;
        for record in self.store.all()? {
            if !matches_query(&record, &needle) {
                continue;
            }
            if total >= offset && (items.len() as u64) < limit {
                items.push(record);
            }
            total += 1;
        }
        Ok(Page {
            items,
            total,
            offset,
            limit,
        })
    }

    /// Aggregate statistics. Absent values are excluded from a field's
    /// aggregate, not treated as zero.
    pub fn stats(&self) -> Result<Stats> {
        let records = self.store.all()?;

        let mut families: BTreeSet<&str> = BTreeSet::new();
        let mut cores = Accumulator::default();
        let mut threads = Accumulator::default();
        let mut turbo = Accumulator::default();
        let mut cache = Accumulator::default();
        let mut tdp = Accumulator::default();
        let mut year = Accumulator::default();
        let mut memory = Accumulator::default();

        for record in &records {
            if let Some(family) = record.family.as_deref() {
                if !family.is_empty() {
                    families.insert(family);
                }
            }
            if let Some(v) = record.cores {
                cores.push(f64::from(v));
            }
            if let Some(v) = record.threads {
                threads.push(f64::from(v));
            }
            if let Some(v) = record.max_turbo_ghz {
                turbo.push(v);
            }
            if let Some(v) = record.l3_cache_mb {
                cache.push(v);
            }
            if let Some(v) = record.tdp_watts {
                tdp.push(v);
            }
            if let Some(v) = record.launch_year {
                year.push(f64::from(v));
            }
            if let Some(v) = record.max_memory_tb {
                memory.push(v);
            }
        }

        Ok(Stats {
            total: records.len() as u64,
            distinct_families: families.len() as u64,
            cores: cores.finish(),
            threads: threads.finish(),
            max_turbo_ghz: turbo.finish(),
            l3_cache_mb: cache.finish(),
            tdp_watts: tdp.finish(),
            launch_year: year.finish(),
            max_memory_tb: memory.finish(),
        })
    }
}

fn matches_query(record: &CpuRecord, needle_lower: &str) -> bool {
    let hit = |field: Option<&str>| {
        field.is_some_and(|value| value.to_lowercase().contains(needle_lower))
    };
    record.model_name.to_lowercase().contains(needle_lower)
        || hit(record.family.as_deref())
        || hit(record.model_code.as_deref())
        || hit(record.codename.as_deref())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::record::RecordDraft;

    fn seeded_store(dir: &tempfile::TempDir) -> RedbStore {
        let store = RedbStore::open(dir.path().join("query.redb")).unwrap();

        let mut epyc = RecordDraft::named("AMD EPYC 7763");
        epyc.family = Some("AMD EPYC".to_string());
        epyc.model_code = Some("EPYC 7763".to_string());
        epyc.cores = Some(64);
        epyc.tdp_watts = Some(280.0);
        store.insert(epyc).unwrap();

        let mut xeon = RecordDraft::named("Intel Xeon Gold 6240");
        xeon.family = Some("Intel Xeon Gold".to_string());
        xeon.model_code = Some("Gold 6240".to_string());
        xeon.cores = Some(18);
        xeon.tdp_watts = Some(150.0);
        store.insert(xeon).unwrap();

        // No cores, no TDP - must not drag averages toward zero.
        let mut mystery = RecordDraft::named("Mystery CPU");
        mystery.family = Some("AMD EPYC".to_string());
        store.insert(mystery).unwrap();

        store
    }

    #[test]
    fn list_is_id_ordered_with_total() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let queries = QueryService::new(&store);

        let page = queries.list(0, 2).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].id < page.items[1].id);

        let rest = queries.list(2, 2).unwrap();
        assert_eq!(rest.items.len(), 1);
    }

    #[test]
    fn limit_is_clamped_to_max_page_size() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let queries = QueryService::new(&store);

        let page = queries.list(0, 1_000_000).unwrap();
        assert_eq!(page.limit, MAX_PAGE_SIZE);

        let page = queries.list(0, 0).unwrap();
        assert_eq!(page.limit, 1);
    }

    #[test]
    fn get_by_id_distinguishes_found_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let queries = QueryService::new(&store);

        let first = queries.list(0, 1).unwrap().items.remove(0);
        assert_eq!(queries.get_by_id(first.id).unwrap().id, first.id);

        let err = queries.get_by_id(RecordId(9999)).unwrap_err();
        assert!(matches!(err, Error::NotFound(RecordId(9999))));
    }

    #[test]
    fn search_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let queries = QueryService::new(&store);

        let lower = queries.search("epyc", 0, 50).unwrap();
        let upper = queries.search("EPYC", 0, 50).unwrap();
        assert_eq!(lower.total, upper.total);
        assert_eq!(lower.items, upper.items);
        // "AMD EPYC 7763" by name, "Mystery CPU" by family.
        assert_eq!(lower.total, 2);
    }

    #[test]
    fn search_covers_model_code() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let queries = QueryService::new(&store);

        let page = queries.search("gold 6240", 0, 50).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].model_name, "Intel Xeon Gold 6240");
    }

    #[test]
    fn search_paginates_like_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let queries = QueryService::new(&store);

        let page = queries.search("cpu", 0, 1).unwrap();
        assert_eq!(page.items.len().min(1), page.items.len());
        assert!(page.total >= page.items.len() as u64);
    }

    #[test]
    fn stats_exclude_absent_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let queries = QueryService::new(&store);

        let stats = queries.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.distinct_families, 2);

        // Two records carry cores; the third must not count as zero.
        let cores = stats.cores.unwrap();
        assert_eq!(cores.count, 2);
        assert_eq!(cores.min, 18.0);
        assert_eq!(cores.max, 64.0);
        assert_eq!(cores.avg, 41.0);

        // Nobody recorded a turbo frequency.
        assert!(stats.max_turbo_ghz.is_none());
    }

    #[test]
    fn stats_on_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("empty.redb")).unwrap();
        let stats = QueryService::new(&store).stats().unwrap();

        assert_eq!(stats.total, 0);
        assert_eq!(stats.distinct_families, 0);
        assert!(stats.cores.is_none());
    }
}
