//! Store Statistics Module
//!
//! Counts the operations an in-process store has served.

// == Store Stats ==
/// Operation counters for the in-process store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Keys looked up, single or batched
    pub reads: u64,
    /// Lookups that found a live entry
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    /// Keys written, single or batched
    pub writes: u64,
    /// Delete calls, whether or not the key existed
    pub deletes: u64,
    /// Current number of entries held (expired ones included until purged)
    pub total_entries: usize,
}

impl StoreStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of operations that reached the store.
    pub fn operations(&self) -> u64 {
        self.reads + self.writes + self.deletes
    }

    /// Calculates the hit rate: hits / reads, or 0.0 without reads.
    pub fn hit_rate(&self) -> f64 {
        if self.reads == 0 {
            0.0
        } else {
            self.hits as f64 / self.reads as f64
        }
    }

    pub fn record_read(&mut self, hit: bool) {
        self.reads += 1;
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
