//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use pagefill_core::{BackfillMediator, Pager, PagingConfig, SyntheticFetcher};
use pagefill_storage::{InMemoryRecordStore, Key, Record};
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Pager over an in-memory store with an instant synthetic source.
pub type MemoryPager = Pager<InMemoryRecordStore, BackfillMediator<InMemoryRecordStore, SyntheticFetcher>>;

/// Generate `count` consecutive records starting at `start`, in random order.
pub fn shuffled_records(start: Key, count: usize) -> Vec<Record> {
    let mut records: Vec<Record> = (start..).take(count).map(Record::new).collect();
    records.shuffle(&mut rand::thread_rng());
    records
}

/// Generate a batch where every record appears about twice.
pub fn batch_with_duplicates(count: usize) -> Vec<Record> {
    let unique = shuffled_records(0, count.div_ceil(2));
    let mut records: Vec<Record> = unique.iter().copied().cycle().take(count).collect();
    records.shuffle(&mut rand::thread_rng());
    records
}

/// Build a store that already holds `0..count`.
pub fn populated_store(count: usize) -> Arc<InMemoryRecordStore> {
    Arc::new(InMemoryRecordStore::with_values(0..count as Key))
}

/// Build a pager over an empty in-memory store.
pub fn memory_pager(config: PagingConfig) -> MemoryPager {
    let store = Arc::new(InMemoryRecordStore::new());
    let mediator = BackfillMediator::new(Arc::clone(&store), SyntheticFetcher::new());
    Pager::new(config, store, mediator).expect("Invalid paging config")
}
