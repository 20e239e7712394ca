//! Key-based paged reads over a record store.

use crate::error::PagingResult;
use crate::state::{LoadType, Page, PagingState};
use pagefill_storage::{Key, Record, RecordStore, ScanDirection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Parameters of a single source load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadParams {
    /// Read forward from `key`, or from the lowest record when `None`.
    Refresh {
        /// Key to start at.
        key: Option<Key>,
        /// Maximum number of records.
        load_size: usize,
    },
    /// Read forward from `key`, inclusive.
    Append {
        /// Key to start at.
        key: Key,
        /// Maximum number of records.
        load_size: usize,
    },
    /// Read the records immediately below `key`.
    Prepend {
        /// Key to end before.
        key: Key,
        /// Maximum number of records.
        load_size: usize,
    },
}

impl LoadParams {
    /// Returns the direction of this load.
    pub const fn load_type(&self) -> LoadType {
        match self {
            LoadParams::Refresh { .. } => LoadType::Refresh,
            LoadParams::Append { .. } => LoadType::Append,
            LoadParams::Prepend { .. } => LoadType::Prepend,
        }
    }

    /// Returns the maximum number of records to read.
    pub const fn load_size(&self) -> usize {
        match self {
            LoadParams::Refresh { load_size, .. }
            | LoadParams::Append { load_size, .. }
            | LoadParams::Prepend { load_size, .. } => *load_size,
        }
    }
}

/// Outcome of a source load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    /// A consistent page.
    Page(Page),
    /// The store changed; this source must be replaced.
    Invalid,
}

/// A paged view of a record store pinned to one store generation.
///
/// Once the store changes, the source reports itself invalid and every
/// further load returns [`LoadResult::Invalid`]. The consumer then creates a
/// new source and re-reads. A load that races a write also returns
/// `Invalid`, so a returned page never mixes two generations.
pub struct PagedSource<S: RecordStore + ?Sized> {
    store: Arc<S>,
    generation: u64,
    invalidated: AtomicBool,
}

impl<S: RecordStore + ?Sized> PagedSource<S> {
    /// Creates a source pinned to the store's current generation.
    pub fn new(store: Arc<S>) -> Self {
        let generation = store.generation();
        Self {
            store,
            generation,
            invalidated: AtomicBool::new(false),
        }
    }

    /// Returns the generation this source reads.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns true if this source must no longer be used.
    pub fn is_invalid(&self) -> bool {
        self.invalidated.load(Ordering::Acquire) || self.store.generation() != self.generation
    }

    /// Marks this source invalid.
    pub fn invalidate(&self) {
        self.invalidated.store(true, Ordering::Release);
    }

    /// Loads one page.
    ///
    /// # Errors
    ///
    /// Returns [`PagingError::StoreUnavailable`](crate::PagingError::StoreUnavailable)
    /// if the store cannot be read.
    pub fn load(&self, params: LoadParams) -> PagingResult<LoadResult> {
        if self.is_invalid() {
            return Ok(LoadResult::Invalid);
        }

        let page = self.read(params)?;

        if self.is_invalid() {
            self.invalidate();
            return Ok(LoadResult::Invalid);
        }

        trace!(
            load = %params.load_type(),
            records = page.len(),
            before = page.items_before,
            after = page.items_after,
            "source page"
        );
        Ok(LoadResult::Page(page))
    }

    /// Returns the key a refresh should restart from, centering the initial
    /// load on the anchor.
    pub fn refresh_key(&self, state: &PagingState) -> Option<Key> {
        let anchor = state.anchor_position?;
        let start = anchor.saturating_sub(state.config.initial_load_size / 2);
        state.closest_item_to_position(start).map(|record| record.value())
    }

    fn read(&self, params: LoadParams) -> PagingResult<Page> {
        match params {
            LoadParams::Refresh { key, load_size } => {
                let from = key.unwrap_or(Key::MIN);
                let mut data = self.store.scan_ordered(from, ScanDirection::Forward, load_size)?;
                if data.is_empty() && key.is_some() {
                    // Anchor past the end: show the tail instead of nothing.
                    data = self.store.scan_ordered(from, ScanDirection::Backward, load_size)?;
                }
                self.page_from(data, from)
            }
            LoadParams::Append { key, load_size } => {
                let data = self.store.scan_ordered(key, ScanDirection::Forward, load_size)?;
                self.page_from(data, key)
            }
            LoadParams::Prepend { key, load_size } => {
                let data = self.store.scan_ordered(key, ScanDirection::Backward, load_size)?;
                self.page_from(data, key)
            }
        }
    }

    fn page_from(&self, data: Vec<Record>, anchor: Key) -> PagingResult<Page> {
        let total = self.store.len()?;

        let (Some(first), Some(last)) = (data.first().copied(), data.last().copied()) else {
            let items_before = self.store.count_below(anchor)?;
            return Ok(Page {
                data,
                prev_key: None,
                next_key: None,
                items_before,
                items_after: total.saturating_sub(items_before),
            });
        };

        let items_before = self.store.count_below(first.value())?;
        let items_after = total.saturating_sub(items_before + data.len());

        Ok(Page {
            prev_key: (items_before > 0).then_some(first.value()),
            next_key: if items_after > 0 {
                last.value().checked_add(1)
            } else {
                None
            },
            items_before,
            items_after,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PagingConfig;
    use pagefill_storage::InMemoryRecordStore;

    fn values(page: &Page) -> Vec<Key> {
        page.data.iter().map(Record::value).collect()
    }

    fn expect_page(result: PagingResult<LoadResult>) -> Page {
        match result.unwrap() {
            LoadResult::Page(page) => page,
            LoadResult::Invalid => panic!("unexpected invalid source"),
        }
    }

    #[test]
    fn refresh_from_start() {
        let store = Arc::new(InMemoryRecordStore::with_values(0..30));
        let source = PagedSource::new(store);

        let page = expect_page(source.load(LoadParams::Refresh {
            key: None,
            load_size: 20,
        }));

        assert_eq!(values(&page), (0..20).collect::<Vec<_>>());
        assert_eq!(page.prev_key, None);
        assert_eq!(page.next_key, Some(20));
        assert_eq!(page.items_before, 0);
        assert_eq!(page.items_after, 10);
    }

    #[test]
    fn append_until_end() {
        let store = Arc::new(InMemoryRecordStore::with_values(0..25));
        let source = PagedSource::new(store);

        let page = expect_page(source.load(LoadParams::Append {
            key: 20,
            load_size: 10,
        }));
        assert_eq!(values(&page), vec![20, 21, 22, 23, 24]);
        assert_eq!(page.prev_key, Some(20));
        assert_eq!(page.next_key, None);
        assert_eq!(page.items_after, 0);
    }

    #[test]
    fn prepend_reads_below_key() {
        let store = Arc::new(InMemoryRecordStore::with_values(0..30));
        let source = PagedSource::new(store);

        let page = expect_page(source.load(LoadParams::Prepend {
            key: 15,
            load_size: 10,
        }));
        assert_eq!(values(&page), (5..15).collect::<Vec<_>>());
        assert_eq!(page.prev_key, Some(5));
        assert_eq!(page.next_key, Some(15));
        assert_eq!(page.items_before, 5);
    }

    #[test]
    fn refresh_past_end_shows_tail() {
        let store = Arc::new(InMemoryRecordStore::with_values(0..10));
        let source = PagedSource::new(store);

        let page = expect_page(source.load(LoadParams::Refresh {
            key: Some(100),
            load_size: 4,
        }));
        assert_eq!(values(&page), vec![6, 7, 8, 9]);
        assert_eq!(page.next_key, None);
    }

    #[test]
    fn empty_store_gives_empty_page() {
        let store = Arc::new(InMemoryRecordStore::new());
        let source = PagedSource::new(store);

        let page = expect_page(source.load(LoadParams::Refresh {
            key: None,
            load_size: 20,
        }));
        assert!(page.is_empty());
        assert_eq!(page.prev_key, None);
        assert_eq!(page.next_key, None);
    }

    #[test]
    fn insert_invalidates_source() {
        let store = Arc::new(InMemoryRecordStore::with_values(0..10));
        let source = PagedSource::new(Arc::clone(&store));
        assert!(!source.is_invalid());

        store
            .insert_ignoring_duplicates(&[Record::new(10)])
            .unwrap();

        assert!(source.is_invalid());
        let result = source
            .load(LoadParams::Append {
                key: 10,
                load_size: 10,
            })
            .unwrap();
        assert_eq!(result, LoadResult::Invalid);

        let fresh = PagedSource::new(store);
        let page = expect_page(fresh.load(LoadParams::Append {
            key: 10,
            load_size: 10,
        }));
        assert_eq!(values(&page), vec![10]);
    }

    #[test]
    fn duplicate_insert_keeps_source_valid() {
        let store = Arc::new(InMemoryRecordStore::with_values(0..10));
        let source = PagedSource::new(Arc::clone(&store));

        store.insert_ignoring_duplicates(&[Record::new(3)]).unwrap();
        assert!(!source.is_invalid());
    }

    #[test]
    fn explicit_invalidate() {
        let store = Arc::new(InMemoryRecordStore::new());
        let source = PagedSource::new(store);
        source.invalidate();
        assert!(source.is_invalid());
    }

    #[test]
    fn store_unavailable_is_an_error() {
        let store = Arc::new(InMemoryRecordStore::with_values(0..10));
        let source = PagedSource::new(Arc::clone(&store));
        store.set_available(false);

        let result = source.load(LoadParams::Refresh {
            key: None,
            load_size: 5,
        });
        assert!(matches!(
            result,
            Err(crate::error::PagingError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn refresh_key_centers_on_anchor() {
        let store = Arc::new(InMemoryRecordStore::with_values(0..100));
        let source = PagedSource::new(store);

        let mut state = PagingState::empty(PagingConfig::default());
        assert_eq!(source.refresh_key(&state), None);

        state.pages = vec![Page {
            data: (0..60).map(Record::new).collect(),
            ..Page::default()
        }];
        state.anchor_position = Some(45);
        assert_eq!(source.refresh_key(&state), Some(35));

        state.anchor_position = Some(3);
        assert_eq!(source.refresh_key(&state), Some(0));
    }
}
