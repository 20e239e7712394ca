//! Property-based test generators using proptest.
//!
//! Provides strategies for generating record batches and paging
//! configurations that maintain required invariants.

use pagefill_core::PagingConfig;
use pagefill_storage::{Key, Record};
use proptest::prelude::*;

/// Strategy for generating record keys in a small, collision-prone range.
pub fn key_strategy() -> impl Strategy<Value = Key> {
    0i64..10_000
}

/// Strategy for generating insert batches, duplicates and disorder included.
pub fn batch_strategy() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(key_strategy().prop_map(Record::new), 0..100)
}

/// Strategy for generating strictly ascending value sequences.
pub fn ascending_values_strategy() -> impl Strategy<Value = Vec<Key>> {
    prop::collection::btree_set(0i64..1_000, 0..100).prop_map(|set| set.into_iter().collect())
}

/// Strategy for generating valid paging configurations.
pub fn paging_config_strategy() -> impl Strategy<Value = PagingConfig> {
    (1usize..50, 1usize..100, 0usize..20, any::<bool>()).prop_map(
        |(page_size, initial_load_size, prefetch_distance, placeholders)| {
            PagingConfig::new()
                .page_size(page_size)
                .initial_load_size(initial_load_size)
                .prefetch_distance(prefetch_distance)
                .enable_placeholders(placeholders || prefetch_distance == 0)
        },
    )
}

/// Strategy for configurations whose initial load is a whole number of
/// pages, so append windows follow the refresh window without gaps.
pub fn aligned_config_strategy() -> impl Strategy<Value = PagingConfig> {
    (1usize..30, 1usize..5, 1usize..10).prop_map(|(page_size, pages, prefetch_distance)| {
        PagingConfig::new()
            .page_size(page_size)
            .initial_load_size(page_size * pages)
            .prefetch_distance(prefetch_distance)
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{assert_contiguous, assert_strictly_ascending, TestPager};
    use pagefill_core::{plan, BackfillPlan, KeyRange, LoadType, Page, PagingData, PagingState};
    use pagefill_storage::{InMemoryRecordStore, RecordStore};
    use std::collections::BTreeSet;

    fn state_after(last: Key, config: PagingConfig, anchor: Option<usize>) -> PagingState {
        let mut state = PagingState::empty(config);
        state.pages = vec![Page {
            data: vec![Record::new(last)],
            ..Page::default()
        }];
        state.anchor_position = anchor;
        state
    }

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn insert_is_idempotent(batch in batch_strategy()) {
            let store = InMemoryRecordStore::new();
            let unique: BTreeSet<Key> = batch.iter().map(Record::value).collect();

            let first = store.insert_ignoring_duplicates(&batch).unwrap();
            let generation = store.generation();
            let second = store.insert_ignoring_duplicates(&batch).unwrap();

            prop_assert_eq!(first, unique.len());
            prop_assert_eq!(second, 0);
            prop_assert_eq!(store.generation(), generation);
            prop_assert_eq!(store.len().unwrap(), unique.len());
        }

        #[test]
        fn append_window_follows_last_value(last in 0i64..100_000, page_size in 1usize..100) {
            let config = PagingConfig::new().page_size(page_size);
            let width = page_size as Key;
            let start = (last / width + 1) * width;

            let next = plan(LoadType::Append, &state_after(last, config, None)).unwrap();

            prop_assert_eq!(next, BackfillPlan::Fetch(KeyRange::new(start, start + width).unwrap()));
            prop_assert!(start > last);
        }

        #[test]
        fn refresh_window_follows_anchor(anchor in 0usize..1_000, initial in 1usize..100) {
            let config = PagingConfig::new().initial_load_size(initial);
            let start = (anchor * initial) as Key;

            let next = plan(LoadType::Refresh, &state_after(0, config, Some(anchor))).unwrap();

            prop_assert_eq!(
                next,
                BackfillPlan::Fetch(KeyRange::new(start, start + initial as Key).unwrap())
            );
        }

        #[test]
        fn prepend_never_fetches(last in 0i64..100_000) {
            let next = plan(LoadType::Prepend, &state_after(last, PagingConfig::default(), None));
            prop_assert_eq!(next.unwrap(), BackfillPlan::EndReached);
        }

        #[test]
        fn slots_cover_placeholders_and_items(
            values in ascending_values_strategy(),
            before in 0usize..50,
            after in 0usize..50,
        ) {
            let snapshot = PagingData {
                records: values.iter().copied().map(Record::new).collect(),
                items_before: before,
                items_after: after,
                ..PagingData::empty(true)
            };
            let separators = values
                .windows(2)
                .filter(|pair| pair[1] % 10 == 0)
                .count();

            prop_assert_eq!(
                snapshot.slots().count(),
                before + values.len() + separators + after
            );
            prop_assert_eq!(snapshot.slots().flatten().count(), values.len() + separators);
        }

        #[test]
        fn generated_configs_are_valid(config in paging_config_strategy()) {
            prop_assert!(config.validate().is_ok());
        }

        #[test]
        fn scrolling_covers_every_value(config in aligned_config_strategy(), target in 0i64..200) {
            let pager = TestPager::with_config(config);
            pager.refresh().unwrap();
            pager.scroll_to(target).unwrap();

            let loaded = pager.loaded_values();
            let end = loaded.last().copied().unwrap_or(0) + 1;
            prop_assert!(end > target);
            assert_contiguous(&loaded, 0, end);
            assert_strictly_ascending(&pager.stored_values());
        }
    }
}
