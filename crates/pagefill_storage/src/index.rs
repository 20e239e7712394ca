//! Ordered in-memory index shared by the store implementations.

use crate::record::{Key, Record};
use crate::store::ScanDirection;
use std::collections::BTreeSet;

/// Sorted, duplicate-free run of records.
///
/// Positions are ranks, so range starts and [`count_below`](Self::count_below)
/// are binary searches.
#[derive(Debug, Default, Clone)]
pub(crate) struct RecordIndex {
    records: Vec<Record>,
}

impl RecordIndex {
    /// Builds an index from records in any order, dropping duplicates.
    pub(crate) fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut records: Vec<Record> = records.into_iter().collect();
        records.sort_unstable();
        records.dedup();
        Self { records }
    }

    pub(crate) fn scan(&self, from: Key, direction: ScanDirection, limit: usize) -> Vec<Record> {
        let rank = self.count_below(from);
        let (start, end) = match direction {
            ScanDirection::Forward => (rank, rank.saturating_add(limit).min(self.records.len())),
            ScanDirection::Backward => (rank.saturating_sub(limit), rank),
        };
        self.records[start..end].to_vec()
    }

    /// Returns the records of `batch` not yet present, sorted and deduplicated.
    pub(crate) fn missing(&self, batch: &[Record]) -> Vec<Record> {
        let fresh: BTreeSet<Record> = batch
            .iter()
            .filter(|record| self.records.binary_search(record).is_err())
            .copied()
            .collect();
        fresh.into_iter().collect()
    }

    /// Merges records returned by [`missing`](Self::missing).
    pub(crate) fn extend(&mut self, fresh: &[Record]) {
        match (self.records.last(), fresh.first()) {
            (_, None) => {}
            (Some(last), Some(first)) if last >= first => {
                let existing = std::mem::take(&mut self.records);
                self.records = merge(existing, fresh);
            }
            _ => self.records.extend_from_slice(fresh),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn count_below(&self, key: Key) -> usize {
        self.records.partition_point(|record| record.value() < key)
    }
}

fn merge(existing: Vec<Record>, fresh: &[Record]) -> Vec<Record> {
    let mut merged = Vec::with_capacity(existing.len() + fresh.len());
    let mut left = existing.into_iter().peekable();
    let mut right = fresh.iter().copied().peekable();
    loop {
        let next = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) if a < b => left.next(),
            (Some(a), Some(b)) if a == b => {
                right.next();
                left.next()
            }
            (Some(_), Some(_)) | (None, Some(_)) => right.next(),
            (Some(_), None) => left.next(),
            (None, None) => break,
        };
        merged.extend(next);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn index_of(values: &[Key]) -> RecordIndex {
        RecordIndex::from_records(values.iter().copied().map(Record::new))
    }

    fn values(records: &[Record]) -> Vec<Key> {
        records.iter().map(Record::value).collect()
    }

    #[test]
    fn forward_scan_is_inclusive() {
        let index = index_of(&[1, 3, 5, 7, 9]);
        assert_eq!(values(&index.scan(3, ScanDirection::Forward, 2)), vec![3, 5]);
        assert_eq!(values(&index.scan(4, ScanDirection::Forward, 10)), vec![5, 7, 9]);
    }

    #[test]
    fn backward_scan_is_exclusive_and_ascending() {
        let index = index_of(&[1, 3, 5, 7, 9]);
        assert_eq!(values(&index.scan(7, ScanDirection::Backward, 2)), vec![3, 5]);
        assert_eq!(values(&index.scan(1, ScanDirection::Backward, 2)), Vec::<Key>::new());
    }

    #[test]
    fn missing_filters_and_dedups() {
        let index = index_of(&[1, 2]);
        let batch = [Record::new(3), Record::new(2), Record::new(3), Record::new(0)];
        assert_eq!(values(&index.missing(&batch)), vec![0, 3]);
    }

    #[test]
    fn count_below() {
        let index = index_of(&[10, 20, 30]);
        assert_eq!(index.count_below(10), 0);
        assert_eq!(index.count_below(25), 2);
        assert_eq!(index.count_below(100), 3);
    }

    #[test]
    fn extend_merges_below_and_above() {
        let mut index = index_of(&[10, 20, 30]);
        let above = index.missing(&[Record::new(40), Record::new(41)]);
        index.extend(&above);
        let below = index.missing(&[Record::new(5), Record::new(15), Record::new(20)]);
        index.extend(&below);

        assert_eq!(
            values(&index.scan(Key::MIN, ScanDirection::Forward, usize::MAX)),
            vec![5, 10, 15, 20, 30, 40, 41]
        );
        assert_eq!(index.count_below(16), 3);
    }

    #[test]
    fn from_records_sorts_and_dedups() {
        let index = index_of(&[3, 1, 3, 2, 1]);
        assert_eq!(index.len(), 3);
        assert_eq!(values(&index.scan(0, ScanDirection::Forward, 10)), vec![1, 2, 3]);
    }

    proptest! {
        #[test]
        fn scans_match_sorted_model(
            stored in proptest::collection::btree_set(-500i64..500, 0..100),
            from in -600i64..600,
            limit in 0usize..40,
        ) {
            let index = index_of(&stored.iter().copied().collect::<Vec<_>>());

            let forward: Vec<Key> = stored.range(from..).copied().take(limit).collect();
            let mut backward: Vec<Key> = stored.range(..from).rev().copied().take(limit).collect();
            backward.reverse();

            prop_assert_eq!(values(&index.scan(from, ScanDirection::Forward, limit)), forward);
            prop_assert_eq!(values(&index.scan(from, ScanDirection::Backward, limit)), backward);
            prop_assert_eq!(index.count_below(from), stored.range(..from).count());
        }

        #[test]
        fn batches_merge_like_a_set(
            batches in proptest::collection::vec(
                proptest::collection::vec(-200i64..200, 0..30),
                0..10,
            ),
            key in -250i64..250,
        ) {
            let mut index = RecordIndex::default();
            let mut model = BTreeSet::new();
            for batch in &batches {
                let records: Vec<Record> = batch.iter().copied().map(Record::new).collect();
                let fresh = index.missing(&records);
                index.extend(&fresh);
                model.extend(batch.iter().copied());
            }

            let all = values(&index.scan(Key::MIN, ScanDirection::Forward, usize::MAX));
            prop_assert_eq!(all, model.iter().copied().collect::<Vec<_>>());
            prop_assert_eq!(index.count_below(key), model.range(..key).count());
        }
    }
}
