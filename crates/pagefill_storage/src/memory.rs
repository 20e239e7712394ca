//! In-memory record store for testing and ephemeral demos.

use crate::error::{StorageError, StorageResult};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind};
use crate::index::RecordIndex;
use crate::record::{Key, Record};
use crate::store::{RecordStore, ScanDirection};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;

/// An in-memory record store.
///
/// This store keeps all records in a sorted set and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Demos that do not need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use pagefill_storage::{InMemoryRecordStore, Record, RecordStore};
///
/// let store = InMemoryRecordStore::new();
/// store.insert_ignoring_duplicates(&[Record::new(1)]).unwrap();
/// assert_eq!(store.len().unwrap(), 1);
/// assert_eq!(store.generation(), 1);
/// ```
#[derive(Debug)]
pub struct InMemoryRecordStore {
    index: RwLock<RecordIndex>,
    feed: ChangeFeed,
    available: AtomicBool,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self {
            index: RwLock::new(RecordIndex::default()),
            feed: ChangeFeed::new(),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryRecordStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given values.
    ///
    /// Pre-population does not emit change events.
    #[must_use]
    pub fn with_values(values: impl IntoIterator<Item = Key>) -> Self {
        let store = Self::new();
        *store.index.write() = RecordIndex::from_records(values.into_iter().map(Record::new));
        store
    }

    /// Returns a copy of all records in ascending order.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.index.read().scan(Key::MIN, ScanDirection::Forward, usize::MAX)
    }

    /// Simulates the backing medium going away or coming back.
    ///
    /// While unavailable, every operation fails with
    /// [`StorageError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::unavailable("in-memory store switched off"))
        }
    }
}

impl RecordStore for InMemoryRecordStore {
    fn scan_ordered(
        &self,
        from: Key,
        direction: ScanDirection,
        limit: usize,
    ) -> StorageResult<Vec<Record>> {
        self.check_available()?;
        Ok(self.index.read().scan(from, direction, limit))
    }

    fn insert_ignoring_duplicates(&self, records: &[Record]) -> StorageResult<usize> {
        self.check_available()?;

        let event = {
            let mut index = self.index.write();
            let fresh = index.missing(records);
            let (Some(min), Some(max)) = (fresh.first(), fresh.last()) else {
                return Ok(0);
            };
            let kind = ChangeKind::Inserted {
                count: fresh.len(),
                min: min.value(),
                max: max.value(),
            };
            index.extend(&fresh);
            self.feed.advance(kind)
        };

        self.feed.publish(event);
        Ok(inserted_count(&event))
    }

    fn clear(&self) -> StorageResult<()> {
        self.check_available()?;

        let event = {
            let mut index = self.index.write();
            index.clear();
            self.feed.advance(ChangeKind::Cleared)
        };

        self.feed.publish(event);
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        self.check_available()?;
        Ok(self.index.read().len())
    }

    fn count_below(&self, key: Key) -> StorageResult<usize> {
        self.check_available()?;
        Ok(self.index.read().count_below(key))
    }

    fn generation(&self) -> u64 {
        self.feed.generation()
    }

    fn subscribe(&self) -> Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}

pub(crate) fn inserted_count(event: &ChangeEvent) -> usize {
    match event.kind {
        ChangeKind::Inserted { count, .. } => count,
        ChangeKind::Cleared => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(values: impl IntoIterator<Item = Key>) -> Vec<Record> {
        values.into_iter().map(Record::new).collect()
    }

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryRecordStore::new();
        assert!(store.is_empty().unwrap());
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn memory_insert_ignores_duplicates() {
        let store = InMemoryRecordStore::new();

        assert_eq!(store.insert_ignoring_duplicates(&records(0..10)).unwrap(), 10);
        assert_eq!(store.insert_ignoring_duplicates(&records(5..15)).unwrap(), 5);
        assert_eq!(store.insert_ignoring_duplicates(&records(0..15)).unwrap(), 0);

        assert_eq!(store.records(), records(0..15));
    }

    #[test]
    fn memory_duplicate_batch_does_not_bump_generation() {
        let store = InMemoryRecordStore::new();
        store.insert_ignoring_duplicates(&records(0..3)).unwrap();
        let generation = store.generation();

        store.insert_ignoring_duplicates(&records(0..3)).unwrap();
        assert_eq!(store.generation(), generation);
    }

    #[test]
    fn memory_insert_emits_event() {
        let store = InMemoryRecordStore::new();
        let rx = store.subscribe();

        store.insert_ignoring_duplicates(&records([4, 2, 9])).unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.generation, 1);
        assert_eq!(
            event.kind,
            ChangeKind::Inserted {
                count: 3,
                min: 2,
                max: 9
            }
        );
    }

    #[test]
    fn memory_scan_both_directions() {
        let store = InMemoryRecordStore::with_values(0..20);

        let forward = store.scan_ordered(5, ScanDirection::Forward, 3).unwrap();
        assert_eq!(forward, records(5..8));

        let backward = store.scan_ordered(5, ScanDirection::Backward, 3).unwrap();
        assert_eq!(backward, records(2..5));
    }

    #[test]
    fn memory_clear() {
        let store = InMemoryRecordStore::with_values(0..5);
        let rx = store.subscribe();

        store.clear().unwrap();

        assert!(store.is_empty().unwrap());
        assert_eq!(rx.try_recv().unwrap().kind, ChangeKind::Cleared);
    }

    #[test]
    fn memory_unavailable() {
        let store = InMemoryRecordStore::with_values(0..5);
        store.set_available(false);

        let result = store.scan_ordered(0, ScanDirection::Forward, 5);
        assert!(matches!(result, Err(StorageError::Unavailable(_))));

        let result = store.insert_ignoring_duplicates(&records(5..6));
        assert!(matches!(result, Err(StorageError::Unavailable(_))));

        store.set_available(true);
        assert_eq!(store.len().unwrap(), 5);
    }

    #[test]
    fn memory_count_below() {
        let store = InMemoryRecordStore::with_values([0, 10, 20]);
        assert_eq!(store.count_below(15).unwrap(), 2);
    }
}
