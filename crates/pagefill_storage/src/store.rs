//! Record store trait definition.

use crate::error::StorageResult;
use crate::feed::ChangeEvent;
use crate::record::{Key, Record};
use std::sync::mpsc::Receiver;

/// Direction of an ordered scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// Records with `value >= from`, lowest first.
    Forward,
    /// Records with `value < from`, the ones closest to `from`.
    Backward,
}

/// A durable, ordered collection of integer-keyed records.
///
/// # Invariants
///
/// - Records are unique by value
/// - `scan_ordered` always returns records in ascending order
/// - `insert_ignoring_duplicates` is atomic: a reader sees either none or all
///   of the new records in a batch
/// - Every effective write bumps [`generation`](Self::generation) before it
///   becomes visible and emits a [`ChangeEvent`]
///
/// # Implementors
///
/// - [`super::InMemoryRecordStore`] - For tests and demos
/// - [`super::FileRecordStore`] - For persistent storage
pub trait RecordStore: Send + Sync {
    /// Returns up to `limit` records in ascending order.
    ///
    /// `Forward` starts at `from` (inclusive) and moves toward higher keys.
    /// `Backward` takes the `limit` records immediately below `from`
    /// (exclusive); the result is still ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`](crate::StorageError::Unavailable)
    /// if the backing medium cannot be reached.
    fn scan_ordered(
        &self,
        from: Key,
        direction: ScanDirection,
        limit: usize,
    ) -> StorageResult<Vec<Record>>;

    /// Inserts a batch of records, silently skipping keys that already exist.
    ///
    /// Returns the number of records that were actually new.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be written. On error, no
    /// record of the batch is visible.
    fn insert_ignoring_duplicates(&self, records: &[Record]) -> StorageResult<usize>;

    /// Removes all records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store could not be cleared.
    fn clear(&self) -> StorageResult<()>;

    /// Returns the number of records in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be reached.
    fn len(&self) -> StorageResult<usize>;

    /// Returns true if the store holds no records.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be reached.
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the number of records with `value < key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be reached.
    fn count_below(&self, key: Key) -> StorageResult<usize>;

    /// Returns the current data generation.
    ///
    /// The generation changes whenever the visible contents change.
    fn generation(&self) -> u64;

    /// Subscribes to change events emitted after every effective write.
    fn subscribe(&self) -> Receiver<ChangeEvent>;
}
