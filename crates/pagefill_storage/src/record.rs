//! The record type stored by every [`RecordStore`](crate::RecordStore).

use std::fmt;

/// Key of a record. A record's key is its value.
pub type Key = i64;

/// A single integer-keyed record.
///
/// Records are immutable and totally ordered by value. Two records with the
/// same value are the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Record {
    value: Key,
}

impl Record {
    /// Creates a record with the given value.
    #[must_use]
    pub const fn new(value: Key) -> Self {
        Self { value }
    }

    /// Returns the record value.
    #[must_use]
    pub const fn value(&self) -> Key {
        self.value
    }

    /// Returns the record key (identical to the value).
    #[must_use]
    pub const fn key(&self) -> Key {
        self.value
    }

    /// Encodes the record as 8 little-endian bytes.
    pub(crate) fn to_bytes(self) -> [u8; 8] {
        self.value.to_le_bytes()
    }

    /// Decodes a record from 8 little-endian bytes.
    pub(crate) fn from_bytes(bytes: [u8; 8]) -> Self {
        Self::new(Key::from_le_bytes(bytes))
    }
}

impl From<Key> for Record {
    fn from(value: Key) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
