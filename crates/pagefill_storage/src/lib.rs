//! # PageFill Storage
//!
//! Ordered record store trait and implementations for PageFill.
//!
//! This crate provides the persistence collaborator of the paging engine: a
//! durable, ordered collection of integer-keyed records.
//!
//! ## Design Principles
//!
//! - A record's key is its value; the store never holds duplicates
//! - Batch inserts are atomic and ignore keys that already exist
//! - Every effective write bumps the store generation and notifies
//!   subscribers, which is how paged readers learn they are stale
//! - Stores must be `Send + Sync` and are shared through `Arc`
//!
//! ## Available Stores
//!
//! - [`InMemoryRecordStore`] - For tests and ephemeral demos
//! - [`FileRecordStore`] - Append-only file with an exclusive lock
//!
//! ## Example
//!
//! ```rust
//! use pagefill_storage::{InMemoryRecordStore, Record, RecordStore, ScanDirection};
//!
//! let store = InMemoryRecordStore::new();
//! let inserted = store
//!     .insert_ignoring_duplicates(&[Record::new(2), Record::new(1), Record::new(2)])
//!     .unwrap();
//! assert_eq!(inserted, 2);
//!
//! let records = store.scan_ordered(0, ScanDirection::Forward, 10).unwrap();
//! assert_eq!(records, vec![Record::new(1), Record::new(2)]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod feed;
mod file;
mod index;
mod memory;
mod record;
mod store;

pub use error::{StorageError, StorageResult};
pub use feed::{ChangeEvent, ChangeFeed, ChangeKind};
pub use file::{FileRecordStore, FileStoreOptions};
pub use memory::InMemoryRecordStore;
pub use record::{Key, Record};
pub use store::{RecordStore, ScanDirection};
