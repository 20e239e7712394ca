//! File-based record store for persistent storage.

use crate::error::{StorageError, StorageResult};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind};
use crate::index::RecordIndex;
use crate::memory::inserted_count;
use crate::record::{Key, Record};
use crate::store::{RecordStore, ScanDirection};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use tracing::{debug, warn};

const RECORD_SIZE: usize = 8;

/// Options for opening a [`FileRecordStore`].
#[derive(Debug, Clone)]
pub struct FileStoreOptions {
    /// Whether to `sync_all` after every effective insert (safer but slower).
    pub sync_on_insert: bool,
    /// Whether to create missing parent directories.
    pub create_dirs: bool,
}

impl Default for FileStoreOptions {
    fn default() -> Self {
        Self {
            sync_on_insert: false,
            create_dirs: true,
        }
    }
}

impl FileStoreOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether every insert is synced to disk.
    #[must_use]
    pub const fn sync_on_insert(mut self, value: bool) -> Self {
        self.sync_on_insert = value;
        self
    }

    /// Sets whether missing parent directories are created.
    #[must_use]
    pub const fn create_dirs(mut self, value: bool) -> Self {
        self.create_dirs = value;
        self
    }
}

/// A file-based record store.
///
/// Records are appended to a single file as 8-byte little-endian values and
/// replayed into a sorted in-memory index on open. Data survives process
/// restarts.
///
/// # Locking
///
/// The store takes an exclusive advisory lock on its file. A second open of
/// the same path, from this or another process, fails with
/// [`StorageError::Locked`] until the first store is dropped.
///
/// # Example
///
/// ```no_run
/// use pagefill_storage::{FileRecordStore, Record, RecordStore};
/// use std::path::Path;
///
/// let store = FileRecordStore::open(Path::new("records.dat")).unwrap();
/// store.insert_ignoring_duplicates(&[Record::new(1), Record::new(2)]).unwrap();
/// ```
#[derive(Debug)]
pub struct FileRecordStore {
    path: PathBuf,
    file: Mutex<File>,
    index: RwLock<RecordIndex>,
    feed: ChangeFeed,
    options: FileStoreOptions,
}

impl FileRecordStore {
    /// Opens or creates a store at the given path with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is locked by another
    /// store, or is corrupted.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with_options(path, FileStoreOptions::default())
    }

    /// Opens or creates a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is locked by another
    /// store, or is corrupted.
    pub fn open_with_options(path: &Path, options: FileStoreOptions) -> StorageResult<Self> {
        if options.create_dirs {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        let index = load_index(&mut file)?;
        debug!(path = %path.display(), records = index.len(), "opened record file");

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            index: RwLock::new(index),
            feed: ChangeFeed::new(),
            options,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_to_file(&self, records: &[Record]) -> StorageResult<()> {
        let mut buffer = Vec::with_capacity(records.len() * RECORD_SIZE);
        for record in records {
            buffer.extend_from_slice(&record.to_bytes());
        }

        let mut file = self.file.lock();
        let previous_len = file.seek(SeekFrom::End(0))?;
        let written = file.write_all(&buffer).and_then(|()| file.flush());
        if let Err(err) = written {
            // Drop the torn tail so the file stays replayable.
            let rollback = file.set_len(previous_len);
            return Err(append_failure(&self.path, previous_len, err, rollback));
        }
        if self.options.sync_on_insert {
            file.sync_all()?;
        }
        Ok(())
    }
}

/// Maps a failed append to the error returned to the caller. A failed
/// truncation leaves a torn tail behind, which is reported as corruption.
fn append_failure(
    path: &Path,
    previous_len: u64,
    err: io::Error,
    rollback: io::Result<()>,
) -> StorageError {
    match rollback {
        Ok(()) => err.into(),
        Err(rollback) => {
            warn!(
                path = %path.display(),
                len = previous_len,
                error = %rollback,
                "failed to truncate torn append"
            );
            StorageError::corrupted(format!(
                "append failed ({err}) and truncating back to {previous_len} bytes failed ({rollback})"
            ))
        }
    }
}

fn load_index(file: &mut File) -> StorageResult<RecordIndex> {
    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut bytes)?;

    if bytes.len() % RECORD_SIZE != 0 {
        return Err(StorageError::corrupted(format!(
            "file length {} is not a multiple of {}",
            bytes.len(),
            RECORD_SIZE
        )));
    }

    Ok(RecordIndex::from_records(
        bytes.chunks_exact(RECORD_SIZE).map(|chunk| {
            let mut raw = [0u8; RECORD_SIZE];
            raw.copy_from_slice(chunk);
            Record::from_bytes(raw)
        }),
    ))
}

impl RecordStore for FileRecordStore {
    fn scan_ordered(
        &self,
        from: Key,
        direction: ScanDirection,
        limit: usize,
    ) -> StorageResult<Vec<Record>> {
        Ok(self.index.read().scan(from, direction, limit))
    }

    fn insert_ignoring_duplicates(&self, records: &[Record]) -> StorageResult<usize> {
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
            self.append_to_file(&fresh)?;
            index.extend(&fresh);
            self.feed.advance(kind)
        };

        self.feed.publish(event);
        Ok(inserted_count(&event))
    }

    fn clear(&self) -> StorageResult<()> {
        let event = {
            let mut index = self.index.write();
            {
                let file = self.file.lock();
                file.set_len(0)?;
                file.sync_all()?;
            }
            index.clear();
            self.feed.advance(ChangeKind::Cleared)
        };

        self.feed.publish(event);
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.index.read().len())
    }

    fn count_below(&self, key: Key) -> StorageResult<usize> {
        Ok(self.index.read().count_below(key))
    }

    fn generation(&self) -> u64 {
        self.feed.generation()
    }

    fn subscribe(&self) -> Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}
