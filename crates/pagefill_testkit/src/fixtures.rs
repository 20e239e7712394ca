//! Test fixtures and pager helpers.
//!
//! Provides ready-made pagers over in-memory and temporary file stores,
//! plus scripted fetchers for failure scenarios.

use pagefill_core::{
    BackfillMediator, InitializeAction, KeyRange, LoadOutcome, MockFetcher, Pager, PagingConfig,
    PagingError, PagingResult, SyntheticFetcher, WindowFetcher,
};
use pagefill_storage::{
    FileRecordStore, InMemoryRecordStore, Key, Record, RecordStore, ScanDirection,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Mediator used by [`TestPager`].
pub type TestMediator<S> = BackfillMediator<S, MockFetcher>;

/// A pager wired to a [`MockFetcher`], with handles on every part.
pub struct TestPager<S: RecordStore = InMemoryRecordStore> {
    /// The pager under test.
    pub pager: Pager<S, Arc<TestMediator<S>>>,
    /// The store the pager reads.
    pub store: Arc<S>,
    /// The mediator that backfills the store.
    pub mediator: Arc<TestMediator<S>>,
}

impl TestPager<InMemoryRecordStore> {
    /// Creates a pager over an empty in-memory store with the default config.
    pub fn new() -> Self {
        Self::with_config(PagingConfig::default())
    }

    /// Creates a pager over an empty in-memory store.
    pub fn with_config(config: PagingConfig) -> Self {
        Self::over(
            Arc::new(InMemoryRecordStore::new()),
            config,
            InitializeAction::LaunchInitialRefresh,
        )
    }

    /// Creates a pager over an in-memory store that already holds `values`.
    /// The initial remote refresh is skipped.
    pub fn with_values(values: impl IntoIterator<Item = Key>) -> Self {
        Self::over(
            Arc::new(InMemoryRecordStore::with_values(values)),
            PagingConfig::default(),
            InitializeAction::SkipInitialRefresh,
        )
    }
}

impl Default for TestPager<InMemoryRecordStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RecordStore> TestPager<S> {
    /// Creates a pager over an existing store.
    pub fn over(store: Arc<S>, config: PagingConfig, initialize: InitializeAction) -> Self {
        let mediator = Arc::new(
            BackfillMediator::new(Arc::clone(&store), MockFetcher::new())
                .with_initialize_action(initialize),
        );
        let pager = Pager::new(config, Arc::clone(&store), Arc::clone(&mediator))
            .expect("Invalid paging config");
        Self {
            pager,
            store,
            mediator,
        }
    }

    /// Returns the mock fetcher behind the mediator.
    pub fn fetcher(&self) -> &MockFetcher {
        self.mediator.fetcher()
    }

    /// Returns every stored value, ascending.
    pub fn stored_values(&self) -> Vec<Key> {
        let len = self.store.len().expect("Failed to read store length");
        self.store
            .scan_ordered(Key::MIN, ScanDirection::Forward, len)
            .expect("Failed to scan store")
            .iter()
            .map(Record::value)
            .collect()
    }

    /// Returns the values in the pager's loaded window.
    pub fn loaded_values(&self) -> Vec<Key> {
        self.pager.snapshot().records.iter().map(Record::value).collect()
    }

    /// Appends until `value` is loaded or the stream ends. Returns the
    /// number of append loads issued.
    ///
    /// # Errors
    ///
    /// Returns the first failed load.
    pub fn scroll_to(&self, value: Key) -> PagingResult<usize> {
        let mut loads = 0;
        while self.loaded_values().last().map_or(true, |last| *last < value) {
            if self.pager.append()? == LoadOutcome::EndReached {
                break;
            }
            loads += 1;
        }
        Ok(loads)
    }
}

impl<S: RecordStore> std::ops::Deref for TestPager<S> {
    type Target = Pager<S, Arc<TestMediator<S>>>;

    fn deref(&self) -> &Self::Target {
        &self.pager
    }
}

/// A temporary directory holding one record store file.
pub struct TestStoreDir {
    dir: TempDir,
}

impl TestStoreDir {
    /// Creates an empty temporary directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the store file path.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("records.bin")
    }

    /// Opens the store file. Only one handle may be open at a time.
    pub fn open(&self) -> Arc<FileRecordStore> {
        Arc::new(FileRecordStore::open(&self.path()).expect("Failed to open file store"))
    }
}

impl Default for TestStoreDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a test with a pager over a fresh in-memory store.
///
/// # Example
///
/// ```rust
/// use pagefill_testkit::with_test_pager;
///
/// with_test_pager(|pager| {
///     pager.refresh().unwrap();
///     assert_eq!(pager.loaded_values().len(), 20);
/// });
/// ```
pub fn with_test_pager<F, R>(f: F) -> R
where
    F: FnOnce(&TestPager) -> R,
{
    let pager = TestPager::new();
    f(&pager)
}

/// A synthetic fetcher that fails every `fail_every`-th call with a
/// retryable error.
#[derive(Debug, Default)]
pub struct FlakyFetcher {
    inner: SyntheticFetcher,
    fail_every: u64,
    calls: AtomicU64,
    failures: AtomicU64,
}

impl FlakyFetcher {
    /// Creates a fetcher failing every `fail_every`-th call. Zero never fails.
    pub fn new(fail_every: u64) -> Self {
        Self {
            fail_every,
            ..Self::default()
        }
    }

    /// Returns the number of fetch calls.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the number of scripted failures.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }
}

impl WindowFetcher for FlakyFetcher {
    fn fetch_window(&self, range: KeyRange) -> PagingResult<Vec<Record>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every > 0 && call % self.fail_every == 0 {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(PagingError::fetch_retryable(format!(
                "scripted failure on call {call} for {range}"
            )));
        }
        self.inner.fetch_window(range)
    }
}

/// Asserts that `values` are strictly ascending, so free of duplicates.
pub fn assert_strictly_ascending(values: &[Key]) {
    for pair in values.windows(2) {
        assert!(
            pair[0] < pair[1],
            "values not strictly ascending: {} then {}",
            pair[0],
            pair[1]
        );
    }
}

/// Asserts that `values` are exactly `start..end`.
pub fn assert_contiguous(values: &[Key], start: Key, end: Key) {
    let expected: Vec<Key> = (start..end).collect();
    assert_eq!(values, expected.as_slice(), "expected [{start}, {end})");
}
