//! Window fetchers: the remote side of a backfill.
//!
//! A [`WindowFetcher`] produces every record of a key range. The
//! [`SyntheticFetcher`] generates them locally; a real deployment puts a
//! network call behind the same trait.

use crate::error::{PagingError, PagingResult};
use pagefill_storage::{Key, Record};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A half-open key range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyRange {
    start: Key,
    end: Key,
}

impl KeyRange {
    /// Creates a range, rejecting negative or non-monotonic bounds.
    ///
    /// # Errors
    ///
    /// Returns [`PagingError::InvalidRange`] if `start < 0` or `end < start`.
    pub fn new(start: Key, end: Key) -> PagingResult<Self> {
        if start < 0 || end < start {
            return Err(PagingError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns the inclusive start.
    pub const fn start(&self) -> Key {
        self.start
    }

    /// Returns the exclusive end.
    pub const fn end(&self) -> Key {
        self.end
    }

    /// Returns the number of keys in the range.
    pub const fn len(&self) -> u64 {
        self.end.abs_diff(self.start)
    }

    /// Returns true if the range holds no keys.
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if `key` lies inside the range.
    pub const fn contains(&self, key: Key) -> bool {
        self.start <= key && key < self.end
    }

    /// Returns the range truncated to end at or before `bound`.
    #[must_use]
    pub fn clamp_end(self, bound: Key) -> Self {
        let end = self.end.min(bound).max(self.start);
        Self {
            start: self.start,
            end,
        }
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Produces the records of a key range from a remote or synthetic source.
///
/// Implementations must be idempotent: the mediator may fetch the same
/// range again after a failure or a lost race.
pub trait WindowFetcher: Send + Sync {
    /// Fetches every record in `range`, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`PagingError::FetchFailed`] on a transient or permanent
    /// fetch error.
    fn fetch_window(&self, range: KeyRange) -> PagingResult<Vec<Record>>;

    /// Returns the exclusive upper bound of the remote dataset, if it has one.
    ///
    /// Unbounded sources return `None`, which means appends never report
    /// the end of pagination.
    fn upper_bound(&self) -> Option<Key> {
        None
    }
}

impl<F: WindowFetcher + ?Sized> WindowFetcher for Arc<F> {
    fn fetch_window(&self, range: KeyRange) -> PagingResult<Vec<Record>> {
        (**self).fetch_window(range)
    }

    fn upper_bound(&self) -> Option<Key> {
        (**self).upper_bound()
    }
}

/// Generates one record per integer in the requested range.
///
/// Deterministic and side-effect free, so it is trivially retryable.
#[derive(Debug, Clone, Default)]
pub struct SyntheticFetcher {
    latency: Duration,
    limit: Option<Key>,
}

impl SyntheticFetcher {
    /// Creates an unbounded fetcher with no latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps for `latency` on every fetch, to mimic a network round trip.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Bounds the dataset to keys below `limit`.
    #[must_use]
    pub fn with_limit(mut self, limit: Key) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl WindowFetcher for SyntheticFetcher {
    fn fetch_window(&self, range: KeyRange) -> PagingResult<Vec<Record>> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        let range = match self.limit {
            Some(limit) => range.clamp_end(limit),
            None => range,
        };
        Ok((range.start()..range.end()).map(Record::new).collect())
    }

    fn upper_bound(&self) -> Option<Key> {
        self.limit
    }
}

/// A scripted fetcher for testing.
///
/// Generates the same records as [`SyntheticFetcher`], records every range
/// it was asked for, and can be told to fail the next fetches.
#[derive(Debug, Default)]
pub struct MockFetcher {
    calls: AtomicU64,
    ranges: Mutex<Vec<KeyRange>>,
    failures: Mutex<Vec<PagingError>>,
    latency: Mutex<Duration>,
}

impl MockFetcher {
    /// Creates a mock fetcher that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next fetch fail with `error`. Queued failures are consumed
    /// in order.
    pub fn fail_next(&self, error: PagingError) {
        self.failures.lock().push(error);
    }

    /// Sets an artificial delay applied to every fetch.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Returns the number of fetch calls, failed ones included.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns every range requested so far, failed ones included.
    pub fn ranges(&self) -> Vec<KeyRange> {
        self.ranges.lock().clone()
    }
}

impl WindowFetcher for MockFetcher {
    fn fetch_window(&self, range: KeyRange) -> PagingResult<Vec<Record>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ranges.lock().push(range);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }

        {
            let mut failures = self.failures.lock();
            if !failures.is_empty() {
                return Err(failures.remove(0));
            }
        }

        Ok((range.start()..range.end()).map(Record::new).collect())
    }
}
