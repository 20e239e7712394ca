//! Backfill coordination: keeping the store populated ahead of the reader.
//!
//! The pager calls a [`RemoteMediator`] whenever local data runs out in some
//! direction. [`BackfillMediator`] turns the load direction into a key range
//! through a per-direction planning table, fetches that window, and merges
//! it into the store. The resulting store write invalidates the paged source,
//! which is how the new records reach the consumer.
//!
//! ## Key Invariants
//!
//! - The mediator never returns an error past its own boundary; every
//!   failure becomes [`MediatorResult::Error`]
//! - Prepend never writes (the dataset is bounded at zero)
//! - No retry or backoff happens here; the pager owns that policy

use crate::error::{PagingError, PagingResult};
use crate::fetcher::{KeyRange, WindowFetcher};
use crate::state::{LoadType, PagingState};
use pagefill_storage::{Key, RecordStore};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// What the pager should do before its first read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitializeAction {
    /// Run a mediator refresh before reading the store.
    #[default]
    LaunchInitialRefresh,
    /// Read whatever is already stored.
    SkipInitialRefresh,
}

/// Outcome of a mediator load.
#[derive(Debug)]
pub enum MediatorResult {
    /// The store now holds the requested window.
    Success {
        /// Whether this direction has no more remote data.
        end_of_pagination_reached: bool,
    },
    /// The backfill failed; the store is unchanged or fully updated.
    Error(PagingError),
}

impl MediatorResult {
    /// Returns true for [`MediatorResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, MediatorResult::Success { .. })
    }

    /// Returns true if this direction is exhausted.
    pub fn end_of_pagination_reached(&self) -> bool {
        matches!(
            self,
            MediatorResult::Success {
                end_of_pagination_reached: true
            }
        )
    }
}

/// Fills the local store from a remote source on demand.
pub trait RemoteMediator: Send + Sync {
    /// Decides whether the pager refreshes through the mediator on first load.
    fn initialize(&self) -> InitializeAction {
        InitializeAction::LaunchInitialRefresh
    }

    /// Backfills the store for one load event.
    fn load(&self, load_type: LoadType, state: &PagingState) -> MediatorResult;
}

impl<M: RemoteMediator + ?Sized> RemoteMediator for Arc<M> {
    fn initialize(&self) -> InitializeAction {
        (**self).initialize()
    }

    fn load(&self, load_type: LoadType, state: &PagingState) -> MediatorResult {
        (**self).load(load_type, state)
    }
}

/// What a load event needs from the remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillPlan {
    /// Fetch and insert this window.
    Fetch(KeyRange),
    /// Nothing to fetch; this direction is exhausted.
    EndReached,
}

type Planner = fn(&PagingState) -> PagingResult<BackfillPlan>;

/// Range planners indexed by [`LoadType::index`].
const PLANNERS: [Planner; 3] = [plan_refresh, plan_prepend, plan_append];

/// Computes the backfill plan for a load event.
///
/// # Errors
///
/// Returns [`PagingError::InvalidRange`] if the state yields a negative or
/// overflowing window.
pub fn plan(load_type: LoadType, state: &PagingState) -> PagingResult<BackfillPlan> {
    PLANNERS[load_type.index()](state)
}

/// `[anchor * initial_load_size, (anchor + 1) * initial_load_size)`
fn plan_refresh(state: &PagingState) -> PagingResult<BackfillPlan> {
    let anchor = state.anchor_position.unwrap_or(0);
    let index = Key::try_from(anchor).map_err(|_| PagingError::InvalidRange {
        start: Key::MAX,
        end: Key::MAX,
    })?;
    window(index, state.config.initial_load_size).map(BackfillPlan::Fetch)
}

fn plan_prepend(_state: &PagingState) -> PagingResult<BackfillPlan> {
    Ok(BackfillPlan::EndReached)
}

/// The page after the one holding the last loaded record, or page zero.
fn plan_append(state: &PagingState) -> PagingResult<BackfillPlan> {
    let size = page_width(state.config.page_size)?;
    let page = match state.last_item_or_none() {
        Some(last) => last.value() / size + 1,
        None => 0,
    };
    window(page, state.config.page_size).map(BackfillPlan::Fetch)
}

fn page_width(size: usize) -> PagingResult<Key> {
    match Key::try_from(size) {
        Ok(width) if width > 0 => Ok(width),
        _ => Err(PagingError::invalid_config("page size must be positive")),
    }
}

fn window(index: Key, size: usize) -> PagingResult<KeyRange> {
    let width = page_width(size)?;
    let start = index.checked_mul(width);
    let end = index.checked_add(1).and_then(|next| next.checked_mul(width));
    match (start, end) {
        (Some(start), Some(end)) => KeyRange::new(start, end),
        _ => Err(PagingError::InvalidRange {
            start: index,
            end: index,
        }),
    }
}

/// Counters kept by a [`BackfillMediator`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillStats {
    /// Load events received, indexed by [`LoadType::index`].
    pub loads_by_type: [u64; 3],
    /// Windows fetched successfully.
    pub windows_fetched: u64,
    /// Records returned by the fetcher.
    pub records_fetched: u64,
    /// Records that were new to the store.
    pub records_inserted: u64,
    /// Failed load events.
    pub failures: u64,
    /// Last window fetched.
    pub last_range: Option<KeyRange>,
    /// Last error message.
    pub last_error: Option<String>,
}

impl BackfillStats {
    /// Returns the number of load events received for `load_type`.
    pub fn loads(&self, load_type: LoadType) -> u64 {
        self.loads_by_type[load_type.index()]
    }
}

/// A [`RemoteMediator`] that fetches missing windows and inserts them into
/// a [`RecordStore`].
pub struct BackfillMediator<S: RecordStore + ?Sized, F: WindowFetcher> {
    store: Arc<S>,
    fetcher: F,
    initialize: InitializeAction,
    stats: Mutex<BackfillStats>,
}

impl<S: RecordStore + ?Sized, F: WindowFetcher> BackfillMediator<S, F> {
    /// Creates a mediator writing into `store`.
    pub fn new(store: Arc<S>, fetcher: F) -> Self {
        Self {
            store,
            fetcher,
            initialize: InitializeAction::default(),
            stats: Mutex::new(BackfillStats::default()),
        }
    }

    /// Sets the action reported by [`RemoteMediator::initialize`].
    #[must_use]
    pub fn with_initialize_action(mut self, action: InitializeAction) -> Self {
        self.initialize = action;
        self
    }

    /// Returns a copy of the current counters.
    pub fn stats(&self) -> BackfillStats {
        self.stats.lock().clone()
    }

    /// Returns the fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn backfill(&self, range: KeyRange) -> PagingResult<bool> {
        let records = self.fetcher.fetch_window(range)?;
        let inserted = self.store.insert_ignoring_duplicates(&records)?;

        {
            let mut stats = self.stats.lock();
            stats.windows_fetched += 1;
            stats.records_fetched += records.len() as u64;
            stats.records_inserted += inserted as u64;
            stats.last_range = Some(range);
        }

        debug!(
            %range,
            fetched = records.len(),
            inserted,
            "backfilled window"
        );

        Ok(self
            .fetcher
            .upper_bound()
            .is_some_and(|bound| range.end() >= bound))
    }
}

impl<S: RecordStore + ?Sized, F: WindowFetcher> RemoteMediator for BackfillMediator<S, F> {
    fn initialize(&self) -> InitializeAction {
        self.initialize
    }

    fn load(&self, load_type: LoadType, state: &PagingState) -> MediatorResult {
        self.stats.lock().loads_by_type[load_type.index()] += 1;

        let outcome = plan(load_type, state).and_then(|next| match next {
            BackfillPlan::EndReached => Ok(true),
            BackfillPlan::Fetch(range) => self.backfill(range),
        });

        match outcome {
            Ok(end_of_pagination_reached) => {
                debug!(load = %load_type, end_of_pagination_reached, "mediator load done");
                MediatorResult::Success {
                    end_of_pagination_reached,
                }
            }
            Err(err) => {
                warn!(load = %load_type, error = %err, "mediator load failed");
                let mut stats = self.stats.lock();
                stats.failures += 1;
                stats.last_error = Some(err.to_string());
                MediatorResult::Error(err)
            }
        }
    }
}
