//! The consumer-facing pagination layer.
//!
//! A [`Pager`] owns the loaded window, the current [`PagedSource`] and the
//! per-direction load states. Reads go to the local store first; when the
//! store has nothing more in a direction, the pager asks the
//! [`RemoteMediator`] to backfill, then replaces the invalidated source and
//! re-reads the window.
//!
//! ## Concurrency
//!
//! The pager is `Send + Sync` and is meant to be shared through `Arc`. At most
//! one load per direction runs at a time; a second request for a busy
//! direction returns [`LoadOutcome::Coalesced`] without touching the source
//! or the mediator. No lock is held while the store or the mediator runs.

use crate::config::PagingConfig;
use crate::data::{LoadState, LoadStates, PagingData};
use crate::error::{PagingError, PagingResult};
use crate::mediator::{InitializeAction, MediatorResult, RemoteMediator};
use crate::single_flight::SingleFlight;
use crate::source::{LoadParams, LoadResult, PagedSource};
use crate::state::{LoadType, Page, PagingState};
use pagefill_storage::{RecordStore, StorageError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tracing::{debug, warn};

/// Attempts at reading a consistent window before giving up.
const MAX_READ_ATTEMPTS: usize = 8;

/// Result of a pager load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// New records became visible.
    Loaded {
        /// Number of records added to the window.
        records: usize,
        /// Whether this direction is now exhausted.
        end_of_pagination_reached: bool,
    },
    /// Nothing more can be loaded in this direction.
    EndReached,
    /// A load in this direction was already running.
    Coalesced,
}

struct Inner<S: RecordStore + ?Sized> {
    source: Arc<PagedSource<S>>,
    pages: Vec<Page>,
    anchor_position: Option<usize>,
    load_states: LoadStates,
    initialized: bool,
    version: u64,
}

impl<S: RecordStore + ?Sized> Inner<S> {
    fn item_count(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    fn leading_placeholders(&self, config: &PagingConfig) -> usize {
        if config.enable_placeholders {
            self.pages.first().map_or(0, |page| page.items_before)
        } else {
            0
        }
    }

    fn edge_params(&self, load_type: LoadType, page_size: usize) -> Option<LoadParams> {
        match load_type {
            LoadType::Append => self
                .pages
                .last()
                .and_then(|page| page.next_key)
                .map(|key| LoadParams::Append {
                    key,
                    load_size: page_size,
                }),
            LoadType::Prepend => self
                .pages
                .first()
                .and_then(|page| page.prev_key)
                .map(|key| LoadParams::Prepend {
                    key,
                    load_size: page_size,
                }),
            LoadType::Refresh => None,
        }
    }
}

/// Pages through a [`RecordStore`], backfilling it through a
/// [`RemoteMediator`] when local data runs out.
///
/// # Example
///
/// ```rust
/// use pagefill_core::{BackfillMediator, PagingConfig, Pager, SyntheticFetcher};
/// use pagefill_storage::InMemoryRecordStore;
/// use std::sync::Arc;
///
/// let store = Arc::new(InMemoryRecordStore::new());
/// let mediator = BackfillMediator::new(Arc::clone(&store), SyntheticFetcher::new());
/// let pager = Pager::new(PagingConfig::default(), store, mediator).unwrap();
///
/// pager.refresh().unwrap();
/// pager.append().unwrap();
/// assert_eq!(pager.snapshot().loaded_count(), 30);
/// ```
pub struct Pager<S: RecordStore + ?Sized, M: RemoteMediator> {
    config: PagingConfig,
    store: Arc<S>,
    mediator: M,
    inner: Mutex<Inner<S>>,
    flights: SingleFlight,
    subscribers: Mutex<Vec<Sender<PagingData>>>,
    sources_created: AtomicU64,
}

impl<S: RecordStore + ?Sized, M: RemoteMediator> Pager<S, M> {
    /// Creates a pager. Nothing is loaded until the first
    /// [`refresh`](Self::refresh) or edge load.
    ///
    /// # Errors
    ///
    /// Returns [`PagingError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: PagingConfig, store: Arc<S>, mediator: M) -> PagingResult<Self> {
        config.validate()?;
        let source = Arc::new(PagedSource::new(Arc::clone(&store)));
        Ok(Self {
            config,
            store,
            mediator,
            inner: Mutex::new(Inner {
                source,
                pages: Vec::new(),
                anchor_position: None,
                load_states: LoadStates::default(),
                initialized: false,
                version: 0,
            }),
            flights: SingleFlight::new(),
            subscribers: Mutex::new(Vec::new()),
            sources_created: AtomicU64::new(1),
        })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &PagingConfig {
        &self.config
    }

    /// Returns the store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the mediator.
    pub fn mediator(&self) -> &M {
        &self.mediator
    }

    /// Returns the source the loaded window was read from.
    pub fn current_source(&self) -> Arc<PagedSource<S>> {
        Arc::clone(&self.inner.lock().source)
    }

    /// Returns how many sources this pager has created.
    pub fn sources_created(&self) -> u64 {
        self.sources_created.load(Ordering::Relaxed)
    }

    /// Returns true if a load in that direction is running.
    pub fn is_loading(&self, load_type: LoadType) -> bool {
        self.flights.is_in_flight(load_type)
    }

    /// Returns the state handed to the mediator.
    pub fn state(&self) -> PagingState {
        let inner = self.inner.lock();
        PagingState {
            pages: inner.pages.clone(),
            anchor_position: inner.anchor_position,
            config: self.config,
            leading_placeholder_count: inner.leading_placeholders(&self.config),
        }
    }

    /// Returns the current load states.
    pub fn load_states(&self) -> LoadStates {
        self.inner.lock().load_states.clone()
    }

    /// Returns a snapshot of the loaded window.
    pub fn snapshot(&self) -> PagingData {
        let inner = self.inner.lock();
        self.snapshot_of(&inner)
    }

    /// Subscribes to snapshots emitted after every change.
    pub fn subscribe(&self) -> Receiver<PagingData> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Runs a load in the given direction.
    ///
    /// # Errors
    ///
    /// See [`refresh`](Self::refresh), [`append`](Self::append) and
    /// [`prepend`](Self::prepend).
    pub fn load(&self, load_type: LoadType) -> PagingResult<LoadOutcome> {
        match load_type {
            LoadType::Refresh => self.refresh(),
            LoadType::Prepend => self.prepend(),
            LoadType::Append => self.append(),
        }
    }

    /// Reloads the window around the anchor.
    ///
    /// The mediator refresh runs first, except on the very first load when
    /// the mediator asks to skip it.
    ///
    /// # Errors
    ///
    /// Returns the mediator's error, or a store error from the local read.
    pub fn refresh(&self) -> PagingResult<LoadOutcome> {
        let Some(_flight) = self.flights.try_begin(LoadType::Refresh) else {
            return Ok(LoadOutcome::Coalesced);
        };
        self.set_load_state(LoadType::Refresh, LoadState::Loading);
        let result = self.run_refresh();
        self.finish(LoadType::Refresh, &result);
        result
    }

    /// Loads the next page toward higher keys, backfilling when the store
    /// has nothing more.
    ///
    /// # Errors
    ///
    /// Returns the mediator's error, or a store error from the local read.
    pub fn append(&self) -> PagingResult<LoadOutcome> {
        self.load_edge(LoadType::Append)
    }

    /// Loads the previous page toward lower keys, asking the mediator when
    /// the store has nothing more.
    ///
    /// # Errors
    ///
    /// Returns the mediator's error, or a store error from the local read.
    pub fn prepend(&self) -> PagingResult<LoadOutcome> {
        self.load_edge(LoadType::Prepend)
    }

    /// Records an access at an absolute position (leading placeholders
    /// included) and returns the loads it calls for.
    ///
    /// Directions that are exhausted are never returned; directions whose
    /// last load failed are, so scrolling re-triggers them.
    pub fn access(&self, position: usize) -> Vec<LoadType> {
        let mut inner = self.inner.lock();
        inner.anchor_position = Some(position);

        if !inner.initialized {
            return vec![LoadType::Refresh];
        }

        let leading = inner.leading_placeholders(&self.config);
        let loaded = inner.item_count();
        let prefetch = self.config.prefetch_distance;
        let relative = position.saturating_sub(leading);

        let mut needed = Vec::new();
        if (position < leading || relative < prefetch)
            && !inner.load_states.prepend.end_of_pagination_reached()
        {
            needed.push(LoadType::Prepend);
        }
        if relative.saturating_add(prefetch) >= loaded
            && !inner.load_states.append.end_of_pagination_reached()
        {
            needed.push(LoadType::Append);
        }
        needed
    }

    /// Re-issues every direction whose last load failed.
    ///
    /// # Errors
    ///
    /// Returns the first error from a re-issued load.
    pub fn retry(&self) -> PagingResult<Vec<LoadOutcome>> {
        let states = self.load_states();
        LoadType::ALL
            .into_iter()
            .filter(|load_type| states.get(*load_type).is_error())
            .map(|load_type| {
                debug!(load = %load_type, "retrying failed load");
                self.load(load_type)
            })
            .collect()
    }

    fn load_edge(&self, load_type: LoadType) -> PagingResult<LoadOutcome> {
        let Some(_flight) = self.flights.try_begin(load_type) else {
            return Ok(LoadOutcome::Coalesced);
        };

        if !self.inner.lock().initialized {
            return self.refresh();
        }
        if self
            .inner
            .lock()
            .load_states
            .get(load_type)
            .end_of_pagination_reached()
        {
            return Ok(LoadOutcome::EndReached);
        }

        self.set_load_state(load_type, LoadState::Loading);
        let result = self.run_edge(load_type);
        self.finish(load_type, &result);
        result
    }

    fn run_refresh(&self) -> PagingResult<LoadOutcome> {
        let state = self.state();
        let first_load = !self.inner.lock().initialized;

        let mut remote_end = false;
        if !first_load || self.mediator.initialize() == InitializeAction::LaunchInitialRefresh {
            match self.mediator.load(LoadType::Refresh, &state) {
                MediatorResult::Error(err) => return Err(err),
                MediatorResult::Success {
                    end_of_pagination_reached,
                } => remote_end = end_of_pagination_reached,
            }
        }

        let key = self.current_source().refresh_key(&state);
        let plan = [LoadParams::Refresh {
            key,
            load_size: self.config.initial_load_size,
        }];
        let (source, pages) = self.read_window(&plan)?;
        let records = pages.iter().map(Page::len).sum();
        // Only exhausted if the window also holds the last stored record.
        let end_of_pagination_reached =
            remote_end && pages.last().map_or(true, |page| page.next_key.is_none());

        {
            let mut inner = self.inner.lock();
            inner.source = source;
            inner.pages = pages;
            inner.initialized = true;
            inner.load_states.prepend = LoadState::INCOMPLETE;
            inner.load_states.append = if end_of_pagination_reached {
                LoadState::COMPLETE
            } else {
                LoadState::INCOMPLETE
            };
        }

        debug!(?key, records, end_of_pagination_reached, "refreshed window");
        Ok(LoadOutcome::Loaded {
            records,
            end_of_pagination_reached,
        })
    }

    fn run_edge(&self, load_type: LoadType) -> PagingResult<LoadOutcome> {
        for _ in 0..MAX_READ_ATTEMPTS {
            let (source, params) = {
                let inner = self.inner.lock();
                (
                    Arc::clone(&inner.source),
                    inner.edge_params(load_type, self.config.page_size),
                )
            };

            if source.is_invalid() {
                self.reload(LoadType::Refresh)?;
                continue;
            }

            let Some(params) = params else {
                return self.backfill(load_type, &source);
            };

            match source.load(params)? {
                LoadResult::Invalid => {
                    self.reload(LoadType::Refresh)?;
                }
                LoadResult::Page(page) if page.is_empty() => {
                    return self.backfill(load_type, &source);
                }
                LoadResult::Page(page) => {
                    let records = page.len();
                    if self.commit_edge(&source, load_type, page) {
                        debug!(load = %load_type, records, "loaded page from store");
                        return Ok(LoadOutcome::Loaded {
                            records,
                            end_of_pagination_reached: false,
                        });
                    }
                }
            }
        }
        Err(unstable_store())
    }

    fn backfill(
        &self,
        load_type: LoadType,
        source: &PagedSource<S>,
    ) -> PagingResult<LoadOutcome> {
        let state = self.state();
        match self.mediator.load(load_type, &state) {
            MediatorResult::Error(err) => Err(err),
            MediatorResult::Success {
                end_of_pagination_reached,
            } => {
                let records = if source.is_invalid() {
                    self.reload(load_type)?
                } else {
                    0
                };
                if records == 0 && end_of_pagination_reached {
                    Ok(LoadOutcome::EndReached)
                } else {
                    Ok(LoadOutcome::Loaded {
                        records,
                        end_of_pagination_reached,
                    })
                }
            }
        }
    }

    /// Re-reads the loaded window from a fresh source, growing it by one
    /// page in the direction of `trigger`. Returns how many records the
    /// window gained.
    fn reload(&self, trigger: LoadType) -> PagingResult<usize> {
        let (first, loaded) = {
            let inner = self.inner.lock();
            let first = inner.pages.iter().find_map(Page::first);
            (first.map(|record| record.value()), inner.item_count())
        };

        let page_size = self.config.page_size;
        let grow_after = if trigger == LoadType::Append { page_size } else { 0 };
        let load_size = if loaded == 0 {
            self.config.initial_load_size.max(grow_after)
        } else {
            loaded + grow_after
        };

        let mut plan = Vec::with_capacity(2);
        if let (LoadType::Prepend, Some(key)) = (trigger, first) {
            plan.push(LoadParams::Prepend {
                key,
                load_size: page_size,
            });
        }
        plan.push(LoadParams::Refresh {
            key: first,
            load_size,
        });

        let (source, pages) = self.read_window(&plan)?;
        let count: usize = pages.iter().map(Page::len).sum();

        let mut inner = self.inner.lock();
        if inner.source.generation() > source.generation() {
            // A newer window is already in place.
            return Ok(0);
        }
        inner.source = source;
        inner.pages = pages;
        debug!(%trigger, before = loaded, after = count, "reloaded window");
        Ok(count.saturating_sub(loaded))
    }

    fn read_window(&self, plan: &[LoadParams]) -> PagingResult<(Arc<PagedSource<S>>, Vec<Page>)> {
        'attempt: for _ in 0..MAX_READ_ATTEMPTS {
            let source = Arc::new(PagedSource::new(Arc::clone(&self.store)));
            self.sources_created.fetch_add(1, Ordering::Relaxed);

            let mut pages = Vec::with_capacity(plan.len());
            for params in plan {
                match source.load(*params)? {
                    LoadResult::Page(page) => pages.push(page),
                    LoadResult::Invalid => continue 'attempt,
                }
            }

            if pages.len() > 1 {
                pages.retain(|page| !page.is_empty());
                if pages.is_empty() {
                    pages.push(Page::default());
                }
            }
            return Ok((source, pages));
        }
        Err(unstable_store())
    }

    fn commit_edge(&self, source: &Arc<PagedSource<S>>, load_type: LoadType, page: Page) -> bool {
        let mut inner = self.inner.lock();
        if !Arc::ptr_eq(&inner.source, source) {
            return false;
        }
        match load_type {
            LoadType::Prepend => inner.pages.insert(0, page),
            LoadType::Append | LoadType::Refresh => inner.pages.push(page),
        }
        true
    }

    fn set_load_state(&self, load_type: LoadType, state: LoadState) {
        self.inner.lock().load_states.set(load_type, state);
        self.emit();
    }

    fn finish(&self, load_type: LoadType, result: &PagingResult<LoadOutcome>) {
        let state = match result {
            // Refresh exhaustion lands on the append state instead.
            Ok(LoadOutcome::Loaded { .. }) if load_type == LoadType::Refresh => {
                LoadState::INCOMPLETE
            }
            Ok(LoadOutcome::Loaded {
                end_of_pagination_reached,
                ..
            }) => LoadState::NotLoading {
                end_of_pagination_reached: *end_of_pagination_reached,
            },
            Ok(LoadOutcome::EndReached) => LoadState::COMPLETE,
            Ok(LoadOutcome::Coalesced) => return,
            Err(err) => {
                warn!(load = %load_type, error = %err, "load failed");
                LoadState::Error {
                    message: err.to_string(),
                    retryable: err.is_retryable(),
                }
            }
        };
        self.set_load_state(load_type, state);
    }

    fn emit(&self) {
        let snapshot = {
            let mut inner = self.inner.lock();
            inner.version += 1;
            self.snapshot_of(&inner)
        };
        self.subscribers
            .lock()
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    fn snapshot_of(&self, inner: &Inner<S>) -> PagingData {
        PagingData {
            version: inner.version,
            records: inner
                .pages
                .iter()
                .flat_map(|page| page.data.iter().copied())
                .collect(),
            items_before: inner.pages.first().map_or(0, |page| page.items_before),
            items_after: inner.pages.last().map_or(0, |page| page.items_after),
            placeholders_enabled: self.config.enable_placeholders,
            load_states: inner.load_states.clone(),
        }
    }
}

fn unstable_store() -> PagingError {
    PagingError::StoreUnavailable(StorageError::unavailable(
        "store kept changing while the window was read",
    ))
}
