//! Snapshots handed to the rendering side.

use crate::state::LoadType;
use crate::transform::{display_items, UiItem};
use pagefill_storage::Record;
use std::sync::Arc;

/// Progress of loads in one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Idle.
    NotLoading {
        /// Whether nothing more can be loaded in this direction.
        end_of_pagination_reached: bool,
    },
    /// A load is running.
    Loading,
    /// The last load failed.
    Error {
        /// Error message.
        message: String,
        /// Whether [`Pager::retry`](crate::Pager::retry) can succeed.
        retryable: bool,
    },
}

impl LoadState {
    /// Idle with more data possibly available.
    pub const INCOMPLETE: LoadState = LoadState::NotLoading {
        end_of_pagination_reached: false,
    };

    /// Idle with this direction exhausted.
    pub const COMPLETE: LoadState = LoadState::NotLoading {
        end_of_pagination_reached: true,
    };

    /// Returns true if the direction is exhausted.
    pub fn end_of_pagination_reached(&self) -> bool {
        matches!(
            self,
            LoadState::NotLoading {
                end_of_pagination_reached: true
            }
        )
    }

    /// Returns true if the last load failed.
    pub fn is_error(&self) -> bool {
        matches!(self, LoadState::Error { .. })
    }
}

impl Default for LoadState {
    fn default() -> Self {
        LoadState::INCOMPLETE
    }
}

/// Load states for every direction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadStates {
    /// Refresh state.
    pub refresh: LoadState,
    /// Prepend state.
    pub prepend: LoadState,
    /// Append state.
    pub append: LoadState,
}

impl LoadStates {
    /// Returns the state for one direction.
    pub fn get(&self, load_type: LoadType) -> &LoadState {
        match load_type {
            LoadType::Refresh => &self.refresh,
            LoadType::Prepend => &self.prepend,
            LoadType::Append => &self.append,
        }
    }

    /// Sets the state for one direction.
    pub fn set(&mut self, load_type: LoadType, state: LoadState) {
        match load_type {
            LoadType::Refresh => self.refresh = state,
            LoadType::Prepend => self.prepend = state,
            LoadType::Append => self.append = state,
        }
    }
}

/// An immutable view of the loaded window.
///
/// Display items are derived lazily on every call to [`items`](Self::items)
/// or [`slots`](Self::slots); nothing derived is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingData {
    /// Increases with every snapshot the pager emits.
    pub version: u64,
    /// Loaded records, ascending.
    pub records: Arc<[Record]>,
    /// Stored but unloaded records below the window.
    pub items_before: usize,
    /// Stored but unloaded records above the window.
    pub items_after: usize,
    /// Whether [`slots`](Self::slots) exposes placeholders.
    pub placeholders_enabled: bool,
    /// Load states at snapshot time.
    pub load_states: LoadStates,
}

impl PagingData {
    /// An empty snapshot.
    pub fn empty(placeholders_enabled: bool) -> Self {
        Self {
            version: 0,
            records: Arc::from(Vec::new()),
            items_before: 0,
            items_after: 0,
            placeholders_enabled,
            load_states: LoadStates::default(),
        }
    }

    /// Returns the number of loaded records.
    pub fn loaded_count(&self) -> usize {
        self.records.len()
    }

    /// Returns the number of leading placeholder slots.
    pub fn leading_placeholders(&self) -> usize {
        if self.placeholders_enabled {
            self.items_before
        } else {
            0
        }
    }

    /// Returns the number of trailing placeholder slots.
    pub fn trailing_placeholders(&self) -> usize {
        if self.placeholders_enabled {
            self.items_after
        } else {
            0
        }
    }

    /// Returns the display items of the loaded records.
    pub fn items(&self) -> impl Iterator<Item = UiItem> + '_ {
        display_items(self.records.iter().copied())
    }

    /// Returns every display slot: `None` for placeholders, then the loaded
    /// items, then `None` again for trailing placeholders.
    pub fn slots(&self) -> impl Iterator<Item = Option<UiItem>> + '_ {
        std::iter::repeat(None)
            .take(self.leading_placeholders())
            .chain(self.items().map(Some))
            .chain(std::iter::repeat(None).take(self.trailing_placeholders()))
    }

    /// Returns the record-space position of a loaded record, counting
    /// leading placeholders.
    pub fn position_of(&self, loaded_index: usize) -> usize {
        self.leading_placeholders() + loaded_index
    }
}
