//! Load directions, pages, and the paging state handed to the mediator.

use crate::config::PagingConfig;
use pagefill_storage::{Key, Record};
use std::fmt;

/// Direction of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadType {
    /// Initial load, or a full reload around the anchor.
    Refresh,
    /// Load toward lower keys.
    Prepend,
    /// Load toward higher keys.
    Append,
}

impl LoadType {
    /// All load types, in table order.
    pub const ALL: [LoadType; 3] = [LoadType::Refresh, LoadType::Prepend, LoadType::Append];

    /// Position of this load type in per-direction tables.
    pub const fn index(self) -> usize {
        match self {
            LoadType::Refresh => 0,
            LoadType::Prepend => 1,
            LoadType::Append => 2,
        }
    }
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadType::Refresh => "refresh",
            LoadType::Prepend => "prepend",
            LoadType::Append => "append",
        };
        f.write_str(name)
    }
}

/// One page of records read from a paged source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    /// Records in ascending order.
    pub data: Vec<Record>,
    /// Key to prepend from, or `None` if nothing is stored below this page.
    pub prev_key: Option<Key>,
    /// Key to append from, or `None` if nothing is stored above this page.
    pub next_key: Option<Key>,
    /// Number of stored records below this page.
    pub items_before: usize,
    /// Number of stored records above this page.
    pub items_after: usize,
}

impl Page {
    /// Returns the lowest record of the page.
    pub fn first(&self) -> Option<Record> {
        self.data.first().copied()
    }

    /// Returns the highest record of the page.
    pub fn last(&self) -> Option<Record> {
        self.data.last().copied()
    }

    /// Returns the number of records in the page.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the page holds no records.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Snapshot of what the consumer has loaded, handed to the mediator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingState {
    /// Loaded pages, lowest keys first.
    pub pages: Vec<Page>,
    /// Most recently accessed position, counting leading placeholders.
    pub anchor_position: Option<usize>,
    /// Active configuration.
    pub config: PagingConfig,
    /// Number of placeholder slots before the first loaded record.
    pub leading_placeholder_count: usize,
}

impl PagingState {
    /// Creates a state with no loaded pages.
    pub fn empty(config: PagingConfig) -> Self {
        Self {
            pages: Vec::new(),
            anchor_position: None,
            config,
            leading_placeholder_count: 0,
        }
    }

    /// Returns true if no records are loaded.
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(Page::is_empty)
    }

    /// Returns the number of loaded records.
    pub fn item_count(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    /// Returns the lowest loaded record.
    pub fn first_item_or_none(&self) -> Option<Record> {
        self.pages.iter().find_map(Page::first)
    }

    /// Returns the highest loaded record.
    pub fn last_item_or_none(&self) -> Option<Record> {
        self.pages.iter().rev().find_map(Page::last)
    }

    /// Returns the loaded record closest to an absolute position.
    pub fn closest_item_to_position(&self, position: usize) -> Option<Record> {
        let count = self.item_count();
        if count == 0 {
            return None;
        }
        let relative = position
            .saturating_sub(self.leading_placeholder_count)
            .min(count - 1);
        self.pages
            .iter()
            .flat_map(|page| page.data.iter())
            .nth(relative)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(values: std::ops::Range<Key>) -> Page {
        Page {
            data: values.map(Record::new).collect(),
            ..Page::default()
        }
    }

    #[test]
    fn load_type_table_order() {
        for (i, load_type) in LoadType::ALL.iter().enumerate() {
            assert_eq!(load_type.index(), i);
        }
        assert_eq!(LoadType::Append.to_string(), "append");
    }

    #[test]
    fn empty_state() {
        let state = PagingState::empty(PagingConfig::default());
        assert!(state.is_empty());
        assert_eq!(state.first_item_or_none(), None);
        assert_eq!(state.last_item_or_none(), None);
        assert_eq!(state.closest_item_to_position(3), None);
    }

    #[test]
    fn first_and_last_skip_empty_pages() {
        let mut state = PagingState::empty(PagingConfig::default());
        state.pages = vec![page(0..0), page(0..10), page(10..20), page(0..0)];

        assert_eq!(state.first_item_or_none(), Some(Record::new(0)));
        assert_eq!(state.last_item_or_none(), Some(Record::new(19)));
        assert_eq!(state.item_count(), 20);
    }

    #[test]
    fn closest_item_clamps_and_skips_placeholders() {
        let mut state = PagingState::empty(PagingConfig::default());
        state.pages = vec![page(100..110)];
        state.leading_placeholder_count = 5;

        assert_eq!(state.closest_item_to_position(0), Some(Record::new(100)));
        assert_eq!(state.closest_item_to_position(7), Some(Record::new(102)));
        assert_eq!(state.closest_item_to_position(500), Some(Record::new(109)));
    }
}
