//! # PageFill Core
//!
//! Paged loading engine for PageFill.
//!
//! This crate provides:
//! - [`PagedSource`] - Pages over a [`RecordStore`](pagefill_storage::RecordStore),
//!   invalidated by any write
//! - [`BackfillMediator`] - Fills the store from a [`WindowFetcher`] when
//!   local data runs out
//! - [`Pager`] - Drives refresh, append and prepend loads with per-direction
//!   single-flight and retry
//! - [`InsertSeparators`] - Lazily interleaves separators into the item stream
//!
//! ## Data Flow
//!
//! ```text
//! WindowFetcher -> BackfillMediator -> RecordStore -> PagedSource -> Pager
//!                                                                      |
//!                                   rendering <- InsertSeparators <- PagingData
//! ```
//!
//! ## Example
//!
//! ```rust
//! use pagefill_core::{BackfillMediator, PagingConfig, Pager, SyntheticFetcher, UiItem};
//! use pagefill_storage::InMemoryRecordStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryRecordStore::new());
//! let fetcher = SyntheticFetcher::new().with_limit(25);
//! let mediator = BackfillMediator::new(Arc::clone(&store), fetcher);
//! let pager = Pager::new(PagingConfig::default(), store, mediator).unwrap();
//!
//! pager.refresh().unwrap();
//! let items: Vec<UiItem> = pager.snapshot().items().take(12).collect();
//! assert_eq!(items[10], UiItem::separator("0x"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod data;
mod error;
mod fetcher;
mod mediator;
mod pager;
mod single_flight;
mod source;
mod state;
mod transform;

pub use config::PagingConfig;
pub use data::{LoadState, LoadStates, PagingData};
pub use error::{PagingError, PagingResult};
pub use fetcher::{KeyRange, MockFetcher, SyntheticFetcher, WindowFetcher};
pub use mediator::{
    plan, BackfillMediator, BackfillPlan, BackfillStats, InitializeAction, MediatorResult,
    RemoteMediator,
};
pub use pager::{LoadOutcome, Pager};
pub use single_flight::{FlightGuard, SingleFlight};
pub use source::{LoadParams, LoadResult, PagedSource};
pub use state::{LoadType, Page, PagingState};
pub use transform::{
    decade_separator, display_items, slot_key, InsertSeparators, ItemKey, SeparatorExt, UiItem,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
