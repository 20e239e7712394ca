//! # PageFill Testkit
//!
//! Test utilities for PageFill.
//!
//! This crate provides:
//! - Test fixtures: pagers over in-memory and temporary file stores
//! - Scripted fetchers that fail on demand
//! - Property-based test generators using proptest
//! - Concurrent load stress helpers
//!
//! Cross-crate integration tests live under `tests/`.
//!
//! ## Usage
//!
//! ```rust
//! use pagefill_testkit::prelude::*;
//!
//! let pager = TestPager::new();
//! pager.refresh().unwrap();
//! pager.scroll_to(57).unwrap();
//! assert!(pager.loaded_values().contains(&57));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
