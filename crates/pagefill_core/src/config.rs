//! Paging configuration.

use crate::error::{PagingError, PagingResult};

/// Configuration shared by the pager, the paged source and the mediator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    /// Number of records loaded per append or prepend.
    pub page_size: usize,

    /// Number of records loaded by a refresh.
    pub initial_load_size: usize,

    /// How close to a loaded edge an access must be to trigger a load.
    pub prefetch_distance: usize,

    /// Whether snapshots expose unloaded records as placeholder slots.
    pub enable_placeholders: bool,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            initial_load_size: 20,
            prefetch_distance: 5,
            enable_placeholders: true,
        }
    }
}

impl PagingConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size.
    #[must_use]
    pub const fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the initial load size.
    #[must_use]
    pub const fn initial_load_size(mut self, size: usize) -> Self {
        self.initial_load_size = size;
        self
    }

    /// Sets the prefetch distance.
    #[must_use]
    pub const fn prefetch_distance(mut self, distance: usize) -> Self {
        self.prefetch_distance = distance;
        self
    }

    /// Sets whether placeholders are enabled.
    #[must_use]
    pub const fn enable_placeholders(mut self, value: bool) -> Self {
        self.enable_placeholders = value;
        self
    }

    /// Checks that the configuration can drive paging at all.
    ///
    /// # Errors
    ///
    /// Returns [`PagingError::InvalidConfig`] if a size is zero, or if
    /// neither prefetch nor placeholders can ever trigger a load.
    pub fn validate(&self) -> PagingResult<()> {
        if self.page_size == 0 {
            return Err(PagingError::invalid_config("page size must be positive"));
        }
        if self.initial_load_size == 0 {
            return Err(PagingError::invalid_config(
                "initial load size must be positive",
            ));
        }
        if self.prefetch_distance == 0 && !self.enable_placeholders {
            return Err(PagingError::invalid_config(
                "placeholders must be enabled when prefetch distance is zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PagingConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.initial_load_size, 20);
        assert_eq!(config.prefetch_distance, 5);
        assert!(config.enable_placeholders);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = PagingConfig::new()
            .page_size(25)
            .initial_load_size(50)
            .prefetch_distance(3)
            .enable_placeholders(false);

        assert_eq!(config.page_size, 25);
        assert_eq!(config.initial_load_size, 50);
        assert_eq!(config.prefetch_distance, 3);
        assert!(!config.enable_placeholders);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let result = PagingConfig::new().page_size(0).validate();
        assert!(matches!(result, Err(PagingError::InvalidConfig { .. })));
    }

    #[test]
    fn zero_prefetch_requires_placeholders() {
        let config = PagingConfig::new().prefetch_distance(0);
        assert!(config.validate().is_ok());

        let config = config.enable_placeholders(false);
        assert!(config.validate().is_err());
    }
}
