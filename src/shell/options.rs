//! Shell behaviour options.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tab_shell::ShellOptions;
//!
//! let options = ShellOptions::new()
//!     .with_home_address("https://example.com/")
//!     .with_load_timeout(Duration::from_secs(20));
//!
//! assert!(options.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::tabs::Insets;
use crate::view::BLANK_ADDRESS;

// ============================================================================
// Constants
// ============================================================================

/// Window title shown while no tab is open.
pub const DEFAULT_WINDOW_TITLE: &str = "Tab Shell";

// ============================================================================
// ShellOptions
// ============================================================================

/// Options shared by every tab the shell creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOptions {
    /// Address opened by "New Tab" and at startup.
    pub home_address: String,

    /// Chrome region excluded from the content area.
    pub chrome_insets: Insets,

    /// Deadline for a tab's initial load.
    ///
    /// `None` waits forever: a load that never settles never registers.
    pub load_timeout: Option<Duration>,

    /// Window title while no tab is open.
    pub window_title: String,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ShellOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            home_address: BLANK_ADDRESS.to_string(),
            chrome_insets: Insets::NONE,
            load_timeout: None,
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ShellOptions {
    /// Sets the home address.
    #[inline]
    #[must_use]
    pub fn with_home_address(mut self, address: impl Into<String>) -> Self {
        self.home_address = address.into();
        self
    }

    /// Sets the chrome insets.
    #[inline]
    #[must_use]
    pub fn with_chrome_insets(mut self, insets: Insets) -> Self {
        self.chrome_insets = insets;
        self
    }

    /// Bounds every initial load.
    #[inline]
    #[must_use]
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Sets the empty-window title.
    #[inline]
    #[must_use]
    pub fn with_window_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = title.into();
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ShellOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an empty home address or a zero load timeout.
    pub fn validate(&self) -> Result<()> {
        if self.home_address.trim().is_empty() {
            return Err(Error::config("Home address must not be empty"));
        }
        if self.load_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("Load timeout must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults() {
        let options = ShellOptions::new();
        assert_eq!(options.home_address, "about:blank");
        assert_eq!(options.chrome_insets, Insets::NONE);
        assert!(options.load_timeout.is_none());
        assert_eq!(options.window_title, DEFAULT_WINDOW_TITLE);
        assert_eq!(options, ShellOptions::default());
    }

    #[test]
    fn test_builder_chain() {
        let options = ShellOptions::new()
            .with_home_address("https://start.test/")
            .with_chrome_insets(Insets::top(32))
            .with_load_timeout(Duration::from_secs(5))
            .with_window_title("Browser");

        assert_eq!(options.home_address, "https://start.test/");
        assert_eq!(options.chrome_insets.top, 32);
        assert_eq!(options.load_timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.window_title, "Browser");
    }

    #[test]
    fn test_validate() {
        assert_ok!(ShellOptions::new().validate());
        assert_err!(ShellOptions::new().with_home_address(" ").validate());

        let err = assert_err!(
            ShellOptions::new()
                .with_load_timeout(Duration::ZERO)
                .validate()
        );
        assert!(matches!(err, Error::Config { .. }));
    }
}
