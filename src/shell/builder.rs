//! Builder pattern for shell configuration.
//!
//! # Example
//!
//! ```no_run
//! use tab_shell::Shell;
//!
//! # async fn example() -> tab_shell::Result<()> {
//! let shell = Shell::builder()
//!     .config_file("./config.json")
//!     .home_address("src/select.html")
//!     .port(9400)
//!     .bind()
//!     .await?;
//!
//! println!("renderer host should connect to {}", shell.ws_url());
//! shell.run().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::{DEFAULT_ACCEPT_TIMEOUT, PendingServer};

use super::config::{CONFIG_FILE_NAME, ShellConfig, resolve_address};
use super::core::Shell;
use super::options::ShellOptions;

// ============================================================================
// ShellBuilder
// ============================================================================

/// Builder for a [`Shell`].
///
/// Use [`Shell::builder()`] to create one.
#[derive(Debug, Clone)]
pub struct ShellBuilder {
    /// Directory relative paths resolve against.
    app_dir: Option<PathBuf>,
    /// Explicit config file. Defaults to `config.json` in the app directory.
    config_file: Option<PathBuf>,
    /// Tab options.
    options: ShellOptions,
    /// Listener address.
    bind_address: IpAddr,
    /// Listener port, `0` for any.
    port: u16,
    /// Time allowed for the host to connect.
    accept_timeout: Duration,
}

impl Default for ShellBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// ShellBuilder Implementation
// ============================================================================

impl ShellBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            app_dir: None,
            config_file: None,
            options: ShellOptions::new(),
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
        }
    }

    /// Sets the application directory.
    #[inline]
    #[must_use]
    pub fn app_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.app_dir = Some(path.into());
        self
    }

    /// Sets the configuration file.
    ///
    /// Its parent directory becomes the application directory unless one
    /// was set explicitly.
    #[inline]
    #[must_use]
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Replaces all tab options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ShellOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the home address. URLs and file paths are both accepted.
    #[inline]
    #[must_use]
    pub fn home_address(mut self, address: impl Into<String>) -> Self {
        self.options.home_address = address.into();
        self
    }

    /// Bounds every initial load.
    #[inline]
    #[must_use]
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.options.load_timeout = Some(timeout);
        self
    }

    /// Sets the listener address.
    #[inline]
    #[must_use]
    pub fn bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    /// Sets the listener port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets how long the shell waits for the host.
    #[inline]
    #[must_use]
    pub fn accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }

    /// Validates the configuration and binds the listener.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for invalid options or an unresolvable home address
    /// - [`Error::Io`] if the application directory cannot be determined,
    ///   the storage root cannot be created, or binding fails
    pub async fn bind(self) -> Result<Shell> {
        self.options.validate()?;
        if self.accept_timeout.is_zero() {
            return Err(Error::config("Accept timeout must be greater than zero"));
        }

        let app_dir = self.resolve_app_dir()?;
        let config_path = self
            .config_file
            .clone()
            .unwrap_or_else(|| app_dir.join(CONFIG_FILE_NAME));
        let config = ShellConfig::load(&config_path);
        let user_data_dir = config.resolve_user_data_dir(&app_dir)?;

        let mut options = self.options;
        options.home_address = resolve_address(&options.home_address, &app_dir)?;
        debug!(home = %options.home_address, app_dir = %app_dir.display(), "Shell configured");

        let server = PendingServer::bind(self.bind_address, self.port)
            .await?
            .with_accept_timeout(self.accept_timeout);

        Ok(Shell::new(server, options, user_data_dir))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ShellBuilder {
    fn resolve_app_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.app_dir {
            return Ok(dir.clone());
        }
        if let Some(parent) = self
            .config_file
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
        {
            return Ok(parent.to_path_buf());
        }
        Ok(std::env::current_dir()?)
    }
}

// ============================================================================
// Tests
// ============================================================================
