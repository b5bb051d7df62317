//! On-disk shell configuration and address resolution.
//!
//! # Format
//!
//! ```json
//! { "userDataPath": "profiles/main" }
//! ```
//!
//! `userDataPath` is `"default"` (renderer picks its own storage root), an
//! absolute path, or a path relative to the application directory.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// File name looked up in the application directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// `userDataPath` value that keeps the renderer default.
pub const DEFAULT_USER_DATA: &str = "default";

// ============================================================================
// ShellConfig
// ============================================================================

/// Contents of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellConfig {
    /// Renderer storage root.
    #[serde(default = "default_user_data")]
    pub user_data_path: String,
}

fn default_user_data() -> String {
    DEFAULT_USER_DATA.to_string()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            user_data_path: default_user_data(),
        }
    }
}

impl ShellConfig {
    /// Reads the configuration file.
    ///
    /// A missing file yields defaults silently. An unreadable or malformed
    /// file is logged and also yields defaults.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let parsed = fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|raw| serde_json::from_str(&raw).map_err(Error::from));

        match parsed {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Config read error, using defaults");
                Self::default()
            }
        }
    }

    /// Resolves and creates the storage root.
    ///
    /// Returns `None` when the renderer default applies.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the directory cannot be created.
    pub fn resolve_user_data_dir(&self, app_dir: &Path) -> Result<Option<PathBuf>> {
        let raw = self.user_data_path.trim();
        if raw.is_empty() || raw == DEFAULT_USER_DATA {
            info!("Using default user data path");
            return Ok(None);
        }

        let path = Path::new(raw);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            app_dir.join(path)
        };

        if !resolved.exists() {
            fs::create_dir_all(&resolved)?;
        }

        info!(path = %resolved.display(), "Applied user data path");
        Ok(Some(resolved))
    }
}

// ============================================================================
// Address Resolution
// ============================================================================

/// Turns a URL or a file path into a loadable address.
///
/// Absolute URLs pass through. Anything else is a file path, resolved
/// against `base_dir` when relative.
///
/// # Errors
///
/// [`Error::Config`] if the path cannot be expressed as a `file://` URL.
pub fn resolve_address(address: &str, base_dir: &Path) -> Result<String> {
    if let Ok(url) = Url::parse(address) {
        return Ok(url.to_string());
    }

    let path = Path::new(address);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };

    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| Error::config(format!("Cannot resolve address: {}", absolute.display())))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn test_missing_file_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = ShellConfig::load(&dir.path().join(CONFIG_FILE_NAME));
        assert_eq!(config, ShellConfig::default());
        assert_eq!(config.user_data_path, "default");
    }

    #[test]
    fn test_malformed_file_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{ not json").expect("write");
        assert_eq!(ShellConfig::load(&path), ShellConfig::default());
    }

    #[test]
    fn test_reads_user_data_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{ "userDataPath": "profiles/main" }"#).expect("write");
        assert_eq!(ShellConfig::load(&path).user_data_path, "profiles/main");

        fs::write(&path, "{}").expect("write");
        assert_eq!(ShellConfig::load(&path).user_data_path, "default");
    }

    #[test]
    fn test_default_user_data_resolves_to_none() {
        let dir = tempdir().expect("tempdir");
        let resolved = ShellConfig::default()
            .resolve_user_data_dir(dir.path())
            .expect("resolve");
        assert!(resolved.is_none());
    }

    #[test]
    fn test_relative_user_data_created_under_app_dir() {
        let dir = tempdir().expect("tempdir");
        let config = ShellConfig {
            user_data_path: "profiles/main".to_string(),
        };

        let resolved = config
            .resolve_user_data_dir(dir.path())
            .expect("resolve")
            .expect("custom path");
        assert_eq!(resolved, dir.path().join("profiles/main"));
        assert!(resolved.is_dir());
    }

    #[test]
    fn test_absolute_user_data_kept() {
        let dir = tempdir().expect("tempdir");
        let target = dir.path().join("abs");
        let config = ShellConfig {
            user_data_path: target.to_string_lossy().into_owned(),
        };

        let resolved = config
            .resolve_user_data_dir(Path::new("/nonexistent-app-dir"))
            .expect("resolve");
        assert_eq!(resolved, Some(target.clone()));
        assert!(target.is_dir());
    }

    #[test]
    fn test_resolve_address() {
        assert_eq!(
            resolve_address("https://example.com/a", Path::new("/app")).expect("url"),
            "https://example.com/a"
        );
        assert_eq!(
            resolve_address("about:blank", Path::new("/app")).expect("blank"),
            "about:blank"
        );
        assert_eq!(
            resolve_address("src/select.html", Path::new("/app")).expect("file"),
            "file:///app/src/select.html"
        );
    }
}
