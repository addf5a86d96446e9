//! TOML persistence of the user's display preferences.
//!
//! The only persisted value is the colour theme, stored in
//! `preferences.toml` under the platform config directory:
//! - Windows:  `%APPDATA%\peerchat\preferences.toml`
//! - Linux:    `$XDG_CONFIG_HOME/peerchat/preferences.toml` (or `~/.config/peerchat`)
//! - macOS:    `~/Library/Application Support/peerchat/preferences.toml`
//!
//! ```toml
//! theme = "dark"
//! ```
//!
//! A missing file, or a file without `theme`, yields the light theme.

use std::path::{Path, PathBuf};

use peerchat_core::ThemePreference;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name inside the config directory.
pub const PREFERENCES_FILE: &str = "preferences.toml";

/// Error type for preference file operations.
#[derive(Debug, Error)]
pub enum PreferencesError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing preferences at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse preferences TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize preferences: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Everything stored on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: ThemePreference,
}

/// Reads and writes [`Preferences`] in one directory.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    dir: PathBuf,
}

impl PreferenceStore {
    /// A store in the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns [`PreferencesError::NoPlatformConfigDir`] when the base
    /// directory cannot be determined from the environment.
    pub fn platform() -> Result<Self, PreferencesError> {
        platform_config_dir()
            .map(Self::in_dir)
            .ok_or(PreferencesError::NoPlatformConfigDir)
    }

    /// A store rooted at `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(PREFERENCES_FILE)
    }

    /// Loads the preferences, or the defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PreferencesError::Io`] for file-system errors other than
    /// "not found", and [`PreferencesError::Parse`] for malformed TOML.
    pub fn load(&self) -> Result<Preferences, PreferencesError> {
        let path = self.path();
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(source) => Err(PreferencesError::Io { path, source }),
        }
    }

    /// Writes `prefs`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PreferencesError::Io`] for file-system failures.
    pub fn save(&self, prefs: &Preferences) -> Result<(), PreferencesError> {
        create_dir(&self.dir)?;
        let path = self.path();
        let content = toml::to_string_pretty(prefs)?;
        std::fs::write(&path, content).map_err(|source| PreferencesError::Io { path, source })
    }

    /// Loads, replaces the theme, and saves.
    ///
    /// # Errors
    ///
    /// See [`PreferenceStore::load`] and [`PreferenceStore::save`].
    pub fn set_theme(&self, theme: ThemePreference) -> Result<(), PreferencesError> {
        let mut prefs = self.load()?;
        prefs.theme = theme;
        self.save(&prefs)
    }
}

fn create_dir(dir: &Path) -> Result<(), PreferencesError> {
    std::fs::create_dir_all(dir).map_err(|source| PreferencesError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Resolves `<platform config base>/peerchat`.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("peerchat"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("peerchat"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("peerchat")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
