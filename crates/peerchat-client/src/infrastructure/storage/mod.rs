//! Persistence of user preferences.

pub mod preferences;

pub use preferences::{PreferenceStore, Preferences, PreferencesError};
