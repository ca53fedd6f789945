use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PreferenceError;

/// Key the preference is stored under.
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Icon for the toggle button: the moon offers dark mode, the sun
    /// offers light mode.
    pub fn icon_class(&self) -> &'static str {
        match self {
            Theme::Light => "fas fa-moon",
            Theme::Dark => "fas fa-sun",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(PreferenceError::UnknownTheme(other.to_string())),
        }
    }
}

/// Small JSON key-value file holding the theme preference.
#[derive(Debug, Clone)]
pub struct ThemeStore {
    path: PathBuf,
}

impl ThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored theme, or light when nothing usable is on disk.
    pub fn load(&self) -> Theme {
        match self.read_theme() {
            Ok(Some(theme)) => theme,
            Ok(None) => Theme::default(),
            Err(e) => {
                warn!("Ignoring theme preference in {}: {}", self.path.display(), e);
                Theme::default()
            }
        }
    }

    pub fn save(&self, theme: Theme) -> Result<(), PreferenceError> {
        let mut entries = self.read_entries().unwrap_or_else(|e| {
            warn!("Rewriting unreadable preference file {}: {}", self.path.display(), e);
            Map::new()
        });
        entries.insert(THEME_KEY.to_string(), Value::String(theme.as_str().to_string()));

        let contents = serde_json::to_string_pretty(&entries)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &self.path)?;

        debug!("Saved theme '{}' to {}", theme, self.path.display());
        Ok(())
    }

    /// Flips the stored theme and returns the new one.
    pub fn toggle(&self) -> Result<Theme, PreferenceError> {
        let theme = self.load().toggle();
        self.save(theme)?;
        Ok(theme)
    }

    fn read_theme(&self) -> Result<Option<Theme>, PreferenceError> {
        match self.read_entries()?.get(THEME_KEY) {
            Some(Value::String(value)) => value.parse().map(Some),
            Some(other) => Err(PreferenceError::UnknownTheme(other.to_string())),
            None => Ok(None),
        }
    }

    fn read_entries(&self) -> Result<Map<String, Value>, PreferenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }
}
