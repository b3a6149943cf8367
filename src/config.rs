//! User preferences and the recent-files list.
//!
//! Preferences live in a JSON file in the user config directory and are
//! validated against a schema on load: unknown keys are rejected, missing
//! keys take defaults, out-of-range values name the offending key.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::convert::Quality;
use crate::shapes::Colour;

/// Languages the interface can be displayed in.
pub const LANGUAGES: &[&str] = &[
    "English", "Czech", "Dutch", "French", "Galician", "German", "Italian",
    "Japanese", "Portuguese", "Russian", "Spanish", "Welsh",
];

/// Bound on canvas dimensions accepted from preferences or the CLI.
pub const MAX_CANVAS_DIMENSION: u32 = 12_000;

const MAX_HISTORY_DEPTH: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Preferences {
    /// Default pen colour as a `#rrggbb` string.
    pub colour: String,
    pub language: String,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub quality: Quality,
    pub history_depth: usize,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            colour: "#000000".to_string(),
            language: "English".to_string(),
            canvas_width: 1000,
            canvas_height: 1000,
            quality: Quality::Normal,
            history_depth: 50,
        }
    }
}

impl Preferences {
    /// Read and validate preferences. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read preferences {}", path.display()))?;
        let prefs: Preferences = serde_json::from_str(&content)
            .with_context(|| format!("invalid preferences file {}", path.display()))?;
        prefs.validate()?;
        debug!(path = %path.display(), "loaded preferences");
        Ok(prefs)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("failed to write preferences {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if Colour::from_hex(&self.colour).is_none() {
            bail!("preference `colour` is not a #rrggbb value: {:?}", self.colour);
        }
        if !LANGUAGES.contains(&self.language.as_str()) {
            bail!("preference `language` is not supported: {:?}", self.language);
        }
        validate_canvas_dimension("canvas_width", self.canvas_width)?;
        validate_canvas_dimension("canvas_height", self.canvas_height)?;
        if self.history_depth == 0 || self.history_depth > MAX_HISTORY_DEPTH {
            bail!(
                "preference `history_depth` must be between 1 and {MAX_HISTORY_DEPTH}, got {}",
                self.history_depth
            );
        }
        Ok(())
    }
}

/// Shared with the CLI's `--width`/`--height` overrides.
pub fn validate_canvas_dimension(name: &str, value: u32) -> Result<()> {
    if value == 0 || value > MAX_CANVAS_DIMENSION {
        bail!("`{name}` must be between 1 and {MAX_CANVAS_DIMENSION}, got {value}");
    }
    Ok(())
}

/// Default location of the preferences file, XDG-aware.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("whyteboard")
}

/// Most-recently-used save files, bounded and deduplicated by path.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RecentFiles {
    files: Vec<PathBuf>,
}

impl RecentFiles {
    pub const CAPACITY: usize = 10;

    /// Load from `path`; unreadable or missing state starts empty.
    pub fn load(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("failed to write recent files {}", path.display()))?;
        Ok(())
    }

    /// Record `path` as most recent, moving it to the front if already
    /// present.
    pub fn add(&mut self, path: PathBuf) {
        self.files.retain(|p| p != &path);
        self.files.insert(0, path);
        self.files.truncate(Self::CAPACITY);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
