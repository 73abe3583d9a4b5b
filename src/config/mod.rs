//! Supervisor configuration.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error      # ConfigError
//! ├── handle     # ConfigHandle (arc-swap)
//! ├── util       # config file discovery
//! └── mod.rs     # Config (this file)
//! ```
//!
//! Every field is optional in `hotloop.toml`:
//!
//! ```toml
//! reset_on_reload = false
//! log_reloads = true
//! reload_on_keypress = true
//! reload_key = "f5"
//! show_error_on_screen = true
//! track_assets = true
//! autoflush_output = true
//! frame_pause_ms = 1
//! error_font_size = 14.0
//! verbose = false
//! ```
//!
//! The error callback can only be installed from code.

mod error;
mod handle;
mod util;

pub use error::ConfigError;
pub use handle::ConfigHandle;
pub use util::find_config_file;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::host::Key;
use crate::log;

/// Default config file name searched by [`Config::discover`].
pub const CONFIG_FILE: &str = "hotloop.toml";

// ============================================================================
// ErrorCallback
// ============================================================================

/// Rewrites a fault report before it is logged and displayed.
#[derive(Clone)]
pub struct ErrorCallback(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl ErrorCallback {
    pub fn new(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, report: &str) -> String {
        (self.0)(report)
    }
}

impl fmt::Debug for ErrorCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorCallback(..)")
    }
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Run the reset hook after any reload instead of the live-reload hook.
    pub reset_on_reload: bool,

    /// Write `updated file <name>` for every reloaded code unit.
    pub log_reloads: bool,

    /// Whether `reload_key` triggers a manual reset.
    pub reload_on_keypress: bool,

    pub reload_key: Key,

    /// Render the fault message in place of the application while faulted.
    pub show_error_on_screen: bool,

    /// Detect changes of tracked assets.
    pub track_assets: bool,

    /// Flush the diagnostic stream after every line.
    pub autoflush_output: bool,

    #[serde(skip)]
    pub error_callback: Option<ErrorCallback>,

    /// End-of-tick pause in milliseconds.
    pub frame_pause_ms: u64,

    /// Fault placeholder font size, before surface scaling.
    pub error_font_size: f32,

    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reset_on_reload: false,
            log_reloads: true,
            reload_on_keypress: true,
            reload_key: Key::default(),
            show_error_on_screen: true,
            track_assets: true,
            autoflush_output: true,
            error_callback: None,
            frame_pause_ms: 1,
            error_font_size: 14.0,
            verbose: false,
        }
    }
}

impl Config {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, expanding a leading `~`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand(path.as_ref());
        let content =
            std::fs::read_to_string(&path).map_err(|err| ConfigError::Io(path.clone(), err))?;
        Self::parse(&content, &path)
    }

    /// Search upward from the working directory for `hotloop.toml`.
    ///
    /// Returns the default config if none is found.
    pub fn discover() -> Result<Self> {
        match find_config_file(Path::new(CONFIG_FILE)) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate, warning about unknown fields.
    pub(crate) fn parse(content: &str, path: &Path) -> Result<Self> {
        let (config, ignored) = Self::parse_with_ignored(content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::from)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    pub fn validate(&self) -> Result<()> {
        if self.reload_key.as_str().is_empty() {
            return Err(ConfigError::Validation("`reload_key` must not be empty".into()).into());
        }
        if !(self.error_font_size.is_finite() && self.error_font_size > 0.0) {
            return Err(ConfigError::Validation(format!(
                "`error_font_size` must be a positive number, got {}",
                self.error_font_size
            ))
            .into());
        }
        Ok(())
    }

    pub fn frame_pause(&self) -> Duration {
        Duration::from_millis(self.frame_pause_ms)
    }
}

fn expand(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

// ============================================================================
// tests
// ============================================================================
