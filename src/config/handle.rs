//! Shared config with atomic replacement.
//!
//! Uses `arc-swap` for lock-free reads. The supervisor loads the current
//! value once per tick; any thread holding a clone of the handle may replace
//! it in between.

use std::hash::Hasher;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use arc_swap::ArcSwap;
use rustc_hash::FxHasher;

use super::{Config, ConfigError};

#[derive(Debug, Default)]
struct Shared {
    current: ArcSwap<Config>,
    /// Hash of the config file content last applied by `reload_from`.
    file_hash: AtomicU64,
}

/// Cloneable handle to the live [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle(Arc<Shared>);

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        Self(Arc::new(Shared {
            current: ArcSwap::from_pointee(config),
            file_hash: AtomicU64::new(0),
        }))
    }

    #[inline]
    pub fn load(&self) -> Arc<Config> {
        self.0.current.load_full()
    }

    pub fn store(&self, config: Config) {
        self.0.current.store(Arc::new(config));
    }

    /// Replace the config with a modified copy of the current one.
    pub fn update(&self, f: impl FnOnce(&mut Config)) {
        let mut config = (*self.load()).clone();
        f(&mut config);
        self.store(config);
    }

    /// Reload from a TOML file if its content changed.
    ///
    /// Returns `Ok(true)` if the config was replaced, `Ok(false)` if the file
    /// is unchanged. The installed error callback is carried over since it
    /// cannot come from a file.
    pub fn reload_from(&self, path: &Path) -> Result<bool> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let new_hash = hash(content.as_bytes());
        if new_hash == self.0.file_hash.load(Ordering::Relaxed) {
            return Ok(false);
        }

        let mut config = Config::parse(&content, path)?;
        config.error_callback = self.load().error_callback.clone();
        self.store(config);
        self.0.file_hash.store(new_hash, Ordering::Relaxed);
        Ok(true)
    }
}

fn hash(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ErrorCallback;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_store_and_update() {
        let handle = ConfigHandle::new(Config::default());
        assert!(handle.load().log_reloads);

        handle.update(|c| c.log_reloads = false);
        assert!(!handle.load().log_reloads);

        let other = handle.clone();
        other.store(Config {
            reset_on_reload: true,
            ..Config::default()
        });
        assert!(handle.load().reset_on_reload);
    }

    #[test]
    fn test_earlier_snapshot_is_unaffected() {
        let handle = ConfigHandle::new(Config::default());
        let snapshot = handle.load();
        handle.update(|c| c.track_assets = false);
        assert!(snapshot.track_assets);
        assert!(!handle.load().track_assets);
    }

    #[test]
    fn test_reload_from_only_on_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hotloop.toml");
        fs::write(&path, "reset_on_reload = true\n").unwrap();

        let handle = ConfigHandle::default();
        assert!(handle.reload_from(&path).unwrap());
        assert!(handle.load().reset_on_reload);
        assert!(!handle.reload_from(&path).unwrap());

        fs::write(&path, "reset_on_reload = false\n").unwrap();
        assert!(handle.reload_from(&path).unwrap());
        assert!(!handle.load().reset_on_reload);
    }

    #[test]
    fn test_reload_keeps_error_callback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hotloop.toml");
        fs::write(&path, "log_reloads = false\n").unwrap();

        let handle = ConfigHandle::default();
        handle.update(|c| c.error_callback = Some(ErrorCallback::new(|s| s.to_uppercase())));
        handle.reload_from(&path).unwrap();

        let config = handle.load();
        assert!(!config.log_reloads);
        let callback = config.error_callback.as_ref().unwrap();
        assert_eq!(callback.call("boom"), "BOOM");
    }

    #[test]
    fn test_reload_invalid_keeps_current() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hotloop.toml");
        fs::write(&path, "log_reloads = [").unwrap();

        let handle = ConfigHandle::default();
        assert!(handle.reload_from(&path).is_err());
        assert!(handle.load().log_reloads);
    }
}
