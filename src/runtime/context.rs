use std::time::Duration;

use anyhow::{Context as _, Result};

use crate::config::Config;
use crate::host::{ResourceStore, Surface};
use crate::unit::{Chunk, Modules, UnitLoader, unit_marker};
use crate::watch::{AssetTracker, Callback, ChangeTracker};

/// What an [`App`](super::App) hook can reach while it runs.
pub struct Context<'a> {
    pub(super) surface: &'a mut dyn Surface,
    pub(super) modules: &'a mut Modules,
    pub(super) store: &'a dyn ResourceStore,
    pub(super) loader: &'a mut dyn UnitLoader,
    pub(super) tracker: &'a mut ChangeTracker,
    pub(super) assets: &'a mut AssetTracker,
    pub(super) config: &'a Config,
    pub(super) args: &'a [String],
    pub(super) now: Duration,
}

impl Context<'_> {
    /// Load a code unit and start watching it.
    ///
    /// A unit is executed once; later calls are no-ops until the file
    /// changes and the supervisor reloads it.
    pub fn require(&mut self, name: &str) -> Result<()> {
        if self.modules.is_loaded(name) {
            return Ok(());
        }
        if !self.tracker.is_tracked(name) {
            self.tracker.observe(self.store, name);
        }

        let chunk = acquire(self.store, &mut *self.loader, name)?;
        chunk.execute(&mut *self.modules)?;
        self.modules.mark_loaded(name);
        Ok(())
    }

    /// Call `callback` whenever `name` changes.
    ///
    /// With a non-zero `delay` the callback runs once the file has been quiet
    /// for that long. Passing `None` as callback stops tracking.
    pub fn track_file(&mut self, name: &str, callback: Option<Callback>, delay: Option<Duration>) {
        self.assets.register(self.store, name, callback, delay);
    }

    pub fn untrack_file(&mut self, name: &str) {
        self.assets.register(self.store, name, None, None);
    }

    pub fn modules(&self) -> &Modules {
        &*self.modules
    }

    pub fn modules_mut(&mut self) -> &mut Modules {
        &mut *self.modules
    }

    pub fn surface(&mut self) -> &mut dyn Surface {
        &mut *self.surface
    }

    pub fn store(&self) -> &dyn ResourceStore {
        self.store
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    /// Arguments forwarded from the host at startup.
    pub fn args(&self) -> &[String] {
        self.args
    }

    /// Clock time of the current tick.
    pub fn now(&self) -> Duration {
        self.now
    }
}

/// Read a unit's source and hand it to the loader.
///
/// Errors carry the unit marker so reports name the unit.
pub(super) fn acquire(
    store: &dyn ResourceStore,
    loader: &mut dyn UnitLoader,
    name: &str,
) -> Result<Chunk> {
    let source = store.read(name).with_context(|| unit_marker(name))?;
    loader
        .acquire(name, &source)
        .with_context(|| unit_marker(name))
}
