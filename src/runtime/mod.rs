//! The frame loop.
//!
//! ```text
//! tick:
//!   events ──▶ clock.step ──▶ reload units ──▶ assets (changed, then due)
//!      ──▶ reset | live_reload ──▶ update ──▶ clear/draw ──▶ present ──▶ pause
//! ```
//!
//! Reload detection runs every tick regardless of fault state. A fault skips
//! `update` and replaces `draw` with the fault message until a code unit is
//! reloaded or the reload key is pressed.

mod app;
mod context;


pub use app::App;
pub use context::Context;

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::Result;
use thiserror::Error;

use crate::config::{Config, ConfigHandle};
use crate::fault::{Fault, FaultState};
use crate::host::{
    Clock, DiskStore, Event, EventPump, Headless, NoEvents, ResourceStore, Surface, SystemClock,
    get_mtime,
};
use crate::logger::{self, Output};
use crate::trap::protect;
use crate::unit::{Modules, NoLoader, UnitLoader};
use crate::watch::{AssetTracker, ChangeTracker};

/// Fault placeholder position, before surface scaling.
const FAULT_MARGIN: f32 = 10.0;

/// Whether the loop should keep going after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Errors raised while building a [`Supervisor`].
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to watch `{0}`")]
    Watch(PathBuf, #[source] notify::Error),

    #[error(transparent)]
    Config(#[from] anyhow::Error),
}

// ============================================================================
// Builder
// ============================================================================

/// Installation step: pick the host collaborators, then [`build`](Self::build).
#[derive(Default)]
pub struct SupervisorBuilder {
    store: Option<Box<dyn ResourceStore>>,
    root: Option<PathBuf>,
    watch_root: bool,
    clock: Option<Box<dyn Clock>>,
    events: Option<Box<dyn EventPump>>,
    surface: Option<Box<dyn Surface>>,
    loader: Option<Box<dyn UnitLoader>>,
    entry: Option<String>,
    config: Option<ConfigHandle>,
    config_path: Option<PathBuf>,
    output: Option<Output>,
    args: Vec<String>,
}

impl SupervisorBuilder {
    pub fn store(mut self, store: impl ResourceStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Serve resources from a directory (used when no store is given).
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Cache modification times of `root` and invalidate them from file
    /// system notifications.
    pub fn watch_root(mut self, watch: bool) -> Self {
        self.watch_root = watch;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn events(mut self, events: impl EventPump + 'static) -> Self {
        self.events = Some(Box::new(events));
        self
    }

    pub fn surface(mut self, surface: impl Surface + 'static) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    pub fn loader(mut self, loader: impl UnitLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// The entry unit: watched from the start and loaded before [`App::load`].
    pub fn entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(ConfigHandle::new(config));
        self
    }

    /// Share a handle so the config can be changed while the loop runs.
    pub fn config_handle(mut self, handle: ConfigHandle) -> Self {
        self.config = Some(handle);
        self
    }

    /// Load the config from a TOML file and reload it whenever it changes.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn output(mut self, output: Output) -> Self {
        self.output = Some(output);
        self
    }

    /// Arguments available to hooks through [`Context::args`].
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<Supervisor, SetupError> {
        let store: Box<dyn ResourceStore> = match self.store {
            Some(store) => store,
            None => {
                let root = self.root.unwrap_or_else(|| PathBuf::from("."));
                if self.watch_root {
                    let store = DiskStore::watched(&root).map_err(|e| SetupError::Watch(root, e))?;
                    Box::new(store)
                } else {
                    Box::new(DiskStore::new(root))
                }
            }
        };

        let config = self.config.unwrap_or_default();
        let mut config_mtime = None;
        if let Some(path) = &self.config_path {
            config.reload_from(path)?;
            config_mtime = get_mtime(path);
        }

        let mut output = self.output.unwrap_or_default();
        output.set_autoflush(config.load().autoflush_output);

        Ok(Supervisor {
            store,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock::new())),
            events: self.events.unwrap_or_else(|| Box::new(NoEvents)),
            surface: self.surface.unwrap_or_else(|| Box::new(Headless)),
            loader: self.loader.unwrap_or_else(|| Box::new(NoLoader)),
            config,
            config_path: self.config_path,
            config_mtime,
            output,
            entry: self.entry,
            args: self.args,
            modules: Modules::new(),
            tracker: ChangeTracker::new(),
            assets: AssetTracker::new(),
            fault: FaultState::default(),
        })
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Owns the host collaborators and all reload state, and drives the frame loop.
pub struct Supervisor {
    store: Box<dyn ResourceStore>,
    clock: Box<dyn Clock>,
    events: Box<dyn EventPump>,
    surface: Box<dyn Surface>,
    loader: Box<dyn UnitLoader>,
    config: ConfigHandle,
    config_path: Option<PathBuf>,
    config_mtime: Option<SystemTime>,
    output: Output,
    entry: Option<String>,
    args: Vec<String>,
    modules: Modules,
    tracker: ChangeTracker,
    assets: AssetTracker,
    fault: FaultState,
}

impl Supervisor {
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::default()
    }

    /// Startup, ticks until quit, then teardown.
    pub fn run<A: App>(&mut self, app: &mut A) {
        self.start(app);
        while self.tick(app) == Flow::Continue {}
        self.shutdown(app);
    }

    /// Watch and load the entry unit, then run [`App::load`].
    pub fn start<A: App>(&mut self, app: &mut A) {
        let config = self.config.load();
        if config.verbose {
            logger::set_verbose(true);
        }

        if let Some(entry) = self.entry.clone() {
            self.tracker.observe(self.store.as_ref(), &entry);
            self.load_unit(&entry, &config);
        }

        let now = self.clock.now();
        self.hook(app, &config, now, |app, ctx| app.load(ctx));
    }

    /// Run one frame.
    pub fn tick<A: App>(&mut self, app: &mut A) -> Flow {
        self.refresh_config();
        let config = self.config.load();
        if config.verbose {
            logger::set_verbose(true);
        }
        self.output.set_autoflush(config.autoflush_output);

        // 1. events
        let now = self.clock.now();
        for event in self.events.poll() {
            if self.dispatch(app, &config, &event, now) == Flow::Quit {
                return Flow::Quit;
            }
        }

        // 2. clock
        let dt = self.clock.step();
        let now = self.clock.now();

        // 3. reloads
        let mut changed = self.reload_units(&config);
        if config.track_assets {
            changed |= self.fire_assets(&config, now);
        }

        // 4. reset or live reload, never both
        if changed {
            if config.reset_on_reload {
                self.hook(app, &config, now, |app, ctx| app.reset(ctx));
            } else if self.wants_live_reload(app, &config) {
                self.hook(app, &config, now, |app, ctx| app.live_reload(ctx));
            }
        }

        // 5. update
        if !self.fault.is_faulted() {
            self.hook(app, &config, now, |app, ctx| app.update(ctx, dt));
        }

        // 6-7. draw, present
        if self.surface.is_active() {
            self.surface.clear();
            self.surface.origin();
            if !self.fault.is_faulted() {
                self.hook(app, &config, now, |app, ctx| app.draw(ctx));
            } else if config.show_error_on_screen {
                self.draw_fault();
            }
            self.surface.present();
        }

        // 8. yield
        self.clock.pause(config.frame_pause());
        Flow::Continue
    }

    /// Run [`App::teardown`] and flush the diagnostic stream.
    pub fn shutdown<A: App>(&mut self, app: &mut A) {
        let config = self.config.load();
        let now = self.clock.now();
        self.hook(app, &config, now, |app, ctx| app.teardown(ctx));
        self.output.flush();
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn modules(&self) -> &Modules {
        &self.modules
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn assets(&self) -> &AssetTracker {
        &self.assets
    }

    pub fn fault(&self) -> &FaultState {
        &self.fault
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.is_faulted()
    }

    pub fn fault_message(&self) -> Option<&str> {
        self.fault.message()
    }

    pub fn output(&mut self) -> &mut Output {
        &mut self.output
    }

    // ------------------------------------------------------------------------
    // phases
    // ------------------------------------------------------------------------

    fn dispatch<A: App>(&mut self, app: &mut A, config: &Config, event: &Event, now: Duration) -> Flow {
        crate::debug!("event"; "{}", event.label());
        match event {
            Event::Quit => {
                let keep_running = self
                    .hook(app, config, now, |app, ctx| app.quit(ctx))
                    .unwrap_or(false);
                if !keep_running {
                    return Flow::Quit;
                }
                crate::debug!("event"; "quit suppressed");
            }
            Event::KeyPressed(key) if config.reload_on_keypress && *key == config.reload_key => {
                self.fault.clear_if_faulted(self.surface.as_mut());
                self.output.line("reload", "reset");
                self.hook(app, config, now, |app, ctx| app.reset(ctx));
            }
            _ => {}
        }

        self.hook(app, config, now, |app, ctx| app.event(ctx, event));
        Flow::Continue
    }

    /// Reload every changed code unit. Returns whether any reload succeeded.
    fn reload_units(&mut self, config: &Config) -> bool {
        let mut changed = false;
        for name in self.tracker.poll(self.store.as_ref()) {
            if config.log_reloads {
                self.output.line("reload", &format!("updated file {name}"));
            }
            self.fault.clear_if_faulted(self.surface.as_mut());
            changed |= self.load_unit(&name, config);
        }
        changed
    }

    /// Acquire then execute a unit, each step trapped. Returns whether it ran.
    fn load_unit(&mut self, name: &str, config: &Config) -> bool {
        let (store, loader) = (self.store.as_ref(), self.loader.as_mut());
        let chunk = match protect(|| context::acquire(store, loader, name)) {
            Ok(chunk) => chunk,
            Err(fault) => {
                self.contain(fault, config);
                return false;
            }
        };

        let modules = &mut self.modules;
        match protect(|| chunk.execute(modules)) {
            Ok(()) => {
                self.modules.mark_loaded(name);
                true
            }
            Err(fault) => {
                self.contain(fault, config);
                false
            }
        }
    }

    /// Invoke changed assets' callbacks, then the due delayed ones.
    fn fire_assets(&mut self, config: &Config, now: Duration) -> bool {
        let mut firings = self.assets.poll(self.store.as_ref(), now);
        firings.extend(self.assets.take_due(now));

        let mut changed = false;
        for firing in firings {
            crate::debug!("asset"; "changed {}", firing.asset);
            let (modules, store) = (&mut self.modules, self.store.as_ref());
            match protect(|| firing.callback.invoke(modules, store)) {
                Ok(()) => changed = true,
                Err(fault) => self.contain(fault, config),
            }
        }
        changed
    }

    fn wants_live_reload<A: App>(&mut self, app: &A, config: &Config) -> bool {
        match protect(|| Ok(app.has_live_reload())) {
            Ok(live) => live,
            Err(fault) => {
                self.contain(fault, config);
                false
            }
        }
    }

    fn draw_fault(&mut self) {
        if let Some(message) = self.fault.message() {
            let offset = FAULT_MARGIN * self.surface.scale();
            self.surface.print(message, offset, offset);
        }
    }

    // ------------------------------------------------------------------------
    // plumbing
    // ------------------------------------------------------------------------

    /// Run an app hook through the trap with a fresh [`Context`].
    fn hook<A: App, T>(
        &mut self,
        app: &mut A,
        config: &Config,
        now: Duration,
        hook: impl FnOnce(&mut A, &mut Context<'_>) -> Result<T>,
    ) -> Option<T> {
        let result = {
            let mut ctx = Context {
                surface: self.surface.as_mut(),
                modules: &mut self.modules,
                store: self.store.as_ref(),
                loader: self.loader.as_mut(),
                tracker: &mut self.tracker,
                assets: &mut self.assets,
                config,
                args: &self.args,
                now,
            };
            protect(|| hook(app, &mut ctx))
        };

        match result {
            Ok(value) => Some(value),
            Err(fault) => {
                self.contain(fault, config);
                None
            }
        }
    }

    /// Report a fault and enter the faulted state.
    fn contain(&mut self, fault: Fault, config: &Config) {
        let mut report = fault.report();
        if let Some(callback) = &config.error_callback {
            report = match protect(|| Ok(callback.call(&report))) {
                Ok(rewritten) => rewritten,
                Err(failed) => format!("{report}\nerror callback failed: {}", failed.message),
            };
        }
        self.output.line("fault", &report);

        let surface: Option<&mut dyn Surface> = if config.show_error_on_screen {
            Some(self.surface.as_mut())
        } else {
            None
        };
        self.fault.raise(report, surface, config.error_font_size);
    }

    /// Pick up edits to the config file, keeping the old config on errors.
    fn refresh_config(&mut self) {
        let Some(path) = &self.config_path else {
            return;
        };
        let mtime = get_mtime(path);
        if mtime.is_none() || mtime <= self.config_mtime {
            return;
        }
        self.config_mtime = mtime;

        match self.config.reload_from(path) {
            Ok(true) => self.output.line("config", &format!("reloaded {}", display_name(path))),
            Ok(false) => {}
            Err(err) => self.output.line("config", &format!("{err:#}")),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
