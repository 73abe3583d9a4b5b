//! Live code reloading for frame-driven applications.
//!
//! `hotloop` replaces an application's main loop with a [`Supervisor`] that,
//! every tick, checks the modification time of the code units and assets it
//! was asked to watch, reloads what changed, and keeps running when any of
//! that (or the application itself) fails.
//!
//! # Architecture
//!
//! ```text
//! host/     ResourceStore, Clock, EventPump, Surface (+ reference impls)
//! unit/     Modules table, Chunk, UnitLoader
//! watch/    ChangeTracker (code units), AssetTracker (assets + settle delay)
//! trap      protect(): errors and panics -> Fault
//! fault/    FaultState, presentation snapshot, report sanitizing
//! config/   Config, ConfigHandle (arc-swap), hotloop.toml
//! runtime/  Supervisor, Context, App hooks
//! logger    log!/debug! macros, diagnostic Output stream
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut supervisor = Supervisor::builder()
//!     .root("game")
//!     .loader(my_loader)
//!     .entry("main.src")
//!     .build()?;
//! supervisor.run(&mut MyGame::default());
//! ```

pub mod config;
pub mod fault;
pub mod host;
pub mod logger;
pub mod runtime;
pub mod trap;
pub mod unit;
pub mod watch;

pub use config::{Config, ConfigHandle, ErrorCallback};
pub use fault::{Fault, FaultState};
pub use runtime::{App, Context, Flow, SetupError, Supervisor, SupervisorBuilder};
pub use unit::{Chunk, Modules, UnitLoader};
pub use watch::Callback;
