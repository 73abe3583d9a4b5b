//! Host collaborator interfaces.
//!
//! The supervisor never talks to a window, a file system or a clock
//! directly. Everything goes through these traits:
//!
//! | Trait           | Provides                                        |
//! |-----------------|-------------------------------------------------|
//! | `ResourceStore` | existence, modification time, source text       |
//! | `Clock`         | monotonic time, per-tick elapsed, end-of-tick pause |
//! | `EventPump`     | input/window events for one tick                |
//! | `Surface`       | clear, transform stack, fonts, text, present    |
//!
//! Each trait ships with a reference implementation usable by real hosts
//! (`DiskStore`, `SystemClock`, `InterruptQuit`) and a shared, scriptable
//! one for tests (`MemoryStore`, `ManualClock`, `ScriptedEvents`,
//! `MemorySurface`).

mod clock;
mod events;
mod store;
mod surface;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{Event, EventPump, InterruptQuit, Key, NoEvents, ScriptedEvents};
pub use store::{DiskStore, MemoryStore, ResourceStore, get_mtime};
pub use surface::{DrawOp, FontId, Headless, MemorySurface, Scissor, Surface, Transform};
