//! Host events.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crossbeam::channel::{Receiver, bounded};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Key identifier, compared case-insensitively (`"F5"` == `"f5"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Key(String);

impl Key {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_ascii_lowercase())
    }

    /// Function key `F<n>`.
    pub fn function(n: u8) -> Self {
        Self(format!("f{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Key {
    fn default() -> Self {
        Self::function(5)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A typed host event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Host-level quit request (window close, Ctrl+C).
    Quit,
    KeyPressed(Key),
    /// Anything else, forwarded to the application untouched.
    Other { name: String, args: Vec<String> },
}

impl Event {
    pub fn key(name: impl AsRef<str>) -> Self {
        Self::KeyPressed(Key::new(name))
    }

    pub fn other(name: impl Into<String>) -> Self {
        Self::Other {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Short label for logging.
    pub fn label(&self) -> &str {
        match self {
            Self::Quit => "quit",
            Self::KeyPressed(_) => "keypressed",
            Self::Other { name, .. } => name,
        }
    }
}

/// Source of host events, drained once per tick.
pub trait EventPump {
    fn poll(&mut self) -> Vec<Event>;
}

// ============================================================================
// NoEvents
// ============================================================================

/// Event pump that never produces anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

impl EventPump for NoEvents {
    fn poll(&mut self) -> Vec<Event> {
        Vec::new()
    }
}

// ============================================================================
// ScriptedEvents
// ============================================================================

/// Shared queue of event batches; each `poll` takes one batch.
///
/// Clones share the queue, so a test can keep pushing while the supervisor
/// owns another handle.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEvents {
    batches: Arc<Mutex<VecDeque<Vec<Event>>>>,
}

impl ScriptedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue events to be delivered together on one tick.
    pub fn push_batch(&self, events: impl IntoIterator<Item = Event>) {
        self.batches.lock().push_back(events.into_iter().collect());
    }

    /// Queue a single event on its own tick.
    pub fn push(&self, event: Event) {
        self.push_batch([event]);
    }

    /// Queue a tick with no events.
    pub fn idle(&self) {
        self.push_batch([]);
    }

    pub fn pending(&self) -> usize {
        self.batches.lock().len()
    }
}

impl EventPump for ScriptedEvents {
    fn poll(&mut self) -> Vec<Event> {
        self.batches.lock().pop_front().unwrap_or_default()
    }
}

// ============================================================================
// InterruptQuit
// ============================================================================

/// Wraps another pump and appends [`Event::Quit`] once Ctrl+C is received.
pub struct InterruptQuit<P> {
    inner: P,
    interrupts: Receiver<()>,
}

impl<P: EventPump> InterruptQuit<P> {
    /// Install the process-wide Ctrl+C handler. Call at most once per process.
    pub fn install(inner: P) -> Result<Self, ctrlc::Error> {
        let (tx, rx) = bounded(1);
        ctrlc::set_handler(move || {
            let _ = tx.try_send(());
        })?;
        Ok(Self::with_receiver(inner, rx))
    }

    fn with_receiver(inner: P, interrupts: Receiver<()>) -> Self {
        Self { inner, interrupts }
    }
}

impl<P: EventPump> EventPump for InterruptQuit<P> {
    fn poll(&mut self) -> Vec<Event> {
        let mut events = self.inner.poll();
        if self.interrupts.try_recv().is_ok() {
            crate::debug!("event"; "interrupt received");
            events.push(Event::Quit);
        }
        events
    }
}
