//! Code units and the shared module table.
//!
//! A code unit is a named resource whose content, once acquired, executes
//! top-level effects against the [`Modules`] table: typically it (re)defines
//! named entries the application looks up.
//!
//! ```text
//! source text --UnitLoader::acquire--> Chunk --Chunk::execute--> Modules
//! ```
//!
//! Reloading a unit runs the same pipeline again and swaps the entries it
//! defines. Anyone still holding an `Rc` from an earlier [`Modules::get`]
//! keeps the old value until it looks the entry up again; the live-reload
//! hook is the place to do that.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use rustc_hash::{FxHashMap, FxHashSet};

/// Marker wrapped around acquisition errors so reports can name the unit.
///
/// The report sanitizer rewrites `[unit "name"]` back to `name`.
pub fn unit_marker(name: &str) -> String {
    format!("[unit \"{name}\"]")
}

// ============================================================================
// Modules
// ============================================================================

/// Name -> value table shared by all code units and the application.
#[derive(Default)]
pub struct Modules {
    entries: FxHashMap<String, Rc<dyn Any>>,
    loaded: FxHashSet<String>,
}

impl Modules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or replace an entry. Returns the previous value, if any.
    pub fn define<T: Any>(&mut self, name: impl Into<String>, value: T) -> Option<Rc<dyn Any>> {
        self.entries.insert(name.into(), Rc::new(value))
    }

    /// Typed lookup. `None` if missing or of a different type.
    pub fn get<T: Any>(&self, name: &str) -> Option<Rc<T>> {
        self.entries.get(name)?.clone().downcast::<T>().ok()
    }

    /// Typed lookup that explains what went wrong.
    pub fn expect<T: Any>(&self, name: &str) -> Result<Rc<T>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| anyhow!("`{name}` is not defined"))?;
        entry.clone().downcast::<T>().map_err(|_| {
            anyhow!(
                "`{name}` is not a `{}`",
                std::any::type_name::<T>()
            )
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Rc<dyn Any>> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a unit has been executed at least once.
    pub fn is_loaded(&self, unit: &str) -> bool {
        self.loaded.contains(unit)
    }

    pub(crate) fn mark_loaded(&mut self, unit: &str) {
        if !self.loaded.contains(unit) {
            self.loaded.insert(unit.to_owned());
        }
    }
}

impl fmt::Debug for Modules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("Modules")
            .field("entries", &names)
            .field("loaded", &self.loaded.len())
            .finish()
    }
}

// ============================================================================
// Chunk / UnitLoader
// ============================================================================

/// An acquired, not yet executed code unit.
pub struct Chunk(Box<dyn FnOnce(&mut Modules) -> Result<()>>);

impl Chunk {
    pub fn new(run: impl FnOnce(&mut Modules) -> Result<()> + 'static) -> Self {
        Self(Box::new(run))
    }

    /// Run the unit's top-level effects.
    pub fn execute(self, modules: &mut Modules) -> Result<()> {
        (self.0)(modules)
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Chunk(..)")
    }
}

/// Turns source text into an executable [`Chunk`].
pub trait UnitLoader {
    fn acquire(&mut self, name: &str, source: &str) -> Result<Chunk>;
}

impl<F> UnitLoader for F
where
    F: FnMut(&str, &str) -> Result<Chunk>,
{
    fn acquire(&mut self, name: &str, source: &str) -> Result<Chunk> {
        self(name, source)
    }
}

/// Loader installed when the host registers none. Every acquisition fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLoader;

impl UnitLoader for NoLoader {
    fn acquire(&mut self, name: &str, _source: &str) -> Result<Chunk> {
        Err(anyhow!("no unit loader installed, cannot load `{name}`"))
    }
}
