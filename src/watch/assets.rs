use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use anyhow::Result;
use rustc_hash::FxHashMap;

use crate::host::ResourceStore;
use crate::unit::Modules;

type CallbackFn = dyn FnMut(&mut Modules, &dyn ResourceStore) -> Result<()>;

/// Reaction to an asset change.
///
/// Clones share identity: registering the same callback for several assets
/// gives them a single pending fire.
#[derive(Clone)]
pub struct Callback(Rc<RefCell<CallbackFn>>);

impl Callback {
    pub fn new(f: impl FnMut(&mut Modules, &dyn ResourceStore) -> Result<()> + 'static) -> Self {
        Self(Rc::new(RefCell::new(f)))
    }

    pub fn invoke(&self, modules: &mut Modules, store: &dyn ResourceStore) -> Result<()> {
        (self.0.borrow_mut())(modules, store)
    }

    fn id(&self) -> CallbackId {
        CallbackId(Rc::as_ptr(&self.0).cast::<()>() as usize)
    }

    pub fn same_as(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:#x})", self.id().0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CallbackId(usize);

/// A registered non-code resource.
#[derive(Debug)]
struct TrackedAsset {
    callback: Callback,
    last_seen: Option<SystemTime>,
    delay: Option<Duration>,
}

#[derive(Debug)]
struct PendingFire {
    due: Duration,
    callback: Callback,
    asset: String,
}

/// A callback that should run now.
#[derive(Debug, Clone)]
pub struct Firing {
    pub asset: String,
    pub callback: Callback,
}

/// Tracked assets plus their delayed (settling) fires.
#[derive(Debug, Default)]
pub struct AssetTracker {
    assets: FxHashMap<String, TrackedAsset>,
    pending: FxHashMap<CallbackId, PendingFire>,
}

impl AssetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register, replace or (with `None`) remove a tracked asset.
    ///
    /// Registration takes the current modification time as baseline. A zero
    /// delay behaves like no delay.
    pub fn register(
        &mut self,
        store: &dyn ResourceStore,
        name: &str,
        callback: Option<Callback>,
        delay: Option<Duration>,
    ) {
        let Some(callback) = callback else {
            self.remove(name);
            return;
        };

        let last_seen = if store.exists(name) {
            store.modified(name)
        } else {
            None
        };
        crate::debug!("asset"; "track {} (delay {:?})", name, delay);
        self.assets.insert(
            name.to_owned(),
            TrackedAsset {
                callback,
                last_seen,
                delay: delay.filter(|d| !d.is_zero()),
            },
        );
    }

    /// Forget an asset. Its pending fire is dropped unless another asset
    /// still uses the same callback.
    fn remove(&mut self, name: &str) {
        let Some(asset) = self.assets.remove(name) else {
            return;
        };
        let id = asset.callback.id();
        let shared = self.assets.values().any(|a| a.callback.id() == id);
        if !shared {
            self.pending.remove(&id);
        }
        crate::debug!("asset"; "untrack {}", name);
    }

    /// Detect changed assets.
    ///
    /// Undelayed changes are returned for immediate invocation; delayed ones
    /// (re)schedule their callback at `now + delay`, replacing any earlier
    /// due time.
    pub fn poll(&mut self, store: &dyn ResourceStore, now: Duration) -> Vec<Firing> {
        let mut changed = Vec::new();

        for (name, asset) in &mut self.assets {
            if !store.exists(name) {
                continue;
            }
            let Some(current) = store.modified(name) else {
                continue;
            };
            match asset.last_seen {
                None => asset.last_seen = Some(current),
                Some(previous) if current > previous => {
                    asset.last_seen = Some(current);
                    changed.push(name.clone());
                }
                Some(_) => {}
            }
        }
        changed.sort_unstable();

        let mut immediate = Vec::new();
        for name in changed {
            let asset = &self.assets[&name];
            match asset.delay {
                Some(delay) => {
                    let due = now + delay;
                    crate::debug!("asset"; "{} settles at {:?}", name, due);
                    self.pending.insert(
                        asset.callback.id(),
                        PendingFire {
                            due,
                            callback: asset.callback.clone(),
                            asset: name,
                        },
                    );
                }
                None => immediate.push(Firing {
                    callback: asset.callback.clone(),
                    asset: name,
                }),
            }
        }
        immediate
    }

    /// Remove and return every pending fire due at or before `now`.
    pub fn take_due(&mut self, now: Duration) -> Vec<Firing> {
        let ready: Vec<CallbackId> = self
            .pending
            .iter()
            .filter(|(_, fire)| fire.due <= now)
            .map(|(id, _)| *id)
            .collect();

        let mut due: Vec<PendingFire> = ready
            .into_iter()
            .filter_map(|id| self.pending.remove(&id))
            .collect();

        due.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.asset.cmp(&b.asset)));
        due.into_iter()
            .map(|fire| Firing {
                asset: fire.asset,
                callback: fire.callback,
            })
            .collect()
    }

    /// Due time of the pending fire for an asset's callback, if any.
    pub fn pending_due(&self, name: &str) -> Option<Duration> {
        let asset = self.assets.get(name)?;
        self.pending.get(&asset.callback.id()).map(|fire| fire.due)
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.assets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
