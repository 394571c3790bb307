//! Per-consumer proxy caches
//!
//! One cache exists per (consumer session, producer environment) pair.
//! Entries hold handles weakly: while consumer code keeps a handle
//! alive, lookups return the identical handle; once every clone is
//! dropped the entry is dead and a later store sweeps it out. The
//! cache never keeps a table alive and never keeps a handle alive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::env::IdentityKey;
use crate::proxy::handle::{Proxy, ProxyInner};

pub(crate) type SharedCache = Rc<RefCell<ProxyCache>>;

#[derive(Default)]
pub(crate) struct ProxyCache {
    entries: HashMap<IdentityKey, Weak<ProxyInner>>,
}

impl ProxyCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn shared() -> SharedCache {
        Rc::new(RefCell::new(ProxyCache::new()))
    }

    /// Return the live handle for a key, if any consumer still holds it.
    pub(crate) fn lookup(&self, key: IdentityKey) -> Option<Proxy> {
        self.entries
            .get(&key)
            .and_then(Weak::upgrade)
            .map(Proxy::from_inner)
    }

    /// Cache a freshly created handle. Dead entries are swept on the
    /// way in, so dropped handles do not accumulate.
    pub(crate) fn store(&mut self, key: IdentityKey, proxy: &Proxy) {
        self.sweep();
        self.entries.insert(key, proxy.downgrade());
    }

    /// Drop entries whose handle is gone. Returns how many were
    /// removed.
    pub(crate) fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, weak| weak.strong_count() > 0);
        before - self.entries.len()
    }

    /// Number of entries whose handle is still alive.
    #[cfg(test)]
    pub(crate) fn live_handles(&self) -> usize {
        self.entries
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
