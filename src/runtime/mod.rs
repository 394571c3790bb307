//! Process-level environment registry and teardown
//!
//! Every isolated environment created through this crate is recorded
//! here for the life of the process. `close_all` walks the record and
//! closes each environment exactly once; dropping the `Runtime` does
//! the same, so teardown is guaranteed even without an explicit call.

pub mod session;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::env::Environment;

pub use session::Session;

/// Identity of one isolated environment within the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(usize);

impl fmt::Display for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "env#{}", self.0)
    }
}

struct Entry {
    id: EnvId,
    label: String,
    /// The one owning reference. `None` once closed; entries are never
    /// removed, they go inert.
    env: Option<Rc<RefCell<Environment>>>,
}

#[derive(Default)]
struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    fn install(&mut self, env: Environment) -> (EnvId, Rc<RefCell<Environment>>) {
        let id = EnvId(self.entries.len());
        let label = env.label().to_string();
        let shared = Rc::new(RefCell::new(env));
        debug!(env = %id, label = %label, "environment registered");
        self.entries.push(Entry {
            id,
            label,
            env: Some(shared.clone()),
        });
        (id, shared)
    }

    fn close_all(&mut self) {
        for entry in &mut self.entries {
            if let Some(env) = entry.env.take() {
                // the live marker goes first; the drop below releases
                // the environment itself
                env.borrow_mut().close();
                debug!(env = %entry.id, label = %entry.label, "environment closed");
            }
        }
    }

    fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| e.env.is_some()).count()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// The process-level context owning every producer environment.
///
/// Clones share one registry. Environments live until `close_all` or
/// until the last `Runtime` clone drops, independent of whether any
/// proxy into them is still held.
#[derive(Clone)]
pub struct Runtime {
    registry: Rc<RefCell<Registry>>,
}

impl Runtime {
    pub fn new() -> Self {
        Runtime {
            registry: Rc::new(RefCell::new(Registry::default())),
        }
    }

    /// Start a consumer session against this runtime.
    pub fn session(&self) -> Session {
        Session::new(self.clone())
    }

    pub(crate) fn install(&self, env: Environment) -> (EnvId, Rc<RefCell<Environment>>) {
        self.registry.borrow_mut().install(env)
    }

    #[cfg(test)]
    pub(crate) fn environment(&self, id: EnvId) -> Option<Rc<RefCell<Environment>>> {
        self.registry.borrow().entries.get(id.0)?.env.clone()
    }

    /// Close every environment ever opened, in registration order,
    /// skipping any already closed. Idempotent. Every handle pointing
    /// into a closed environment fails from here on.
    pub fn close_all(&self) {
        self.registry.borrow_mut().close_all();
    }

    /// How many environments were ever created.
    pub fn environment_count(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    /// How many environments are still open.
    pub fn live_count(&self) -> usize {
        self.registry.borrow().live_count()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
