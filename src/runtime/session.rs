//! Consumer sessions
//!
//! A `Session` is one consumer environment's view of the runtime: it
//! owns the per-producer proxy caches and the entry points that turn a
//! database script into a root handle. Handles from different sessions
//! never alias, even for the same producer table.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use tracing::debug;

use crate::engine;
use crate::env::Environment;
use crate::error::Result;
use crate::parser;
use crate::proxy::cache::{ProxyCache, SharedCache};
use crate::proxy::handle::EnvLink;
use crate::proxy::{wrap_table, Proxy};
use crate::runtime::{EnvId, Runtime};

pub struct Session {
    runtime: Runtime,
    caches: RefCell<HashMap<EnvId, SharedCache>>,
}

impl Session {
    pub(crate) fn new(runtime: Runtime) -> Self {
        Session {
            runtime,
            caches: RefCell::new(HashMap::new()),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Open a database: run the script at `path` in a fresh isolated
    /// environment and return a handle to its globals table.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Proxy> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        self.open_source(&path.display().to_string(), &text)
    }

    /// Open a database from in-memory source. `label` names the script
    /// in error messages and diagnostics.
    ///
    /// A script failure aborts the whole call with the producer's own
    /// error text; the half-built environment is dropped right here and
    /// never reaches the registry.
    pub fn open_source(&self, label: &str, source: &str) -> Result<Proxy> {
        let program = parser::parse_program(source)?;

        let mut env = Environment::new(label);
        engine::run_program(&mut env, &program)?;

        // one pass to shed the loader's transient tables before any
        // consumer sees the environment
        let reclaimed = env.collect();
        debug!(label, reclaimed, tables = env.live_tables(), "database loaded");

        let (env_id, shared) = self.runtime.install(env);
        let link = EnvLink {
            env: Rc::downgrade(&shared),
            env_id,
            cache: self.cache_for(env_id),
        };
        let mut env = shared.borrow_mut();
        let globals = env.globals();
        Ok(wrap_table(&mut env, &link, globals))
    }

    /// Re-wrap another session's handle in this session, yielding this
    /// session's own handle for the same producer table. Fails if the
    /// producer environment is gone.
    pub fn adopt(&self, handle: &Proxy) -> Result<Proxy> {
        let (env_rc, id) = handle.resolve_table()?;
        let env_id = handle.env_id();
        let link = EnvLink {
            env: Rc::downgrade(&env_rc),
            env_id,
            cache: self.cache_for(env_id),
        };
        let mut env = env_rc.borrow_mut();
        Ok(wrap_table(&mut env, &link, id))
    }

    fn cache_for(&self, env_id: EnvId) -> SharedCache {
        self.caches
            .borrow_mut()
            .entry(env_id)
            .or_insert_with(ProxyCache::shared)
            .clone()
    }

    #[cfg(test)]
    fn cache_stats(&self, env_id: EnvId) -> (usize, usize) {
        let caches = self.caches.borrow();
        match caches.get(&env_id) {
            Some(cache) => {
                let cache = cache.borrow();
                (cache.live_handles(), cache.entry_count())
            }
            None => (0, 0),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
