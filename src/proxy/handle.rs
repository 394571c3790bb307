//! Consumer-side proxy handles
//!
//! A `Proxy` names one table inside one producer environment: a weak
//! environment reference plus the table's identity key. It owns
//! neither. Every operation resolves the key against the live
//! environment first and fails with a stale-reference error once the
//! environment has been closed.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::env::{Environment, IdentityKey, RawValue, TableId, TableKey};
use crate::error::{ExdbError, Result};
use crate::proxy::cache::SharedCache;
use crate::proxy::marshal::{self, Value};
use crate::runtime::EnvId;

/// Shared connection of a consumer session to one producer
/// environment: the non-owning environment reference and the session's
/// cache for that environment.
#[derive(Clone)]
pub(crate) struct EnvLink {
    pub(crate) env: Weak<RefCell<Environment>>,
    pub(crate) env_id: EnvId,
    pub(crate) cache: SharedCache,
}

pub(crate) struct ProxyInner {
    pub(crate) link: EnvLink,
    pub(crate) key: IdentityKey,
}

/// A read-only handle to a table in another environment. Cloning is
/// cheap and clones compare equal; two handles for the same table
/// obtained through the same session are the same handle.
#[derive(Clone)]
pub struct Proxy {
    inner: Rc<ProxyInner>,
}

impl Proxy {
    pub(crate) fn new(link: EnvLink, key: IdentityKey) -> Self {
        Proxy {
            inner: Rc::new(ProxyInner { link, key }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<ProxyInner>) -> Self {
        Proxy { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ProxyInner> {
        Rc::downgrade(&self.inner)
    }

    /// The table's identity key within its producer environment. Two
    /// handles for the same table always agree on it, whatever session
    /// they belong to.
    pub fn identity(&self) -> IdentityKey {
        self.inner.key
    }

    /// Handle identity: true when both handles are the same object.
    pub fn ptr_eq(a: &Proxy, b: &Proxy) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// The producer environment this handle points into.
    pub fn env_id(&self) -> EnvId {
        self.inner.link.env_id
    }

    fn stale(&self) -> ExdbError {
        ExdbError::Stale {
            key: self.inner.key.to_string(),
            env: self.inner.link.env_id.to_string(),
        }
    }

    fn resolve_env(&self) -> Result<Rc<RefCell<Environment>>> {
        self.inner.link.env.upgrade().ok_or_else(|| self.stale())
    }

    /// Raw indexed read. The key must be nil, a boolean, an integer, a
    /// float or a string; nil and NaN keys read as nil. The result is
    /// marshaled, so a nested table comes back as another handle.
    pub fn get(&self, key: impl Into<Value>) -> Result<Value> {
        let key = key.into();
        let env_rc = self.resolve_env()?;
        let mut env = env_rc.borrow_mut();
        let id = env.resolve(self.inner.key).ok_or_else(|| self.stale())?;

        let lowered = marshal::lower_key(&key)?;
        let raw = {
            let table = env.table(id).ok_or_else(|| self.stale())?;
            match lowered {
                Some(k) => table.get(&k).cloned().unwrap_or(RawValue::Nil),
                None => RawValue::Nil,
            }
        };
        marshal::copy_value(&mut env, &self.inner.link, &raw)
    }

    /// Raw border length of the table.
    pub fn len(&self) -> Result<i64> {
        let env_rc = self.resolve_env()?;
        let env = env_rc.borrow();
        let id = env.resolve(self.inner.key).ok_or_else(|| self.stale())?;
        let table = env.table(id).ok_or_else(|| self.stale())?;
        Ok(table.raw_len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        let env_rc = self.resolve_env()?;
        let env = env_rc.borrow();
        let id = env.resolve(self.inner.key).ok_or_else(|| self.stale())?;
        let table = env.table(id).ok_or_else(|| self.stale())?;
        Ok(table.is_empty())
    }

    /// One stateless iteration step. A nil `prev` starts; the returned
    /// key feeds the following call; `None` signals exhaustion. Keys
    /// and values are marshaled, so table keys come back as handles.
    pub fn next(&self, prev: &Value) -> Result<Option<(Value, Value)>> {
        let env_rc = self.resolve_env()?;
        let mut env = env_rc.borrow_mut();
        let id = env.resolve(self.inner.key).ok_or_else(|| self.stale())?;

        let prev_key = self.lower_iteration_key(&env, prev)?;
        let step = {
            let table = env.table(id).ok_or_else(|| self.stale())?;
            match table.next(prev_key.as_ref())? {
                Some((k, v)) => Some((k.clone(), v.clone())),
                None => None,
            }
        };
        match step {
            Some((raw_key, raw_value)) => {
                let key = marshal::copy_key(&mut env, &self.inner.link, &raw_key)?;
                let value = marshal::copy_value(&mut env, &self.inner.link, &raw_value)?;
                Ok(Some((key, value)))
            }
            None => Ok(None),
        }
    }

    // Unlike `get`, iteration accepts a table key: it is exactly what
    // the previous step may have handed out. It must be one of this
    // environment's own handles, or it cannot name an entry here.
    fn lower_iteration_key(&self, env: &Environment, prev: &Value) -> Result<Option<TableKey>> {
        match prev {
            Value::Table(p) => {
                if p.inner.link.env_id != self.inner.link.env_id {
                    return Err(ExdbError::InvalidIteration);
                }
                let id = env.resolve(p.inner.key).ok_or(ExdbError::InvalidIteration)?;
                Ok(Some(TableKey::Table(id)))
            }
            other => marshal::lower_key(other),
        }
    }

    /// Enumerate all entries in the table's native order.
    pub fn iter(&self) -> Entries {
        Entries {
            proxy: self.clone(),
            prev: Value::Nil,
            done: false,
        }
    }

    /// Diagnostic tag naming the producer environment and the table's
    /// identity. Never use it for equality.
    pub fn describe(&self) -> String {
        self.to_string()
    }

    pub(crate) fn resolve_table(&self) -> Result<(Rc<RefCell<Environment>>, TableId)> {
        let env_rc = self.resolve_env()?;
        let id = {
            let env = env_rc.borrow();
            env.resolve(self.inner.key).ok_or_else(|| self.stale())?
        };
        Ok((env_rc, id))
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        Proxy::ptr_eq(self, other)
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[exdb {}:{}]", self.inner.link.env_id, self.inner.key)
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("env", &self.inner.link.env_id)
            .field("key", &self.inner.key.to_string())
            .finish()
    }
}

/// Iterator over a proxied table's entries, in native order. Each item
/// is a marshaled `(key, value)` pair; marshaling failures surface as
/// `Err` items and end the traversal.
pub struct Entries {
    proxy: Proxy,
    prev: Value,
    done: bool,
}

impl Iterator for Entries {
    type Item = Result<(Value, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.proxy.next(&self.prev) {
            Ok(Some((key, value))) => {
                self.prev = key.clone();
                Some(Ok((key, value)))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl IntoIterator for &Proxy {
    type Item = Result<(Value, Value)>;
    type IntoIter = Entries;

    fn into_iter(self) -> Entries {
        self.iter()
    }
}
