//! Cross-environment table proxies
//!
//! The heart of the crate: tables never leave their producer
//! environment; consumers hold identity-preserving handles instead.
//! `wrap_table` is the single path a table takes to become a handle,
//! used by bootstrap and by every nested access alike.

pub mod cache;
pub mod handle;
pub mod marshal;

pub use handle::{Entries, Proxy};
pub use marshal::Value;

use crate::env::{Environment, TableId};
use handle::EnvLink;

/// Get-or-create a handle for a producer table.
///
/// The table is pinned in the producer's identity registry (first
/// registration wins; repeats are no-ops), then the consumer cache is
/// consulted so an alive handle is returned as-is. Only when neither
/// side has seen the table does a new handle get allocated and cached
/// weakly.
pub(crate) fn wrap_table(env: &mut Environment, link: &EnvLink, id: TableId) -> Proxy {
    let key = env.register(id);
    if let Some(existing) = link.cache.borrow().lookup(key) {
        return existing;
    }
    let proxy = Proxy::new(link.clone(), key);
    link.cache.borrow_mut().store(key, &proxy);
    proxy
}
