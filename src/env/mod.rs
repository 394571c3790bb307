//! Isolated environments
//!
//! An `Environment` is an independent value space: a generational heap
//! of tables, a globals table, and the registry that pins tables
//! handed out to consumers. Environments never share values; anything
//! crossing the boundary goes through the marshaling layer.

pub mod table;
pub mod value;

use std::collections::HashMap;
use std::fmt;

pub use table::{FloatBits, KeyClass, Table, TableKey};
pub use value::{Builtin, RawValue};

/// Heap address of a table: slot index plus the slot's generation at
/// allocation time. A reclaimed slot bumps its generation, so stale
/// ids stop resolving instead of aliasing a new table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId {
    index: u32,
    generation: u32,
}

impl TableId {
    pub(crate) fn index(&self) -> usize {
        self.index as usize
    }
}

/// Address-derived identity of a table, stable for the table's
/// lifetime within its environment. Shown in diagnostics as hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityKey(u64);

impl IdentityKey {
    pub fn of(id: TableId) -> Self {
        IdentityKey(((id.generation as u64) << 32) | id.index as u64)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

struct Slot {
    generation: u32,
    table: Option<Table>,
}

/// One isolated environment
pub struct Environment {
    label: String,
    slots: Vec<Slot>,
    free: Vec<usize>,
    globals: TableId,
    /// Tables handed out by identity; keeps them alive and guarantees
    /// one key per table.
    registry: HashMap<IdentityKey, TableId>,
    closed: bool,
}

impl Environment {
    pub fn new(label: impl Into<String>) -> Self {
        let mut env = Environment {
            label: label.into(),
            slots: Vec::new(),
            free: Vec::new(),
            globals: TableId {
                index: 0,
                generation: 0,
            },
            registry: HashMap::new(),
            closed: false,
        };
        env.globals = env.alloc();
        env
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn globals(&self) -> TableId {
        self.globals
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Allocate a fresh empty table.
    pub fn alloc(&mut self) -> TableId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.table = Some(Table::new());
            TableId {
                index: index as u32,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                table: Some(Table::new()),
            });
            TableId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    pub fn table(&self, id: TableId) -> Option<&Table> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.table.as_ref()
    }

    pub fn table_mut(&mut self, id: TableId) -> Option<&mut Table> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.table.as_mut()
    }

    /// Register a table in the identity registry. Registering the same
    /// table twice is a no-op returning the existing key, so every
    /// consumer sees one identity per table.
    pub fn register(&mut self, id: TableId) -> IdentityKey {
        let key = IdentityKey::of(id);
        self.registry.entry(key).or_insert(id);
        key
    }

    /// Resolve an identity key back to a live table. Fails once the
    /// environment is closed or the table is gone.
    pub fn resolve(&self, key: IdentityKey) -> Option<TableId> {
        if self.closed {
            return None;
        }
        let id = *self.registry.get(&key)?;
        self.table(id).map(|_| id)
    }

    /// Mark-and-sweep over the table heap. Roots are the globals table
    /// and every registered table. Returns the number of reclaimed
    /// tables.
    pub fn collect(&mut self) -> usize {
        let mut marked = vec![false; self.slots.len()];
        let mut work: Vec<usize> = vec![self.globals.index()];
        work.extend(self.registry.values().map(|id| id.index()));

        while let Some(i) = work.pop() {
            if marked[i] {
                continue;
            }
            marked[i] = true;
            if let Some(table) = self.slots[i].table.as_ref() {
                for (key, value) in table.entries() {
                    if let TableKey::Table(id) = key {
                        work.push(id.index());
                    }
                    if let RawValue::Table(id) = value {
                        work.push(id.index());
                    }
                }
            }
        }

        let mut freed = 0;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if !marked[i] && slot.table.is_some() {
                slot.table = None;
                slot.generation += 1;
                self.free.push(i);
                freed += 1;
            }
        }
        freed
    }

    /// Close the environment: the live marker goes first so any
    /// resolution started afterwards fails, then registered state is
    /// dropped. The heap itself is released when the owner drops the
    /// environment.
    pub fn close(&mut self) {
        self.closed = true;
        self.registry.clear();
    }

    /// Number of live tables in the heap (diagnostics and tests).
    pub fn live_tables(&self) -> usize {
        self.slots.iter().filter(|s| s.table.is_some()).count()
    }

    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("label", &self.label)
            .field("live_tables", &self.live_tables())
            .field("registered", &self.registry.len())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_environment_has_globals() {
        let env = Environment::new("test");
        assert!(env.table(env.globals()).is_some());
        assert_eq!(env.live_tables(), 1);
        assert!(!env.is_closed());
    }

    #[test]
    fn test_alloc_and_lookup() {
        let mut env = Environment::new("test");
        let id = env.alloc();
        env.table_mut(id)
            .unwrap()
            .set(TableKey::Int(1), RawValue::Int(42));
        assert_eq!(
            env.table(id).unwrap().get(&TableKey::Int(1)),
            Some(&RawValue::Int(42))
        );
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut env = Environment::new("test");
        let id = env.alloc();
        let k1 = env.register(id);
        let k2 = env.register(id);
        assert_eq!(k1, k2);
        assert_eq!(env.registered_count(), 1);
        assert_eq!(env.resolve(k1), Some(id));
    }

    #[test]
    fn test_resolve_unknown_key() {
        let mut env = Environment::new("test");
        let id = env.alloc();
        let key = IdentityKey::of(id);
        // never registered
        assert_eq!(env.resolve(key), None);
    }

    #[test]
    fn test_collect_reclaims_unreachable() {
        let mut env = Environment::new("test");
        let orphan = env.alloc();
        let kept = env.alloc();
        let globals = env.globals();
        env.table_mut(globals)
            .unwrap()
            .set(TableKey::Str("kept".to_string()), RawValue::Table(kept));

        assert_eq!(env.collect(), 1);
        assert!(env.table(orphan).is_none());
        assert!(env.table(kept).is_some());
    }

    #[test]
    fn test_collect_traces_nested_and_key_tables() {
        let mut env = Environment::new("test");
        let inner = env.alloc();
        let outer = env.alloc();
        let key_table = env.alloc();
        env.table_mut(outer)
            .unwrap()
            .set(TableKey::Table(key_table), RawValue::Table(inner));
        let globals = env.globals();
        env.table_mut(globals)
            .unwrap()
            .set(TableKey::Str("outer".to_string()), RawValue::Table(outer));

        assert_eq!(env.collect(), 0);
        assert!(env.table(inner).is_some());
        assert!(env.table(key_table).is_some());
    }

    #[test]
    fn test_collect_keeps_registered_roots() {
        let mut env = Environment::new("test");
        let pinned = env.alloc();
        env.register(pinned);
        assert_eq!(env.collect(), 0);
        assert!(env.table(pinned).is_some());
    }

    #[test]
    fn test_generation_detects_stale_id() {
        let mut env = Environment::new("test");
        let orphan = env.alloc();
        env.collect();
        let recycled = env.alloc();
        // the reclaimed slot was reused with a bumped generation
        assert_ne!(IdentityKey::of(orphan), IdentityKey::of(recycled));
        assert!(env.table(orphan).is_none());
        assert!(env.table(recycled).is_some());
    }

    #[test]
    fn test_close_clears_registry_and_resolution() {
        let mut env = Environment::new("test");
        let id = env.alloc();
        let key = env.register(id);
        env.close();
        assert!(env.is_closed());
        assert_eq!(env.resolve(key), None);
        assert_eq!(env.registered_count(), 0);
    }
}
