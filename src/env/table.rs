//! Insertion-ordered tables
//!
//! `Table` is the container value of an isolated environment. Entries
//! keep insertion order, which is the order iteration reports. The raw
//! length follows the border rule: the largest `n` such that keys
//! `1..=n` are all present.

use std::collections::HashMap;

use super::value::RawValue;
use super::TableId;
use crate::error::{ExdbError, Result};

/// A table key. Float keys with an integral value normalize to `Int`,
/// so `t[2]` and `t[2.0]` address the same entry; NaN never becomes a
/// key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableKey {
    Bool(bool),
    Int(i64),
    Float(FloatBits),
    Str(String),
    Table(TableId),
}

/// A non-integral float key, compared and hashed by bit pattern
/// (negative zero normalized away).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatBits(u64);

impl FloatBits {
    pub fn new(v: f64) -> Self {
        let v = if v == 0.0 { 0.0 } else { v };
        FloatBits(v.to_bits())
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0)
    }
}

/// How a value classifies as a table key
#[derive(Debug, Clone, PartialEq)]
pub enum KeyClass {
    Key(TableKey),
    /// nil or NaN: reads find nothing, stores are rejected by the
    /// evaluator
    Absent,
    /// a kind that can never key a table entry; carries the type name
    Invalid(&'static str),
}

impl TableKey {
    pub fn classify(value: &RawValue) -> KeyClass {
        match value {
            RawValue::Nil => KeyClass::Absent,
            RawValue::Bool(b) => KeyClass::Key(TableKey::Bool(*b)),
            RawValue::Int(n) => KeyClass::Key(TableKey::Int(*n)),
            RawValue::Float(f) => match normalize_float(*f) {
                Some(key) => KeyClass::Key(key),
                None => KeyClass::Absent,
            },
            RawValue::Str(s) => KeyClass::Key(TableKey::Str(s.clone())),
            RawValue::Table(id) => KeyClass::Key(TableKey::Table(*id)),
            RawValue::Builtin(_) => KeyClass::Invalid("function"),
        }
    }

    pub fn to_raw(&self) -> RawValue {
        match self {
            TableKey::Bool(b) => RawValue::Bool(*b),
            TableKey::Int(n) => RawValue::Int(*n),
            TableKey::Float(bits) => RawValue::Float(bits.get()),
            TableKey::Str(s) => RawValue::Str(s.clone()),
            TableKey::Table(id) => RawValue::Table(*id),
        }
    }
}

fn normalize_float(v: f64) -> Option<TableKey> {
    if v.is_nan() {
        return None;
    }
    if v.is_finite() && v.fract() == 0.0 && (-9.223_372_036_854_776e18..9.223_372_036_854_776e18).contains(&v) {
        Some(TableKey::Int(v as i64))
    } else {
        Some(TableKey::Float(FloatBits::new(v)))
    }
}

/// An insertion-ordered associative container
#[derive(Debug, Default)]
pub struct Table {
    entries: Vec<(TableKey, RawValue)>,
    index: HashMap<TableKey, usize>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw lookup. Absent keys read as `None`; the caller treats that
    /// as nil.
    pub fn get(&self, key: &TableKey) -> Option<&RawValue> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    /// Insert or update; a nil value removes the entry.
    pub fn set(&mut self, key: TableKey, value: RawValue) {
        if value.is_nil() {
            self.remove(&key);
            return;
        }
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.entries.push((key.clone(), value));
                self.index.insert(key, self.entries.len() - 1);
            }
        }
    }

    fn remove(&mut self, key: &TableKey) {
        if let Some(pos) = self.index.remove(key) {
            self.entries.remove(pos);
            for slot in self.index.values_mut() {
                if *slot > pos {
                    *slot -= 1;
                }
            }
        }
    }

    pub fn contains(&self, key: &TableKey) -> bool {
        self.index.contains_key(key)
    }

    /// Border length: the largest `n` with keys `1..=n` all present.
    /// For sequences with holes this reports the first border, which is
    /// all the underlying container ever promised.
    pub fn raw_len(&self) -> i64 {
        let mut n: i64 = 0;
        while self.index.contains_key(&TableKey::Int(n + 1)) {
            n += 1;
        }
        n
    }

    /// One stateless iteration step in insertion order. `None` starts;
    /// a previous key that is no longer present is an error.
    pub fn next(&self, prev: Option<&TableKey>) -> Result<Option<(&TableKey, &RawValue)>> {
        let pos = match prev {
            None => 0,
            Some(key) => match self.index.get(key) {
                Some(&p) => p + 1,
                None => return Err(ExdbError::InvalidIteration),
            },
        };
        Ok(self.entries.get(pos).map(|(k, v)| (k, v)))
    }

    pub fn entries(&self) -> impl Iterator<Item = &(TableKey, RawValue)> {
        self.entries.iter()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> TableKey {
        TableKey::Str(s.to_string())
    }

    #[test]
    fn test_set_get() {
        let mut t = Table::new();
        t.set(key("a"), RawValue::Int(1));
        assert_eq!(t.get(&key("a")), Some(&RawValue::Int(1)));
        assert_eq!(t.get(&key("b")), None);
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let mut t = Table::new();
        t.set(key("a"), RawValue::Int(1));
        t.set(key("b"), RawValue::Int(2));
        t.set(key("a"), RawValue::Int(3));
        let order: Vec<_> = t.entries().map(|(k, _)| k.clone()).collect();
        assert_eq!(order, vec![key("a"), key("b")]);
        assert_eq!(t.get(&key("a")), Some(&RawValue::Int(3)));
    }

    #[test]
    fn test_nil_removes() {
        let mut t = Table::new();
        t.set(key("a"), RawValue::Int(1));
        t.set(key("b"), RawValue::Int(2));
        t.set(key("c"), RawValue::Int(3));
        t.set(key("b"), RawValue::Nil);
        assert_eq!(t.entry_count(), 2);
        assert_eq!(t.get(&key("b")), None);
        // order of the survivors is preserved and the index stays valid
        assert_eq!(t.get(&key("c")), Some(&RawValue::Int(3)));
        let order: Vec<_> = t.entries().map(|(k, _)| k.clone()).collect();
        assert_eq!(order, vec![key("a"), key("c")]);
    }

    #[test]
    fn test_border_length() {
        let mut t = Table::new();
        assert_eq!(t.raw_len(), 0);
        t.set(TableKey::Int(1), RawValue::Int(10));
        t.set(TableKey::Int(2), RawValue::Int(20));
        t.set(TableKey::Int(3), RawValue::Int(30));
        assert_eq!(t.raw_len(), 3);
    }

    #[test]
    fn test_border_length_with_hole() {
        let mut t = Table::new();
        t.set(TableKey::Int(1), RawValue::Int(10));
        t.set(TableKey::Int(3), RawValue::Int(30));
        // first border; the hole at 2 stops the scan
        assert_eq!(t.raw_len(), 1);
    }

    #[test]
    fn test_border_length_ignores_named_keys() {
        let mut t = Table::new();
        t.set(key("x"), RawValue::Int(1));
        t.set(key("y"), RawValue::Str("two".to_string()));
        assert_eq!(t.raw_len(), 0);
    }

    #[test]
    fn test_float_key_normalizes_to_int() {
        let mut t = Table::new();
        t.set(TableKey::Int(2), RawValue::Str("two".to_string()));
        match TableKey::classify(&RawValue::Float(2.0)) {
            KeyClass::Key(k) => assert_eq!(t.get(&k), Some(&RawValue::Str("two".to_string()))),
            other => panic!("Expected Key, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_key_is_absent() {
        assert_eq!(TableKey::classify(&RawValue::Float(f64::NAN)), KeyClass::Absent);
    }

    #[test]
    fn test_nil_key_is_absent() {
        assert_eq!(TableKey::classify(&RawValue::Nil), KeyClass::Absent);
    }

    #[test]
    fn test_function_key_invalid() {
        use super::super::value::Builtin;
        assert_eq!(
            TableKey::classify(&RawValue::Builtin(Builtin::Concat)),
            KeyClass::Invalid("function")
        );
    }

    #[test]
    fn test_next_walks_insertion_order() {
        let mut t = Table::new();
        t.set(key("x"), RawValue::Int(1));
        t.set(key("y"), RawValue::Int(2));
        t.set(key("z"), RawValue::Int(3));

        let mut seen = Vec::new();
        let mut prev: Option<TableKey> = None;
        while let Some((k, _)) = t.next(prev.as_ref()).unwrap() {
            seen.push(k.clone());
            prev = Some(k.clone());
        }
        assert_eq!(seen, vec![key("x"), key("y"), key("z")]);
    }

    #[test]
    fn test_next_on_empty() {
        let t = Table::new();
        assert!(t.next(None).unwrap().is_none());
    }

    #[test]
    fn test_next_with_unknown_prev() {
        let mut t = Table::new();
        t.set(key("x"), RawValue::Int(1));
        let result = t.next(Some(&key("missing")));
        assert!(matches!(result, Err(ExdbError::InvalidIteration)));
    }

    #[test]
    fn test_negative_zero_float_key() {
        // -0.0 is integral, so it lands on the integer key 0
        match TableKey::classify(&RawValue::Float(-0.0)) {
            KeyClass::Key(TableKey::Int(0)) => {}
            other => panic!("Expected Int(0), got {:?}", other),
        }
    }
}
