//! Builtin helper functions available to producer scripts
//!
//! Builtins are ordinary values: scripts can call them or store them in
//! tables. They exist only inside the producer environment; the
//! marshaling layer rejects them at the boundary.

use crate::env::{Builtin, Environment, RawValue, TableKey};

/// Longest sequence `seq` will materialize.
const MAX_SEQ_LEN: i64 = 1_000_000;

/// Call a builtin with already-evaluated arguments. Errors are the
/// producer's own text; the evaluator prefixes source position.
pub fn call(
    builtin: Builtin,
    env: &mut Environment,
    args: Vec<RawValue>,
) -> Result<RawValue, String> {
    match builtin {
        Builtin::Concat => concat(args),
        Builtin::Upper => single_string(builtin, args).map(|s| RawValue::Str(s.to_uppercase())),
        Builtin::Lower => single_string(builtin, args).map(|s| RawValue::Str(s.to_lowercase())),
        Builtin::Seq => seq(env, args),
    }
}

fn concat(args: Vec<RawValue>) -> Result<RawValue, String> {
    let mut out = String::new();
    for arg in &args {
        match arg {
            RawValue::Str(s) => out.push_str(s),
            RawValue::Int(n) => out.push_str(&n.to_string()),
            RawValue::Float(f) => out.push_str(&format!("{:?}", f)),
            other => {
                return Err(format!(
                    "concat: cannot concatenate a {} value",
                    other.type_name()
                ))
            }
        }
    }
    Ok(RawValue::Str(out))
}

fn single_string(builtin: Builtin, args: Vec<RawValue>) -> Result<String, String> {
    let name = builtin.name();
    if args.len() != 1 {
        return Err(format!("{}: expected 1 argument, got {}", name, args.len()));
    }
    match args.into_iter().next() {
        Some(RawValue::Str(s)) => Ok(s),
        Some(other) => Err(format!(
            "{}: argument must be a string, got {}",
            name,
            other.type_name()
        )),
        None => Err(format!("{}: expected 1 argument, got 0", name)),
    }
}

fn seq(env: &mut Environment, args: Vec<RawValue>) -> Result<RawValue, String> {
    if args.len() < 2 || args.len() > 3 {
        return Err(format!("seq: expected 2 or 3 arguments, got {}", args.len()));
    }
    let mut ints = Vec::with_capacity(3);
    for (i, arg) in args.iter().enumerate() {
        match arg {
            RawValue::Int(n) => ints.push(*n),
            other => {
                return Err(format!(
                    "seq: argument {} must be an integer, got {}",
                    i + 1,
                    other.type_name()
                ))
            }
        }
    }
    let (from, to) = (ints[0], ints[1]);
    let step = if ints.len() == 3 { ints[2] } else { 1 };
    if step == 0 {
        return Err("seq: step must not be zero".to_string());
    }

    let id = env.alloc();
    let mut index: i64 = 1;
    let mut current = from;
    while (step > 0 && current <= to) || (step < 0 && current >= to) {
        if index > MAX_SEQ_LEN {
            return Err(format!("seq: range longer than {} entries", MAX_SEQ_LEN));
        }
        if let Some(table) = env.table_mut(id) {
            table.set(TableKey::Int(index), RawValue::Int(current));
        }
        index += 1;
        current = match current.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(RawValue::Table(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_strings_and_numbers() {
        let result = concat(vec![
            RawValue::Str("a".to_string()),
            RawValue::Int(1),
            RawValue::Float(2.5),
        ])
        .unwrap();
        assert_eq!(result, RawValue::Str("a12.5".to_string()));
    }

    #[test]
    fn test_concat_rejects_booleans() {
        let err = concat(vec![RawValue::Bool(true)]).unwrap_err();
        assert!(err.contains("boolean"));
    }

    #[test]
    fn test_upper_lower() {
        let mut env = Environment::new("test");
        let up = call(
            Builtin::Upper,
            &mut env,
            vec![RawValue::Str("abc".to_string())],
        )
        .unwrap();
        assert_eq!(up, RawValue::Str("ABC".to_string()));
        let down = call(
            Builtin::Lower,
            &mut env,
            vec![RawValue::Str("ABC".to_string())],
        )
        .unwrap();
        assert_eq!(down, RawValue::Str("abc".to_string()));
    }

    #[test]
    fn test_upper_arity() {
        let mut env = Environment::new("test");
        assert!(call(Builtin::Upper, &mut env, vec![]).is_err());
    }

    #[test]
    fn test_seq_builds_sequence() {
        let mut env = Environment::new("test");
        let result = call(
            Builtin::Seq,
            &mut env,
            vec![RawValue::Int(3), RawValue::Int(7), RawValue::Int(2)],
        )
        .unwrap();
        let id = match result {
            RawValue::Table(id) => id,
            other => panic!("Expected table, got {:?}", other),
        };
        let table = env.table(id).unwrap();
        assert_eq!(table.raw_len(), 3);
        assert_eq!(table.get(&TableKey::Int(1)), Some(&RawValue::Int(3)));
        assert_eq!(table.get(&TableKey::Int(3)), Some(&RawValue::Int(7)));
    }

    #[test]
    fn test_seq_descending() {
        let mut env = Environment::new("test");
        let result = call(
            Builtin::Seq,
            &mut env,
            vec![RawValue::Int(3), RawValue::Int(1), RawValue::Int(-1)],
        )
        .unwrap();
        let id = match result {
            RawValue::Table(id) => id,
            other => panic!("Expected table, got {:?}", other),
        };
        assert_eq!(env.table(id).unwrap().raw_len(), 3);
    }

    #[test]
    fn test_seq_zero_step() {
        let mut env = Environment::new("test");
        let err = call(
            Builtin::Seq,
            &mut env,
            vec![RawValue::Int(1), RawValue::Int(2), RawValue::Int(0)],
        )
        .unwrap_err();
        assert!(err.contains("step"));
    }
}
