//! Evaluator for producer scripts
//!
//! Runs a parsed program inside an isolated environment. The evaluator
//! is the only writer the environment ever sees: once the script has
//! finished, its tables are read through proxies and never mutated
//! again.

pub mod builtins;

use crate::env::{Builtin, Environment, KeyClass, RawValue, Table, TableId, TableKey};
use crate::error::{ExdbError, Result};
use crate::parser::{Accessor, Expr, Program, Statement, TableItem};

/// Hard bound on expression nesting, so a pathological script fails
/// with an error instead of exhausting the stack.
const MAX_EVAL_DEPTH: usize = 200;

/// Execute a parsed program against an environment. The first failing
/// statement aborts the run; its message carries the script label and
/// source line the way script runtimes usually report errors.
pub fn run_program(env: &mut Environment, program: &Program) -> Result<()> {
    for stmt in &program.statements {
        if let Err(msg) = exec_statement(env, stmt) {
            return Err(ExdbError::Script(format!(
                "{}:{}: {}",
                env.label(),
                stmt.line,
                msg
            )));
        }
    }
    Ok(())
}

fn exec_statement(env: &mut Environment, stmt: &Statement) -> std::result::Result<(), String> {
    let value = eval_expr(env, &stmt.value, 0)?;
    let globals = env.globals();
    let target = &stmt.target;

    if target.path.is_empty() {
        table_mut(env, globals)?.set(TableKey::Str(target.root.clone()), value);
        return Ok(());
    }

    // dotted target: walk through existing tables to the final field
    let mut id = match lookup_name(env, &target.root) {
        RawValue::Table(id) => id,
        other => {
            return Err(format!(
                "cannot index {} value '{}'",
                other.type_name(),
                target.root
            ))
        }
    };
    for name in &target.path[..target.path.len() - 1] {
        let step = table_ref(env, id)?
            .get(&TableKey::Str(name.clone()))
            .cloned()
            .unwrap_or(RawValue::Nil);
        id = match step {
            RawValue::Table(next) => next,
            other => {
                return Err(format!(
                    "cannot index {} value '{}'",
                    other.type_name(),
                    name
                ))
            }
        };
    }
    let last = target.path[target.path.len() - 1].clone();
    table_mut(env, id)?.set(TableKey::Str(last), value);
    Ok(())
}

fn eval_expr(
    env: &mut Environment,
    expr: &Expr,
    depth: usize,
) -> std::result::Result<RawValue, String> {
    if depth > MAX_EVAL_DEPTH {
        return Err("expression nesting too deep".to_string());
    }

    match expr {
        Expr::Nil => Ok(RawValue::Nil),
        Expr::Bool(b) => Ok(RawValue::Bool(*b)),
        Expr::Int(n) => Ok(RawValue::Int(*n)),
        Expr::Float(f) => Ok(RawValue::Float(*f)),
        Expr::Str(s) => Ok(RawValue::Str(s.clone())),

        Expr::Reference { root, accessors } => {
            let mut value = lookup_name(env, root);
            let mut shown = root.clone();
            for acc in accessors {
                let id = match value {
                    RawValue::Table(id) => id,
                    other => {
                        return Err(format!(
                            "cannot index {} value '{}'",
                            other.type_name(),
                            shown
                        ))
                    }
                };
                value = match acc {
                    Accessor::Field(name) => {
                        shown = name.clone();
                        table_ref(env, id)?
                            .get(&TableKey::Str(name.clone()))
                            .cloned()
                            .unwrap_or(RawValue::Nil)
                    }
                    Accessor::Index(key_expr) => {
                        shown.push_str("[]");
                        let key_value = eval_expr(env, key_expr, depth + 1)?;
                        match TableKey::classify(&key_value) {
                            KeyClass::Key(key) => table_ref(env, id)?
                                .get(&key)
                                .cloned()
                                .unwrap_or(RawValue::Nil),
                            // reads through nil/NaN/function keys find
                            // nothing rather than failing
                            KeyClass::Absent | KeyClass::Invalid(_) => RawValue::Nil,
                        }
                    }
                };
            }
            Ok(value)
        }

        Expr::Call { name, args } => {
            let builtin = match lookup_name(env, name) {
                RawValue::Builtin(b) => b,
                other => {
                    return Err(format!(
                        "cannot call {} value '{}'",
                        other.type_name(),
                        name
                    ))
                }
            };
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(env, arg, depth + 1)?);
            }
            builtins::call(builtin, env, values)
        }

        Expr::Table(items) => {
            let id = env.alloc();
            let mut next_index: i64 = 1;
            for item in items {
                match item {
                    TableItem::Positional(value_expr) => {
                        let value = eval_expr(env, value_expr, depth + 1)?;
                        let key = TableKey::Int(next_index);
                        next_index += 1;
                        // a nil positional still consumes its index
                        table_mut(env, id)?.set(key, value);
                    }
                    TableItem::Named(name, value_expr) => {
                        let value = eval_expr(env, value_expr, depth + 1)?;
                        table_mut(env, id)?.set(TableKey::Str(name.clone()), value);
                    }
                    TableItem::Keyed(key_expr, value_expr) => {
                        let key_value = eval_expr(env, key_expr, depth + 1)?;
                        let key = match TableKey::classify(&key_value) {
                            KeyClass::Key(key) => key,
                            KeyClass::Absent => {
                                let what =
                                    if matches!(key_value, RawValue::Float(f) if f.is_nan()) {
                                        "NaN"
                                    } else {
                                        "nil"
                                    };
                                return Err(format!("table index is {}", what));
                            }
                            KeyClass::Invalid(kind) => {
                                return Err(format!("table index is a {}", kind))
                            }
                        };
                        let value = eval_expr(env, value_expr, depth + 1)?;
                        table_mut(env, id)?.set(key, value);
                    }
                }
            }
            Ok(RawValue::Table(id))
        }
    }
}

/// Name resolution: globals shadow builtins, unknown names read as nil.
fn lookup_name(env: &Environment, name: &str) -> RawValue {
    if let Some(globals) = env.table(env.globals()) {
        if let Some(value) = globals.get(&TableKey::Str(name.to_string())) {
            return value.clone();
        }
    }
    match Builtin::lookup(name) {
        Some(b) => RawValue::Builtin(b),
        None => RawValue::Nil,
    }
}

fn table_ref<'a>(env: &'a Environment, id: TableId) -> std::result::Result<&'a Table, String> {
    env.table(id)
        .ok_or_else(|| "dangling table reference".to_string())
}

fn table_mut<'a>(
    env: &'a mut Environment,
    id: TableId,
) -> std::result::Result<&'a mut Table, String> {
    env.table_mut(id)
        .ok_or_else(|| "dangling table reference".to_string())
}

// ============================================================================
// Tests
// ============================================================================
