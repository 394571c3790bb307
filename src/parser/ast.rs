//! Abstract Syntax Tree definitions for exdb database scripts

use serde::{Deserialize, Serialize};

/// A parsed database script: a sequence of global assignments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// A single assignment statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    /// Source line, for error reporting
    pub line: usize,
    pub target: Target,
    pub value: Expr,
}

/// Assignment target: a global name, optionally followed by a dotted
/// path into an existing table (`server.host = ...`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub root: String,
    pub path: Vec<String>,
}

/// An expression in a database script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A reference to a global, optionally walked through fields or
    /// bracketed indexes. References alias: they never copy tables.
    Reference {
        root: String,
        accessors: Vec<Accessor>,
    },
    /// A call of a builtin helper
    Call { name: String, args: Vec<Expr> },
    Table(Vec<TableItem>),
}

/// One step of a reference walk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Accessor {
    Field(String),
    Index(Box<Expr>),
}

/// One entry of a table constructor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TableItem {
    /// `expr` — appended at the next positional index, counting from 1
    Positional(Expr),
    /// `name = expr`
    Named(String, Expr),
    /// `[key] = expr`
    Keyed(Expr, Expr),
}
