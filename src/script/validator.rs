//! Script validation for exdb
//!
//! Lints a parsed database script before execution. Validation is
//! advisory tooling: `open` runs scripts as-is, the `check` command and
//! library callers decide what to do with the issues.

use std::collections::HashSet;

use crate::env::Builtin;
use crate::parser::{Expr, Program, TableItem};

/// An issue found in a database script
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub line: usize,
    pub message: String,
    pub severity: ValidationSeverity,
}

/// Severity level for validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    Error,
    Warning,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            ValidationSeverity::Error => "ERROR",
            ValidationSeverity::Warning => "WARNING",
        };
        write!(f, "{} (line {}): {}", prefix, self.line, self.message)
    }
}

/// Validation options
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Maximum table-constructor nesting depth
    pub max_nesting_depth: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: 10,
        }
    }
}

/// Validate a parsed script
pub fn validate_program(program: &Program, options: &ValidationOptions) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut assigned: HashSet<&str> = HashSet::new();

    for stmt in &program.statements {
        if stmt.target.path.is_empty() {
            let name = stmt.target.root.as_str();
            if !assigned.insert(name) {
                issues.push(ValidationIssue {
                    line: stmt.line,
                    message: format!("global '{}' is assigned more than once", name),
                    severity: ValidationSeverity::Warning,
                });
            }
            if Builtin::lookup(name).is_some() {
                issues.push(ValidationIssue {
                    line: stmt.line,
                    message: format!("global '{}' shadows a builtin function", name),
                    severity: ValidationSeverity::Warning,
                });
            }
        }
        check_expr(&stmt.value, stmt.line, 0, options, &mut issues);
    }

    issues
}

fn check_expr(
    expr: &Expr,
    line: usize,
    depth: usize,
    options: &ValidationOptions,
    issues: &mut Vec<ValidationIssue>,
) {
    match expr {
        Expr::Table(items) => {
            if depth >= options.max_nesting_depth {
                issues.push(ValidationIssue {
                    line,
                    message: format!(
                        "maximum table nesting depth ({}) exceeded",
                        options.max_nesting_depth
                    ),
                    severity: ValidationSeverity::Error,
                });
                return;
            }
            for item in items {
                match item {
                    TableItem::Positional(value) => {
                        check_expr(value, line, depth + 1, options, issues)
                    }
                    TableItem::Named(_, value) => check_expr(value, line, depth + 1, options, issues),
                    TableItem::Keyed(key, value) => {
                        check_expr(key, line, depth + 1, options, issues);
                        check_expr(value, line, depth + 1, options, issues);
                    }
                }
            }
        }
        Expr::Call { args, .. } => {
            for arg in args {
                check_expr(arg, line, depth, options, issues);
            }
        }
        _ => {}
    }
}

/// Check whether any issue is an error
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues
        .iter()
        .any(|i| i.severity == ValidationSeverity::Error)
}
