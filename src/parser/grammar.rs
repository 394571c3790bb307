//! Pest grammar parser for exdb database scripts

use pest::Parser;
use pest_derive::Parser;

use crate::error::{ExdbError, Result};
use crate::parser::ast::*;

#[derive(Parser)]
#[grammar = "../grammar/exdb.pest"]
pub struct ScriptParser;

/// Parse a database script into an AST
pub fn parse_program(input: &str) -> Result<Program> {
    let pairs = ScriptParser::parse(Rule::program, input)
        .map_err(|e| ExdbError::Parse(e.to_string()))?;

    let pair = pairs
        .into_iter()
        .next()
        .ok_or_else(|| ExdbError::Parse("empty script".to_string()))?;

    let mut statements = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::statement {
            statements.push(parse_statement(inner)?);
        }
    }

    Ok(Program { statements })
}

fn parse_statement(pair: pest::iterators::Pair<Rule>) -> Result<Statement> {
    let line = pair.line_col().0;
    let mut inner = pair.into_inner();

    let target_pair = inner
        .next()
        .ok_or_else(|| ExdbError::Parse("expected assignment target".to_string()))?;
    let target = parse_target(target_pair)?;

    let value_pair = inner
        .next()
        .ok_or_else(|| ExdbError::Parse("expected value after '='".to_string()))?;
    let value = parse_expr(value_pair)?;

    Ok(Statement {
        line,
        target,
        value,
    })
}

fn parse_target(pair: pest::iterators::Pair<Rule>) -> Result<Target> {
    let mut names = pair.into_inner().map(|p| p.as_str().to_string());
    let root = names
        .next()
        .ok_or_else(|| ExdbError::Parse("expected target name".to_string()))?;
    Ok(Target {
        root,
        path: names.collect(),
    })
}

fn parse_expr(pair: pest::iterators::Pair<Rule>) -> Result<Expr> {
    match pair.as_rule() {
        Rule::nil_lit => Ok(Expr::Nil),
        Rule::bool_lit => Ok(Expr::Bool(pair.as_str() == "true")),
        Rule::int_lit => parse_int(pair.as_str()),
        Rule::float_lit => {
            let n: f64 = pair
                .as_str()
                .parse()
                .map_err(|_| ExdbError::Parse(format!("invalid number: {}", pair.as_str())))?;
            Ok(Expr::Float(n))
        }
        Rule::string_lit => Ok(Expr::Str(unescape(pair.as_str())?)),
        Rule::call => parse_call(pair),
        Rule::reference => parse_reference(pair),
        Rule::table => parse_table(pair),
        _ => Err(ExdbError::Parse(format!(
            "unexpected rule in expression: {:?}",
            pair.as_rule()
        ))),
    }
}

// An overlong integer constant falls back to a float, like the usual
// scripting-language lexers do.
fn parse_int(text: &str) -> Result<Expr> {
    match text.parse::<i64>() {
        Ok(n) => Ok(Expr::Int(n)),
        Err(_) => text
            .parse::<f64>()
            .map(Expr::Float)
            .map_err(|_| ExdbError::Parse(format!("invalid number: {}", text))),
    }
}

fn parse_call(pair: pest::iterators::Pair<Rule>) -> Result<Expr> {
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .ok_or_else(|| ExdbError::Parse("expected function name".to_string()))?
        .as_str()
        .to_string();

    let mut args = Vec::new();
    for arg in inner {
        args.push(parse_expr(arg)?);
    }

    Ok(Expr::Call { name, args })
}

fn parse_reference(pair: pest::iterators::Pair<Rule>) -> Result<Expr> {
    let mut inner = pair.into_inner();
    let root = inner
        .next()
        .ok_or_else(|| ExdbError::Parse("expected name".to_string()))?
        .as_str()
        .to_string();

    let mut accessors = Vec::new();
    for acc in inner {
        match acc.as_rule() {
            Rule::field_access => {
                let name = acc
                    .into_inner()
                    .next()
                    .ok_or_else(|| ExdbError::Parse("expected field name".to_string()))?;
                accessors.push(Accessor::Field(name.as_str().to_string()));
            }
            Rule::index_access => {
                let key = acc
                    .into_inner()
                    .next()
                    .ok_or_else(|| ExdbError::Parse("expected index expression".to_string()))?;
                accessors.push(Accessor::Index(Box::new(parse_expr(key)?)));
            }
            _ => {
                return Err(ExdbError::Parse(format!(
                    "unexpected accessor: {:?}",
                    acc.as_rule()
                )))
            }
        }
    }

    Ok(Expr::Reference { root, accessors })
}

fn parse_table(pair: pest::iterators::Pair<Rule>) -> Result<Expr> {
    let mut items = Vec::new();

    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::keyed_item => {
                let mut inner = item.into_inner();
                let key = inner
                    .next()
                    .ok_or_else(|| ExdbError::Parse("expected key expression".to_string()))?;
                let value = inner
                    .next()
                    .ok_or_else(|| ExdbError::Parse("expected value after key".to_string()))?;
                items.push(TableItem::Keyed(parse_expr(key)?, parse_expr(value)?));
            }
            Rule::named_item => {
                let mut inner = item.into_inner();
                let name = inner
                    .next()
                    .ok_or_else(|| ExdbError::Parse("expected entry name".to_string()))?
                    .as_str()
                    .to_string();
                let value = inner
                    .next()
                    .ok_or_else(|| ExdbError::Parse("expected entry value".to_string()))?;
                items.push(TableItem::Named(name, parse_expr(value)?));
            }
            Rule::positional_item => {
                let value = item
                    .into_inner()
                    .next()
                    .ok_or_else(|| ExdbError::Parse("expected entry value".to_string()))?;
                items.push(TableItem::Positional(parse_expr(value)?));
            }
            _ => {
                return Err(ExdbError::Parse(format!(
                    "unexpected table entry: {:?}",
                    item.as_rule()
                )))
            }
        }
    }

    Ok(Expr::Table(items))
}

fn unescape(quoted: &str) -> Result<String> {
    // strip the surrounding quotes
    let body = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            other => {
                return Err(ExdbError::Parse(format!(
                    "invalid escape sequence: \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }

    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
