//! Parser module for exdb database scripts

pub mod ast;
pub mod grammar;

pub use ast::*;
pub use grammar::parse_program;
