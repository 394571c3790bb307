//! Interactive database inspector (feature `repl`)

pub mod interactive;

pub use interactive::run_repl;
