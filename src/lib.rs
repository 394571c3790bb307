//! Exdb - read-only table databases shared across isolated script
//! environments
//!
//! A database script runs once in its own isolated environment; the
//! tables it builds stay there. Consumers get identity-preserving,
//! read-only proxy handles instead of copies: primitives marshal by
//! value on access, nested tables marshal by reference into further
//! handles, and the same producer table always yields the same handle
//! per session. Closing the runtime closes every environment and
//! invalidates every handle that pointed into one.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), exdb::ExdbError> {
//! use exdb::{Runtime, Value};
//!
//! let runtime = Runtime::new();
//! let session = runtime.session();
//!
//! // db.exdb:  x = 1  y = "two"  nested = { a = true }
//! let db = session.open("db.exdb")?;
//!
//! assert_eq!(db.get("x")?, Value::Int(1));
//! if let Value::Table(nested) = db.get("nested")? {
//!     assert_eq!(nested.get("a")?, Value::Bool(true));
//! }
//!
//! for entry in &db {
//!     let (key, value) = entry?;
//!     println!("{} = {}", key, value);
//! }
//!
//! runtime.close_all();
//! assert!(db.get("x").is_err());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod engine;
pub mod env;
pub mod error;
pub mod output;
pub mod parser;
pub mod proxy;
pub mod runtime;
pub mod script;

#[cfg(feature = "repl")]
pub mod repl;

pub use error::{ExdbError, Result};
pub use output::{format_value, OutputFormat};
pub use parser::{parse_program, Program};
pub use proxy::{Entries, Proxy, Value};
pub use runtime::{EnvId, Runtime, Session};
pub use script::{validate_program, ValidationIssue, ValidationOptions};
