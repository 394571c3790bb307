//! Error types for exdb

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExdbError {
    /// The producer script failed to parse. The message is the parser's
    /// own report, passed through verbatim.
    #[error("{0}")]
    Parse(String),

    /// The producer script failed while executing. The message is the
    /// producer's own error text, passed through verbatim.
    #[error("{0}")]
    Script(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The handle's key no longer resolves to a live table in its
    /// producer environment (environment closed, or table reclaimed).
    #[error("invalid external table {key} of {env}")]
    Stale { key: String, env: String },

    /// A `get` used a key kind with no cross-environment representation.
    #[error("unsupported key type {0}")]
    UnsupportedKey(&'static str),

    /// Marshaling hit a value kind with no cross-environment
    /// representation.
    #[error("unsupported value type ({0})")]
    UnsupportedValue(&'static str),

    /// The previous key handed to an iteration step is not present in
    /// the table.
    #[error("invalid key to iteration")]
    InvalidIteration,

    /// A path step addressed a value that is not a table.
    #[error("not a table: {0}")]
    NotContainer(String),
}

pub type Result<T> = std::result::Result<T, ExdbError>;
