//! Loading and validating database scripts

pub mod validator;

pub use validator::{
    has_errors, validate_program, ValidationIssue, ValidationOptions, ValidationSeverity,
};

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::parser::{parse_program, Program};

/// Read and parse a script file without executing it.
pub fn read_program(path: &Path) -> Result<Program> {
    let content = fs::read_to_string(path)?;
    parse_program(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_program_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "x = 1\ny = 2").unwrap();
        let program = read_program(file.path()).unwrap();
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn test_read_program_missing_file() {
        let result = read_program(Path::new("/nonexistent/db.exdb"));
        assert!(matches!(result, Err(crate::ExdbError::Io(_))));
    }
}
