//! Error types for the Gridcalc command runner

use gridcalc_engine::engine::SheetError;
use thiserror::Error;

/// Errors that can occur while running commands
#[derive(Error, Debug)]
pub enum GridcalcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Line {line}: {source}")]
    Sheet {
        line: usize,
        #[source]
        source: SheetError,
    },
}

pub type Result<T> = std::result::Result<T, GridcalcError>;
