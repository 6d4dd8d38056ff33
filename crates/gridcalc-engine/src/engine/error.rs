//! Error types for the spreadsheet engine.

use std::fmt;
use thiserror::Error;

use super::position::Position;

/// Structural errors. Each one is detected before the sheet is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    #[error("Invalid position {0}")]
    InvalidPosition(Position),

    #[error("Circular dependency: {cell} would depend on itself")]
    CircularDependency { cell: Position },

    #[error(transparent)]
    FormulaParse(#[from] FormulaParseError),
}

pub type Result<T> = std::result::Result<T, SheetError>;

/// Malformed formula text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Formula error: {message}")]
pub struct FormulaParseError {
    pub message: String,
}

impl FormulaParseError {
    pub fn new(message: impl Into<String>) -> Self {
        FormulaParseError {
            message: message.into(),
        }
    }
}

/// Evaluation fault carried as a cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputationError {
    /// Reference to a position outside the grid.
    Ref,
    /// Operand or result that is not a number.
    Value,
    /// Division by zero or another arithmetic fault.
    Div0,
}

impl ComputationError {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComputationError::Ref => "#REF!",
            ComputationError::Value => "#VALUE!",
            ComputationError::Div0 => "#DIV/0!",
        }
    }
}

impl fmt::Display for ComputationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
