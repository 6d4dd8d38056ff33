//! Cell content variants and the text encoding convention.
//!
//! - `""` -> [`Content::Empty`]
//! - `=expr` (longer than the sign alone) -> [`Content::Formula`]
//! - anything else, including a lone `=` -> [`Content::Text`]
//!
//! A leading `'` escapes text: it is kept in the stored text and dropped
//! from the displayed value.

use std::fmt;

use super::error::{ComputationError, FormulaParseError};
use super::formula::{Formula, FormulaParser};
use super::position::Position;

pub const FORMULA_SIGN: char = '=';
pub const ESCAPE_SIGN: char = '\'';

/// The value a cell displays.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Error(ComputationError),
}

impl CellValue {
    pub fn empty() -> Self {
        CellValue::Text(String::new())
    }
}

impl From<Result<f64, ComputationError>> for CellValue {
    fn from(result: Result<f64, ComputationError>) -> Self {
        match result {
            Ok(n) => CellValue::Number(n),
            Err(e) => CellValue::Error(e),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

/// What a cell holds.
#[derive(Debug, Default)]
pub enum Content {
    #[default]
    Empty,
    Text(String),
    Formula(Box<dyn Formula>),
}

impl Content {
    /// Build content from raw input. Never touches the sheet.
    pub fn parse(text: &str, parser: &dyn FormulaParser) -> Result<Content, FormulaParseError> {
        if text.is_empty() {
            return Ok(Content::Empty);
        }
        match text.strip_prefix(FORMULA_SIGN) {
            Some(expression) if !expression.is_empty() => {
                Ok(Content::Formula(parser.parse(expression)?))
            }
            _ => Ok(Content::Text(text.to_string())),
        }
    }

    /// Stored text, as it would be entered.
    pub fn text(&self) -> String {
        match self {
            Content::Empty => String::new(),
            Content::Text(raw) => raw.clone(),
            Content::Formula(formula) => format!("{}{}", FORMULA_SIGN, formula.expression()),
        }
    }

    /// Displayed value for non-formula content; formulas need the sheet.
    pub(crate) fn static_value(&self) -> Option<CellValue> {
        match self {
            Content::Empty => Some(CellValue::empty()),
            Content::Text(raw) => {
                let shown = raw.strip_prefix(ESCAPE_SIGN).unwrap_or(raw);
                Some(CellValue::Text(shown.to_string()))
            }
            Content::Formula(_) => None,
        }
    }

    pub fn referenced_cells(&self) -> &[Position] {
        match self {
            Content::Formula(formula) => formula.referenced_cells(),
            Content::Empty | Content::Text(_) => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Content::Empty)
    }
}
