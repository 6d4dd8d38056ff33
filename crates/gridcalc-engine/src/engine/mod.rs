//! Spreadsheet engine API.
//!
//! This module provides the reactive core of the spreadsheet:
//!
//! - [`Position`], [`Size`] - Cell coordinates (A1 notation ↔ row/col indices)
//! - [`Content`], [`CellValue`] - What a cell holds and what it displays
//! - [`Cell`], [`CellView`] - Cells with memoized values and dependency edges
//! - [`Sheet`] - Sparse storage, cycle checks and cache invalidation
//! - [`Formula`], [`FormulaParser`], [`RhaiFormulaParser`] - Formula programs

mod cell;
mod content;
mod error;
mod formula;
mod graph;
mod position;
mod preprocess;
mod sheet;

pub use cell::{Cell, CellView};
pub use content::{CellValue, Content, ESCAPE_SIGN, FORMULA_SIGN};
pub use error::{ComputationError, FormulaParseError, Result, SheetError};
pub use formula::{Formula, FormulaParser, Lookup, RhaiFormulaParser};
pub use position::{MAX_COLS, MAX_ROWS, ParsePositionError, Position, Size};
pub use sheet::Sheet;
