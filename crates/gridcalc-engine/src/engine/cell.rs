//! Cell data structures for the spreadsheet grid.
//!
//! - [`Cell`] - content, memoized value and both dependency edge sets
//! - [`CellView`] - read-only handle returned by [`Sheet::cell`](super::Sheet::cell)
//!
//! Edges are stored as [`Position`]s: the sheet owns every cell, and a cell
//! only names its neighbours.

use std::cell::RefCell;
use std::collections::BTreeSet;

use super::content::{CellValue, Content};
use super::position::Position;
use super::sheet::Sheet;

/// A cell in the spreadsheet grid.
#[derive(Debug, Default)]
pub struct Cell {
    pub(crate) content: Content,
    /// Memoized formula result; `None` means it must be recomputed.
    pub(crate) cached_value: RefCell<Option<CellValue>>,
    /// Cells this one reads.
    pub(crate) depends_on: BTreeSet<Position>,
    /// Cells that read this one.
    pub(crate) depended_by: BTreeSet<Position>,
}

impl Cell {
    pub fn new_empty() -> Cell {
        Cell::default()
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn depends_on(&self) -> &BTreeSet<Position> {
        &self.depends_on
    }

    pub fn depended_by(&self) -> &BTreeSet<Position> {
        &self.depended_by
    }

    pub fn is_referenced(&self) -> bool {
        !self.depended_by.is_empty()
    }

    pub(crate) fn has_cached_value(&self) -> bool {
        self.cached_value.borrow().is_some()
    }

    /// Drop the memoized value. Returns whether there was one.
    pub(crate) fn invalidate(&self) -> bool {
        self.cached_value.borrow_mut().take().is_some()
    }

    /// A formula whose value must be computed before it can be read.
    pub(crate) fn is_stale_formula(&self) -> bool {
        matches!(self.content, Content::Formula(_)) && !self.has_cached_value()
    }
}

/// Read-only view of a live cell.
#[derive(Clone, Copy)]
pub struct CellView<'a> {
    pub(crate) sheet: &'a Sheet,
    pub(crate) pos: Position,
    pub(crate) cell: &'a Cell,
}

impl<'a> CellView<'a> {
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Stored text (`=` + expression for formulas, escape marker retained).
    pub fn text(&self) -> String {
        self.cell.content.text()
    }

    /// Displayed value, computing and memoizing formulas as needed.
    pub fn value(&self) -> CellValue {
        self.sheet.value_of(self.cell)
    }

    pub fn referenced_cells(&self) -> Vec<Position> {
        self.cell.content.referenced_cells().to_vec()
    }

    pub fn cell(&self) -> &'a Cell {
        self.cell
    }
}

impl std::fmt::Debug for CellView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellView")
            .field("pos", &self.pos)
            .field("cell", self.cell)
            .finish()
    }
}
