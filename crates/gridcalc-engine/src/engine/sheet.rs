//! Sparse sheet storage and edit orchestration.
//!
//! Cells live in a two-level `rows -> columns` vector that grows on demand.
//! Every edit validates, parses and cycle-checks before it touches storage,
//! so a failed edit leaves the sheet exactly as it was.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::io::{self, Write};
use std::ops::ControlFlow;

use tracing::{debug, trace};

use super::cell::{Cell, CellView};
use super::content::{CellValue, Content};
use super::error::{ComputationError, Result, SheetError};
use super::formula::{FormulaParser, RhaiFormulaParser};
use super::graph::walk;
use super::position::{Position, Size};

/// A single spreadsheet: owns every cell and the formula parser.
pub struct Sheet {
    rows: Vec<Vec<Option<Cell>>>,
    parser: Box<dyn FormulaParser>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::with_parser(Box::new(RhaiFormulaParser::new()))
    }

    pub fn with_parser(parser: Box<dyn FormulaParser>) -> Self {
        Sheet {
            rows: Vec::new(),
            parser,
        }
    }

    fn check_position(pos: Position) -> Result<()> {
        if pos.is_valid() {
            Ok(())
        } else {
            Err(SheetError::InvalidPosition(pos))
        }
    }

    /// Set cell contents from input text.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<()> {
        Self::check_position(pos)?;

        let content = Content::parse(text, self.parser.as_ref()).inspect_err(|err| {
            debug!(cell = %pos, %err, "rejected formula");
        })?;
        self.check_cycle(pos, content.referenced_cells())?;

        self.replace_content(pos, content);
        debug!(cell = %pos, text, "set cell");
        Ok(())
    }

    /// Look up a cell. Absent cells are `Ok(None)`.
    pub fn cell(&self, pos: Position) -> Result<Option<CellView<'_>>> {
        Self::check_position(pos)?;
        Ok(self.get(pos).map(|cell| CellView {
            sheet: self,
            pos,
            cell,
        }))
    }

    /// Clear the specified cell.
    ///
    /// A cell that other formulas read becomes empty but stays alive;
    /// otherwise it is removed and the row's empty tail is trimmed.
    pub fn clear_cell(&mut self, pos: Position) -> Result<()> {
        Self::check_position(pos)?;
        let Some(cell) = self.get(pos) else {
            return Ok(());
        };

        if cell.is_referenced() {
            self.replace_content(pos, Content::Empty);
            debug!(cell = %pos, "cleared cell, kept for dependents");
        } else {
            self.detach(pos);
            let row = &mut self.rows[pos.row as usize];
            row[pos.col as usize] = None;
            let len = row.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
            row.truncate(len);
            debug!(cell = %pos, "removed cell");
        }
        Ok(())
    }

    /// Smallest rectangle from `A1` that holds every non-empty cell.
    pub fn printable_size(&self) -> Size {
        let mut size = Size::default();
        for (r, row) in self.rows.iter().enumerate() {
            let cols = row
                .iter()
                .rposition(|slot| slot.as_ref().is_some_and(|cell| !cell.content.is_empty()))
                .map_or(0, |c| c + 1);
            if cols > 0 {
                size.rows = r as i32 + 1;
                size.cols = size.cols.max(cols as i32);
            }
        }
        size
    }

    /// Render displayed values, tab-separated, one line per row.
    pub fn print_values(&self, out: &mut impl Write) -> io::Result<()> {
        self.print_with(out, |cell| self.value_of(cell).to_string())
    }

    /// Render stored texts, tab-separated, one line per row.
    pub fn print_texts(&self, out: &mut impl Write) -> io::Result<()> {
        self.print_with(out, |cell| cell.content.text())
    }

    /// Positions of every live cell, row-major.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, slot)| slot.is_some())
                .map(move |(c, _)| Position::new(r as i32, c as i32))
        })
    }

    fn print_with(&self, out: &mut impl Write, render: impl Fn(&Cell) -> String) -> io::Result<()> {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    out.write_all(b"\t")?;
                }
                if let Some(cell) = self.get(Position::new(row, col)) {
                    out.write_all(render(cell).as_bytes())?;
                }
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn get(&self, pos: Position) -> Option<&Cell> {
        if !pos.is_valid() {
            return None;
        }
        self.rows
            .get(pos.row as usize)?
            .get(pos.col as usize)?
            .as_ref()
    }

    fn get_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        if !pos.is_valid() {
            return None;
        }
        self.rows
            .get_mut(pos.row as usize)?
            .get_mut(pos.col as usize)?
            .as_mut()
    }

    /// Fetch the cell at `pos`, materializing the slot and an empty cell if needed.
    fn get_or_create(&mut self, pos: Position) -> &mut Cell {
        let (r, c) = (pos.row as usize, pos.col as usize);
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let row = &mut self.rows[r];
        if row.len() <= c {
            row.resize_with(c + 1, || None);
        }
        row[c].get_or_insert_with(|| {
            trace!(cell = %pos, "created empty cell");
            Cell::new_empty()
        })
    }

    /// Fails if `target` is reachable from `references` along `depends_on`
    /// edges, i.e. if `target -> references` would close a cycle.
    fn check_cycle(&self, target: Position, references: &[Position]) -> Result<()> {
        let sheet = self;
        let flow = walk(
            references.iter().copied(),
            move |pos| {
                sheet
                    .get(pos)
                    .into_iter()
                    .flat_map(|cell| cell.depends_on.iter().copied())
            },
            |pos| {
                if pos == target {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        );

        if flow.is_break() {
            debug!(cell = %target, "rejected circular dependency");
            return Err(SheetError::CircularDependency { cell: target });
        }
        Ok(())
    }

    /// Swap in new content and rewire edges. The cycle check must have passed.
    fn replace_content(&mut self, pos: Position, content: Content) {
        let references: BTreeSet<Position> = content.referenced_cells().iter().copied().collect();

        self.get_or_create(pos);
        self.detach(pos);
        for dep in &references {
            self.get_or_create(*dep).depended_by.insert(pos);
        }

        let cell = self.get_or_create(pos);
        cell.depends_on = references;
        cell.content = content;

        self.invalidate(pos);
    }

    /// Drop every `depends_on` edge of `pos` together with its back-edge.
    fn detach(&mut self, pos: Position) {
        let Some(cell) = self.get_mut(pos) else {
            return;
        };
        for dep in std::mem::take(&mut cell.depends_on) {
            if let Some(dep_cell) = self.get_mut(dep) {
                dep_cell.depended_by.remove(&pos);
            }
        }
    }

    /// Clear the memoized value of `pos` and of everything that reads it.
    ///
    /// A formula without a cached value has no cached readers, so the sweep
    /// does not continue past one.
    fn invalidate(&self, pos: Position) {
        let sheet = self;
        let mut cleared = 0usize;
        let _ = walk::<(), _>(
            [pos],
            move |p| {
                let readers = sheet.get(p).filter(|cell| {
                    let was_cached = cell.invalidate();
                    p == pos || was_cached || !matches!(cell.content, Content::Formula(_))
                });
                readers
                    .into_iter()
                    .flat_map(|cell| cell.depended_by.iter().copied())
            },
            |_| {
                cleared += 1;
                ControlFlow::Continue(())
            },
        );
        trace!(cell = %pos, cleared, "invalidated cached values");
    }

    pub(crate) fn value_of(&self, cell: &Cell) -> CellValue {
        let Content::Formula(formula) = &cell.content else {
            return cell.content.static_value().unwrap_or_else(CellValue::empty);
        };

        if let Some(value) = cell.cached_value.borrow().as_ref() {
            return value.clone();
        }

        self.warm_dependencies(cell);
        let value = CellValue::from(formula.evaluate(&mut |pos| self.operand_at(pos)));
        *cell.cached_value.borrow_mut() = Some(value.clone());
        value
    }

    /// Evaluate the stale formulas `cell` reads, deepest first, so that every
    /// lookup made while evaluating `cell` hits a memoized value.
    fn warm_dependencies(&self, cell: &Cell) {
        let mut expanded = HashSet::new();
        let mut stack: Vec<(Position, bool)> =
            cell.depends_on.iter().map(|&dep| (dep, false)).collect();

        while let Some((pos, ready)) = stack.pop() {
            let Some(dep) = self.get(pos) else {
                continue;
            };
            if ready {
                // Everything `dep` reads is warm by now.
                self.value_of(dep);
                continue;
            }
            if !dep.is_stale_formula() || !expanded.insert(pos) {
                continue;
            }
            stack.push((pos, true));
            stack.extend(
                dep.depends_on
                    .iter()
                    .filter(|next| !expanded.contains(*next))
                    .map(|&next| (next, false)),
            );
        }
    }

    /// Numeric operand a formula gets when it reads `pos`.
    fn operand_at(&self, pos: Position) -> std::result::Result<f64, ComputationError> {
        if !pos.is_valid() {
            return Err(ComputationError::Ref);
        }
        let Some(cell) = self.get(pos) else {
            return Ok(0.0);
        };

        match self.value_of(cell) {
            CellValue::Number(n) => Ok(n),
            CellValue::Text(text) if text.is_empty() => Ok(0.0),
            CellValue::Text(text) => text
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or(ComputationError::Value),
            CellValue::Error(err) => Err(err),
        }
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sheet")
            .field("size", &self.printable_size())
            .field("cells", &self.positions().count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(name: &str) -> Position {
        name.parse().unwrap()
    }

    fn value(sheet: &Sheet, name: &str) -> CellValue {
        sheet.cell(pos(name)).unwrap().unwrap().value()
    }

    #[test]
    fn test_storage_grows_on_demand() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("C3"), "x").unwrap();
        assert_eq!(sheet.rows.len(), 3);
        assert!(sheet.rows[0].is_empty());
        assert_eq!(sheet.rows[2].len(), 3);
    }

    #[test]
    fn test_clear_trims_row_tail() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "a").unwrap();
        sheet.set_cell(pos("D1"), "d").unwrap();
        sheet.clear_cell(pos("D1")).unwrap();
        assert_eq!(sheet.rows[0].len(), 1);
        sheet.clear_cell(pos("A1")).unwrap();
        assert!(sheet.rows[0].is_empty());
    }

    #[test]
    fn test_clear_detaches_outgoing_edges() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.clear_cell(pos("A1")).unwrap();
        let b1 = sheet.get(pos("B1")).unwrap();
        assert!(b1.depended_by.is_empty());
    }

    #[test]
    fn test_forward_reference_creates_placeholder() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=C5 + 1").unwrap();
        let c5 = sheet.cell(pos("C5")).unwrap().unwrap();
        assert!(c5.cell().content().is_empty());
        assert!(c5.cell().depended_by().contains(&pos("A1")));
        assert_eq!(value(&sheet, "A1"), CellValue::Number(1.0));
    }

    #[test]
    fn test_failed_cycle_check_creates_nothing() {
        let mut sheet = Sheet::new();
        let err = sheet.set_cell(pos("A1"), "=A1").unwrap_err();
        assert_eq!(err, SheetError::CircularDependency { cell: pos("A1") });
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn test_value_is_memoized_and_invalidated() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1 * 2").unwrap();
        sheet.set_cell(pos("B1"), "3").unwrap();
        assert_eq!(value(&sheet, "A1"), CellValue::Number(6.0));
        assert!(sheet.get(pos("A1")).unwrap().has_cached_value());

        sheet.set_cell(pos("B1"), "4").unwrap();
        assert!(!sheet.get(pos("A1")).unwrap().has_cached_value());
        assert_eq!(value(&sheet, "A1"), CellValue::Number(8.0));
    }

    #[test]
    fn test_cold_read_warms_the_whole_chain() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=A2 + 1").unwrap();
        sheet.set_cell(pos("A2"), "=A3 + 1").unwrap();
        sheet.set_cell(pos("A3"), "=A4 + 1").unwrap();
        assert_eq!(value(&sheet, "A1"), CellValue::Number(3.0));
        for name in ["A1", "A2", "A3"] {
            assert!(sheet.get(pos(name)).unwrap().has_cached_value(), "{name}");
        }
    }

    #[test]
    fn test_invalidation_skips_past_stale_formulas_safely() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1 + 1").unwrap();
        sheet.set_cell(pos("B1"), "=C1 + 1").unwrap();
        sheet.set_cell(pos("C1"), "1").unwrap();

        // Nothing read yet: the sweep stops at B1.
        sheet.set_cell(pos("C1"), "2").unwrap();
        assert_eq!(value(&sheet, "A1"), CellValue::Number(4.0));

        // Warm caches are cleared all the way up.
        sheet.set_cell(pos("C1"), "5").unwrap();
        assert!(!sheet.get(pos("B1")).unwrap().has_cached_value());
        assert!(!sheet.get(pos("A1")).unwrap().has_cached_value());
        assert_eq!(value(&sheet, "A1"), CellValue::Number(7.0));

        // Only B1 warm; A1 stale above it.
        sheet.set_cell(pos("C1"), "0").unwrap();
        assert_eq!(value(&sheet, "B1"), CellValue::Number(1.0));
        sheet.set_cell(pos("C1"), "10").unwrap();
        assert_eq!(value(&sheet, "A1"), CellValue::Number(12.0));
    }

    #[test]
    fn test_errors_are_cached_and_invalidated() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=1 / B1").unwrap();
        assert_eq!(value(&sheet, "A1"), CellValue::Error(ComputationError::Div0));
        assert!(sheet.get(pos("A1")).unwrap().has_cached_value());

        sheet.set_cell(pos("B1"), "4").unwrap();
        assert_eq!(value(&sheet, "A1"), CellValue::Number(0.25));
    }

    #[test]
    fn test_operand_conversion() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "12").unwrap();
        sheet.set_cell(pos("A2"), "'3.5").unwrap();
        sheet.set_cell(pos("A3"), "abc").unwrap();
        sheet.set_cell(pos("B1"), "=A1 + A2").unwrap();
        sheet.set_cell(pos("B2"), "=A3 + 1").unwrap();
        sheet.set_cell(pos("B3"), "=B2 + 1").unwrap();
        assert_eq!(value(&sheet, "B1"), CellValue::Number(15.5));
        assert_eq!(value(&sheet, "B2"), CellValue::Error(ComputationError::Value));
        assert_eq!(value(&sheet, "B3"), CellValue::Error(ComputationError::Value));
    }

    #[test]
    fn test_positions_lists_live_cells() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("B2"), "=A1").unwrap();
        let live: Vec<Position> = sheet.positions().collect();
        assert_eq!(live, vec![pos("A1"), pos("B2")]);
    }
}
