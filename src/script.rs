//! Line-oriented command runner.
//!
//! ```text
//! # comment
//! set A1 =B1 + 1
//! set B1 5
//! get A1
//! values
//! ```

use crate::error::{GridcalcError, Result};
use gridcalc_engine::engine::{Position, Sheet};
use std::io::{BufRead, Write};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Text is everything after the position and one space; may be empty.
    Set(Position, String),
    Clear(Position),
    Get(Position),
    Text(Position),
    Refs(Position),
    Size,
    Values,
    Texts,
}

fn split_word(s: &str) -> (&str, &str) {
    s.split_once(' ').unwrap_or((s, ""))
}

fn parse_position(name: &str) -> std::result::Result<Position, String> {
    name.parse::<Position>().map_err(|e| e.to_string())
}

fn single_position(keyword: &str, rest: &str) -> std::result::Result<Position, String> {
    let name = rest.trim();
    if name.is_empty() {
        return Err(format!("'{}' requires a cell", keyword));
    }
    if name.contains(char::is_whitespace) {
        return Err(format!("'{}' takes a single cell, got '{}'", keyword, name));
    }
    parse_position(name)
}

/// Parse one line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> std::result::Result<Option<Command>, String> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (keyword, rest) = split_word(line);
    let command = match keyword {
        "set" => {
            let (name, text) = split_word(rest.trim_start());
            if name.is_empty() {
                return Err("'set' requires a cell".to_string());
            }
            Command::Set(parse_position(name)?, text.to_string())
        }
        "clear" => Command::Clear(single_position(keyword, rest)?),
        "get" => Command::Get(single_position(keyword, rest)?),
        "text" => Command::Text(single_position(keyword, rest)?),
        "refs" => Command::Refs(single_position(keyword, rest)?),
        "size" | "values" | "texts" if !rest.trim().is_empty() => {
            return Err(format!("'{}' takes no arguments", keyword));
        }
        "size" => Command::Size,
        "values" => Command::Values,
        "texts" => Command::Texts,
        other => return Err(format!("Unknown command: {}", other)),
    };
    Ok(Some(command))
}

/// Runs commands against a sheet, writing results to `out`.
pub struct Runner<W: Write> {
    sheet: Sheet,
    out: W,
    failures: usize,
}

impl<W: Write> Runner<W> {
    pub fn new(sheet: Sheet, out: W) -> Self {
        Runner {
            sheet,
            out,
            failures: 0,
        }
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn into_parts(self) -> (Sheet, W) {
        (self.sheet, self.out)
    }

    /// Run every line of `input`. Command errors are reported to stderr and
    /// counted; only I/O errors abort.
    pub fn run_lines(&mut self, input: impl BufRead) -> Result<()> {
        for (idx, line) in input.lines().enumerate() {
            let line = line?;
            self.run_reporting(idx + 1, &line)?;
        }
        Ok(())
    }

    /// Run one line, reporting command errors to stderr.
    pub fn run_reporting(&mut self, line_no: usize, line: &str) -> Result<()> {
        match self.run_line(line_no, line) {
            Err(GridcalcError::Io(err)) => Err(GridcalcError::Io(err)),
            Err(err) => {
                eprintln!("Error: {}", err);
                self.failures += 1;
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    pub fn run_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        let command = parse_command(line).map_err(|message| GridcalcError::Parse {
            line: line_no,
            message,
        })?;
        let Some(command) = command else {
            return Ok(());
        };
        tracing::trace!(line = line_no, ?command, "running command");

        let sheet_err = |source| GridcalcError::Sheet {
            line: line_no,
            source,
        };

        match command {
            Command::Set(pos, text) => self.sheet.set_cell(pos, &text).map_err(sheet_err)?,
            Command::Clear(pos) => self.sheet.clear_cell(pos).map_err(sheet_err)?,
            Command::Get(pos) => {
                let value = self.sheet.cell(pos).map_err(sheet_err)?.map(|c| c.value());
                match value {
                    Some(value) => writeln!(self.out, "{}", value)?,
                    None => writeln!(self.out)?,
                }
            }
            Command::Text(pos) => {
                let text = self.sheet.cell(pos).map_err(sheet_err)?.map(|c| c.text());
                writeln!(self.out, "{}", text.unwrap_or_default())?;
            }
            Command::Refs(pos) => {
                let refs = self
                    .sheet
                    .cell(pos)
                    .map_err(sheet_err)?
                    .map(|c| c.referenced_cells())
                    .unwrap_or_default();
                let names: Vec<String> = refs.iter().map(ToString::to_string).collect();
                writeln!(self.out, "{}", names.join(","))?;
            }
            Command::Size => {
                let size = self.sheet.printable_size();
                writeln!(self.out, "{} {}", size.rows, size.cols)?;
            }
            Command::Values => self.sheet.print_values(&mut self.out)?,
            Command::Texts => self.sheet.print_texts(&mut self.out)?,
        }
        Ok(())
    }
}
