//! Cell positions and A1 notation.
//!
//! Provides bidirectional conversion between spreadsheet-style references
//! (e.g., "A1", "B2", "AA100") and zero-indexed row/column coordinates.
//!
//! # Examples
//!
//! ```
//! use gridcalc_engine::engine::Position;
//!
//! let pos: Position = "B3".parse().unwrap();
//! assert_eq!(pos.col, 1); // 0-indexed
//! assert_eq!(pos.row, 2);
//! assert_eq!(pos.to_string(), "B3");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of addressable rows.
pub const MAX_ROWS: i32 = 16384;
/// Number of addressable columns.
pub const MAX_COLS: i32 = 16384;

/// A cell coordinate (0-indexed). Ordered row-major.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

/// Extent of the printable area of a sheet.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub rows: i32,
    pub cols: i32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid cell reference: {0}")]
pub struct ParsePositionError(pub String);

impl Position {
    pub const fn new(row: i32, col: i32) -> Position {
        Position { row, col }
    }

    pub fn is_valid(&self) -> bool {
        (0..MAX_ROWS).contains(&self.row) && (0..MAX_COLS).contains(&self.col)
    }

    /// Parse `letters` + `digits` A1 notation. Bounds are not checked here.
    pub(crate) fn parse_a1(name: &str) -> Option<Position> {
        let split = name.find(|c: char| !c.is_ascii_alphabetic())?;
        let (letters, numbers) = name.split_at(split);
        if letters.is_empty() || numbers.is_empty() || !numbers.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let mut col_acc = 0i32;
        for c in letters.to_ascii_uppercase().bytes() {
            let digit = (c - b'A') as i32 + 1;
            col_acc = col_acc.checked_mul(26)?.checked_add(digit)?;
        }
        let col = col_acc - 1;

        let row = numbers.parse::<i32>().ok()?.checked_sub(1)?;
        if row < 0 {
            return None;
        }

        Some(Position::new(row, col))
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: i32) -> String {
        let mut result = String::new();
        let mut n = col as i64 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }
}

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s).ok_or_else(|| ParsePositionError(s.to_string()))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.row < 0 || self.col < 0 {
            return write!(f, "({}, {})", self.row, self.col);
        }
        write!(f, "{}{}", Position::col_to_letters(self.col), self.row + 1)
    }
}
