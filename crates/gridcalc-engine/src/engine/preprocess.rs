//! Formula preprocessing.
//!
//! Rewrites A1 references such as `B2` into Rhai scope variables (`cell_r1_c1`)
//! and collects the referenced positions. References inside string literals
//! are left untouched.

use regex::Regex;
use std::sync::OnceLock;

use super::position::Position;

/// A formula expression rewritten for Rhai evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Preprocessed {
    pub script: String,
    /// Every reference found, sorted and de-duplicated. May include positions
    /// outside the grid bounds.
    pub references: Vec<Position>,
}

/// Scope variable that carries the value of the cell at `pos`.
pub(crate) fn variable_name(pos: Position) -> String {
    format!("cell_r{}_c{}", pos.row, pos.col)
}

fn cell_ref_re() -> &'static Regex {
    static CELL_RE: OnceLock<Regex> = OnceLock::new();
    CELL_RE.get_or_init(|| {
        Regex::new(r"\b([A-Z]+)([0-9]+)\b").expect("cell reference regex must compile")
    })
}

pub(crate) fn preprocess_expression(expression: &str) -> Preprocessed {
    let mut references = Vec::new();

    let mut replace_cells = |seg: &str, out: &mut String| {
        let replaced = cell_ref_re().replace_all(seg, |caps: &regex::Captures| {
            // `LOG10(` is a function call, not a cell.
            let end = caps.get(0).map_or(seg.len(), |m| m.end());
            if seg[end..].trim_start().starts_with('(') {
                return caps[0].to_string();
            }
            match Position::parse_a1(&caps[0]) {
                Some(pos) => {
                    references.push(pos);
                    variable_name(pos)
                }
                None => caps[0].to_string(),
            }
        });
        out.push_str(&replaced);
    };

    let bytes = expression.as_bytes();
    let mut out = String::with_capacity(expression.len());
    let mut seg_start = 0;
    let mut in_string = false;
    let mut backslashes = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if b == b'\\' {
                backslashes += 1;
                i += 1;
                continue;
            }
            if b == b'"' && backslashes % 2 == 0 {
                out.push_str(&expression[seg_start..=i]);
                in_string = false;
                seg_start = i + 1;
            }
            backslashes = 0;
            i += 1;
            continue;
        }

        if b == b'"' {
            replace_cells(&expression[seg_start..i], &mut out);
            in_string = true;
            seg_start = i;
            backslashes = 0;
        }
        i += 1;
    }

    if seg_start < expression.len() {
        if in_string {
            out.push_str(&expression[seg_start..]);
        } else {
            replace_cells(&expression[seg_start..], &mut out);
        }
    }

    references.sort();
    references.dedup();

    Preprocessed {
        script: out,
        references,
    }
}
