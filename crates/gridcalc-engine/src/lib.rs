//! gridcalc_engine - Reactive spreadsheet core with Rhai formulas.

pub mod engine;
