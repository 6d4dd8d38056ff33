//! Formula programs and the Rhai-backed parser.
//!
//! The sheet only talks to formulas through [`Formula`] and [`FormulaParser`]:
//! parse text into a program, evaluate it against a cell lookup, print it back,
//! and list the cells it reads. [`RhaiFormulaParser`] is the default backend.

use rhai::{AST, Dynamic, Engine, EvalAltResult, FLOAT, INT, Scope};
use std::fmt;
use std::rc::Rc;

use super::error::{ComputationError, FormulaParseError};
use super::position::Position;
use super::preprocess::{preprocess_expression, variable_name};

/// Upper bound on Rhai operations per evaluation.
const MAX_OPERATIONS: u64 = 1_000_000;

/// Resolves a referenced position to the numeric operand it contributes.
pub type Lookup<'a> = dyn FnMut(Position) -> Result<f64, ComputationError> + 'a;

/// A parsed formula expression.
pub trait Formula: fmt::Debug {
    fn evaluate(&self, lookup: &mut Lookup<'_>) -> Result<f64, ComputationError>;

    /// Expression text, without the leading `=`.
    fn expression(&self) -> &str;

    /// In-bounds cells the formula reads, sorted and de-duplicated.
    fn referenced_cells(&self) -> &[Position];
}

pub trait FormulaParser {
    fn parse(&self, expression: &str) -> Result<Box<dyn Formula>, FormulaParseError>;
}

fn create_engine() -> Engine {
    let mut engine = Engine::new();
    engine.set_strict_variables(true);
    engine.set_max_operations(MAX_OPERATIONS);
    // Allow `/` to be overloaded so integer division yields a fraction.
    engine.set_fast_operators(false);
    engine.register_fn("/", |a: INT, b: INT| -> FLOAT { a as FLOAT / b as FLOAT });
    engine
}

/// Parses formulas into Rhai expressions.
pub struct RhaiFormulaParser {
    engine: Rc<Engine>,
    functions: Option<AST>,
}

impl RhaiFormulaParser {
    pub fn new() -> Self {
        RhaiFormulaParser {
            engine: Rc::new(create_engine()),
            functions: None,
        }
    }

    /// Create a parser whose formulas may call the `fn` definitions in `script`.
    pub fn with_functions(script: &str) -> Result<Self, FormulaParseError> {
        let engine = create_engine();
        let functions = engine.compile(script).map_err(|e| {
            FormulaParseError::new(format!("Error in custom functions: {}", e))
        })?;
        Ok(RhaiFormulaParser {
            engine: Rc::new(engine),
            functions: Some(functions),
        })
    }
}

impl Default for RhaiFormulaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaParser for RhaiFormulaParser {
    fn parse(&self, expression: &str) -> Result<Box<dyn Formula>, FormulaParseError> {
        let pre = preprocess_expression(expression);

        // Declare every reference so strict variables accepts them.
        let mut scope = Scope::new();
        for pos in &pre.references {
            scope.push(variable_name(*pos), 0.0 as FLOAT);
        }
        let compiled = self
            .engine
            .compile_expression_with_scope(&scope, &pre.script)
            .map_err(|e| FormulaParseError::new(e.to_string()))?;

        let ast = match &self.functions {
            Some(functions) => functions.merge(&compiled),
            None => compiled,
        };
        let referenced_cells = pre.references.iter().copied().filter(Position::is_valid).collect();

        Ok(Box::new(RhaiFormula {
            engine: Rc::clone(&self.engine),
            ast,
            expression: expression.to_string(),
            references: pre.references,
            referenced_cells,
        }))
    }
}

struct RhaiFormula {
    engine: Rc<Engine>,
    ast: AST,
    expression: String,
    references: Vec<Position>,
    referenced_cells: Vec<Position>,
}

impl fmt::Debug for RhaiFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RhaiFormula")
            .field("expression", &self.expression)
            .field("references", &self.references)
            .finish()
    }
}

impl Formula for RhaiFormula {
    fn evaluate(&self, lookup: &mut Lookup<'_>) -> Result<f64, ComputationError> {
        if self.references.len() != self.referenced_cells.len() {
            return Err(ComputationError::Ref);
        }

        let mut scope = Scope::new();
        for pos in &self.references {
            let value = lookup(*pos)?;
            scope.push(variable_name(*pos), value as FLOAT);
        }

        match self.engine.eval_ast_with_scope::<Dynamic>(&mut scope, &self.ast) {
            Ok(value) => number_from_dynamic(&value),
            Err(err) => Err(computation_error(&err)),
        }
    }

    fn expression(&self) -> &str {
        &self.expression
    }

    fn referenced_cells(&self) -> &[Position] {
        &self.referenced_cells
    }
}

fn number_from_dynamic(value: &Dynamic) -> Result<f64, ComputationError> {
    if let Ok(n) = value.as_float() {
        if n.is_finite() {
            Ok(n)
        } else {
            Err(ComputationError::Div0)
        }
    } else if let Ok(n) = value.as_int() {
        Ok(n as f64)
    } else {
        Err(ComputationError::Value)
    }
}

fn computation_error(err: &EvalAltResult) -> ComputationError {
    match err {
        EvalAltResult::ErrorArithmetic(..) => ComputationError::Div0,
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => computation_error(inner),
        _ => ComputationError::Value,
    }
}
