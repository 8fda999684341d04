// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Safe expression evaluation for templated node configs.
//!
//! A deliberately small language: literals, identifiers resolved against
//! run variables, arithmetic, comparison, and boolean operators. No
//! attribute access, no calls, no subscripting — anything outside the
//! grammar fails to parse and the caller falls back to treating the text
//! as a literal string.

mod eval;
mod lexer;
mod parser;

pub use eval::{evaluate, EvalError};
pub use lexer::{LexError, Token};
pub use parser::{parse, Expr, ParseError};

use armada_core::Value;
use std::collections::HashMap;

/// Parse and evaluate in one step.
pub fn eval_str(src: &str, vars: &HashMap<String, Value>) -> Result<Value, ExprError> {
    let expr = parse(src)?;
    Ok(evaluate(&expr, vars)?)
}

/// Whether `src` parses under the safe grammar.
pub fn is_safe_expression(src: &str) -> bool {
    parse(src).is_ok()
}

/// Either phase of expression handling failing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

#[cfg(test)]
#[path = "expr_tests.rs"]
mod tests;
