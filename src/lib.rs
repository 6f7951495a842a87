//! ratlisp - A small Lisp dialect with an exact numeric tower
//!
//! This crate implements a compact S-expression interpreter: a reader that
//! turns text into expression trees, an evaluator with lexically scoped
//! closures, and quasiquote template expansion. Numbers are exact rationals
//! unless a float enters the computation:
//!
//! ```lisp
//! (/ 1 3)                      ; => 1/3      (exact)
//! (+ 1/2 0.5)                  ; => 1.0      (contagious float)
//! (define twice (lambda (x) (* 2 x)))
//! (twice 21)                   ; => 42
//! `(1 ,(+ 1 2) ,@(list 3 4))  ; => (1 3 3 4)
//! ```
//!
//! ## Modules
//!
//! - `number`: exact-rational / floating numeric tower
//! - `ast`: the expression data model (atoms, cons cells, closures)
//! - `reader`: S-expression parsing from text
//! - `evaluator`: environments, special forms, function application
//! - `quasiquote`: template expansion for `` ` ``/`,`/`,@`
//! - `builtins`: the initial global environment

use std::fmt;

use crate::ast::Expr;
use crate::evaluator::Env;

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed token, unmatched parenthesis, or premature end of input
    Syntax(String),
    /// Symbol lookup failed in the full environment chain
    UnboundSymbol(String),
    /// An operation received an operand of the wrong expression variant
    Type(String),
    /// Wrong argument count to a special form or function, including
    /// `&rest` placement violations
    Arity(String),
    /// Exact-fraction division or construction with a zero denominator
    DivisionByZero,
    /// `define` targeting a symbol already bound in the same scope
    Redefinition(String),
    /// The evaluated head of an application is not callable
    NotAFunction(String),
    /// `unquote`/`unquote-splice` outside a quasiquote template, or a
    /// splice in a position that cannot absorb a sequence
    InvalidUnquote(String),
}

impl Error {
    /// Arity error for an operation taking an exact argument count
    pub(crate) fn arity_exact(name: &str, expected: usize, got: usize) -> Self {
        Error::Arity(format!("'{name}' expects {expected} argument(s), got {got}"))
    }

    /// Arity error for an operation taking a minimum argument count
    pub(crate) fn arity_at_least(name: &str, expected: usize, got: usize) -> Self {
        Error::Arity(format!(
            "'{name}' expects at least {expected} argument(s), got {got}"
        ))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Syntax(msg) => write!(f, "SyntaxError: {msg}"),
            Error::UnboundSymbol(name) => {
                write!(f, "UnboundSymbolError: symbol '{name}' not found")
            }
            Error::Type(msg) => write!(f, "TypeError: {msg}"),
            Error::Arity(msg) => write!(f, "ArityError: {msg}"),
            Error::DivisionByZero => write!(f, "DivisionByZeroError: exact division by zero"),
            Error::Redefinition(name) => write!(
                f,
                "RedefinitionError: symbol '{name}' is already bound in this scope"
            ),
            Error::NotAFunction(what) => write!(f, "NotAFunctionError: cannot apply {what}"),
            Error::InvalidUnquote(msg) => write!(f, "InvalidUnquoteError: {msg}"),
        }
    }
}

pub mod ast;
pub mod builtins;
pub mod evaluator;
pub mod number;
pub mod quasiquote;
pub mod reader;

/// Read exactly one top-level form from `text` and evaluate it against `env`.
///
/// Text after the first complete form is ignored, so a caller feeding whole
/// lines can follow a form with a `;` comment. Errors from either phase
/// surface unchanged.
pub fn evaluate_one(text: &str, env: &Env) -> Result<Expr, Error> {
    let (form, _rest) = reader::read_form(text)?;
    evaluator::eval(&form, env)
}
