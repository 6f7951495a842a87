//! The expression data model. The main enum, [`Expr`], is the single closed
//! variant type covering every readable and evaluable value: symbols,
//! numbers, strings, the empty list, cons cells, user closures, and native
//! procedures. Cons cells are immutable and reference counted, so list tails
//! are shared structurally rather than copied. Equality and display follow
//! Lisp conventions: symbols compare by name, `nil` prints as `nil`, and a
//! non-`nil` list tail prints after a literal `.`.

use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::builtins::Arity;
use crate::evaluator::Env;
use crate::number::Number;

/// The canonical truthy literal.
pub const T: &str = "t";

/// Core expression type.
///
/// Everything the reader produces and the evaluator returns is an `Expr`.
/// `Pair` and `Closure` are behind `Rc` so results can share structure with
/// their inputs; no variant is mutated after construction.
#[derive(Clone)]
pub enum Expr {
    /// Symbols (identifiers); equality is by name only
    Symbol(String),
    /// Exact fractions and floats, see [`crate::number`]
    Number(Number),
    /// String literals, stored with their escapes verbatim
    Str(String),
    /// The empty list. `nil` is its own head and tail.
    Nil,
    /// A cons cell. The tail may be any expression; a proper list is a
    /// chain of pairs ending in `Nil`.
    Pair(Rc<Pair>),
    /// A user function: parameters, body, and the defining environment
    /// (shared, not copied)
    Closure(Rc<Closure>),
    /// A native procedure from the initial global environment.
    /// Compared by name rather than function pointer.
    Native(Native),
}

/// One immutable cons cell.
pub struct Pair {
    pub car: Expr,
    pub cdr: Expr,
}

/// A user-defined function value.
pub struct Closure {
    /// Positional parameter names, `&rest` marker already stripped
    pub params: Vec<String>,
    /// Name binding the remainder of the argument list, if the parameter
    /// list ended in `&rest <name>`
    pub rest: Option<String>,
    pub body: Expr,
    pub env: Env,
}

/// A builtin procedure descriptor. Arity is validated by the evaluator
/// before the function pointer is called.
#[derive(Clone, Copy)]
pub struct Native {
    pub name: &'static str,
    pub arity: Arity,
    pub func: fn(&[Expr], &Env) -> Result<Expr, Error>,
}

/// Helper for creating symbols.
pub fn sym(name: impl Into<String>) -> Expr {
    Expr::Symbol(name.into())
}

/// Helper for creating whole-number expressions.
pub fn int(value: i64) -> Expr {
    Expr::Number(Number::integer(value))
}

/// The canonical truthy/falsy encoding: `t` or `nil`.
pub fn truth(value: bool) -> Expr {
    if value { sym(T) } else { Expr::Nil }
}

impl Expr {
    /// Build one cons cell.
    pub fn cons(car: Expr, cdr: Expr) -> Expr {
        Expr::Pair(Rc::new(Pair { car, cdr }))
    }

    /// Build a proper list from items; empty input yields `Nil`.
    pub fn list(items: Vec<Expr>) -> Expr {
        items
            .into_iter()
            .rev()
            .fold(Expr::Nil, |tail, head| Expr::cons(head, tail))
    }

    /// True for both list variants, `Nil` and `Pair`.
    pub fn is_list(&self) -> bool {
        matches!(self, Expr::Nil | Expr::Pair(_))
    }

    /// Collect a proper list into a vector, failing on a non-`Nil` tail or
    /// a non-list argument.
    pub fn list_to_vec(&self) -> Result<Vec<Expr>, Error> {
        let mut items = Vec::new();
        let mut cursor = self;
        loop {
            match cursor {
                Expr::Nil => return Ok(items),
                Expr::Pair(pair) => {
                    items.push(pair.car.clone());
                    cursor = &pair.cdr;
                }
                other => return Err(Error::Type(format!("not a proper list: {other}"))),
            }
        }
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expr::Symbol(a), Expr::Symbol(b)) => a == b,
            (Expr::Number(a), Expr::Number(b)) => a == b,
            (Expr::Str(a), Expr::Str(b)) => a == b,
            (Expr::Nil, Expr::Nil) => true,
            (Expr::Pair(a), Expr::Pair(b)) => {
                Rc::ptr_eq(a, b) || (a.car == b.car && a.cdr == b.cdr)
            }
            // Closures have no useful structural equality; compare identity
            (Expr::Closure(a), Expr::Closure(b)) => Rc::ptr_eq(a, b),
            (Expr::Native(a), Expr::Native(b)) => a.name == b.name,
            _ => false, // Different variants are never equal
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Symbol(name) => write!(f, "Symbol({name})"),
            Expr::Number(n) => write!(f, "Number({n})"),
            Expr::Str(s) => write!(f, "Str(\"{s}\")"),
            Expr::Nil => write!(f, "Nil"),
            Expr::Pair(pair) => write!(f, "Pair({:?}, {:?})", pair.car, pair.cdr),
            // The captured environment is omitted: a closure stored in the
            // scope it captures would otherwise recurse forever.
            Expr::Closure(c) => write!(
                f,
                "Closure(params={:?}, rest={:?}, body={:?})",
                c.params, c.rest, c.body
            ),
            Expr::Native(native) => write!(f, "Native({})", native.name),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Symbol(name) => write!(f, "{name}"),
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Str(s) => write!(f, "\"{s}\""),
            Expr::Nil => write!(f, "nil"),
            Expr::Pair(pair) => {
                write!(f, "({}", pair.car)?;
                let mut tail = &pair.cdr;
                loop {
                    match tail {
                        Expr::Nil => break,
                        Expr::Pair(next) => {
                            write!(f, " {}", next.car)?;
                            tail = &next.cdr;
                        }
                        dotted => {
                            write!(f, " . {dotted}")?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
            Expr::Closure(_) => write!(f, "#<closure>"),
            Expr::Native(native) => write!(f, "#<native:{}>", native.name),
        }
    }
}
