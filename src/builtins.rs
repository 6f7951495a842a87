//! The initial global environment: a registry of native procedures.
//!
//! Every entry is an ordinary value bound in the global scope, so builtins
//! can be passed around, shadowed in child scopes, and re-bound to other
//! names like any closure:
//!
//! ```lisp
//! (define plus +)
//! (plus 1 2)        ; => 3
//! (apply + '(1 2))  ; => 3
//! ```
//!
//! Natives share one erased signature taking the evaluated argument slice
//! and the call-site environment; the evaluator validates each entry's
//! declared arity before the function pointer runs, so the implementations
//! only deal with operand types.

use std::process;

use crate::Error;
use crate::ast::{self, Expr, Native};
use crate::evaluator::{Env, apply_function, eval};
use crate::number::{Fraction, Number};

/// Expected number of arguments for a native procedure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    /// Check an actual argument count against this arity.
    pub(crate) fn validate(self, name: &str, got: usize) -> Result<(), Error> {
        match self {
            Arity::Exactly(expected) if got != expected => {
                Err(Error::arity_exact(name, expected, got))
            }
            Arity::AtLeast(expected) if got < expected => {
                Err(Error::arity_at_least(name, expected, got))
            }
            _ => Ok(()),
        }
    }
}

//
// Native implementations
//

fn number_of(value: &Expr, op: &str) -> Result<Number, Error> {
    match value {
        Expr::Number(n) => Ok(*n),
        other => Err(Error::Type(format!("'{op}' requires numbers, got {other}"))),
    }
}

/// In Lisp tradition, `eval` runs in the null lexical environment: the
/// root of the caller's scope chain, not the caller's own scope.
fn native_eval(args: &[Expr], env: &Env) -> Result<Expr, Error> {
    match args {
        [form] => eval(form, &env.root()),
        _ => Err(Error::arity_exact("eval", 1, args.len())),
    }
}

fn native_apply(args: &[Expr], env: &Env) -> Result<Expr, Error> {
    match args {
        [func, arg_list] => {
            let call_args = arg_list.list_to_vec()?;
            apply_function(func, &call_args, env)
        }
        _ => Err(Error::arity_exact("apply", 2, args.len())),
    }
}

fn native_atom(args: &[Expr], _env: &Env) -> Result<Expr, Error> {
    match args {
        [value] => Ok(ast::truth(!value.is_list())),
        _ => Err(Error::arity_exact("atom?", 1, args.len())),
    }
}

fn native_add(args: &[Expr], _env: &Env) -> Result<Expr, Error> {
    let mut sum = Number::Fraction(Fraction::ZERO);
    for arg in args {
        sum = sum + number_of(arg, "+")?;
    }
    Ok(Expr::Number(sum))
}

fn native_sub(args: &[Expr], _env: &Env) -> Result<Expr, Error> {
    let [first, rest @ ..] = args else {
        return Err(Error::arity_at_least("-", 1, 0));
    };
    let first = number_of(first, "-")?;
    if rest.is_empty() {
        return Ok(Expr::Number(-first));
    }
    let mut result = first;
    for arg in rest {
        result = result - number_of(arg, "-")?;
    }
    Ok(Expr::Number(result))
}

fn native_mul(args: &[Expr], _env: &Env) -> Result<Expr, Error> {
    let mut product = Number::Fraction(Fraction::ONE);
    for arg in args {
        product = product * number_of(arg, "*")?;
    }
    Ok(Expr::Number(product))
}

fn native_div(args: &[Expr], _env: &Env) -> Result<Expr, Error> {
    let [first, rest @ ..] = args else {
        return Err(Error::arity_at_least("/", 1, 0));
    };
    let first = number_of(first, "/")?;
    if rest.is_empty() {
        // Unary form is the reciprocal.
        return Ok(Expr::Number(Number::Fraction(Fraction::ONE).div(first)?));
    }
    let mut result = first;
    for arg in rest {
        result = result.div(number_of(arg, "/")?)?;
    }
    Ok(Expr::Number(result))
}

/// Structural numeric equality; a fraction and a float never compare equal.
fn native_numeq(args: &[Expr], _env: &Env) -> Result<Expr, Error> {
    let [first, rest @ ..] = args else {
        return Err(Error::arity_at_least("=", 1, 0));
    };
    let first = number_of(first, "=")?;
    for arg in rest {
        if number_of(arg, "=")? != first {
            return Ok(Expr::Nil);
        }
    }
    Ok(ast::truth(true))
}

fn native_cons(args: &[Expr], _env: &Env) -> Result<Expr, Error> {
    match args {
        [car, cdr] => Ok(Expr::cons(car.clone(), cdr.clone())),
        _ => Err(Error::arity_exact("cons", 2, args.len())),
    }
}

fn native_list(args: &[Expr], _env: &Env) -> Result<Expr, Error> {
    Ok(Expr::list(args.to_vec()))
}

fn native_append(args: &[Expr], _env: &Env) -> Result<Expr, Error> {
    let Some((last, front)) = args.split_last() else {
        return Ok(Expr::Nil);
    };
    // Every operand must be a proper list. The final one is shared as the
    // result's tail rather than rebuilt.
    last.list_to_vec()?;
    let mut result = last.clone();
    for arg in front.iter().rev() {
        for item in arg.list_to_vec()?.into_iter().rev() {
            result = Expr::cons(item, result);
        }
    }
    Ok(result)
}

fn native_car(args: &[Expr], _env: &Env) -> Result<Expr, Error> {
    match args {
        [Expr::Nil] => Ok(Expr::Nil), // nil is its own head
        [Expr::Pair(pair)] => Ok(pair.car.clone()),
        [other] => Err(Error::Type(format!("'car' requires a list, got {other}"))),
        _ => Err(Error::arity_exact("car", 1, args.len())),
    }
}

fn native_cdr(args: &[Expr], _env: &Env) -> Result<Expr, Error> {
    match args {
        [Expr::Nil] => Ok(Expr::Nil), // nil is its own tail
        [Expr::Pair(pair)] => Ok(pair.cdr.clone()),
        [other] => Err(Error::Type(format!("'cdr' requires a list, got {other}"))),
        _ => Err(Error::arity_exact("cdr", 1, args.len())),
    }
}

fn native_len(args: &[Expr], _env: &Env) -> Result<Expr, Error> {
    let [list] = args else {
        return Err(Error::arity_exact("len", 1, args.len()));
    };
    let mut count: i64 = 0;
    let mut cursor = list;
    loop {
        match cursor {
            Expr::Nil => return Ok(ast::int(count)),
            Expr::Pair(pair) => {
                count += 1;
                cursor = &pair.cdr;
            }
            other => {
                return Err(Error::Type(format!(
                    "'len' requires a proper list, got {other}"
                )));
            }
        }
    }
}

fn native_quit(_args: &[Expr], _env: &Env) -> Result<Expr, Error> {
    process::exit(0);
}

/// Registry of all native procedures installed into the global environment.
const NATIVES: &[Native] = &[
    Native { name: "eval", arity: Arity::Exactly(1), func: native_eval },
    Native { name: "apply", arity: Arity::Exactly(2), func: native_apply },
    Native { name: "atom?", arity: Arity::Exactly(1), func: native_atom },
    Native { name: "+", arity: Arity::AtLeast(0), func: native_add },
    Native { name: "-", arity: Arity::AtLeast(1), func: native_sub },
    Native { name: "*", arity: Arity::AtLeast(0), func: native_mul },
    Native { name: "/", arity: Arity::AtLeast(1), func: native_div },
    Native { name: "=", arity: Arity::AtLeast(1), func: native_numeq },
    Native { name: "cons", arity: Arity::Exactly(2), func: native_cons },
    Native { name: "list", arity: Arity::AtLeast(0), func: native_list },
    Native { name: "append", arity: Arity::AtLeast(0), func: native_append },
    Native { name: "car", arity: Arity::Exactly(1), func: native_car },
    Native { name: "cdr", arity: Arity::Exactly(1), func: native_cdr },
    Native { name: "len", arity: Arity::Exactly(1), func: native_len },
    Native { name: "quit", arity: Arity::AtLeast(0), func: native_quit },
];

/// Build the global environment with every native procedure bound.
pub fn create_global_env() -> Env {
    let env = Env::new();
    for native in NATIVES {
        env.bind(native.name, Expr::Native(*native));
    }
    env
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::reader::read_form;

    /// Test result variants for builtin tests
    #[derive(Debug)]
    enum TestResult {
        Prints(&'static str),        // Evaluation succeeds and prints as this
        SpecificError(&'static str), // Evaluation fails; message contains this
    }
    use TestResult::*;

    fn run_builtin_tests(test_cases: Vec<(&str, TestResult)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let test_id = format!("Builtin test #{}", i + 1);
            let env = create_global_env();
            let (form, _rest) = read_form(input)
                .unwrap_or_else(|e| panic!("{test_id}: read error for '{input}': {e}"));

            match (eval(&form, &env), expected) {
                (Ok(actual), Prints(expected_text)) => {
                    assert_eq!(
                        format!("{actual}"),
                        *expected_text,
                        "{test_id}: result mismatch for '{input}'"
                    );
                }
                (Err(err), SpecificError(expected_text)) => {
                    let message = format!("{err}");
                    assert!(
                        message.contains(expected_text),
                        "{test_id}: error '{message}' should contain '{expected_text}'"
                    );
                }
                (Ok(actual), SpecificError(expected_text)) => {
                    panic!("{test_id}: expected error containing '{expected_text}', got {actual}")
                }
                (Err(err), Prints(expected_text)) => {
                    panic!("{test_id}: expected '{expected_text}', got error {err}")
                }
            }
        }
    }

    #[test]
    fn test_arithmetic() {
        let test_cases = vec![
            // Folds over the exact tower
            ("(+ 1 2 3)", Prints("6")),
            ("(+)", Prints("0")),
            ("(+ 42)", Prints("42")),
            ("(+ 1/2 1/3)", Prints("5/6")),
            ("(- 10 3 2)", Prints("5")),
            ("(- 5)", Prints("-5")),
            ("(- 1/2)", Prints("-1/2")),
            ("(* 2 3 4)", Prints("24")),
            ("(*)", Prints("1")),
            ("(* 2/3 3/4)", Prints("1/2")),
            ("(/ 1 3)", Prints("1/3")),
            ("(/ 4)", Prints("1/4")),
            ("(/ 12 2 3)", Prints("2")),
            ("(/ 1 -2)", Prints("-1/2")),
            // Float contagion
            ("(+ 1/2 0.5)", Prints("1.0")),
            ("(* 3 0.5)", Prints("1.5")),
            ("(- 1.5 1)", Prints("0.5")),
            // Division by zero: exact fails, float follows IEEE
            ("(/ 1 0)", SpecificError("DivisionByZeroError")),
            ("(/ 0)", SpecificError("DivisionByZeroError")),
            ("(/ 1 0.0)", Prints("inf")),
            ("(/ -1 0.0)", Prints("-inf")),
            // Arity
            ("(-)", SpecificError("ArityError")),
            ("(/)", SpecificError("ArityError")),
            // Type errors
            ("(+ 1 \"x\")", SpecificError("TypeError")),
            ("(* t 2)", SpecificError("TypeError")),
            ("(- '(1))", SpecificError("TypeError")),
        ];
        run_builtin_tests(test_cases);
    }

    #[test]
    fn test_numeric_equality() {
        let test_cases = vec![
            ("(= 1 1)", Prints("t")),
            ("(= 1 1 1)", Prints("t")),
            ("(= 1 2)", Prints("nil")),
            ("(= 1 1 2)", Prints("nil")),
            ("(= 5)", Prints("t")), // vacuously all-equal
            ("(= 2/4 1/2)", Prints("t")),
            ("(= 0.5 0.5)", Prints("t")),
            // Cross-type equality is false, not an error
            ("(= 1 1.0)", Prints("nil")),
            ("(=)", SpecificError("ArityError")),
            ("(= \"a\" \"a\")", SpecificError("TypeError")),
            ("(= 1 'x)", SpecificError("TypeError")),
        ];
        run_builtin_tests(test_cases);
    }

    #[test]
    fn test_list_primitives() {
        let test_cases = vec![
            ("(cons 1 nil)", Prints("(1)")),
            ("(cons 1 '(2 3))", Prints("(1 2 3)")),
            ("(cons 1 2)", Prints("(1 . 2)")), // dotted tails are fine
            ("(cons 1)", SpecificError("ArityError")),
            ("(list)", Prints("nil")),
            ("(list 1 2 3)", Prints("(1 2 3)")),
            ("(list (+ 1 2) 'x)", Prints("(3 x)")),
            ("(append)", Prints("nil")),
            ("(append '(1 2))", Prints("(1 2)")),
            ("(append '(1 2) '(3) nil '(4 5))", Prints("(1 2 3 4 5)")),
            ("(append nil nil)", Prints("nil")),
            ("(append '(1) 2)", SpecificError("TypeError")),
            ("(append (cons 1 2) '(3))", SpecificError("TypeError")),
            // car/cdr; nil is self-head and self-tail
            ("(car '(1 2 3))", Prints("1")),
            ("(cdr '(1 2 3))", Prints("(2 3)")),
            ("(cdr '(1))", Prints("nil")),
            ("(car nil)", Prints("nil")),
            ("(cdr nil)", Prints("nil")),
            ("(car (cons 1 2))", Prints("1")),
            ("(cdr (cons 1 2))", Prints("2")),
            ("(car 5)", SpecificError("TypeError")),
            ("(cdr \"s\")", SpecificError("TypeError")),
            ("(car)", SpecificError("ArityError")),
            ("(car '(1) '(2))", SpecificError("ArityError")),
            // len
            ("(len '(1 2 3))", Prints("3")),
            ("(len nil)", Prints("0")),
            ("(len (list 1))", Prints("1")),
            ("(len (cons 1 2))", SpecificError("TypeError")),
            ("(len 5)", SpecificError("TypeError")),
        ];
        run_builtin_tests(test_cases);
    }

    #[test]
    fn test_atom_predicate() {
        let test_cases = vec![
            ("(atom? 1)", Prints("t")),
            ("(atom? 'x)", Prints("t")),
            ("(atom? \"s\")", Prints("t")),
            ("(atom? 1.5)", Prints("t")),
            ("(atom? (lambda (x) x))", Prints("t")),
            // Both list variants are non-atoms
            ("(atom? nil)", Prints("nil")),
            ("(atom? '(1 2))", Prints("nil")),
            ("(atom? (cons 1 2))", Prints("nil")),
        ];
        run_builtin_tests(test_cases);
    }

    #[test]
    fn test_eval_and_apply() {
        let test_cases = vec![
            ("(eval '(+ 1 2))", Prints("3")),
            ("(eval ''x)", Prints("x")),
            ("(eval 1)", Prints("1")),
            ("(apply + '(1 2 3))", Prints("6")),
            ("(apply (lambda (a b) (* a b)) '(3 4))", Prints("12")),
            ("(apply cons '(1 nil))", Prints("(1)")),
            ("(apply + nil)", Prints("0")),
            ("(apply 1 '(1))", SpecificError("NotAFunctionError")),
            ("(apply + 5)", SpecificError("TypeError")),
            ("(apply +)", SpecificError("ArityError")),
        ];
        run_builtin_tests(test_cases);
    }

    #[test]
    fn test_eval_runs_in_the_global_environment() {
        let env = create_global_env();
        let run = |text: &str| {
            let (form, _rest) = read_form(text).unwrap();
            eval(&form, &env)
        };
        run("(define x 1)").unwrap();
        // The let-bound x is invisible to eval, which resolves against the
        // root scope.
        let result = run("(let ((x 2)) (eval 'x))").unwrap();
        assert_eq!(format!("{result}"), "1");
    }

    #[test]
    fn test_natives_are_first_class() {
        let env = create_global_env();
        let run = |text: &str| {
            let (form, _rest) = read_form(text).unwrap();
            eval(&form, &env)
        };
        run("(define plus +)").unwrap();
        assert_eq!(format!("{}", run("(plus 1 2)").unwrap()), "3");
        // Builtins can be shadowed in a child scope without harming the
        // global binding.
        let shadowed = run("(let ((car cdr)) (car '(1 2 3)))").unwrap();
        assert_eq!(format!("{shadowed}"), "(2 3)");
        assert_eq!(format!("{}", run("(car '(1 2 3))").unwrap()), "1");
    }
}
