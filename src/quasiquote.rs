//! Quasiquote template expansion.
//!
//! Expansion is the first half of a two-phase scheme: `expand` rewrites a
//! template into an ordinary expression built from `quote`, `cons`, `list`,
//! and `append` calls, and the evaluator then runs that expression in the
//! ambient environment. Deferring `unquote` operands to the second phase is
//! what lets them see the enclosing lexical scope.
//!
//! ```lisp
//! `(1 ,(+ 1 2) ,@(list 3 4) 5)   ; => (1 3 3 4 5)
//! ```
//!
//! Nesting tracks a depth counter: an inner `` ` `` increments it, and
//! `,`/`,@` only take effect back at depth zero - in between they are
//! rebuilt literally with the depth decremented.

use crate::Error;
use crate::ast::{self, Expr};
use crate::reader::{QUASIQUOTE, QUOTE, UNQUOTE, UNQUOTE_SPLICE};

/// How the surrounding expansion consumes a sub-expansion's value.
///
/// The two roles would otherwise be two near-identical recursive functions;
/// a mode parameter keeps them from drifting apart.
#[derive(Clone, Copy, PartialEq)]
enum Output {
    /// The expansion stands for the template itself: the top of a template,
    /// or the rest-of-list position.
    Single,
    /// The expansion stands for one segment of an `append` chain: ordinary
    /// forms are wrapped in a one-element `list` call, and a depth-zero
    /// `unquote-splice` operand passes through unwrapped so its list value
    /// is concatenated instead of inserted.
    Segment,
}

/// Expand a quasiquote template into an expression that rebuilds it.
pub fn expand(template: &Expr) -> Result<Expr, Error> {
    expand_with(template, 0, Output::Single)
}

fn expand_with(form: &Expr, depth: usize, out: Output) -> Result<Expr, Error> {
    // Anything that is not a non-empty list is a literal to preserve.
    let Expr::Pair(pair) = form else {
        return Ok(wrap(quote_call(form.clone()), out));
    };

    if let Expr::Symbol(head) = &pair.car {
        match head.as_str() {
            QUASIQUOTE => {
                // Nesting: keep the quasiquote literal, one level deeper.
                let inner = expand_with(&pair.cdr, depth + 1, Output::Single)?;
                return Ok(wrap(cons_call(quote_call(ast::sym(QUASIQUOTE)), inner), out));
            }
            UNQUOTE => {
                if depth == 0 {
                    let operand = single_operand(&pair.cdr, UNQUOTE)?;
                    // Substituted as-is; evaluated when the expansion runs.
                    return Ok(match out {
                        Output::Single => operand,
                        Output::Segment => list_call(operand),
                    });
                }
                let inner = expand_with(&pair.cdr, depth - 1, Output::Single)?;
                return Ok(wrap(cons_call(quote_call(ast::sym(UNQUOTE)), inner), out));
            }
            UNQUOTE_SPLICE => {
                if depth == 0 {
                    return match out {
                        Output::Segment => single_operand(&pair.cdr, UNQUOTE_SPLICE),
                        Output::Single => Err(Error::InvalidUnquote(
                            "'unquote-splice' must appear inside a list template".to_owned(),
                        )),
                    };
                }
                let inner = expand_with(&pair.cdr, depth - 1, Output::Single)?;
                return Ok(wrap(
                    cons_call(quote_call(ast::sym(UNQUOTE_SPLICE)), inner),
                    out,
                ));
            }
            _ => {}
        }
    }

    // Ordinary list position: this element's segment, concatenated with
    // the expansion of the rest.
    let head_segment = expand_with(&pair.car, depth, Output::Segment)?;
    let tail = expand_with(&pair.cdr, depth, Output::Single)?;
    Ok(wrap(append_call(head_segment, tail), out))
}

fn wrap(expansion: Expr, out: Output) -> Expr {
    match out {
        Output::Single => expansion,
        Output::Segment => list_call(expansion),
    }
}

/// The exactly-one operand of an `unquote`/`unquote-splice` form.
fn single_operand(tail: &Expr, name: &str) -> Result<Expr, Error> {
    let operands = tail.list_to_vec()?;
    match operands.as_slice() {
        [operand] => Ok(operand.clone()),
        _ => Err(Error::arity_exact(name, 1, operands.len())),
    }
}

fn quote_call(form: Expr) -> Expr {
    Expr::list(vec![ast::sym(QUOTE), form])
}

fn cons_call(head: Expr, tail: Expr) -> Expr {
    Expr::list(vec![ast::sym("cons"), head, tail])
}

fn list_call(item: Expr) -> Expr {
    Expr::list(vec![ast::sym("list"), item])
}

fn append_call(front: Expr, back: Expr) -> Expr {
    Expr::list(vec![ast::sym("append"), front, back])
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::builtins::create_global_env;
    use crate::evaluator::eval;
    use crate::reader::read_form;

    /// Evaluate one input string against a fresh global environment.
    fn eval_text(input: &str) -> Result<Expr, Error> {
        let env = create_global_env();
        let (form, _rest) = read_form(input).unwrap();
        eval(&form, &env)
    }

    fn assert_evals_to(cases: Vec<(&str, &str)>) {
        for (i, (input, expected)) in cases.iter().enumerate() {
            let result = eval_text(input)
                .unwrap_or_else(|e| panic!("case #{}: '{input}' failed: {e}", i + 1));
            assert_eq!(
                format!("{result}"),
                *expected,
                "case #{}: '{input}'",
                i + 1
            );
        }
    }

    #[test]
    fn test_literal_templates() {
        assert_evals_to(vec![
            ("`x", "x"),
            ("`42", "42"),
            ("`\"s\"", "\"s\""),
            ("`()", "nil"),
            ("`(1 2 3)", "(1 2 3)"),
            ("`(a (b c))", "(a (b c))"),
        ]);
    }

    #[test]
    fn test_unquote_substitution() {
        assert_evals_to(vec![
            ("`,(+ 1 2)", "3"),
            ("`(,(+ 1 2))", "(3)"),
            ("`(1 ,(+ 1 2) 5)", "(1 3 5)"),
            ("`(a ,(* 2 3) (b ,(- 1)))", "(a 6 (b -1))"),
        ]);
    }

    #[test]
    fn test_unquote_splice() {
        assert_evals_to(vec![
            ("`(,@(list 1 2))", "(1 2)"),
            ("`(0 ,@(list 1 2) 3)", "(0 1 2 3)"),
            ("`(1 ,(+ 1 2) ,@(list 3 4) 5)", "(1 3 3 4 5)"),
            ("`(,@nil)", "nil"),
            ("`(,@(list) end)", "(end)"),
            // A spliced sublist inside a nested list element
            ("`((,@(list 1 2)) 3)", "((1 2) 3)"),
        ]);
    }

    #[test]
    fn test_unquote_sees_the_lexical_scope() {
        let env = create_global_env();
        let run = |text: &str| {
            let (form, _rest) = read_form(text).unwrap();
            eval(&form, &env)
        };
        run("(define x 7)").unwrap();
        let result = run("(let ((y 2)) `(,x ,y))").unwrap();
        assert_eq!(format!("{result}"), "(7 2)");
    }

    #[test]
    fn test_nested_quasiquote_keeps_inner_templates_literal() {
        assert_evals_to(vec![
            // The inner template survives one level of expansion...
            ("``x", "(quasiquote x)"),
            ("``(,x)", "(quasiquote ((unquote x)))"),
            ("``(,@x)", "(quasiquote ((unquote-splice x)))"),
            // ...and a doubly-nested unquote fires only at depth zero.
            ("`(a `(b ,(c)))", "(a (quasiquote (b (unquote (c)))))"),
        ]);
    }

    #[test]
    fn test_nested_expansion_evaluates_twice() {
        let env = create_global_env();
        let run = |text: &str| {
            let (form, _rest) = read_form(text).unwrap();
            eval(&form, &env)
        };
        run("(define x 5)").unwrap();
        // Expanding ``(,x) once gives `(,x); evaluating that gives (5).
        let once = run("``(,x)").unwrap();
        let twice = run(&format!("(eval '{once})")).unwrap();
        assert_eq!(format!("{twice}"), "(5)");
    }

    #[test]
    fn test_splice_errors() {
        // Splicing at the template's own top level has no sequence to
        // absorb it.
        let err = eval_text("`,@(list 1 2)").unwrap_err();
        assert!(matches!(err, Error::InvalidUnquote(_)), "got {err:?}");

        // A splice of a non-list surfaces the append type error.
        let err = eval_text("`(a ,@1)").unwrap_err();
        assert!(matches!(err, Error::Type(_)), "got {err:?}");
    }

    #[test]
    fn test_unquote_operand_count() {
        let err = eval_text("`(a (unquote))").unwrap_err();
        assert!(matches!(err, Error::Arity(_)), "got {err:?}");
        let err = eval_text("`(a (unquote 1 2))").unwrap_err();
        assert!(matches!(err, Error::Arity(_)), "got {err:?}");
    }

    #[test]
    fn test_expansion_shape_is_buildable() {
        // The expansion itself is ordinary data: quote/cons/list/append
        // applications only.
        let (template, _rest) = read_form("(1 ,x)").unwrap();
        let expansion = expand(&template).unwrap();
        let printed = format!("{expansion}");
        assert!(
            printed.starts_with("(append (list (quote 1))"),
            "unexpected expansion: {printed}"
        );
    }
}
