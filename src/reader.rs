//! S-expression reading: a nom-based lexical layer (markers, string
//! literals, barewords, comment skipping) under a recursive-descent parser
//! that produces one [`Expr`] tree per top-level call.
//!
//! Atom classification happens on whole bareword tokens, in priority order:
//! fraction, float, string, the reserved `t`/`nil` tokens, then plain
//! symbol. The quote-family markers desugar at read time:
//!
//! ```lisp
//! 'x    ; => (quote x)
//! `x    ; => (quasiquote x)
//! ,x    ; => (unquote x)
//! ,@x   ; => (unquote-splice x)
//! ```

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{anychar, char, digit0, digit1, multispace1, none_of, one_of},
    combinator::{opt, recognize, value},
    multi::many0_count,
    sequence::{delimited, preceded},
};

use crate::Error;
use crate::ast::{self, Expr};
use crate::number::{Fraction, Number};

pub(crate) const QUOTE: &str = "quote";
pub(crate) const QUASIQUOTE: &str = "quasiquote";
pub(crate) const UNQUOTE: &str = "unquote";
pub(crate) const UNQUOTE_SPLICE: &str = "unquote-splice";

/// Characters that end a bareword token.
fn is_bareword_char(c: char) -> bool {
    !c.is_whitespace() && !"()'`,\";".contains(c)
}

/// Skip whitespace and `;` line comments between tokens.
fn skip_intertoken(input: &str) -> &str {
    let comment = (char(';'), take_till(|c| c == '\n'));
    let intertoken: IResult<&str, usize> =
        many0_count(alt((value((), multispace1), value((), comment)))).parse(input);
    match intertoken {
        Ok((rest, _)) => rest,
        Err(_) => input,
    }
}

/// One quote-family marker token.
fn quote_marker(input: &str) -> IResult<&str, &str> {
    alt((tag(",@"), tag("'"), tag("`"), tag(","))).parse(input)
}

fn marker_symbol(marker: &str) -> &'static str {
    match marker {
        "'" => QUOTE,
        "`" => QUASIQUOTE,
        ",@" => UNQUOTE_SPLICE,
        _ => UNQUOTE,
    }
}

/// A complete string literal. The inner text is returned verbatim,
/// escape sequences included; only the delimiting quotes are consumed.
fn string_literal(input: &str) -> IResult<&str, &str> {
    delimited(
        char('"'),
        recognize(many0_count(alt((
            value((), (char('\\'), anychar)),
            value((), none_of("\\\"")),
        )))),
        char('"'),
    )
    .parse(input)
}

fn bareword(input: &str) -> IResult<&str, &str> {
    take_while1(is_bareword_char).parse(input)
}

/// `[+-]?digits(/digits)?` over the whole token.
fn is_fraction_token(token: &str) -> bool {
    let result: IResult<&str, &str> = recognize((
        opt(one_of("+-")),
        digit1,
        opt(preceded(char('/'), digit1)),
    ))
    .parse(token);
    matches!(result, Ok(("", _)))
}

/// `[+-]?digits.digits*` over the whole token. Plain integers never reach
/// this pattern because the fraction pattern is tried first.
fn is_float_token(token: &str) -> bool {
    let result: IResult<&str, &str> =
        recognize((opt(one_of("+-")), digit1, char('.'), digit0)).parse(token);
    matches!(result, Ok(("", _)))
}

fn parse_fraction(token: &str) -> Result<Expr, Error> {
    let (num_text, den_text) = match token.split_once('/') {
        Some((num, den)) => (num, den),
        None => (token, "1"),
    };
    let num: i64 = num_text
        .parse()
        .map_err(|_| Error::Syntax(format!("integer literal out of range: {token}")))?;
    let den: i64 = den_text
        .parse()
        .map_err(|_| Error::Syntax(format!("integer literal out of range: {token}")))?;
    // A zero denominator surfaces as DivisionByZero already at read time.
    Ok(Expr::Number(Number::Fraction(Fraction::new(num, den)?)))
}

/// Classify a bareword token, in priority order.
fn classify_bareword(token: &str) -> Result<Expr, Error> {
    if is_fraction_token(token) {
        return parse_fraction(token);
    }
    if is_float_token(token) {
        let parsed: f64 = token
            .parse()
            .map_err(|_| Error::Syntax(format!("malformed float literal: {token}")))?;
        return Ok(Expr::Number(Number::Float(parsed)));
    }
    match token {
        ast::T => Ok(ast::sym(ast::T)),
        "nil" => Ok(Expr::Nil),
        _ => Ok(ast::sym(token)),
    }
}

/// Read one form from `input`, returning it with the unconsumed remainder.
/// Reading past end-of-input when a form is expected is a syntax error.
pub fn read_form(input: &str) -> Result<(Expr, &str), Error> {
    let input = skip_intertoken(input);
    match input.chars().next() {
        None => Err(Error::Syntax("form expected, got end of input".to_owned())),
        Some('(') => read_list(&input[1..]),
        Some(')') => Err(Error::Syntax("form expected, got ')'".to_owned())),
        Some(_) => read_atom(input),
    }
}

/// Read list elements up to the matching `)`. The opening paren has already
/// been consumed. `()` yields `Nil`.
fn read_list(mut input: &str) -> Result<(Expr, &str), Error> {
    let mut items = Vec::new();
    loop {
        input = skip_intertoken(input);
        match input.chars().next() {
            None => return Err(Error::Syntax("')' expected, got end of input".to_owned())),
            Some(')') => return Ok((Expr::list(items), &input[1..])),
            Some(_) => {
                let (form, rest) = read_form(input)?;
                items.push(form);
                input = rest;
            }
        }
    }
}

fn read_atom(input: &str) -> Result<(Expr, &str), Error> {
    if let Ok((rest, marker)) = quote_marker(input) {
        let (form, rest) = read_form(rest)?;
        let desugared = Expr::list(vec![ast::sym(marker_symbol(marker)), form]);
        return Ok((desugared, rest));
    }
    if input.starts_with('"') {
        return match string_literal(input) {
            Ok((rest, raw)) => Ok((Expr::Str(raw.to_owned()), rest)),
            Err(_) => Err(Error::Syntax("unterminated string literal".to_owned())),
        };
    }
    match bareword(input) {
        Ok((rest, token)) => Ok((classify_bareword(token)?, rest)),
        Err(_) => {
            let near: String = input.chars().take(16).collect();
            Err(Error::Syntax(format!("unreadable atom near '{near}'")))
        }
    }
}
