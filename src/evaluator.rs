//! Environments and expression evaluation.
//!
//! The environment is a parent chain of scope nodes: each scope holds a
//! mutable binding map and a shared link to its enclosing scope. Closures
//! keep a handle to the scope they were created in, so a `define` executed
//! after closure creation is visible to the closure; directly recursive
//! `define`d functions rely on this.
//!
//! Evaluation is plain call-stack recursion with no depth accounting;
//! programs that recurse too deeply exhaust the host stack.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::Error;
use crate::ast::{self, Closure, Expr, Pair};
use crate::quasiquote;
use crate::reader::{QUASIQUOTE, QUOTE, UNQUOTE, UNQUOTE_SPLICE};

/// One node in the scope chain.
struct Scope {
    bindings: HashMap<String, Expr>,
    parent: Option<Rc<RefCell<Scope>>>,
}

/// A shared handle to a scope. Cloning an `Env` aliases the same bindings;
/// `child` starts a fresh scope chained to this one.
#[derive(Clone)]
pub struct Env {
    scope: Rc<RefCell<Scope>>,
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Env {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.scope, &other.scope)
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Scopes can hold closures that point back at this scope; print a
        // placeholder instead of descending.
        write!(f, "Env({:p})", Rc::as_ptr(&self.scope))
    }
}

impl Env {
    /// A fresh root scope with no bindings.
    pub fn new() -> Self {
        Env {
            scope: Rc::new(RefCell::new(Scope {
                bindings: HashMap::new(),
                parent: None,
            })),
        }
    }

    /// A fresh child scope whose lookups fall through to `self`.
    pub fn child(&self) -> Self {
        Env {
            scope: Rc::new(RefCell::new(Scope {
                bindings: HashMap::new(),
                parent: Some(self.scope.clone()),
            })),
        }
    }

    /// The root of this scope chain - the global environment.
    pub fn root(&self) -> Self {
        let mut scope = self.scope.clone();
        loop {
            let parent = scope.borrow().parent.clone();
            match parent {
                Some(next) => scope = next,
                None => return Env { scope },
            }
        }
    }

    /// Look a name up through the scope chain.
    pub fn lookup(&self, name: &str) -> Option<Expr> {
        let mut current = Some(self.scope.clone());
        while let Some(scope) = current {
            let next = {
                let scope = scope.borrow();
                if let Some(value) = scope.bindings.get(name) {
                    return Some(value.clone());
                }
                scope.parent.clone()
            };
            current = next;
        }
        None
    }

    /// Bind a name in this scope, failing if it is already bound *here*
    /// (bindings in enclosing scopes may be shadowed freely).
    pub fn define(&self, name: &str, value: Expr) -> Result<(), Error> {
        let mut scope = self.scope.borrow_mut();
        if scope.bindings.contains_key(name) {
            return Err(Error::Redefinition(name.to_owned()));
        }
        scope.bindings.insert(name.to_owned(), value);
        Ok(())
    }

    /// Insert a binding unconditionally. Used for parameter and `let`
    /// binding into a scope that is known to be fresh.
    pub(crate) fn bind(&self, name: impl Into<String>, value: Expr) {
        self.scope.borrow_mut().bindings.insert(name.into(), value);
    }
}

/// Evaluate an expression against an environment.
pub fn eval(expr: &Expr, env: &Env) -> Result<Expr, Error> {
    match expr {
        // Self-evaluating forms
        Expr::Number(_) | Expr::Str(_) | Expr::Nil | Expr::Closure(_) | Expr::Native(_) => {
            Ok(expr.clone())
        }
        // The truthy literal needs no binding
        Expr::Symbol(name) if name == ast::T => Ok(expr.clone()),
        Expr::Symbol(name) => env
            .lookup(name)
            .ok_or_else(|| Error::UnboundSymbol(name.clone())),
        Expr::Pair(pair) => eval_pair(pair, env),
    }
}

/// Evaluate a non-empty list: special form or function application.
fn eval_pair(pair: &Pair, env: &Env) -> Result<Expr, Error> {
    if let Expr::Symbol(head) = &pair.car {
        match head.as_str() {
            "lambda" => return eval_lambda(&pair.cdr, env),
            "define" => return eval_define(&pair.cdr, env),
            "let" => return eval_let(&pair.cdr, env),
            "if" => return eval_if(&pair.cdr, env),
            QUOTE => return eval_quote(&pair.cdr),
            QUASIQUOTE => return eval_quasiquote(&pair.cdr, env),
            UNQUOTE | UNQUOTE_SPLICE => {
                return Err(Error::InvalidUnquote(format!(
                    "'{head}' outside a quasiquote template"
                )));
            }
            _ => {}
        }
    }

    // Function application: head first, then arguments left to right.
    let func = eval(&pair.car, env)?;
    let arg_forms = pair.cdr.list_to_vec()?;
    let mut args = Vec::with_capacity(arg_forms.len());
    for form in &arg_forms {
        args.push(eval(form, env)?);
    }
    apply_function(&func, &args, env)
}

/// Invoke a callable value on already-evaluated arguments.
///
/// Shared between list application and the `apply` builtin. `env` is the
/// environment of the call site; natives that re-enter the evaluator
/// receive it.
pub fn apply_function(func: &Expr, args: &[Expr], env: &Env) -> Result<Expr, Error> {
    match func {
        Expr::Native(native) => {
            native.arity.validate(native.name, args.len())?;
            (native.func)(args, env)
        }
        Expr::Closure(closure) => {
            let fixed = closure.params.len();
            match closure.rest {
                None if args.len() != fixed => {
                    return Err(Error::arity_exact("closure", fixed, args.len()));
                }
                Some(_) if args.len() < fixed => {
                    return Err(Error::arity_at_least("closure", fixed, args.len()));
                }
                _ => {}
            }
            // Parameters bind in a fresh child of the *captured* scope.
            let call_env = closure.env.child();
            for (param, arg) in closure.params.iter().zip(args) {
                call_env.bind(param.clone(), arg.clone());
            }
            if let Some(rest) = &closure.rest {
                call_env.bind(rest.clone(), Expr::list(args[fixed..].to_vec()));
            }
            eval(&closure.body, &call_env)
        }
        other => Err(Error::NotAFunction(format!("{other}"))),
    }
}

/// `(lambda (params...) body)` - closure over the current environment.
fn eval_lambda(args: &Expr, env: &Env) -> Result<Expr, Error> {
    let args = args.list_to_vec()?;
    let [param_form, body] = args.as_slice() else {
        return Err(Error::arity_exact("lambda", 2, args.len()));
    };

    let mut names = Vec::new();
    for param in param_form.list_to_vec().map_err(|_| {
        Error::Type("lambda parameters must be a proper list of symbols".to_owned())
    })? {
        match param {
            Expr::Symbol(name) => names.push(name),
            other => {
                return Err(Error::Type(format!(
                    "lambda parameter is not a symbol: {other}"
                )));
            }
        }
    }

    // A '&rest' marker is only legal immediately before the final
    // parameter, which becomes the rest binding.
    let rest = match names.iter().position(|name| name == "&rest") {
        None => None,
        Some(at) if at + 2 == names.len() && names[at + 1] != "&rest" => {
            let rest_name = names.pop();
            names.pop(); // drop the marker itself
            rest_name
        }
        Some(_) => {
            return Err(Error::Arity(
                "'&rest' must come immediately before the last parameter".to_owned(),
            ));
        }
    };

    Ok(Expr::Closure(Rc::new(Closure {
        params: names,
        rest,
        body: body.clone(),
        env: env.clone(),
    })))
}

/// `(define sym expr)` - evaluate, then bind in the current scope.
/// Returns the symbol.
fn eval_define(args: &Expr, env: &Env) -> Result<Expr, Error> {
    let args = args.list_to_vec()?;
    match args.as_slice() {
        [symbol_form @ Expr::Symbol(name), value_form] => {
            // Evaluate before touching the environment so a failure leaves
            // no partial binding behind.
            let value = eval(value_form, env)?;
            env.define(name, value)?;
            Ok(symbol_form.clone())
        }
        [other, _] => Err(Error::Type(format!("define requires a symbol, got {other}"))),
        _ => Err(Error::arity_exact("define", 2, args.len())),
    }
}

/// `(let ((sym expr)...) body...)` - initializers evaluate in the outer
/// scope, bindings land together in one fresh child scope.
fn eval_let(args: &Expr, env: &Env) -> Result<Expr, Error> {
    let args = args.list_to_vec()?;
    let [binding_form, body @ ..] = args.as_slice() else {
        return Err(Error::arity_at_least("let", 1, 0));
    };

    let local = env.child();
    for binding in binding_form
        .list_to_vec()
        .map_err(|_| Error::Type("let bindings must be a proper list".to_owned()))?
    {
        match binding {
            Expr::Symbol(name) => local.bind(name, Expr::Nil),
            Expr::Pair(_) => {
                let parts = binding.list_to_vec()?;
                match parts.as_slice() {
                    [Expr::Symbol(name)] => local.bind(name.clone(), Expr::Nil),
                    [Expr::Symbol(name), init] => {
                        // Sibling bindings are not in scope here: the
                        // initializer sees only the outer environment.
                        local.bind(name.clone(), eval(init, env)?);
                    }
                    [other, ..] if !matches!(other, Expr::Symbol(_)) => {
                        return Err(Error::Type(format!(
                            "let binding name is not a symbol: {other}"
                        )));
                    }
                    _ => {
                        return Err(Error::Arity(format!(
                            "let binding expects (sym) or (sym expr), got {binding}"
                        )));
                    }
                }
            }
            other => {
                return Err(Error::Type(format!("invalid let binding: {other}")));
            }
        }
    }

    let mut result = Expr::Nil;
    for form in body {
        result = eval(form, &local)?;
    }
    Ok(result)
}

/// `(if test then [else])` - anything but `nil` counts as true.
fn eval_if(args: &Expr, env: &Env) -> Result<Expr, Error> {
    let args = args.list_to_vec()?;
    match args.as_slice() {
        [test, then_form] => {
            if !matches!(eval(test, env)?, Expr::Nil) {
                eval(then_form, env)
            } else {
                Ok(Expr::Nil)
            }
        }
        [test, then_form, else_form] => {
            if !matches!(eval(test, env)?, Expr::Nil) {
                eval(then_form, env)
            } else {
                eval(else_form, env)
            }
        }
        _ => Err(Error::Arity(format!(
            "'if' expects 2 or 3 arguments, got {}",
            args.len()
        ))),
    }
}

/// `(quote x)` - return the operand unevaluated.
fn eval_quote(args: &Expr) -> Result<Expr, Error> {
    let args = args.list_to_vec()?;
    match args.as_slice() {
        [form] => Ok(form.clone()),
        _ => Err(Error::arity_exact(QUOTE, 1, args.len())),
    }
}

/// `(quasiquote x)` - expand the template, then evaluate the expansion in
/// the ambient environment.
fn eval_quasiquote(args: &Expr, env: &Env) -> Result<Expr, Error> {
    let args = args.list_to_vec()?;
    match args.as_slice() {
        [template] => {
            let expansion = quasiquote::expand(template)?;
            eval(&expansion, env)
        }
        _ => Err(Error::arity_exact(QUASIQUOTE, 1, args.len())),
    }
}
