use failure::Error;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expr, Tag};
use crate::builtins;
use crate::env::{self, EnvRef};
use crate::errors::EvalError;
use crate::expand;
use crate::trace;
use crate::values::{Closure, ScopedEval, Value};

/// evaluate an expression against an environment chain
pub fn eval(expr: &Expr, env: &EnvRef) -> Result<Value, Error> {
    match expr {
        Expr::Num(n) => Ok(Value::Num(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Lit(value) => Ok((**value).clone()),
        Expr::Nil | Expr::Line => Ok(Value::Nil),
        Expr::Sym(name) => resolve_symbol(name, env),
        Expr::Node(tag, args) => eval_node(tag, args, env),
    }
}

/// evaluate every expression of a slice, in order
pub fn eval_list(exprs: &[Expr], env: &EnvRef) -> Result<Vec<Value>, Error> {
    exprs.iter().map(|expr| eval(expr, env)).collect()
}

/// resolve a symbol: environment chain first, then the primitive bridge
fn resolve_symbol(name: &str, env: &EnvRef) -> Result<Value, Error> {
    if let Some(value) = env::lookup(env, name) {
        return Ok(value);
    }
    if let Some(host) = builtins::resolve(name) {
        return Ok(Value::Host(host));
    }
    Err(EvalError::UnboundSymbol(name.to_owned()).into())
}

fn eval_node(tag: &Tag, args: &[Expr], env: &EnvRef) -> Result<Value, Error> {
    match tag {
        Tag::Block | Tag::Toplevel | Tag::Quote => eval_sequence(args, env),

        Tag::If | Tag::Elseif => {
            if args.len() < 2 {
                return Err(malformed("if", "a condition and a consequent are required"));
            }
            let cond = eval(&args[0], env)?;
            if !cond.is_false() {
                eval(&args[1], env)
            } else if let Some(alt) = args.get(2) {
                eval(alt, env)
            } else {
                Ok(Value::Bool(false))
            }
        }

        Tag::And => {
            let mut last = Value::Bool(true);
            for arg in args {
                last = eval(arg, env)?;
                if last.is_false() {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(last)
        }

        Tag::OrOp => {
            for arg in args {
                let value = eval(arg, env)?;
                if !value.is_false() {
                    return Ok(value);
                }
            }
            Ok(Value::Bool(false))
        }

        Tag::Assign => eval_assign(args, env, env),

        Tag::Let => {
            if args.len() != 2 {
                return Err(malformed("let", "bindings and a body are required"));
            }
            let frame = env::child(env);
            eval(&args[0], &frame)?;
            eval(&args[1], &frame)
        }

        Tag::FExprDef => eval_fexpr_def(args, env, env),
        Tag::MacroDef => eval_macro_def(args, env),

        Tag::Global => {
            let globals = env::globals_of(env);
            let mut last = Value::Nil;
            for sub in args {
                last = match sub {
                    Expr::Node(Tag::Assign, inner) => eval_assign(inner, env, &globals)?,
                    Expr::Node(Tag::FExprDef, inner) => eval_fexpr_def(inner, env, &globals)?,
                    other => {
                        return Err(EvalError::InvalidGlobal(other.to_string()).into());
                    }
                };
            }
            Ok(last)
        }

        Tag::Lambda => {
            if args.len() != 2 {
                return Err(malformed("->", "parameters and a body are required"));
            }
            let params = param_names(&args[0])?;
            Ok(Value::Function(Rc::new(Closure {
                name: "<anonymous>".to_owned(),
                params,
                body: args[1].clone(),
                scope: env::child(env),
            })))
        }

        Tag::Interpolate => expand::interpolate(args, env),

        Tag::Call => eval_call(args, env),

        // unknown heads evaluate element-wise into a list
        Tag::Other(_) => Ok(Value::list(eval_list(args, env)?)),
    }
}

/// each sub-expression in order; the last value wins, nil when empty
fn eval_sequence(args: &[Expr], env: &EnvRef) -> Result<Value, Error> {
    let mut last = Value::Nil;
    for arg in args {
        last = eval(arg, env)?;
    }
    Ok(last)
}

/// `lhs = rhs`. A call-shaped lhs defines a function; a symbol lhs binds
/// the evaluated rhs. `storing` is where the binding lands: the current
/// environment for a plain `=`, the global frame under `global`.
fn eval_assign(args: &[Expr], env: &EnvRef, storing: &EnvRef) -> Result<Value, Error> {
    if args.len() != 2 {
        return Err(malformed("=", "a target and a value are required"));
    }

    match &args[0] {
        Expr::Node(Tag::Call, sig) => {
            let (name, params) = signature(sig)?;
            let function = Value::Function(Rc::new(Closure {
                name: name.clone(),
                params,
                body: args[1].clone(),
                scope: env::child(env),
            }));
            env::assign(storing, &name, function.clone());
            Ok(function)
        }

        Expr::Sym(name) => {
            let value = eval(&args[1], env)?;
            env::assign(storing, name, value.clone());
            Ok(value)
        }

        other => Err(malformed("=", &format!("`{}` is not assignable", other))),
    }
}

/// `name(params…) := body`, binding the fexpr in `storing`
fn eval_fexpr_def(args: &[Expr], env: &EnvRef, storing: &EnvRef) -> Result<Value, Error> {
    let (name, closure) = callable_def(":=", args, env)?;
    let fexpr = Value::FExpr(Rc::new(closure));
    env::assign(storing, &name, fexpr.clone());
    Ok(fexpr)
}

/// `name(params…) $= body`, binding the macro in the current environment
fn eval_macro_def(args: &[Expr], env: &EnvRef) -> Result<Value, Error> {
    let (name, closure) = callable_def("$=", args, env)?;
    let makro = Value::Macro(Rc::new(closure));
    env::assign(env, &name, makro.clone());
    Ok(makro)
}

fn callable_def(head: &str, args: &[Expr], env: &EnvRef) -> Result<(String, Closure), Error> {
    if args.len() != 2 {
        return Err(malformed(head, "a signature and a body are required"));
    }
    let sig = match &args[0] {
        Expr::Node(Tag::Call, sig) => sig,
        other => {
            return Err(malformed(
                head,
                &format!("`{}` is not a call-shaped signature", other),
            ));
        }
    };
    let (name, params) = signature(sig)?;
    let closure = Closure {
        name: name.clone(),
        params,
        body: args[1].clone(),
        scope: env::child(env),
    };
    Ok((name, closure))
}

/// The call protocol. The callee expression is resolved in the caller's
/// environment; what it resolves to decides how (and whether) the
/// arguments are evaluated.
fn eval_call(args: &[Expr], env: &EnvRef) -> Result<Value, Error> {
    let (callee_expr, call_args) = match args.split_first() {
        Some(parts) => parts,
        None => return Err(malformed("call", "a callee is required")),
    };

    let callee = eval(callee_expr, env)?;
    match callee {
        Value::ScopedEval(scoped) => {
            let arg = call_args.first().ok_or_else(|| {
                malformed("eval", "an expression to evaluate is required")
            })?;
            call_scoped_eval(&scoped, arg)
        }

        Value::Host(host) => {
            let values = eval_list(call_args, env)?;
            (host.f)(values)
        }

        Value::Function(f) => {
            traced_call(&f, call_args, || apply_function(&f, call_args, env))
        }

        Value::FExpr(f) => traced_call(&f, call_args, || apply_fexpr(&f, call_args, env)),

        Value::Macro(m) => traced_call(&m, call_args, || apply_macro(&m, call_args, env)),

        other => Err(EvalError::BadCallable {
            name: callee_expr.to_string(),
            typename: other.get_type(),
        }
        .into()),
    }
}

/// wrap `apply` in entry/exit lines when the callable is traced
fn traced_call<F>(closure: &Rc<Closure>, args: &[Expr], apply: F) -> Result<Value, Error>
where
    F: FnOnce() -> Result<Value, Error>,
{
    if !trace::is_traced(closure) {
        return apply();
    }

    trace::entry(&closure.name, args);
    let result = apply()?;
    trace::exit(&closure.name, &result);
    Ok(result)
}

/// eager call: arguments evaluate in the caller's environment, parameters
/// bind in a fresh frame extending the captured scope (fresh per
/// invocation, so recursion cannot clobber its own parameters)
fn apply_function(f: &Rc<Closure>, args: &[Expr], env: &EnvRef) -> Result<Value, Error> {
    let values = eval_list(args, env)?;

    let mut bound = HashMap::new();
    for (i, param) in f.params.iter().enumerate() {
        // lenient arity: parameters beyond the arguments bind nil
        let value = values.get(i).cloned().unwrap_or(Value::Nil);
        bound.insert(param.clone(), value);
    }

    let frame = env::child_with(&f.scope, bound);
    eval(&f.body, &frame)
}

/// lazy call: parameters bind to the unevaluated argument expressions,
/// and `eval` becomes a `ScopedEval` pairing this frame with the caller's
fn apply_fexpr(f: &Rc<Closure>, args: &[Expr], env: &EnvRef) -> Result<Value, Error> {
    let mut bound = HashMap::new();
    for (i, param) in f.params.iter().enumerate() {
        let value = match args.get(i) {
            Some(arg) => Value::Quoted(Box::new(arg.clone())),
            None => Value::Nil,
        };
        bound.insert(param.clone(), value);
    }

    let frame = env::child_with(&f.scope, bound);
    let scoped = ScopedEval {
        def_env: frame.clone(),
        call_env: env.clone(),
    };
    frame.borrow_mut().define("eval", Value::ScopedEval(scoped));

    eval(&f.body, &frame)
}

/// macro call: bind unevaluated arguments, run the hygiene pass, expand
/// interpolations, then evaluate the expansion in the *caller's* scope
fn apply_macro(m: &Rc<Closure>, args: &[Expr], env: &EnvRef) -> Result<Value, Error> {
    let mut bound = HashMap::new();
    for (i, param) in m.params.iter().enumerate() {
        let value = match args.get(i) {
            Some(arg) => Value::Quoted(Box::new(arg.clone())),
            None => Value::Nil,
        };
        bound.insert(param.clone(), value);
    }

    let frame = env::child_with(&m.scope, bound);
    expand::gensym_pass(&m.body, &frame);
    let expanded = expand::expand(&m.body, &frame)?;

    eval(&expanded, env)
}

/// Calling the `eval` visible inside a fexpr. A frame holding nothing but
/// the `eval` binding itself means no parameter was bound at entry: the
/// argument already belongs to the caller's world and evaluates there
/// directly. Otherwise the argument (typically a parameter symbol)
/// resolves in the fexpr's frame to the unevaluated call-site expression,
/// which then evaluates in the caller's environment.
fn call_scoped_eval(scoped: &ScopedEval, arg: &Expr) -> Result<Value, Error> {
    let own_bindings = scoped.def_env.borrow().vars.len();
    if own_bindings == 1 {
        return eval(arg, &scoped.call_env);
    }

    let resolved = eval(arg, &scoped.def_env)?;
    eval(&resolved.to_expr(), &scoped.call_env)
}

/// parameter names from a lambda head: a bare symbol or a tuple of symbols
fn param_names(expr: &Expr) -> Result<Vec<String>, Error> {
    match expr {
        Expr::Sym(name) => Ok(vec![name.clone()]),
        Expr::Node(_, args) => args
            .iter()
            .map(|arg| match arg {
                Expr::Sym(name) => Ok(name.clone()),
                other => Err(malformed(
                    "->",
                    &format!("parameter `{}` is not a symbol", other),
                )),
            })
            .collect(),
        other => Err(malformed(
            "->",
            &format!("`{}` is not a parameter list", other),
        )),
    }
}

/// a definition signature `name(p0, …, pk)` split into its parts
fn signature(sig: &[Expr]) -> Result<(String, Vec<String>), Error> {
    let (head, params) = match sig.split_first() {
        Some(parts) => parts,
        None => return Err(malformed("=", "an empty signature")),
    };

    let name = match head {
        Expr::Sym(name) => name.clone(),
        other => {
            return Err(malformed(
                "=",
                &format!("`{}` is not a definable name", other),
            ));
        }
    };

    let params = params
        .iter()
        .map(|param| match param {
            Expr::Sym(name) => Ok(name.clone()),
            other => Err(malformed(
                "=",
                &format!("parameter `{}` is not a symbol", other),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((name, params))
}

fn malformed(head: &str, reason: &str) -> Error {
    EvalError::MalformedAst {
        head: head.to_owned(),
        reason: reason.to_owned(),
    }
    .into()
}

// {{{ tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Env;
    use std::cell::RefCell;

    fn global() -> EnvRef {
        Rc::new(RefCell::new(Env::new(None)))
    }

    fn num(n: f64) -> Expr {
        Expr::Num(n)
    }

    fn sym(s: &str) -> Expr {
        Expr::Sym(s.to_owned())
    }

    fn call(callee: &str, args: Vec<Expr>) -> Expr {
        let mut full = vec![sym(callee)];
        full.extend(args);
        Expr::Node(Tag::Call, full)
    }

    #[test]
    fn atoms_evaluate_to_themselves() {
        let env = global();
        assert_eq!(eval(&num(4.0), &env).unwrap(), Value::Num(4.0));
        assert_eq!(
            eval(&Expr::Str("hi".into()), &env).unwrap(),
            Value::Str("hi".into())
        );
        assert_eq!(eval(&Expr::Nil, &env).unwrap(), Value::Nil);
        assert_eq!(eval(&Expr::Line, &env).unwrap(), Value::Nil);
    }

    #[test]
    fn unbound_symbols_fail_after_the_bridge() {
        let env = global();
        assert!(eval(&sym("missing"), &env).is_err());
        // bridge operators resolve even though nothing binds them
        match eval(&sym("+"), &env).unwrap() {
            Value::Host(host) => assert_eq!(host.name, "+"),
            other => panic!("expected a host operator, got {:?}", other),
        }
    }

    #[test]
    fn bridge_calls_evaluate_their_arguments() {
        let env = global();
        let sum = call("+", vec![num(1.0), call("*", vec![num(2.0), num(3.0)])]);
        assert_eq!(eval(&sum, &env).unwrap(), Value::Num(7.0));
    }

    #[test]
    fn and_short_circuits_on_false() {
        let env = global();
        // the unbound symbol after `false` must never evaluate
        let and = Expr::Node(
            Tag::And,
            vec![Expr::Lit(Box::new(Value::Bool(false))), sym("boom")],
        );
        assert_eq!(eval(&and, &env).unwrap(), Value::Bool(false));
    }

    #[test]
    fn and_yields_the_last_uncoerced_value() {
        let env = global();
        let and = Expr::Node(Tag::And, vec![num(1.0), num(2.0)]);
        assert_eq!(eval(&and, &env).unwrap(), Value::Num(2.0));
    }

    #[test]
    fn or_yields_the_first_non_false_value() {
        let env = global();
        let or = Expr::Node(
            Tag::OrOp,
            vec![Expr::Lit(Box::new(Value::Bool(false))), num(5.0), sym("boom")],
        );
        assert_eq!(eval(&or, &env).unwrap(), Value::Num(5.0));
    }

    #[test]
    fn if_without_alternative_is_false() {
        let env = global();
        let iff = Expr::Node(
            Tag::If,
            vec![Expr::Lit(Box::new(Value::Bool(false))), num(1.0)],
        );
        assert_eq!(eval(&iff, &env).unwrap(), Value::Bool(false));
    }

    #[test]
    fn assignment_returns_the_bound_value() {
        let env = global();
        let assign = Expr::Node(Tag::Assign, vec![sym("x"), num(9.0)]);
        assert_eq!(eval(&assign, &env).unwrap(), Value::Num(9.0));
        assert_eq!(env::lookup(&env, "x"), Some(Value::Num(9.0)));
    }

    #[test]
    fn fexpr_parameters_stay_unevaluated() {
        let env = global();
        // id(x) := x
        let def = Expr::Node(
            Tag::FExprDef,
            vec![call("id", vec![sym("x")]), sym("x")],
        );
        eval(&def, &env).unwrap();

        let body = call("+", vec![num(1.0), num(2.0)]);
        let result = eval(&call("id", vec![body.clone()]), &env).unwrap();
        assert_eq!(result, Value::Quoted(Box::new(body)));
    }

    #[test]
    fn quote_evaluates_its_contents() {
        let env = global();
        env.borrow_mut().define("x", Value::Num(3.0));
        let quote = Expr::Node(Tag::Quote, vec![sym("x")]);
        // eval(Quote(Sym(s))) equals lookup(env, s)
        assert_eq!(eval(&quote, &env).unwrap(), env::lookup(&env, "x").unwrap());
    }

    #[test]
    fn unknown_heads_map_evaluate_into_a_list() {
        let env = global();
        let vect = Expr::Node(
            Tag::Other("vect".into()),
            vec![num(1.0), call("+", vec![num(1.0), num(1.0)])],
        );
        assert_eq!(
            eval(&vect, &env).unwrap(),
            Value::list(vec![Value::Num(1.0), Value::Num(2.0)])
        );
    }

    #[test]
    fn calling_a_number_is_bad() {
        let env = global();
        env.borrow_mut().define("n", Value::Num(1.0));
        assert!(eval(&call("n", vec![]), &env).is_err());
    }

    #[test]
    fn global_rejects_other_heads() {
        let env = global();
        let bad = Expr::Node(Tag::Global, vec![call("f", vec![])]);
        assert!(eval(&bad, &env).is_err());
    }

    #[test]
    fn carried_eval_uses_the_call_scope_directly() {
        let env = global();
        // grab() := eval, a fexpr with no parameters leaking its eval
        let def = Expr::Node(Tag::FExprDef, vec![call("grab", vec![]), sym("eval")]);
        eval(&def, &env).unwrap();
        let grabbed = eval(&call("grab", vec![]), &env).unwrap();
        env.borrow_mut().define("e", grabbed);

        env.borrow_mut().define("y", Value::Num(42.0));
        // e(y) evaluates y straight in the calling environment
        assert_eq!(
            eval(&call("e", vec![sym("y")]), &env).unwrap(),
            Value::Num(42.0)
        );
    }
}
// }}}
