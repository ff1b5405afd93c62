//! Quasi-expansion of macro bodies: interpolation splicing and the
//! gensym pass that keeps macro-introduced names out of the caller's way.

use failure::Error;
use std::cell::Cell;

use crate::ast::{Expr, Tag};
use crate::env::{self, EnvRef};
use crate::errors::EvalError;
use crate::values::Value;

thread_local! {
    static GENSYM_COUNTER: Cell<usize> = Cell::new(0);
}

/// mint a symbol spelling no surface program can collide with
pub fn gensym() -> String {
    GENSYM_COUNTER.with(|counter| {
        let n = counter.get();
        counter.set(n + 1);
        format!("##sym#{}", n)
    })
}

/// Structural copy of `expr` with every `Interpolate` node replaced by
/// whatever its symbol is bound to in `env`, spliced back in unevaluated.
pub fn expand(expr: &Expr, env: &EnvRef) -> Result<Expr, Error> {
    match expr {
        Expr::Node(Tag::Interpolate, args) => Ok(interpolate(args, env)?.to_expr()),
        Expr::Node(tag, args) => {
            let children = args
                .iter()
                .map(|arg| expand(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Node(tag.clone(), children))
        }
        atom => Ok(atom.clone()),
    }
}

/// Resolve an `Interpolate` node: its last argument names a binding,
/// whose value is returned without evaluation.
pub fn interpolate(args: &[Expr], env: &EnvRef) -> Result<Value, Error> {
    let last = args.last().ok_or_else(|| EvalError::MalformedAst {
        head: "$".to_owned(),
        reason: "nothing to interpolate".to_owned(),
    })?;

    match last {
        Expr::Sym(name) => env::lookup(env, name)
            .ok_or_else(|| EvalError::UnboundSymbol(name.clone()).into()),
        other => Err(EvalError::MalformedAst {
            head: "$".to_owned(),
            reason: format!("`{}` is not a symbol", other),
        }
        .into()),
    }
}

/// The hygiene pass. Every symbol occurring anywhere in `body` that is
/// not already bound in `env` gets bound there to a fresh gensym, quoted.
/// The body itself is untouched: renaming materializes only when an
/// `Interpolate` later looks the symbol up, so macro parameters and
/// references to existing bindings pass through intact.
pub fn gensym_pass(body: &Expr, env: &EnvRef) {
    let mut symbols = Vec::new();
    collect_symbols(body, &mut symbols);

    for name in symbols {
        if env::lookup(env, &name).is_none() {
            let fresh = Value::Quoted(Box::new(Expr::Sym(gensym())));
            env.borrow_mut().define(&name, fresh);
        }
    }
}

fn collect_symbols(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Sym(name) => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        Expr::Node(_, args) => {
            for arg in args {
                collect_symbols(arg, out);
            }
        }
        _ => {}
    }
}

// }}}
