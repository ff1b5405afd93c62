use failure::Error;
use itertools::join;

use crate::errors::EvalError;
use crate::trace;
use crate::values::Value::{self, *};
use crate::values::{HostFn, HostProc};

/// The primitive bridge: host operators reachable by symbols that are
/// not bound anywhere in the environment chain. The call protocol
/// evaluates arguments before any of these run.
pub const BUILTINS: &[(&str, HostFn)] = &[
    ("+",                  add),
    ("-",                  sub),
    ("*",                  mul),
    ("/",                  div),
    ("==",                 eq),
    ("!=",                 neq),
    ("<",                  lt),
    (">",                  gt),
    ("<=",                 leq),
    (">=",                 geq),
    ("!",                  not),
    ("push!",              push),
    ("append!",            append),
    ("println",            println_values),
    ("register_traceable", register_traceable),
];

pub fn resolve(name: &str) -> Option<HostProc> {
    BUILTINS
        .iter()
        .find(|(entry, _)| *entry == name)
        .map(|&(name, f)| HostProc { name, f })
}

// {{{ helpful macros
/// return from an operator if $args doesn't contain $num elements
macro_rules! check_num_args {
    ($args:ident, $num:expr, $name:expr) => {{
        if $args.len() != $num {
            Err(EvalError::ArityMismatch {
                name: $name.to_string(),
                expected: $num,
                got: $args.len(),
            })
        } else {
            Ok(())
        }
    }};
}

/// return an Err(EvalError::TypeError)
macro_rules! type_err {
    ($name:expr, $expected:expr, $got:expr) => {
        Err(EvalError::TypeError {
            name: $name.to_string(),
            expected: $expected.to_string(),
            got: $got.get_type(),
        }
        .into())
    };
}
// }}}

// {{{ math
/// shared arithmetic driver
/// usage: 1 + 2      (also string concatenation: "a" + "b")
///        4 - 1
///        2 * 3
///        1 / 2
fn math(op: &str, mut args: Vec<Value>) -> Result<Value, Error> {
    // unary minus arrives as a one-argument call
    if op == "-" && args.len() == 1 {
        return match args.remove(0) {
            Num(n) => Ok(Num(-n)),
            other => type_err!("-", "Num", other),
        };
    }

    check_num_args!(args, 2, op)?;

    if op == "+" && args.iter().all(|arg| match arg {
        Str(_) => true,
        _ => false,
    }) {
        let init = args.remove(0);
        return Ok(args.into_iter().fold(init, |acc, s| acc + s));
    }

    for arg in &args {
        match arg {
            Num(_) => continue,
            other => return type_err!(op, "Num", other),
        }
    }

    let init = args.remove(0);
    let result = match op {
        "+" => args.into_iter().fold(init, |acc, n| acc + n),
        "-" => args.into_iter().fold(init, |acc, n| acc - n),
        "*" => args.into_iter().fold(init, |acc, n| acc * n),
        "/" => args.into_iter().fold(init, |acc, n| acc / n),
        _ => unreachable!(),
    };

    Ok(result)
}

fn add(args: Vec<Value>) -> Result<Value, Error> {
    math("+", args)
}

fn sub(args: Vec<Value>) -> Result<Value, Error> {
    math("-", args)
}

fn mul(args: Vec<Value>) -> Result<Value, Error> {
    math("*", args)
}

fn div(args: Vec<Value>) -> Result<Value, Error> {
    math("/", args)
}
// }}}

// {{{ comparison
/// shared comparison driver
/// usage: a == b     a != b     a < b     a > b     a <= b     a >= b
fn logic(op: &str, args: Vec<Value>) -> Result<Value, Error> {
    check_num_args!(args, 2, op)?;

    match op {
        "==" => return Ok(Bool(args[0] == args[1])),
        "!=" => return Ok(Bool(args[0] != args[1])),
        _ => {}
    }

    let a = expect_num(&args[0], op)?;
    let b = expect_num(&args[1], op)?;
    let result = match op {
        "<" => a < b,
        ">" => a > b,
        "<=" => a <= b,
        ">=" => a >= b,
        _ => unreachable!(),
    };

    Ok(Bool(result))
}

fn expect_num(value: &Value, op: &str) -> Result<f64, Error> {
    match value {
        Num(n) => Ok(*n),
        other => type_err!(op, "Num", other),
    }
}

fn eq(args: Vec<Value>) -> Result<Value, Error> {
    logic("==", args)
}

fn neq(args: Vec<Value>) -> Result<Value, Error> {
    logic("!=", args)
}

fn lt(args: Vec<Value>) -> Result<Value, Error> {
    logic("<", args)
}

fn gt(args: Vec<Value>) -> Result<Value, Error> {
    logic(">", args)
}

fn leq(args: Vec<Value>) -> Result<Value, Error> {
    logic("<=", args)
}

fn geq(args: Vec<Value>) -> Result<Value, Error> {
    logic(">=", args)
}

/// logical inverse of a boolean
/// usage: !flag
fn not(args: Vec<Value>) -> Result<Value, Error> {
    check_num_args!(args, 1, "!")?;

    match &args[0] {
        Bool(b) => Ok(Bool(!b)),
        other => type_err!("!", "Bool", other),
    }
}
// }}}

// {{{ lists
/// append each further argument to a list, in place
/// usage: push!(items, value)
fn push(mut args: Vec<Value>) -> Result<Value, Error> {
    if args.len() < 2 {
        return Err(EvalError::ArityMismatch {
            name: "push!".to_owned(),
            expected: 2,
            got: args.len(),
        }
        .into());
    }

    let list = args.remove(0);
    match &list {
        List(items) => items.borrow_mut().extend(args),
        other => return type_err!("push!", "List", other),
    }

    Ok(list)
}

/// splice the second list onto the end of the first, in place
/// usage: append!(items, more)
fn append(args: Vec<Value>) -> Result<Value, Error> {
    check_num_args!(args, 2, "append!")?;

    match (&args[0], &args[1]) {
        (List(dst), List(src)) => {
            // clone out first so appending a list to itself can't
            // overlap the borrows
            let incoming = src.borrow().clone();
            dst.borrow_mut().extend(incoming);
        }
        (List(_), other) => return type_err!("append!", "List", other),
        (other, _) => return type_err!("append!", "List", other),
    }

    Ok(args[0].clone())
}
// }}}

// {{{ output
/// print the rendered arguments followed by a newline
/// usage: println("Positive")
fn println_values(args: Vec<Value>) -> Result<Value, Error> {
    println!("{}", join(args.iter().map(|arg| arg.to_string()), ""));
    Ok(Nil)
}
// }}}

// {{{ tracing
/// mark a callable for call tracing; returns its argument
/// usage: register_traceable(f)
fn register_traceable(mut args: Vec<Value>) -> Result<Value, Error> {
    check_num_args!(args, 1, "register_traceable")?;

    let value = args.remove(0);
    match &value {
        Function(closure) | FExpr(closure) | Macro(closure) => trace::register(closure),
        other => return type_err!("register_traceable", "callable", other),
    }

    Ok(value)
}
// }}}

// {{{ tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_folds_numbers() {
        assert_eq!(add(vec![Num(1.0), Num(2.0)]).unwrap(), Num(3.0));
    }

    #[test]
    fn addition_concatenates_strings() {
        let result = add(vec![Str("foo".into()), Str("bar".into())]).unwrap();
        assert_eq!(result, Str("foobar".into()));
    }

    #[test]
    fn mixed_addition_is_a_type_error() {
        assert!(add(vec![Num(1.0), Str("x".into())]).is_err());
    }

    #[test]
    fn unary_minus_negates() {
        assert_eq!(sub(vec![Num(3.0)]).unwrap(), Num(-3.0));
    }

    #[test]
    fn comparisons_produce_native_booleans() {
        assert_eq!(lt(vec![Num(1.0), Num(2.0)]).unwrap(), Bool(true));
        assert_eq!(eq(vec![Str("a".into()), Str("a".into())]).unwrap(), Bool(true));
        assert_eq!(eq(vec![Str("a".into()), Num(1.0)]).unwrap(), Bool(false));
    }

    #[test]
    fn ordering_non_numbers_is_a_type_error() {
        assert!(lt(vec![Str("a".into()), Str("b".into())]).is_err());
    }

    #[test]
    fn push_mutates_through_the_alias() {
        let list = Value::list(vec![Num(1.0)]);
        let alias = list.clone();
        push(vec![list, Num(2.0)]).unwrap();
        assert_eq!(alias, Value::list(vec![Num(1.0), Num(2.0)]));
    }

    #[test]
    fn append_splices_in_place() {
        let dst = Value::list(vec![Num(1.0)]);
        let src = Value::list(vec![Num(2.0), Num(3.0)]);
        let result = append(vec![dst.clone(), src]).unwrap();
        assert_eq!(result, Value::list(vec![Num(1.0), Num(2.0), Num(3.0)]));
        assert_eq!(dst, result);
    }

    #[test]
    fn push_requires_a_list_and_a_value() {
        assert!(push(vec![]).is_err());
        assert!(push(vec![Value::list(vec![])]).is_err());
    }

    #[test]
    fn append_requires_two_lists() {
        assert!(append(vec![]).is_err());
        assert!(append(vec![Value::list(vec![])]).is_err());
        let three = vec![Value::list(vec![]), Value::list(vec![]), Value::list(vec![])];
        assert!(append(three).is_err());
    }

    #[test]
    fn append_to_itself_doubles() {
        let list = Value::list(vec![Num(1.0), Num(2.0)]);
        append(vec![list.clone(), list.clone()]).unwrap();
        assert_eq!(
            list,
            Value::list(vec![Num(1.0), Num(2.0), Num(1.0), Num(2.0)])
        );
    }

    #[test]
    fn register_traceable_takes_exactly_one_callable() {
        assert!(register_traceable(vec![]).is_err());
        assert!(register_traceable(vec![Num(1.0)]).is_err());
    }

    #[test]
    fn resolve_finds_operators() {
        assert!(resolve("+").is_some());
        assert!(resolve("no_such_op").is_none());
    }
}
// }}}
