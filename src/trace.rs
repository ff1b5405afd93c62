//! Side-table of traced callables, plus the entry/exit lines printed
//! around a traced call.

use itertools::join;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::Expr;
use crate::values::{Closure, Value};

thread_local! {
    static TRACED: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
    static SINK: RefCell<Option<String>> = RefCell::new(None);
}

/// mark a callable as traced; registering twice is a no-op
pub fn register(closure: &Rc<Closure>) {
    TRACED.with(|traced| {
        traced.borrow_mut().insert(Rc::as_ptr(closure) as usize);
    });
}

pub fn is_traced(closure: &Rc<Closure>) -> bool {
    TRACED.with(|traced| traced.borrow().contains(&(Rc::as_ptr(closure) as usize)))
}

/// printed before the call dispatches; arguments are the raw call-site
/// expressions, so fexpr and macro traces show what the callee receives
pub fn entry(name: &str, args: &[Expr]) {
    emit(format!(
        "Calling function: {} with arguments: {}",
        name,
        format_tuple(args)
    ));
}

pub fn exit(name: &str, result: &Value) {
    emit(format!("Function {} returned: {}", name, result));
}

// single-element tuples render with a trailing comma, host style
fn format_tuple(args: &[Expr]) -> String {
    match args {
        [only] => format!("({},)", only),
        _ => format!("({})", join(args.iter().map(|arg| arg.to_string()), ", ")),
    }
}

fn emit(line: String) {
    let buffered = SINK.with(|sink| match sink.borrow_mut().as_mut() {
        Some(buffer) => {
            buffer.push_str(&line);
            buffer.push('\n');
            true
        }
        None => false,
    });

    if !buffered {
        println!("{}", line);
    }
}

/// run `f` with trace output diverted to a buffer, returning both
#[cfg(test)]
pub fn capture<F, R>(f: F) -> (R, String)
where
    F: FnOnce() -> R,
{
    SINK.with(|sink| *sink.borrow_mut() = Some(String::new()));
    let result = f();
    let text = SINK.with(|sink| sink.borrow_mut().take()).unwrap_or_default();
    (result, text)
}

// {{{ tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_element_tuples_keep_the_comma() {
        assert_eq!(format_tuple(&[Expr::Num(1.0)]), "(1,)");
        assert_eq!(format_tuple(&[Expr::Num(1.0), Expr::Num(2.0)]), "(1, 2)");
        assert_eq!(format_tuple(&[]), "()");
    }

    #[test]
    fn captured_lines_end_with_newlines() {
        let ((), text) = capture(|| {
            emit("one".to_owned());
            emit("two".to_owned());
        });
        assert_eq!(text, "one\ntwo\n");
    }
}
// }}}
