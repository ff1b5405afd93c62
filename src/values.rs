use failure::Error;
use itertools::join;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::Expr;
use crate::env::EnvRef;

/// signature of a host operator surfaced through the primitive bridge;
/// arguments arrive already evaluated
pub type HostFn = fn(Vec<Value>) -> Result<Value, Error>;

/// representation of the language's runtime values
#[derive(Debug, Clone)]
pub enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
    /// an expression held unevaluated (what fexpr and macro parameters
    /// are bound to, and what a quoted result carries)
    Quoted(Box<Expr>),
    List(Rc<RefCell<Vec<Value>>>),
    Nil,
    Function(Rc<Closure>),
    FExpr(Rc<Closure>),
    Macro(Rc<Closure>),
    ScopedEval(ScopedEval),
    Host(HostProc),
}

use self::Value::*;

impl Value {
    /// wrap evaluated items as a list value
    pub fn list(items: Vec<Value>) -> Value {
        List(Rc::new(RefCell::new(items)))
    }

    /// represent a `Value` as a human-friendly string
    pub fn to_string(&self) -> String {
        match self {
            Num(n) => n.to_string(),
            Str(s) => s.to_owned(),
            Bool(true) => "true".to_owned(),
            Bool(false) => "false".to_owned(),
            Quoted(expr) => expr.to_string(),
            List(items) => format!(
                "[{}]",
                join(items.borrow().iter().map(|item| item.serialize()), ", ")
            ),
            Nil => String::new(),
            Function(_) => "<function>".to_owned(),
            FExpr(_) => "<fexpr>".to_owned(),
            Macro(_) => "<macro>".to_owned(),
            ScopedEval(_) => "<function>".to_owned(),
            Host(_) => "<function>".to_owned(),
        }
    }

    /// like `to_string`, but strings keep their quotes (used for list
    /// elements, where a bare rendering would be ambiguous)
    pub fn serialize(&self) -> String {
        match self {
            Str(s) => format!("\"{}\"", s),
            other => other.to_string(),
        }
    }

    /// the human-friendly type of a `Value`
    pub fn get_type(&self) -> String {
        match self {
            Num(_) => "Num",
            Str(_) => "Str",
            Bool(_) => "Bool",
            Quoted(_) => "Quoted",
            List(_) => "List",
            Nil => "Nil",
            Function(_) => "Function",
            FExpr(_) => "FExpr",
            Macro(_) => "Macro",
            ScopedEval(_) => "ScopedEval",
            Host(_) => "Host",
        }
        .to_owned()
    }

    /// only the literal `false` is falsy
    pub fn is_false(&self) -> bool {
        match self {
            Bool(false) => true,
            _ => false,
        }
    }

    /// turn a value back into an expression: a quoted value releases the
    /// expression it holds, anything else rides along as a literal
    pub fn to_expr(self) -> Expr {
        match self {
            Quoted(expr) => *expr,
            other => Expr::Lit(Box::new(other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Num(a), Num(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Bool(a), Bool(b)) => a == b,
            (Quoted(a), Quoted(b)) => a == b,
            (List(a), List(b)) => *a.borrow() == *b.borrow(),
            (Nil, Nil) => true,
            (Function(a), Function(b)) => Rc::ptr_eq(a, b),
            (FExpr(a), FExpr(b)) => Rc::ptr_eq(a, b),
            (Macro(a), Macro(b)) => Rc::ptr_eq(a, b),
            (Host(a), Host(b)) => a.name == b.name,
            _ => false, // values of different types are not equivalent
        }
    }
}

/// shared record behind the three user-defined callables; which call
/// protocol applies is decided by the `Value` variant wrapping it
pub struct Closure {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
    /// one empty frame extending the defining environment, captured at
    /// creation; invocations extend it further rather than writing into it
    pub scope: EnvRef,
}

// scope chains can cycle back through closures, so Debug stays shallow
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("body", &self.body)
            .finish()
    }
}

/// the value bound to `eval` while a fexpr body runs: a symbol resolves
/// against `def_env`, the expression it names evaluates against `call_env`
#[derive(Clone)]
pub struct ScopedEval {
    pub def_env: EnvRef,
    pub call_env: EnvRef,
}

impl fmt::Debug for ScopedEval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ScopedEval")
    }
}

/// a host operator together with the symbol it answers to
#[derive(Clone, Copy)]
pub struct HostProc {
    pub name: &'static str,
    pub f: HostFn,
}

impl fmt::Debug for HostProc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HostProc({})", self.name)
    }
}

// {{{ tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Tag;

    #[test]
    fn nil_renders_empty() {
        assert_eq!(Value::Nil.to_string(), "");
    }

    #[test]
    fn numbers_render_host_default() {
        assert_eq!(Value::Num(3.0).to_string(), "3");
        assert_eq!(Value::Num(0.5).to_string(), "0.5");
    }

    #[test]
    fn lists_quote_their_strings() {
        let list = Value::list(vec![Value::Str("a".into()), Value::Num(1.0)]);
        assert_eq!(list.to_string(), "[\"a\", 1]");
    }

    #[test]
    fn only_false_is_falsy() {
        assert!(Value::Bool(false).is_false());
        assert!(!Value::Bool(true).is_false());
        assert!(!Value::Nil.is_false());
        assert!(!Value::Num(0.0).is_false());
    }

    #[test]
    fn quoted_values_release_their_expression() {
        let expr = Expr::Node(Tag::Call, vec![Expr::Sym("f".into())]);
        let quoted = Value::Quoted(Box::new(expr.clone()));
        assert_eq!(quoted.to_expr(), expr);

        match Value::Num(1.0).to_expr() {
            Expr::Lit(inner) => assert_eq!(*inner, Value::Num(1.0)),
            other => panic!("expected a literal, got {:?}", other),
        }
    }
}
// }}}
