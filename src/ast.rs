use itertools::join;
use std::fmt;

use crate::values::Value;

/// Heads a composite expression can carry. `Other` covers heads the
/// evaluator has no dedicated handling for (array and tuple literals);
/// those evaluate element-wise into a list.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Call,
    If,
    Elseif,
    Let,
    Assign,
    FExprDef,
    MacroDef,
    Interpolate,
    Global,
    Block,
    Toplevel,
    And,
    OrOp,
    Lambda,
    Quote,
    Other(String),
}

/// A parsed expression: atoms, plus `Node` pairing a head with an ordered
/// sequence of children.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Str(String),
    Sym(String),
    /// an already-computed value carried inside the tree
    Lit(Box<Value>),
    /// source line marker; inert under evaluation
    Line,
    Nil,
    Node(Tag, Vec<Expr>),
}

/// operators rendered infix when they appear as two-argument calls
const INFIX_OPS: &[&str] = &["+", "-", "*", "/", "==", "!=", "<", ">", "<=", ">="];

impl Expr {
    /// represent an `Expr` as surface-syntax-shaped text
    pub fn to_string(&self) -> String {
        match self {
            Expr::Num(n) => n.to_string(),
            Expr::Str(s) => format!("\"{}\"", s),
            Expr::Sym(s) => s.clone(),
            Expr::Lit(value) => value.to_string(),
            Expr::Line => String::new(),
            Expr::Nil => "nil".to_owned(),
            Expr::Node(tag, args) => render_node(tag, args),
        }
    }

    /// the statements of a `Block`, or the expression itself when unblocked
    fn flatten(&self) -> Vec<&Expr> {
        match self {
            Expr::Node(Tag::Block, args) => args.iter().collect(),
            other => vec![other],
        }
    }
}

fn render_node(tag: &Tag, args: &[Expr]) -> String {
    let parts = || join(args.iter().map(|a| a.to_string()), ", ");
    let stmts = |exprs: &[&Expr]| join(exprs.iter().map(|e| e.to_string()), "; ");

    match tag {
        Tag::Call => {
            if let [Expr::Sym(op), lhs, rhs] = args {
                if INFIX_OPS.contains(&op.as_str()) {
                    return format!("{} {} {}", lhs, op, rhs);
                }
            }
            match args.split_first() {
                Some((callee, rest)) => format!(
                    "{}({})",
                    callee,
                    join(rest.iter().map(|a| a.to_string()), ", ")
                ),
                None => "()".to_owned(),
            }
        }

        Tag::If | Tag::Elseif => match args {
            [cond, conseq, alt] => format!("{} ? {} : {}", cond, conseq, alt),
            [cond, conseq] => format!("{} ? {} : false", cond, conseq),
            _ => format!("if({})", parts()),
        },

        Tag::Let => match args {
            [binds, body] => format!(
                "let {}; {} end",
                join(binds.flatten().iter().map(|e| e.to_string()), ", "),
                stmts(&body.flatten())
            ),
            _ => format!("let({})", parts()),
        },

        Tag::Assign => match args {
            [lhs, rhs] => format!("{} = {}", lhs, rhs),
            _ => format!("=({})", parts()),
        },
        Tag::FExprDef => match args {
            [lhs, rhs] => format!("{} := {}", lhs, rhs),
            _ => format!(":=({})", parts()),
        },
        Tag::MacroDef => match args {
            [lhs, rhs] => format!("{} $= {}", lhs, rhs),
            _ => format!("$=({})", parts()),
        },

        Tag::Interpolate => match args.last() {
            Some(inner) => format!("${}", inner),
            None => "$".to_owned(),
        },

        Tag::Global => format!("global {}", parts()),
        Tag::Block => format!(
            "begin {} end",
            join(args.iter().map(|a| a.to_string()), "; ")
        ),
        Tag::Toplevel => join(args.iter().map(|a| a.to_string()), "; "),
        Tag::And => join(args.iter().map(|a| a.to_string()), " && "),
        Tag::OrOp => join(args.iter().map(|a| a.to_string()), " || "),

        Tag::Lambda => match args {
            [params, body] => format!("{} -> {}", params, body),
            _ => format!("->({})", parts()),
        },

        Tag::Quote => format!(
            ":({})",
            join(args.iter().map(|a| a.to_string()), "; ")
        ),

        Tag::Other(name) => match name.as_str() {
            "vect" => format!("[{}]", parts()),
            "tuple" => format!("({})", parts()),
            _ => format!("{}({})", name, parts()),
        },
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_string())
    }
}

// }}}
