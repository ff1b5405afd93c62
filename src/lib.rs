//! A tree-walking interpreter for a small homoiconic expression
//! language: eager functions, fexprs (called with their arguments
//! unevaluated), and hygienic macros with quasiquotation, over lexically
//! scoped environment frames rooted in a single global frame.

#[macro_use]
extern crate failure_derive;

mod arithmetic;
pub mod ast;
pub mod builtins;
pub mod env;
pub mod errors;
pub mod eval;
pub mod expand;
mod file;
pub mod log;
pub mod parser;
pub mod trace;
pub mod values;

use failure::Error;
use std::cell::RefCell;
use std::rc::Rc;

use crate::env::{Env, EnvRef};
use crate::values::Value;

/// An interpreter instance: the pinned global frame every evaluation
/// runs against.
#[derive(Clone)]
pub struct Interpreter {
    pub env: EnvRef,
}

impl Interpreter {
    /// create a new Interpreter with an empty global frame
    pub fn new() -> Interpreter {
        Interpreter {
            env: Rc::new(RefCell::new(Env::new(None))),
        }
    }

    /// parse a string of source text and evaluate it against the global
    /// frame
    pub fn run<S: Into<String>>(&self, code: S) -> Result<Value, Error> {
        let expr = parser::parse(&code.into())?;
        eval::eval(&expr, &self.env)
    }
}

// }}}
