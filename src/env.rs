use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::values::Value;

/// One frame of the environment chain: a mapping of symbols to values
/// plus an optional parent. The frame without a parent is the
/// interpreter's global frame; there is exactly one per `Interpreter`
/// and every chain roots at it.
#[derive(Debug)]
pub struct Env {
    pub vars: HashMap<String, Value>,
    pub parent: Option<EnvRef>,
}

/// an interior-mutable, reference-counted smart pointer wrapper around an `Env`
pub type EnvRef = Rc<RefCell<Env>>;

impl Env {
    pub fn new(parent: Option<EnvRef>) -> Env {
        Env {
            vars: HashMap::new(),
            parent,
        }
    }

    /// add (or overwrite) a binding in this frame only
    pub fn define(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_owned(), value);
    }
}

/// a fresh empty frame extending `parent`
pub fn child(parent: &EnvRef) -> EnvRef {
    Rc::new(RefCell::new(Env::new(Some(parent.clone()))))
}

/// a frame extending `parent`, pre-seeded with `vars`
pub fn child_with(parent: &EnvRef, vars: HashMap<String, Value>) -> EnvRef {
    Rc::new(RefCell::new(Env {
        vars,
        parent: Some(parent.clone()),
    }))
}

/// resolve `name` by searching `env`, then walking its ancestors
pub fn lookup(env: &EnvRef, name: &str) -> Option<Value> {
    let mut current = env.clone();
    loop {
        let parent = {
            let frame = current.borrow();
            if let Some(value) = frame.vars.get(name) {
                return Some(value.clone());
            }
            frame.parent.clone()
        };
        match parent {
            Some(up) => current = up,
            None => return None,
        }
    }
}

/// the root of `env`'s chain, i.e. the interpreter's global frame
pub fn globals_of(env: &EnvRef) -> EnvRef {
    let mut current = env.clone();
    loop {
        let parent = current.borrow().parent.clone();
        match parent {
            Some(up) => current = up,
            None => return current,
        }
    }
}

/// Walk-and-write assignment. Writing from the global frame lands there.
/// From anywhere else, the nearest *non-global* frame already binding
/// `name` is overwritten; the global frame is skipped during the walk, so
/// an inner assignment can rebind a `let` local but never silently mutate
/// a same-named global. With no candidate, the binding is created in the
/// starting frame.
pub fn assign(env: &EnvRef, name: &str, value: Value) {
    let target = assign_target(env, name);
    target.borrow_mut().define(name, value);
}

fn assign_target(env: &EnvRef, name: &str) -> EnvRef {
    if env.borrow().parent.is_none() {
        return env.clone();
    }

    let mut current = env.clone();
    loop {
        let parent = {
            let frame = current.borrow();
            if frame.parent.is_some() && frame.vars.contains_key(name) {
                drop(frame);
                return current;
            }
            frame.parent.clone()
        };
        match parent {
            Some(up) => current = up,
            None => return env.clone(),
        }
    }
}

// }}}
