//! Colored stderr reporting for the REPL and the file runner. The debug
//! channel stays silent until the CLI switches it on.

use std::cell::Cell;
use std::fmt::Display;

const RED: &str = "\x1B[1;31m";
const YEL: &str = "\x1B[1;33m";
const GRN: &str = "\x1B[1;32m";
const GRY: &str = "\x1B[1;30m";
const RESET: &str = "\x1B[0m";

thread_local! {
    static DEBUG: Cell<bool> = Cell::new(false);
}

/// open the debug channel (set from the `--debug` flag)
pub fn enable_debug() {
    DEBUG.with(|flag| flag.set(true));
}

fn report<S: Display>(color: &str, level: &str, msg: S) {
    eprintln!("[mexpr] {}{}:{} {}", color, level, RESET, msg);
}

pub fn error<S: Display>(msg: S) {
    report(RED, "error", msg);
}

pub fn warn<S: Display>(msg: S) {
    report(YEL, "warning", msg);
}

pub fn info<S: Display>(msg: S) {
    report(GRN, "info", msg);
}

/// printed only while the debug channel is open
pub fn debug<S: Display>(msg: S) {
    if DEBUG.with(|flag| flag.get()) {
        report(GRY, "DEBUG", msg);
    }
}

// }}}
