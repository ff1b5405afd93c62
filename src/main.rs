use std::path::PathBuf;

use itertools::join;
use mexpr::log;
use mexpr::values::Value;
use mexpr::Interpreter;
use rustyline::error::ReadlineError;
use rustyline::Editor;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
struct Opt {
    #[structopt(short = "d", long = "debug")]
    debug: bool,

    #[structopt(name = "INITFILE", parse(from_os_str), help = "source file to run on startup")]
    initfile: Option<PathBuf>,
}

const HISTFILE: &str = ".mexpr_hist";
const PROMPT: &str = ">> ";

fn main() {
    let opt = Opt::from_args();
    if opt.debug {
        log::enable_debug();
    }
    log::debug(format!("set options: {:?}", opt));

    let interpreter = Interpreter::new();
    if let Some(initfile) = &opt.initfile {
        if let Err(why) = interpreter.run_file(initfile) {
            log::warn(why);
        }
    }

    let mut rl = Editor::<()>::new();
    if let Err(err) = rl.load_history(HISTFILE) {
        log::warn(format!("error opening history file: {}", err));
    }

    loop {
        match read_input(&mut rl) {
            Some(text) => {
                if text.starts_with('>') {
                    println!("{}", command(&interpreter, &text[1..]));
                    continue;
                }

                rl.add_history_entry(text.trim_end());
                match interpreter.run(text.as_str()) {
                    // nil renders as the empty string; stay quiet instead
                    // of printing a blank line
                    Ok(Value::Nil) => {}
                    Ok(result) => println!("{}", result),
                    Err(err) => log::error(err),
                }
            }

            None => break,
        }
    }

    rl.save_history(HISTFILE).unwrap();
}

/// assemble one logical input: lines accumulate until a blank line
/// terminates them (commands starting with `>` stay single-line)
fn read_input(rl: &mut Editor<()>) -> Option<String> {
    let mut text = String::new();
    let mut prompt = PROMPT;

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    if text.is_empty() {
                        continue;
                    }
                    return Some(text);
                }

                if text.is_empty() && line.starts_with('>') {
                    return Some(line);
                }

                text.push_str(&line);
                text.push('\n');
                prompt = "";
            }

            Err(ReadlineError::Interrupted) => {
                println!("^C");
                text.clear();
                prompt = PROMPT;
            }

            Err(ReadlineError::Eof) => {
                println!("^D");
                return None;
            }

            Err(err) => {
                log::error(err);
                return None;
            }
        }
    }
}

fn command(interpreter: &Interpreter, cmd: &str) -> String {
    match cmd.trim() {
        "env" => join(interpreter.env.borrow().vars.keys(), ", "),
        _ => "invalid command".to_owned(),
    }
}
