use failure::Error;

use std::fmt::Debug;
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

use crate::log;
use crate::Interpreter;

impl Interpreter {
    /// run a file as a sequence of blank-line-separated inputs, the same
    /// shape the REPL reads
    pub fn run_file<P>(&self, path: P) -> Result<(), Error>
        where P: AsRef<Path> + Debug
    {
        log::info(format!("running {:?}...", path));

        let file = File::open(path)?;
        let buf = BufReader::new(file);
        let mut chunk = String::new();

        for line in buf.lines() {
            let line = line?;
            if line.trim().is_empty() {
                self.run_chunk(&mut chunk);
            } else {
                chunk.push_str(&line);
                chunk.push('\n');
            }
        }
        self.run_chunk(&mut chunk);

        log::info("run_file: done");
        Ok(())
    }

    /// evaluate one assembled input, report errors, and reset the buffer
    fn run_chunk(&self, chunk: &mut String) {
        if !chunk.trim().is_empty() {
            if let Err(err) = self.run(chunk.as_str()) {
                log::warn("an error occurred:");
                log::warn(chunk.trim());
                log::warn(err);
            }
        }
        chunk.clear();
    }
}
