// qed - a byte-oriented line editor
// Copyright (C) 2025 Brian Boynton, MD
//
// This file is part of qed.
//
// qed is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// qed is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with qed.  If not, see <https://www.gnu.org/licenses/>.

/// The host: argument parsing, raw-mode terminal setup/teardown, and the
/// top-level read-eval loop. The parser, input multiplexer, and executor
/// are all terminal-agnostic; this is the one module that knows a
/// terminal exists.
mod error;
mod executor;
mod input;
mod linespec;
mod parser;
mod printer;
mod search;
mod state;
mod strreader;

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg, Termios};

use error::QedError;
use state::{EditorState, Line};

/// QED: a line-oriented text editor with recursive auxiliary buffers.
#[derive(Parser, Debug)]
#[command(name = "qed", about = "A byte-oriented line editor with recursive auxiliary command buffers")]
struct Cli {
    /// File to read into the buffer at startup.
    file: Option<PathBuf>,

    /// Start in QUICK mode (abbreviated command echo).
    #[arg(short, long)]
    quick: bool,
}

/// Disables canonical mode and echo on stdin for the duration of the
/// editor session, and restores the prior settings on drop — including
/// on a panic unwind, so a crash never leaves the controlling terminal
/// unusable.
struct RawModeGuard {
    original: Termios,
}

impl RawModeGuard {
    fn enable() -> nix::Result<Self> {
        let stdin = std::io::stdin();
        let original = tcgetattr(&stdin)?;
        let mut raw = original.clone();
        raw.local_flags &= !(LocalFlags::ICANON | LocalFlags::ECHO);
        tcsetattr(&stdin, SetArg::TCSANOW, &raw)?;
        Ok(RawModeGuard { original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let stdin = std::io::stdin();
        let _ = tcsetattr(&stdin, SetArg::TCSANOW, &self.original);
    }
}

/// Splits a file's raw bytes into `Line`s on `\n`, matching READ FROM's
/// own split (§6.3) — a trailing partial line with no newline is still
/// kept, since the editor always stores a newline-terminated copy of it.
fn split_into_lines(content: Vec<u8>) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut cur: Vec<u8> = Vec::new();
    for b in content {
        cur.push(b);
        if b == b'\n' {
            lines.push(Line::from_content(std::mem::take(&mut cur)));
        }
    }
    if !cur.is_empty() {
        lines.push(Line::from_content(cur));
    }
    lines
}

/// Loads `path` into a fresh buffer at startup, the same convenience most
/// line editors offer. Any open failure is reported as `?` and the
/// editor starts on an empty buffer rather than refusing to run.
fn load_initial_file(state: &mut EditorState, path: &PathBuf) {
    match File::open(path).and_then(|mut f| {
        let mut content = Vec::new();
        f.read_to_end(&mut content)?;
        Ok(content)
    }) {
        Ok(content) => {
            state.buffer = split_into_lines(content);
            state.dot = state.dollar();
        }
        Err(_) => {
            printer::print_str("?\r\n");
        }
    }
}

/// Runs the parse/execute loop until FINISHED, a malformed command that
/// aborts itself (prints `?`, clears the input stack, keeps going), or
/// the terminal closing (`QedError::Eof`, which ends the loop).
fn run(state: &mut EditorState) {
    loop {
        match parser::get_command(state) {
            Ok(cmd) => match executor::execute(state, cmd) {
                Ok(true) => return,
                Ok(false) => {}
                Err(QedError::Eof) => return,
                Err(_) => {
                    printer::print_str("?\r\n");
                    state.clear_input_stack();
                }
            },
            Err(QedError::Eof) => return,
            Err(_) => {
                printer::print_str("?\r\n");
                state.clear_input_stack();
            }
        }
        printer::flush();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _raw_guard = match RawModeGuard::enable() {
        Ok(guard) => Some(guard),
        Err(_) => {
            // Not attached to a terminal (e.g. piped input in a test
            // harness) — run uncannonicalized input through as-is
            // rather than refusing to start.
            None
        }
    };

    let mut state = EditorState::new();
    state.quick = cli.quick;
    if let Some(path) = &cli.file {
        load_initial_file(&mut state, path);
    }

    run(&mut state);
    printer::flush();
    ExitCode::SUCCESS
}
