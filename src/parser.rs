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

/// The command parser: `get_command`. A character-driven recognizer
/// that builds address expressions atom by atom and, once a command
/// letter is recognized, reads whatever trailing arguments that
/// command needs (buffer name, filename, substitute flags/strings)
/// before requiring the confirming `.`.

use crate::error::QedError;
use crate::input::{self, ReadOpts};
use crate::linespec::{Atom, LineSpec, SearchKind};
use crate::printer;
use crate::state::EditorState;
use crate::strreader::{self, StrOpts};

#[derive(Debug)]
pub struct CommandSpec {
    pub start: Option<LineSpec>,
    pub end: Option<LineSpec>,
    pub command: u8,
    pub arg1: Option<Vec<u8>>,
    pub arg2: Option<Vec<u8>>,
    pub flag: u8,
    pub num: i64,
}

struct CommandDesc {
    key: u8,
    long: &'static str,
    short: &'static str,
    addrs: u8,
    confirm: bool,
    addr_exempt: bool,
}

// One table joined by command byte, replacing the original's parallel
// cmd_chars/cmd_strings/cmd_strings_quick/cmd_addrs/cmd_noconf/cmd_noaddr
// arrays.
const COMMANDS: &[CommandDesc] = &[
    CommandDesc { key: b'"', long: "\"", short: "\"", addrs: 0, confirm: false, addr_exempt: true },
    CommandDesc { key: b'/', long: "/", short: "/", addrs: 2, confirm: false, addr_exempt: false },
    CommandDesc { key: b'=', long: "=", short: "=", addrs: 1, confirm: false, addr_exempt: false },
    CommandDesc { key: b'^', long: "\u{2191}", short: "", addrs: 0, confirm: false, addr_exempt: false },
    CommandDesc { key: b'<', long: "\u{2190}", short: "", addrs: 1, confirm: false, addr_exempt: false },
    CommandDesc { key: b'\n', long: "\r\n", short: "\r\n", addrs: 2, confirm: false, addr_exempt: false },
    CommandDesc { key: b'A', long: "APPEND", short: "A", addrs: 1, confirm: true, addr_exempt: false },
    CommandDesc { key: b'B', long: "BUFFER #", short: "B", addrs: 0, confirm: true, addr_exempt: true },
    CommandDesc { key: b'C', long: "CHANGE", short: "C", addrs: 2, confirm: true, addr_exempt: false },
    CommandDesc { key: b'D', long: "DELETE", short: "D", addrs: 2, confirm: true, addr_exempt: false },
    CommandDesc { key: b'E', long: "EDIT", short: "E", addrs: 2, confirm: true, addr_exempt: false },
    CommandDesc { key: b'F', long: "FINISHED", short: "F", addrs: 0, confirm: true, addr_exempt: true },
    CommandDesc { key: b'G', long: "GET #", short: "G", addrs: 2, confirm: true, addr_exempt: false },
    CommandDesc { key: b'I', long: "INSERT", short: "I", addrs: 1, confirm: true, addr_exempt: false },
    CommandDesc { key: b'J', long: "JAM INTO #", short: "J", addrs: 0, confirm: true, addr_exempt: true },
    CommandDesc { key: b'K', long: "KILL #", short: "K", addrs: 0, confirm: true, addr_exempt: true },
    CommandDesc { key: b'L', long: "LOAD #", short: "L", addrs: 2, confirm: true, addr_exempt: false },
    CommandDesc { key: b'M', long: "MODIFY", short: "M", addrs: 2, confirm: true, addr_exempt: false },
    CommandDesc { key: b'P', long: "PRINT", short: "P", addrs: 2, confirm: true, addr_exempt: false },
    CommandDesc { key: b'Q', long: "QUICK", short: "Q", addrs: 0, confirm: true, addr_exempt: true },
    CommandDesc { key: b'R', long: "READ FROM ", short: "R", addrs: 1, confirm: true, addr_exempt: false },
    CommandDesc { key: b'S', long: "SUBSTITUTE ", short: "S", addrs: 2, confirm: true, addr_exempt: false },
    CommandDesc { key: b'T', long: "TABS", short: "T", addrs: 0, confirm: true, addr_exempt: true },
    CommandDesc { key: b'V', long: "VERBOSE", short: "V", addrs: 0, confirm: true, addr_exempt: true },
    CommandDesc { key: b'W', long: "WRITE ON ", short: "W", addrs: 2, confirm: true, addr_exempt: false },
];

// `convert` folds a typed CR to LF before it ever reaches here, so the
// table only needs one entry for the bare-newline command.
fn lookup(c: u8) -> Option<&'static CommandDesc> {
    COMMANDS.iter().find(|d| d.key == c)
}

/// The one mutable "current atom" slot an address chain writes into, as
/// it is being built. Mirrors the original's `*line` pointer: present
/// (`Some`) once any atom has started, absent (`None`) beforehand.
enum Open {
    /// A sign has been seen but no digit, `.`, `$` or search has
    /// followed it yet.
    Continuation { sign: i64 },
    Num { sign: i64, magnitude: i64 },
    Complete(Atom),
}

#[derive(Default)]
struct AddrBuilder {
    atoms: Vec<Atom>,
    open: Option<Open>,
}

impl AddrBuilder {
    fn has_any(&self) -> bool {
        self.open.is_some() || !self.atoms.is_empty()
    }

    fn push_open(&mut self) {
        if let Some(open) = self.open.take() {
            let atom = match open {
                // A dangling sign can never reach here: cmd_valid/
                // compound_valid are both cleared by a bare sign, which
                // blocks every production (digit, ./$, :/[,  comma, or a
                // command letter) that would otherwise finalize it.
                Open::Continuation { .. } => return,
                Open::Num { sign, magnitude } => Atom::Num(sign * magnitude),
                Open::Complete(atom) => atom,
            };
            self.atoms.push(atom);
        }
    }

    fn digit(&mut self, d: i64) -> Result<(), QedError> {
        match &mut self.open {
            None => self.open = Some(Open::Num { sign: 1, magnitude: d }),
            Some(Open::Continuation { sign }) => {
                let sign = *sign;
                self.open = Some(Open::Num { sign, magnitude: d });
            }
            Some(Open::Num { magnitude, .. }) => *magnitude = *magnitude * 10 + d,
            Some(Open::Complete(_)) => return Err(QedError::InvalidCommand),
        }
        Ok(())
    }

    fn sign(&mut self, s: i64) {
        self.push_open();
        self.open = Some(Open::Continuation { sign: s });
    }

    /// `.`/`$`: requires the slot be empty or a dangling sign; any other
    /// state (a plain number or an already-complete atom) is a hard
    /// parse error, unlike a search which always succeeds.
    fn relative(&mut self, atom: Atom) -> Result<(), QedError> {
        match &self.open {
            None | Some(Open::Continuation { .. }) => {
                self.open = Some(Open::Complete(atom));
                Ok(())
            }
            _ => Err(QedError::InvalidCommand),
        }
    }

    /// `:`/`[`: fills an empty or dangling-sign slot in place; against
    /// anything already complete, finalizes it and starts a fresh atom
    /// instead of failing.
    fn search(&mut self, atom: Atom) {
        match &self.open {
            None | Some(Open::Continuation { .. }) => {
                self.open = Some(Open::Complete(atom));
            }
            _ => {
                self.push_open();
                self.open = Some(Open::Complete(atom));
            }
        }
    }

    fn finish(mut self) -> LineSpec {
        self.push_open();
        self.atoms
    }
}

fn read_char(state: &mut EditorState) -> Result<u8, QedError> {
    input::next_char(state, ReadOpts::new(true, false, false))
}

/// B/G/J/K/L's trailing buffer name: one alnum byte (already
/// upper-cased by `convert`), echoed; anything else is a parse failure.
fn read_buffer_name(state: &mut EditorState) -> Result<u8, QedError> {
    let c = read_char(state)?;
    if c.is_ascii_digit() || c.is_ascii_uppercase() {
        printer::print_char(c);
        Ok(c)
    } else {
        Err(QedError::BufferName)
    }
}

/// R/W's filename: skip (and echo) leading whitespace; the first
/// non-whitespace byte becomes the delimiter, and the filename is
/// everything up to its next occurrence (not included) — the same
/// chosen-separator convention SUBSTITUTE uses for its find/replace
/// strings. A path containing the chosen delimiter needs a different
/// one picked, e.g. `R:/tmp/a/b:` delimited by `:` for a path with `/`
/// in it.
fn read_filename(state: &mut EditorState) -> Result<Vec<u8>, QedError> {
    let mut c = input::next_char(state, ReadOpts::new(false, true, false))?;
    while c == b' ' || c == b'\t' || c == b'\n' || c == b'\r' {
        c = input::next_char(state, ReadOpts::new(false, true, false))?;
    }
    let collected = strreader::get_string(state, &StrOpts::delimited(c), &[])?;
    Ok(collected.bytes)
}

fn skip_ws(state: &mut EditorState) -> Result<u8, QedError> {
    loop {
        let c = input::next_char(state, ReadOpts::new(true, true, false))?;
        if c != b' ' && c != b'\t' {
            return Ok(c);
        }
    }
}

/// SUBSTITUTE's flag/separator grammar: `:` followed by digits sets
/// `num`; `:` followed by one of G/W/L/V sets `flag`; either may repeat.
/// The first byte that is neither ends flag-reading and becomes the
/// separator for the two operand strings (see DESIGN.md's Open
/// Question on this — the original hard-fails here instead, which
/// can't produce its own worked example).
fn read_flags(state: &mut EditorState) -> Result<(u8, i64, u8), QedError> {
    let mut flag = b'G';
    let mut num: i64 = -1;
    let mut c = skip_ws(state)?;
    while c == b':' {
        let mut n: i64 = 0;
        let mut got_digit = false;
        c = read_char(state)?;
        while c.is_ascii_digit() {
            got_digit = true;
            printer::print_char(c);
            n = n * 10 + (c - b'0') as i64;
            num = n;
            c = read_char(state)?;
        }
        if got_digit {
            continue;
        }
        if matches!(c, b'G' | b'W' | b'L' | b'V') {
            printer::print_char(c);
            flag = c;
            c = skip_ws(state)?;
        } else {
            break;
        }
    }
    Ok((flag, num, c))
}

/// Reads one complete command from the input source stack, building and
/// echoing it as it goes. Returns `Err` on any malformed input (the
/// caller prints `?` and clears the input-source stack) or on two
/// consecutive DEL bytes canceling the command in progress.
pub fn get_command(state: &mut EditorState) -> Result<CommandSpec, QedError> {
    printer::print_str("*");

    let mut start = AddrBuilder::default();
    let mut end = AddrBuilder::default();
    let mut second_addr = false;
    let mut compound_valid = false;
    let mut cmd_valid = true;
    let mut rel_valid = true;
    let mut rubout_pressed = false;

    loop {
        let c = read_char(state)?;

        if c == 0x7F {
            if rubout_pressed {
                return Err(QedError::InvalidCommand);
            }
            printer::bell();
            rubout_pressed = true;
            continue;
        }
        rubout_pressed = false;

        match c {
            b'0'..=b'9' => {
                let active = if second_addr { &mut end } else { &mut start };
                active.digit((c - b'0') as i64)?;
                compound_valid = true;
                cmd_valid = true;
                printer::print_char(c);
            }
            b'+' | b'-' => {
                let active = if second_addr { &mut end } else { &mut start };
                if !active.has_any() || !compound_valid {
                    return Err(QedError::InvalidCommand);
                }
                active.sign(if c == b'+' { 1 } else { -1 });
                cmd_valid = false;
                compound_valid = false;
                printer::print_char(c);
            }
            b'.' | b'$' => {
                if !rel_valid {
                    return Err(QedError::InvalidCommand);
                }
                let active = if second_addr { &mut end } else { &mut start };
                let atom = if c == b'.' { Atom::Dot } else { Atom::Dollar };
                active.relative(atom)?;
                rel_valid = false;
                compound_valid = true;
                cmd_valid = true;
                printer::print_char(c);
            }
            b':' | b'[' => {
                printer::print_char(c);
                let delim = if c == b'[' { b']' } else { b':' };
                let read = strreader::get_string(state, &StrOpts::delimited(delim), &[])?;
                let kind = if c == b':' { SearchKind::Tag } else { SearchKind::Context };
                let active = if second_addr { &mut end } else { &mut start };
                active.search(Atom::Search { needle: read.bytes, kind });
                rel_valid = false;
                compound_valid = true;
                cmd_valid = true;
            }
            b',' => {
                if !start.has_any() || !compound_valid || second_addr {
                    return Err(QedError::InvalidCommand);
                }
                second_addr = true;
                cmd_valid = false;
                compound_valid = false;
                rel_valid = true;
                printer::print_char(c);
            }
            _ => {
                let Some(desc) = lookup(c) else {
                    printer::bell();
                    continue;
                };
                if !cmd_valid {
                    return Err(QedError::InvalidCommand);
                }
                let addr_count = start.has_any() as u8 + end.has_any() as u8;
                if addr_count > desc.addrs {
                    return Err(QedError::InvalidCommand);
                }
                printer::print_str(if state.quick { desc.short } else { desc.long });

                let mut cmd = CommandSpec {
                    start: if start.has_any() { Some(start.finish()) } else { None },
                    end: if end.has_any() { Some(end.finish()) } else { None },
                    command: desc.key,
                    arg1: None,
                    arg2: None,
                    flag: b'G',
                    num: -1,
                };

                if desc.confirm {
                    match desc.key {
                        b'B' | b'G' | b'J' | b'K' | b'L' => {
                            let name = read_buffer_name(state)?;
                            cmd.arg1 = Some(vec![name]);
                        }
                        b'R' | b'W' => {
                            cmd.arg1 = Some(read_filename(state)?);
                        }
                        b'S' => {
                            let (flag, num, sep) = read_flags(state)?;
                            cmd.flag = flag;
                            cmd.num = num;
                            let find = strreader::get_string(state, &StrOpts::delimited(sep), &[])?;
                            cmd.arg1 = Some(find.bytes);
                            printer::print_str(" FOR ");
                            printer::print_char(sep);
                            let replace = strreader::get_string(state, &StrOpts::delimited(sep), &[])?;
                            if replace.bytes.is_empty() {
                                return Err(QedError::EmptyReplacement);
                            }
                            cmd.arg2 = Some(replace.bytes);
                        }
                        _ => {}
                    }
                    let confirm = read_char(state)?;
                    if confirm != b'.' {
                        return Err(QedError::InvalidCommand);
                    }
                    printer::print_char(confirm);
                }
                return Ok(cmd);
            }
        }
    }
}
