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

/// The string reader and the EDIT/MODIFY line-editing template mode it
/// folds in when an `oldline` is supplied.

use crate::error::QedError;
use crate::input::{self, ReadOpts};
use crate::printer;
use crate::state::EditorState;

pub struct StrOpts<'a> {
    /// Terminates a non-`oldline` read when encountered. `0x00` is used
    /// by callers (APPEND/INSERT/etc.) that never expect to see it in
    /// real input and rely solely on `oneline`/Ctl-D instead.
    pub delim: u8,
    /// Accept any content, including control bytes that would otherwise
    /// be swallowed; enables the Ctl-D terminator.
    pub full: bool,
    /// Bypass all control-character interpretation; used for the R
    /// command's raw file pass-through.
    pub literal: bool,
    /// A bare `\r`/`\n` also terminates (only consulted when `full`).
    pub oneline: bool,
    /// Enables EDIT/MODIFY template mode against this line's raw bytes
    /// (including its trailing `\n`).
    pub oldline: Option<&'a [u8]>,
}

impl<'a> StrOpts<'a> {
    pub fn multiline(literal: bool) -> Self {
        StrOpts { delim: 0, full: true, literal, oneline: true, oldline: None }
    }

    pub fn delimited(delim: u8) -> Self {
        StrOpts { delim, full: false, literal: false, oneline: true, oldline: None }
    }

    pub fn jam() -> Self {
        StrOpts { delim: 0, full: true, literal: false, oneline: false, oldline: None }
    }

    pub fn template(oldline: &'a [u8]) -> Self {
        StrOpts { delim: 0, full: true, literal: false, oneline: true, oldline: Some(oldline) }
    }
}

pub struct CollectedLine {
    pub bytes: Vec<u8>,
    /// True if this read ended because the user (or macro) typed Ctl-D.
    pub done: bool,
}

/// Collects one delimited/full/multi-line string. See `StrOpts` for
/// what each flag does; exactly one of `delim`-termination,
/// `oneline`/Ctl-D-termination (full mode), or the `oldline` template
/// table applies to a given call.
pub fn get_string(state: &mut EditorState, opts: &StrOpts, seed: &[u8]) -> Result<CollectedLine, QedError> {
    let mut out: Vec<u8> = seed.to_vec();
    let mut old_pos: usize = 0;
    let mut insert = false;
    let oldlen = opts.oldline.map(|o| o.len()).unwrap_or(0);

    loop {
        let c = match input::next_char(state, ReadOpts::new(false, false, false)) {
            Ok(c) => c,
            // The attached file ran dry. A clean file (every line ends in
            // '\n') hits this with nothing collected for the current
            // call — an empty, Ctl-D-like terminator with nothing to
            // keep. A file whose last line has no trailing '\n' hits it
            // mid-line; qed.c synthesizes the missing newline in that
            // case rather than dropping the last line, so we do too.
            Err(QedError::FileDone) => {
                if !out.is_empty() {
                    out.push(b'\n');
                }
                return Ok(CollectedLine { bytes: out, done: true });
            }
            Err(e) => return Err(e),
        };

        if opts.literal {
            out.push(c);
            if c == b'\n' {
                return Ok(CollectedLine { bytes: out, done: false });
            }
            continue;
        }

        match c {
            0x01 => {
                out.pop();
                printer::up_arrow();
                if out.is_empty() {
                    printer::crlf();
                }
            }
            0x17 => {
                printer::print_str("\\");
                while matches!(out.last(), Some(b' ') | Some(b'\t')) {
                    out.pop();
                }
                while !matches!(out.last(), None | Some(b' ') | Some(b'\t')) {
                    out.pop();
                }
                if out.is_empty() {
                    printer::crlf();
                }
            }
            0x11 => {
                printer::left_arrow();
                printer::crlf();
                out.clear();
            }
            0x16 => {
                let literal_byte = input::next_char(state, ReadOpts::new(false, false, true))?;
                out.push(literal_byte);
            }
            _ if opts.oldline.is_some() => {
                let old = opts.oldline.unwrap();
                if let Some(line) = template_step(state, &mut out, old, oldlen, &mut old_pos, &mut insert, c)? {
                    return Ok(line);
                }
            }
            _ if c == opts.delim => {
                if c > 26 {
                    printer::print_char(c);
                }
                return Ok(CollectedLine { bytes: out, done: false });
            }
            _ if opts.full && c == 0x04 => {
                return Ok(CollectedLine { bytes: out, done: true });
            }
            _ if opts.full && opts.oneline && c == b'\r' => {
                out.push(b'\n');
                printer::print_char(c);
                return Ok(CollectedLine { bytes: out, done: false });
            }
            _ => {
                out.push(c);
                printer::print_char(c);
            }
        }
    }
}

/// One EDIT/MODIFY control byte against the template `old` line.
/// Returns `Some` when this byte ends the read.
#[allow(clippy::too_many_arguments)]
fn template_step(
    state: &mut EditorState,
    out: &mut Vec<u8>,
    old: &[u8],
    oldlen: usize,
    old_pos: &mut usize,
    insert: &mut bool,
    c: u8,
) -> Result<Option<CollectedLine>, QedError> {
    match c {
        0x03 => {
            // next: copy one byte from the template, advancing in lockstep.
            if *old_pos + 1 < oldlen {
                out.push(old[*old_pos]);
                printer::print_char(old[*old_pos]);
            } else {
                printer::bell();
            }
            *old_pos += 1;
        }
        0x08 | 0x04 | 0x06 => {
            // copy rest [+ terminate [silently]]
            while *old_pos + 1 < oldlen {
                let b = old[*old_pos];
                out.push(b);
                if c != 0x06 {
                    printer::print_char(b);
                }
                *old_pos += 1;
            }
            if c != 0x08 {
                out.push(b'\n');
                return Ok(Some(CollectedLine { bytes: out.clone(), done: false }));
            }
        }
        b'\r' => {
            out.push(b'\n');
            return Ok(Some(CollectedLine { bytes: out.clone(), done: false }));
        }
        0x0F | 0x1A => {
            // copy until / copy through the next occurrence of a byte
            // the caller types next.
            let findc = input::next_char(state, ReadOpts::new(false, false, false))?;
            let search_from = if c == 0x0F { *old_pos + 1 } else { *old_pos };
            let mut found = search_from;
            while found < oldlen && old[found] != findc {
                found += 1;
            }
            if found >= oldlen.saturating_sub(1) {
                printer::bell();
            } else {
                let upto = if c == 0x0F { found.saturating_sub(1) } else { found };
                while *old_pos <= upto {
                    out.push(old[*old_pos]);
                    printer::print_char(old[*old_pos]);
                    *old_pos += 1;
                }
            }
        }
        0x13 => {
            if *old_pos + 1 < oldlen {
                *old_pos += 1;
                printer::print_char(b'%');
            } else {
                printer::bell();
            }
        }
        0x05 => {
            printer::print_char(if *insert { b'>' } else { b'<' });
            *insert = !*insert;
        }
        0x0E => {
            out.pop();
            printer::up_arrow();
            if out.is_empty() {
                printer::crlf();
            }
            if *old_pos > 0 {
                *old_pos -= 1;
            }
        }
        0x12 => {
            printer::crlf();
            printer::print_bytes(&old[*old_pos..]);
            printer::print_bytes(out);
        }
        _ => {
            out.push(c);
            printer::print_char(c);
            if *old_pos + 1 < oldlen && !*insert {
                *old_pos += 1;
            }
        }
    }
    Ok(None)
}

/// Reads lines for APPEND/INSERT/CHANGE until a line typed (or replayed)
/// with nothing on it but Ctl-D signals "stop". A blank line (bare CR)
/// is a real empty line, not a stop signal.
pub fn read_lines(state: &mut EditorState, literal: bool) -> Result<Vec<Vec<u8>>, QedError> {
    let mut lines = Vec::new();
    loop {
        let collected = get_string(state, &StrOpts::multiline(literal), &[])?;
        if collected.bytes.is_empty() {
            if collected.done {
                break;
            }
            lines.push(Vec::new());
            continue;
        }
        let done = collected.done;
        lines.push(collected.bytes);
        if done {
            printer::crlf();
            break;
        }
    }
    Ok(lines)
}
