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

/// Output to the terminal: one byte at a time, through the same filter
/// the editor uses for both command echo and buffer printing, plus the
/// handful of raw glyphs line-editing echoes back.

use std::io::{self, Write};

fn raw(c: u8) {
    let _ = io::stdout().write_all(&[c]);
}

/// Writes bytes with no filtering at all — used for strings the editor
/// emits verbatim (command echo text, prompts).
pub fn print_str(s: &str) {
    let _ = io::stdout().write_all(s.as_bytes());
}

/// Writes raw bytes with no filtering at all — used where the caller
/// wants exact bytes on the wire (the PRINT line separator, the
/// surrounding text SUBSTITUTE's `W`/`V` prompt shows around a match).
pub fn print_raw(bytes: &[u8]) {
    let _ = io::stdout().write_all(bytes);
}

pub fn flush() {
    let _ = io::stdout().flush();
}

pub fn bell() {
    raw(0x07);
}

pub fn crlf() {
    print_str("\r\n");
}

/// Up-arrow glyph echoed by the rubout/delete-character control codes.
pub fn up_arrow() {
    print_str("\u{2191}");
}

/// Left-arrow glyph echoed by the kill-line control code.
pub fn left_arrow() {
    print_str("\u{2190}");
}

/// Prints one byte through the editor's display filter: `\r`/`\n` become
/// `\r\n`; a control byte in 1..=26 other than TAB becomes `&` followed
/// by that byte's letter (Ctl-A prints as `&A`); everything else,
/// including TAB, passes through unchanged.
pub fn print_char(c: u8) {
    if c == b'\r' || c == b'\n' {
        crlf();
    } else if (1..=26).contains(&c) && c != b'\t' {
        raw(b'&');
        raw(b'A' - 1 + c);
    } else {
        raw(c);
    }
}

/// Prints a whole byte string through `print_char`, one byte at a time —
/// the usual way a stored line or an auxiliary buffer's contents reach
/// the terminal.
pub fn print_bytes(bytes: &[u8]) {
    for &b in bytes {
        print_char(b);
    }
}
