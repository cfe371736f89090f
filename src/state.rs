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

/// Editor state: the primary buffer, the thirty-six auxiliary buffers,
/// and the input-source stack that lets an auxiliary buffer be replayed
/// as keystrokes (Ctl-B).

use std::fs::File;
use std::io::{self, Read};

/// Number of named auxiliary buffers: '0'-'9' then 'A'-'Z'.
pub const NUM_AUX_BUFFERS: usize = 36;

/// A single line of the primary buffer. Always ends in `\n`; arbitrary
/// bytes are otherwise allowed, since the editor does not interpret
/// encoding.
#[derive(Debug, Clone)]
pub struct Line(pub Vec<u8>);

impl Line {
    pub fn from_content(mut bytes: Vec<u8>) -> Self {
        if bytes.last() != Some(&b'\n') {
            bytes.push(b'\n');
        }
        Line(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Content without the trailing newline, for printing and search.
    pub fn text(&self) -> &[u8] {
        &self.0[..self.0.len() - 1]
    }
}

/// One of the thirty-six named auxiliary buffers. Holds raw bytes,
/// possibly spanning several logical lines, exactly as typed or loaded.
#[derive(Debug, Clone, Default)]
pub struct AuxBuffer {
    pub bytes: Vec<u8>,
}

/// A frame of the input-source stack: which auxiliary buffer is being
/// replayed, and how far into it we've read.
pub struct InputFrame {
    pub buf_num: usize,
    pub pos: usize,
}

/// Converts a buffer-name byte ('0'-'9', 'a'-'z', 'A'-'Z') to its index
/// 0..36. Letters are case-folded, matching the editor's buffer-naming
/// rule.
pub fn buffer_index(c: u8) -> Option<usize> {
    match c {
        b'0'..=b'9' => Some((c - b'0') as usize),
        b'A'..=b'Z' => Some(10 + (c - b'A') as usize),
        b'a'..=b'z' => Some(10 + (c - b'a') as usize),
        _ => None,
    }
}

pub fn buffer_name(idx: usize) -> u8 {
    if idx < 10 {
        b'0' + idx as u8
    } else {
        b'A' + (idx - 10) as u8
    }
}

pub struct EditorState {
    pub buffer: Vec<Line>,
    pub dot: usize,
    pub aux: [AuxBuffer; NUM_AUX_BUFFERS],
    pub input_stack: Vec<InputFrame>,
    pub quick: bool,
    /// File attached for the duration of a READ command; takes priority
    /// over the auxiliary-buffer stack and the terminal while present.
    pub file: Option<File>,
    stdin: Box<dyn Read>,
}

impl EditorState {
    pub fn new() -> Self {
        const EMPTY: AuxBuffer = AuxBuffer { bytes: Vec::new() };
        EditorState {
            buffer: Vec::new(),
            dot: 0,
            aux: [EMPTY; NUM_AUX_BUFFERS],
            input_stack: Vec::new(),
            quick: false,
            file: None,
            stdin: Box::new(io::stdin()),
        }
    }

    pub fn dollar(&self) -> usize {
        self.buffer.len()
    }

    pub fn line(&self, n: usize) -> &Line {
        &self.buffer[n - 1]
    }

    pub fn clear_input_stack(&mut self) {
        self.input_stack.clear();
    }

    /// Reads one raw byte directly from the controlling terminal,
    /// bypassing any active auxiliary-buffer frames or attached file.
    /// Returns `QedError::Eof` once the terminal itself is gone, rather
    /// than tearing the process down here — that would skip whatever
    /// raw-mode restoration the caller has set up as a `Drop` guard. The
    /// event loop is the one place that turns this into an actual exit.
    pub fn read_terminal_byte(&mut self) -> Result<u8, crate::error::QedError> {
        let mut b = [0u8; 1];
        match self.stdin.read(&mut b) {
            Ok(1) => Ok(b[0]),
            _ => Err(crate::error::QedError::Eof),
        }
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_index_covers_digits_and_both_cases() {
        assert_eq!(buffer_index(b'0'), Some(0));
        assert_eq!(buffer_index(b'9'), Some(9));
        assert_eq!(buffer_index(b'A'), Some(10));
        assert_eq!(buffer_index(b'Z'), Some(35));
        assert_eq!(buffer_index(b'a'), Some(10));
        assert_eq!(buffer_index(b'!'), None);
    }

    #[test]
    fn buffer_name_round_trips_through_buffer_index() {
        for c in b'0'..=b'9' {
            assert_eq!(buffer_name(buffer_index(c).unwrap()), c);
        }
        for c in b'A'..=b'Z' {
            assert_eq!(buffer_name(buffer_index(c).unwrap()), c);
        }
    }

    #[test]
    fn line_from_content_always_ends_in_newline() {
        assert_eq!(Line::from_content(b"abc".to_vec()).as_bytes(), b"abc\n");
        assert_eq!(Line::from_content(b"abc\n".to_vec()).as_bytes(), b"abc\n");
    }

    #[test]
    fn fresh_state_satisfies_dot_dollar_invariant() {
        let state = EditorState::new();
        assert_eq!(state.dot, 0);
        assert_eq!(state.dollar(), 0);
    }
}
