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

/// The input-source stack: reads one byte at a time from
/// an attached file, else the topmost auxiliary-buffer frame, else the
/// terminal. Ctl-B pushes a new frame and recurses, which is how a
/// buffer can itself invoke another buffer (or itself).

use std::io::Read;

use crate::error::QedError;
use crate::printer;
use crate::state::{buffer_index, EditorState, InputFrame};

#[derive(Clone, Copy, Debug, Default)]
pub struct ReadOpts {
    pub convert: bool,
    pub echo: bool,
    pub literal: bool,
}

impl ReadOpts {
    pub fn new(convert: bool, echo: bool, literal: bool) -> Self {
        ReadOpts { convert, echo, literal }
    }
}

/// Reads one byte with no interpretation at all, from whichever source
/// is currently active. An attached file takes priority over the
/// auxiliary-buffer stack and the terminal; popping an exhausted buffer
/// frame falls through to the next frame down, or to the terminal once
/// the stack empties. An attached file running out of bytes does *not*
/// fall through to the stack/terminal the way an exhausted buffer frame
/// does — that would let live keystrokes or macro playback silently
/// splice into the middle of a file read. Instead it detaches the file
/// and reports `QedError::FileDone`, which `get_string` treats as an
/// ordinary end-of-input marker (the same role an explicit Ctl-D plays
/// for an interactive multi-line read). Fails fatally only when the
/// terminal itself has closed (`QedError::Eof`).
fn read_raw(state: &mut EditorState) -> Result<u8, QedError> {
    if let Some(file) = state.file.as_mut() {
        let mut b = [0u8; 1];
        return match file.read(&mut b) {
            Ok(1) => Ok(b[0]),
            Ok(_) => {
                state.file = None;
                Err(QedError::FileDone)
            }
            Err(e) => {
                state.file = None;
                Err(QedError::from(e))
            }
        };
    }
    loop {
        match state.input_stack.last() {
            Some(frame) => {
                let (buf_num, pos) = (frame.buf_num, frame.pos);
                let len = state.aux[buf_num].bytes.len();
                if pos < len {
                    state.input_stack.last_mut().unwrap().pos = pos + 1;
                    return Ok(state.aux[buf_num].bytes[pos]);
                }
                state.input_stack.pop();
            }
            None => return state.read_terminal_byte(),
        }
    }
}

/// Reads one logical byte: handles Ctl-B buffer invocation, the
/// `convert` case-fold/CR/ESC table, and echo. Fails only when Ctl-B
/// names a buffer that doesn't exist — every other failure mode (a
/// truly closed terminal) terminates the process directly in
/// `read_raw`/`read_terminal_byte` rather than returning here.
pub fn next_char(state: &mut EditorState, opts: ReadOpts) -> Result<u8, QedError> {
    let status = read_raw(state)?;
    if status == 0x02 && !opts.literal {
        printer::print_str("#");
        let name = next_char(state, ReadOpts::new(false, true, true))?;
        let buf_num = buffer_index(name.to_ascii_uppercase()).ok_or(QedError::BufferName)?;
        if !state.aux[buf_num].bytes.is_empty() {
            state.input_stack.push(InputFrame { buf_num, pos: 0 });
        }
        return next_char(state, opts);
    }
    let mut c = status;
    if opts.convert {
        c = convert_esc(c, state)?;
    }
    if opts.echo {
        printer::print_char(c);
    }
    Ok(c)
}

/// Capitalizes, turns CR into LF, and decodes the two recognized
/// cursor-arrow escape sequences (others collapse to Ctl-A). A failed
/// lookahead read only ever propagates `QedError::Eof` — anything else
/// (an invalid Ctl-B buffer name typed as part of the sequence) falls
/// back to Ctl-A, matching how a genuinely malformed escape collapses.
fn convert_esc(c: u8, state: &mut EditorState) -> Result<u8, QedError> {
    if c.is_ascii_lowercase() {
        Ok(c - (b'a' - b'A'))
    } else if c == b'\r' {
        Ok(b'\n')
    } else if c == 0x1B {
        let lookahead = ReadOpts::new(false, false, false);
        let c2 = match next_char(state, lookahead) {
            Ok(b) => b,
            Err(QedError::Eof) => return Err(QedError::Eof),
            Err(_) => return Ok(0x01),
        };
        if c2 == b'[' {
            let c3 = match next_char(state, lookahead) {
                Ok(b) => b,
                Err(QedError::Eof) => return Err(QedError::Eof),
                Err(_) => return Ok(0x01),
            };
            Ok(match c3 {
                b'A' => b'^',
                b'D' => b'<',
                _ => 0x01,
            })
        } else {
            Ok(0x01)
        }
    } else {
        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AuxBuffer;

    fn state_with_buffer(idx: usize, bytes: &[u8]) -> EditorState {
        let mut state = EditorState::new();
        state.aux[idx] = AuxBuffer { bytes: bytes.to_vec() };
        state
    }

    #[test]
    fn reads_raw_bytes_from_a_pushed_frame() {
        let mut state = state_with_buffer(5, b"hi");
        state.input_stack.push(InputFrame { buf_num: 5, pos: 0 });
        assert_eq!(read_raw(&mut state).unwrap(), b'h');
        assert_eq!(read_raw(&mut state).unwrap(), b'i');
        // frame exhausted; stack is empty and would fall to the terminal
        assert!(state.input_stack.is_empty());
    }

    #[test]
    fn ctl_b_pushes_a_frame_and_yields_its_first_byte() {
        let mut state = state_with_buffer(1, b"X");
        state.input_stack.push(InputFrame {
            buf_num: buffer_index(b'0').unwrap(),
            pos: 0,
        });
        state.aux[buffer_index(b'0').unwrap()].bytes = vec![0x02, b'1'];
        let c = next_char(&mut state, ReadOpts::new(true, false, false)).unwrap();
        assert_eq!(c, b'X');
        assert_eq!(state.input_stack.len(), 2);
    }

    #[test]
    fn ctl_b_with_invalid_name_errors_without_pushing() {
        let mut state = state_with_buffer(buffer_index(b'0').unwrap(), &[0x02, b'!']);
        state
            .input_stack
            .push(InputFrame { buf_num: buffer_index(b'0').unwrap(), pos: 0 });
        let result = next_char(&mut state, ReadOpts::new(true, false, false));
        assert!(matches!(result, Err(QedError::BufferName)));
    }

    #[test]
    fn ctl_b_into_empty_buffer_is_a_no_op() {
        // Buffer '2' is empty; invoking it should just fall through to
        // whatever is after it (here, nothing is left in the frame so
        // the next byte comes from the frame that issued Ctl-B itself).
        let two = buffer_index(b'2').unwrap();
        let zero = buffer_index(b'0').unwrap();
        let mut state = state_with_buffer(zero, &[0x02, b'2', b'Y']);
        state.input_stack.push(InputFrame { buf_num: zero, pos: 0 });
        let _ = two; // buffer '2' left empty by construction
        let c = next_char(&mut state, ReadOpts::new(true, false, false)).unwrap();
        assert_eq!(c, b'Y');
        assert_eq!(state.input_stack.len(), 1);
    }

    #[test]
    fn convert_lowercases_and_folds_cr_to_lf() {
        let mut state = EditorState::new();
        assert_eq!(convert_esc(b'a', &mut state).unwrap(), b'A');
        assert_eq!(convert_esc(b'\r', &mut state).unwrap(), b'\n');
        assert_eq!(convert_esc(b'Q', &mut state).unwrap(), b'Q');
    }

    #[test]
    fn convert_decodes_cursor_arrow_escapes() {
        let mut state = state_with_buffer(0, &[b'[', b'A']);
        state.input_stack.push(InputFrame { buf_num: 0, pos: 0 });
        assert_eq!(convert_esc(0x1B, &mut state).unwrap(), b'^');

        let mut state = state_with_buffer(0, &[b'[', b'D']);
        state.input_stack.push(InputFrame { buf_num: 0, pos: 0 });
        assert_eq!(convert_esc(0x1B, &mut state).unwrap(), b'<');

        let mut state = state_with_buffer(0, &[b'[', b'Z']);
        state.input_stack.push(InputFrame { buf_num: 0, pos: 0 });
        assert_eq!(convert_esc(0x1B, &mut state).unwrap(), 0x01);
    }
}
