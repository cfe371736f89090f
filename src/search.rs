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

/// Literal substring search: no regular expressions, by design.

use crate::state::EditorState;

fn contains_at_start(line: &[u8], needle: &[u8]) -> bool {
    line.len() >= needle.len() && &line[..needle.len()] == needle
}

fn contains(line: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    line.windows(needle.len()).any(|w| w == needle)
}

/// Tag match: `needle` occurs at the very start of the line, and the
/// byte immediately after it exists and is not alphanumeric.
fn tag_match(line: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || !contains_at_start(line, needle) {
        return false;
    }
    match line.get(needle.len()) {
        Some(&b) => !b.is_ascii_alphanumeric(),
        None => false,
    }
}

/// Scans forward from `start_line` through `dollar`, then wraps through
/// `1..start_line`. Returns the first matching line number, or 0 if
/// `needle` is found nowhere.
pub fn find(state: &EditorState, needle: &[u8], start_line: i64, is_tag: bool) -> usize {
    let dollar = state.dollar();
    if dollar == 0 {
        return 0;
    }
    let start = start_line.clamp(1, dollar as i64 + 1) as usize;
    let matches = |n: usize| -> bool {
        let text = state.line(n).text();
        if is_tag {
            tag_match(text, needle)
        } else {
            contains(text, needle)
        }
    };
    for n in start..=dollar {
        if matches(n) {
            return n;
        }
    }
    for n in 1..start.min(dollar + 1) {
        if matches(n) {
            return n;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Line;

    fn state_with(lines: &[&str]) -> EditorState {
        let mut state = EditorState::new();
        state.buffer = lines
            .iter()
            .map(|s| Line::from_content(s.as_bytes().to_vec()))
            .collect();
        state.dot = state.buffer.len();
        state
    }

    #[test]
    fn finds_forward_from_start_line() {
        let state = state_with(&["alpha", "beta", "gamma"]);
        assert_eq!(find(&state, b"gam", 1, false), 3);
    }

    #[test]
    fn wraps_around_when_not_found_after_start() {
        let state = state_with(&["alpha", "beta", "gamma"]);
        assert_eq!(find(&state, b"alpha", 2, false), 1);
    }

    #[test]
    fn returns_zero_when_not_found_anywhere() {
        let state = state_with(&["alpha", "beta"]);
        assert_eq!(find(&state, b"zzz", 1, false), 0);
    }

    #[test]
    fn tag_search_requires_line_start_and_non_alnum_boundary() {
        let state = state_with(&["foot", "foo(x)", "barfoo"]);
        assert_eq!(find(&state, b"foo", 1, true), 2);
    }

    #[test]
    fn tag_search_rejects_match_with_no_trailing_byte() {
        let state = state_with(&["foo"]);
        assert_eq!(find(&state, b"foo", 1, true), 0);
    }

    #[test]
    fn empty_buffer_has_no_matches() {
        let state = EditorState::new();
        assert_eq!(find(&state, b"x", 1, false), 0);
    }
}
