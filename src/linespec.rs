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

/// The address-expression AST and its resolver. Modeled as an ordered
/// sequence of variant atoms rather than the original's linked
/// `line_spec` chain with a transient "sign seen, no operand yet" state
/// — the parser can emit a complete atom in one step, so there's
/// nothing left to hold in between.

use crate::error::QedError;
use crate::search;
use crate::state::EditorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Tag,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    /// A signed literal line number, e.g. the `-3` in `12-3+1`.
    Num(i64),
    Dot,
    Dollar,
    Search { needle: Vec<u8>, kind: SearchKind },
}

/// A complete address expression: a chain of atoms, left-associative.
pub type LineSpec = Vec<Atom>;

/// Folds a line-spec's atoms against the current editor state into a
/// resolved line number. A search's needle is, as a side effect, stored
/// into auxiliary buffer `0`; searches use `dot + 1` as their starting
/// line only when they are the first atom in the chain, otherwise the
/// accumulator so far.
pub fn resolve(spec: &LineSpec, state: &mut EditorState) -> Result<usize, QedError> {
    let mut acc: i64 = 0;
    for (i, atom) in spec.iter().enumerate() {
        match atom {
            Atom::Num(n) => acc += n,
            Atom::Dot => acc += state.dot as i64,
            Atom::Dollar => acc += state.dollar() as i64,
            Atom::Search { needle, kind } => {
                state.aux[0].bytes = needle.clone();
                let start = if i == 0 { state.dot as i64 + 1 } else { acc };
                let is_tag = *kind == SearchKind::Tag;
                let found = search::find(state, needle, start, is_tag);
                if found == 0 {
                    return Err(QedError::NoMatch);
                }
                acc = found as i64;
            }
        }
    }
    if acc < 0 || acc as usize > state.dollar() {
        return Err(QedError::InvalidAddress);
    }
    Ok(acc as usize)
}
