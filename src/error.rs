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

/// Error handling - the editor shows exactly one user-visible indication
/// for every failure: a bare `?`. The variants below exist so internal
/// callers and tests can tell failure classes apart.

#[derive(Debug, thiserror::Error)]
pub enum QedError {
    #[error("?")]
    InvalidCommand,

    #[error("?")]
    InvalidAddress,

    #[error("?")]
    InvalidFilename,

    #[error("?")]
    Io(String),

    #[error("?")]
    NoMatch,

    #[error("?")]
    BufferName,

    #[error("?")]
    EmptyReplacement,

    /// The terminal's own input stream has closed. Unlike every other
    /// variant, this one is fatal: the event loop terminates the
    /// program instead of printing `?` and continuing, but it does so
    /// by returning out of `main` so the raw-mode guard still restores
    /// the terminal.
    #[error("end of input")]
    Eof,

    /// The file attached for a READ FROM command has run out of bytes.
    /// Caught inside `get_string` and turned into an ordinary "done"
    /// result, the same way an explicit Ctl-D ends an interactive
    /// multi-line read — this never reaches the event loop's `?`
    /// reporting.
    #[error("end of file")]
    FileDone,
}

impl From<std::io::Error> for QedError {
    fn from(e: std::io::Error) -> Self {
        QedError::Io(e.to_string())
    }
}
