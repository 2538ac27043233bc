//! Errors raised by pattern definition and scanning
//!
//! One closed taxonomy, all fatal to the current scan invocation; there
//! is no internal retry. Definition-time kinds carry the offending id;
//! scan-time kinds carry the resolved source position and, where it
//! helps, the previous pattern id and the list of expected ids. The
//! unexpected-token kind additionally carries a bounded window of the
//! surrounding text with a cursor marker.
//!
//! A failed scan leaves the engine reusable: the consumer may catch the
//! error and start a fresh scan at an explicit offset and control.

use crate::position::Position;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A pattern id was registered twice.
    DuplicatePattern { id: String },
    /// A pattern source failed to compile.
    InvalidPattern { id: String, message: String },
    /// An expectation referenced an id that was never registered.
    UnknownPattern { id: String },
    /// No expected pattern matched at the current offset and input
    /// remains.
    UnexpectedToken {
        position: Position,
        /// Surrounding text, ±10 characters with a `<HERE>` marker.
        window: String,
        previous: Option<String>,
        expected: Vec<String>,
    },
    /// Input ran out while expectations were pending inside a non-root
    /// context.
    UnexpectedEndOfInput {
        position: Position,
        previous: Option<String>,
        expected: Vec<String>,
    },
    /// A pop named a context with no matching frame on the stack.
    UnresolvedContext {
        position: Position,
        pattern_id: String,
        context: String,
    },
    /// The resolver yielded no control while input remains, or an
    /// inherit control found nothing cached to inherit.
    DeadEnd {
        position: Position,
        previous: Option<String>,
    },
}

fn previous_id(previous: &Option<String>) -> &str {
    previous.as_deref().unwrap_or("(start)")
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DuplicatePattern { id } => {
                write!(f, "pattern `{}` is already defined", id)
            }
            Error::InvalidPattern { id, message } => {
                write!(f, "pattern `{}` is not a valid regular expression: {}", id, message)
            }
            Error::UnknownPattern { id } => {
                write!(f, "unknown pattern `{}`", id)
            }
            Error::UnexpectedToken {
                position,
                window,
                previous,
                expected,
            } => {
                write!(
                    f,
                    "unexpected token at {} near {:?}; expectations: {} -> {}",
                    position,
                    window,
                    previous_id(previous),
                    expected.join(", ")
                )
            }
            Error::UnexpectedEndOfInput {
                position,
                previous,
                expected,
            } => {
                write!(
                    f,
                    "unexpected end of input at {}; expectations: {} -> {}",
                    position,
                    previous_id(previous),
                    expected.join(", ")
                )
            }
            Error::UnresolvedContext {
                position,
                pattern_id,
                context,
            } => {
                write!(
                    f,
                    "no context named `{}` on the stack after {} at {}",
                    context, pattern_id, position
                )
            }
            Error::DeadEnd { position, previous } => {
                write!(
                    f,
                    "no expectations after {} at {}",
                    previous_id(previous),
                    position
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// Marker inserted at the failure offset inside an error window.
pub const CURSOR_MARKER: &str = "<HERE>";

/// Build the ±10-character window around `offset`, with the cursor
/// marker at the failure point. Boundaries are computed per character,
/// so multi-byte input is never split.
pub(crate) fn context_window(text: &str, offset: usize) -> String {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    let start = text[..offset]
        .char_indices()
        .rev()
        .nth(9)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = text[offset..]
        .char_indices()
        .nth(10)
        .map(|(i, _)| offset + i)
        .unwrap_or(text.len());
    format!("{}{}{}", &text[start..offset], CURSOR_MARKER, &text[offset..end])
}
