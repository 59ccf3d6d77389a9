//! Script front-end errors.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use gridlink_rt::scheduler::SchedulerError;

/// Errors from parsing or executing a command script line.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Syntax error at position {position} (character '{character}'): {line}")]
    Syntax {
        position: usize,
        character: char,
        line: String,
    },

    #[error("Unterminated quote starting at position {position}: {line}")]
    UnterminatedQuote { position: usize, line: String },

    #[error(transparent)]
    Post(#[from] SchedulerError),
}
