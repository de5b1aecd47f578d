use crate::ast::Pos;
use std::io;
use thiserror::Error;

/// A construct the engine's input language cannot express.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("The yices solver cannot handle {kind} literals")]
    UnsupportedLiteral { kind: &'static str, pos: Option<Pos> },

    #[error("Did not expect {what} in an expression to be translated")]
    Unexpected { what: String, pos: Option<Pos> },

    #[error("{op} requires at least {min} argument(s), got {got}")]
    Arity {
        op: String,
        min: usize,
        got: usize,
        pos: Option<Pos>,
    },

    #[error("Unsupported sort: {sort}")]
    UnsupportedSort { sort: String, pos: Option<Pos> },
}

impl TranslateError {
    pub fn pos(&self) -> Option<Pos> {
        match self {
            TranslateError::UnsupportedLiteral { pos, .. }
            | TranslateError::Unexpected { pos, .. }
            | TranslateError::Arity { pos, .. }
            | TranslateError::UnsupportedSort { pos, .. } => *pos,
        }
    }
}

/// A fault on the channel to the engine process.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to start process {program}: {source}")]
    Start {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("solver process is not running")]
    NotRunning,

    /// The engine closed its output before printing a prompt. `partial` is
    /// whatever it produced first.
    #[error("solver output closed unexpectedly")]
    Closed { partial: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Whether the engine can no longer be talked to.
    pub fn is_fatal(&self) -> bool {
        match self {
            TransportError::Closed { .. } | TransportError::NotRunning => true,
            TransportError::Io(e) => e.kind() == io::ErrorKind::BrokenPipe,
            TransportError::Start { .. } => false,
        }
    }
}
