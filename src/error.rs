//! # Error Types
//!
//! This module defines the error taxonomy for the etiqueta library.
//!
//! The families are deliberately separate so callers can tell "fix your
//! label" apart from "check your cable":
//!
//! - [`TranspileError`]: a command cannot be realized for the active
//!   language backend. Collected per document; a failed compile reports
//!   every offending command at once and returns no partial document.
//! - [`MessageParseError`]: wire data from the printer fits no known frame
//!   shape for the backend in play.
//! - [`CommunicationError`]: transport-level failures, including reply
//!   timeouts. Never interpreted by the core.
//!
//! Programming errors (an extended command with no registered handler, a
//! reply match with nothing awaited) are not represented here: they panic
//! or fail loudly at the site, since retrying cannot fix a misconfigured
//! backend or a caller that lost track of what it sent.

use thiserror::Error;

/// A command (or several) could not be transpiled for a language backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranspileError {
    /// The backend has no realization for this command.
    #[error("{language} backend cannot realize {command}: {reason}")]
    Unsupported {
        language: &'static str,
        command: &'static str,
        reason: String,
    },

    /// A parameter failed backend validation.
    #[error("invalid parameter for {command}: {reason}")]
    InvalidParameter {
        command: &'static str,
        reason: String,
    },

    /// A command the backend forbids inside a form appeared while a form
    /// was open and the reorder behavior was `ThrowError`.
    #[error("{command} is not allowed inside an open label form")]
    NonFormCommandInForm { command: &'static str },

    /// Aggregate of every per-command failure in one document compile.
    #[error("{} command(s) failed to transpile", .0.len())]
    Multiple(Vec<TranspileError>),
}

impl TranspileError {
    /// Flatten into the list of inner errors (a non-aggregate error is a
    /// list of one).
    pub fn into_inner(self) -> Vec<TranspileError> {
        match self {
            TranspileError::Multiple(inner) => inner,
            other => vec![other],
        }
    }
}

/// Malformed or unrecognized reply data from the printer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageParseError {
    /// The data starts a known frame but violates its shape.
    #[error("malformed {frame} frame: {reason}")]
    MalformedFrame { frame: &'static str, reason: String },
}

/// Transport-level communication failure.
#[derive(Debug, Error)]
pub enum CommunicationError {
    /// Connection or device-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// I/O error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An awaited printer reply did not arrive before the deadline.
    #[error("timed out waiting for printer reply")]
    ReplyTimeout,

    /// The transport is not connected (or already disposed).
    #[error("transport is not connected")]
    NotConnected,
}

/// Top-level error type for etiqueta operations.
#[derive(Debug, Error)]
pub enum EtiquetaError {
    #[error(transparent)]
    Transpile(#[from] TranspileError),

    #[error(transparent)]
    MessageParse(#[from] MessageParseError),

    #[error(transparent)]
    Communication(#[from] CommunicationError),
}
