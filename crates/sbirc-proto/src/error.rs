//! Error types for the IRC wire crate.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line could not be parsed into a message.
    #[error("invalid message {string:?}: {cause}")]
    InvalidMessage {
        /// The offending line.
        string: String,
        /// Why it was rejected.
        cause: MessageParseError,
    },

    /// An outgoing parameter carried CR, LF or NUL.
    #[error("parameter contains control characters: {0:?}")]
    IllegalControlChar(String),
}

/// Reasons a single line fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MessageParseError {
    /// The line was empty or only whitespace.
    #[error("empty message")]
    EmptyMessage,

    /// No valid command token was found.
    #[error("invalid command")]
    InvalidCommand,

    /// Characters were left over after the parameters.
    #[error("trailing garbage after parameters")]
    TrailingGarbage,
}
