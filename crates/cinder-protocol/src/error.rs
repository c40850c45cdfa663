//! Protocol error types for RESP2 parsing.

use thiserror::Error;

/// Errors that can occur while parsing the RESP2 wire format.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The first byte of a frame didn't match any known type prefix.
    #[error("invalid type prefix: {0:#04x}")]
    InvalidPrefix(u8),

    /// Failed to parse an integer from the frame content.
    #[error("invalid integer encoding")]
    InvalidInteger,

    /// A bulk string or array declared an unacceptable length.
    #[error("invalid frame length: {0}")]
    InvalidFrameLength(i64),

    /// Nested arrays beyond the supported depth.
    #[error("frame nesting too deep")]
    TooDeep,

    /// A line was not terminated with CRLF where one was required.
    #[error("malformed frame terminator")]
    BadTerminator,
}
