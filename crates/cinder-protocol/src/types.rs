//! RESP2 frame types.
//!
//! One [`Frame`] per protocol value. Bulk payloads use `Bytes` so
//! moving data between the parser, the engine, and the serializer
//! never copies more than once.

use bytes::Bytes;

/// A single RESP2 protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Simple string, e.g. `+OK\r\n`. Short, non-binary status replies.
    Simple(String),

    /// Error reply, e.g. `-ERR unknown command\r\n`.
    Error(String),

    /// 64-bit signed integer, e.g. `:42\r\n`.
    Integer(i64),

    /// Binary-safe bulk string, e.g. `$5\r\nhello\r\n`.
    Bulk(Bytes),

    /// Null bulk string, `$-1\r\n` — the "no value" reply.
    NullBulk,

    /// Ordered array of frames, e.g. `*2\r\n+a\r\n+b\r\n`.
    Array(Vec<Frame>),

    /// Null array, `*-1\r\n` — distinct from an empty array; an
    /// aborted EXEC and a timed-out blocking command reply with this.
    NullArray,
}

impl Frame {
    /// `true` for either null form.
    pub fn is_null(&self) -> bool {
        matches!(self, Frame::NullBulk | Frame::NullArray)
    }

    /// Convenience constructor for bulk frames.
    pub fn bulk(data: impl Into<Bytes>) -> Frame {
        Frame::Bulk(data.into())
    }
}
