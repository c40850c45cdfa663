//! Protocol-independent reply values.
//!
//! Operations return a [`Reply`]; the server layer maps it onto wire
//! frames. Keeping the engine off the wire types lets embedded callers
//! drive it without a protocol crate in sight.

use bytes::Bytes;

use crate::error::{CommandError, StoreError, TxError};

/// The result of one command, mirroring the reply kinds a Redis client
/// can observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Simple status line, e.g. `OK` or `QUEUED`.
    Simple(String),
    /// 64-bit signed integer.
    Int(i64),
    /// Binary-safe bulk string.
    Bulk(Bytes),
    /// Missing value (null bulk string on the wire).
    Nil,
    /// Ordered sequence of replies.
    Array(Vec<Reply>),
    /// Null array — distinct from `Nil`: an aborted EXEC and a timed-out
    /// blocking pop reply with this.
    NilArray,
    /// Error reply; the string already carries its wire prefix.
    Error(String),
}

impl Reply {
    /// The `+OK` status.
    pub fn ok() -> Self {
        Reply::Simple("OK".into())
    }

    /// The `+QUEUED` acknowledgement for commands deferred by MULTI.
    pub fn queued() -> Self {
        Reply::Simple("QUEUED".into())
    }

    /// Bulk reply from anything byte-like.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(data.into())
    }

    /// Integer reply from a bool, Redis-style (1/0).
    pub fn from_bool(v: bool) -> Self {
        Reply::Int(i64::from(v))
    }

    /// Returns `true` for an error reply.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl From<StoreError> for Reply {
    fn from(e: StoreError) -> Self {
        Reply::Error(e.to_string())
    }
}

impl From<CommandError> for Reply {
    fn from(e: CommandError) -> Self {
        Reply::Error(e.to_string())
    }
}

impl From<TxError> for Reply {
    fn from(e: TxError) -> Self {
        Reply::Error(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_maps_to_redis_integers() {
        assert_eq!(Reply::from_bool(true), Reply::Int(1));
        assert_eq!(Reply::from_bool(false), Reply::Int(0));
    }

    #[test]
    fn store_error_becomes_error_reply() {
        let reply: Reply = StoreError::WrongType.into();
        assert!(reply.is_error());
    }
}
