//! Error taxonomies for the engine.
//!
//! Display text doubles as the wire message, so handlers can forward
//! errors to clients without per-command translation tables.

use thiserror::Error;

/// Failures signaled by keyspace primitives.
///
/// Most read/delete operations on a missing key report an empty result
/// instead of an error; only the variants below are genuine failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Operation attempted against a key holding an incompatible kind.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// The operation documents existence as a precondition (RENAME).
    #[error("ERR no such key")]
    NoSuchKey,

    /// MOVE where source and destination databases coincide.
    #[error("ERR source and destination objects are the same")]
    SameObject,

    /// A string value is not parseable as a 64-bit integer.
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    /// A string value is not parseable as a float.
    #[error("ERR value is not a valid float")]
    NotAFloat,

    /// INCR/DECR would leave the i64 range.
    #[error("ERR increment or decrement would overflow")]
    Overflow,

    /// INCRBYFLOAT would produce NaN or Infinity.
    #[error("ERR increment would produce NaN or Infinity")]
    NanOrInfinity,

    /// LSET index outside the list bounds.
    #[error("ERR index out of range")]
    IndexOutOfRange,

    /// A stream ID argument failed to parse.
    #[error("ERR Invalid stream ID specified as stream command argument")]
    InvalidStreamId,

    /// XADD with an ID at or below the stream's last entry.
    #[error("ERR The ID specified in XADD is equal or smaller than the target stream top item")]
    StreamIdTooSmall,
}

/// Argument-shape failures detected by command handlers before any
/// keyspace access. Inside a transaction these mark the queue dirty
/// instead of aborting it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    #[error("ERR value is not an integer or out of range")]
    InvalidInteger,

    #[error("ERR value is not a valid float")]
    InvalidFloat,

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(&'static str),

    #[error("ERR timeout is not a float or out of range")]
    InvalidTimeout,

    #[error("ERR timeout is negative")]
    NegativeTimeout,

    #[error("ERR DB index is out of range")]
    InvalidDbIndex,

    #[error("ERR invalid cursor")]
    InvalidCursor,

    /// Keys, fields, and channel names are held as Rust strings.
    #[error("ERR invalid UTF-8 argument")]
    InvalidUtf8,

    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR Unknown subcommand or wrong number of arguments for '{0}'")]
    UnknownSubcommand(String),

    #[error("ERR {0} is not allowed in transactions")]
    NotInTransactions(&'static str),
}

/// Transaction state machine violations.
///
/// Watch interference is deliberately absent: an interfered EXEC
/// replies with a null array, not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("ERR MULTI calls can not be nested")]
    NestedMulti,

    #[error("ERR EXEC without MULTI")]
    ExecWithoutMulti,

    #[error("ERR DISCARD without MULTI")]
    DiscardWithoutMulti,

    #[error("ERR WATCH inside MULTI is not allowed")]
    WatchInsideMulti,

    /// EXEC on a queue that recorded a validation failure.
    #[error("EXECABORT Transaction discarded because of previous errors.")]
    Aborted,
}

/// The reply text for a command rejected while the connection is in
/// subscriber-only mode.
pub fn mode_violation(command: &str) -> String {
    format!(
        "ERR Can't execute '{}': only (P)SUBSCRIBE / (P)UNSUBSCRIBE / PING / QUIT are allowed in this context",
        command.to_ascii_lowercase()
    )
}
