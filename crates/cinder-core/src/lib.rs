//! cinder-core: the keyspace engine.
//!
//! Owns the multi-database key store, per-key type tagging, TTL expiry
//! driven by a controllable clock, and the optimistic-concurrency
//! transaction engine (MULTI/EXEC/DISCARD/WATCH). Every mutation runs
//! under one instance-wide lock, so the engine is linearizable across
//! arbitrarily many connections while staying simple inside.
//!
//! The crate is protocol-agnostic: commands arrive as bound operations
//! (closures over validated arguments) and leave as [`Reply`] values.
//! It is equally usable embedded in a test process, without any server
//! in front of it.

pub mod clock;
pub mod db;
pub mod error;
pub mod glob;
pub mod instance;
pub mod reply;
pub mod session;
pub mod tx;
pub mod types;

pub use clock::Clock;
pub use db::{format_float, Db, TtlResult};
pub use error::{CommandError, StoreError, TxError};
pub use glob::glob_match;
pub use instance::{ExecCtx, Instance};
pub use reply::Reply;
pub use session::Session;
pub use tx::{dispatch, Operation};
pub use types::{Kind, Value};
