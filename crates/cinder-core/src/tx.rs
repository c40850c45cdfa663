//! The transaction engine and the command dispatch boundary.
//!
//! Every data command reaches the keyspace through [`dispatch`]: a
//! queuing session defers the bound operation and answers `QUEUED`;
//! otherwise the instance lock is taken, the operation runs against
//! the session's database, and the lock drops before the reply goes
//! anywhere near a socket.
//!
//! Optimistic concurrency: WATCH captures (database, key, version)
//! triples without holding anything. The queue-building phase runs
//! lock-free, so other connections interleave at will — EXEC then
//! re-reads every watched version under the lock and aborts with a
//! null array if any moved. No per-key locks, no deadlocks.

use crate::error::TxError;
use crate::instance::{ExecCtx, Instance};
use crate::reply::Reply;
use crate::session::Session;

/// A fully-validated command, closed over its arguments at prepare
/// time, waiting to run against a keyspace.
pub type Operation = Box<dyn FnOnce(&mut ExecCtx<'_>) -> Reply + Send>;

/// The single entry point for data commands, typed directly or
/// replayed from a queue.
pub fn dispatch(instance: &Instance, session: &mut Session, op: Operation) -> Reply {
    if session.in_multi() {
        session.enqueue(op);
        return Reply::queued();
    }
    let mut inner = instance.lock();
    let mut ctx = ExecCtx::new(&mut inner, session.db_index);
    op(&mut ctx)
}

/// MULTI: enter queuing mode.
pub fn multi(session: &mut Session) -> Reply {
    match session.begin_multi() {
        Ok(()) => Reply::ok(),
        Err(e) => e.into(),
    }
}

/// DISCARD: drop the queue, the dirty flag, and the watch set.
pub fn discard(session: &mut Session) -> Reply {
    if session.take_queue().is_none() {
        return TxError::DiscardWithoutMulti.into();
    }
    session.take_watched();
    Reply::ok()
}

/// WATCH: record current versions for later comparison. Only legal
/// outside a transaction; watching a missing key records version 0 so
/// its creation counts as interference.
pub fn watch(instance: &Instance, session: &mut Session, keys: &[String]) -> Reply {
    if session.in_multi() {
        return TxError::WatchInsideMulti.into();
    }
    let db_index = session.db_index;
    let mut inner = instance.lock();
    for key in keys {
        let version = inner.db(db_index).version(key);
        session.watch_key(db_index, key.clone(), version);
    }
    Reply::ok()
}

/// UNWATCH: forget every watched key. Valid in both states — inside a
/// transaction it executes immediately rather than queuing, a quirk
/// Redis itself has.
pub fn unwatch(session: &mut Session) -> Reply {
    session.take_watched();
    Reply::ok()
}

/// EXEC: validate the watch set, then run the whole queue atomically.
///
/// Outcomes, in order of precedence:
/// - no open transaction → error
/// - dirty queue → EXECABORT error, nothing runs
/// - a watched version moved → null array (not an error), nothing runs
/// - otherwise one reply per queued operation, in queue order; a
///   runtime failure becomes that operation's reply and never stops
///   the rest of the batch.
pub fn exec(instance: &Instance, session: &mut Session) -> Reply {
    let Some((queue, dirty)) = session.take_queue() else {
        return TxError::ExecWithoutMulti.into();
    };
    let watched = session.take_watched();
    if dirty {
        return TxError::Aborted.into();
    }

    let mut inner = instance.lock();
    for ((db_index, key), version) in &watched {
        if inner.db(*db_index).version(key) != *version {
            return Reply::NilArray;
        }
    }

    // watches held: run the batch under the same lock acquisition, so
    // no other connection's operation lands between two of ours
    let mut ctx = ExecCtx::new(&mut inner, session.db_index);
    let replies: Vec<Reply> = queue.into_iter().map(|op| op(&mut ctx)).collect();
    Reply::Array(replies)
}
