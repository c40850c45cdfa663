//! Per-connection state.
//!
//! A [`Session`] carries everything the engine needs to know about one
//! client between commands: the selected database, whether AUTH has
//! happened, the subscriber-only flag, and the transaction state. The
//! queue, dirty flag, and watch set move together — MULTI initializes
//! them, EXEC and DISCARD clear them, whatever the outcome.

use ahash::AHashMap;

use crate::error::TxError;
use crate::tx::Operation;

/// Transaction mode: outside a transaction, or queuing since MULTI.
enum TxState {
    Normal,
    Queuing {
        queue: Vec<Operation>,
        /// Set when a queued command failed validation; EXEC then
        /// aborts with EXECABORT instead of running anything.
        dirty: bool,
    },
}

/// One logical connection's engine-side state.
pub struct Session {
    /// Currently selected database index (SELECT).
    pub db_index: usize,
    /// Whether the connection has authenticated. Connections against
    /// a password-less instance start authenticated.
    pub authenticated: bool,
    /// Subscriber-only mode: set while the connection holds any
    /// channel or pattern subscription, restricting which commands
    /// the dispatch boundary accepts.
    subscriber: bool,
    state: TxState,
    /// Versions captured by WATCH: (database, key) → version at watch
    /// time. Lives outside the queue because WATCH precedes MULTI.
    watched: AHashMap<(usize, String), u64>,
}

impl Session {
    pub fn new(authenticated: bool) -> Self {
        Self {
            db_index: 0,
            authenticated,
            subscriber: false,
            state: TxState::Normal,
            watched: AHashMap::new(),
        }
    }

    /// `true` while a MULTI is open.
    pub fn in_multi(&self) -> bool {
        matches!(self.state, TxState::Queuing { .. })
    }

    /// Enters queuing mode. Nested MULTI is rejected, not absorbed.
    pub fn begin_multi(&mut self) -> Result<(), TxError> {
        if self.in_multi() {
            return Err(TxError::NestedMulti);
        }
        self.state = TxState::Queuing {
            queue: Vec::new(),
            dirty: false,
        };
        Ok(())
    }

    /// Appends a validated, bound operation to the queue.
    /// Must only be called while queuing.
    pub fn enqueue(&mut self, op: Operation) {
        if let TxState::Queuing { queue, .. } = &mut self.state {
            queue.push(op);
        }
    }

    /// Records a validation failure inside the open transaction.
    /// Outside a transaction this is a no-op.
    pub fn mark_dirty(&mut self) {
        if let TxState::Queuing { dirty, .. } = &mut self.state {
            *dirty = true;
        }
    }

    /// Leaves queuing mode, handing back the queue and dirty flag.
    /// `None` when no transaction is open. The watch set is cleared
    /// separately via [`Session::take_watched`].
    pub fn take_queue(&mut self) -> Option<(Vec<Operation>, bool)> {
        match std::mem::replace(&mut self.state, TxState::Normal) {
            TxState::Normal => None,
            TxState::Queuing { queue, dirty } => Some((queue, dirty)),
        }
    }

    /// Records one watched key's version.
    pub fn watch_key(&mut self, db_index: usize, key: String, version: u64) {
        self.watched.insert((db_index, key), version);
    }

    /// Empties and returns the watch set.
    pub fn take_watched(&mut self) -> AHashMap<(usize, String), u64> {
        std::mem::take(&mut self.watched)
    }

    /// Number of watched keys (test hook).
    pub fn watched_len(&self) -> usize {
        self.watched.len()
    }

    pub fn is_subscriber(&self) -> bool {
        self.subscriber
    }

    pub fn set_subscriber(&mut self, on: bool) {
        self.subscriber = on;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(true)
    }
}

/// The fixed allow-list for subscriber-only mode: pub/sub control plus
/// PING and QUIT. Everything else is rejected at the dispatch boundary
/// with a mode error.
pub fn allowed_in_subscriber_mode(command: &str) -> bool {
    matches!(
        command,
        "SUBSCRIBE" | "UNSUBSCRIBE" | "PSUBSCRIBE" | "PUNSUBSCRIBE" | "PING" | "QUIT"
    )
}
