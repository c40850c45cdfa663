//! The instance: one lock over every keyspace and the clock.
//!
//! All state lives behind a single `parking_lot::Mutex`. Connections
//! (and embedded callers) take the lock for the duration of one
//! command — or one EXEC batch — and release it before touching the
//! network again. That makes the data engine effectively
//! single-threaded and every operation totally ordered, with no
//! finer-grained locking anywhere inside.

use std::time::{Duration, SystemTime};

use ahash::AHashMap;
use parking_lot::{Mutex, MutexGuard};

use crate::clock::Clock;
use crate::db::Db;
use crate::error::StoreError;

/// Everything the instance lock guards: the numbered databases
/// (created lazily, never removed), the clock, and the optional
/// password.
#[derive(Debug, Default)]
pub struct Inner {
    dbs: AHashMap<usize, Db>,
    clock: Clock,
    password: Option<String>,
}

impl Inner {
    /// The database at `index`, created on first access.
    pub fn db(&mut self, index: usize) -> &mut Db {
        self.dbs.entry(index).or_default()
    }

    /// The clock's current instant.
    pub fn now(&self) -> SystemTime {
        self.clock.now()
    }

    /// Relocates a key (value and TTL intact) between databases.
    /// `false` when the source key is missing or the destination name
    /// is taken; moving within one database is an error.
    pub fn move_key(
        &mut self,
        key: &str,
        from: usize,
        to: usize,
        now: SystemTime,
    ) -> Result<bool, StoreError> {
        if from == to {
            return Err(StoreError::SameObject);
        }
        if !self.db(from).exists(key, now) {
            return Ok(false);
        }
        if self.db(to).exists(key, now) {
            return Ok(false);
        }
        let Some(entry) = self.db(from).take_entry(key, now) else {
            return Ok(false);
        };
        self.db(to).install_entry(key, entry);
        Ok(true)
    }

    /// Exchanges two whole databases. Every key version in both bumps,
    /// so watchers of either database see the swap as interference.
    pub fn swap_dbs(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let db_a = self.dbs.remove(&a).unwrap_or_default();
        let db_b = self.dbs.remove(&b).unwrap_or_default();
        self.dbs.insert(a, db_b);
        self.dbs.insert(b, db_a);
        self.db(a).bump_all();
        self.db(b).bump_all();
    }

    /// Empties every database.
    pub fn flush_all(&mut self) {
        for db in self.dbs.values_mut() {
            db.clear();
        }
    }
}

/// The lock-held view a bound operation executes against: the
/// connection's selected database, cross-database operations, and the
/// instant the clock showed when the lock was taken.
pub struct ExecCtx<'a> {
    inner: &'a mut Inner,
    /// The database index the operation runs against.
    pub db_index: usize,
    /// Clock reading for this command; all expiry decisions inside one
    /// command observe the same instant.
    pub now: SystemTime,
}

impl<'a> ExecCtx<'a> {
    pub(crate) fn new(inner: &'a mut Inner, db_index: usize) -> Self {
        let now = inner.now();
        Self {
            inner,
            db_index,
            now,
        }
    }

    /// The selected database.
    pub fn db(&mut self) -> &mut Db {
        self.inner.db(self.db_index)
    }

    /// Another database, for cross-database commands.
    pub fn db_at(&mut self, index: usize) -> &mut Db {
        self.inner.db(index)
    }

    /// MOVE from the selected database.
    pub fn move_key(&mut self, key: &str, to: usize) -> Result<bool, StoreError> {
        let from = self.db_index;
        let now = self.now;
        self.inner.move_key(key, from, to, now)
    }

    pub fn swap_dbs(&mut self, a: usize, b: usize) {
        self.inner.swap_dbs(a, b);
    }

    pub fn flush_all(&mut self) {
        self.inner.flush_all();
    }
}

/// The running emulation: databases, clock, password, one lock.
///
/// Created once and shared (`Arc`) across every connection. The test
/// control surface — `set_time`, `fast_forward` — lives here too, so
/// in-process tests can trigger TTL expiry without sleeping.
#[derive(Debug, Default)]
pub struct Instance {
    inner: Mutex<Inner>,
}

impl Instance {
    pub fn new() -> Self {
        Self::default()
    }

    /// An instance that requires AUTH before serving data commands.
    pub fn with_password(password: impl Into<String>) -> Self {
        let instance = Self::new();
        instance.inner.lock().password = Some(password.into());
        instance
    }

    /// Takes the instance lock. Callers must not hold the guard across
    /// an await point; every consumer in this workspace runs
    /// synchronously under it.
    pub fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock()
    }

    /// Runs `f` against one database under the lock — the embedded
    /// access surface. Takes the same lock as the network path.
    pub fn exec<R>(&self, db_index: usize, f: impl FnOnce(&mut ExecCtx<'_>) -> R) -> R {
        let mut inner = self.lock();
        let mut ctx = ExecCtx::new(&mut inner, db_index);
        f(&mut ctx)
    }

    /// Pins the clock to an absolute instant.
    pub fn set_time(&self, instant: SystemTime) {
        self.lock().clock.pin(instant);
    }

    /// Advances the clock, pinning it if it was following the wall
    /// clock. Keys whose deadline is now in the past expire on their
    /// next observation.
    pub fn fast_forward(&self, delta: Duration) {
        self.lock().clock.advance(delta);
    }

    /// The instance's idea of now.
    pub fn now(&self) -> SystemTime {
        self.lock().now()
    }

    /// The configured password, if any.
    pub fn password(&self) -> Option<String> {
        self.lock().password.clone()
    }
}
