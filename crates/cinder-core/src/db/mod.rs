//! The per-database keyspace.
//!
//! A [`Db`] owns every key of one numbered database: the typed values,
//! the expiration deadlines, the per-key version counters that drive
//! WATCH, and last-access times. Expired keys are removed lazily on
//! access, evaluated against the instant the caller read from the
//! instance clock — the keyspace itself never consults a clock.
//!
//! Nothing here is thread-safe on its own, and nothing needs to be:
//! every call happens under the instance lock.

use std::time::{Duration, SystemTime};

use ahash::AHashMap;
use tracing::warn;

use crate::glob::glob_match;
use crate::types::{Kind, Value};

mod hash;
mod hll;
mod list;
mod set;
mod string;
mod stream;
mod zset;

pub use zset::ZAddFlags;

use crate::error::StoreError;

/// One keyspace entry: the value plus expiration and access metadata.
/// Version counters live outside the entry so they survive deletion.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) value: Value,
    /// Absolute deadline. `None` = no TTL.
    pub(crate) expires_at: Option<SystemTime>,
    /// When the key was last read or written, for idle-time reporting.
    pub(crate) last_access: SystemTime,
}

impl Entry {
    fn new(value: Value, expires_at: Option<SystemTime>, now: SystemTime) -> Self {
        Self {
            value,
            expires_at,
            last_access: now,
        }
    }

    /// Whether the entry is still visible at `now`.
    fn is_live(&self, now: SystemTime) -> bool {
        match self.expires_at {
            Some(deadline) => deadline > now,
            None => true,
        }
    }
}

/// Result of a TTL query, following Redis semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlResult {
    /// The key does not exist.
    NotFound,
    /// The key exists without an expiration.
    NoExpiry,
    /// Remaining time until the deadline.
    Remaining(Duration),
}

/// A single database's complete key → value mapping with its TTL and
/// version bookkeeping.
#[derive(Debug, Default)]
pub struct Db {
    entries: AHashMap<String, Entry>,
    /// Monotonic per-key mutation counters. Entries persist (and keep
    /// incrementing) across deletion and re-creation so optimistic
    /// locks can tell interference from no-ops.
    versions: AHashMap<String, u64>,
}

impl Db {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the version counter for `key`. Every successful
    /// mutation — create, update, delete, expiry purge — lands here
    /// exactly once.
    fn bump(&mut self, key: &str) {
        match self.versions.get_mut(key) {
            Some(v) => *v += 1,
            None => {
                self.versions.insert(key.to_owned(), 1);
            }
        }
    }

    /// Removes `key` if its deadline has passed. Returns `true` when a
    /// purge happened; repeated calls after the first are no-ops that
    /// return `false`, so lazy expiry is idempotent.
    fn purge_if_expired(&mut self, key: &str, now: SystemTime) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_live(now));
        if expired {
            self.entries.remove(key);
            self.bump(key);
        }
        expired
    }

    /// Looks up `key` for writing, verifying (or establishing) its
    /// kind. A missing key is created from `empty`; an existing key of
    /// another kind is a [`StoreError::WrongType`]. The caller is
    /// responsible for bumping the version after the mutation.
    fn write_entry(
        &mut self,
        key: &str,
        now: SystemTime,
        empty: impl FnOnce() -> Value,
        expected: Kind,
    ) -> Result<&mut Entry, StoreError> {
        self.purge_if_expired(key, now);
        if let Some(entry) = self.entries.get(key) {
            if entry.value.kind() != expected {
                return Err(StoreError::WrongType);
            }
        }
        Ok(self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Entry::new(empty(), None, now)))
    }

    /// Looks up `key` for reading. `Ok(None)` for a missing key,
    /// `WrongType` when it holds another kind. Updates the access time.
    fn read_entry(
        &mut self,
        key: &str,
        now: SystemTime,
        expected: Kind,
    ) -> Result<Option<&Entry>, StoreError> {
        if self.purge_if_expired(key, now) {
            return Ok(None);
        }
        match self.entries.get_mut(key) {
            None => Ok(None),
            Some(entry) if entry.value.kind() == expected => {
                entry.last_access = now;
                Ok(Some(&*entry))
            }
            Some(_) => Err(StoreError::WrongType),
        }
    }

    /// Returns `true` if the key exists and hasn't expired.
    pub fn exists(&mut self, key: &str, now: SystemTime) -> bool {
        if self.purge_if_expired(key, now) {
            return false;
        }
        self.entries.contains_key(key)
    }

    /// The kind of the value at `key`, or `None` if absent.
    pub fn kind(&mut self, key: &str, now: SystemTime) -> Option<Kind> {
        if self.purge_if_expired(key, now) {
            return None;
        }
        self.entries.get(key).map(|e| e.value.kind())
    }

    /// The TYPE command's answer, `"none"` for a missing key.
    pub fn type_name(&mut self, key: &str, now: SystemTime) -> &'static str {
        match self.kind(key, now) {
            Some(kind) => kind.type_name(),
            None => "none",
        }
    }

    /// Replaces whatever is at `key` — any kind — with `value`,
    /// clearing any TTL. The write-a-whole-value primitive behind SET
    /// and friends.
    pub fn set(&mut self, key: &str, value: Value, now: SystemTime) {
        self.entries
            .insert(key.to_owned(), Entry::new(value, None, now));
        self.bump(key);
    }

    /// Removes a key and all of its state except the version counter,
    /// which is bumped. Returns `true` if the key existed.
    pub fn del(&mut self, key: &str, now: SystemTime) -> bool {
        if self.purge_if_expired(key, now) {
            return false;
        }
        if self.entries.remove(key).is_some() {
            self.bump(key);
            true
        } else {
            false
        }
    }

    /// Sets an absolute expiration deadline. A deadline at or before
    /// `now` deletes the key immediately, like EXPIRE with a
    /// non-positive timeout. Returns `false` for a missing key — not
    /// an error, per the EXPIRE contract.
    pub fn expire_at(&mut self, key: &str, deadline: SystemTime, now: SystemTime) -> bool {
        if self.purge_if_expired(key, now) {
            return false;
        }
        if !self.entries.contains_key(key) {
            return false;
        }
        if deadline <= now {
            return self.del(key, now);
        }
        if let Some(entry) = self.entries.get_mut(key) {
            entry.expires_at = Some(deadline);
        }
        self.bump(key);
        true
    }

    /// Drops the TTL, keeping the value. Returns `true` only when a
    /// deadline was actually removed.
    pub fn persist(&mut self, key: &str, now: SystemTime) -> bool {
        if self.purge_if_expired(key, now) {
            return false;
        }
        let removed = match self.entries.get_mut(key) {
            Some(entry) => entry.expires_at.take().is_some(),
            None => false,
        };
        if removed {
            self.bump(key);
        }
        removed
    }

    /// Remaining lifetime of `key` relative to `now`.
    pub fn ttl(&mut self, key: &str, now: SystemTime) -> TtlResult {
        if self.purge_if_expired(key, now) {
            return TtlResult::NotFound;
        }
        match self.entries.get(key) {
            None => TtlResult::NotFound,
            Some(entry) => match entry.expires_at {
                None => TtlResult::NoExpiry,
                Some(deadline) => TtlResult::Remaining(
                    deadline.duration_since(now).unwrap_or(Duration::ZERO),
                ),
            },
        }
    }

    /// Renames a key, carrying the value and TTL unchanged. An existing
    /// destination is overwritten. Both names' versions bump.
    pub fn rename(&mut self, from: &str, to: &str, now: SystemTime) -> Result<(), StoreError> {
        self.purge_if_expired(from, now);
        self.purge_if_expired(to, now);
        let Some(entry) = self.entries.remove(from) else {
            return Err(StoreError::NoSuchKey);
        };
        self.bump(from);
        self.entries.insert(to.to_owned(), entry);
        self.bump(to);
        Ok(())
    }

    /// Current version counter for `key`: 0 if the key has never been
    /// written. Read-only — used by WATCH, never changes state.
    pub fn version(&self, key: &str) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    /// Seconds-resolution idle time since the last access, or `None`
    /// for a missing key. Reading it does not count as an access.
    pub fn idle_time(&mut self, key: &str, now: SystemTime) -> Option<Duration> {
        if self.purge_if_expired(key, now) {
            return None;
        }
        let entry = self.entries.get(key)?;
        Some(now.duration_since(entry.last_access).unwrap_or(Duration::ZERO))
    }

    /// All live keys matching a glob pattern. O(n) over the keyspace.
    pub fn keys(&self, pattern: &str, now: SystemTime) -> Vec<String> {
        if self.entries.len() > 10_000 {
            warn!(key_count = self.entries.len(), "KEYS over a large keyspace");
        }
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Cursor-based key iteration for SCAN. Returns the next cursor
    /// (0 when the scan is complete) and a batch of keys.
    pub fn scan(
        &self,
        cursor: u64,
        count: usize,
        pattern: Option<&str>,
        now: SystemTime,
    ) -> (u64, Vec<String>) {
        let target = if count == 0 { 10 } else { count };
        let mut keys = Vec::with_capacity(target);
        let mut position = 0u64;

        for (key, entry) in &self.entries {
            if !entry.is_live(now) {
                continue;
            }
            if position < cursor {
                position += 1;
                continue;
            }
            position += 1;
            if let Some(pattern) = pattern {
                if !glob_match(pattern, key) {
                    continue;
                }
            }
            keys.push(key.clone());
            if keys.len() >= target {
                return (position, keys);
            }
        }
        (0, keys)
    }

    /// A uniformly random live key, or `None` when the database is
    /// empty.
    pub fn random_key(&self, now: SystemTime) -> Option<String> {
        use rand::seq::IteratorRandom;
        let mut rng = rand::rng();
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .choose(&mut rng)
    }

    /// Number of live keys.
    pub fn len(&self, now: SystemTime) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    /// Returns `true` when no live keys remain.
    pub fn is_empty(&self, now: SystemTime) -> bool {
        self.len(now) == 0
    }

    /// Removes every key, bumping each key's version so watchers see
    /// the flush as interference.
    pub fn clear(&mut self) {
        let keys: Vec<String> = self.entries.keys().cloned().collect();
        for key in &keys {
            self.bump(key);
        }
        self.entries.clear();
    }

    /// Bumps every version counter this database has ever issued.
    /// Used after SWAPDB, which replaces the whole keyspace at once.
    pub(crate) fn bump_all(&mut self) {
        for version in self.versions.values_mut() {
            *version += 1;
        }
    }

    /// Detaches an entry for relocation to another database (MOVE).
    /// Bumps the source version.
    pub(crate) fn take_entry(&mut self, key: &str, now: SystemTime) -> Option<Entry> {
        if self.purge_if_expired(key, now) {
            return None;
        }
        let entry = self.entries.remove(key)?;
        self.bump(key);
        Some(entry)
    }

    /// Installs an entry relocated from another database, TTL intact.
    /// Bumps the destination version.
    pub(crate) fn install_entry(&mut self, key: &str, entry: Entry) {
        self.entries.insert(key.to_owned(), entry);
        self.bump(key);
    }
}

/// Formats a float the way Redis prints scores and INCRBYFLOAT
/// results: no exponent, no trailing zeros, integral values without a
/// decimal point.
pub fn format_float(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e17 {
        format!("{}", value as i64)
    } else {
        let mut s = format!("{value:.17}");
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}
