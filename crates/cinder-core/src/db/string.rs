use std::str;

use bytes::{Bytes, BytesMut};

use super::*;

impl Db {
    /// The string value at `key`, or `None` if missing/expired.
    /// `WrongType` when the key holds another kind.
    pub fn get(&mut self, key: &str, now: SystemTime) -> Result<Option<Bytes>, StoreError> {
        Ok(self
            .read_entry(key, now, Kind::Str)?
            .map(|entry| match &entry.value {
                Value::Str(data) => data.clone(),
                _ => unreachable!("kind verified by read_entry"),
            }))
    }

    /// SET with its option set: `expire` as a duration from `now`
    /// (replacing any TTL; `None` clears it), `nx`/`xx` existence
    /// conditions. Returns `false` when a condition blocked the write.
    pub fn set_string(
        &mut self,
        key: &str,
        value: Bytes,
        expire: Option<Duration>,
        nx: bool,
        xx: bool,
        now: SystemTime,
    ) -> bool {
        self.purge_if_expired(key, now);
        let exists = self.entries.contains_key(key);
        if (nx && exists) || (xx && !exists) {
            return false;
        }
        let deadline = expire.map(|d| now + d);
        self.entries
            .insert(key.to_owned(), Entry::new(Value::Str(value), deadline, now));
        self.bump(key);
        true
    }

    /// Atomically replaces the string at `key`, returning the previous
    /// value. Clears any TTL, like SET does.
    pub fn getset(
        &mut self,
        key: &str,
        value: Bytes,
        now: SystemTime,
    ) -> Result<Option<Bytes>, StoreError> {
        let previous = self.get(key, now)?;
        self.set(key, Value::Str(value), now);
        Ok(previous)
    }

    /// Appends to the string at `key`, creating it when missing.
    /// Preserves the TTL. Returns the new length.
    pub fn append(
        &mut self,
        key: &str,
        suffix: &[u8],
        now: SystemTime,
    ) -> Result<usize, StoreError> {
        let entry = self.write_entry(key, now, || Value::Str(Bytes::new()), Kind::Str)?;
        let Value::Str(current) = &mut entry.value else {
            unreachable!("kind verified by write_entry");
        };
        let mut combined = BytesMut::with_capacity(current.len() + suffix.len());
        combined.extend_from_slice(current);
        combined.extend_from_slice(suffix);
        let len = combined.len();
        *current = combined.freeze();
        entry.last_access = now;
        self.bump(key);
        Ok(len)
    }

    /// Length of the string at `key`, 0 when missing.
    pub fn strlen(&mut self, key: &str, now: SystemTime) -> Result<usize, StoreError> {
        Ok(self.get(key, now)?.map(|b| b.len()).unwrap_or(0))
    }

    /// Adds `delta` to the integer at `key`, creating it as 0 first.
    /// Preserves the TTL on update. Returns the new value.
    pub fn incr_by(
        &mut self,
        key: &str,
        delta: i64,
        now: SystemTime,
    ) -> Result<i64, StoreError> {
        let entry = self.write_entry(key, now, || Value::Str(Bytes::from("0")), Kind::Str)?;
        let Value::Str(current) = &entry.value else {
            unreachable!("kind verified by write_entry");
        };
        let parsed: i64 = str::from_utf8(current)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(StoreError::NotAnInteger)?;
        let next = parsed.checked_add(delta).ok_or(StoreError::Overflow)?;
        entry.value = Value::Str(Bytes::from(next.to_string()));
        entry.last_access = now;
        self.bump(key);
        Ok(next)
    }

    /// Adds a float `delta` to the value at `key`. Rejects results
    /// that are NaN or infinite. Returns the new value.
    pub fn incr_by_float(
        &mut self,
        key: &str,
        delta: f64,
        now: SystemTime,
    ) -> Result<f64, StoreError> {
        let entry = self.write_entry(key, now, || Value::Str(Bytes::from("0")), Kind::Str)?;
        let Value::Str(current) = &entry.value else {
            unreachable!("kind verified by write_entry");
        };
        let parsed: f64 = str::from_utf8(current)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .ok_or(StoreError::NotAFloat)?;
        let next = parsed + delta;
        if !next.is_finite() {
            return Err(StoreError::NanOrInfinity);
        }
        entry.value = Value::Str(Bytes::from(format_float(next)));
        entry.last_access = now;
        self.bump(key);
        Ok(next)
    }
}
