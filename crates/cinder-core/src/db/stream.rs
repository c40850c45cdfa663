use bytes::Bytes;

use super::*;
use crate::types::stream::{Stream, StreamEntry, StreamId};

impl Db {
    /// Appends an entry to the stream at `key`, creating the stream
    /// when missing. `id` of `None` auto-generates from `now`.
    /// Returns the ID actually written.
    pub fn xadd(
        &mut self,
        key: &str,
        id: Option<StreamId>,
        fields: Vec<(String, Bytes)>,
        now: SystemTime,
    ) -> Result<StreamId, StoreError> {
        let now_ms = unix_millis(now);
        let entry = self.write_entry(key, now, || Value::Stream(Stream::new()), Kind::Stream)?;
        let Value::Stream(stream) = &mut entry.value else {
            unreachable!("kind verified by write_entry");
        };
        let id = id.unwrap_or_else(|| stream.next_auto_id(now_ms));
        stream.append(id, fields)?;
        entry.last_access = now;
        self.bump(key);
        Ok(id)
    }

    /// Number of entries; 0 for a missing key.
    pub fn xlen(&mut self, key: &str, now: SystemTime) -> Result<usize, StoreError> {
        match self.read_entry(key, now, Kind::Stream)? {
            Some(entry) => match &entry.value {
                Value::Stream(stream) => Ok(stream.len()),
                _ => unreachable!("kind verified by read_entry"),
            },
            None => Ok(0),
        }
    }

    /// Entries with IDs in the inclusive `[start, end]` range.
    pub fn xrange(
        &mut self,
        key: &str,
        start: StreamId,
        end: StreamId,
        now: SystemTime,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        match self.read_entry(key, now, Kind::Stream)? {
            Some(entry) => match &entry.value {
                Value::Stream(stream) => Ok(stream.range(start, end).cloned().collect()),
                _ => unreachable!("kind verified by read_entry"),
            },
            None => Ok(vec![]),
        }
    }

    /// Deletes entries by ID. Returns how many existed. The stream key
    /// survives even when emptied, unlike other composite kinds.
    pub fn xdel(
        &mut self,
        key: &str,
        ids: &[StreamId],
        now: SystemTime,
    ) -> Result<usize, StoreError> {
        if self.purge_if_expired(key, now) {
            return Ok(0);
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(0);
        };
        let Value::Stream(stream) = &mut entry.value else {
            return Err(StoreError::WrongType);
        };
        let removed = stream.remove(ids);
        entry.last_access = now;
        if removed > 0 {
            self.bump(key);
        }
        Ok(removed)
    }
}

/// Milliseconds since the Unix epoch for `t`; pre-epoch clamps to 0.
pub(crate) fn unix_millis(t: SystemTime) -> u64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
