//! Stream type: an append-only log of field/value entries.
//!
//! Entry IDs are `<ms>-<seq>` pairs and must increase strictly.
//! Auto-generated IDs take their millisecond part from the instance
//! clock, so pinned-clock tests get reproducible stream IDs.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::StoreError;

/// A stream entry ID: milliseconds plus a per-millisecond sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    /// The smallest valid ID (`0-0` itself is reserved and never stored).
    pub const MIN: StreamId = StreamId { ms: 0, seq: 0 };

    /// The largest representable ID.
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

impl FromStr for StreamId {
    type Err = StoreError;

    /// Parses `<ms>-<seq>` or bare `<ms>` (sequence defaults to 0).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ms, seq) = match s.split_once('-') {
            Some((ms, seq)) => (
                ms.parse().map_err(|_| StoreError::InvalidStreamId)?,
                seq.parse().map_err(|_| StoreError::InvalidStreamId)?,
            ),
            None => (s.parse().map_err(|_| StoreError::InvalidStreamId)?, 0),
        };
        Ok(StreamId { ms, seq })
    }
}

/// One entry: its ID and the field/value pairs in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: Vec<(String, Bytes)>,
}

/// The stream itself. `last_id` survives deletions so re-used IDs stay
/// rejected, matching Redis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stream {
    entries: Vec<StreamEntry>,
    last_id: StreamId,
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_id(&self) -> StreamId {
        self.last_id
    }

    /// The ID a `XADD key *` gets right now: current clock milliseconds,
    /// or the next sequence number when the clock hasn't moved past the
    /// last entry.
    pub fn next_auto_id(&self, now_ms: u64) -> StreamId {
        if now_ms > self.last_id.ms {
            StreamId { ms: now_ms, seq: 0 }
        } else {
            StreamId {
                ms: self.last_id.ms,
                seq: self.last_id.seq + 1,
            }
        }
    }

    /// Appends an entry. The ID must be strictly greater than every
    /// previously accepted ID, and `0-0` is never accepted.
    pub fn append(
        &mut self,
        id: StreamId,
        fields: Vec<(String, Bytes)>,
    ) -> Result<(), StoreError> {
        if id <= self.last_id || id == StreamId::MIN {
            return Err(StoreError::StreamIdTooSmall);
        }
        self.entries.push(StreamEntry { id, fields });
        self.last_id = id;
        Ok(())
    }

    /// Entries with `start <= id <= end`, in insertion order.
    pub fn range(&self, start: StreamId, end: StreamId) -> impl Iterator<Item = &StreamEntry> {
        self.entries
            .iter()
            .filter(move |e| e.id >= start && e.id <= end)
    }

    /// Removes the entries with the given IDs. Returns how many existed.
    pub fn remove(&mut self, ids: &[StreamId]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !ids.contains(&e.id));
        before - self.entries.len()
    }
}
