//! Data type representations for stored values.
//!
//! One [`Value`] variant per emulated Redis type. The variant tag is
//! the authoritative "key → kind" index: a key holds exactly one
//! `Value`, so type exclusivity holds by construction.

pub mod hll;
pub mod sorted_set;
pub mod stream;

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use bytes::Bytes;

use hll::Hll;
use sorted_set::SortedSet;
use stream::Stream;

/// A stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Binary-safe string data. `Bytes` makes clones cheap.
    Str(Bytes),

    /// Ordered list with O(1) push/pop at both ends.
    List(VecDeque<Bytes>),

    /// Field → value map.
    Hash(AHashMap<String, Bytes>),

    /// Unordered set of unique members.
    Set(AHashSet<String>),

    /// Members ordered by (score, member).
    SortedSet(SortedSet),

    /// Append-only entry log with monotonically increasing IDs.
    Stream(Stream),

    /// Cardinality estimator. Counts are exact in this emulation.
    Hll(Hll),
}

impl Value {
    /// Returns the kind tag for this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Str(_) => Kind::Str,
            Value::List(_) => Kind::List,
            Value::Hash(_) => Kind::Hash,
            Value::Set(_) => Kind::Set,
            Value::SortedSet(_) => Kind::SortedSet,
            Value::Stream(_) => Kind::Stream,
            Value::Hll(_) => Kind::Hll,
        }
    }
}

/// The type tag of a key's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Str,
    List,
    Hash,
    Set,
    SortedSet,
    Stream,
    Hll,
}

impl Kind {
    /// The name the TYPE command reports. HLL keys report `string`,
    /// matching what clients of the real server observe.
    pub fn type_name(self) -> &'static str {
        match self {
            Kind::Str | Kind::Hll => "string",
            Kind::List => "list",
            Kind::Hash => "hash",
            Kind::Set => "set",
            Kind::SortedSet => "zset",
            Kind::Stream => "stream",
        }
    }
}

/// Resolves Redis-style inclusive range bounds (negative indices count
/// from the tail) against a collection of `len` elements. Returns
/// `None` when the range selects nothing.
pub fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}
