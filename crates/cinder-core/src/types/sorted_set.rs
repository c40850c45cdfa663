//! Sorted set: unique members ordered by (score, member).
//!
//! Dual-indexed: a member → score map for O(1) lookups plus a vector
//! kept sorted by (score, member) for rank and range queries via
//! binary search. Ties in score break lexicographically, matching
//! Redis semantics.

use ahash::AHashMap;
use ordered_float::OrderedFloat;

/// A sorted set of string members with float scores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedSet {
    by_member: AHashMap<String, OrderedFloat<f64>>,
    ordered: Vec<(OrderedFloat<f64>, String)>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Returns the score of `member`, if present.
    pub fn score(&self, member: &str) -> Option<f64> {
        self.by_member.get(member).map(|s| s.0)
    }

    /// Inserts `member` with `score`, replacing any previous score.
    /// Returns `true` if the member is new.
    pub fn set_score(&mut self, member: &str, score: f64) -> bool {
        let score = OrderedFloat(score);
        match self.by_member.insert(member.to_owned(), score) {
            Some(old) => {
                if old != score {
                    let idx = self.position(old, member);
                    self.ordered.remove(idx);
                    let idx = self.insertion_point(score, member);
                    self.ordered.insert(idx, (score, member.to_owned()));
                }
                false
            }
            None => {
                let idx = self.insertion_point(score, member);
                self.ordered.insert(idx, (score, member.to_owned()));
                true
            }
        }
    }

    /// Removes `member`. Returns `true` if it was present.
    pub fn remove(&mut self, member: &str) -> bool {
        match self.by_member.remove(member) {
            Some(score) => {
                let idx = self.position(score, member);
                self.ordered.remove(idx);
                true
            }
            None => false,
        }
    }

    /// 0-based rank of `member` in ascending (score, member) order.
    pub fn rank(&self, member: &str) -> Option<usize> {
        let score = *self.by_member.get(member)?;
        Some(self.position(score, member))
    }

    /// Members with rank in the inclusive `[start, stop]` slice,
    /// ascending order.
    pub fn range(&self, start: usize, stop: usize) -> impl Iterator<Item = (&str, f64)> {
        let slice: &[(OrderedFloat<f64>, String)] = if start < self.ordered.len() {
            let stop = stop.min(self.ordered.len() - 1);
            &self.ordered[start..=stop]
        } else {
            &[]
        };
        slice.iter().map(|(s, m)| (m.as_str(), s.0))
    }

    /// Members whose score lies between `min` and `max`; each bound may
    /// be exclusive. Ascending order.
    pub fn range_by_score(
        &self,
        min: f64,
        min_exclusive: bool,
        max: f64,
        max_exclusive: bool,
    ) -> impl Iterator<Item = (&str, f64)> {
        let lo = if min_exclusive {
            self.ordered
                .partition_point(|(s, _)| s.0 <= min)
        } else {
            self.ordered.partition_point(|(s, _)| s.0 < min)
        };
        let hi = if max_exclusive {
            self.ordered.partition_point(|(s, _)| s.0 < max)
        } else {
            self.ordered.partition_point(|(s, _)| s.0 <= max)
        };
        self.ordered[lo..hi.max(lo)]
            .iter()
            .map(|(s, m)| (m.as_str(), s.0))
    }

    /// All members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.ordered.iter().map(|(s, m)| (m.as_str(), s.0))
    }

    /// Index of an existing member in the ordered vector.
    fn position(&self, score: OrderedFloat<f64>, member: &str) -> usize {
        // members in the map are always present in the vector
        self.ordered
            .binary_search_by(|(s, m)| s.cmp(&score).then_with(|| m.as_str().cmp(member)))
            .unwrap_or_else(|i| i)
    }

    /// Insertion point that keeps the vector sorted by (score, member).
    fn insertion_point(&self, score: OrderedFloat<f64>, member: &str) -> usize {
        self.ordered
            .partition_point(|(s, m)| (*s, m.as_str()) < (score, member))
    }
}
