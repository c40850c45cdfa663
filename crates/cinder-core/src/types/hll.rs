//! Cardinality estimator backing PFADD/PFCOUNT/PFMERGE.
//!
//! Deliberately not a real HyperLogLog sketch: the observed elements
//! are kept verbatim and counts are exact. For a test double that is
//! the more useful behavior — clients get a strictly more accurate
//! estimator with identical command semantics, and assertions on
//! counts never flake on estimation error.

use ahash::AHashSet;
use bytes::Bytes;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hll {
    seen: AHashSet<Bytes>,
}

impl Hll {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes one element. Returns `true` if it changed the count.
    pub fn add(&mut self, element: Bytes) -> bool {
        self.seen.insert(element)
    }

    /// The exact cardinality.
    pub fn count(&self) -> usize {
        self.seen.len()
    }

    /// Folds another estimator into this one.
    pub fn merge(&mut self, other: &Hll) {
        for element in &other.seen {
            self.seen.insert(element.clone());
        }
    }

    /// Exact union cardinality across several estimators.
    pub fn union_count<'a>(estimators: impl Iterator<Item = &'a Hll>) -> usize {
        let mut union = AHashSet::new();
        for hll in estimators {
            union.extend(hll.seen.iter().cloned());
        }
        union.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_deduplicates() {
        let mut hll = Hll::new();
        assert!(hll.add(Bytes::from("a")));
        assert!(hll.add(Bytes::from("b")));
        assert!(!hll.add(Bytes::from("a")));
        assert_eq!(hll.count(), 2);
    }

    #[test]
    fn merge_unions() {
        let mut left = Hll::new();
        left.add(Bytes::from("a"));
        left.add(Bytes::from("b"));
        let mut right = Hll::new();
        right.add(Bytes::from("b"));
        right.add(Bytes::from("c"));

        left.merge(&right);
        assert_eq!(left.count(), 3);
        // merge source is untouched
        assert_eq!(right.count(), 2);
    }

    #[test]
    fn union_count_over_many() {
        let mut a = Hll::new();
        a.add(Bytes::from("x"));
        let mut b = Hll::new();
        b.add(Bytes::from("x"));
        b.add(Bytes::from("y"));
        assert_eq!(Hll::union_count([&a, &b].into_iter()), 2);
        assert_eq!(Hll::union_count(std::iter::empty()), 0);
    }
}
