use super::*;
use crate::types::normalize_range;
use crate::types::sorted_set::SortedSet;

/// Conditions controlling which ZADD writes take effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZAddFlags {
    /// Only add new members, never touch existing scores.
    pub nx: bool,
    /// Only update existing members, never add.
    pub xx: bool,
    /// Count updated members in the reply, not just added ones.
    pub ch: bool,
}

impl Db {
    /// Adds or updates scored members. The reply counts additions, or
    /// additions plus score changes with the CH flag.
    pub fn zadd(
        &mut self,
        key: &str,
        flags: ZAddFlags,
        members: &[(f64, String)],
        now: SystemTime,
    ) -> Result<usize, StoreError> {
        let entry =
            self.write_entry(key, now, || Value::SortedSet(SortedSet::new()), Kind::SortedSet)?;
        let Value::SortedSet(set) = &mut entry.value else {
            unreachable!("kind verified by write_entry");
        };
        let mut added = 0;
        let mut changed = 0;
        for (score, member) in members {
            let existing = set.score(member);
            match existing {
                Some(current) => {
                    if flags.nx || current == *score {
                        continue;
                    }
                    set.set_score(member, *score);
                    changed += 1;
                }
                None => {
                    if flags.xx {
                        continue;
                    }
                    set.set_score(member, *score);
                    added += 1;
                }
            }
        }
        let emptied = set.is_empty();
        entry.last_access = now;
        if emptied {
            // XX against a fresh key wrote nothing: don't keep an empty set
            self.entries.remove(key);
        }
        self.bump(key);
        Ok(if flags.ch { added + changed } else { added })
    }

    /// Removes members. Returns how many existed; an emptied set
    /// deletes the key.
    pub fn zrem(
        &mut self,
        key: &str,
        members: &[String],
        now: SystemTime,
    ) -> Result<usize, StoreError> {
        if self.purge_if_expired(key, now) {
            return Ok(0);
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(0);
        };
        let Value::SortedSet(set) = &mut entry.value else {
            return Err(StoreError::WrongType);
        };
        let mut removed = 0;
        for member in members {
            if set.remove(member) {
                removed += 1;
            }
        }
        let emptied = set.is_empty();
        entry.last_access = now;
        if removed > 0 {
            if emptied {
                self.entries.remove(key);
            }
            self.bump(key);
        }
        Ok(removed)
    }

    pub fn zscore(
        &mut self,
        key: &str,
        member: &str,
        now: SystemTime,
    ) -> Result<Option<f64>, StoreError> {
        match self.read_entry(key, now, Kind::SortedSet)? {
            Some(entry) => match &entry.value {
                Value::SortedSet(set) => Ok(set.score(member)),
                _ => unreachable!("kind verified by read_entry"),
            },
            None => Ok(None),
        }
    }

    pub fn zcard(&mut self, key: &str, now: SystemTime) -> Result<usize, StoreError> {
        match self.read_entry(key, now, Kind::SortedSet)? {
            Some(entry) => match &entry.value {
                Value::SortedSet(set) => Ok(set.len()),
                _ => unreachable!("kind verified by read_entry"),
            },
            None => Ok(0),
        }
    }

    /// Ascending 0-based rank of `member`.
    pub fn zrank(
        &mut self,
        key: &str,
        member: &str,
        now: SystemTime,
    ) -> Result<Option<usize>, StoreError> {
        match self.read_entry(key, now, Kind::SortedSet)? {
            Some(entry) => match &entry.value {
                Value::SortedSet(set) => Ok(set.rank(member)),
                _ => unreachable!("kind verified by read_entry"),
            },
            None => Ok(None),
        }
    }

    /// Adds `delta` to a member's score, creating it at `delta`.
    /// Returns the new score.
    pub fn zincr_by(
        &mut self,
        key: &str,
        member: &str,
        delta: f64,
        now: SystemTime,
    ) -> Result<f64, StoreError> {
        let entry =
            self.write_entry(key, now, || Value::SortedSet(SortedSet::new()), Kind::SortedSet)?;
        let Value::SortedSet(set) = &mut entry.value else {
            unreachable!("kind verified by write_entry");
        };
        let next = set.score(member).unwrap_or(0.0) + delta;
        if !next.is_finite() {
            return Err(StoreError::NanOrInfinity);
        }
        set.set_score(member, next);
        entry.last_access = now;
        self.bump(key);
        Ok(next)
    }

    /// Members in the inclusive rank range, ascending or descending.
    /// Negative indices count from the end.
    pub fn zrange(
        &mut self,
        key: &str,
        start: i64,
        stop: i64,
        rev: bool,
        now: SystemTime,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let Some(entry) = self.read_entry(key, now, Kind::SortedSet)? else {
            return Ok(vec![]);
        };
        let Value::SortedSet(set) = &entry.value else {
            unreachable!("kind verified by read_entry");
        };
        let Some((from, to)) = normalize_range(start, stop, set.len()) else {
            return Ok(vec![]);
        };
        let slice: Vec<(String, f64)> = if rev {
            // ranks count from the highest score in reverse mode
            let len = set.len();
            let (rfrom, rto) = (len - 1 - to, len - 1 - from);
            let mut items: Vec<(String, f64)> = set
                .range(rfrom, rto)
                .map(|(m, s)| (m.to_owned(), s))
                .collect();
            items.reverse();
            items
        } else {
            set.range(from, to).map(|(m, s)| (m.to_owned(), s)).collect()
        };
        Ok(slice)
    }

    /// Members with scores in `[min, max]`, each bound optionally
    /// exclusive, ascending order.
    pub fn zrange_by_score(
        &mut self,
        key: &str,
        min: f64,
        min_exclusive: bool,
        max: f64,
        max_exclusive: bool,
        now: SystemTime,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let Some(entry) = self.read_entry(key, now, Kind::SortedSet)? else {
            return Ok(vec![]);
        };
        let Value::SortedSet(set) = &entry.value else {
            unreachable!("kind verified by read_entry");
        };
        Ok(set
            .range_by_score(min, min_exclusive, max, max_exclusive)
            .map(|(m, s)| (m.to_owned(), s))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    fn seed(db: &mut Db) {
        db.zadd(
            "z",
            ZAddFlags::default(),
            &[(1.0, "a".into()), (2.0, "b".into()), (3.0, "c".into())],
            at(0),
        )
        .unwrap();
    }

    #[test]
    fn zadd_add_and_update_counts() {
        let mut db = Db::new();
        let n = db
            .zadd(
                "z",
                ZAddFlags::default(),
                &[(1.0, "a".into()), (2.0, "b".into())],
                at(0),
            )
            .unwrap();
        assert_eq!(n, 2);

        // plain zadd counts only additions
        let n = db
            .zadd(
                "z",
                ZAddFlags::default(),
                &[(9.0, "a".into()), (3.0, "c".into())],
                at(0),
            )
            .unwrap();
        assert_eq!(n, 1);

        // CH counts updates too
        let n = db
            .zadd(
                "z",
                ZAddFlags { ch: true, ..Default::default() },
                &[(10.0, "a".into()), (4.0, "d".into())],
                at(0),
            )
            .unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn zadd_nx_xx() {
        let mut db = Db::new();
        seed(&mut db);
        db.zadd(
            "z",
            ZAddFlags { nx: true, ..Default::default() },
            &[(99.0, "a".into()), (4.0, "d".into())],
            at(0),
        )
        .unwrap();
        assert_eq!(db.zscore("z", "a", at(0)).unwrap(), Some(1.0));
        assert_eq!(db.zscore("z", "d", at(0)).unwrap(), Some(4.0));

        db.zadd(
            "z",
            ZAddFlags { xx: true, ..Default::default() },
            &[(5.0, "a".into()), (6.0, "nope".into())],
            at(0),
        )
        .unwrap();
        assert_eq!(db.zscore("z", "a", at(0)).unwrap(), Some(5.0));
        assert_eq!(db.zscore("z", "nope", at(0)).unwrap(), None);
    }

    #[test]
    fn zadd_xx_on_missing_key_leaves_nothing() {
        let mut db = Db::new();
        let n = db
            .zadd(
                "fresh",
                ZAddFlags { xx: true, ..Default::default() },
                &[(1.0, "a".into())],
                at(0),
            )
            .unwrap();
        assert_eq!(n, 0);
        assert!(!db.exists("fresh", at(0)));
    }

    #[test]
    fn zrange_and_rev() {
        let mut db = Db::new();
        seed(&mut db);
        let asc = db.zrange("z", 0, -1, false, at(0)).unwrap();
        let names: Vec<&str> = asc.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let desc = db.zrange("z", 0, 1, true, at(0)).unwrap();
        let names: Vec<&str> = desc.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(names, vec!["c", "b"]);

        assert!(db.zrange("missing", 0, -1, false, at(0)).unwrap().is_empty());
    }

    #[test]
    fn zrange_by_score_bounds() {
        let mut db = Db::new();
        seed(&mut db);
        let got = db
            .zrange_by_score("z", 1.0, true, 3.0, false, at(0))
            .unwrap();
        let names: Vec<&str> = got.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn zrem_and_rank() {
        let mut db = Db::new();
        seed(&mut db);
        assert_eq!(db.zrank("z", "c", at(0)).unwrap(), Some(2));
        assert_eq!(db.zrem("z", &["b".into(), "zz".into()], at(0)).unwrap(), 1);
        assert_eq!(db.zrank("z", "c", at(0)).unwrap(), Some(1));
        db.zrem("z", &["a".into(), "c".into()], at(0)).unwrap();
        assert!(!db.exists("z", at(0)));
    }

    #[test]
    fn zincr_by_creates_and_accumulates() {
        let mut db = Db::new();
        assert_eq!(db.zincr_by("z", "m", 2.5, at(0)).unwrap(), 2.5);
        assert_eq!(db.zincr_by("z", "m", -1.0, at(0)).unwrap(), 1.5);
        assert_eq!(db.zcard("z", at(0)).unwrap(), 1);
    }

    #[test]
    fn wrong_type_guard() {
        let mut db = Db::new();
        db.set("s", Value::Str(Bytes::from("x")), at(0));
        assert_eq!(
            db.zadd("s", ZAddFlags::default(), &[(1.0, "a".into())], at(0)),
            Err(StoreError::WrongType)
        );
        assert_eq!(db.zscore("s", "a", at(0)), Err(StoreError::WrongType));
    }
}
