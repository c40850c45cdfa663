use bytes::Bytes;

use super::*;
use crate::types::hll::Hll;

impl Db {
    /// Observes elements into the estimator at `key`, creating it when
    /// missing. Returns `true` when the cardinality changed.
    pub fn pfadd(
        &mut self,
        key: &str,
        elements: &[Bytes],
        now: SystemTime,
    ) -> Result<bool, StoreError> {
        let entry = self.write_entry(key, now, || Value::Hll(Hll::new()), Kind::Hll)?;
        let Value::Hll(hll) = &mut entry.value else {
            unreachable!("kind verified by write_entry");
        };
        let mut changed = false;
        for element in elements {
            changed |= hll.add(element.clone());
        }
        entry.last_access = now;
        self.bump(key);
        Ok(changed)
    }

    /// Cardinality of the union of the estimators at `keys`; missing
    /// keys contribute nothing.
    pub fn pfcount(&mut self, keys: &[String], now: SystemTime) -> Result<usize, StoreError> {
        let mut union = Hll::new();
        for key in keys {
            if let Some(entry) = self.read_entry(key, now, Kind::Hll)? {
                let Value::Hll(hll) = &entry.value else {
                    unreachable!("kind verified by read_entry");
                };
                union.merge(hll);
            }
        }
        Ok(union.count())
    }

    /// Merges the estimators at `sources` into `dest`, creating it
    /// when missing.
    pub fn pfmerge(
        &mut self,
        dest: &str,
        sources: &[String],
        now: SystemTime,
    ) -> Result<(), StoreError> {
        let mut merged = Hll::new();
        for key in sources {
            if let Some(entry) = self.read_entry(key, now, Kind::Hll)? {
                let Value::Hll(hll) = &entry.value else {
                    unreachable!("kind verified by read_entry");
                };
                merged.merge(hll);
            }
        }
        let entry = self.write_entry(dest, now, || Value::Hll(Hll::new()), Kind::Hll)?;
        let Value::Hll(hll) = &mut entry.value else {
            unreachable!("kind verified by write_entry");
        };
        hll.merge(&merged);
        entry.last_access = now;
        self.bump(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn pfadd_reports_change() {
        let mut db = Db::new();
        assert!(db.pfadd("h", &[b("a"), b("b")], at(0)).unwrap());
        assert!(!db.pfadd("h", &[b("a")], at(0)).unwrap());
        assert_eq!(db.pfcount(&["h".into()], at(0)).unwrap(), 2);
    }

    #[test]
    fn pfcount_unions_keys() {
        let mut db = Db::new();
        db.pfadd("x", &[b("1"), b("2")], at(0)).unwrap();
        db.pfadd("y", &[b("2"), b("3")], at(0)).unwrap();
        assert_eq!(db.pfcount(&["x".into(), "y".into()], at(0)).unwrap(), 3);
        assert_eq!(db.pfcount(&["ghost".into()], at(0)).unwrap(), 0);
    }

    #[test]
    fn pfmerge_into_existing_and_fresh() {
        let mut db = Db::new();
        db.pfadd("x", &[b("1")], at(0)).unwrap();
        db.pfadd("y", &[b("2")], at(0)).unwrap();
        db.pfmerge("dest", &["x".into(), "y".into()], at(0)).unwrap();
        assert_eq!(db.pfcount(&["dest".into()], at(0)).unwrap(), 2);

        db.pfadd("dest", &[b("3")], at(0)).unwrap();
        db.pfmerge("dest", &["x".into()], at(0)).unwrap();
        assert_eq!(db.pfcount(&["dest".into()], at(0)).unwrap(), 3);
    }

    #[test]
    fn hll_key_is_observably_a_string() {
        let mut db = Db::new();
        db.pfadd("h", &[b("a")], at(0)).unwrap();
        assert_eq!(db.type_name("h", at(0)), "string");
        // but string commands still refuse it
        assert_eq!(db.get("h", at(0)), Err(StoreError::WrongType));
    }
}
