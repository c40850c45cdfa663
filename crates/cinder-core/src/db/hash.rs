use std::str;

use ahash::AHashMap;
use bytes::Bytes;

use super::*;

impl Db {
    /// Sets field/value pairs in a hash, creating it when missing.
    /// Returns the number of fields that are new.
    pub fn hset(
        &mut self,
        key: &str,
        fields: &[(String, Bytes)],
        now: SystemTime,
    ) -> Result<usize, StoreError> {
        let entry = self.write_entry(key, now, || Value::Hash(AHashMap::new()), Kind::Hash)?;
        let Value::Hash(map) = &mut entry.value else {
            unreachable!("kind verified by write_entry");
        };
        let mut added = 0;
        for (field, value) in fields {
            if map.insert(field.clone(), value.clone()).is_none() {
                added += 1;
            }
        }
        entry.last_access = now;
        self.bump(key);
        Ok(added)
    }

    /// Sets a field only if it doesn't exist yet. Returns `true` when
    /// the field was written.
    pub fn hsetnx(
        &mut self,
        key: &str,
        field: &str,
        value: Bytes,
        now: SystemTime,
    ) -> Result<bool, StoreError> {
        let entry = self.write_entry(key, now, || Value::Hash(AHashMap::new()), Kind::Hash)?;
        let Value::Hash(map) = &mut entry.value else {
            unreachable!("kind verified by write_entry");
        };
        if map.contains_key(field) {
            return Ok(false);
        }
        map.insert(field.to_owned(), value);
        entry.last_access = now;
        self.bump(key);
        Ok(true)
    }

    /// One field's value, `None` when the key or field is missing.
    pub fn hget(
        &mut self,
        key: &str,
        field: &str,
        now: SystemTime,
    ) -> Result<Option<Bytes>, StoreError> {
        match self.read_entry(key, now, Kind::Hash)? {
            Some(entry) => match &entry.value {
                Value::Hash(map) => Ok(map.get(field).cloned()),
                _ => unreachable!("kind verified by read_entry"),
            },
            None => Ok(None),
        }
    }

    /// Values for several fields, position for position.
    pub fn hmget(
        &mut self,
        key: &str,
        fields: &[String],
        now: SystemTime,
    ) -> Result<Vec<Option<Bytes>>, StoreError> {
        match self.read_entry(key, now, Kind::Hash)? {
            Some(entry) => match &entry.value {
                Value::Hash(map) => {
                    Ok(fields.iter().map(|f| map.get(f.as_str()).cloned()).collect())
                }
                _ => unreachable!("kind verified by read_entry"),
            },
            None => Ok(vec![None; fields.len()]),
        }
    }

    /// Deletes fields. Returns how many existed; an emptied hash
    /// deletes the key.
    pub fn hdel(
        &mut self,
        key: &str,
        fields: &[String],
        now: SystemTime,
    ) -> Result<usize, StoreError> {
        if self.purge_if_expired(key, now) {
            return Ok(0);
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(0);
        };
        let Value::Hash(map) = &mut entry.value else {
            return Err(StoreError::WrongType);
        };
        let mut removed = 0;
        for field in fields {
            if map.remove(field.as_str()).is_some() {
                removed += 1;
            }
        }
        let emptied = map.is_empty();
        entry.last_access = now;
        if removed > 0 {
            if emptied {
                self.entries.remove(key);
            }
            self.bump(key);
        }
        Ok(removed)
    }

    /// Every field/value pair. Empty for a missing key.
    pub fn hgetall(
        &mut self,
        key: &str,
        now: SystemTime,
    ) -> Result<Vec<(String, Bytes)>, StoreError> {
        match self.read_entry(key, now, Kind::Hash)? {
            Some(entry) => match &entry.value {
                Value::Hash(map) => Ok(map
                    .iter()
                    .map(|(f, v)| (f.clone(), v.clone()))
                    .collect()),
                _ => unreachable!("kind verified by read_entry"),
            },
            None => Ok(vec![]),
        }
    }

    pub fn hkeys(&mut self, key: &str, now: SystemTime) -> Result<Vec<String>, StoreError> {
        Ok(self
            .hgetall(key, now)?
            .into_iter()
            .map(|(field, _)| field)
            .collect())
    }

    pub fn hvals(&mut self, key: &str, now: SystemTime) -> Result<Vec<Bytes>, StoreError> {
        Ok(self
            .hgetall(key, now)?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    /// Number of fields; 0 for a missing key.
    pub fn hlen(&mut self, key: &str, now: SystemTime) -> Result<usize, StoreError> {
        match self.read_entry(key, now, Kind::Hash)? {
            Some(entry) => match &entry.value {
                Value::Hash(map) => Ok(map.len()),
                _ => unreachable!("kind verified by read_entry"),
            },
            None => Ok(0),
        }
    }

    pub fn hexists(
        &mut self,
        key: &str,
        field: &str,
        now: SystemTime,
    ) -> Result<bool, StoreError> {
        Ok(self.hget(key, field, now)?.is_some())
    }

    /// Byte length of one field's value; 0 when absent.
    pub fn hstrlen(
        &mut self,
        key: &str,
        field: &str,
        now: SystemTime,
    ) -> Result<usize, StoreError> {
        Ok(self.hget(key, field, now)?.map(|v| v.len()).unwrap_or(0))
    }

    /// Adds `delta` to the integer stored in one field, creating the
    /// field (and hash) as 0 first.
    pub fn hincr_by(
        &mut self,
        key: &str,
        field: &str,
        delta: i64,
        now: SystemTime,
    ) -> Result<i64, StoreError> {
        let entry = self.write_entry(key, now, || Value::Hash(AHashMap::new()), Kind::Hash)?;
        let Value::Hash(map) = &mut entry.value else {
            unreachable!("kind verified by write_entry");
        };
        let current: i64 = match map.get(field) {
            Some(raw) => str::from_utf8(raw)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or(StoreError::NotAnInteger)?,
            None => 0,
        };
        let next = current.checked_add(delta).ok_or(StoreError::Overflow)?;
        map.insert(field.to_owned(), Bytes::from(next.to_string()));
        entry.last_access = now;
        self.bump(key);
        Ok(next)
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
    fn hset_counts_new_fields_only() {
        let mut db = Db::new();
        assert_eq!(
            db.hset("h", &[("a".into(), b("1")), ("b".into(), b("2"))], at(0))
                .unwrap(),
            2
        );
        // overwriting "a" adds nothing new
        assert_eq!(
            db.hset("h", &[("a".into(), b("9")), ("c".into(), b("3"))], at(0))
                .unwrap(),
            1
        );
        assert_eq!(db.hget("h", "a", at(0)).unwrap(), Some(b("9")));
        assert_eq!(db.hlen("h", at(0)).unwrap(), 3);
    }

    #[test]
    fn hsetnx_respects_existing() {
        let mut db = Db::new();
        assert!(db.hsetnx("h", "f", b("1"), at(0)).unwrap());
        assert!(!db.hsetnx("h", "f", b("2"), at(0)).unwrap());
        assert_eq!(db.hget("h", "f", at(0)).unwrap(), Some(b("1")));
    }

    #[test]
    fn hmget_keeps_positions() {
        let mut db = Db::new();
        db.hset("h", &[("a".into(), b("1"))], at(0)).unwrap();
        let got = db
            .hmget("h", &["a".into(), "missing".into()], at(0))
            .unwrap();
        assert_eq!(got, vec![Some(b("1")), None]);
        let absent = db.hmget("nope", &["x".into()], at(0)).unwrap();
        assert_eq!(absent, vec![None]);
    }

    #[test]
    fn hdel_empties_delete_key() {
        let mut db = Db::new();
        db.hset("h", &[("a".into(), b("1")), ("b".into(), b("2"))], at(0))
            .unwrap();
        assert_eq!(db.hdel("h", &["a".into(), "zz".into()], at(0)).unwrap(), 1);
        assert!(db.exists("h", at(0)));
        assert_eq!(db.hdel("h", &["b".into()], at(0)).unwrap(), 1);
        assert!(!db.exists("h", at(0)));
    }

    #[test]
    fn hincr_by_creates_and_counts() {
        let mut db = Db::new();
        assert_eq!(db.hincr_by("h", "n", 5, at(0)).unwrap(), 5);
        assert_eq!(db.hincr_by("h", "n", -2, at(0)).unwrap(), 3);
        db.hset("h", &[("s".into(), b("abc"))], at(0)).unwrap();
        assert_eq!(
            db.hincr_by("h", "s", 1, at(0)),
            Err(StoreError::NotAnInteger)
        );
    }

    #[test]
    fn wrong_type_guards() {
        let mut db = Db::new();
        db.set("s", Value::Str(b("x")), at(0));
        assert_eq!(
            db.hset("s", &[("f".into(), b("v"))], at(0)),
            Err(StoreError::WrongType)
        );
        assert_eq!(db.hget("s", "f", at(0)), Err(StoreError::WrongType));
        assert_eq!(db.hgetall("s", at(0)), Err(StoreError::WrongType));
    }

    #[test]
    fn hkeys_hvals_exists_strlen() {
        let mut db = Db::new();
        db.hset("h", &[("a".into(), b("123")), ("b".into(), b("45"))], at(0))
            .unwrap();
        let mut keys = db.hkeys("h", at(0)).unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(db.hvals("h", at(0)).unwrap().len(), 2);
        assert!(db.hexists("h", "a", at(0)).unwrap());
        assert!(!db.hexists("h", "zz", at(0)).unwrap());
        assert_eq!(db.hstrlen("h", "a", at(0)).unwrap(), 3);
        assert_eq!(db.hstrlen("h", "zz", at(0)).unwrap(), 0);
    }
}
