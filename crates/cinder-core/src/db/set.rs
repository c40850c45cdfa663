use ahash::AHashSet;

use super::*;

impl Db {
    /// Adds members to a set, creating it when missing. Returns the
    /// number of members that are new.
    pub fn sadd(
        &mut self,
        key: &str,
        members: &[String],
        now: SystemTime,
    ) -> Result<usize, StoreError> {
        let entry = self.write_entry(key, now, || Value::Set(AHashSet::new()), Kind::Set)?;
        let Value::Set(set) = &mut entry.value else {
            unreachable!("kind verified by write_entry");
        };
        let mut added = 0;
        for member in members {
            if set.insert(member.clone()) {
                added += 1;
            }
        }
        entry.last_access = now;
        self.bump(key);
        Ok(added)
    }

    /// Removes members. Returns how many existed; an emptied set
    /// deletes the key.
    pub fn srem(
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
        let Value::Set(set) = &mut entry.value else {
            return Err(StoreError::WrongType);
        };
        let mut removed = 0;
        for member in members {
            if set.remove(member.as_str()) {
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

    /// All members, unordered. Empty for a missing key.
    pub fn smembers(&mut self, key: &str, now: SystemTime) -> Result<Vec<String>, StoreError> {
        match self.read_entry(key, now, Kind::Set)? {
            Some(entry) => match &entry.value {
                Value::Set(set) => Ok(set.iter().cloned().collect()),
                _ => unreachable!("kind verified by read_entry"),
            },
            None => Ok(vec![]),
        }
    }

    pub fn sismember(
        &mut self,
        key: &str,
        member: &str,
        now: SystemTime,
    ) -> Result<bool, StoreError> {
        match self.read_entry(key, now, Kind::Set)? {
            Some(entry) => match &entry.value {
                Value::Set(set) => Ok(set.contains(member)),
                _ => unreachable!("kind verified by read_entry"),
            },
            None => Ok(false),
        }
    }

    /// Cardinality; 0 for a missing key.
    pub fn scard(&mut self, key: &str, now: SystemTime) -> Result<usize, StoreError> {
        match self.read_entry(key, now, Kind::Set)? {
            Some(entry) => match &entry.value {
                Value::Set(set) => Ok(set.len()),
                _ => unreachable!("kind verified by read_entry"),
            },
            None => Ok(0),
        }
    }

    /// Removes and returns one random member; an emptied set deletes
    /// the key.
    pub fn spop(&mut self, key: &str, now: SystemTime) -> Result<Option<String>, StoreError> {
        use rand::seq::IteratorRandom;

        if self.purge_if_expired(key, now) {
            return Ok(None);
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(None);
        };
        let Value::Set(set) = &mut entry.value else {
            return Err(StoreError::WrongType);
        };
        let mut rng = rand::rng();
        let Some(member) = set.iter().choose(&mut rng).cloned() else {
            return Ok(None);
        };
        set.remove(member.as_str());
        let emptied = set.is_empty();
        entry.last_access = now;
        if emptied {
            self.entries.remove(key);
        }
        self.bump(key);
        Ok(Some(member))
    }

    /// Union of the sets at `keys`; missing keys read as empty.
    pub fn sunion(&mut self, keys: &[String], now: SystemTime) -> Result<Vec<String>, StoreError> {
        let mut union = AHashSet::new();
        for key in keys {
            union.extend(self.smembers(key, now)?);
        }
        Ok(union.into_iter().collect())
    }

    /// Intersection of the sets at `keys`.
    pub fn sinter(&mut self, keys: &[String], now: SystemTime) -> Result<Vec<String>, StoreError> {
        let Some((first, rest)) = keys.split_first() else {
            return Ok(vec![]);
        };
        let mut acc: AHashSet<String> = self.smembers(first, now)?.into_iter().collect();
        for key in rest {
            if acc.is_empty() {
                // still type-check the remaining keys
                self.smembers(key, now)?;
                continue;
            }
            let other: AHashSet<String> = self.smembers(key, now)?.into_iter().collect();
            acc.retain(|m| other.contains(m));
        }
        Ok(acc.into_iter().collect())
    }

    /// Members of the first set not present in any of the others.
    pub fn sdiff(&mut self, keys: &[String], now: SystemTime) -> Result<Vec<String>, StoreError> {
        let Some((first, rest)) = keys.split_first() else {
            return Ok(vec![]);
        };
        let mut acc: AHashSet<String> = self.smembers(first, now)?.into_iter().collect();
        for key in rest {
            for member in self.smembers(key, now)? {
                acc.remove(member.as_str());
            }
        }
        Ok(acc.into_iter().collect())
    }
}
