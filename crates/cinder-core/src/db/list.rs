use std::collections::VecDeque;

use bytes::Bytes;

use super::*;
use crate::types::normalize_range;

impl Db {
    /// Pushes values onto the head (`left = true`) or tail of a list,
    /// creating it when missing. Returns the new length.
    pub fn push(
        &mut self,
        key: &str,
        values: &[Bytes],
        left: bool,
        now: SystemTime,
    ) -> Result<usize, StoreError> {
        let entry = self.write_entry(key, now, || Value::List(VecDeque::new()), Kind::List)?;
        let Value::List(items) = &mut entry.value else {
            unreachable!("kind verified by write_entry");
        };
        for value in values {
            if left {
                items.push_front(value.clone());
            } else {
                items.push_back(value.clone());
            }
        }
        let len = items.len();
        entry.last_access = now;
        self.bump(key);
        Ok(len)
    }

    pub fn lpush(&mut self, key: &str, values: &[Bytes], now: SystemTime) -> Result<usize, StoreError> {
        self.push(key, values, true, now)
    }

    pub fn rpush(&mut self, key: &str, values: &[Bytes], now: SystemTime) -> Result<usize, StoreError> {
        self.push(key, values, false, now)
    }

    /// Pops one element from the head or tail. Emptying the list
    /// deletes the key, mirroring Redis.
    pub fn pop(
        &mut self,
        key: &str,
        left: bool,
        now: SystemTime,
    ) -> Result<Option<Bytes>, StoreError> {
        if self.purge_if_expired(key, now) {
            return Ok(None);
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(None);
        };
        let Value::List(items) = &mut entry.value else {
            return Err(StoreError::WrongType);
        };
        let popped = if left {
            items.pop_front()
        } else {
            items.pop_back()
        };
        let emptied = items.is_empty();
        entry.last_access = now;
        if popped.is_some() {
            if emptied {
                self.entries.remove(key);
            }
            self.bump(key);
        }
        Ok(popped)
    }

    pub fn lpop(&mut self, key: &str, now: SystemTime) -> Result<Option<Bytes>, StoreError> {
        self.pop(key, true, now)
    }

    pub fn rpop(&mut self, key: &str, now: SystemTime) -> Result<Option<Bytes>, StoreError> {
        self.pop(key, false, now)
    }

    /// List length; 0 for a missing key.
    pub fn llen(&mut self, key: &str, now: SystemTime) -> Result<usize, StoreError> {
        match self.read_entry(key, now, Kind::List)? {
            Some(entry) => match &entry.value {
                Value::List(items) => Ok(items.len()),
                _ => unreachable!("kind verified by read_entry"),
            },
            None => Ok(0),
        }
    }

    /// Elements in the inclusive index range, negative indices counting
    /// from the tail.
    pub fn lrange(
        &mut self,
        key: &str,
        start: i64,
        stop: i64,
        now: SystemTime,
    ) -> Result<Vec<Bytes>, StoreError> {
        let Some(entry) = self.read_entry(key, now, Kind::List)? else {
            return Ok(vec![]);
        };
        let Value::List(items) = &entry.value else {
            unreachable!("kind verified by read_entry");
        };
        let Some((from, to)) = normalize_range(start, stop, items.len()) else {
            return Ok(vec![]);
        };
        Ok(items.iter().skip(from).take(to - from + 1).cloned().collect())
    }

    /// The element at `index`, or `None` when missing or out of range.
    pub fn lindex(
        &mut self,
        key: &str,
        index: i64,
        now: SystemTime,
    ) -> Result<Option<Bytes>, StoreError> {
        let Some(entry) = self.read_entry(key, now, Kind::List)? else {
            return Ok(None);
        };
        let Value::List(items) = &entry.value else {
            unreachable!("kind verified by read_entry");
        };
        let idx = if index < 0 {
            items.len() as i64 + index
        } else {
            index
        };
        if idx < 0 || idx as usize >= items.len() {
            return Ok(None);
        }
        Ok(items.get(idx as usize).cloned())
    }

    /// Overwrites the element at `index`. `NoSuchKey` for a missing
    /// key, `IndexOutOfRange` past either end.
    pub fn lset(
        &mut self,
        key: &str,
        index: i64,
        value: Bytes,
        now: SystemTime,
    ) -> Result<(), StoreError> {
        if self.purge_if_expired(key, now) {
            return Err(StoreError::NoSuchKey);
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return Err(StoreError::NoSuchKey);
        };
        let Value::List(items) = &mut entry.value else {
            return Err(StoreError::WrongType);
        };
        let idx = if index < 0 {
            items.len() as i64 + index
        } else {
            index
        };
        if idx < 0 || idx as usize >= items.len() {
            return Err(StoreError::IndexOutOfRange);
        }
        items[idx as usize] = value;
        entry.last_access = now;
        self.bump(key);
        Ok(())
    }

    /// Trims the list to the inclusive index range. Trimming everything
    /// away deletes the key.
    pub fn ltrim(
        &mut self,
        key: &str,
        start: i64,
        stop: i64,
        now: SystemTime,
    ) -> Result<(), StoreError> {
        if self.purge_if_expired(key, now) {
            return Ok(());
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(());
        };
        let Value::List(items) = &mut entry.value else {
            return Err(StoreError::WrongType);
        };
        match normalize_range(start, stop, items.len()) {
            Some((from, to)) => {
                items.truncate(to + 1);
                items.drain(..from);
                entry.last_access = now;
                self.bump(key);
            }
            None => {
                // range selects nothing: the whole list goes
                self.entries.remove(key);
                self.bump(key);
            }
        }
        Ok(())
    }

    /// Removes up to `count` occurrences of `value`: positive counts
    /// scan head→tail, negative tail→head, zero removes all. Returns
    /// the number removed; an emptied list deletes the key.
    pub fn lrem(
        &mut self,
        key: &str,
        count: i64,
        value: &[u8],
        now: SystemTime,
    ) -> Result<usize, StoreError> {
        if self.purge_if_expired(key, now) {
            return Ok(0);
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(0);
        };
        let Value::List(items) = &mut entry.value else {
            return Err(StoreError::WrongType);
        };

        let limit = if count == 0 {
            usize::MAX
        } else {
            count.unsigned_abs() as usize
        };
        let mut removed = 0;
        if count >= 0 {
            let mut i = 0;
            while i < items.len() && removed < limit {
                if items[i] == value {
                    items.remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        } else {
            let mut i = items.len();
            while i > 0 && removed < limit {
                i -= 1;
                if items[i] == value {
                    items.remove(i);
                    removed += 1;
                }
            }
        }

        let emptied = items.is_empty();
        entry.last_access = now;
        if removed > 0 {
            if emptied {
                self.entries.remove(key);
            }
            self.bump(key);
        }
        Ok(removed)
    }
}
