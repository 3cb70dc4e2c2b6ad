//! Named, append-only result store

use hashbrown::HashMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// Per-key sequences of values that nodes publish into.
///
/// Writes only ever append. [`clear`](Self::clear) empties every sequence but
/// keeps the keys, so a key that was written at some point and emitted nothing
/// since the last clear reads as an empty series rather than as missing.
#[derive(Clone, Debug, Default)]
pub struct Pool {
    entries: HashMap<String, Vec<Value>>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the sequence under `key`.
    pub fn write(&mut self, key: &str, value: Value) {
        match self.entries.get_mut(key) {
            Some(series) => series.push(value),
            None => {
                self.entries.insert(key.to_owned(), vec![value]);
            }
        }
    }

    /// Empty every sequence. Allocations are kept for the next tick.
    pub fn clear(&mut self) {
        for series in self.entries.values_mut() {
            series.clear();
        }
    }

    /// The most recently appended value for `key`.
    pub fn read_latest(&self, key: &str) -> Result<&Value> {
        self.read_all(key)?
            .last()
            .ok_or_else(|| Error::EmptySeries { key: key.to_owned() })
    }

    /// Everything appended under `key` since the last clear.
    pub fn read_all(&self, key: &str) -> Result<&[Value]> {
        self.entries
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::PoolKeyNotFound { key: key.to_owned() })
    }

    /// Whether `key` has ever been written, even if it is empty now.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of keys ever written.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_empty_keys_are_distinct() {
        let mut pool = Pool::new();
        assert!(matches!(
            pool.read_latest("rms"),
            Err(Error::PoolKeyNotFound { .. })
        ));

        pool.write("rms", Value::Real(0.5));
        pool.clear();

        assert!(pool.contains("rms"));
        assert!(pool.read_all("rms").unwrap().is_empty());
        assert!(matches!(
            pool.read_latest("rms"),
            Err(Error::EmptySeries { .. })
        ));
    }

    #[test]
    fn latest_is_last_appended() {
        let mut pool = Pool::new();
        pool.write("frame", Value::Vector(vec![1.0, 2.0]));
        pool.write("frame", Value::Vector(vec![3.0, 4.0]));

        assert_eq!(pool.read_all("frame").unwrap().len(), 2);
        assert_eq!(
            pool.read_latest("frame").unwrap().as_vector(),
            Some(&[3.0, 4.0][..])
        );
    }
}
