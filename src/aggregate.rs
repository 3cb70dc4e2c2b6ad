//! Summary statistics over a pool's recorded series

use std::collections::BTreeMap;

use itertools::{Itertools, MinMaxResult};
use serde::Serialize;

use crate::pool::Pool;
use crate::value::{Value, ValueKind};

/// Mean, population variance, minimum and maximum of one key.
///
/// For vector series every field is a vector of the same length, computed
/// component-wise across the recorded values.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Statistics {
    pub mean: Value,
    pub var: Value,
    pub min: Value,
    pub max: Value,
}

/// A point-in-time summary of every aggregatable key in a pool.
///
/// Keys iterate in lexicographic order, which is also the order they are
/// serialized in.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregateSnapshot {
    entries: BTreeMap<String, Statistics>,
}

impl AggregateSnapshot {
    /// Summarise every key in `pool`.
    ///
    /// Keys with no values, mixed value kinds, or vectors of unequal length
    /// are left out.
    pub fn from_pool(pool: &Pool) -> Self {
        let mut entries = BTreeMap::new();
        for (key, series) in pool.iter() {
            if let Some(stats) = summarise(key, series) {
                entries.insert(key.to_owned(), stats);
            }
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&Statistics> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Statistics)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn summarise(key: &str, series: &[Value]) -> Option<Statistics> {
    let first = series.first()?;
    if !series.iter().map(Value::kind).all_equal() {
        tracing::warn!(key, "mixed value kinds, skipping aggregate");
        return None;
    }

    match first.kind() {
        ValueKind::Real => {
            let column: Vec<f32> = series.iter().filter_map(Value::as_real).collect();
            let (mean, var, min, max) = column_stats(&column);
            Some(Statistics {
                mean: Value::Real(mean),
                var: Value::Real(var),
                min: Value::Real(min),
                max: Value::Real(max),
            })
        }
        ValueKind::Vector => {
            if !series.iter().map(|v| v.as_slice().len()).all_equal() {
                tracing::warn!(key, "vector lengths differ, skipping aggregate");
                return None;
            }

            let width = first.as_slice().len();
            let mut stats = [
                Vec::with_capacity(width),
                Vec::with_capacity(width),
                Vec::with_capacity(width),
                Vec::with_capacity(width),
            ];
            let mut column = Vec::with_capacity(series.len());
            for i in 0..width {
                column.clear();
                column.extend(series.iter().map(|v| v.as_slice()[i]));
                let (mean, var, min, max) = column_stats(&column);
                for (out, x) in stats.iter_mut().zip([mean, var, min, max]) {
                    out.push(x);
                }
            }

            let [mean, var, min, max] = stats;
            Some(Statistics {
                mean: Value::Vector(mean),
                var: Value::Vector(var),
                min: Value::Vector(min),
                max: Value::Vector(max),
            })
        }
    }
}

/// Two-pass mean and population variance in f64, plus min and max.
/// `column` must not be empty.
fn column_stats(column: &[f32]) -> (f32, f32, f32, f32) {
    let n = column.len() as f64;
    let mean = column.iter().map(|&x| x as f64).sum::<f64>() / n;
    let var = column
        .iter()
        .map(|&x| {
            let d = x as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;

    let (min, max) = match column.iter().copied().minmax_by(f32::total_cmp) {
        MinMaxResult::NoElements => (0.0, 0.0),
        MinMaxResult::OneElement(x) => (x, x),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };

    (mean as f32, var as f32, min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_series() {
        let mut pool = Pool::new();
        for x in [1.0, 2.0, 3.0, 4.0] {
            pool.write("rms", Value::Real(x));
        }
        let snap = AggregateSnapshot::from_pool(&pool);
        let s = snap.get("rms").unwrap();
        assert_eq!(s.mean, Value::Real(2.5));
        assert_eq!(s.var, Value::Real(1.25));
        assert_eq!(s.min, Value::Real(1.0));
        assert_eq!(s.max, Value::Real(4.0));
    }

    #[test]
    fn vector_series_is_component_wise() {
        let mut pool = Pool::new();
        pool.write("bands", Value::Vector(vec![1.0, 10.0]));
        pool.write("bands", Value::Vector(vec![3.0, 10.0]));
        let snap = AggregateSnapshot::from_pool(&pool);
        let s = snap.get("bands").unwrap();
        assert_eq!(s.mean, Value::Vector(vec![2.0, 10.0]));
        assert_eq!(s.var, Value::Vector(vec![1.0, 0.0]));
        assert_eq!(s.min, Value::Vector(vec![1.0, 10.0]));
        assert_eq!(s.max, Value::Vector(vec![3.0, 10.0]));
    }

    #[test]
    fn unaggregatable_keys_are_skipped() {
        let mut pool = Pool::new();
        pool.write("empty", Value::Real(1.0));
        pool.clear();
        pool.write("mixed", Value::Real(1.0));
        pool.write("mixed", Value::Vector(vec![1.0]));
        pool.write("ragged", Value::Vector(vec![1.0]));
        pool.write("ragged", Value::Vector(vec![1.0, 2.0]));
        pool.write("ok", Value::Real(0.0));

        let snap = AggregateSnapshot::from_pool(&pool);
        assert_eq!(snap.keys().collect::<Vec<_>>(), ["ok"]);
    }
}
