//! Metrics snapshot and row-folding policies.
//!
//! Every query result folds into the cycle's [`Metrics`] through one of a
//! small set of row-shape policies:
//!
//! - scalar: first row, first column, one metric;
//! - column map: a single (or aggregate) row whose column names are the
//!   metric keys ([`fold_columns`]);
//! - keyed expansion: dimension-key columns are concatenated with a fixed
//!   prefix and the value-column name ([`fold_keyed`]), merged with either
//!   [`Merge::Overwrite`] or [`Merge::Accumulate`].
//!
//! Metric values parse leniently: integer first, then float truncated
//! toward zero, else 0. Malformed numeric text is never an error.

use std::collections::BTreeMap;

use serde::Serialize;

use super::backend::TextRow;

/// One cycle's snapshot: metric name to integer value.
///
/// Rebuilt empty at the start of every cycle; ordered so snapshots with
/// identical content serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Metrics(BTreeMap<String, i64>);

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, overwriting any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: i64) {
        self.0.insert(key.into(), value);
    }

    /// Adds `value` to `key`, starting from 0 if absent.
    pub fn add(&mut self, key: impl Into<String>, value: i64) {
        *self.0.entry(key.into()).or_insert(0) += value;
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.0.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Merge policy for keyed expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// `mx[key] = value` — the default for keyed metrics.
    Overwrite,
    /// `mx[key] += value` — replication delta/lag only, where one standby
    /// application can contribute a row per WAL sender.
    Accumulate,
}

impl Merge {
    fn apply(self, mx: &mut Metrics, key: String, value: i64) {
        match self {
            Merge::Overwrite => mx.set(key, value),
            Merge::Accumulate => mx.add(key, value),
        }
    }
}

/// Parses metric text into an integer, degrading silently.
///
/// Integer first; otherwise float truncated toward zero; otherwise 0.
pub(crate) fn parse_metric_value(s: &str) -> i64 {
    let s = s.trim();
    if let Ok(v) = s.parse::<i64>() {
        return v;
    }
    s.parse::<f64>().map(|v| v as i64).unwrap_or(0)
}

/// Integer percentage of `value` against `total`; 0 when `total` is 0.
pub(crate) fn calc_percentage(value: i64, total: i64) -> i64 {
    if total == 0 {
        return 0;
    }
    value * 100 / total
}

/// Folds rows whose column names are the metric keys.
pub(crate) fn fold_columns(rows: &[TextRow], mx: &mut Metrics) {
    for row in rows {
        for (idx, column) in row.columns().iter().enumerate() {
            mx.set(column.clone(), parse_metric_value(row.get(idx).unwrap_or("")));
        }
    }
}

/// Folds keyed-expansion rows.
///
/// For every row, the values of `key_columns` are joined after `prefix`;
/// every remaining column folds as `prefix<keys>_<column>` under `merge`.
/// A NULL dimension key contributes an empty segment rather than skipping
/// the row.
pub(crate) fn fold_keyed(
    rows: &[TextRow],
    key_columns: &[&str],
    prefix: &str,
    merge: Merge,
    mx: &mut Metrics,
) {
    for row in rows {
        let mut key_prefix = String::from(prefix);
        for key_column in key_columns {
            key_prefix.push_str(row.by_name(key_column).unwrap_or(""));
            key_prefix.push('_');
        }
        for (idx, column) in row.columns().iter().enumerate() {
            if key_columns.contains(&column.as_str()) {
                continue;
            }
            let value = parse_metric_value(row.get(idx).unwrap_or(""));
            merge.apply(mx, format!("{key_prefix}{column}"), value);
        }
    }
}
