//! Scripted backend for testing collectors without a PostgreSQL server.
//!
//! Each logical query is given a sequence of responses; the last response
//! is sticky, so a single entry behaves like a fixed server state while a
//! sequence models state changing between cycles. Queries with no script
//! return an empty result set.

use std::collections::HashMap;

use super::QueryName;
use super::backend::{Backend, TextRow};

type Response = Result<Vec<TextRow>, String>;

/// In-memory [`Backend`] with per-query scripted responses and counters.
#[derive(Default)]
pub struct MockBackend {
    responses: HashMap<QueryName, Vec<Response>>,
    cursors: HashMap<QueryName, usize>,
    fetch_counts: HashMap<QueryName, usize>,
    connect_error: Option<String>,
    connect_count: usize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a successful response for `query`.
    pub fn respond(&mut self, query: QueryName, rows: Vec<TextRow>) {
        self.responses.entry(query).or_default().push(Ok(rows));
    }

    /// Appends a failing response for `query`.
    pub fn respond_err(&mut self, query: QueryName, message: &str) {
        self.responses
            .entry(query)
            .or_default()
            .push(Err(message.to_string()));
    }

    /// Drops the script for `query` so a replacement sequence can be
    /// installed on top of a shared fixture.
    pub fn clear(&mut self, query: QueryName) {
        self.responses.remove(&query);
        self.cursors.remove(&query);
    }

    /// Makes every connection attempt fail with `message`.
    pub fn fail_connect(&mut self, message: &str) {
        self.connect_error = Some(message.to_string());
    }

    /// How many times `query` was executed.
    pub fn fetch_count(&self, query: QueryName) -> usize {
        self.fetch_counts.get(&query).copied().unwrap_or(0)
    }

    pub fn connect_count(&self) -> usize {
        self.connect_count
    }
}

impl Backend for MockBackend {
    fn ensure_connected(&mut self) -> Result<(), String> {
        if let Some(message) = &self.connect_error {
            return Err(message.clone());
        }
        self.connect_count += 1;
        Ok(())
    }

    fn fetch(&mut self, query: QueryName, _sql: &str) -> Result<Vec<TextRow>, String> {
        *self.fetch_counts.entry(query).or_insert(0) += 1;

        let Some(script) = self.responses.get(&query) else {
            return Ok(Vec::new());
        };
        if script.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.cursors.entry(query).or_insert(0);
        let idx = (*cursor).min(script.len() - 1);
        *cursor += 1;
        script[idx].clone()
    }

    fn disconnect(&mut self) {}
}

/// Builds rows from `(column, value)` pairs. Values are never NULL; build
/// a [`TextRow`] directly when a NULL is needed.
pub fn rows(table: &[&[(&str, &str)]]) -> Vec<TextRow> {
    table.iter()
        .map(|row| {
            TextRow::new(
                row.iter().map(|(c, _)| c.to_string()).collect(),
                row.iter().map(|(_, v)| Some(v.to_string())).collect(),
            )
        })
        .collect()
}

/// Builds a one-row, one-column result.
pub fn scalar(value: &str) -> Vec<TextRow> {
    rows(&[&[("value", value)]])
}
