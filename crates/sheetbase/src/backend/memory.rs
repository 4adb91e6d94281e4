//! In-process backend with the remote store's range semantics.

use async_trait::async_trait;
use parking_lot::Mutex;
use sheetbase_common::{Result, SheetbaseError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{RangeSpan, SheetsBackend, TableRange};

/// A remote operation as received by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    ListTables { store: String },
    Read { store: String, range: String },
    Clear { store: String, range: String },
    Append { store: String, range: String, rows: usize },
    Write { store: String, range: String, rows: usize },
}

#[derive(Debug, Default)]
struct Store {
    /// Tables in creation order
    tables: Vec<(String, Vec<Vec<String>>)>,
}

impl Store {
    fn table_mut(&mut self, name: &str) -> Option<&mut Vec<Vec<String>>> {
        self.tables
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, rows)| rows)
    }
}

/// Stores and tables held in memory.
///
/// Trailing empty cells and rows are trimmed after every write, as the
/// remote service omits them from reads. Every call is recorded and can be
/// inspected with [`MemoryBackend::calls`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    stores: Mutex<HashMap<String, Store>>,
    calls: Mutex<Vec<BackendCall>>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style table creation.
    pub fn with_table(self, store: &str, table: &str, rows: &[&[&str]]) -> Self {
        self.put_table(
            store,
            table,
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        );
        self
    }

    /// Create an empty store (no tables).
    pub fn with_store(self, store: &str) -> Self {
        self.stores.lock().entry(store.to_string()).or_default();
        self
    }

    /// Create or replace a table.
    pub fn put_table(&self, store: &str, table: &str, mut rows: Vec<Vec<String>>) {
        normalize(&mut rows);
        let mut stores = self.stores.lock();
        let store = stores.entry(store.to_string()).or_default();
        match store.table_mut(table) {
            Some(existing) => *existing = rows,
            None => store.tables.push((table.to_string(), rows)),
        }
    }

    /// Current contents of a table.
    pub fn rows(&self, store: &str, table: &str) -> Option<Vec<Vec<String>>> {
        let stores = self.stores.lock();
        stores
            .get(store)?
            .tables
            .iter()
            .find(|(n, _)| n == table)
            .map(|(_, rows)| rows.clone())
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Make subsequent appends and writes fail with a remote error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().push(call);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SheetbaseError::Remote {
                status: Some(503),
                message: "The service is currently unavailable.".to_string(),
            });
        }
        Ok(())
    }

    fn with_table_mut<T>(
        &self,
        store_id: &str,
        range: &TableRange,
        f: impl FnOnce(&mut Vec<Vec<String>>) -> T,
    ) -> Result<T> {
        let mut stores = self.stores.lock();
        let store = stores.get_mut(store_id).ok_or_else(|| store_not_found(store_id))?;
        let rows = store
            .table_mut(&range.table)
            .ok_or_else(|| unknown_range(range))?;
        let out = f(rows);
        normalize(rows);
        Ok(out)
    }
}

#[async_trait]
impl SheetsBackend for MemoryBackend {
    async fn list_tables(&self, store_id: &str) -> Result<Vec<String>> {
        self.record(BackendCall::ListTables {
            store: store_id.to_string(),
        });
        let stores = self.stores.lock();
        let store = stores.get(store_id).ok_or_else(|| store_not_found(store_id))?;
        Ok(store.tables.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn read_range(&self, store_id: &str, range: &TableRange) -> Result<Vec<Vec<String>>> {
        self.record(BackendCall::Read {
            store: store_id.to_string(),
            range: range.to_a1(),
        });
        self.with_table_mut(store_id, range, |rows| match range.span {
            RangeSpan::Whole => rows.clone(),
            RangeSpan::Anchor => rows
                .first()
                .and_then(|row| row.first())
                .map(|cell| vec![vec![cell.clone()]])
                .unwrap_or_default(),
            RangeSpan::Rows { first_row, columns } => rows
                .iter()
                .skip(first_row - 1)
                .map(|row| row.iter().take(columns).cloned().collect())
                .collect(),
        })
        .map(|mut rows| {
            normalize(&mut rows);
            rows
        })
    }

    async fn clear_range(&self, store_id: &str, range: &TableRange) -> Result<()> {
        self.record(BackendCall::Clear {
            store: store_id.to_string(),
            range: range.to_a1(),
        });
        self.with_table_mut(store_id, range, |rows| match range.span {
            RangeSpan::Whole => rows.clear(),
            RangeSpan::Anchor => {
                if let Some(cell) = rows.first_mut().and_then(|row| row.first_mut()) {
                    cell.clear();
                }
            }
            RangeSpan::Rows { first_row, columns } => {
                for row in rows.iter_mut().skip(first_row - 1) {
                    for cell in row.iter_mut().take(columns) {
                        cell.clear();
                    }
                }
            }
        })
    }

    async fn append_rows(
        &self,
        store_id: &str,
        range: &TableRange,
        new_rows: &[Vec<String>],
    ) -> Result<()> {
        self.record(BackendCall::Append {
            store: store_id.to_string(),
            range: range.to_a1(),
            rows: new_rows.len(),
        });
        self.check_writable()?;
        // Rows are already normalized, so the last row holds data.
        self.with_table_mut(store_id, range, |rows| rows.extend(new_rows.iter().cloned()))
    }

    async fn write_range(
        &self,
        store_id: &str,
        range: &TableRange,
        new_rows: &[Vec<String>],
    ) -> Result<()> {
        self.record(BackendCall::Write {
            store: store_id.to_string(),
            range: range.to_a1(),
            rows: new_rows.len(),
        });
        self.check_writable()?;
        let first_row = match range.span {
            RangeSpan::Rows { first_row, .. } => first_row,
            RangeSpan::Whole | RangeSpan::Anchor => 1,
        };
        self.with_table_mut(store_id, range, |rows| {
            for (offset, new_row) in new_rows.iter().enumerate() {
                let index = first_row - 1 + offset;
                if rows.len() <= index {
                    rows.resize(index + 1, Vec::new());
                }
                let row = &mut rows[index];
                if row.len() < new_row.len() {
                    row.resize(new_row.len(), String::new());
                }
                for (col, cell) in new_row.iter().enumerate() {
                    row[col] = cell.clone();
                }
            }
        })
    }
}

/// Trim trailing empty cells from each row and trailing empty rows.
fn normalize(rows: &mut Vec<Vec<String>>) {
    for row in rows.iter_mut() {
        while row.last().is_some_and(|c| c.is_empty()) {
            row.pop();
        }
    }
    while rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }
}

fn store_not_found(store_id: &str) -> SheetbaseError {
    SheetbaseError::Remote {
        status: Some(404),
        message: format!("Requested entity was not found: {}", store_id),
    }
}

fn unknown_range(range: &TableRange) -> SheetbaseError {
    SheetbaseError::Remote {
        status: Some(400),
        message: format!("Unable to parse range: {}", range.to_a1()),
    }
}
