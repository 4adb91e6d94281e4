//! Remote store boundary.
//!
//! [`SheetsBackend`] is the set of remote operations the engine needs.
//! [`SheetsApi`] talks to Google Sheets; [`MemoryBackend`] keeps everything
//! in process with the same range semantics.

pub mod api;
pub mod memory;

use async_trait::async_trait;
use sheetbase_common::Result;
use std::fmt;

pub use api::{SheetsApi, ValueInputOption};
pub use memory::{BackendCall, MemoryBackend};

/// Remote operations over a store's tables.
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    /// Table names in store order.
    async fn list_tables(&self, store_id: &str) -> Result<Vec<String>>;

    /// Every row with data in `range`; cells as strings, trailing blanks trimmed.
    async fn read_range(&self, store_id: &str, range: &TableRange) -> Result<Vec<Vec<String>>>;

    async fn clear_range(&self, store_id: &str, range: &TableRange) -> Result<()>;

    /// Append rows after the last row holding data.
    async fn append_rows(&self, store_id: &str, range: &TableRange, rows: &[Vec<String>])
        -> Result<()>;

    /// Overwrite cells starting at the range's top-left corner.
    async fn write_range(&self, store_id: &str, range: &TableRange, rows: &[Vec<String>])
        -> Result<()>;
}

/// Shape of a range within one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpan {
    /// The whole table
    Whole,
    /// The top-left cell, used as an anchor for writes and appends
    Anchor,
    /// Rows `first_row..` over the first `columns` columns (1-based rows)
    Rows { first_row: usize, columns: usize },
}

/// A range of cells in a named table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRange {
    pub table: String,
    pub span: RangeSpan,
}

impl TableRange {
    pub fn whole(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            span: RangeSpan::Whole,
        }
    }

    pub fn anchor(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            span: RangeSpan::Anchor,
        }
    }

    /// Data rows only: row 2 onward across `columns` header columns.
    pub fn data_rows(table: impl Into<String>, columns: usize) -> Self {
        Self {
            table: table.into(),
            span: RangeSpan::Rows {
                first_row: 2,
                columns: columns.max(1),
            },
        }
    }

    /// A1 notation, e.g. `'My Table'!A2:C`.
    pub fn to_a1(&self) -> String {
        let sheet = format!("'{}'", self.table.replace('\'', "''"));
        match self.span {
            RangeSpan::Whole => sheet,
            RangeSpan::Anchor => format!("{}!A1", sheet),
            RangeSpan::Rows { first_row, columns } => {
                format!("{}!A{}:{}", sheet, first_row, column_letter(columns))
            }
        }
    }
}

impl fmt::Display for TableRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// Spreadsheet column letters for a 1-based index (1 → A, 27 → AA).
pub fn column_letter(index: usize) -> String {
    let mut n = index.max(1);
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}
