//! Row materialization: raw cell grids to typed records.

use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use tracing::debug;

use crate::value::{CellValue, Schema};
use sheetbase_common::{Result, SheetbaseError};

/// Canonical column token for a header cell.
///
/// Every character outside `[A-Za-z0-9]` becomes a space, the result is
/// trimmed, whitespace runs collapse to one `_`, and everything is
/// lower-cased. `canonicalize(canonicalize(h)) == canonicalize(h)`.
pub fn canonicalize(raw: &str) -> String {
    static NON_ALNUM_RE: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let non_alnum = NON_ALNUM_RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9]").expect("valid regex"));
    let whitespace = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));

    let spaced = non_alnum.replace_all(raw, " ");
    whitespace
        .replace_all(spaced.trim(), "_")
        .to_lowercase()
}

/// One data row: canonical column token to cell value, plus the synthetic id.
///
/// The id is the 1-based position of the row among the data rows of the
/// snapshot it was read from. Records built by callers have no id until
/// they are inserted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowRecord {
    id: Option<usize>,
    values: BTreeMap<String, CellValue>,
}

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_id(id: usize, values: BTreeMap<String, CellValue>) -> Self {
        Self {
            id: Some(id),
            values,
        }
    }

    /// Builder-style field assignment.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn id(&self) -> Option<usize> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.id = Some(id);
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column)
    }

    /// Text of a cell; missing and non-text cells read as `None`.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.values.get(column).and_then(CellValue::as_text)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for RowRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            id: None,
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Full in-memory copy of one table at fetch time.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSnapshot {
    name: String,
    raw_header: Vec<String>,
    header: Vec<String>,
    schema: Schema,
    pub(crate) rows: Vec<RowRecord>,
}

impl TableSnapshot {
    /// Build a snapshot from the raw grid returned by the store.
    ///
    /// The first row is the header. Data cells are trimmed; missing trailing
    /// cells become `Empty` and cells past the header width are dropped.
    pub fn materialize(name: &str, mut grid: Vec<Vec<String>>, schema: &Schema) -> Result<Self> {
        if grid.is_empty() {
            return Err(SheetbaseError::EmptyTable(name.to_string()));
        }
        let raw_header: Vec<String> = grid.remove(0).into_iter().map(|c| c.trim().to_string()).collect();
        if raw_header.is_empty() {
            return Err(SheetbaseError::EmptyTable(name.to_string()));
        }

        let header = canonical_header(&raw_header)?;
        for (column, _) in schema.columns() {
            if !header.iter().any(|h| h == column) {
                return Err(SheetbaseError::Validation(format!(
                    "schema column '{}' is not in the header of table '{}'",
                    column, name
                )));
            }
        }

        let mut rows = Vec::with_capacity(grid.len());
        for (index, raw_row) in grid.into_iter().enumerate() {
            let id = index + 1;
            let mut values = BTreeMap::new();
            for (position, column) in header.iter().enumerate() {
                let raw = raw_row.get(position).map(|c| c.trim()).unwrap_or("");
                let value = CellValue::parse(raw, schema.kind_of(column)).map_err(|reason| {
                    SheetbaseError::Validation(format!(
                        "table '{}', row {}, column '{}': {}",
                        name, id, column, reason
                    ))
                })?;
                values.insert(column.clone(), value);
            }
            rows.push(RowRecord::with_id(id, values));
        }

        debug!(table = %name, columns = header.len(), rows = rows.len(), "Materialized table");
        Ok(Self {
            name: name.to_string(),
            raw_header,
            header,
            schema: schema.clone(),
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical column tokens in sheet order.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Header cells as they appear in the sheet.
    pub fn raw_header(&self) -> &[String] {
        &self.raw_header
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[RowRecord] {
        &self.rows
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.header.iter().any(|h| h == column)
    }

    pub(crate) fn require_column(&self, column: &str) -> Result<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(SheetbaseError::Validation(format!(
                "unknown column '{}' in table '{}' (columns: {})",
                column,
                self.name,
                self.header.join(", ")
            )))
        }
    }

    /// Restrict a record to the header: unknown fields dropped, missing ones `Empty`.
    pub(crate) fn conform(&self, record: &RowRecord) -> BTreeMap<String, CellValue> {
        self.header
            .iter()
            .map(|column| {
                let value = record.get(column).cloned().unwrap_or_default();
                (column.clone(), value)
            })
            .collect()
    }

    /// Cell strings of a record in header order.
    pub(crate) fn to_cells(&self, record: &RowRecord) -> Vec<String> {
        self.header
            .iter()
            .map(|column| {
                record
                    .get(column)
                    .map(CellValue::to_cell_string)
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Header row followed by every data row, as written back to the store.
    pub(crate) fn to_grid(&self) -> Vec<Vec<String>> {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(self.raw_header.clone());
        grid.extend(self.rows.iter().map(|row| self.to_cells(row)));
        grid
    }

    /// Reassign positional ids as a fresh fetch would.
    pub(crate) fn renumber(&mut self) {
        for (index, row) in self.rows.iter_mut().enumerate() {
            row.set_id(index + 1);
        }
    }
}

fn canonical_header(raw_header: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut header = Vec::with_capacity(raw_header.len());
    for (position, cell) in raw_header.iter().enumerate() {
        let mut token = canonicalize(cell);
        if token.is_empty() {
            token = format!("column_{}", position + 1);
        }
        if !seen.insert(token.clone()) {
            return Err(SheetbaseError::Validation(format!(
                "header cell '{}' duplicates column '{}'",
                cell, token
            )));
        }
        header.push(token);
    }
    Ok(header)
}
