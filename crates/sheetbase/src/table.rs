//! Query and write-back engine for one fetched table.
//!
//! A [`Table`] holds the snapshot's rows (the base set) and a current view,
//! initially every row. Query operations narrow or reorder the view;
//! mutations change the base set and are written back to the store with a
//! clear-and-rewrite.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, instrument};

use crate::backend::TableRange;
use crate::client::SheetsClient;
use crate::query::{Operator, OrderDirection, Predicate};
use crate::snapshot::{canonicalize, RowRecord, TableSnapshot};
use crate::value::{CellValue, Schema, ValueKind};
use sheetbase_common::{Result, SheetbaseError};

/// Outcome of a remote write-back.
pub type WriteResult = std::result::Result<Table, WriteError>;

/// A failed write-back.
///
/// Carries the table as it was when the write failed so the caller can
/// retry. After a failed `save` or `upsert` the remote range may already be
/// cleared and this table holds the only copy of the rows.
#[derive(Debug, thiserror::Error)]
#[error("write-back to table '{}' failed: {error}", .table.name())]
pub struct WriteError {
    pub table: Box<Table>,
    #[source]
    pub error: SheetbaseError,
}

impl WriteError {
    pub fn into_table(self) -> Table {
        *self.table
    }
}

impl From<WriteError> for SheetbaseError {
    fn from(err: WriteError) -> Self {
        err.error
    }
}

/// A fetched table plus its current view.
///
/// Operations consume the table and return it, so calls chain:
///
/// ```rust,ignore
/// let ann = client.table("People").await?.filter("first_name", "=", "Ann")?;
/// ```
#[derive(Debug, Clone)]
pub struct Table {
    client: SheetsClient,
    snapshot: TableSnapshot,
    view: Vec<RowRecord>,
    /// Base set edited locally and not yet written back
    dirty: bool,
    next_id: usize,
}

impl Table {
    pub(crate) fn new(client: SheetsClient, snapshot: TableSnapshot) -> Self {
        let view = snapshot.rows().to_vec();
        let next_id = snapshot.rows().len() + 1;
        Self {
            client,
            snapshot,
            view,
            dirty: false,
            next_id,
        }
    }

    pub fn name(&self) -> &str {
        self.snapshot.name()
    }

    /// Canonical column tokens in sheet order.
    pub fn header(&self) -> &[String] {
        self.snapshot.header()
    }

    pub fn schema(&self) -> &Schema {
        self.snapshot.schema()
    }

    /// Store this table was read from and writes back to.
    pub fn store_id(&self) -> &str {
        self.client.store_id()
    }

    pub fn snapshot(&self) -> &TableSnapshot {
        &self.snapshot
    }

    /// Keep the view rows where `column <operator> value` holds.
    ///
    /// Successive calls narrow the view further. Text values aimed at a
    /// column declared in the schema are parsed as that column's kind.
    pub fn where_clause(
        mut self,
        column: &str,
        operator: Operator,
        value: impl Into<CellValue>,
    ) -> Result<Self> {
        let column = canonicalize(column);
        self.snapshot.require_column(&column)?;
        let value = self.coerce(&column, operator, value.into())?;
        let predicate = Predicate::new(column, operator, value);

        let mut kept = Vec::with_capacity(self.view.len());
        for row in std::mem::take(&mut self.view) {
            if predicate.evaluate(&row)? {
                kept.push(row);
            }
        }
        self.view = kept;
        Ok(self)
    }

    /// [`where_clause`](Self::where_clause) with the operator given as text
    /// (`=`, `!=`, `>`, `>=`, `<`, `<=`, `like`, `not like`).
    pub fn filter(self, column: &str, operator: &str, value: impl Into<CellValue>) -> Result<Self> {
        let operator: Operator = operator.parse()?;
        self.where_clause(column, operator, value)
    }

    /// Stable sort of the view by one column; `Desc` reverses the ascending order.
    pub fn order_by(mut self, column: &str, direction: OrderDirection) -> Result<Self> {
        let column = canonicalize(column);
        self.snapshot.require_column(&column)?;

        let empty = CellValue::Empty;
        self.view.sort_by(|a, b| {
            let left = a.get(&column).unwrap_or(&empty);
            let right = b.get(&column).unwrap_or(&empty);
            left.compare(right)
        });
        if direction == OrderDirection::Desc {
            self.view.reverse();
        }
        Ok(self)
    }

    /// Stable sort of the view with a caller-supplied comparator.
    pub fn sort_with<F>(mut self, compare: F) -> Self
    where
        F: FnMut(&RowRecord, &RowRecord) -> Ordering,
    {
        self.view.sort_by(compare);
        self
    }

    /// Restore every base row to the view, in base order.
    pub fn reset(mut self) -> Self {
        self.view = self.snapshot.rows().to_vec();
        self
    }

    /// Rows of the current view.
    pub fn all(&self) -> &[RowRecord] {
        &self.view
    }

    /// Owned copy of the current view.
    pub fn get(&self) -> Vec<RowRecord> {
        self.view.clone()
    }

    /// Copy of the first view row; the view is unchanged.
    pub fn first(&self) -> Option<RowRecord> {
        self.view.first().cloned()
    }

    /// Remove and return the first view row.
    pub fn take_first(&mut self) -> Option<RowRecord> {
        if self.view.is_empty() {
            None
        } else {
            Some(self.view.remove(0))
        }
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    /// View row with the given id.
    pub fn find(&self, id: usize) -> Option<&RowRecord> {
        self.view.iter().find(|row| row.id() == Some(id))
    }

    /// In-place access to view rows; edits reach the store on [`save`](Self::save).
    pub fn rows_mut(&mut self) -> &mut [RowRecord] {
        self.dirty = true;
        &mut self.view
    }

    /// Merge `fields` into the row with `id`, locally.
    ///
    /// Field names are canonicalized and must name header columns; text
    /// values for declared columns are parsed as the declared kind.
    pub fn update(mut self, id: usize, fields: RowRecord) -> Result<Self> {
        let fields = self.typed_fields(&fields, true)?;

        let mut found = false;
        let targets = self
            .view
            .iter_mut()
            .chain(self.snapshot.rows.iter_mut())
            .filter(|row| row.id() == Some(id));
        for row in targets {
            for (column, value) in &fields {
                row.set(column.as_str(), value.clone());
            }
            found = true;
        }

        if !found {
            return Err(SheetbaseError::RowNotFound(id));
        }
        self.dirty = true;
        Ok(self)
    }

    /// Remove the row with `id` from the view and base set, locally.
    pub fn delete(mut self, id: usize) -> Result<Self> {
        let before = self.view.len() + self.snapshot.rows.len();
        self.view.retain(|row| row.id() != Some(id));
        self.snapshot.rows.retain(|row| row.id() != Some(id));
        if self.view.len() + self.snapshot.rows.len() == before {
            return Err(SheetbaseError::RowNotFound(id));
        }
        self.dirty = true;
        Ok(self)
    }

    /// Whether local edits are waiting for [`save`](Self::save).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Append one row to the remote table.
    ///
    /// Fields outside the header are dropped and missing ones written empty.
    /// On success the row joins the base set and the view with a fresh id.
    #[instrument(skip(self, record), fields(table = %self.snapshot.name(), store = %self.client.store_id()))]
    pub async fn insert(mut self, record: RowRecord) -> WriteResult {
        let outcome = self.append_record(&record).await;
        self.settle(outcome)
    }

    /// Update the first row whose `key` matches the record's, or append.
    ///
    /// The remote data rows are then cleared and the whole base set is
    /// appended below the header. Repeating the same upsert leaves the
    /// store unchanged.
    #[instrument(skip(self, record), fields(table = %self.snapshot.name(), store = %self.client.store_id()))]
    pub async fn upsert(mut self, record: RowRecord, key: &str) -> WriteResult {
        let outcome = self.merge_and_rewrite(&record, key).await;
        self.settle(outcome)
    }

    /// Write the whole table back: header plus every base row.
    ///
    /// View rows are reconciled into the base set by id first. The remote
    /// table is cleared and rewritten from its first cell. Nothing is sent
    /// when the view is empty and the base set has no local edits.
    #[instrument(skip(self), fields(table = %self.snapshot.name(), store = %self.client.store_id()))]
    pub async fn save(mut self) -> WriteResult {
        if self.view.is_empty() && !self.dirty {
            info!("Nothing to save");
            return Ok(self);
        }
        let outcome = self.rewrite_all().await;
        self.settle(outcome)
    }

    fn settle(self, outcome: Result<()>) -> WriteResult {
        match outcome {
            Ok(()) => Ok(self),
            Err(error) => Err(WriteError {
                table: Box::new(self),
                error,
            }),
        }
    }

    async fn append_record(&mut self, record: &RowRecord) -> Result<()> {
        let typed = RowRecord::from_iter(self.typed_fields(record, false)?);
        let values = self.snapshot.conform(&typed);
        let cells = self.snapshot.to_cells(&typed);

        let client = self.client.clone();
        let _gate = client.write_gate().lock().await;
        info!("Inserting row");
        client
            .backend()
            .append_rows(
                client.store_id(),
                &TableRange::whole(self.snapshot.name()),
                &[cells],
            )
            .await?;

        let row = RowRecord::with_id(self.next_id, values);
        self.next_id += 1;
        self.snapshot.rows.push(row.clone());
        self.view.push(row);
        Ok(())
    }

    async fn merge_and_rewrite(&mut self, record: &RowRecord, key: &str) -> Result<()> {
        let key = canonicalize(key);
        self.snapshot.require_column(&key)?;
        let fields = self.typed_fields(record, false)?;
        let key_value = fields.get(&key).cloned().ok_or_else(|| {
            SheetbaseError::Validation(format!("upsert record has no value for key '{}'", key))
        })?;

        let existing = self.snapshot.rows.iter().position(|row| {
            row.get(&key).is_some_and(|cell| cell.loose_eq(&key_value))
        });
        match existing {
            Some(index) => {
                let row = &mut self.snapshot.rows[index];
                for (column, value) in &fields {
                    row.set(column.as_str(), value.clone());
                }
                let merged = row.clone();
                if let Some(view_row) = self.view.iter_mut().find(|r| r.id() == merged.id()) {
                    *view_row = merged;
                }
                info!(id = ?self.snapshot.rows[index].id(), "Updating row");
            }
            None => {
                let values = self.snapshot.conform(&RowRecord::from_iter(fields));
                let row = RowRecord::with_id(self.next_id, values);
                self.next_id += 1;
                self.snapshot.rows.push(row.clone());
                self.view.push(row);
                info!("Appending row");
            }
        }
        self.dirty = true;

        let rows: Vec<Vec<String>> = self
            .snapshot
            .rows()
            .iter()
            .map(|row| self.snapshot.to_cells(row))
            .collect();

        let client = self.client.clone();
        let _gate = client.write_gate().lock().await;
        let backend = client.backend();
        let name = self.snapshot.name().to_string();
        backend
            .clear_range(
                client.store_id(),
                &TableRange::data_rows(&name, self.snapshot.header().len()),
            )
            .await?;
        backend
            .append_rows(client.store_id(), &TableRange::whole(&name), &rows)
            .await?;

        self.renumber_after_write();
        Ok(())
    }

    async fn rewrite_all(&mut self) -> Result<()> {
        let positions: HashMap<usize, usize> = self
            .snapshot
            .rows()
            .iter()
            .enumerate()
            .filter_map(|(index, row)| row.id().map(|id| (id, index)))
            .collect();
        let mut reconciled = Vec::new();
        for row in &self.view {
            let Some(id) = row.id() else {
                continue;
            };
            let Some(&index) = positions.get(&id) else {
                continue;
            };
            let typed = RowRecord::from_iter(self.typed_fields(row, false)?);
            reconciled.push((index, RowRecord::with_id(id, self.snapshot.conform(&typed))));
        }
        for (index, row) in reconciled {
            self.snapshot.rows[index] = row;
        }
        self.dirty = true;

        let grid = self.snapshot.to_grid();
        let client = self.client.clone();
        let _gate = client.write_gate().lock().await;
        let backend = client.backend();
        let name = self.snapshot.name().to_string();
        info!(rows = grid.len() - 1, "Saving table");
        backend
            .clear_range(client.store_id(), &TableRange::whole(&name))
            .await?;
        backend
            .write_range(client.store_id(), &TableRange::anchor(&name), &grid)
            .await?;

        self.snapshot.renumber();
        self.view = self.snapshot.rows().to_vec();
        self.dirty = false;
        self.next_id = self.snapshot.rows().len() + 1;
        Ok(())
    }

    /// Positional ids after the base set was written; view rows follow their base rows.
    fn renumber_after_write(&mut self) {
        let renumbered: HashMap<usize, usize> = self
            .snapshot
            .rows()
            .iter()
            .enumerate()
            .filter_map(|(index, row)| row.id().map(|id| (id, index + 1)))
            .collect();
        self.snapshot.renumber();
        for row in &mut self.view {
            if let Some(new_id) = row.id().and_then(|id| renumbered.get(&id)) {
                row.set_id(*new_id);
            }
        }
        self.dirty = false;
        self.next_id = self.snapshot.rows().len() + 1;
    }

    /// Header fields of `record` under canonical names, typed per the schema.
    ///
    /// Unknown columns fail with `Validation` when `strict`, else are dropped.
    fn typed_fields(
        &self,
        record: &RowRecord,
        strict: bool,
    ) -> Result<BTreeMap<String, CellValue>> {
        let mut fields = BTreeMap::new();
        for (name, value) in record.fields() {
            let column = canonicalize(name);
            if !self.snapshot.has_column(&column) {
                if strict {
                    self.snapshot.require_column(&column)?;
                }
                continue;
            }
            let value = self.to_declared_kind(&column, value.clone())?;
            fields.insert(column, value);
        }
        Ok(fields)
    }

    fn coerce(&self, column: &str, operator: Operator, value: CellValue) -> Result<CellValue> {
        if operator.is_text_match() {
            return Ok(value);
        }
        self.to_declared_kind(column, value)
    }

    fn to_declared_kind(&self, column: &str, value: CellValue) -> Result<CellValue> {
        let kind = match self.snapshot.schema().declared(column) {
            Some(kind) if kind != ValueKind::Text => kind,
            _ => return Ok(value),
        };
        match value {
            CellValue::Text(raw) => CellValue::parse(&raw, kind).map_err(|reason| {
                SheetbaseError::Validation(format!("column '{}': {}", column, reason))
            }),
            other => Ok(other),
        }
    }
}
