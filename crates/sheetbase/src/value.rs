//! Cell values and per-column type declarations.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::snapshot::canonicalize;

/// Date formats accepted when parsing `ValueKind::Date` cells, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Declared kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Text,
    Number,
    Boolean,
    Date,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Date => "date",
        }
    }
}

/// A single cell.
///
/// Everything arrives from the store as text; typed variants only appear for
/// columns declared in a [`Schema`] or for values built by the caller.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl CellValue {
    /// Parse a trimmed raw cell as `kind`. Empty input is always `Empty`.
    pub fn parse(raw: &str, kind: ValueKind) -> std::result::Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(CellValue::Empty);
        }
        match kind {
            ValueKind::Text => Ok(CellValue::Text(raw.to_string())),
            ValueKind::Number => raw
                .replace(',', "")
                .parse::<f64>()
                .map(CellValue::Number)
                .map_err(|_| format!("'{}' is not a number", raw)),
            ValueKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" => Ok(CellValue::Bool(true)),
                "false" => Ok(CellValue::Bool(false)),
                _ => Err(format!("'{}' is not a boolean", raw)),
            },
            ValueKind::Date => DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .map(CellValue::Date)
                .ok_or_else(|| format!("'{}' is not a date", raw)),
        }
    }

    /// Kind of a non-empty value.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(_) => Some(ValueKind::Text),
            CellValue::Number(_) => Some(ValueKind::Number),
            CellValue::Bool(_) => Some(ValueKind::Boolean),
            CellValue::Date(_) => Some(ValueKind::Date),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text content; `Empty` reads as the empty string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Empty => Some(""),
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String written back to the store.
    pub fn to_cell_string(&self) -> String {
        self.to_string()
    }

    /// Equality used by `=` and `!=`.
    ///
    /// Same variants compare structurally; anything else compares string forms,
    /// so `Text("10")` never equals `Text("10.0")`.
    pub fn loose_eq(&self, other: &CellValue) -> bool {
        match (self, other) {
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            (CellValue::Number(a), CellValue::Number(b)) => a == b,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Date(a), CellValue::Date(b)) => a == b,
            (CellValue::Empty, CellValue::Empty) => true,
            _ => self.to_string() == other.to_string(),
        }
    }

    /// Total order used by comparison operators and sorting.
    ///
    /// `Empty` first, natural order within a variant, string forms across variants.
    pub fn compare(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Empty, CellValue::Empty) => Ordering::Equal,
            (CellValue::Empty, _) => Ordering::Less,
            (_, CellValue::Empty) => Ordering::Greater,
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Date(a), CellValue::Date(b)) => a.cmp(b),
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// Column kind declarations resolved when a table is materialized.
///
/// Column names are canonicalized on insertion, so either the header text or
/// the canonical token may be used. Undeclared columns are text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: BTreeMap<String, ValueKind>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `column` as `kind`.
    pub fn column(mut self, column: &str, kind: ValueKind) -> Self {
        self.columns.insert(canonicalize(column), kind);
        self
    }

    /// Declared kind, if any.
    pub fn declared(&self, column: &str) -> Option<ValueKind> {
        self.columns.get(column).copied()
    }

    /// Effective kind: the declared kind or `Text`.
    pub fn kind_of(&self, column: &str) -> ValueKind {
        self.declared(column).unwrap_or(ValueKind::Text)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, ValueKind)> {
        self.columns.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
