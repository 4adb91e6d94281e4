//! Filter predicates and sort directions.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::snapshot::RowRecord;
use crate::value::CellValue;
use sheetbase_common::{Result, SheetbaseError};

/// Query comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal (=)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
    /// Case-sensitive substring containment
    Like,
    /// Negated `Like`
    NotLike,
}

impl Operator {
    /// Returns the operator's textual form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "like",
            Operator::NotLike => "not like",
        }
    }

    /// Whether the operator needs text operands.
    pub fn is_text_match(&self) -> bool {
        matches!(self, Operator::Like | Operator::NotLike)
    }

    /// Evaluate `cell <op> value`.
    pub fn matches(&self, cell: &CellValue, value: &CellValue) -> Result<bool> {
        let matched = match self {
            Operator::Eq => cell.loose_eq(value),
            Operator::Ne => !cell.loose_eq(value),
            Operator::Gt => cell.compare(value) == Ordering::Greater,
            Operator::Gte => cell.compare(value) != Ordering::Less,
            Operator::Lt => cell.compare(value) == Ordering::Less,
            Operator::Lte => cell.compare(value) != Ordering::Greater,
            Operator::Like | Operator::NotLike => {
                let haystack = cell.as_text().ok_or_else(|| {
                    SheetbaseError::TypeMismatch(format!(
                        "'{}' needs a text cell, found {}",
                        self.as_str(),
                        kind_name(cell)
                    ))
                })?;
                let needle = value.as_text().ok_or_else(|| {
                    SheetbaseError::TypeMismatch(format!(
                        "'{}' needs a text pattern, found {}",
                        self.as_str(),
                        kind_name(value)
                    ))
                })?;
                haystack.contains(needle) == (*self == Operator::Like)
            }
        };
        Ok(matched)
    }
}

fn kind_name(value: &CellValue) -> &'static str {
    value.kind().map(|k| k.as_str()).unwrap_or("empty")
}

impl FromStr for Operator {
    type Err = SheetbaseError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match normalized.as_str() {
            "=" | "==" => Ok(Operator::Eq),
            "!=" | "<>" => Ok(Operator::Ne),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Gte),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Lte),
            "like" => Ok(Operator::Like),
            "not like" => Ok(Operator::NotLike),
            _ => Err(SheetbaseError::UnsupportedOperator(s.to_string())),
        }
    }
}

/// Sort order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order
    #[default]
    Asc,
    /// Descending order (exact reverse of ascending)
    Desc,
}

impl FromStr for OrderDirection {
    type Err = SheetbaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(OrderDirection::Asc),
            "desc" | "descending" => Ok(OrderDirection::Desc),
            _ => Err(SheetbaseError::Validation(format!(
                "invalid sort direction '{}' (expected asc or desc)",
                s
            ))),
        }
    }
}

/// A single `column <op> value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub operator: Operator,
    pub value: CellValue,
}

impl Predicate {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<CellValue>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Evaluate against a record; a missing column reads as `Empty`.
    pub fn evaluate(&self, record: &RowRecord) -> Result<bool> {
        let empty = CellValue::Empty;
        let cell = record.get(&self.column).unwrap_or(&empty);
        self.operator.matches(cell, &self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parsing() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("==".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::Ne);
        assert_eq!(">=".parse::<Operator>().unwrap(), Operator::Gte);
        assert_eq!("LIKE".parse::<Operator>().unwrap(), Operator::Like);
        assert_eq!("Not   Like".parse::<Operator>().unwrap(), Operator::NotLike);

        let err = "~=".parse::<Operator>().unwrap_err();
        assert_eq!(err, SheetbaseError::UnsupportedOperator("~=".to_string()));
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("ASC".parse::<OrderDirection>().unwrap(), OrderDirection::Asc);
        assert_eq!("descending".parse::<OrderDirection>().unwrap(), OrderDirection::Desc);
        assert!(matches!(
            "sideways".parse::<OrderDirection>(),
            Err(SheetbaseError::Validation(_))
        ));
    }

    #[test]
    fn test_comparisons_on_text_are_lexicographic() {
        let cell = CellValue::from("10");
        assert!(!Operator::Gt.matches(&cell, &CellValue::from("9")).unwrap());
        assert!(Operator::Lt.matches(&cell, &CellValue::from("9")).unwrap());
        assert!(Operator::Gte.matches(&cell, &CellValue::from("10")).unwrap());
        assert!(Operator::Lte.matches(&cell, &CellValue::from("10")).unwrap());
    }

    #[test]
    fn test_comparisons_on_numbers_are_numeric() {
        let cell = CellValue::Number(10.0);
        assert!(Operator::Gt.matches(&cell, &CellValue::Number(9.0)).unwrap());
        assert!(Operator::Ne.matches(&cell, &CellValue::Number(9.0)).unwrap());
    }

    #[test]
    fn test_like_is_case_sensitive_substring() {
        let cell = CellValue::from("Annabel");
        assert!(Operator::Like.matches(&cell, &CellValue::from("nab")).unwrap());
        assert!(!Operator::Like.matches(&cell, &CellValue::from("NAB")).unwrap());
        assert!(Operator::NotLike.matches(&cell, &CellValue::from("zz")).unwrap());
        assert!(Operator::Like.matches(&CellValue::Empty, &CellValue::from("")).unwrap());
    }

    #[test]
    fn test_like_on_non_text_is_type_mismatch() {
        let err = Operator::Like
            .matches(&CellValue::Number(3.0), &CellValue::from("3"))
            .unwrap_err();
        assert!(matches!(err, SheetbaseError::TypeMismatch(_)));

        let err = Operator::Like
            .matches(&CellValue::from("3"), &CellValue::Bool(true))
            .unwrap_err();
        assert!(matches!(err, SheetbaseError::TypeMismatch(_)));
    }

    #[test]
    fn test_predicate_missing_column_reads_empty() {
        let record = RowRecord::new().with("name", "Ann");
        assert!(Predicate::new("email", Operator::Eq, "").evaluate(&record).unwrap());
        assert!(Predicate::new("name", Operator::Eq, "Ann").evaluate(&record).unwrap());
    }
}
