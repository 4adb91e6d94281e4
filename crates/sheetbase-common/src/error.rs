//! Error types for sheetbase

use thiserror::Error;

/// Result type alias for sheetbase operations
pub type Result<T> = std::result::Result<T, SheetbaseError>;

/// Unified error type for all sheetbase operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SheetbaseError {
    /// Missing or malformed construction parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested table is not part of the store's catalog
    #[error("Table '{table}' not found (known tables: {})", .known.join(", "))]
    NotFound { table: String, known: Vec<String> },

    /// No row with the given synthetic identifier in the snapshot
    #[error("Row {0} not found")]
    RowNotFound(usize),

    /// The table has no header row
    #[error("Table '{0}' is empty (no header row)")]
    EmptyTable(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Invalid column, direction or value arguments
    #[error("Validation error: {0}")]
    Validation(String),

    /// A cell or query value has the wrong kind for the operation
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Failure reported by the remote store or its transport
    #[error("Remote service error{}: {message}", status_suffix(.status))]
    Remote { status: Option<u16>, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

impl SheetbaseError {
    /// Build a remote error without an HTTP status
    pub fn remote(message: impl Into<String>) -> Self {
        SheetbaseError::Remote {
            status: None,
            message: message.into(),
        }
    }

    /// Returns true for errors raised locally before any network call
    pub fn is_local(&self) -> bool {
        !self.is_remote()
    }

    /// Returns true for failures surfaced by the remote store
    pub fn is_remote(&self) -> bool {
        matches!(self, SheetbaseError::Remote { .. })
    }

    /// HTTP status attached to a remote error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            SheetbaseError::Remote { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SheetbaseError {
    fn from(err: serde_json::Error) -> Self {
        SheetbaseError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_configuration() {
        let err = SheetbaseError::Configuration("client_email is required".to_string());
        assert_eq!(err.to_string(), "Configuration error: client_email is required");
    }

    #[test]
    fn test_error_display_not_found_lists_known_tables() {
        let err = SheetbaseError::NotFound {
            table: "orders".to_string(),
            known: vec!["users".to_string(), "items".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Table 'orders' not found (known tables: users, items)"
        );
    }

    #[test]
    fn test_error_display_empty_table() {
        let err = SheetbaseError::EmptyTable("users".to_string());
        assert_eq!(err.to_string(), "Table 'users' is empty (no header row)");
    }

    #[test]
    fn test_error_display_remote() {
        let err = SheetbaseError::Remote {
            status: Some(403),
            message: "The caller does not have permission".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Remote service error (403): The caller does not have permission"
        );

        let err = SheetbaseError::remote("connection reset");
        assert_eq!(err.to_string(), "Remote service error: connection reset");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: SheetbaseError = json_err.into();
        assert!(matches!(err, SheetbaseError::Serialization(_)));
    }

    #[test]
    fn test_local_remote_classification() {
        assert!(SheetbaseError::Validation("bad column".to_string()).is_local());
        assert!(SheetbaseError::UnsupportedOperator("~".to_string()).is_local());
        assert!(SheetbaseError::RowNotFound(3).is_local());
        assert!(SheetbaseError::remote("boom").is_remote());
        assert!(!SheetbaseError::remote("boom").is_local());
    }

    #[test]
    fn test_status() {
        let err = SheetbaseError::Remote {
            status: Some(404),
            message: "Requested entity was not found.".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(SheetbaseError::EmptyTable("t".to_string()).status(), None);
    }
}
