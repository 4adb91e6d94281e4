//! Async query-builder client that treats a cloud spreadsheet as a
//! row-oriented data store.
//!
//! Each tab of a spreadsheet is a table: the first row is the header, every
//! following row is a record. Tables are fetched whole, filtered and sorted
//! in memory, and written back with a full clear-and-rewrite.
//!
//! # Architecture
//!
//! ```text
//!   SheetsClient (credentials, store selection, catalog, write gate)
//!        |
//!      Table (snapshot + current view; query and write-back engine)
//!        |
//!   SheetsBackend trait
//!     |-- SheetsApi      (Google Sheets v4 over sheetbase-http)
//!     `-- MemoryBackend  (in-process, for tests and offline work)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use sheetbase::{Mode, OrderDirection, ServiceAccountKey, SheetsClient, SheetsConfig};
//!
//! let config = SheetsConfig::new()
//!     .credentials(ServiceAccountKey::from_file("service-account.json")?)
//!     .development_store("1AbC...dev")
//!     .production_store("1XyZ...prod")
//!     .mode(Mode::Development);
//!
//! let client = SheetsClient::new(config)?;
//! let adults = client
//!     .table("People")
//!     .await?
//!     .filter("age", ">=", 18)?
//!     .order_by("last_name", OrderDirection::Asc)?;
//!
//! for person in adults.all() {
//!     println!("{:?}", person.get("first_name"));
//! }
//! ```
//!
//! # Semantics worth knowing
//!
//! - Column names are canonical tokens (`"First Name"` becomes `first_name`).
//! - Successive filters narrow the current view (logical AND); `reset()`
//!   restores every row.
//! - Without a [`Schema`], every cell is text: `"10" > "9"` is false.
//! - Row ids are positional and only valid for the snapshot they came from.
//! - `save()` and `upsert()` clear the remote table before rewriting it; a
//!   failure in between leaves it cleared. The returned [`WriteError`]
//!   carries the table so the write can be retried.

pub mod auth;
pub mod backend;
pub mod client;
pub mod config;
pub mod query;
pub mod snapshot;
pub mod table;
pub mod value;

pub use auth::{ServiceAccountTokenProvider, StaticToken, TokenProvider};
pub use backend::{BackendCall, MemoryBackend, SheetsApi, SheetsBackend, TableRange, ValueInputOption};
pub use client::SheetsClient;
pub use config::{Mode, ServiceAccountKey, SheetsConfig, StoreIds};
pub use query::{OrderDirection, Operator, Predicate};
pub use snapshot::{canonicalize, RowRecord, TableSnapshot};
pub use table::{Table, WriteError, WriteResult};
pub use value::{CellValue, Schema, ValueKind};

pub use sheetbase_common::{Result, SheetbaseError};
