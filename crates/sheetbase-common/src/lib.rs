//! Common utilities for sheetbase
//!
//! This crate provides the error taxonomy and HTTP types shared by the
//! transport crate and the spreadsheet store client.

pub mod error;
pub mod http;

pub use error::{Result, SheetbaseError};
pub use http::{HttpMethod, HttpResponseLike, HttpStatus};
