//! Shared helpers for sheetbase integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use sheetbase::{MemoryBackend, Result, SheetsBackend, SheetsClient, StoreIds, TableRange};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const DEV: &str = "dev-store";
pub const PROD: &str = "prod-store";

/// Route engine spans to the test output; `RUST_LOG=sheetbase=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}

pub fn people_rows() -> Vec<Vec<String>> {
    grid(&[
        &["First Name", "Last Name", "Age"],
        &["Ann", "Lee", "30"],
        &["Bob", "Ray", "25"],
        &["Ann", "Kim", "41"],
        &["Dee", "", "25"],
    ])
}

/// A development store holding `People`, and an empty production store.
pub fn setup() -> (Arc<MemoryBackend>, SheetsClient) {
    init_tracing();
    let backend = MemoryBackend::new().with_store(PROD);
    backend.put_table(DEV, "People", people_rows());
    let backend = Arc::new(backend);
    let client = SheetsClient::with_backend(StoreIds::new(DEV, PROD), backend.clone())
        .expect("valid store ids");
    (backend, client)
}

/// `MemoryBackend` that hands control back to the runtime before every
/// call, so concurrent write-backs get a chance to interleave.
pub struct YieldingBackend {
    inner: Arc<MemoryBackend>,
}

impl YieldingBackend {
    pub fn new(inner: Arc<MemoryBackend>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SheetsBackend for YieldingBackend {
    async fn list_tables(&self, store_id: &str) -> Result<Vec<String>> {
        tokio::task::yield_now().await;
        self.inner.list_tables(store_id).await
    }

    async fn read_range(&self, store_id: &str, range: &TableRange) -> Result<Vec<Vec<String>>> {
        tokio::task::yield_now().await;
        self.inner.read_range(store_id, range).await
    }

    async fn clear_range(&self, store_id: &str, range: &TableRange) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.clear_range(store_id, range).await
    }

    async fn append_rows(
        &self,
        store_id: &str,
        range: &TableRange,
        rows: &[Vec<String>],
    ) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.append_rows(store_id, range, rows).await
    }

    async fn write_range(
        &self,
        store_id: &str,
        range: &TableRange,
        rows: &[Vec<String>],
    ) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.write_range(store_id, range, rows).await
    }
}

/// Like [`setup`], with every backend call yielding first.
pub fn setup_yielding() -> (Arc<MemoryBackend>, SheetsClient) {
    let (backend, _) = setup();
    let client = SheetsClient::with_backend(
        StoreIds::new(DEV, PROD),
        Arc::new(YieldingBackend::new(backend.clone())),
    )
    .expect("valid store ids");
    (backend, client)
}
