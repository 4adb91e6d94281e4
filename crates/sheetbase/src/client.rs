//! Authenticated session over a pair of stores.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::auth::{ServiceAccountTokenProvider, TokenProvider};
use crate::backend::{SheetsApi, SheetsBackend, TableRange};
use crate::config::{Mode, SheetsConfig, StoreIds};
use crate::snapshot::TableSnapshot;
use crate::table::Table;
use crate::value::Schema;
use sheetbase_common::{Result, SheetbaseError};
use sheetbase_http::{HttpClient, HttpClientConfig};

/// Session handle.
///
/// Cheap to clone; clones share the backend, token cache, table catalog and
/// write gate. The selected [`Mode`] belongs to the handle, so
/// [`with_mode`](Self::with_mode) never affects other handles.
#[derive(Clone)]
pub struct SheetsClient {
    inner: Arc<ClientInner>,
    mode: Mode,
}

struct ClientInner {
    backend: Arc<dyn SheetsBackend>,
    tokens: Option<Arc<dyn TokenProvider>>,
    stores: StoreIds,
    /// Table names per store id
    catalogs: RwLock<HashMap<String, Vec<String>>>,
    /// Serializes clear-then-write sequences
    write_gate: Mutex<()>,
}

impl SheetsClient {
    /// Build a session against the spreadsheet API.
    ///
    /// Credentials and both store ids are checked here; no network call is
    /// made until the first remote operation.
    pub fn new(config: SheetsConfig) -> Result<Self> {
        let key = config.service_account()?;
        let stores = config.store_ids()?;

        let http_config = HttpClientConfig {
            base_url: Some(config.api_base_url.clone()),
            ..config.http.clone()
        };
        let http = HttpClient::new(http_config)?;
        let tokens: Arc<dyn TokenProvider> = Arc::new(ServiceAccountTokenProvider::new(
            key,
            &config.scopes,
            config.resolved_token_url(),
            http.clone(),
        )?);
        let backend = SheetsApi::new(http, tokens.clone()).value_input(config.value_input);

        debug!(principal = %key.client_email, mode = %config.mode, "Created session");
        Ok(Self {
            inner: Arc::new(ClientInner {
                backend: Arc::new(backend),
                tokens: Some(tokens),
                stores,
                catalogs: RwLock::new(HashMap::new()),
                write_gate: Mutex::new(()),
            }),
            mode: config.mode,
        })
    }

    /// Build a session over any backend, in development mode.
    pub fn with_backend(stores: StoreIds, backend: Arc<dyn SheetsBackend>) -> Result<Self> {
        stores.validate()?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                backend,
                tokens: None,
                stores,
                catalogs: RwLock::new(HashMap::new()),
                write_gate: Mutex::new(()),
            }),
            mode: Mode::default(),
        })
    }

    /// A handle addressing the store for `mode`.
    pub fn with_mode(&self, mode: Mode) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            mode,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Identifier of the store selected by the current mode.
    pub fn store_id(&self) -> &str {
        self.inner.stores.for_mode(self.mode)
    }

    /// Obtain an access token now instead of on the first remote call.
    ///
    /// A no-op for sessions built with [`with_backend`](Self::with_backend).
    pub async fn authenticate(&self) -> Result<()> {
        if let Some(tokens) = &self.inner.tokens {
            tokens.access_token().await?;
            debug!("Authenticated");
        }
        Ok(())
    }

    /// Table names of the selected store, fetched once per store.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        if let Some(cached) = self.inner.catalogs.read().get(self.store_id()) {
            return Ok(cached.clone());
        }
        self.refresh_tables().await
    }

    /// Re-read the catalog of the selected store.
    #[instrument(skip(self), fields(store = %self.store_id()))]
    pub async fn refresh_tables(&self) -> Result<Vec<String>> {
        let tables = self.inner.backend.list_tables(self.store_id()).await?;
        debug!(tables = tables.len(), "Catalog populated");
        self.inner
            .catalogs
            .write()
            .insert(self.store_id().to_string(), tables.clone());
        Ok(tables)
    }

    /// Fetch a table with every column read as text.
    pub async fn table(&self, name: &str) -> Result<Table> {
        self.table_with_schema(name, Schema::new()).await
    }

    /// Fetch a table, typing declared columns.
    #[instrument(skip(self, schema), fields(store = %self.store_id()))]
    pub async fn table_with_schema(&self, name: &str, schema: Schema) -> Result<Table> {
        let known = self.list_tables().await?;
        if !known.iter().any(|t| t == name) {
            return Err(SheetbaseError::NotFound {
                table: name.to_string(),
                known,
            });
        }

        let snapshot = self.fetch_snapshot(name, &schema).await?;
        info!(rows = snapshot.rows().len(), "Fetched table");
        Ok(Table::new(self.clone(), snapshot))
    }

    pub(crate) async fn fetch_snapshot(&self, name: &str, schema: &Schema) -> Result<TableSnapshot> {
        let grid = self
            .inner
            .backend
            .read_range(self.store_id(), &TableRange::whole(name))
            .await?;
        TableSnapshot::materialize(name, grid, schema)
    }

    pub(crate) fn backend(&self) -> &dyn SheetsBackend {
        self.inner.backend.as_ref()
    }

    pub(crate) fn write_gate(&self) -> &Mutex<()> {
        &self.inner.write_gate
    }
}

impl std::fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsClient")
            .field("mode", &self.mode)
            .field("store_id", &self.store_id())
            .field("authenticated", &self.inner.tokens.is_some())
            .finish()
    }
}
