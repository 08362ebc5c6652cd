//! Test server lifecycle management
//!
//! Each test gets an isolated kiosk server with its own point store.

use super::constants::*;
use super::fake_postgrest::FakePostgrest;
use loyalty_kiosk::config::{LedgerSettings, StoreSettings};
use loyalty_kiosk::server::{make_app, RequestsLoggingLevel, ServerConfig};
use loyalty_kiosk::{InMemoryPointStore, PointLedger, PointStore, PostgrestPointStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Test server instance
///
/// When dropped, the server gracefully shuts down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// In-memory store behind the server, when spawned with one
    pub memory_store: Option<Arc<InMemoryPointStore>>,

    /// Fake PostgREST behind the server, when spawned with one
    pub postgrest: Option<FakePostgrest>,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server backed by an in-memory store and default ledger rules
    pub async fn spawn() -> Self {
        Self::spawn_with_settings(LedgerSettings::default()).await
    }

    pub async fn spawn_with_settings(settings: LedgerSettings) -> Self {
        let store = Arc::new(InMemoryPointStore::new());
        let mut server = Self::spawn_with_store(store.clone(), settings).await;
        server.memory_store = Some(store);
        server
    }

    /// Spawns a server talking to a fake PostgREST over HTTP
    pub async fn spawn_with_postgrest() -> Self {
        let fake = FakePostgrest::spawn().await;
        let store_settings = StoreSettings {
            url: fake.url.clone(),
            key: STORE_KEY.to_string(),
            timeout_sec: REQUEST_TIMEOUT_SECS,
            ..StoreSettings::default()
        };
        let store = PostgrestPointStore::new(&store_settings).expect("Failed to create store");
        let mut server = Self::spawn_with_store(Arc::new(store), LedgerSettings::default()).await;
        server.postgrest = Some(fake);
        server
    }

    async fn spawn_with_store(store: Arc<dyn PointStore>, settings: LedgerSettings) -> Self {
        let ledger = Arc::new(PointLedger::new(store, settings));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..ServerConfig::default()
        };
        let app = make_app(config, ledger);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            memory_store: None,
            postgrest: None,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    pub fn memory_store(&self) -> &InMemoryPointStore {
        self.memory_store
            .as_deref()
            .expect("Server was not spawned with an in-memory store")
    }

    pub fn postgrest(&self) -> &FakePostgrest {
        self.postgrest
            .as_ref()
            .expect("Server was not spawned with a fake PostgREST")
    }

    /// Waits for the server to become ready by polling the stats endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
