//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own corpus database.

use super::constants::*;
use super::fixtures::create_test_corpus;
use chordmatch_server::corpus::{CorpusSource, SqliteCorpusSource};
use chordmatch_server::music::Key;
use chordmatch_server::server::state::ServerState;
use chordmatch_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use chordmatch_server::similarity::{CorpusContext, SimilarityEngine, SimilaritySettings};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated corpus
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Corpus database, writable by tests that exercise reload
    pub db_path: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the corpus cannot be created or loaded, if port binding
    /// fails, or if the server doesn't become ready within timeout.
    pub async fn spawn() -> Self {
        let (temp_db_dir, db_path) = create_test_corpus().expect("Failed to create test corpus");

        let corpus_source: Arc<dyn CorpusSource> = Arc::new(SqliteCorpusSource::new(&db_path));
        let reference = Key::major(0);
        let settings = SimilaritySettings::default();
        let context = CorpusContext::load(
            corpus_source.as_ref(),
            None,
            reference,
            settings.collapse_repeats,
        )
        .expect("Failed to load test corpus");
        let engine = Arc::new(SimilarityEngine::new(context, settings));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            reference_key: reference,
            ..ServerConfig::default()
        };
        let app = make_app(ServerState::new(config, engine, corpus_source));

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            db_path,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the corpus listing
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
