//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own databases and fake Spotify.

use super::constants::*;
use super::fixtures::{create_test_db_with_users, FakeMusicProvider};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tunesocial_server::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use tunesocial_server::social::{SocialManager, SqliteSocialStore};
use tunesocial_server::spotify::OAuthStateStore;
use tunesocial_server::user::UserManager;

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Direct access to users and tokens
    pub user_manager: Arc<UserManager>,

    /// The Spotify stand-in, for arranging playback and inspecting calls
    pub provider: Arc<FakeMusicProvider>,

    pub alice_id: usize,
    pub bob_id: usize,
    pub carol_id: usize,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    pub async fn spawn() -> Self {
        Self::spawn_with_duplicate_window(TEST_DUPLICATE_WINDOW_SECS).await
    }

    /// Spawns a test server with a custom duplicate post window
    ///
    /// # Panics
    ///
    /// Panics if the databases cannot be created, the port cannot be bound
    /// or the server does not become ready within the timeout.
    pub async fn spawn_with_duplicate_window(duplicate_window_secs: u64) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let seeded =
            create_test_db_with_users(temp_db_dir.path()).expect("Failed to create test users");

        let social_store = SqliteSocialStore::new(temp_db_dir.path().join("social.db"))
            .expect("Failed to open social store");
        let social_manager = Arc::new(SocialManager::new(
            Arc::new(social_store),
            seeded.user_manager.clone(),
            duplicate_window_secs,
        ));
        let provider = Arc::new(FakeMusicProvider::default());

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
            frontend_dir_path: None,
            post_login_redirect: "/".to_string(),
        };
        let state = ServerState::new(
            config,
            seeded.user_manager.clone(),
            social_manager,
            provider.clone(),
            Arc::new(OAuthStateStore::default()),
        );
        let app = make_app(state);

        // Spawn server in background task with graceful shutdown
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
            user_manager: seeded.user_manager,
            provider,
            alice_id: seeded.alice,
            bob_id: seeded.bob,
            carol_id: seeded.carol,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
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
