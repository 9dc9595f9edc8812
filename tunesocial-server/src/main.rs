use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt::Debug, path::PathBuf};
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tunesocial_server::config;
use tunesocial_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use tunesocial_server::social::{SocialManager, SqliteSocialStore};
use tunesocial_server::spotify::{
    MusicProvider, OAuthStateStore, SpotifyClient, UnconfiguredProvider, DEFAULT_STATE_TTL_SECS,
};
use tunesocial_server::user::{SqliteUserStore, UserManager};
use tunesocial_server::ServerState;

/// How often expired OAuth states are dropped from memory.
const OAUTH_STATE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory containing the database files (user.db, social.db).
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Posts about the same item by the same user within this many seconds are rejected.
    #[clap(long)]
    pub duplicate_post_window_secs: Option<u64>,

    /// Number of days an auth token may stay unused before it is pruned. Set to 0 to disable pruning.
    #[clap(long, default_value_t = 30)]
    pub auth_token_retention_days: u64,

    /// Interval in hours between pruning runs. Only used if auth_token_retention_days > 0.
    #[clap(long, default_value_t = 24)]
    pub prune_interval_hours: u64,

    /// Where the browser is redirected after a successful Spotify login.
    #[clap(long)]
    pub post_login_redirect: Option<String>,

    /// Spotify application client id.
    #[clap(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    pub spotify_client_id: Option<String>,

    /// Spotify application client secret.
    #[clap(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub spotify_client_secret: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            duplicate_post_window_secs: args.duplicate_post_window_secs,
            auth_token_retention_days: args.auth_token_retention_days,
            prune_interval_hours: args.prune_interval_hours,
            post_login_redirect: args.post_login_redirect.clone(),
            spotify_client_id: args.spotify_client_id.clone(),
            spotify_client_secret: args.spotify_client_secret.clone(),
        }
    }
}

fn spawn_auth_token_pruning(user_manager: Arc<UserManager>, retention_days: u64, interval_hours: u64) {
    info!(
        "Auth token pruning enabled: retaining {} days, pruning every {} hours",
        retention_days, interval_hours
    );

    tokio::spawn(async move {
        let interval = Duration::from_secs(interval_hours.max(1) * 60 * 60);
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            match user_manager.prune_unused_auth_tokens(retention_days) {
                Ok(count) => {
                    if count > 0 {
                        info!("Pruned {} unused auth tokens", count);
                    }
                }
                Err(e) => {
                    error!("Failed to prune auth tokens: {}", e);
                }
            }
        }
    });
}

fn spawn_oauth_state_cleanup(oauth_states: Arc<OAuthStateStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(OAUTH_STATE_CLEANUP_INTERVAL);
        loop {
            ticker.tick().await;
            oauth_states.cleanup_expired().await;
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!(
        "  duplicate_post_window_secs: {}",
        app_config.duplicate_post_window_secs
    );

    info!("Initializing metrics...");
    metrics::init_metrics();

    if !app_config.user_db_path().exists() {
        info!(
            "Creating new user database at {:?}",
            app_config.user_db_path()
        );
    }
    let user_store = Arc::new(SqliteUserStore::new(app_config.user_db_path())?);
    let user_manager = Arc::new(UserManager::new(user_store));

    if !app_config.social_db_path().exists() {
        info!(
            "Creating new social database at {:?}",
            app_config.social_db_path()
        );
    }
    let social_store = Arc::new(SqliteSocialStore::new(app_config.social_db_path())?);
    let social_manager = Arc::new(SocialManager::new(
        social_store,
        user_manager.clone(),
        app_config.duplicate_post_window_secs,
    ));

    let provider: Arc<dyn MusicProvider> = match app_config.spotify.clone() {
        Some(spotify_config) => {
            info!(
                "Spotify integration enabled, redirect uri {}",
                spotify_config.redirect_uri
            );
            Arc::new(SpotifyClient::new(spotify_config)?)
        }
        None => {
            info!("No Spotify credentials configured, Spotify features are disabled");
            Arc::new(UnconfiguredProvider)
        }
    };

    let oauth_states = Arc::new(OAuthStateStore::new(DEFAULT_STATE_TTL_SECS));
    spawn_oauth_state_cleanup(oauth_states.clone());

    if app_config.auth_token_retention_days > 0 {
        spawn_auth_token_pruning(
            user_manager.clone(),
            app_config.auth_token_retention_days,
            app_config.prune_interval_hours,
        );
    }

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        frontend_dir_path: app_config.frontend_dir_path.clone(),
        post_login_redirect: app_config.post_login_redirect.clone(),
    };
    let state = ServerState::new(
        server_config,
        user_manager,
        social_manager,
        provider,
        oauth_states,
    );

    run_server(state, app_config.metrics_port).await
}
