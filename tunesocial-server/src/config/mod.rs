mod file_config;

pub use file_config::{FileConfig, SpotifyFileConfig};

use crate::server::RequestsLoggingLevel;
use crate::social::DEFAULT_DUPLICATE_WINDOW_SECS;
use crate::spotify::{
    SpotifyClientConfig, DEFAULT_ACCOUNTS_BASE_URL, DEFAULT_API_BASE_URL, DEFAULT_SCOPES,
};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3001/v1/spotify/callback";
pub const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 30;
pub const DEFAULT_POST_LOGIN_REDIRECT: &str = "/";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub duplicate_post_window_secs: Option<u64>,
    pub auth_token_retention_days: u64,
    pub prune_interval_hours: u64,
    pub post_login_redirect: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub duplicate_post_window_secs: u64,
    pub auth_token_retention_days: u64,
    pub prune_interval_hours: u64,
    /// Where the browser is sent once the Spotify login completes.
    pub post_login_redirect: String,

    /// `None` when no client credentials are configured.
    pub spotify: Option<SpotifyClientConfig>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let duplicate_post_window_secs = file
            .duplicate_post_window_secs
            .or(cli.duplicate_post_window_secs)
            .unwrap_or(DEFAULT_DUPLICATE_WINDOW_SECS);
        let auth_token_retention_days = file
            .auth_token_retention_days
            .unwrap_or(cli.auth_token_retention_days);
        let prune_interval_hours = file
            .prune_interval_hours
            .unwrap_or(cli.prune_interval_hours);

        let post_login_redirect = non_blank(file.post_login_redirect)
            .or_else(|| non_blank(cli.post_login_redirect.clone()))
            .unwrap_or_else(|| DEFAULT_POST_LOGIN_REDIRECT.to_string());

        let spotify = resolve_spotify(cli, file.spotify.unwrap_or_default())?;

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            duplicate_post_window_secs,
            auth_token_retention_days,
            prune_interval_hours,
            post_login_redirect,
            spotify,
        })
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn social_db_path(&self) -> PathBuf {
        self.db_dir.join("social.db")
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn resolve_spotify(cli: &CliConfig, file: SpotifyFileConfig) -> Result<Option<SpotifyClientConfig>> {
    let client_id = non_blank(file.client_id).or_else(|| non_blank(cli.spotify_client_id.clone()));
    let client_secret =
        non_blank(file.client_secret).or_else(|| non_blank(cli.spotify_client_secret.clone()));

    let (client_id, client_secret) = match (client_id, client_secret) {
        (Some(id), Some(secret)) => (id, secret),
        (None, None) => return Ok(None),
        _ => bail!("Both the Spotify client id and client secret must be provided together"),
    };

    Ok(Some(SpotifyClientConfig {
        client_id,
        client_secret,
        redirect_uri: non_blank(file.redirect_uri)
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
        scopes: non_blank(file.scopes).unwrap_or_else(|| DEFAULT_SCOPES.to_string()),
        api_base_url: non_blank(file.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        accounts_base_url: non_blank(file.accounts_base_url)
            .unwrap_or_else(|| DEFAULT_ACCOUNTS_BASE_URL.to_string()),
        request_timeout_sec: file
            .request_timeout_sec
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SEC),
    }))
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
