use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,
    pub duplicate_post_window_secs: Option<u64>,
    pub auth_token_retention_days: Option<u64>,
    pub prune_interval_hours: Option<u64>,
    pub post_login_redirect: Option<String>,

    pub spotify: Option<SpotifyFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SpotifyFileConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    /// Space separated OAuth scopes.
    pub scopes: Option<String>,
    pub api_base_url: Option<String>,
    pub accounts_base_url: Option<String>,
    pub request_timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_spotify_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
port = 4000
duplicate_post_window_secs = 120
post_login_redirect = "/welcome"

[spotify]
client_id = "abc"
redirect_uri = "https://tunes.example.com/v1/spotify/callback"
request_timeout_sec = 5
"#
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.port, Some(4000));
        assert_eq!(config.duplicate_post_window_secs, Some(120));
        assert_eq!(config.db_dir, None);
        assert_eq!(config.post_login_redirect.as_deref(), Some("/welcome"));
        let spotify = config.spotify.unwrap();
        assert_eq!(spotify.client_id.as_deref(), Some("abc"));
        assert_eq!(spotify.client_secret, None);
        assert_eq!(spotify.request_timeout_sec, Some(5));
    }

    #[test]
    fn rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
