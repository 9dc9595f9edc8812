//! HTTP client for the Spotify accounts service and Web API.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::models::{
    Album, Artist, CurrentlyPlaying, Device, DevicesResponse, Paging, PlaybackState,
    SearchResponse, SpotifyProfile, TimeRange, TokenResponse, Track,
};
use super::provider::MusicProvider;

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_SCOPES: &str = "user-read-private user-read-email user-top-read \
user-read-currently-playing user-read-playback-state user-modify-playback-state \
playlist-modify-public playlist-modify-private streaming";

#[derive(Clone, Debug)]
pub struct SpotifyClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: String,
    pub api_base_url: String,
    pub accounts_base_url: String,
    pub request_timeout_sec: u64,
}

pub struct SpotifyClient {
    client: reqwest::Client,
    config: SpotifyClientConfig,
}

impl SpotifyClient {
    pub fn new(config: SpotifyClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let config = SpotifyClientConfig {
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            accounts_base_url: config.accounts_base_url.trim_end_matches('/').to_string(),
            ..config
        };

        Ok(Self { client, config })
    }

    fn api_request(&self, method: Method, access_token: &str, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.api_base_url, path);
        self.client.request(method, url).bearer_auth(access_token)
    }

    async fn send(request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach Spotify for {}", what))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Spotify {} failed with status {}: {}", what, status, body);
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let request = self
            .api_request(Method::GET, access_token, path)
            .query(query);
        Self::send(request, what)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse Spotify {} response", what))
    }

    /// Like `get_json` but maps `204 No Content` to `None`.
    async fn get_optional_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
        what: &str,
    ) -> Result<Option<T>> {
        let request = self.api_request(Method::GET, access_token, path);
        let response = Self::send(request, what).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }
        let parsed = serde_json::from_slice(&body)
            .with_context(|| format!("Failed to parse Spotify {} response", what))?;
        Ok(Some(parsed))
    }

    async fn token_request(&self, form: &[(&str, &str)], what: &str) -> Result<TokenResponse> {
        let url = format!("{}/api/token", self.config.accounts_base_url);
        let request = self
            .client
            .post(url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(form);
        Self::send(request, what)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse Spotify {} response", what))
    }
}

#[async_trait]
impl MusicProvider for SpotifyClient {
    fn authorize_url(&self, state: &str) -> Result<String> {
        Ok(format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}&show_dialog=true",
            self.config.accounts_base_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&self.config.scopes),
            urlencoding::encode(state),
        ))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        debug!("Exchanging authorization code");
        self.token_request(
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.config.redirect_uri),
            ],
            "code exchange",
        )
        .await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        debug!("Refreshing access token");
        self.token_request(
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
            "token refresh",
        )
        .await
    }

    async fn current_user(&self, access_token: &str) -> Result<SpotifyProfile> {
        self.get_json(access_token, "/me", &[], "profile").await
    }

    async fn get_track(&self, access_token: &str, track_id: &str) -> Result<Track> {
        let path = format!("/tracks/{}", urlencoding::encode(track_id));
        self.get_json(access_token, &path, &[], "track lookup").await
    }

    async fn get_album(&self, access_token: &str, album_id: &str) -> Result<Album> {
        let path = format!("/albums/{}", urlencoding::encode(album_id));
        self.get_json(access_token, &path, &[], "album lookup").await
    }

    async fn get_album_tracks(&self, access_token: &str, album_id: &str) -> Result<Vec<Track>> {
        let path = format!("/albums/{}/tracks", urlencoding::encode(album_id));
        let page: Paging<Track> = self
            .get_json(access_token, &path, &[("limit", "50".to_string())], "album tracks")
            .await?;
        Ok(page.items)
    }

    async fn search_tracks(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Track>> {
        let response: SearchResponse = self
            .get_json(
                access_token,
                "/search",
                &[
                    ("q", query.to_string()),
                    ("type", "track".to_string()),
                    ("limit", limit.to_string()),
                ],
                "track search",
            )
            .await?;
        Ok(response.tracks.map(|p| p.items).unwrap_or_default())
    }

    async fn search_albums(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Album>> {
        let response: SearchResponse = self
            .get_json(
                access_token,
                "/search",
                &[
                    ("q", query.to_string()),
                    ("type", "album".to_string()),
                    ("limit", limit.to_string()),
                ],
                "album search",
            )
            .await?;
        Ok(response.albums.map(|p| p.items).unwrap_or_default())
    }

    async fn currently_playing(&self, access_token: &str) -> Result<Option<CurrentlyPlaying>> {
        self.get_optional_json(access_token, "/me/player/currently-playing", "now playing")
            .await
    }

    async fn top_artists(
        &self,
        access_token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<Artist>> {
        let page: Paging<Artist> = self
            .get_json(
                access_token,
                "/me/top/artists",
                &[
                    ("time_range", time_range.as_str().to_string()),
                    ("limit", limit.to_string()),
                ],
                "top artists",
            )
            .await?;
        Ok(page.items)
    }

    async fn top_tracks(
        &self,
        access_token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<Track>> {
        let page: Paging<Track> = self
            .get_json(
                access_token,
                "/me/top/tracks",
                &[
                    ("time_range", time_range.as_str().to_string()),
                    ("limit", limit.to_string()),
                ],
                "top tracks",
            )
            .await?;
        Ok(page.items)
    }

    async fn devices(&self, access_token: &str) -> Result<Vec<Device>> {
        let response: DevicesResponse = self
            .get_json(access_token, "/me/player/devices", &[], "devices")
            .await?;
        Ok(response.devices)
    }

    async fn current_playback(&self, access_token: &str) -> Result<Option<PlaybackState>> {
        self.get_optional_json(access_token, "/me/player", "playback state")
            .await
    }

    async fn add_to_queue(
        &self,
        access_token: &str,
        uri: &str,
        device_id: Option<String>,
    ) -> Result<()> {
        let mut query = vec![("uri", uri.to_string())];
        if let Some(device_id) = device_id {
            query.push(("device_id", device_id));
        }
        let request = self
            .api_request(Method::POST, access_token, "/me/player/queue")
            .query(&query)
            .header(reqwest::header::CONTENT_LENGTH, 0);
        Self::send(request, "queue").await?;
        Ok(())
    }

    async fn add_to_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
        uri: &str,
    ) -> Result<()> {
        let path = format!("/playlists/{}/tracks", urlencoding::encode(playlist_id));
        let request = self
            .api_request(Method::POST, access_token, &path)
            .json(&json!({ "uris": [uri] }));
        Self::send(request, "playlist add").await?;
        Ok(())
    }

    async fn remove_from_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
        uri: &str,
    ) -> Result<()> {
        let path = format!("/playlists/{}/tracks", urlencoding::encode(playlist_id));
        let request = self
            .api_request(Method::DELETE, access_token, &path)
            .json(&json!({ "tracks": [{ "uri": uri }] }));
        Self::send(request, "playlist removal").await?;
        Ok(())
    }
}
