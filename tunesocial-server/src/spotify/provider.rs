use anyhow::{bail, Result};
use async_trait::async_trait;

use super::models::{
    Album, Artist, CurrentlyPlaying, Device, PlaybackState, SpotifyProfile, TimeRange,
    TokenResponse, Track,
};

/// The external music service: OAuth token calls plus the Web API endpoints
/// the server uses. Every API call is made on behalf of a user and takes that
/// user's access token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MusicProvider: Send + Sync {
    /// URL of the consent page the user is sent to.
    fn authorize_url(&self, state: &str) -> Result<String>;

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse>;

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse>;

    async fn current_user(&self, access_token: &str) -> Result<SpotifyProfile>;

    async fn get_track(&self, access_token: &str, track_id: &str) -> Result<Track>;

    async fn get_album(&self, access_token: &str, album_id: &str) -> Result<Album>;

    async fn get_album_tracks(&self, access_token: &str, album_id: &str) -> Result<Vec<Track>>;

    async fn search_tracks(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Track>>;

    async fn search_albums(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Album>>;

    /// `None` when nothing is playing.
    async fn currently_playing(&self, access_token: &str) -> Result<Option<CurrentlyPlaying>>;

    async fn top_artists(
        &self,
        access_token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<Artist>>;

    async fn top_tracks(
        &self,
        access_token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<Track>>;

    async fn devices(&self, access_token: &str) -> Result<Vec<Device>>;

    /// `None` when no device is playing.
    async fn current_playback(&self, access_token: &str) -> Result<Option<PlaybackState>>;

    async fn add_to_queue(
        &self,
        access_token: &str,
        uri: &str,
        device_id: Option<String>,
    ) -> Result<()>;

    async fn add_to_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
        uri: &str,
    ) -> Result<()>;

    async fn remove_from_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
        uri: &str,
    ) -> Result<()>;
}

pub const NOT_CONFIGURED_MESSAGE: &str = "Spotify integration is not configured";

/// Used when no client credentials are configured: every call fails.
pub struct UnconfiguredProvider;

#[async_trait]
impl MusicProvider for UnconfiguredProvider {
    fn authorize_url(&self, _state: &str) -> Result<String> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn exchange_code(&self, _code: &str) -> Result<TokenResponse> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn refresh_access_token(&self, _refresh_token: &str) -> Result<TokenResponse> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn current_user(&self, _access_token: &str) -> Result<SpotifyProfile> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn get_track(&self, _access_token: &str, _track_id: &str) -> Result<Track> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn get_album(&self, _access_token: &str, _album_id: &str) -> Result<Album> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn get_album_tracks(&self, _access_token: &str, _album_id: &str) -> Result<Vec<Track>> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn search_tracks(
        &self,
        _access_token: &str,
        _query: &str,
        _limit: u32,
    ) -> Result<Vec<Track>> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn search_albums(
        &self,
        _access_token: &str,
        _query: &str,
        _limit: u32,
    ) -> Result<Vec<Album>> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn currently_playing(&self, _access_token: &str) -> Result<Option<CurrentlyPlaying>> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn top_artists(
        &self,
        _access_token: &str,
        _time_range: TimeRange,
        _limit: u32,
    ) -> Result<Vec<Artist>> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn top_tracks(
        &self,
        _access_token: &str,
        _time_range: TimeRange,
        _limit: u32,
    ) -> Result<Vec<Track>> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn devices(&self, _access_token: &str) -> Result<Vec<Device>> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn current_playback(&self, _access_token: &str) -> Result<Option<PlaybackState>> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn add_to_queue(
        &self,
        _access_token: &str,
        _uri: &str,
        _device_id: Option<String>,
    ) -> Result<()> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn add_to_playlist(
        &self,
        _access_token: &str,
        _playlist_id: &str,
        _uri: &str,
    ) -> Result<()> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }

    async fn remove_from_playlist(
        &self,
        _access_token: &str,
        _playlist_id: &str,
        _uri: &str,
    ) -> Result<()> {
        bail!(NOT_CONFIGURED_MESSAGE)
    }
}
