//! Test fixtures: seeded users and an in-process stand-in for Spotify.

use super::constants::*;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tunesocial_server::spotify::models::{
    Album, Artist, CurrentlyPlaying, Device, ExternalUrls, Image, PlaybackState, SimpleArtist,
    SpotifyProfile, TimeRange, TokenResponse, Track,
};
use tunesocial_server::spotify::MusicProvider;
use tunesocial_server::user::{ProviderAccount, SqliteUserStore, UserManager};

pub struct SeededUsers {
    pub user_manager: Arc<UserManager>,
    pub alice: usize,
    pub bob: usize,
    pub carol: usize,
}

fn link_account(user_manager: &UserManager, user_id: usize, name: &str) -> Result<()> {
    user_manager.link_provider_account(&ProviderAccount {
        user_id,
        provider_user_id: format!("{}-spotify", name),
        access_token: format!("token-{}", name),
        refresh_token: Some(format!("refresh-{}", name)),
        expires_at: chrono::Utc::now().timestamp() + 3600,
    })?;
    Ok(())
}

/// Creates the user database in `db_dir` with three users. Alice and Bob have
/// a Spotify account linked, Carol does not.
pub fn create_test_db_with_users(db_dir: &Path) -> Result<SeededUsers> {
    let user_store = SqliteUserStore::new(db_dir.join("user.db"))?;
    let user_manager = Arc::new(UserManager::new(Arc::new(user_store)));

    let register = |handle: &str, password: &str| {
        user_manager.register(handle, &format!("{}@example.com", handle), password, password)
    };
    let alice = register(TEST_USER, TEST_PASS)?;
    let bob = register(OTHER_USER, OTHER_PASS)?;
    let carol = register(OFFLINE_USER, OFFLINE_PASS)?;

    link_account(&user_manager, alice, TEST_USER)?;
    link_account(&user_manager, bob, OTHER_USER)?;

    Ok(SeededUsers {
        user_manager,
        alice,
        bob,
        carol,
    })
}

fn artist(id: &str, name: &str) -> SimpleArtist {
    SimpleArtist {
        id: Some(id.to_string()),
        name: name.to_string(),
        external_urls: ExternalUrls::default(),
    }
}

fn album() -> Album {
    Album {
        id: ALBUM_1_ID.to_string(),
        name: ALBUM_1_TITLE.to_string(),
        artists: vec![artist("artist-1", ARTIST_1_NAME)],
        images: vec![Image {
            url: "https://i.scdn.co/image/album-1".to_string(),
            height: Some(640),
            width: Some(640),
        }],
        external_urls: ExternalUrls {
            spotify: Some(album_link(ALBUM_1_ID)),
        },
        release_date: Some("2001-01-01".to_string()),
        uri: Some(format!("spotify:album:{}", ALBUM_1_ID)),
    }
}

fn track(id: &str, name: &str, artist_id: &str, artist_name: &str) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        artists: vec![artist(artist_id, artist_name)],
        album: Some(album()),
        preview_url: None,
        external_urls: ExternalUrls {
            spotify: Some(track_link(id)),
        },
        uri: Some(track_uri(id)),
        duration_ms: Some(180_000),
    }
}

fn catalog_tracks() -> Vec<Track> {
    vec![
        track(TRACK_1_ID, TRACK_1_TITLE, "artist-1", ARTIST_1_NAME),
        track(TRACK_2_ID, TRACK_2_TITLE, "artist-1", ARTIST_1_NAME),
        track(TRACK_3_ID, TRACK_3_TITLE, "artist-2", ARTIST_2_NAME),
    ]
}

fn catalog_artists() -> Vec<Artist> {
    [("artist-1", ARTIST_1_NAME), ("artist-2", ARTIST_2_NAME)]
        .iter()
        .map(|(id, name)| Artist {
            id: id.to_string(),
            name: name.to_string(),
            images: vec![],
            genres: vec!["rock".to_string()],
            external_urls: ExternalUrls::default(),
        })
        .collect()
}

pub fn active_device() -> Device {
    Device {
        id: Some("device-1".to_string()),
        name: "Kitchen speaker".to_string(),
        is_active: true,
        device_type: Some("Speaker".to_string()),
        volume_percent: Some(40),
    }
}

/// In-memory Spotify. Tokens issued by the fixtures look like `token-<name>`.
/// Playback state and devices can be changed by tests; queue and playlist
/// calls are recorded.
#[derive(Default)]
pub struct FakeMusicProvider {
    pub devices: Mutex<Vec<Device>>,
    pub playback: Mutex<Option<PlaybackState>>,
    pub queued: Mutex<Vec<(String, Option<String>)>>,
    pub playlist_adds: Mutex<Vec<(String, String)>>,
    pub playlist_removals: Mutex<Vec<(String, String)>>,
}

impl FakeMusicProvider {
    /// Puts one active device in the "playing" state.
    pub fn start_playback(&self) {
        let device = active_device();
        *self.devices.lock().unwrap() = vec![device.clone()];
        *self.playback.lock().unwrap() = Some(PlaybackState {
            is_playing: true,
            device: Some(device),
            item: catalog_tracks().into_iter().next(),
        });
    }
}

fn check_token(access_token: &str) -> Result<()> {
    if !access_token.starts_with("token-") && !access_token.starts_with("refreshed-") {
        bail!("401 Unauthorized: invalid access token");
    }
    Ok(())
}

fn matches(query: &str, fields: &[&str]) -> bool {
    let query = query.to_lowercase();
    fields.iter().any(|f| f.to_lowercase().contains(&query))
}

#[async_trait]
impl MusicProvider for FakeMusicProvider {
    fn authorize_url(&self, state: &str) -> Result<String> {
        Ok(format!(
            "https://accounts.example.test/authorize?client_id=test&state={}",
            state
        ))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        if code != VALID_AUTH_CODE {
            bail!("400 Bad Request: invalid_grant");
        }
        Ok(TokenResponse {
            access_token: "token-dave".to_string(),
            token_type: Some("Bearer".to_string()),
            expires_in: 3600,
            refresh_token: Some("refresh-dave".to_string()),
            scope: None,
        })
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        Ok(TokenResponse {
            access_token: format!("refreshed-{}", refresh_token),
            token_type: Some("Bearer".to_string()),
            expires_in: 3600,
            refresh_token: None,
            scope: None,
        })
    }

    async fn current_user(&self, access_token: &str) -> Result<SpotifyProfile> {
        check_token(access_token)?;
        let (id, display_name) = if access_token == "token-dave" {
            (
                NEW_SPOTIFY_USER_ID.to_string(),
                NEW_SPOTIFY_DISPLAY_NAME.to_string(),
            )
        } else {
            let name = access_token.trim_start_matches("token-");
            (format!("{}-spotify", name), name.to_string())
        };
        Ok(SpotifyProfile {
            id,
            display_name: Some(display_name),
            email: None,
            images: vec![],
            country: Some("IT".to_string()),
            product: Some("premium".to_string()),
        })
    }

    async fn get_track(&self, access_token: &str, track_id: &str) -> Result<Track> {
        check_token(access_token)?;
        match catalog_tracks().into_iter().find(|t| t.id == track_id) {
            Some(track) => Ok(track),
            None => bail!("404 Not Found: non existing id"),
        }
    }

    async fn get_album(&self, access_token: &str, album_id: &str) -> Result<Album> {
        check_token(access_token)?;
        if album_id != ALBUM_1_ID {
            bail!("404 Not Found: non existing id");
        }
        Ok(album())
    }

    async fn get_album_tracks(&self, access_token: &str, album_id: &str) -> Result<Vec<Track>> {
        self.get_album(access_token, album_id).await?;
        Ok(catalog_tracks()
            .into_iter()
            .filter(|t| t.album.as_ref().map(|a| a.id.as_str()) == Some(album_id))
            .take(2)
            .map(|t| Track { album: None, ..t })
            .collect())
    }

    async fn search_tracks(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Track>> {
        check_token(access_token)?;
        Ok(catalog_tracks()
            .into_iter()
            .filter(|t| matches(query, &[t.name.as_str(), t.artist_names().as_str()]))
            .take(limit as usize)
            .collect())
    }

    async fn search_albums(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Album>> {
        check_token(access_token)?;
        Ok(vec![album()]
            .into_iter()
            .filter(|a| matches(query, &[a.name.as_str(), a.artist_names().as_str()]))
            .take(limit as usize)
            .collect())
    }

    async fn currently_playing(&self, access_token: &str) -> Result<Option<CurrentlyPlaying>> {
        check_token(access_token)?;
        Ok(self
            .playback
            .lock()
            .unwrap()
            .clone()
            .map(|p| CurrentlyPlaying {
                is_playing: p.is_playing,
                progress_ms: Some(1000),
                item: p.item,
            }))
    }

    async fn top_artists(
        &self,
        access_token: &str,
        _time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<Artist>> {
        check_token(access_token)?;
        Ok(catalog_artists().into_iter().take(limit as usize).collect())
    }

    async fn top_tracks(
        &self,
        access_token: &str,
        _time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<Track>> {
        check_token(access_token)?;
        Ok(catalog_tracks().into_iter().take(limit as usize).collect())
    }

    async fn devices(&self, access_token: &str) -> Result<Vec<Device>> {
        check_token(access_token)?;
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn current_playback(&self, access_token: &str) -> Result<Option<PlaybackState>> {
        check_token(access_token)?;
        Ok(self.playback.lock().unwrap().clone())
    }

    async fn add_to_queue(
        &self,
        access_token: &str,
        uri: &str,
        device_id: Option<String>,
    ) -> Result<()> {
        check_token(access_token)?;
        self.queued
            .lock()
            .unwrap()
            .push((uri.to_string(), device_id));
        Ok(())
    }

    async fn add_to_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
        uri: &str,
    ) -> Result<()> {
        check_token(access_token)?;
        self.playlist_adds
            .lock()
            .unwrap()
            .push((playlist_id.to_string(), uri.to_string()));
        Ok(())
    }

    async fn remove_from_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
        uri: &str,
    ) -> Result<()> {
        check_token(access_token)?;
        self.playlist_removals
            .lock()
            .unwrap()
            .push((playlist_id.to_string(), uri.to_string()));
        Ok(())
    }
}
