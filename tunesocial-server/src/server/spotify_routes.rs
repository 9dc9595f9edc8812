//! Spotify account linking and the catalog/playback calls made on behalf of
//! the logged-in user.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::api_response::{ok, ApiError, ApiResult};
use super::auth_routes::session_cookie;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::session::Session;
use super::state::{GuardedSocialManager, GuardedUserManager, ServerState};
use crate::social::RatingSummary;
use crate::spotify::{
    complete_authorization,
    fresh_access_token,
    models::{Album, Artist, CurrentlyPlaying, SpotifyProfile, TimeRange, Track},
    parse_spotify_link,
};

const SEARCH_LIMIT: u32 = 10;
const OVERVIEW_TOP_LIMIT: u32 = 3;
const DEFAULT_TOP_LIMIT: u32 = 20;
const MAX_TOP_LIMIT: u32 = 50;

const NO_DEVICE_MESSAGE: &str =
    "No active Spotify device found. Please make sure Spotify is open on one of your devices.";
const NOTHING_PLAYING_MESSAGE: &str =
    "No device is currently playing. Please start playback on one of your devices.";
const NO_ACTIVE_DEVICE_MESSAGE: &str =
    "No active device found. Please make sure Spotify is the active device.";

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
struct TimeRangeQuery {
    pub time_range: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct UriBody {
    #[serde(default)]
    pub spotify_uri: String,
}

#[derive(Serialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_at: i64,
}

#[derive(Serialize)]
struct RatedTrack {
    #[serde(flatten)]
    track: Track,
    rating: RatingSummary,
    user_rating: Option<u8>,
}

#[derive(Serialize)]
struct SearchResponse {
    tracks: Vec<RatedTrack>,
    albums: Vec<Album>,
}

#[derive(Serialize)]
struct OverviewResponse {
    profile: SpotifyProfile,
    currently_playing: Option<CurrentlyPlaying>,
    top_artists: Vec<Artist>,
    top_tracks: Vec<Track>,
    time_range: TimeRange,
}

fn parse_time_range(value: Option<&str>) -> Result<TimeRange, ApiError> {
    match value {
        None | Some("") => Ok(TimeRange::default()),
        Some(value) => value.parse().map_err(|_| {
            ApiError::bad_request("time_range must be short_term, medium_term or long_term")
        }),
    }
}

/// Accepts either a `spotify:` URI or an open.spotify.com link.
fn resolve_uri(input: &str) -> Result<String, ApiError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ApiError::bad_request("No track URI provided"));
    }
    parse_spotify_link(input)
        .map(|link| link.uri())
        .ok_or_else(|| ApiError::bad_request("Invalid Spotify URI"))
}

async fn access_token(state: &ServerState, user_id: usize) -> Result<String, ApiError> {
    Ok(fresh_access_token(&state.user_manager, state.provider.as_ref(), user_id).await?)
}

// =============================================================================
// Account linking
// =============================================================================

async fn login(State(state): State<ServerState>, session: Option<Session>) -> ApiResult {
    let oauth_state = state
        .oauth_states
        .issue(session.as_ref().map(|s| s.user_id))
        .await;
    let url = state
        .provider
        .authorize_url(&oauth_state)
        .map_err(|err| ApiError::provider("authorize", err))?;
    Ok(Redirect::to(&url).into_response())
}

async fn callback(
    State(state): State<ServerState>,
    session: Option<Session>,
    jar: CookieJar,
    ApiQuery(query): ApiQuery<CallbackQuery>,
) -> ApiResult {
    if let Some(error) = query.error {
        info!("Spotify authorization was not granted: {}", error);
        return Err(ApiError::bad_request("Spotify authorization was not granted"));
    }
    let (code, oauth_state) = match (query.code, query.state) {
        (Some(code), Some(oauth_state)) => (code, oauth_state),
        _ => return Err(ApiError::bad_request("Missing code or state")),
    };
    let pending = state
        .oauth_states
        .consume(&oauth_state)
        .await
        .ok_or_else(|| ApiError::bad_request("Invalid or expired authorization state"))?;

    // A session that started the flow wins over one that shows up afterwards.
    let linking_user = pending.user_id.or(session.as_ref().map(|s| s.user_id));
    let user_id = complete_authorization(
        &state.user_manager,
        state.provider.as_ref(),
        &code,
        linking_user,
    )
    .await?;

    let redirect = Redirect::to(&state.config.post_login_redirect);
    if linking_user.is_some() {
        return Ok(redirect.into_response());
    }

    let auth_token = state.user_manager.generate_auth_token(user_id)?;
    let jar = jar.add(session_cookie(&auth_token.value.0));
    Ok((jar, redirect).into_response())
}

async fn disconnect(State(user_manager): State<GuardedUserManager>, session: Session) -> ApiResult {
    let removed = user_manager.unlink_provider_account(session.user_id)?;
    debug!(
        "Disconnect of user {}: removed account {}",
        session.user_id, removed
    );
    Ok(ok(()))
}

async fn get_token(State(state): State<ServerState>, session: Session) -> ApiResult {
    let access_token = access_token(&state, session.user_id).await?;
    let expires_at = state
        .user_manager
        .get_provider_account(session.user_id)?
        .map(|account| account.expires_at)
        .unwrap_or_default();
    Ok(ok(AccessTokenResponse {
        access_token,
        expires_at,
    }))
}

// =============================================================================
// Catalog
// =============================================================================

async fn search(
    State(state): State<ServerState>,
    session: Session,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(ok(SearchResponse {
            tracks: vec![],
            albums: vec![],
        }));
    }

    let token = access_token(&state, session.user_id).await?;
    let (tracks, albums) = tokio::try_join!(
        state.provider.search_tracks(&token, q, SEARCH_LIMIT),
        state.provider.search_albums(&token, q, SEARCH_LIMIT),
    )
    .map_err(|err| ApiError::provider("search", err))?;

    let tracks = rate_tracks(&state.social_manager, session.user_id, tracks)?;
    Ok(ok(SearchResponse { tracks, albums }))
}

fn rate_tracks(
    social: &GuardedSocialManager,
    user_id: usize,
    tracks: Vec<Track>,
) -> Result<Vec<RatedTrack>, ApiError> {
    let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
    let own_ratings = social.user_ratings(user_id, &ids)?;
    tracks
        .into_iter()
        .map(|track| {
            Ok(RatedTrack {
                rating: social.rating_summary(&track.id)?,
                user_rating: own_ratings.get(&track.id).copied(),
                track,
            })
        })
        .collect()
}

async fn overview(
    State(state): State<ServerState>,
    session: Session,
    ApiQuery(query): ApiQuery<TimeRangeQuery>,
) -> ApiResult {
    let time_range = parse_time_range(query.time_range.as_deref())?;
    let token = access_token(&state, session.user_id).await?;
    let (profile, currently_playing, top_artists, top_tracks) = tokio::try_join!(
        state.provider.current_user(&token),
        state.provider.currently_playing(&token),
        state
            .provider
            .top_artists(&token, time_range, OVERVIEW_TOP_LIMIT),
        state
            .provider
            .top_tracks(&token, time_range, OVERVIEW_TOP_LIMIT),
    )
    .map_err(|err| ApiError::provider("overview", err))?;

    Ok(ok(OverviewResponse {
        profile,
        currently_playing,
        top_artists,
        top_tracks,
        time_range,
    }))
}

async fn top_items(
    State(state): State<ServerState>,
    session: Session,
    ApiPath(kind): ApiPath<String>,
    ApiQuery(query): ApiQuery<TimeRangeQuery>,
) -> ApiResult {
    let time_range = parse_time_range(query.time_range.as_deref())?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TOP_LIMIT)
        .clamp(1, MAX_TOP_LIMIT);
    let token = access_token(&state, session.user_id).await?;
    match kind.as_str() {
        "artists" => {
            let artists = state
                .provider
                .top_artists(&token, time_range, limit)
                .await
                .map_err(|err| ApiError::provider("top artists", err))?;
            Ok(ok(artists))
        }
        "tracks" => {
            let tracks = state
                .provider
                .top_tracks(&token, time_range, limit)
                .await
                .map_err(|err| ApiError::provider("top tracks", err))?;
            Ok(ok(tracks))
        }
        _ => Err(ApiError::not_found("Top items are either artists or tracks")),
    }
}

async fn album_tracks(
    State(state): State<ServerState>,
    session: Session,
    ApiPath(album_id): ApiPath<String>,
) -> ApiResult {
    let token = access_token(&state, session.user_id).await?;
    let tracks = state
        .provider
        .get_album_tracks(&token, &album_id)
        .await
        .map_err(|err| ApiError::provider("album tracks", err))?;
    Ok(ok(rate_tracks(&state.social_manager, session.user_id, tracks)?))
}

// =============================================================================
// Playback and playlists
// =============================================================================

async fn queue(
    State(state): State<ServerState>,
    session: Session,
    ApiJson(body): ApiJson<UriBody>,
) -> ApiResult {
    let token = access_token(&state, session.user_id).await?;
    let uri = resolve_uri(&body.spotify_uri)?;

    let devices = state
        .provider
        .devices(&token)
        .await
        .map_err(|err| ApiError::provider("devices", err))?;
    if devices.is_empty() {
        return Err(ApiError::new(StatusCode::CONFLICT, NO_DEVICE_MESSAGE));
    }

    let playback = state
        .provider
        .current_playback(&token)
        .await
        .map_err(|err| ApiError::provider("playback", err))?;
    if !playback.is_some_and(|p| p.is_playing) {
        return Err(ApiError::new(StatusCode::CONFLICT, NOTHING_PLAYING_MESSAGE));
    }

    let active = devices
        .into_iter()
        .find(|device| device.is_active)
        .ok_or_else(|| ApiError::new(StatusCode::CONFLICT, NO_ACTIVE_DEVICE_MESSAGE))?;

    state
        .provider
        .add_to_queue(&token, &uri, active.id)
        .await
        .map_err(|err| ApiError::provider("queue", err))?;
    Ok(ok(()))
}

async fn listen_later(
    State(state): State<ServerState>,
    session: Session,
    ApiJson(body): ApiJson<UriBody>,
) -> ApiResult {
    let playlist_id = state
        .user_manager
        .get_listen_later_playlist(session.user_id)?
        .ok_or_else(|| ApiError::bad_request("No listen-later playlist configured"))?;
    let uri = resolve_uri(&body.spotify_uri)?;
    let token = access_token(&state, session.user_id).await?;
    state
        .provider
        .add_to_playlist(&token, &playlist_id, &uri)
        .await
        .map_err(|err| ApiError::provider("playlist add", err))?;
    Ok(ok(()))
}

async fn remove_from_playlist(
    State(state): State<ServerState>,
    session: Session,
    ApiPath(playlist_id): ApiPath<String>,
    ApiJson(body): ApiJson<UriBody>,
) -> ApiResult {
    let uri = resolve_uri(&body.spotify_uri)?;
    let token = access_token(&state, session.user_id).await?;
    if let Err(err) = state
        .provider
        .remove_from_playlist(&token, &playlist_id, &uri)
        .await
    {
        warn!("Removing {} from playlist {} failed", uri, playlist_id);
        return Err(ApiError::provider("playlist remove", err));
    }
    Ok(ok(()))
}

// =============================================================================
// Router Construction
// =============================================================================

pub fn spotify_routes() -> Router<ServerState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/disconnect", post(disconnect))
        .route("/token", get(get_token))
        .route("/search", get(search))
        .route("/overview", get(overview))
        .route("/top/{kind}", get(top_items))
        .route("/albums/{id}/tracks", get(album_tracks))
        .route("/queue", post(queue))
        .route("/listen-later", post(listen_later))
        .route("/playlists/{id}/remove", post(remove_from_playlist))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_defaults_to_medium_term() {
        assert_eq!(parse_time_range(None).unwrap(), TimeRange::MediumTerm);
        assert_eq!(parse_time_range(Some("")).unwrap(), TimeRange::MediumTerm);
        assert_eq!(
            parse_time_range(Some("long_term")).unwrap(),
            TimeRange::LongTerm
        );
        let err = parse_time_range(Some("forever")).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn resolves_links_and_uris() {
        assert_eq!(
            resolve_uri("spotify:track:4uLU6hMCjMI75M1A2tKUQC").unwrap(),
            "spotify:track:4uLU6hMCjMI75M1A2tKUQC"
        );
        assert_eq!(
            resolve_uri("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=x").unwrap(),
            "spotify:track:4uLU6hMCjMI75M1A2tKUQC"
        );
        assert_eq!(
            resolve_uri("  ").unwrap_err().message,
            "No track URI provided"
        );
        assert_eq!(
            resolve_uri("not a link").unwrap_err().status,
            StatusCode::BAD_REQUEST
        );
    }
}
