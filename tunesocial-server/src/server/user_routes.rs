//! Routes for managing the caller's own account.

use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use serde::Deserialize;

use super::api_response::{ok, ApiError, ApiResult};
use super::extract::{ApiJson, ApiPath};
use super::session::Session;
use super::state::{GuardedUserManager, ServerState};
use crate::user::{TopPick, TopPickKind, UserError};

#[derive(Deserialize)]
struct RenameBody {
    pub handle: String,
}

#[derive(Deserialize)]
struct TopPickBody {
    pub item_id: String,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
struct ListenLaterBody {
    #[serde(default)]
    pub playlist_id: Option<String>,
}

fn parse_top_pick_position(position: u32) -> Result<u8, ApiError> {
    u8::try_from(position).map_err(|_| UserError::InvalidTopPickPosition.into())
}

fn parse_top_pick_kind(kind: &str) -> Result<TopPickKind, ApiError> {
    kind.parse()
        .map_err(|_| ApiError::bad_request("Top pick kind must be album or artist"))
}

async fn get_profile(State(user_manager): State<GuardedUserManager>, session: Session) -> ApiResult {
    Ok(ok(user_manager.get_own_profile(session.user_id)?))
}

async fn put_handle(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
    ApiJson(body): ApiJson<RenameBody>,
) -> ApiResult {
    let user = user_manager.rename(session.user_id, &body.handle)?;
    Ok(ok(user))
}

async fn put_top_pick(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
    ApiPath((kind, position)): ApiPath<(String, u32)>,
    ApiJson(body): ApiJson<TopPickBody>,
) -> ApiResult {
    let kind = parse_top_pick_kind(&kind)?;
    let position = parse_top_pick_position(position)?;
    if body.item_id.trim().is_empty() || body.name.trim().is_empty() {
        return Err(ApiError::bad_request("Top picks need an item id and a name"));
    }
    let pick = TopPick {
        kind,
        position,
        item_id: body.item_id.trim().to_string(),
        name: body.name.trim().to_string(),
        image_url: body.image_url.filter(|url| !url.is_empty()),
    };
    user_manager.set_top_pick(session.user_id, &pick)?;
    Ok(ok(user_manager.get_top_picks(session.user_id)?))
}

async fn delete_top_pick(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
    ApiPath((kind, position)): ApiPath<(String, u32)>,
) -> ApiResult {
    let kind = parse_top_pick_kind(&kind)?;
    let position = parse_top_pick_position(position)?;
    user_manager.clear_top_pick(session.user_id, kind, position)?;
    Ok(ok(user_manager.get_top_picks(session.user_id)?))
}

async fn put_listen_later(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
    ApiJson(body): ApiJson<ListenLaterBody>,
) -> ApiResult {
    user_manager.set_listen_later_playlist(session.user_id, body.playlist_id.as_deref())?;
    Ok(ok(user_manager.get_listen_later_playlist(session.user_id)?))
}

pub fn user_routes() -> Router<ServerState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/handle", put(put_handle))
        .route(
            "/top/{kind}/{position}",
            put(put_top_pick).delete(delete_top_pick),
        )
        .route("/listen-later", put(put_listen_later))
}
