//! Social routes: profiles, follows, the feed, posts, comments and track ratings.

use axum::{
    extract::State,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::api_response::{created, ok, ApiError, ApiResult};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::metrics::record_social_action;
use super::session::Session;
use super::state::{GuardedMusicProvider, GuardedSocialManager, GuardedUserManager, ServerState};
use crate::social::{parse_rating, Page, PostEdit, PostSubject, RatingSummary};
use crate::spotify::{fresh_access_token, parse_spotify_link, LinkKind};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct PaginationQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PaginationQuery {
    fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}

#[derive(Debug, Deserialize)]
struct CreatePostBody {
    pub spotify_link: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Deserialize)]
struct CommentBody {
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct RateTrackBody {
    pub rating: i64,
}

#[derive(Serialize)]
struct FollowResponse {
    following: bool,
    followers_count: usize,
}

#[derive(Serialize)]
struct TrackRatingResponse {
    track_id: String,
    summary: RatingSummary,
    rating: Option<u8>,
}

// =============================================================================
// Users
// =============================================================================

async fn get_user_profile(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiPath(user_id): ApiPath<usize>,
) -> ApiResult {
    Ok(ok(social.profile(session.user_id, user_id)?))
}

async fn get_user_posts(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiPath(user_id): ApiPath<usize>,
    ApiQuery(pagination): ApiQuery<PaginationQuery>,
) -> ApiResult {
    Ok(ok(social.user_posts(
        session.user_id,
        user_id,
        pagination.page(),
    )?))
}

async fn get_followers(
    State(social): State<GuardedSocialManager>,
    _session: Session,
    ApiPath(user_id): ApiPath<usize>,
) -> ApiResult {
    Ok(ok(social.followers(user_id)?))
}

async fn get_following(
    State(social): State<GuardedSocialManager>,
    _session: Session,
    ApiPath(user_id): ApiPath<usize>,
) -> ApiResult {
    Ok(ok(social.following(user_id)?))
}

fn follow_response(
    social: &GuardedSocialManager,
    viewer_id: usize,
    user_id: usize,
) -> ApiResult {
    let profile = social.profile(viewer_id, user_id)?;
    Ok(ok(FollowResponse {
        following: profile.is_following,
        followers_count: profile.followers_count,
    }))
}

async fn follow_user(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiPath(user_id): ApiPath<usize>,
) -> ApiResult {
    if social.follow(session.user_id, user_id)? {
        record_social_action("follow");
    }
    follow_response(&social, session.user_id, user_id)
}

async fn unfollow_user(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiPath(user_id): ApiPath<usize>,
) -> ApiResult {
    if social.unfollow(session.user_id, user_id)? {
        record_social_action("unfollow");
    }
    follow_response(&social, session.user_id, user_id)
}

// =============================================================================
// Feed and posts
// =============================================================================

async fn get_feed(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiQuery(pagination): ApiQuery<PaginationQuery>,
) -> ApiResult {
    Ok(ok(social.feed(session.user_id, pagination.page())?))
}

async fn create_post(
    State(state): State<ServerState>,
    session: Session,
    ApiJson(body): ApiJson<CreatePostBody>,
) -> ApiResult {
    let link = parse_spotify_link(&body.spotify_link).ok_or_else(|| {
        ApiError::bad_request("Invalid Spotify link. Please provide a valid track or album link")
    })?;

    let access_token =
        fresh_access_token(&state.user_manager, state.provider.as_ref(), session.user_id).await?;
    let subject = match link.kind {
        LinkKind::Track => state
            .provider
            .get_track(&access_token, &link.id)
            .await
            .map_err(|err| ApiError::provider("track lookup", err))?
            .post_subject(),
        LinkKind::Album => state
            .provider
            .get_album(&access_token, &link.id)
            .await
            .map_err(|err| ApiError::provider("album lookup", err))?
            .post_subject(),
    };

    let post = state.social_manager.create_post(
        session.user_id,
        link.kind.post_type(),
        subject,
        &body.content,
        body.is_private,
    )?;
    record_social_action("post");
    Ok(created(post))
}

async fn get_post(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiPath(post_id): ApiPath<usize>,
) -> ApiResult {
    Ok(ok(social.get_post(session.user_id, post_id)?))
}

async fn put_post(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiPath(post_id): ApiPath<usize>,
    ApiJson(edit): ApiJson<PostEdit>,
) -> ApiResult {
    Ok(ok(social.edit_post(session.user_id, post_id, &edit)?))
}

async fn delete_post(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiPath(post_id): ApiPath<usize>,
) -> ApiResult {
    social.delete_post(session.user_id, post_id)?;
    Ok(ok(()))
}

async fn like_post(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiPath(post_id): ApiPath<usize>,
) -> ApiResult {
    let post = social.like(session.user_id, post_id)?;
    record_social_action("like");
    Ok(ok(post))
}

async fn unlike_post(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiPath(post_id): ApiPath<usize>,
) -> ApiResult {
    Ok(ok(social.unlike(session.user_id, post_id)?))
}

async fn get_comments(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiPath(post_id): ApiPath<usize>,
) -> ApiResult {
    Ok(ok(social.comments(session.user_id, post_id)?))
}

async fn add_comment(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiPath(post_id): ApiPath<usize>,
    ApiJson(body): ApiJson<CommentBody>,
) -> ApiResult {
    let comment = social.add_comment(session.user_id, post_id, &body.content)?;
    record_social_action("comment");
    Ok(created(comment))
}

async fn delete_comment(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiPath((post_id, comment_id)): ApiPath<(usize, usize)>,
) -> ApiResult {
    social.delete_comment(session.user_id, post_id, comment_id)?;
    Ok(ok(()))
}

// =============================================================================
// Track ratings
// =============================================================================

async fn get_track_rating(
    State(social): State<GuardedSocialManager>,
    session: Session,
    ApiPath(track_id): ApiPath<String>,
) -> ApiResult {
    Ok(ok(TrackRatingResponse {
        summary: social.rating_summary(&track_id)?,
        rating: social.track_rating(session.user_id, &track_id)?,
        track_id,
    }))
}

/// Looks the track up so that the rating can be announced with a post.
/// Rating still works when the lookup is not possible.
async fn rating_subject(
    user_manager: &GuardedUserManager,
    provider: &GuardedMusicProvider,
    user_id: usize,
    track_id: &str,
) -> Option<PostSubject> {
    let access_token = match fresh_access_token(user_manager, provider.as_ref(), user_id).await {
        Ok(token) => token,
        Err(err) => {
            debug!("Rating track {} without metadata: {}", track_id, err);
            return None;
        }
    };
    match provider.get_track(&access_token, track_id).await {
        Ok(track) => Some(track.post_subject()),
        Err(err) => {
            warn!("Could not look up rated track {}: {:#}", track_id, err);
            None
        }
    }
}

async fn put_track_rating(
    State(state): State<ServerState>,
    session: Session,
    ApiPath(track_id): ApiPath<String>,
    ApiJson(body): ApiJson<RateTrackBody>,
) -> ApiResult {
    let rating = parse_rating(body.rating)?;
    let subject = rating_subject(
        &state.user_manager,
        &state.provider,
        session.user_id,
        &track_id,
    )
    .await;
    let outcome =
        state
            .social_manager
            .rate_track(session.user_id, &track_id, rating, subject.as_ref())?;
    record_social_action("rating");
    Ok(ok(outcome))
}

// =============================================================================
// Router Construction
// =============================================================================

/// - GET /users/{id}, /users/{id}/posts, /users/{id}/followers, /users/{id}/following
/// - POST|DELETE /users/{id}/follow
/// - GET /feed
/// - POST /posts, GET|PUT|DELETE /posts/{id}
/// - POST|DELETE /posts/{id}/like
/// - GET|POST /posts/{id}/comments, DELETE /posts/{id}/comments/{comment_id}
/// - GET|PUT /tracks/{id}/rating
pub fn social_routes() -> Router<ServerState> {
    let user_routes = Router::new()
        .route("/{id}", get(get_user_profile))
        .route("/{id}/posts", get(get_user_posts))
        .route("/{id}/followers", get(get_followers))
        .route("/{id}/following", get(get_following))
        .route("/{id}/follow", post(follow_user).delete(unfollow_user));

    let post_routes = Router::new()
        .route("/", post(create_post))
        .route("/{id}", get(get_post).put(put_post).delete(delete_post))
        .route("/{id}/like", post(like_post).delete(unlike_post))
        .route("/{id}/comments", get(get_comments).post(add_comment))
        .route("/{id}/comments/{comment_id}", delete(delete_comment));

    let track_routes =
        Router::new().route("/{id}/rating", get(get_track_rating).put(put_track_rating));

    Router::new()
        .route("/feed", get(get_feed))
        .nest("/users", user_routes)
        .nest("/posts", post_routes)
        .nest("/tracks", track_routes)
}
