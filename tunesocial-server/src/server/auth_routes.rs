//! Password authentication routes.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::api_response::{created, ok, ApiResult};
use super::extract::ApiJson;
use super::metrics::record_login_attempt;
use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::state::{GuardedUserManager, ServerState};
use crate::social::UserSummary;
use crate::user::AuthTokenValue;

#[derive(Deserialize, Debug)]
struct RegisterBody {
    pub handle: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Deserialize)]
struct LoginBody {
    pub handle: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    user_id: usize,
    token: String,
}

pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(Cookie::new(COOKIE_SESSION_TOKEN_KEY, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(Cookie::new(COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
        .same_site(SameSite::Lax)
        .build()
}

async fn register(
    State(user_manager): State<GuardedUserManager>,
    jar: CookieJar,
    ApiJson(body): ApiJson<RegisterBody>,
) -> ApiResult {
    debug!("register() called for handle {}", body.handle);
    let user_id = user_manager.register(
        &body.handle,
        &body.email,
        &body.password,
        &body.password_confirm,
    )?;
    let auth_token = user_manager.generate_auth_token(user_id)?;
    let jar = jar.add(session_cookie(&auth_token.value.0));
    let response = created(LoginSuccessResponse {
        user_id,
        token: auth_token.value.0,
    });
    Ok((jar, response).into_response())
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    jar: CookieJar,
    ApiJson(body): ApiJson<LoginBody>,
) -> ApiResult {
    let start = Instant::now();
    let result = user_manager.login(body.handle.trim(), &body.password);
    record_login_attempt(
        if result.is_ok() { "success" } else { "failure" },
        start.elapsed(),
    );
    let auth_token = result?;

    let jar = jar.add(session_cookie(&auth_token.value.0));
    let response = created(LoginSuccessResponse {
        user_id: auth_token.user_id,
        token: auth_token.value.0,
    });
    Ok((jar, response).into_response())
}

async fn logout(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
    jar: CookieJar,
) -> ApiResult {
    user_manager.logout(session.user_id, &AuthTokenValue(session.token))?;
    let jar = jar.add(expired_session_cookie());
    Ok((jar, ok(())).into_response())
}

async fn get_session(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> ApiResult {
    let user = user_manager.get_user(session.user_id)?;
    Ok(ok(UserSummary::from(&user)))
}

/// - POST /register
/// - POST /login
/// - GET /logout
/// - GET /session
pub fn auth_routes() -> Router<ServerState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/session", get(get_session))
}
