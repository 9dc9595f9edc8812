//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

/// Reads the JSON envelope of a response.
pub async fn body_json(response: Response) -> Value {
    response
        .json::<Value>()
        .await
        .expect("Response body is not JSON")
}

/// Reads the `data` field of a successful envelope.
pub async fn data(response: Response) -> Value {
    let body = body_json(response).await;
    assert_eq!(body["success"], true, "Unexpected failure: {}", body);
    body["data"].clone()
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Redirects are not followed so that OAuth redirects can be inspected.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client logged in as the given user
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated_as(base_url: String, handle: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(handle, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Authentication of {} failed: {:?}",
            handle,
            response.text().await
        );

        client
    }

    /// Creates a client pre-authenticated as the main test user
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_USER, TEST_PASS).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed")
    }

    async fn post_json(&self, path: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("POST request failed")
    }

    async fn put_json(&self, path: &str, body: Value) -> Response {
        self.client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("PUT request failed")
    }

    /// GET /
    pub async fn home(&self) -> Response {
        self.get("/").await
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/register
    pub async fn register(
        &self,
        handle: &str,
        email: &str,
        password: &str,
        password_confirm: &str,
    ) -> Response {
        self.post_json(
            "/v1/auth/register",
            json!({
                "handle": handle,
                "email": email,
                "password": password,
                "password_confirm": password_confirm,
            }),
        )
        .await
    }

    /// POST /v1/auth/login
    pub async fn login(&self, handle: &str, password: &str) -> Response {
        self.post_json(
            "/v1/auth/login",
            json!({ "handle": handle, "password": password }),
        )
        .await
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.get("/v1/auth/logout").await
    }

    /// GET /v1/auth/session
    pub async fn session(&self) -> Response {
        self.get("/v1/auth/session").await
    }

    // ========================================================================
    // Own Account Endpoints
    // ========================================================================

    /// GET /v1/user/profile
    pub async fn own_profile(&self) -> Response {
        self.get("/v1/user/profile").await
    }

    /// PUT /v1/user/handle
    pub async fn rename(&self, handle: &str) -> Response {
        self.put_json("/v1/user/handle", json!({ "handle": handle }))
            .await
    }

    /// PUT /v1/user/top/{kind}/{position}
    pub async fn set_top_pick(&self, kind: &str, position: u8, item_id: &str, name: &str) -> Response {
        self.put_json(
            &format!("/v1/user/top/{}/{}", kind, position),
            json!({ "item_id": item_id, "name": name }),
        )
        .await
    }

    /// DELETE /v1/user/top/{kind}/{position}
    pub async fn clear_top_pick(&self, kind: &str, position: u8) -> Response {
        self.delete(&format!("/v1/user/top/{}/{}", kind, position))
            .await
    }

    /// PUT /v1/user/listen-later
    pub async fn set_listen_later_playlist(&self, playlist_id: Option<&str>) -> Response {
        self.put_json(
            "/v1/user/listen-later",
            json!({ "playlist_id": playlist_id }),
        )
        .await
    }

    // ========================================================================
    // Users and Follows
    // ========================================================================

    /// GET /v1/users/{id}
    pub async fn user_profile(&self, user_id: usize) -> Response {
        self.get(&format!("/v1/users/{}", user_id)).await
    }

    /// GET /v1/users/{id}/posts
    pub async fn user_posts(&self, user_id: usize) -> Response {
        self.get(&format!("/v1/users/{}/posts", user_id)).await
    }

    /// GET /v1/users/{id}/followers
    pub async fn followers(&self, user_id: usize) -> Response {
        self.get(&format!("/v1/users/{}/followers", user_id)).await
    }

    /// GET /v1/users/{id}/following
    pub async fn following(&self, user_id: usize) -> Response {
        self.get(&format!("/v1/users/{}/following", user_id)).await
    }

    /// POST /v1/users/{id}/follow
    pub async fn follow(&self, user_id: usize) -> Response {
        self.client
            .post(self.url(&format!("/v1/users/{}/follow", user_id)))
            .send()
            .await
            .expect("Follow request failed")
    }

    /// DELETE /v1/users/{id}/follow
    pub async fn unfollow(&self, user_id: usize) -> Response {
        self.delete(&format!("/v1/users/{}/follow", user_id)).await
    }

    // ========================================================================
    // Feed and Posts
    // ========================================================================

    /// GET /v1/feed
    pub async fn feed(&self, limit: Option<usize>, offset: Option<usize>) -> Response {
        let mut query = vec![];
        if let Some(limit) = limit {
            query.push(("limit", limit));
        }
        if let Some(offset) = offset {
            query.push(("offset", offset));
        }
        self.client
            .get(self.url("/v1/feed"))
            .query(&query)
            .send()
            .await
            .expect("Feed request failed")
    }

    /// POST /v1/posts
    pub async fn create_post(&self, spotify_link: &str, content: &str, is_private: bool) -> Response {
        self.post_json(
            "/v1/posts",
            json!({
                "spotify_link": spotify_link,
                "content": content,
                "is_private": is_private,
            }),
        )
        .await
    }

    /// GET /v1/posts/{id}
    pub async fn get_post(&self, post_id: u64) -> Response {
        self.get(&format!("/v1/posts/{}", post_id)).await
    }

    /// PUT /v1/posts/{id}
    pub async fn edit_post(&self, post_id: u64, edit: Value) -> Response {
        self.put_json(&format!("/v1/posts/{}", post_id), edit).await
    }

    /// DELETE /v1/posts/{id}
    pub async fn delete_post(&self, post_id: u64) -> Response {
        self.delete(&format!("/v1/posts/{}", post_id)).await
    }

    /// POST /v1/posts/{id}/like
    pub async fn like(&self, post_id: u64) -> Response {
        self.client
            .post(self.url(&format!("/v1/posts/{}/like", post_id)))
            .send()
            .await
            .expect("Like request failed")
    }

    /// DELETE /v1/posts/{id}/like
    pub async fn unlike(&self, post_id: u64) -> Response {
        self.delete(&format!("/v1/posts/{}/like", post_id)).await
    }

    /// GET /v1/posts/{id}/comments
    pub async fn comments(&self, post_id: u64) -> Response {
        self.get(&format!("/v1/posts/{}/comments", post_id)).await
    }

    /// POST /v1/posts/{id}/comments
    pub async fn add_comment(&self, post_id: u64, content: &str) -> Response {
        self.post_json(
            &format!("/v1/posts/{}/comments", post_id),
            json!({ "content": content }),
        )
        .await
    }

    /// DELETE /v1/posts/{id}/comments/{comment_id}
    pub async fn delete_comment(&self, post_id: u64, comment_id: u64) -> Response {
        self.delete(&format!("/v1/posts/{}/comments/{}", post_id, comment_id))
            .await
    }

    // ========================================================================
    // Track Ratings
    // ========================================================================

    /// GET /v1/tracks/{id}/rating
    pub async fn track_rating(&self, track_id: &str) -> Response {
        self.get(&format!("/v1/tracks/{}/rating", track_id)).await
    }

    /// PUT /v1/tracks/{id}/rating
    pub async fn rate_track(&self, track_id: &str, rating: u8) -> Response {
        self.put_json(
            &format!("/v1/tracks/{}/rating", track_id),
            json!({ "rating": rating }),
        )
        .await
    }

    // ========================================================================
    // Spotify Endpoints
    // ========================================================================

    /// GET /v1/spotify/login
    pub async fn spotify_login(&self) -> Response {
        self.get("/v1/spotify/login").await
    }

    /// GET /v1/spotify/callback
    pub async fn spotify_callback(&self, code: &str, state: &str) -> Response {
        self.client
            .get(self.url("/v1/spotify/callback"))
            .query(&[("code", code), ("state", state)])
            .send()
            .await
            .expect("Callback request failed")
    }

    /// POST /v1/spotify/disconnect
    pub async fn spotify_disconnect(&self) -> Response {
        self.client
            .post(self.url("/v1/spotify/disconnect"))
            .send()
            .await
            .expect("Disconnect request failed")
    }

    /// GET /v1/spotify/token
    pub async fn spotify_token(&self) -> Response {
        self.get("/v1/spotify/token").await
    }

    /// GET /v1/spotify/search
    pub async fn search(&self, query: &str) -> Response {
        self.client
            .get(self.url("/v1/spotify/search"))
            .query(&[("q", query)])
            .send()
            .await
            .expect("Search request failed")
    }

    /// GET /v1/spotify/overview
    pub async fn overview(&self, time_range: Option<&str>) -> Response {
        let mut request = self.client.get(self.url("/v1/spotify/overview"));
        if let Some(time_range) = time_range {
            request = request.query(&[("time_range", time_range)]);
        }
        request.send().await.expect("Overview request failed")
    }

    /// GET /v1/spotify/top/{kind}
    pub async fn top(&self, kind: &str) -> Response {
        self.get(&format!("/v1/spotify/top/{}", kind)).await
    }

    /// GET /v1/spotify/albums/{id}/tracks
    pub async fn album_tracks(&self, album_id: &str) -> Response {
        self.get(&format!("/v1/spotify/albums/{}/tracks", album_id))
            .await
    }

    /// POST /v1/spotify/queue
    pub async fn queue(&self, spotify_uri: &str) -> Response {
        self.post_json("/v1/spotify/queue", json!({ "spotify_uri": spotify_uri }))
            .await
    }

    /// POST /v1/spotify/listen-later
    pub async fn listen_later(&self, spotify_uri: &str) -> Response {
        self.post_json(
            "/v1/spotify/listen-later",
            json!({ "spotify_uri": spotify_uri }),
        )
        .await
    }

    /// POST /v1/spotify/playlists/{id}/remove
    pub async fn remove_from_playlist(&self, playlist_id: &str, spotify_uri: &str) -> Response {
        self.post_json(
            &format!("/v1/spotify/playlists/{}/remove", playlist_id),
            json!({ "spotify_uri": spotify_uri }),
        )
        .await
    }
}
