//! End-to-end tests for registration, login, sessions and the own account

mod common;

use common::{body_json, data, TestClient, TestServer, OTHER_USER, TEST_PASS, TEST_USER};
use reqwest::StatusCode;

#[tokio::test]
async fn test_home_is_public() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.home().await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = data(response).await;
    assert_eq!(stats["logged_in"], false);
    assert!(stats["hash"].is_string());
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(TEST_USER, TEST_PASS).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.cookies().any(|c| c.name() == "session_token"));
    let body = data(response).await;
    assert_eq!(body["user_id"], server.alice_id);

    let response = client.session().await;
    assert_eq!(response.status(), StatusCode::OK);
    let user = data(response).await;
    assert_eq!(user["handle"], TEST_USER);
}

#[tokio::test]
async fn test_login_with_wrong_password_fails() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(TEST_USER, "not-the-password").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid username or password");

    let response = client.session().await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bearer_token_authenticates() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(TEST_USER, TEST_PASS).await;
    let token = data(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = reqwest::Client::new()
        .get(format!("{}/v1/auth/session", server.base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.logout().await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.session().await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_logs_in() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .register("dj.eve", "eve@example.com", "evepassword", "evepassword")
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let user = data(client.session().await).await;
    assert_eq!(user["handle"], "dj.eve");
}

#[tokio::test]
async fn test_register_validation() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .register("eve", "eve@example.com", "evepassword", "different1")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Passwords do not match");

    let response = client
        .register("eve", "eve@example.com", "short", "short")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .register("eve has spaces", "eve@example.com", "evepassword", "evepassword")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .register(TEST_USER, "other@example.com", "evepassword", "evepassword")
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client
        .register("eve", "alice@example.com", "evepassword", "evepassword")
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_rename_and_top_picks() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.rename(OTHER_USER).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client.rename("alice_in_chains").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(data(response).await["handle"], "alice_in_chains");

    let response = client
        .set_top_pick("album", 1, "1A2GTWGtFfWp7KSQTwWOyo", "First Album")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let picks = data(response).await;
    assert_eq!(picks.as_array().unwrap().len(), 1);

    let response = client.set_top_pick("album", 4, "x", "Out of range").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client.set_top_pick("playlist", 1, "x", "Wrong kind").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let profile = data(client.own_profile().await).await;
    assert_eq!(profile["provider_linked"], true);
    assert_eq!(profile["top_picks"].as_array().unwrap().len(), 1);

    let response = client.clear_top_pick("album", 1).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(data(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    assert_eq!(client.own_profile().await.status(), StatusCode::FORBIDDEN);
    assert_eq!(client.feed(None, None).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        client.user_profile(server.alice_id).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        client
            .create_post("https://open.spotify.com/track/abc", "", false)
            .await
            .status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(client.rate_track("abc", 3).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(client.search("x").await.status(), StatusCode::FORBIDDEN);
    assert_eq!(client.queue("spotify:track:abc").await.status(), StatusCode::FORBIDDEN);
}
