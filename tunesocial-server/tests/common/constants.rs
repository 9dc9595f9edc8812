//! Shared constants for end-to-end tests
//!
//! When test data changes (user credentials, fake catalog IDs, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user handle, with a connected Spotify account
pub const TEST_USER: &str = "alice";

/// Regular test user password
pub const TEST_PASS: &str = "alicepass123";

/// Second user, with a connected Spotify account
pub const OTHER_USER: &str = "bob";

/// Second user password
pub const OTHER_PASS: &str = "bobpass1234";

/// Third user, never connected to Spotify
pub const OFFLINE_USER: &str = "carol";

/// Third user password
pub const OFFLINE_PASS: &str = "carolpass123";

// ============================================================================
// Fake Spotify Catalog
// ============================================================================

/// "Opening Track" by The Test Band
pub const TRACK_1_ID: &str = "4uLU6hMCjMI75M1A2tKUQC";

/// "Middle Track" by The Test Band
pub const TRACK_2_ID: &str = "7ouMYWpwJ422jRcDASZB7P";

/// "Smooth Jazz" by Jazz Ensemble
pub const TRACK_3_ID: &str = "0VjIjW4GlUZAMYd2vXMi3b";

/// "First Album" by The Test Band
pub const ALBUM_1_ID: &str = "1A2GTWGtFfWp7KSQTwWOyo";

pub const TRACK_1_TITLE: &str = "Opening Track";
pub const TRACK_2_TITLE: &str = "Middle Track";
pub const TRACK_3_TITLE: &str = "Smooth Jazz";
pub const ALBUM_1_TITLE: &str = "First Album";
pub const ARTIST_1_NAME: &str = "The Test Band";
pub const ARTIST_2_NAME: &str = "Jazz Ensemble";

/// Authorization code the fake provider accepts, linked to a fresh Spotify account
pub const VALID_AUTH_CODE: &str = "valid-code";

/// Spotify user id returned for [`VALID_AUTH_CODE`]
pub const NEW_SPOTIFY_USER_ID: &str = "dave-spotify";

/// Display name returned for [`VALID_AUTH_CODE`]
pub const NEW_SPOTIFY_DISPLAY_NAME: &str = "Dave Grohl";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Duplicate post window used by default in tests (seconds)
pub const TEST_DUPLICATE_WINDOW_SECS: u64 = 30;

pub fn track_link(track_id: &str) -> String {
    format!("https://open.spotify.com/track/{}", track_id)
}

pub fn album_link(album_id: &str) -> String {
    format!("https://open.spotify.com/album/{}", album_id)
}

pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}
