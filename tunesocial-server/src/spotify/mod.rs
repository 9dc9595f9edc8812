mod access;
mod client;
mod link;
pub mod models;
mod oauth_state;
mod provider;

pub use access::{
    complete_authorization, fresh_access_token, SpotifyAccessError, SpotifyAccessResult,
    TOKEN_REFRESH_MARGIN_SECS,
};
pub use client::{
    SpotifyClient, SpotifyClientConfig, DEFAULT_ACCOUNTS_BASE_URL, DEFAULT_API_BASE_URL,
    DEFAULT_SCOPES,
};
pub use link::{parse_spotify_link, LinkKind, SpotifyLink};
pub use oauth_state::{OAuthStateStore, PendingAuthorization, DEFAULT_STATE_TTL_SECS};
pub use provider::{MusicProvider, UnconfiguredProvider, NOT_CONFIGURED_MESSAGE};
