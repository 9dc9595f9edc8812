//! TuneSocial Server Library
//!
//! A social layer over Spotify: accounts, posts about tracks and albums,
//! follows, likes, comments, track ratings and a feed. The modules are
//! exposed for the binary and for the end-to-end tests.

pub mod config;
pub mod server;
pub mod social;
pub mod spotify;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
pub use social::{SocialManager, SocialStore, SqliteSocialStore};
pub use spotify::{MusicProvider, OAuthStateStore, SpotifyClient, UnconfiguredProvider};
pub use user::{SqliteUserStore, UserManager, UserStore};
