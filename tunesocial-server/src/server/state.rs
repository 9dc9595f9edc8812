use axum::extract::FromRef;

use crate::social::SocialManager;
use crate::spotify::{MusicProvider, OAuthStateStore};
use crate::user::UserManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedSocialManager = Arc<SocialManager>;
pub type GuardedMusicProvider = Arc<dyn MusicProvider>;
pub type GuardedOAuthStateStore = Arc<OAuthStateStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub user_manager: GuardedUserManager,
    pub social_manager: GuardedSocialManager,
    pub provider: GuardedMusicProvider,
    pub oauth_states: GuardedOAuthStateStore,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedSocialManager {
    fn from_ref(input: &ServerState) -> Self {
        input.social_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedMusicProvider {
    fn from_ref(input: &ServerState) -> Self {
        input.provider.clone()
    }
}

impl FromRef<ServerState> for GuardedOAuthStateStore {
    fn from_ref(input: &ServerState) -> Self {
        input.oauth_states.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
