use rand::Rng;
use rand_distr::Alphanumeric;
use std::collections::HashMap;
use tokio::sync::RwLock;

const STATE_LENGTH: usize = 32;
pub const DEFAULT_STATE_TTL_SECS: i64 = 600;

/// A pending authorization started by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingAuthorization {
    pub state: String,
    /// Set when a logged-in user is linking their account.
    pub user_id: Option<usize>,
    pub created_at: i64,
}

/// In-memory storage for OAuth `state` values. Each value can be consumed once.
pub struct OAuthStateStore {
    states: RwLock<HashMap<String, PendingAuthorization>>,
    ttl_secs: i64,
}

impl OAuthStateStore {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            ttl_secs,
        }
    }

    /// Generates and remembers a new state value.
    pub async fn issue(&self, user_id: Option<usize>) -> String {
        let state: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LENGTH)
            .map(char::from)
            .collect();
        let pending = PendingAuthorization {
            state: state.clone(),
            user_id,
            created_at: chrono::Utc::now().timestamp(),
        };
        let mut states = self.states.write().await;
        states.insert(state.clone(), pending);
        state
    }

    /// Removes and returns the pending authorization, unless it has expired.
    pub async fn consume(&self, state: &str) -> Option<PendingAuthorization> {
        let now = chrono::Utc::now().timestamp();
        let mut states = self.states.write().await;
        states
            .remove(state)
            .filter(|pending| now - pending.created_at < self.ttl_secs)
    }

    pub async fn cleanup_expired(&self) -> usize {
        let now = chrono::Utc::now().timestamp();
        let mut states = self.states.write().await;
        let before = states.len();
        states.retain(|_, pending| now - pending.created_at < self.ttl_secs);
        before - states.len()
    }
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_TTL_SECS)
    }
}
