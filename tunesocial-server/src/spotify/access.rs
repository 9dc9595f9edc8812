//! Linking Spotify accounts to local users and keeping their tokens fresh.

use thiserror::Error;
use tracing::{debug, info, warn};

use super::provider::MusicProvider;
use crate::user::{ProviderAccount, ProviderIdentity, UserError, UserManager};

/// Tokens expiring within this many seconds are refreshed before use.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum SpotifyAccessError {
    #[error("Spotify account not connected")]
    NotConnected,

    #[error("Spotify session expired, please reconnect your account")]
    ReconnectRequired,

    #[error(transparent)]
    User(#[from] UserError),

    #[error("Spotify request failed: {0:#}")]
    Provider(#[source] anyhow::Error),
}

pub type SpotifyAccessResult<T> = std::result::Result<T, SpotifyAccessError>;

/// Returns a usable access token for the user, refreshing it when it is
/// about to expire.
pub async fn fresh_access_token(
    user_manager: &UserManager,
    provider: &dyn MusicProvider,
    user_id: usize,
) -> SpotifyAccessResult<String> {
    let account = user_manager
        .get_provider_account(user_id)?
        .ok_or(SpotifyAccessError::NotConnected)?;

    let now = chrono::Utc::now().timestamp();
    if account.expires_at - now > TOKEN_REFRESH_MARGIN_SECS {
        return Ok(account.access_token);
    }

    let refresh_token = account
        .refresh_token
        .clone()
        .ok_or(SpotifyAccessError::ReconnectRequired)?;

    debug!("Refreshing Spotify token of user {}", user_id);
    let response = match provider.refresh_access_token(&refresh_token).await {
        Ok(response) => response,
        Err(err) => {
            warn!("Token refresh for user {} failed: {:#}", user_id, err);
            return Err(SpotifyAccessError::ReconnectRequired);
        }
    };

    let refreshed = ProviderAccount {
        access_token: response.access_token,
        refresh_token: response.refresh_token.or(account.refresh_token),
        expires_at: now + response.expires_in,
        ..account
    };
    user_manager.link_provider_account(&refreshed)?;
    Ok(refreshed.access_token)
}

/// Finishes an authorization-code flow: exchanges the code, resolves the
/// local user and stores the tokens. `user_id` is set when an already
/// logged-in user started the flow.
pub async fn complete_authorization(
    user_manager: &UserManager,
    provider: &dyn MusicProvider,
    code: &str,
    user_id: Option<usize>,
) -> SpotifyAccessResult<usize> {
    let tokens = provider
        .exchange_code(code)
        .await
        .map_err(SpotifyAccessError::Provider)?;
    let profile = provider
        .current_user(&tokens.access_token)
        .await
        .map_err(SpotifyAccessError::Provider)?;

    let user_id = match user_id {
        Some(user_id) => user_id,
        None => user_manager.find_or_create_provider_user(&ProviderIdentity {
            provider_user_id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            email: profile.email.clone(),
        })?,
    };

    let account = ProviderAccount {
        user_id,
        provider_user_id: profile.id,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_at: chrono::Utc::now().timestamp() + tokens.expires_in,
    };
    user_manager.link_provider_account(&account)?;
    info!(
        "Linked Spotify account {} to user {}",
        account.provider_user_id, user_id
    );
    Ok(user_id)
}
