use super::auth::{AuthToken, AuthTokenValue, UsernamePasswordCredentials};
use super::user_models::{ProviderAccount, TopPick, TopPickKind, User};
use anyhow::Result;

pub trait UserAuthCredentialsStore: Send + Sync {
    /// Returns the password credentials of the user with the given handle.
    /// Returns Ok(None) if the user does not exist or has no password.
    fn get_password_credentials(
        &self,
        user_handle: &str,
    ) -> Result<Option<UsernamePasswordCredentials>>;

    /// Creates or replaces the user's password credentials.
    fn set_password_credentials(&self, credentials: &UsernamePasswordCredentials) -> Result<()>;

    /// Records a login attempt against the user's password credentials.
    fn touch_password_credentials(&self, user_id: usize, succeeded: bool) -> Result<()>;
}

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns Ok(None) if the token does not exist.
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Deletes an auth token, returning it if it existed.
    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()>;

    fn add_user_auth_token(&self, token: &AuthToken) -> Result<()>;

    /// Deletes tokens neither used nor created in the last `unused_for_days` days.
    /// Returns the number of tokens that were deleted.
    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize>;
}

pub trait UserProviderAccountStore: Send + Sync {
    fn get_provider_account(&self, user_id: usize) -> Result<Option<ProviderAccount>>;

    /// Returns the id of the user linked to the given provider account.
    fn get_user_id_by_provider_user_id(&self, provider_user_id: &str) -> Result<Option<usize>>;

    /// Inserts or replaces the provider account of `account.user_id`.
    fn upsert_provider_account(&self, account: &ProviderAccount) -> Result<()>;

    /// Returns true if an account was removed.
    fn delete_provider_account(&self, user_id: usize) -> Result<bool>;
}

pub trait UserStore:
    UserAuthTokenStore + UserAuthCredentialsStore + UserProviderAccountStore + Send + Sync
{
    /// Creates a new user and returns the user id.
    fn create_user(&self, user_handle: &str, email: Option<&str>) -> Result<usize>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: usize) -> Result<Option<User>>;

    /// Returns the users with the given ids, skipping unknown ids.
    fn get_users(&self, user_ids: &[usize]) -> Result<Vec<User>>;

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>>;

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    fn set_user_handle(&self, user_id: usize, user_handle: &str) -> Result<()>;

    fn get_top_picks(&self, user_id: usize) -> Result<Vec<TopPick>>;

    /// Inserts or replaces the pick at `(pick.kind, pick.position)`.
    fn set_top_pick(&self, user_id: usize, pick: &TopPick) -> Result<()>;

    /// Returns true if a pick was removed.
    fn delete_top_pick(&self, user_id: usize, kind: TopPickKind, position: u8) -> Result<bool>;

    fn get_listen_later_playlist(&self, user_id: usize) -> Result<Option<String>>;

    fn set_listen_later_playlist(&self, user_id: usize, playlist_id: Option<&str>) -> Result<()>;
}
