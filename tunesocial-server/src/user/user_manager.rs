use super::{
    auth::{AuthToken, AuthTokenValue, UsernamePasswordCredentials},
    user_models::{
        handle_from_display_name, is_valid_handle, OwnProfile, ProviderAccount, ProviderIdentity,
        TopPick, TopPickKind, User, MAX_HANDLE_LENGTH, MIN_PASSWORD_LENGTH, TOP_PICK_SLOTS,
    },
    UserStore,
};
use std::{sync::Arc, time::SystemTime};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum UserError {
    #[error(
        "Invalid handle: use 1 to {} letters, digits and @/./+/-/_ only",
        MAX_HANDLE_LENGTH
    )]
    InvalidHandle,

    #[error("Handle {0} is already taken")]
    HandleTaken(String),

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Password must be at least {} characters long", MIN_PASSWORD_LENGTH)]
    PasswordTooShort,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Top pick position must be between 1 and {}", TOP_PICK_SLOTS)]
    InvalidTopPickPosition,

    #[error("This Spotify account is already linked to another user")]
    ProviderAccountTaken,

    #[error("User not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type UserResult<T> = std::result::Result<T, UserError>;

pub struct UserManager {
    user_store: Arc<dyn UserStore>,
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>) -> Self {
        Self { user_store }
    }

    fn check_handle_available(&self, handle: &str, except_user: Option<usize>) -> UserResult<()> {
        if !is_valid_handle(handle) {
            return Err(UserError::InvalidHandle);
        }
        match self.user_store.get_user_id(handle)? {
            Some(id) if Some(id) != except_user => Err(UserError::HandleTaken(handle.to_string())),
            _ => Ok(()),
        }
    }

    /// Creates a password-authenticated user and returns its id.
    pub fn register(
        &self,
        handle: &str,
        email: &str,
        password: &str,
        password_confirm: &str,
    ) -> UserResult<usize> {
        let handle = handle.trim();
        let email = email.trim();
        self.check_handle_available(handle, None)?;

        if email.is_empty() || !email.contains('@') {
            return Err(UserError::InvalidEmail);
        }
        if self.user_store.get_user_by_email(email)?.is_some() {
            return Err(UserError::EmailTaken);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(UserError::PasswordTooShort);
        }
        if password != password_confirm {
            return Err(UserError::PasswordMismatch);
        }

        let user_id = self.user_store.create_user(handle, Some(email))?;
        let credentials = UsernamePasswordCredentials::hashed(user_id, password)?;
        self.user_store.set_password_credentials(&credentials)?;
        info!("Registered user {} ({})", handle, user_id);
        Ok(user_id)
    }

    /// Checks the password and opens a new session for the user.
    pub fn login(&self, handle: &str, password: &str) -> UserResult<AuthToken> {
        let credentials = self
            .user_store
            .get_password_credentials(handle.trim())?
            .ok_or(UserError::InvalidCredentials)?;

        let matches = credentials.matches(password)?;
        self.user_store
            .touch_password_credentials(credentials.user_id, matches)?;
        if !matches {
            debug!("Wrong password for user {}", credentials.user_id);
            return Err(UserError::InvalidCredentials);
        }

        self.generate_auth_token(credentials.user_id)
    }

    pub fn generate_auth_token(&self, user_id: usize) -> UserResult<AuthToken> {
        let token = AuthToken {
            user_id,
            value: AuthTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        self.user_store.add_user_auth_token(&token)?;
        Ok(token)
    }

    pub fn get_auth_token(&self, value: &AuthTokenValue) -> UserResult<Option<AuthToken>> {
        Ok(self.user_store.get_user_auth_token(value)?)
    }

    pub fn update_auth_token_last_used(&self, value: &AuthTokenValue) -> UserResult<()> {
        Ok(self
            .user_store
            .update_user_auth_token_last_used_timestamp(value)?)
    }

    /// Deletes the token if it belongs to `user_id`.
    pub fn logout(&self, user_id: usize, value: &AuthTokenValue) -> UserResult<()> {
        match self.user_store.get_user_auth_token(value)? {
            Some(token) if token.user_id == user_id => {
                self.user_store.delete_user_auth_token(value)?;
                Ok(())
            }
            Some(_) => Err(UserError::InvalidCredentials),
            None => Err(UserError::NotFound),
        }
    }

    pub fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> UserResult<usize> {
        Ok(self.user_store.prune_unused_auth_tokens(unused_for_days)?)
    }

    pub fn get_user(&self, user_id: usize) -> UserResult<User> {
        self.user_store
            .get_user(user_id)?
            .ok_or(UserError::NotFound)
    }

    pub fn get_users(&self, user_ids: &[usize]) -> UserResult<Vec<User>> {
        Ok(self.user_store.get_users(user_ids)?)
    }

    pub fn get_own_profile(&self, user_id: usize) -> UserResult<OwnProfile> {
        let user = self.get_user(user_id)?;
        Ok(OwnProfile {
            user,
            provider_linked: self.user_store.get_provider_account(user_id)?.is_some(),
            listen_later_playlist: self.user_store.get_listen_later_playlist(user_id)?,
            top_picks: self.user_store.get_top_picks(user_id)?,
        })
    }

    pub fn rename(&self, user_id: usize, new_handle: &str) -> UserResult<User> {
        let new_handle = new_handle.trim();
        self.get_user(user_id)?;
        self.check_handle_available(new_handle, Some(user_id))?;
        self.user_store.set_user_handle(user_id, new_handle)?;
        self.get_user(user_id)
    }

    pub fn get_provider_account(&self, user_id: usize) -> UserResult<Option<ProviderAccount>> {
        Ok(self.user_store.get_provider_account(user_id)?)
    }

    /// Links (or refreshes the tokens of) the user's provider account.
    pub fn link_provider_account(&self, account: &ProviderAccount) -> UserResult<()> {
        if let Some(owner) = self
            .user_store
            .get_user_id_by_provider_user_id(&account.provider_user_id)?
        {
            if owner != account.user_id {
                return Err(UserError::ProviderAccountTaken);
            }
        }
        self.user_store.upsert_provider_account(account)?;
        Ok(())
    }

    pub fn unlink_provider_account(&self, user_id: usize) -> UserResult<bool> {
        Ok(self.user_store.delete_provider_account(user_id)?)
    }

    /// Resolves the local user behind a provider identity, creating one when
    /// neither the provider account nor its email is known yet.
    pub fn find_or_create_provider_user(&self, identity: &ProviderIdentity) -> UserResult<usize> {
        if let Some(user_id) = self
            .user_store
            .get_user_id_by_provider_user_id(&identity.provider_user_id)?
        {
            return Ok(user_id);
        }

        let email = identity.email.as_deref().filter(|e| e.contains('@'));
        if let Some(email) = email {
            if let Some(user) = self.user_store.get_user_by_email(email)? {
                debug!("Matched provider account to existing user {}", user.id);
                return Ok(user.id);
            }
        }

        let mut base = identity
            .display_name
            .as_deref()
            .map(handle_from_display_name)
            .unwrap_or_default();
        if base.is_empty() {
            base = handle_from_display_name(&identity.provider_user_id);
        }
        if base.is_empty() {
            base = "listener".to_string();
        }

        let mut handle = base.clone();
        let mut suffix = 1;
        while self.user_store.get_user_id(&handle)?.is_some() {
            handle = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        let user_id = self.user_store.create_user(&handle, email)?;
        info!("Created user {} ({}) from provider account", handle, user_id);
        Ok(user_id)
    }

    fn check_top_pick_position(position: u8) -> UserResult<()> {
        if position == 0 || position > TOP_PICK_SLOTS {
            return Err(UserError::InvalidTopPickPosition);
        }
        Ok(())
    }

    pub fn get_top_picks(&self, user_id: usize) -> UserResult<Vec<TopPick>> {
        Ok(self.user_store.get_top_picks(user_id)?)
    }

    pub fn set_top_pick(&self, user_id: usize, pick: &TopPick) -> UserResult<()> {
        Self::check_top_pick_position(pick.position)?;
        Ok(self.user_store.set_top_pick(user_id, pick)?)
    }

    pub fn clear_top_pick(&self, user_id: usize, kind: TopPickKind, position: u8) -> UserResult<()> {
        Self::check_top_pick_position(position)?;
        self.user_store.delete_top_pick(user_id, kind, position)?;
        Ok(())
    }

    pub fn get_listen_later_playlist(&self, user_id: usize) -> UserResult<Option<String>> {
        Ok(self.user_store.get_listen_later_playlist(user_id)?)
    }

    pub fn set_listen_later_playlist(
        &self,
        user_id: usize,
        playlist_id: Option<&str>,
    ) -> UserResult<()> {
        let playlist_id = playlist_id.map(str::trim).filter(|id| !id.is_empty());
        Ok(self
            .user_store
            .set_listen_later_playlist(user_id, playlist_id)?)
    }
}
