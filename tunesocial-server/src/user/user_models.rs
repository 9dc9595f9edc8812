use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_HANDLE_LENGTH: usize = 150;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const TOP_PICK_SLOTS: u8 = 3;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: usize,
    pub handle: String,
    pub email: Option<String>,
    pub created: i64,
}

/// Cached tokens of the music provider account linked to a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderAccount {
    pub user_id: usize,
    pub provider_user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds.
    pub expires_at: i64,
}

/// What the provider tells us about the account that completed an OAuth round trip.
#[derive(Clone, Debug, Default)]
pub struct ProviderIdentity {
    pub provider_user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TopPickKind {
    Album,
    Artist,
}

impl TopPickKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopPickKind::Album => "album",
            TopPickKind::Artist => "artist",
        }
    }
}

impl FromStr for TopPickKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "album" => Ok(TopPickKind::Album),
            "artist" => Ok(TopPickKind::Artist),
            _ => bail!("Unknown top pick kind {}", s),
        }
    }
}

impl fmt::Display for TopPickKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopPick {
    pub kind: TopPickKind,
    pub position: u8,
    pub item_id: String,
    pub name: String,
    pub image_url: Option<String>,
}

/// The view a user gets of their own account.
#[derive(Clone, Debug, Serialize)]
pub struct OwnProfile {
    pub user: User,
    pub provider_linked: bool,
    pub listen_later_playlist: Option<String>,
    pub top_picks: Vec<TopPick>,
}

pub fn is_valid_handle(handle: &str) -> bool {
    !handle.is_empty()
        && handle.chars().count() <= MAX_HANDLE_LENGTH
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '_' | '-'))
}

/// Turns a provider display name into a handle candidate: lowercase, spaces
/// become underscores and anything else outside the handle alphabet is dropped.
pub fn handle_from_display_name(display_name: &str) -> String {
    display_name
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '_' | '-') => Some(c),
            _ => None,
        })
        .take(MAX_HANDLE_LENGTH - 10)
        .collect()
}
