use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::user::{TopPick, User};

pub const MAX_POST_CONTENT_LENGTH: usize = 2000;
pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;
/// SQLite takes offsets as `i64`.
pub const MAX_PAGE_OFFSET: usize = i64::MAX as usize;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Track,
    Album,
    Rating,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Track => "track",
            PostType::Album => "album",
            PostType::Rating => "rating",
        }
    }
}

impl FromStr for PostType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "track" => Ok(PostType::Track),
            "album" => Ok(PostType::Album),
            "rating" => Ok(PostType::Rating),
            _ => bail!("Unknown post type {}", s),
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider metadata of the track or album a post is about.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostSubject {
    pub item_id: String,
    pub item_name: String,
    /// Artist names joined by `", "`.
    pub item_artist: String,
    pub image_url: String,
    pub preview_url: Option<String>,
    pub external_url: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Post {
    pub id: usize,
    pub author_id: usize,
    pub post_type: PostType,
    pub content: String,
    #[serde(flatten)]
    pub subject: PostSubject,
    pub rating: Option<u8>,
    pub is_private: bool,
    pub created: i64,
    pub updated: i64,
}

impl Post {
    /// Playable URI of the subject. Rating posts only announce a rating.
    pub fn provider_uri(&self) -> Option<String> {
        match self.post_type {
            PostType::Track => Some(format!("spotify:track:{}", self.subject.item_id)),
            PostType::Album => Some(format!("spotify:album:{}", self.subject.item_id)),
            PostType::Rating => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewPost {
    pub author_id: usize,
    pub post_type: PostType,
    pub content: String,
    pub subject: PostSubject,
    pub rating: Option<u8>,
    pub is_private: bool,
    pub created: i64,
}

/// Fields of a post its owner may change. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PostEdit {
    pub content: Option<String>,
    pub rating: Option<u8>,
    pub is_private: Option<bool>,
}

/// A post as read back from the store, with its counters relative to a viewer.
#[derive(Clone, Debug)]
pub struct PostRecord {
    pub post: Post,
    pub like_count: usize,
    pub comment_count: usize,
    pub liked_by_viewer: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: usize,
    pub handle: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id,
            handle: user.handle.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: UserSummary,
    pub uri: Option<String>,
    pub like_count: usize,
    pub comment_count: usize,
    pub liked: bool,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Comment {
    pub id: usize,
    pub post_id: usize,
    pub author_id: usize,
    pub content: String,
    pub created: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: UserSummary,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TrackRating {
    pub user_id: usize,
    pub track_id: String,
    pub track_name: String,
    pub artist_name: String,
    pub rating: u8,
    pub created: i64,
    pub updated: i64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RatingSummary {
    /// Rounded to one decimal, `None` when nobody rated the track.
    pub average: Option<f64>,
    pub count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct RatingOutcome {
    pub rating: TrackRating,
    pub post_id: Option<usize>,
    pub summary: RatingSummary,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicProfile {
    #[serde(flatten)]
    pub user: UserSummary,
    pub created: i64,
    pub followers_count: usize,
    pub following_count: usize,
    pub posts_count: usize,
    pub is_following: bool,
    pub is_self: bool,
    pub top_picks: Vec<TopPick>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Page {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0).min(MAX_PAGE_OFFSET),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(None, None)
    }
}

pub fn round_average(sum: i64, count: usize) -> Option<f64> {
    if count == 0 {
        return None;
    }
    let average = sum as f64 / count as f64;
    Some((average * 10.0).round() / 10.0)
}
