use super::models::*;
use super::social_store::SocialStore;
use crate::user::{UserError, UserManager};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_DUPLICATE_WINDOW_SECS: u64 = 30;
const UNKNOWN_AUTHOR_HANDLE: &str = "unknown";

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("You already posted this recently")]
    DuplicatePost,

    #[error("You cannot follow yourself")]
    SelfFollow,

    #[error("Post not found")]
    PostNotFound,

    #[error("Comment not found")]
    CommentNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("You are not allowed to do that")]
    NotAllowed,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<UserError> for SocialError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => SocialError::UserNotFound,
            UserError::Store(err) => SocialError::Store(err),
            other => SocialError::InvalidInput(other.to_string()),
        }
    }
}

pub type SocialResult<T> = std::result::Result<T, SocialError>;

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn invalid_rating() -> SocialError {
    SocialError::InvalidInput(format!(
        "Rating must be between {} and {}",
        MIN_RATING, MAX_RATING
    ))
}

fn check_rating(rating: u8) -> SocialResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(invalid_rating());
    }
    Ok(())
}

/// Narrows a rating sent by a client.
pub fn parse_rating(value: i64) -> SocialResult<u8> {
    let rating = u8::try_from(value).map_err(|_| invalid_rating())?;
    check_rating(rating)?;
    Ok(rating)
}

fn check_post_content(content: &str) -> SocialResult<()> {
    if content.chars().count() > MAX_POST_CONTENT_LENGTH {
        return Err(SocialError::InvalidInput(format!(
            "Post content cannot exceed {} characters",
            MAX_POST_CONTENT_LENGTH
        )));
    }
    Ok(())
}

pub fn rating_post_content(rating: u8) -> String {
    format!("Rated this song {}/{} stars!", rating, MAX_RATING)
}

pub struct SocialManager {
    social_store: Arc<dyn SocialStore>,
    user_manager: Arc<UserManager>,
    duplicate_window_secs: i64,
}

impl SocialManager {
    pub fn new(
        social_store: Arc<dyn SocialStore>,
        user_manager: Arc<UserManager>,
        duplicate_window_secs: u64,
    ) -> Self {
        Self {
            social_store,
            user_manager,
            duplicate_window_secs: i64::try_from(duplicate_window_secs).unwrap_or(i64::MAX),
        }
    }

    fn author_summaries(&self, author_ids: &[usize]) -> SocialResult<HashMap<usize, UserSummary>> {
        let unique: Vec<usize> = author_ids
            .iter()
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        Ok(self
            .user_manager
            .get_users(&unique)?
            .iter()
            .map(|user| (user.id, UserSummary::from(user)))
            .collect())
    }

    fn to_views(&self, records: Vec<PostRecord>) -> SocialResult<Vec<PostView>> {
        let author_ids: Vec<usize> = records.iter().map(|r| r.post.author_id).collect();
        let authors = self.author_summaries(&author_ids)?;
        Ok(records
            .into_iter()
            .map(|record| {
                let author = authors
                    .get(&record.post.author_id)
                    .cloned()
                    .unwrap_or_else(|| UserSummary {
                        id: record.post.author_id,
                        handle: UNKNOWN_AUTHOR_HANDLE.to_string(),
                    });
                PostView {
                    uri: record.post.provider_uri(),
                    author,
                    like_count: record.like_count,
                    comment_count: record.comment_count,
                    liked: record.liked_by_viewer,
                    post: record.post,
                }
            })
            .collect())
    }

    fn to_view(&self, record: PostRecord) -> SocialResult<PostView> {
        self.to_views(vec![record])?
            .pop()
            .ok_or(SocialError::PostNotFound)
    }

    /// Returns the post if `viewer_id` may see it. Private posts of other
    /// users look exactly like missing ones.
    fn visible_post(&self, viewer_id: usize, post_id: usize) -> SocialResult<PostRecord> {
        match self.social_store.get_post(post_id, viewer_id)? {
            Some(record) if !record.post.is_private || record.post.author_id == viewer_id => {
                Ok(record)
            }
            _ => Err(SocialError::PostNotFound),
        }
    }

    fn owned_post(&self, user_id: usize, post_id: usize) -> SocialResult<PostRecord> {
        let record = self.visible_post(user_id, post_id)?;
        if record.post.author_id != user_id {
            return Err(SocialError::NotAllowed);
        }
        Ok(record)
    }

    fn ensure_user_exists(&self, user_id: usize) -> SocialResult<()> {
        self.user_manager.get_user(user_id)?;
        Ok(())
    }

    /// Creates a track or album post. The same item cannot be posted twice by
    /// the same author within the duplicate window.
    pub fn create_post(
        &self,
        author_id: usize,
        post_type: PostType,
        subject: PostSubject,
        content: &str,
        is_private: bool,
    ) -> SocialResult<PostView> {
        if post_type == PostType::Rating {
            return Err(SocialError::InvalidInput(
                "Rating posts are created by rating a track".to_string(),
            ));
        }
        let content = content.trim();
        check_post_content(content)?;

        let now = now();
        if self
            .social_store
            .find_recent_post(
                author_id,
                post_type,
                &subject.item_id,
                now.saturating_sub(self.duplicate_window_secs),
            )?
            .is_some()
        {
            debug!(
                "Rejecting duplicate {} post of {} by user {}",
                post_type, subject.item_id, author_id
            );
            return Err(SocialError::DuplicatePost);
        }

        let post_id = self.social_store.insert_post(&NewPost {
            author_id,
            post_type,
            content: content.to_string(),
            subject,
            rating: None,
            is_private,
            created: now,
        })?;
        info!("User {} created {} post {}", author_id, post_type, post_id);
        self.get_post(author_id, post_id)
    }

    pub fn get_post(&self, viewer_id: usize, post_id: usize) -> SocialResult<PostView> {
        let record = self.visible_post(viewer_id, post_id)?;
        self.to_view(record)
    }

    pub fn edit_post(
        &self,
        editor_id: usize,
        post_id: usize,
        edit: &PostEdit,
    ) -> SocialResult<PostView> {
        let record = self.owned_post(editor_id, post_id)?;
        if let Some(rating) = edit.rating {
            check_rating(rating)?;
        }
        if record.post.post_type == PostType::Rating {
            return self.edit_rating_post(editor_id, &record.post, edit);
        }
        let edit = PostEdit {
            content: edit.content.as_deref().map(|c| c.trim().to_string()),
            ..edit.clone()
        };
        if let Some(content) = &edit.content {
            check_post_content(content)?;
        }
        self.social_store.update_post(post_id, &edit, now())?;
        self.get_post(editor_id, post_id)
    }

    /// A rating post mirrors the author's rating of the track: changing its
    /// rating rates the track again, and its text cannot be edited.
    fn edit_rating_post(
        &self,
        editor_id: usize,
        post: &Post,
        edit: &PostEdit,
    ) -> SocialResult<PostView> {
        if edit.content.is_some() {
            return Err(SocialError::InvalidInput(
                "The text of a rating post follows its rating".to_string(),
            ));
        }

        let now = now();
        let mut edit = PostEdit {
            content: None,
            rating: edit.rating,
            is_private: edit.is_private,
        };
        if let Some(rating) = edit.rating {
            let subject = &post.subject;
            let existing = self.social_store.get_track_rating(editor_id, &subject.item_id)?;
            self.social_store.upsert_track_rating(&TrackRating {
                user_id: editor_id,
                track_id: subject.item_id.clone(),
                track_name: subject.item_name.clone(),
                artist_name: subject.item_artist.clone(),
                rating,
                created: existing.map(|r| r.created).unwrap_or(now),
                updated: now,
            })?;
            edit.content = Some(rating_post_content(rating));
        }
        self.social_store.update_post(post.id, &edit, now)?;
        self.get_post(editor_id, post.id)
    }

    pub fn delete_post(&self, user_id: usize, post_id: usize) -> SocialResult<()> {
        self.owned_post(user_id, post_id)?;
        self.social_store.delete_post(post_id)?;
        info!("User {} deleted post {}", user_id, post_id);
        Ok(())
    }

    /// Public posts of followed users and all of the viewer's own posts, newest first.
    pub fn feed(&self, viewer_id: usize, page: Page) -> SocialResult<Vec<PostView>> {
        let records = self.social_store.get_feed(viewer_id, page)?;
        self.to_views(records)
    }

    pub fn user_posts(
        &self,
        viewer_id: usize,
        author_id: usize,
        page: Page,
    ) -> SocialResult<Vec<PostView>> {
        self.ensure_user_exists(author_id)?;
        let records = self.social_store.get_user_posts(
            author_id,
            viewer_id,
            viewer_id == author_id,
            page,
        )?;
        self.to_views(records)
    }

    /// Returns false if the follow already existed.
    pub fn follow(&self, follower_id: usize, following_id: usize) -> SocialResult<bool> {
        if follower_id == following_id {
            return Err(SocialError::SelfFollow);
        }
        self.ensure_user_exists(following_id)?;
        let created = self.social_store.add_follow(follower_id, following_id)?;
        if created {
            info!("User {} now follows {}", follower_id, following_id);
        }
        Ok(created)
    }

    /// Returns false if there was nothing to remove.
    pub fn unfollow(&self, follower_id: usize, following_id: usize) -> SocialResult<bool> {
        Ok(self.social_store.remove_follow(follower_id, following_id)?)
    }

    pub fn is_following(&self, follower_id: usize, following_id: usize) -> SocialResult<bool> {
        Ok(self.social_store.is_following(follower_id, following_id)?)
    }

    pub fn followers(&self, user_id: usize) -> SocialResult<Vec<UserSummary>> {
        self.ensure_user_exists(user_id)?;
        let ids = self.social_store.get_follower_ids(user_id)?;
        let users = self.user_manager.get_users(&ids)?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    pub fn following(&self, user_id: usize) -> SocialResult<Vec<UserSummary>> {
        self.ensure_user_exists(user_id)?;
        let ids = self.social_store.get_following_ids(user_id)?;
        let users = self.user_manager.get_users(&ids)?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    pub fn profile(&self, viewer_id: usize, user_id: usize) -> SocialResult<PublicProfile> {
        let user = self.user_manager.get_user(user_id)?;
        let is_self = viewer_id == user_id;
        Ok(PublicProfile {
            user: UserSummary::from(&user),
            created: user.created,
            followers_count: self.social_store.count_followers(user_id)?,
            following_count: self.social_store.count_following(user_id)?,
            posts_count: self.social_store.count_user_posts(user_id, is_self)?,
            is_following: !is_self && self.social_store.is_following(viewer_id, user_id)?,
            is_self,
            top_picks: self.user_manager.get_top_picks(user_id)?,
        })
    }

    pub fn like(&self, user_id: usize, post_id: usize) -> SocialResult<PostView> {
        self.visible_post(user_id, post_id)?;
        if self.social_store.add_like(post_id, user_id)? {
            debug!("User {} liked post {}", user_id, post_id);
        }
        self.get_post(user_id, post_id)
    }

    pub fn unlike(&self, user_id: usize, post_id: usize) -> SocialResult<PostView> {
        self.visible_post(user_id, post_id)?;
        self.social_store.remove_like(post_id, user_id)?;
        self.get_post(user_id, post_id)
    }

    pub fn add_comment(
        &self,
        user_id: usize,
        post_id: usize,
        content: &str,
    ) -> SocialResult<CommentView> {
        let content = content.trim();
        if content.is_empty() || content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(SocialError::InvalidInput(format!(
                "Comments must be between 1 and {} characters",
                MAX_COMMENT_LENGTH
            )));
        }
        self.visible_post(user_id, post_id)?;
        let comment_id = self
            .social_store
            .add_comment(post_id, user_id, content, now())?;
        let comment = self
            .social_store
            .get_comment(comment_id)?
            .ok_or(SocialError::CommentNotFound)?;
        let author = UserSummary::from(&self.user_manager.get_user(user_id)?);
        Ok(CommentView { comment, author })
    }

    /// The comment's author and the post's owner may delete a comment.
    pub fn delete_comment(
        &self,
        user_id: usize,
        post_id: usize,
        comment_id: usize,
    ) -> SocialResult<()> {
        let post = self.visible_post(user_id, post_id)?;
        let comment = self
            .social_store
            .get_comment(comment_id)?
            .filter(|c| c.post_id == post_id)
            .ok_or(SocialError::CommentNotFound)?;
        if comment.author_id != user_id && post.post.author_id != user_id {
            return Err(SocialError::NotAllowed);
        }
        self.social_store.delete_comment(comment_id)?;
        Ok(())
    }

    pub fn comments(&self, viewer_id: usize, post_id: usize) -> SocialResult<Vec<CommentView>> {
        self.visible_post(viewer_id, post_id)?;
        let comments = self.social_store.get_comments(post_id)?;
        let author_ids: Vec<usize> = comments.iter().map(|c| c.author_id).collect();
        let authors = self.author_summaries(&author_ids)?;
        Ok(comments
            .into_iter()
            .map(|comment| CommentView {
                author: authors
                    .get(&comment.author_id)
                    .cloned()
                    .unwrap_or_else(|| UserSummary {
                        id: comment.author_id,
                        handle: UNKNOWN_AUTHOR_HANDLE.to_string(),
                    }),
                comment,
            })
            .collect())
    }

    /// Stores the user's rating of a track, overwriting any previous one.
    ///
    /// When the track metadata is known a public rating post is recorded too;
    /// rating the same track again inside the duplicate window updates that
    /// post instead of creating a new one.
    pub fn rate_track(
        &self,
        user_id: usize,
        track_id: &str,
        rating: u8,
        subject: Option<&PostSubject>,
    ) -> SocialResult<RatingOutcome> {
        check_rating(rating)?;
        if track_id.trim().is_empty() {
            return Err(SocialError::InvalidInput("Missing track id".to_string()));
        }

        let now = now();
        let existing = self.social_store.get_track_rating(user_id, track_id)?;
        let (track_name, artist_name) = subject
            .map(|s| (s.item_name.clone(), s.item_artist.clone()))
            .or_else(|| {
                existing
                    .as_ref()
                    .map(|r| (r.track_name.clone(), r.artist_name.clone()))
            })
            .unwrap_or_default();
        let record = TrackRating {
            user_id,
            track_id: track_id.to_string(),
            track_name,
            artist_name,
            rating,
            created: existing.as_ref().map(|r| r.created).unwrap_or(now),
            updated: now,
        };
        self.social_store.upsert_track_rating(&record)?;

        let post_id = match subject {
            Some(subject) => Some(self.record_rating_post(user_id, subject, rating, now)?),
            None => None,
        };

        Ok(RatingOutcome {
            rating: record,
            post_id,
            summary: self.social_store.get_rating_summary(track_id)?,
        })
    }

    fn record_rating_post(
        &self,
        user_id: usize,
        subject: &PostSubject,
        rating: u8,
        now: i64,
    ) -> SocialResult<usize> {
        let content = rating_post_content(rating);
        if let Some(recent) = self.social_store.find_recent_post(
            user_id,
            PostType::Rating,
            &subject.item_id,
            now.saturating_sub(self.duplicate_window_secs),
        )? {
            let edit = PostEdit {
                content: Some(content),
                rating: Some(rating),
                is_private: None,
            };
            self.social_store.update_post(recent.post.id, &edit, now)?;
            return Ok(recent.post.id);
        }

        Ok(self.social_store.insert_post(&NewPost {
            author_id: user_id,
            post_type: PostType::Rating,
            content,
            subject: subject.clone(),
            rating: Some(rating),
            is_private: false,
            created: now,
        })?)
    }

    pub fn rating_summary(&self, track_id: &str) -> SocialResult<RatingSummary> {
        Ok(self.social_store.get_rating_summary(track_id)?)
    }

    pub fn track_rating(&self, user_id: usize, track_id: &str) -> SocialResult<Option<u8>> {
        Ok(self
            .social_store
            .get_track_rating(user_id, track_id)?
            .map(|r| r.rating))
    }

    pub fn user_ratings(
        &self,
        user_id: usize,
        track_ids: &[String],
    ) -> SocialResult<HashMap<String, u8>> {
        Ok(self.social_store.get_user_ratings(user_id, track_ids)?)
    }
}
