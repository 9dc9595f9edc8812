use super::models::{
    Comment, NewPost, Page, PostEdit, PostRecord, PostType, RatingSummary, TrackRating,
};
use anyhow::Result;
use std::collections::HashMap;

pub trait PostStore: Send + Sync {
    fn insert_post(&self, post: &NewPost) -> Result<usize>;

    /// Returns the post regardless of its privacy, with counters relative to `viewer_id`.
    fn get_post(&self, post_id: usize, viewer_id: usize) -> Result<Option<PostRecord>>;

    fn update_post(&self, post_id: usize, edit: &PostEdit, updated: i64) -> Result<()>;

    /// Deletes the post together with its likes and comments.
    fn delete_post(&self, post_id: usize) -> Result<bool>;

    /// Returns the newest post by `author_id` about `item_id` created after `since`.
    fn find_recent_post(
        &self,
        author_id: usize,
        post_type: PostType,
        item_id: &str,
        since: i64,
    ) -> Result<Option<PostRecord>>;

    /// Public posts of followed users plus every post of the viewer, newest first.
    fn get_feed(&self, viewer_id: usize, page: Page) -> Result<Vec<PostRecord>>;

    fn get_user_posts(
        &self,
        author_id: usize,
        viewer_id: usize,
        include_private: bool,
        page: Page,
    ) -> Result<Vec<PostRecord>>;

    fn count_user_posts(&self, author_id: usize, include_private: bool) -> Result<usize>;
}

pub trait FollowStore: Send + Sync {
    /// Returns false if the edge already existed.
    fn add_follow(&self, follower_id: usize, following_id: usize) -> Result<bool>;

    /// Returns false if there was no edge.
    fn remove_follow(&self, follower_id: usize, following_id: usize) -> Result<bool>;

    fn is_following(&self, follower_id: usize, following_id: usize) -> Result<bool>;

    /// Ids of the users following `user_id`, most recent first.
    fn get_follower_ids(&self, user_id: usize) -> Result<Vec<usize>>;

    /// Ids of the users `user_id` follows, most recent first.
    fn get_following_ids(&self, user_id: usize) -> Result<Vec<usize>>;

    fn count_followers(&self, user_id: usize) -> Result<usize>;

    fn count_following(&self, user_id: usize) -> Result<usize>;
}

pub trait InteractionStore: Send + Sync {
    /// Returns false if the like already existed.
    fn add_like(&self, post_id: usize, user_id: usize) -> Result<bool>;

    fn remove_like(&self, post_id: usize, user_id: usize) -> Result<bool>;

    fn add_comment(
        &self,
        post_id: usize,
        author_id: usize,
        content: &str,
        created: i64,
    ) -> Result<usize>;

    fn get_comment(&self, comment_id: usize) -> Result<Option<Comment>>;

    fn delete_comment(&self, comment_id: usize) -> Result<bool>;

    /// Comments of a post, oldest first.
    fn get_comments(&self, post_id: usize) -> Result<Vec<Comment>>;
}

pub trait RatingStore: Send + Sync {
    /// Inserts the rating or overwrites the one the user gave the same track.
    fn upsert_track_rating(&self, rating: &TrackRating) -> Result<()>;

    fn get_track_rating(&self, user_id: usize, track_id: &str) -> Result<Option<TrackRating>>;

    fn get_rating_summary(&self, track_id: &str) -> Result<RatingSummary>;

    /// The user's ratings of the given tracks, keyed by track id.
    fn get_user_ratings(
        &self,
        user_id: usize,
        track_ids: &[String],
    ) -> Result<HashMap<String, u8>>;
}

pub trait SocialStore: PostStore + FollowStore + InteractionStore + RatingStore + Send + Sync {}

impl<T: PostStore + FollowStore + InteractionStore + RatingStore + Send + Sync> SocialStore for T {}
