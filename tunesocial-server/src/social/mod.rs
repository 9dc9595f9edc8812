pub mod models;
mod social_manager;
mod social_store;
mod sqlite_social_store;

pub use models::{
    Comment, CommentView, Page, Post, PostEdit, PostSubject, PostType, PostView, PublicProfile,
    RatingOutcome, RatingSummary, TrackRating, UserSummary,
};
pub use social_manager::{
    parse_rating, rating_post_content, SocialError, SocialManager, SocialResult, DEFAULT_DUPLICATE_WINDOW_SECS,
};
pub use social_store::{FollowStore, InteractionStore, PostStore, RatingStore, SocialStore};
pub use sqlite_social_store::SqliteSocialStore;
