pub mod actions;
pub mod domain;
pub mod repository;

pub use actions::{sqlite_actions, ActionError, ActionResult, PostActions};
pub use domain::{
    AuthorSummary, CommunityId, CommunitySummary, DeletionPlan, FeedPage, PageRequest, PostId,
    PostView, ProfilePosts, UserId,
};
pub use repository::{DynPostRepository, PostRepository, SqlitePostRepository};
