use async_graphql::*;
use chrono::{DateTime, Utc};

use crate::db::models;
use crate::posts::domain;

/// Author fields shown alongside a post
#[derive(Clone, Debug, SimpleObject)]
pub struct Author {
    /// Internal user id
    pub id: String,

    /// Identity provider account id
    pub account_id: String,

    pub username: String,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct CommunityRef {
    pub id: String,
    pub account_id: String,
    pub username: String,
    pub name: String,
    pub image: Option<String>,
}

/// A post with author, community and populated children
#[derive(Clone, Debug, SimpleObject)]
#[graphql(complex)]
pub struct Post {
    pub id: String,
    pub text: String,

    /// Id of the post this replies to, if any
    pub parent_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub author: Author,
    pub community: Option<CommunityRef>,

    /// Stored child list, in reply order
    pub child_ids: Vec<String>,

    /// Children loaded by the query; may be shallower than `child_ids`
    pub children: Vec<Post>,
}

/// GraphQL `Int` counts, pinned at `u32::MAX` instead of wrapping.
fn saturating_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[ComplexObject]
impl Post {
    /// Number of direct replies
    async fn reply_count(&self) -> u32 {
        saturating_count(self.child_ids.len())
    }

    async fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(SimpleObject)]
pub struct FeedPage {
    pub posts: Vec<Post>,

    /// Whether another page exists after this one
    pub is_next: bool,
}

/// User or community whose profile is being listed
#[derive(Clone, Debug, SimpleObject)]
pub struct ProfileOwner {
    pub id: String,
    pub account_id: String,
    pub username: String,
    pub name: String,
    pub image: Option<String>,
    pub bio: Option<String>,
}

#[derive(SimpleObject)]
pub struct ProfileFeed {
    pub owner: ProfileOwner,
    pub posts: Vec<Post>,
}

#[derive(SimpleObject)]
pub struct DeleteResult {
    /// Every removed post id, the deleted post first
    pub deleted_ids: Vec<String>,
    pub descendant_count: u32,
}

#[derive(InputObject)]
pub struct CreatePostInput {
    pub text: String,

    /// Internal id of the author
    pub author_id: String,

    /// Community account id (optional - personal post if absent)
    pub community_id: Option<String>,

    /// Page to revalidate (defaults to "/")
    pub path: Option<String>,
}

#[derive(InputObject)]
pub struct AddCommentInput {
    pub post_id: String,
    pub text: String,
    pub user_id: String,
    pub path: Option<String>,
}

impl From<domain::PostView> for Post {
    fn from(view: domain::PostView) -> Self {
        Self {
            id: view.id.0,
            text: view.text,
            parent_id: view.parent_id,
            created_at: view.created_at,
            author: Author {
                id: view.author.id.0,
                account_id: view.author.account_id,
                username: view.author.username,
                name: view.author.name,
                image: view.author.image,
            },
            community: view.community.map(|c| CommunityRef {
                id: c.id.0,
                account_id: c.account_id,
                username: c.username,
                name: c.name,
                image: c.image,
            }),
            child_ids: view.child_ids.into_iter().map(|id| id.0).collect(),
            children: view.children.into_iter().map(Post::from).collect(),
        }
    }
}

impl From<domain::FeedPage> for FeedPage {
    fn from(page: domain::FeedPage) -> Self {
        Self {
            posts: page.posts.into_iter().map(Post::from).collect(),
            is_next: page.is_next,
        }
    }
}

impl From<models::User> for ProfileOwner {
    fn from(user: models::User) -> Self {
        Self {
            id: user.id,
            account_id: user.account_id,
            username: user.username,
            name: user.name,
            image: user.image,
            bio: user.bio,
        }
    }
}

impl From<models::Community> for ProfileOwner {
    fn from(community: models::Community) -> Self {
        Self {
            id: community.id,
            account_id: community.account_id,
            username: community.username,
            name: community.name,
            image: community.image,
            bio: community.bio,
        }
    }
}

impl<O: Into<ProfileOwner>> From<domain::ProfilePosts<O>> for ProfileFeed {
    fn from(profile: domain::ProfilePosts<O>) -> Self {
        Self {
            owner: profile.owner.into(),
            posts: profile.posts.into_iter().map(Post::from).collect(),
        }
    }
}

impl From<domain::DeletionPlan> for DeleteResult {
    fn from(plan: domain::DeletionPlan) -> Self {
        Self {
            descendant_count: saturating_count(plan.descendant_count()),
            deleted_ids: plan.post_ids.into_iter().map(|id| id.0).collect(),
        }
    }
}
