use std::collections::HashSet;
use std::sync::Arc;

use crate::config::FeedConfig;
use crate::db::models::{Community, Post, User};
use crate::db::RepositoryError;
use crate::posts::domain::*;
use crate::posts::repository::DynPostRepository;
use crate::revalidate::DynRevalidate;

/// The two failure categories post actions surface. The underlying message
/// is kept, but callers cannot tell transient failures from permanent ones.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{context}: {message}")]
    Failed {
        context: &'static str,
        message: String,
    },
}

impl ActionError {
    fn failed(context: &'static str) -> impl FnOnce(RepositoryError) -> Self {
        move |err| match err {
            RepositoryError::NotFound(what) => ActionError::NotFound(what),
            other => ActionError::Failed {
                context,
                message: other.to_string(),
            },
        }
    }
}

pub type ActionResult<T> = Result<T, ActionError>;

const CREATE: &str = "Failed to create";
const DELETE: &str = "Failed to delete";
const FETCH: &str = "Unable to fetch";
const COMMENT: &str = "Unable to add comment";

/// Server-side post operations.
///
/// Every mutation is a sequence of independent writes. A failure part way
/// through leaves earlier writes in place.
#[derive(Clone)]
pub struct PostActions {
    repo: DynPostRepository,
    revalidator: DynRevalidate,
    feed: FeedConfig,
}

impl PostActions {
    pub fn new(repo: DynPostRepository, revalidator: DynRevalidate, feed: FeedConfig) -> Self {
        Self {
            repo,
            revalidator,
            feed,
        }
    }

    /// Newest top-level posts with author, community and one level of
    /// children (with their authors).
    pub async fn fetch_posts(&self, page: Option<u32>, size: Option<u32>) -> ActionResult<FeedPage> {
        let page = PageRequest::new(page, size, &self.feed);
        let skip = page.skip();

        let ids = self
            .repo
            .list_top_level(skip, page.size)
            .await
            .map_err(ActionError::failed(FETCH))?;
        let posts = self
            .repo
            .populate(&ids, 1)
            .await
            .map_err(ActionError::failed(FETCH))?;
        let total = self
            .repo
            .count_top_level()
            .await
            .map_err(ActionError::failed(FETCH))?;

        let is_next = has_next_page(total, skip, posts.len());
        tracing::debug!(page = page.number, size = page.size, total, is_next, "Fetched feed");

        Ok(FeedPage { posts, is_next })
    }

    /// Create a top-level post. `community_account_id` is the community's
    /// external account id; an unknown one leaves the post personal.
    pub async fn create_post(
        &self,
        text: &str,
        author: &UserId,
        community_account_id: Option<&str>,
        path: &str,
    ) -> ActionResult<PostId> {
        let err = ActionError::failed;

        let community = match community_account_id {
            Some(account_id) => {
                let found = self
                    .repo
                    .find_community_by_account(account_id)
                    .await
                    .map_err(err(CREATE))?;
                if found.is_none() {
                    tracing::warn!(account_id, "Community not found, creating personal post");
                }
                found.map(|c| CommunityId::new(c.id))
            }
            None => None,
        };

        let post = self
            .repo
            .insert_post(&NewPost {
                text: text.to_string(),
                author_id: author.clone(),
                community_id: community.clone(),
                parent_id: None,
            })
            .await
            .map_err(err(CREATE))?;
        let post_id = PostId::new(post.id);

        self.repo
            .append_user_post(author, &post_id)
            .await
            .map_err(err(CREATE))?;

        if let Some(ref community) = community {
            self.repo
                .append_community_post(community, &post_id)
                .await
                .map_err(err(CREATE))?;
        }

        tracing::info!(post_id = %post_id, author = %author, community = ?community, "Post created");
        self.revalidator.revalidate_path(path);
        Ok(post_id)
    }

    /// One post with author and community, plus children and
    /// children-of-children, each with author.
    pub async fn fetch_post_by_id(&self, id: &PostId) -> ActionResult<PostView> {
        let mut views = self
            .repo
            .populate(std::slice::from_ref(id), 2)
            .await
            .map_err(|e| {
                tracing::error!(post_id = %id, "Error while fetching: {}", e);
                ActionError::failed(FETCH)(e)
            })?;

        views
            .pop()
            .ok_or_else(|| ActionError::NotFound(format!("Post {}", id)))
    }

    /// Delete a post and every transitive reply, then pull the deleted ids
    /// out of the affected users', communities' and parents' lists.
    pub async fn delete_post(&self, id: &PostId, path: &str) -> ActionResult<DeletionPlan> {
        let err = ActionError::failed;

        let root = self
            .repo
            .find_post(id)
            .await
            .map_err(err(DELETE))?
            .ok_or_else(|| ActionError::NotFound(format!("Post {}", id)))?;

        let descendants = self.collect_descendants(id).await.map_err(err(DELETE))?;
        let plan = DeletionPlan::new(&root, &descendants);

        let deleted = self
            .repo
            .delete_posts(&plan.post_ids)
            .await
            .map_err(err(DELETE))?;
        let users = self
            .repo
            .pull_user_posts(&plan.author_ids, &plan.post_ids)
            .await
            .map_err(err(DELETE))?;
        let communities = self
            .repo
            .pull_community_posts(&plan.community_ids, &plan.post_ids)
            .await
            .map_err(err(DELETE))?;
        let children = self
            .repo
            .pull_children(&plan.post_ids)
            .await
            .map_err(err(DELETE))?;

        tracing::info!(
            post_id = %id,
            deleted,
            descendants = plan.descendant_count(),
            user_refs = users,
            community_refs = communities,
            child_refs = children,
            "Thread deleted"
        );
        self.revalidator.revalidate_path(path);
        Ok(plan)
    }

    /// Depth-first walk of the reply tree, one query per visited post.
    /// Returns descendants in pre-order, siblings oldest first; `root` itself
    /// is not included. Posts already seen are skipped, so a corrupted
    /// parent chain cannot loop forever.
    async fn collect_descendants(&self, root: &PostId) -> Result<Vec<Post>, RepositoryError> {
        let mut visited: HashSet<String> = HashSet::from([root.0.clone()]);
        let mut descendants = Vec::new();

        let mut stack: Vec<Post> = self.repo.find_replies(root).await?;
        stack.reverse();

        while let Some(post) = stack.pop() {
            if !visited.insert(post.id.clone()) {
                continue;
            }
            let mut replies = self.repo.find_replies(&PostId::new(post.id.clone())).await?;
            replies.reverse();
            stack.extend(replies);
            descendants.push(post);
        }

        Ok(descendants)
    }

    /// Reply to `parent`. The reply is appended to the parent's child list
    /// in a second write.
    pub async fn add_comment(
        &self,
        parent: &PostId,
        text: &str,
        author: &UserId,
        path: &str,
    ) -> ActionResult<PostId> {
        let err = ActionError::failed;

        let original = self
            .repo
            .find_post(parent)
            .await
            .map_err(err(COMMENT))?
            .ok_or_else(|| ActionError::NotFound(format!("Post {}", parent)))?;

        let comment = self
            .repo
            .insert_post(&NewPost {
                text: text.to_string(),
                author_id: author.clone(),
                community_id: None,
                parent_id: Some(PostId::new(original.id)),
            })
            .await
            .map_err(|e| {
                tracing::error!(parent = %parent, "Error while adding comment: {}", e);
                err(COMMENT)(e)
            })?;
        let comment_id = PostId::new(comment.id);

        self.repo
            .append_child(parent, &comment_id)
            .await
            .map_err(err(COMMENT))?;

        tracing::info!(post_id = %comment_id, parent = %parent, author = %author, "Comment added");
        self.revalidator.revalidate_path(path);
        Ok(comment_id)
    }

    /// Posts in a user's own list, newest list entry last.
    pub async fn fetch_user_posts(&self, account_id: &str) -> ActionResult<ProfilePosts<User>> {
        let user = self
            .repo
            .find_user_by_account(account_id)
            .await
            .map_err(ActionError::failed(FETCH))?
            .ok_or_else(|| ActionError::NotFound(format!("User {}", account_id)))?;

        let ids = self
            .repo
            .user_post_ids(&UserId::new(user.id.clone()))
            .await
            .map_err(ActionError::failed(FETCH))?;
        let posts = self
            .repo
            .populate(&ids, 1)
            .await
            .map_err(ActionError::failed(FETCH))?;

        Ok(ProfilePosts { owner: user, posts })
    }

    pub async fn fetch_community_posts(
        &self,
        account_id: &str,
    ) -> ActionResult<ProfilePosts<Community>> {
        let community = self
            .repo
            .find_community_by_account(account_id)
            .await
            .map_err(ActionError::failed(FETCH))?
            .ok_or_else(|| ActionError::NotFound(format!("Community {}", account_id)))?;

        let ids = self
            .repo
            .community_post_ids(&CommunityId::new(community.id.clone()))
            .await
            .map_err(ActionError::failed(FETCH))?;
        let posts = self
            .repo
            .populate(&ids, 1)
            .await
            .map_err(ActionError::failed(FETCH))?;

        Ok(ProfilePosts {
            owner: community,
            posts,
        })
    }
}

/// Convenience for building actions over the SQLite repository.
pub fn sqlite_actions(
    pool: crate::state::DbPool,
    revalidator: DynRevalidate,
    feed: FeedConfig,
) -> PostActions {
    let repo = Arc::new(crate::posts::repository::SqlitePostRepository::new(pool));
    PostActions::new(repo, revalidator, feed)
}
