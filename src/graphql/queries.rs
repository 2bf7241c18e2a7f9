use async_graphql::*;

use crate::graphql::action_error;
use crate::graphql::types::{FeedPage, Post, ProfileFeed};
use crate::posts::{ActionError, PostActions, PostId};

/// GraphQL Query root
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Newest top-level posts, one level of replies attached
    async fn posts(
        &self,
        ctx: &Context<'_>,
        page: Option<u32>,
        size: Option<u32>,
    ) -> Result<FeedPage> {
        let actions = ctx.data::<PostActions>()?;
        let page = actions
            .fetch_posts(page, size)
            .await
            .map_err(action_error)?;
        Ok(page.into())
    }

    /// A single thread, two levels of replies attached
    async fn post(&self, ctx: &Context<'_>, id: String) -> Result<Option<Post>> {
        let actions = ctx.data::<PostActions>()?;

        match actions.fetch_post_by_id(&PostId::new(id)).await {
            Ok(view) => Ok(Some(view.into())),
            Err(ActionError::NotFound(_)) => Ok(None),
            Err(e) => Err(action_error(e)),
        }
    }

    /// Posts in a user's profile list
    async fn user_posts(&self, ctx: &Context<'_>, account_id: String) -> Result<ProfileFeed> {
        let actions = ctx.data::<PostActions>()?;
        let profile = actions
            .fetch_user_posts(&account_id)
            .await
            .map_err(action_error)?;
        Ok(profile.into())
    }

    /// Posts made under a community
    async fn community_posts(
        &self,
        ctx: &Context<'_>,
        account_id: String,
    ) -> Result<ProfileFeed> {
        let actions = ctx.data::<PostActions>()?;
        let profile = actions
            .fetch_community_posts(&account_id)
            .await
            .map_err(action_error)?;
        Ok(profile.into())
    }
}
