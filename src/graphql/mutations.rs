use async_graphql::*;

use crate::config::ValidationConfig;
use crate::graphql::action_error;
use crate::graphql::types::{AddCommentInput, CreatePostInput, DeleteResult, Post};
use crate::posts::domain::validate_text;
use crate::posts::{PostActions, PostId, UserId};

fn checked_text(ctx: &Context<'_>, raw: &str) -> Result<String> {
    let min_len = ctx
        .data_opt::<ValidationConfig>()
        .copied()
        .unwrap_or_default()
        .min_text_len;
    validate_text(raw, min_len).map_err(|e| {
        Error::new(e.to_string()).extend_with(|_, ext| ext.set("code", "BAD_USER_INPUT"))
    })
}

/// GraphQL Mutation root
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Create a top-level post
    async fn create_post(&self, ctx: &Context<'_>, input: CreatePostInput) -> Result<Post> {
        let actions = ctx.data::<PostActions>()?;
        let text = checked_text(ctx, &input.text)?;

        let id = actions
            .create_post(
                &text,
                &UserId::new(input.author_id),
                input.community_id.as_deref(),
                input.path.as_deref().unwrap_or("/"),
            )
            .await
            .map_err(action_error)?;

        let post = actions.fetch_post_by_id(&id).await.map_err(action_error)?;
        Ok(post.into())
    }

    /// Delete a post together with every reply beneath it
    async fn delete_post(
        &self,
        ctx: &Context<'_>,
        id: String,
        path: Option<String>,
    ) -> Result<DeleteResult> {
        let actions = ctx.data::<PostActions>()?;
        let plan = actions
            .delete_post(&PostId::new(id), path.as_deref().unwrap_or("/"))
            .await
            .map_err(action_error)?;
        Ok(plan.into())
    }

    /// Reply to a post
    async fn add_comment(&self, ctx: &Context<'_>, input: AddCommentInput) -> Result<Post> {
        let actions = ctx.data::<PostActions>()?;
        let text = checked_text(ctx, &input.text)?;
        let path = input
            .path
            .unwrap_or_else(|| format!("/rendezveux/{}", input.post_id));

        let id = actions
            .add_comment(
                &PostId::new(input.post_id),
                &text,
                &UserId::new(input.user_id),
                &path,
            )
            .await
            .map_err(action_error)?;

        let comment = actions.fetch_post_by_id(&id).await.map_err(action_error)?;
        Ok(comment.into())
    }
}
