//! Comment operations, scoped to a parent post's visibility.

use std::sync::Arc;

use uuid::Uuid;

use crate::authz::{Action, Actor, can_perform, ensure};
use crate::domain::Comment;
use crate::error::{DomainError, DomainResult};
use crate::pagination::{Page, PageRequest, SortOrder};
use crate::ports::{CommentRepository, PostRepository, UserRepository};
use crate::service::post::AuthorRef;

#[derive(Debug, Clone, Default)]
pub struct CommentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_order: SortOrder,
}

/// A comment joined with its resolved author.
#[derive(Debug, Clone)]
pub struct CommentDetails {
    pub comment: Comment,
    pub author: Option<AuthorRef>,
}

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            comments,
            posts,
            users,
        }
    }

    /// Join a comment with its author record.
    pub async fn with_author(&self, comment: Comment) -> DomainResult<CommentDetails> {
        let author = self
            .users
            .find_by_id(comment.author)
            .await?
            .map(|user| AuthorRef {
                id: user.id,
                name: user.name,
                email: user.email,
            });
        Ok(CommentDetails { comment, author })
    }

    pub async fn page_with_authors(
        &self,
        page: Page<Comment>,
    ) -> DomainResult<Page<CommentDetails>> {
        let mut items = Vec::with_capacity(page.items.len());
        for comment in page.items {
            items.push(self.with_author(comment).await?);
        }
        Ok(Page {
            items,
            pagination: page.pagination,
        })
    }

    /// List comments under a post. The parent must pass the post read
    /// rule for this actor; hidden posts stay hidden.
    pub async fn list(
        &self,
        actor: &Actor,
        post_id: Uuid,
        query: CommentListQuery,
    ) -> DomainResult<Page<Comment>> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(DomainError::NotFound("post"))?;
        if !can_perform(actor, &Action::ListComments(&post)) {
            return Err(DomainError::NotFound("post"));
        }

        let request = PageRequest::new(query.page, query.limit);
        let items = self
            .comments
            .find_page_by_post(post_id, query.sort_order, request.skip(), request.limit())
            .await?;
        let total = self.comments.count_by_post(post_id).await?;
        Ok(Page::new(items, request, total))
    }

    /// Add a comment. The parent must be published right now; drafts are
    /// reported as missing even to their author.
    pub async fn create(
        &self,
        actor: &Actor,
        post_id: Uuid,
        content: String,
    ) -> DomainResult<Comment> {
        let identity = actor.identity().ok_or(DomainError::Unauthenticated)?;
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(DomainError::NotFound("post"))?;
        if !can_perform(actor, &Action::CreateComment(&post)) {
            return Err(DomainError::NotFound("post"));
        }

        validate_content(&content)?;
        let comment = self
            .comments
            .create(Comment::new(identity.id, post.id, content))
            .await?;
        tracing::debug!(comment_id = %comment.id, post_id = %post.id, "comment added");
        Ok(comment)
    }

    /// Edit a comment; author only. Content-identical edits are no-ops
    /// for the edit bookkeeping.
    pub async fn update(
        &self,
        actor: &Actor,
        comment_id: Uuid,
        content: String,
    ) -> DomainResult<Comment> {
        let mut comment = self
            .comments
            .find_by_id(comment_id)
            .await?
            .ok_or(DomainError::NotFound("comment"))?;
        ensure(actor, &Action::UpdateComment(&comment))?;

        validate_content(&content)?;
        comment.edit(content);
        Ok(self.comments.update(comment).await?)
    }

    /// Delete a comment; author or admin. Independent of the parent
    /// post's current status.
    pub async fn delete(&self, actor: &Actor, comment_id: Uuid) -> DomainResult<()> {
        let comment = self
            .comments
            .find_by_id(comment_id)
            .await?
            .ok_or(DomainError::NotFound("comment"))?;
        ensure(actor, &Action::DeleteComment(&comment))?;

        self.comments.delete(comment.id).await?;
        tracing::debug!(comment_id = %comment.id, "comment deleted");
        Ok(())
    }
}

fn validate_content(content: &str) -> DomainResult<()> {
    let len = content.trim().chars().count();
    if !(1..=500).contains(&len) {
        return Err(DomainError::Validation(
            "Comment must be between 1 and 500 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_bounds() {
        assert!(validate_content("ok").is_ok());
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"x".repeat(501)).is_err());
        assert!(validate_content(&"x".repeat(500)).is_ok());
    }
}
