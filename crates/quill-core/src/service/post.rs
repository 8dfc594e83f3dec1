//! Post lifecycle operations: create, read (with view counting), partial
//! update, status transitions, cascade delete, listings, and admin stats.

use std::sync::Arc;

use uuid::Uuid;

use crate::authz::{Action, Actor, can_perform, ensure};
use crate::domain::{Post, PostPatch, PostStatus, normalize_tags};
use crate::error::{DomainError, DomainResult};
use crate::pagination::{Page, PageRequest, SortBy, SortOrder};
use crate::ports::{
    CommentRepository, PostFilter, PostRepository, PostStats, UserRepository,
};

#[derive(Debug, Clone)]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    pub status: Option<PostStatus>,
    pub tags: Vec<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<PostStatus>,
    pub tags: Option<Vec<String>>,
}

/// Listing parameters shared by the public and owner-scoped views. The
/// status filter is honored only on the owner-scoped view.
#[derive(Debug, Clone, Default)]
pub struct PostListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub tags: Vec<String>,
    pub status: Option<PostStatus>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

/// Author identity resolved for response payloads.
#[derive(Debug, Clone)]
pub struct AuthorRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// A post joined with its resolved author and comment count, the shape
/// served on read paths.
#[derive(Debug, Clone)]
pub struct PostDetails {
    pub post: Post,
    pub author: Option<AuthorRef>,
    pub comments_count: u64,
}

/// Admin stats payload: grouped counters plus the top published authors.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    #[serde(flatten)]
    pub stats: PostStats,
    pub top_authors: Vec<TopAuthor>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopAuthor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub post_count: u64,
    pub total_views: u64,
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    users: Arc<dyn UserRepository>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            posts,
            comments,
            users,
        }
    }

    pub async fn create(&self, actor: &Actor, input: CreatePostInput) -> DomainResult<Post> {
        let identity = actor.identity().ok_or(DomainError::Unauthenticated)?;
        ensure(actor, &Action::CreatePost)?;

        validate_title(&input.title)?;
        validate_content(&input.content)?;
        let tags = validate_tags(input.tags)?;

        let post = Post::new(
            identity.id,
            input.title.trim().to_string(),
            input.content,
            input.status.unwrap_or(PostStatus::Draft),
            tags,
        );
        let post = self.posts.create(post).await?;
        tracing::info!(post_id = %post.id, status = post.status.as_str(), "post created");
        Ok(post)
    }

    /// Fetch a single post. Posts the actor may not read are reported as
    /// missing. Every published read bumps the view counter through an
    /// atomic store-side increment.
    pub async fn get(&self, actor: &Actor, id: Uuid) -> DomainResult<Post> {
        let mut post = self.visible_post(actor, id).await?;

        if post.status == PostStatus::Published {
            self.posts.increment_views(post.id).await?;
            post.views += 1;
        }
        Ok(post)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdatePostInput,
    ) -> DomainResult<Post> {
        let mut post = self.visible_post(actor, id).await?;
        ensure(actor, &Action::UpdatePost(&post))?;

        if let Some(title) = &input.title {
            validate_title(title)?;
        }
        if let Some(content) = &input.content {
            validate_content(content)?;
        }
        let tags = input.tags.map(validate_tags).transpose()?;

        post.apply(PostPatch {
            title: input.title.map(|t| t.trim().to_string()),
            content: input.content,
            status: input.status,
            tags,
        });
        let post = self.posts.update(post).await?;
        tracing::debug!(post_id = %post.id, "post updated");
        Ok(post)
    }

    /// Explicit draft/published transition.
    pub async fn change_status(
        &self,
        actor: &Actor,
        id: Uuid,
        status: PostStatus,
    ) -> DomainResult<Post> {
        let mut post = self.visible_post(actor, id).await?;
        ensure(actor, &Action::ChangePostStatus(&post))?;

        post.apply(PostPatch {
            status: Some(status),
            ..Default::default()
        });
        let post = self.posts.update(post).await?;
        tracing::info!(post_id = %post.id, status = status.as_str(), "post status changed");
        Ok(post)
    }

    /// Delete a post and, first, every comment under it. The cascade is
    /// explicit so no orphaned comments can remain.
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> DomainResult<()> {
        let post = self.visible_post(actor, id).await?;
        ensure(actor, &Action::DeletePost(&post))?;

        let removed = self.comments.delete_by_post(post.id).await?;
        self.posts.delete(post.id).await?;
        tracing::info!(post_id = %post.id, comments_removed = removed, "post deleted");
        Ok(())
    }

    /// Public listing: published posts only, regardless of actor.
    pub async fn list_published(&self, query: PostListQuery) -> DomainResult<Page<Post>> {
        let filter = PostFilter {
            status: Some(PostStatus::Published),
            author: None,
            search: query.search.clone(),
            tags: normalize_tags(query.tags.clone()),
        };
        self.page(&filter, &query).await
    }

    /// Owner-scoped listing; the only view where a status filter applies.
    pub async fn list_own(&self, actor: &Actor, query: PostListQuery) -> DomainResult<Page<Post>> {
        let identity = actor.identity().ok_or(DomainError::Unauthenticated)?;
        let filter = PostFilter {
            status: query.status,
            author: Some(identity.id),
            search: query.search.clone(),
            tags: normalize_tags(query.tags.clone()),
        };
        self.page(&filter, &query).await
    }

    /// Admin-only aggregates.
    pub async fn stats(&self, actor: &Actor) -> DomainResult<StatsReport> {
        ensure(actor, &Action::ViewStats)?;

        let stats = self.posts.stats().await?;
        let mut top_authors = Vec::new();
        for stat in self.posts.top_authors(5).await? {
            if let Some(user) = self.users.find_by_id(stat.author).await? {
                top_authors.push(TopAuthor {
                    id: user.id,
                    name: user.name,
                    email: user.email,
                    post_count: stat.post_count,
                    total_views: stat.total_views,
                });
            }
        }
        Ok(StatsReport { stats, top_authors })
    }

    /// Join a post with its author record and comment count.
    pub async fn with_details(&self, post: Post) -> DomainResult<PostDetails> {
        let author = self
            .users
            .find_by_id(post.author)
            .await?
            .map(|user| AuthorRef {
                id: user.id,
                name: user.name,
                email: user.email,
            });
        let comments_count = self.comments.count_by_post(post.id).await?;
        Ok(PostDetails {
            post,
            author,
            comments_count,
        })
    }

    pub async fn page_with_details(&self, page: Page<Post>) -> DomainResult<Page<PostDetails>> {
        let mut items = Vec::with_capacity(page.items.len());
        for post in page.items {
            items.push(self.with_details(post).await?);
        }
        Ok(Page {
            items,
            pagination: page.pagination,
        })
    }

    /// Fetch a post and hide it (as NotFound) from actors who fail the
    /// read rule, so existence is never leaked.
    async fn visible_post(&self, actor: &Actor, id: Uuid) -> DomainResult<Post> {
        let post = self
            .posts
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound("post"))?;
        if !can_perform(actor, &Action::ReadPost(&post)) {
            return Err(DomainError::NotFound("post"));
        }
        Ok(post)
    }

    async fn page(&self, filter: &PostFilter, query: &PostListQuery) -> DomainResult<Page<Post>> {
        let request = PageRequest::new(query.page, query.limit);
        let items = self
            .posts
            .find_page(
                filter,
                query.sort_by,
                query.sort_order,
                request.skip(),
                request.limit(),
            )
            .await?;
        // The total comes from a separate count of the same predicate.
        let total = self.posts.count(filter).await?;
        Ok(Page::new(items, request, total))
    }
}

fn validate_title(title: &str) -> DomainResult<()> {
    let len = title.trim().chars().count();
    if !(5..=200).contains(&len) {
        return Err(DomainError::Validation(
            "Title must be between 5 and 200 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_content(content: &str) -> DomainResult<()> {
    if content.chars().count() < 10 {
        return Err(DomainError::Validation(
            "Content must be at least 10 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_tags(tags: Vec<String>) -> DomainResult<Vec<String>> {
    let tags = normalize_tags(tags);
    if tags.len() > 10 {
        return Err(DomainError::Validation(
            "Cannot have more than 10 tags".to_string(),
        ));
    }
    if tags.iter().any(|t| t.chars().count() > 30) {
        return Err(DomainError::Validation(
            "Each tag must be between 1 and 30 characters".to_string(),
        ));
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_bounds() {
        assert!(validate_title("Valid title").is_ok());
        assert!(validate_title("tiny").is_err());
        assert!(validate_title(&"x".repeat(201)).is_err());
    }

    #[test]
    fn tag_bounds() {
        assert!(validate_tags((0..11).map(|i| format!("t{i}")).collect()).is_err());
        assert!(validate_tags(vec!["x".repeat(31)]).is_err());
        // Duplicates collapse before the count check.
        let tags: Vec<String> = (0..11).map(|_| "same".to_string()).collect();
        assert_eq!(validate_tags(tags).unwrap(), vec!["same".to_string()]);
    }
}
