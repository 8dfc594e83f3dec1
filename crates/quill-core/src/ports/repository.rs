//! Repository ports. Every mutation that must be consistent under
//! concurrent requests (refresh-token rotation, view increments) is a
//! single atomic operation against the store, never read-then-write in
//! the caller.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Comment, Post, PostStatus, User};
use crate::error::RepoError;
use crate::pagination::{SortBy, SortOrder};

/// Filter predicate for post listings. The same filter drives both the
/// page fetch and the total count.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub author: Option<Uuid>,
    /// Free-text search over title/content/tags; execution is delegated
    /// to the store.
    pub search: Option<String>,
    /// OR-match: a post matches if it carries any of these tags.
    pub tags: Vec<String>,
}

/// Grouped post counters for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostStats {
    pub total_posts: u64,
    pub published_posts: u64,
    pub draft_posts: u64,
    pub total_views: u64,
}

/// Per-author aggregate over published posts.
#[derive(Debug, Clone)]
pub struct AuthorStat {
    pub author: Uuid,
    pub post_count: u64,
    pub total_views: u64,
}

/// User repository with the refresh-token session field.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user; duplicate email fails with `Constraint`.
    async fn create(&self, user: User) -> Result<User, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Overwrite the stored refresh token (login issues, logout clears).
    async fn set_refresh_token(&self, id: Uuid, token: Option<String>) -> Result<(), RepoError>;

    /// Atomic compare-and-swap: replace the stored refresh token with
    /// `new` only if it currently equals `old`. Returns false when the
    /// precondition no longer holds (token already rotated or revoked).
    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        old: &str,
        new: &str,
    ) -> Result<bool, RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post; duplicate slug fails with `Constraint`.
    async fn create(&self, post: Post) -> Result<Post, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError>;

    async fn update(&self, post: Post) -> Result<Post, RepoError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;

    /// Atomic single-document increment; only touches published posts.
    async fn increment_views(&self, id: Uuid) -> Result<(), RepoError>;

    async fn find_page(
        &self,
        filter: &PostFilter,
        sort_by: SortBy,
        order: SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError>;

    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError>;

    /// One-shot aggregate over all posts.
    async fn stats(&self) -> Result<PostStats, RepoError>;

    /// Top authors by published post count, with summed views.
    async fn top_authors(&self, limit: u64) -> Result<Vec<AuthorStat>, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: Comment) -> Result<Comment, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError>;

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;

    /// Cascade step for post deletion; returns the number removed.
    async fn delete_by_post(&self, post_id: Uuid) -> Result<u64, RepoError>;

    async fn find_page_by_post(
        &self,
        post_id: Uuid,
        order: SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Comment>, RepoError>;

    async fn count_by_post(&self, post_id: Uuid) -> Result<u64, RepoError>;
}
