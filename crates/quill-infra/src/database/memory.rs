//! In-memory repository implementations - used when no database is
//! configured, and as the store behind the service-level tests.
//!
//! The unique indexes (email, slug) and the atomic mutations
//! (refresh-token rotation, view increments) are enforced inside one
//! write-lock critical section each, matching the single-document
//! atomicity the services rely on.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Comment, Post, PostStatus, User};
use quill_core::error::RepoError;
use quill_core::pagination::{SortBy, SortOrder};
use quill_core::ports::{
    AuthorStat, CommentRepository, PostFilter, PostRepository, PostStats, UserRepository,
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepoError::Constraint("email already exists".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<String>) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(RepoError::NotFound)?;
        user.refresh_token = token;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        old: &str,
        new: &str,
    ) -> Result<bool, RepoError> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) if user.refresh_token.as_deref() == Some(old) => {
                user.refresh_token = Some(new.to_string());
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: RwLock<HashMap<Uuid, Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(post: &Post, filter: &PostFilter) -> bool {
    if let Some(status) = filter.status {
        if post.status != status {
            return false;
        }
    }
    if let Some(author) = filter.author {
        if post.author != author {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        let hit = post.title.to_lowercase().contains(&needle)
            || post.content.to_lowercase().contains(&needle)
            || post.tags.iter().any(|t| t.contains(&needle));
        if !hit {
            return false;
        }
    }
    if !filter.tags.is_empty() && !filter.tags.iter().any(|t| post.tags.contains(t)) {
        return false;
    }
    true
}

fn compare(a: &Post, b: &Post, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        SortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortBy::Title => a.title.cmp(&b.title),
        SortBy::Views => a.views.cmp(&b.views),
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn create(&self, post: Post) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        if posts.values().any(|p| p.slug == post.slug) {
            return Err(RepoError::Constraint("slug already exists".to_string()));
        }
        posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        if !posts.contains_key(&post.id) {
            return Err(RepoError::NotFound);
        }
        if posts
            .values()
            .any(|p| p.id != post.id && p.slug == post.slug)
        {
            return Err(RepoError::Constraint("slug already exists".to_string()));
        }
        posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut posts = self.posts.write().await;
        posts.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }

    async fn increment_views(&self, id: Uuid) -> Result<(), RepoError> {
        let mut posts = self.posts.write().await;
        let post = posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        if post.status == PostStatus::Published {
            post.views += 1;
        }
        Ok(())
    }

    async fn find_page(
        &self,
        filter: &PostFilter,
        sort_by: SortBy,
        order: SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let posts = self.posts.read().await;
        let mut matched: Vec<Post> = posts.values().filter(|p| matches(p, filter)).cloned().collect();
        matched.sort_by(|a, b| {
            let ord = compare(a, b, sort_by);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        Ok(matched
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        let posts = self.posts.read().await;
        Ok(posts.values().filter(|p| matches(p, filter)).count() as u64)
    }

    async fn stats(&self) -> Result<PostStats, RepoError> {
        let posts = self.posts.read().await;
        let mut stats = PostStats::default();
        for post in posts.values() {
            stats.total_posts += 1;
            match post.status {
                PostStatus::Published => stats.published_posts += 1,
                PostStatus::Draft => stats.draft_posts += 1,
            }
            stats.total_views += post.views;
        }
        Ok(stats)
    }

    async fn top_authors(&self, limit: u64) -> Result<Vec<AuthorStat>, RepoError> {
        let posts = self.posts.read().await;
        let mut by_author: HashMap<Uuid, (u64, u64)> = HashMap::new();
        for post in posts
            .values()
            .filter(|p| p.status == PostStatus::Published)
        {
            let entry = by_author.entry(post.author).or_default();
            entry.0 += 1;
            entry.1 += post.views;
        }
        let mut stats: Vec<AuthorStat> = by_author
            .into_iter()
            .map(|(author, (post_count, total_views))| AuthorStat {
                author,
                post_count,
                total_views,
            })
            .collect();
        stats.sort_by(|a, b| b.post_count.cmp(&a.post_count));
        stats.truncate(limit as usize);
        Ok(stats)
    }
}

#[derive(Default)]
pub struct InMemoryCommentRepository {
    comments: RwLock<HashMap<Uuid, Comment>>,
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn create(&self, comment: Comment) -> Result<Comment, RepoError> {
        self.comments
            .write()
            .await
            .insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.comments.read().await.get(&id).cloned())
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut comments = self.comments.write().await;
        if !comments.contains_key(&comment.id) {
            return Err(RepoError::NotFound);
        }
        comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut comments = self.comments.write().await;
        comments.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }

    async fn delete_by_post(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|_, c| c.post != post_id);
        Ok((before - comments.len()) as u64)
    }

    async fn find_page_by_post(
        &self,
        post_id: Uuid,
        order: SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Comment>, RepoError> {
        let comments = self.comments.read().await;
        let mut matched: Vec<Comment> = comments
            .values()
            .filter(|c| c.post == post_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| match order {
            SortOrder::Asc => a.created_at.cmp(&b.created_at),
            SortOrder::Desc => b.created_at.cmp(&a.created_at),
        });
        Ok(matched
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_by_post(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let comments = self.comments.read().await;
        Ok(comments.values().filter(|c| c.post == post_id).count() as u64)
    }
}
