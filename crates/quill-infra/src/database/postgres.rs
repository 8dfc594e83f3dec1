//! PostgreSQL repository implementations.
//!
//! Rotation and view increments are expressed as filtered `UPDATE`
//! statements so the precondition check and the write happen in one
//! atomic statement on the database side.

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbConn, DbErr, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use quill_core::domain::{Comment, Post, PostStatus, User};
use quill_core::error::RepoError;
use quill_core::pagination::{SortBy, SortOrder};
use quill_core::ports::{
    AuthorStat, CommentRepository, PostFilter, PostRepository, PostStats, UserRepository,
};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};

fn map_db_err(e: DbErr) -> RepoError {
    match e {
        DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => RepoError::NotFound,
        other => {
            let msg = other.to_string();
            if msg.contains("duplicate") || msg.contains("unique") {
                RepoError::Constraint(msg)
            } else {
                RepoError::Query(msg)
            }
        }
    }
}

pub struct PostgresUserRepository {
    db: DbConn,
}

impl PostgresUserRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, RepoError> {
        let active: user::ActiveModel = user.into();
        let model = active.insert(&self.db).await.map_err(map_db_err)?;
        Ok(model.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.map(Into::into))
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<String>) -> Result<(), RepoError> {
        let result = UserEntity::update_many()
            .col_expr(user::Column::RefreshToken, Expr::value(token))
            .col_expr(
                user::Column::UpdatedAt,
                Expr::value(chrono::Utc::now()),
            )
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        old: &str,
        new: &str,
    ) -> Result<bool, RepoError> {
        // The old-value filter makes this a compare-and-swap; a stale
        // token matches zero rows.
        let result = UserEntity::update_many()
            .col_expr(user::Column::RefreshToken, Expr::value(new.to_string()))
            .col_expr(
                user::Column::UpdatedAt,
                Expr::value(chrono::Utc::now()),
            )
            .filter(user::Column::Id.eq(id))
            .filter(user::Column::RefreshToken.eq(old))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected == 1)
    }
}

pub struct PostgresPostRepository {
    db: DbConn,
}

impl PostgresPostRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

fn post_condition(filter: &PostFilter) -> Condition {
    let mut cond = Condition::all();
    if let Some(status) = filter.status {
        cond = cond.add(post::Column::Status.eq(status.as_str()));
    }
    if let Some(author) = filter.author {
        cond = cond.add(post::Column::Author.eq(author));
    }
    if let Some(search) = &filter.search {
        cond = cond.add(
            Condition::any()
                .add(post::Column::Title.contains(search.as_str()))
                .add(post::Column::Content.contains(search.as_str()))
                .add(Expr::cust_with_values(
                    "EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag LIKE '%' || ? || '%')",
                    [search.clone()],
                )),
        );
    }
    if !filter.tags.is_empty() {
        let mut any = Condition::any();
        for tag in &filter.tags {
            any = any.add(Expr::cust_with_values("? = ANY(tags)", [tag.clone()]));
        }
        cond = cond.add(any);
    }
    cond
}

fn sort_column(sort_by: SortBy) -> post::Column {
    match sort_by {
        SortBy::CreatedAt => post::Column::CreatedAt,
        SortBy::UpdatedAt => post::Column::UpdatedAt,
        SortBy::Title => post::Column::Title,
        SortBy::Views => post::Column::Views,
    }
}

fn sort_order(order: SortOrder) -> Order {
    match order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(&self, post: Post) -> Result<Post, RepoError> {
        let active: post::ActiveModel = post.into();
        let model = active.insert(&self.db).await.map_err(map_db_err)?;
        Ok(model.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let result = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.map(Into::into))
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let active: post::ActiveModel = post.into();
        let model = active.update(&self.db).await.map_err(map_db_err)?;
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = PostEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn increment_views(&self, id: Uuid) -> Result<(), RepoError> {
        PostEntity::update_many()
            .col_expr(
                post::Column::Views,
                Expr::col(post::Column::Views).add(1),
            )
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::Status.eq(PostStatus::Published.as_str()))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
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
        let result = PostEntity::find()
            .filter(post_condition(filter))
            .order_by(sort_column(sort_by), sort_order(order))
            .offset(skip)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        PostEntity::find()
            .filter(post_condition(filter))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn stats(&self) -> Result<PostStats, RepoError> {
        let total_posts = PostEntity::find().count(&self.db).await.map_err(map_db_err)?;
        let published_posts = PostEntity::find()
            .filter(post::Column::Status.eq(PostStatus::Published.as_str()))
            .count(&self.db)
            .await
            .map_err(map_db_err)?;
        // Counted with its own predicate; the three counts are separate
        // queries and may observe different snapshots, so none of them
        // is derived from another.
        let draft_posts = PostEntity::find()
            .filter(post::Column::Status.eq(PostStatus::Draft.as_str()))
            .count(&self.db)
            .await
            .map_err(map_db_err)?;
        let total_views: Option<i64> = PostEntity::find()
            .select_only()
            .column_as(
                post::Column::Views.sum().cast_as(Alias::new("BIGINT")),
                "total_views",
            )
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .flatten();

        Ok(PostStats {
            total_posts,
            published_posts,
            draft_posts,
            total_views: total_views.unwrap_or(0).max(0) as u64,
        })
    }

    async fn top_authors(&self, limit: u64) -> Result<Vec<AuthorStat>, RepoError> {
        let rows: Vec<(Uuid, i64, Option<i64>)> = PostEntity::find()
            .select_only()
            .column(post::Column::Author)
            .column_as(post::Column::Id.count(), "post_count")
            .column_as(
                post::Column::Views.sum().cast_as(Alias::new("BIGINT")),
                "total_views",
            )
            .filter(post::Column::Status.eq(PostStatus::Published.as_str()))
            .group_by(post::Column::Author)
            .order_by(post::Column::Id.count(), Order::Desc)
            .limit(limit)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows
            .into_iter()
            .map(|(author, post_count, total_views)| AuthorStat {
                author,
                post_count: post_count.max(0) as u64,
                total_views: total_views.unwrap_or(0).max(0) as u64,
            })
            .collect())
    }
}

pub struct PostgresCommentRepository {
    db: DbConn,
}

impl PostgresCommentRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create(&self, comment: Comment) -> Result<Comment, RepoError> {
        let active: comment::ActiveModel = comment.into();
        let model = active.insert(&self.db).await.map_err(map_db_err)?;
        Ok(model.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let result = CommentEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.map(Into::into))
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let active: comment::ActiveModel = comment.into();
        let model = active.update(&self.db).await.map_err(map_db_err)?;
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = CommentEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete_by_post(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let result = CommentEntity::delete_many()
            .filter(comment::Column::Post.eq(post_id))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected)
    }

    async fn find_page_by_post(
        &self,
        post_id: Uuid,
        order: SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Comment>, RepoError> {
        let result = CommentEntity::find()
            .filter(comment::Column::Post.eq(post_id))
            .order_by(comment::Column::CreatedAt, sort_order(order))
            .offset(skip)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn count_by_post(&self, post_id: Uuid) -> Result<u64, RepoError> {
        CommentEntity::find()
            .filter(comment::Column::Post.eq(post_id))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }
}
