//! Comment handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use quill_core::pagination::Page;
use quill_core::service::{CommentDetails, CommentListQuery};
use quill_shared::dto::{CommentQueryParams, CommentRequest, CommentResponse};

use crate::handlers::posts::{author_response, parse_sort_order};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

fn comment_response(details: CommentDetails) -> CommentResponse {
    let comment = details.comment;
    CommentResponse {
        id: comment.id,
        content: comment.content,
        author: details.author.map(author_response),
        post: comment.post,
        is_edited: comment.is_edited,
        edited_at: comment.edited_at,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }
}

/// GET /api/posts/{id}/comments - Visible whenever the parent post is
/// readable by the caller
pub async fn list(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
    params: web::Query<CommentQueryParams>,
) -> AppResult<HttpResponse> {
    let params = params.into_inner();
    let query = CommentListQuery {
        page: params.page,
        limit: params.limit,
        sort_order: params
            .sort_order
            .as_deref()
            .map(parse_sort_order)
            .transpose()?
            .unwrap_or_default(),
    };
    let page = state
        .comments
        .list(&identity.actor(), path.into_inner(), query)
        .await?;
    let page = state.comments.page_with_authors(page).await?;
    let page = Page {
        items: page.items.into_iter().map(comment_response).collect(),
        pagination: page.pagination,
    };
    Ok(HttpResponse::Ok().json(page))
}

/// POST /api/posts/{id}/comments - Protected route
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .comments
        .create(&identity.actor(), path.into_inner(), body.into_inner().content)
        .await?;
    let details = state.comments.with_author(comment).await?;
    Ok(HttpResponse::Created().json(comment_response(details)))
}

/// PUT /api/comments/{id} - Author only
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .comments
        .update(&identity.actor(), path.into_inner(), body.into_inner().content)
        .await?;
    let details = state.comments.with_author(comment).await?;
    Ok(HttpResponse::Ok().json(comment_response(details)))
}

/// DELETE /api/comments/{id} - Author or admin
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .comments
        .delete(&identity.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
