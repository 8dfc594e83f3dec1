//! Post handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use quill_core::domain::PostStatus;
use quill_core::pagination::{Page, SortBy, SortOrder};
use quill_core::service::{
    AuthorRef, CreatePostInput, PostDetails, PostListQuery, UpdatePostInput,
};
use quill_shared::dto::{
    AuthorResponse, CreatePostRequest, PostQueryParams, PostResponse, UpdatePostRequest,
    UpdatePostStatusRequest,
};

use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

pub fn author_response(author: AuthorRef) -> AuthorResponse {
    AuthorResponse {
        id: author.id,
        name: author.name,
        email: author.email,
    }
}

pub fn post_response(details: PostDetails) -> PostResponse {
    let post = details.post;
    PostResponse {
        id: post.id,
        title: post.title,
        content: post.content,
        author: details.author.map(author_response),
        status: post.status.as_str().to_string(),
        tags: post.tags,
        slug: post.slug,
        read_time: post.read_time,
        views: post.views,
        comments_count: details.comments_count,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

fn page_response(page: Page<PostDetails>) -> Page<PostResponse> {
    Page {
        items: page.items.into_iter().map(post_response).collect(),
        pagination: page.pagination,
    }
}

fn parse_status(status: &str) -> AppResult<PostStatus> {
    status
        .parse()
        .map_err(|_| AppError::BadRequest("Status must be either draft or published".to_string()))
}

fn parse_sort_by(sort_by: &str) -> AppResult<SortBy> {
    match sort_by {
        "createdAt" => Ok(SortBy::CreatedAt),
        "updatedAt" => Ok(SortBy::UpdatedAt),
        "title" => Ok(SortBy::Title),
        "views" => Ok(SortBy::Views),
        _ => Err(AppError::BadRequest(
            "sortBy must be one of createdAt, updatedAt, title, views".to_string(),
        )),
    }
}

pub fn parse_sort_order(sort_order: &str) -> AppResult<SortOrder> {
    match sort_order {
        "asc" => Ok(SortOrder::Asc),
        "desc" => Ok(SortOrder::Desc),
        _ => Err(AppError::BadRequest(
            "sortOrder must be asc or desc".to_string(),
        )),
    }
}

fn list_query(params: PostQueryParams) -> AppResult<PostListQuery> {
    Ok(PostListQuery {
        page: params.page,
        limit: params.limit,
        search: params.search,
        tags: params
            .tags
            .map(|t| t.split(',').map(str::to_string).collect())
            .unwrap_or_default(),
        status: params.status.as_deref().map(parse_status).transpose()?,
        sort_by: params
            .sort_by
            .as_deref()
            .map(parse_sort_by)
            .transpose()?
            .unwrap_or_default(),
        sort_order: params
            .sort_order
            .as_deref()
            .map(parse_sort_order)
            .transpose()?
            .unwrap_or_default(),
    })
}

/// GET /api/posts - Public listing of published posts
pub async fn list(
    state: web::Data<AppState>,
    params: web::Query<PostQueryParams>,
) -> AppResult<HttpResponse> {
    let query = list_query(params.into_inner())?;
    let page = state.posts.list_published(query).await?;
    let page = state.posts.page_with_details(page).await?;
    Ok(HttpResponse::Ok().json(page_response(page)))
}

/// GET /api/posts/my - Protected route, includes the caller's drafts
pub async fn my_posts(
    state: web::Data<AppState>,
    identity: Identity,
    params: web::Query<PostQueryParams>,
) -> AppResult<HttpResponse> {
    let query = list_query(params.into_inner())?;
    let page = state.posts.list_own(&identity.actor(), query).await?;
    let page = state.posts.page_with_details(page).await?;
    Ok(HttpResponse::Ok().json(page_response(page)))
}

/// GET /api/posts/stats - Admin only
pub async fn stats(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let report = state.posts.stats(&identity.actor()).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// GET /api/posts/{id}
pub async fn get(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = state
        .posts
        .get(&identity.actor(), path.into_inner())
        .await?;
    let details = state.posts.with_details(post).await?;
    Ok(HttpResponse::Ok().json(post_response(details)))
}

/// POST /api/posts - Protected route
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let input = CreatePostInput {
        title: req.title,
        content: req.content,
        status: req.status.as_deref().map(parse_status).transpose()?,
        tags: req.tags.unwrap_or_default(),
    };
    let post = state.posts.create(&identity.actor(), input).await?;
    let details = state.posts.with_details(post).await?;
    Ok(HttpResponse::Created().json(post_response(details)))
}

/// PUT /api/posts/{id} - Author or admin
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let input = UpdatePostInput {
        title: req.title,
        content: req.content,
        status: req.status.as_deref().map(parse_status).transpose()?,
        tags: req.tags,
    };
    let post = state
        .posts
        .update(&identity.actor(), path.into_inner(), input)
        .await?;
    let details = state.posts.with_details(post).await?;
    Ok(HttpResponse::Ok().json(post_response(details)))
}

/// PATCH /api/posts/{id}/status - Author or admin
pub async fn change_status(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePostStatusRequest>,
) -> AppResult<HttpResponse> {
    let status = parse_status(&body.status)?;
    let post = state
        .posts
        .change_status(&identity.actor(), path.into_inner(), status)
        .await?;
    let details = state.posts.with_details(post).await?;
    Ok(HttpResponse::Ok().json(post_response(details)))
}

/// DELETE /api/posts/{id} - Author or admin
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .delete(&identity.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
