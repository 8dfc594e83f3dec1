//! Authentication handlers.

use actix_web::{HttpResponse, web};

use quill_core::domain::{Role, User};
use quill_core::service::{LoginInput, RegisterInput, TokenPair};
use quill_shared::ApiResponse;
use quill_shared::dto::{
    AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, UserResponse,
};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

pub fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
        created_at: user.created_at,
    }
}

fn auth_response(user: Option<&User>, pair: TokenPair) -> AuthResponse {
    AuthResponse {
        user: user.map(user_response),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: pair.expires_in,
    }
}

fn parse_role(role: Option<String>) -> AppResult<Option<Role>> {
    role.map(|r| {
        r.parse()
            .map_err(|_| AppError::BadRequest("Role must be either admin or author".to_string()))
    })
    .transpose()
}

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let role = parse_role(req.role)?;

    let (user, pair) = state
        .auth
        .register(RegisterInput {
            name: req.name,
            email: req.email,
            password: req.password,
            role,
        })
        .await?;

    Ok(HttpResponse::Created().json(auth_response(Some(&user), pair)))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let (user, pair) = state
        .auth
        .login(LoginInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(HttpResponse::Ok().json(auth_response(Some(&user), pair)))
}

/// POST /api/auth/refresh
pub async fn refresh(
    state: web::Data<AppState>,
    body: web::Json<RefreshRequest>,
) -> AppResult<HttpResponse> {
    let pair = state.auth.refresh(&body.refresh_token).await?;
    Ok(HttpResponse::Ok().json(auth_response(None, pair)))
}

/// POST /api/auth/logout - Protected route
pub async fn logout(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    state.auth.logout(&identity.actor()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message((), "Logout successful")))
}

/// GET /api/auth/profile - Protected route
pub async fn profile(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let user = state.auth.profile(&identity.actor()).await?;
    Ok(HttpResponse::Ok().json(user_response(&user)))
}
