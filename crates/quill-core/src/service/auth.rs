//! Account and session operations: register, login, refresh-token
//! rotation, logout, profile.

use std::sync::Arc;

use crate::authz::Actor;
use crate::domain::{Role, User};
use crate::error::{DomainError, DomainResult};
use crate::ports::{AuthError, PasswordService, TokenService, UserRepository};

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Freshly issued access + refresh tokens.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenService>,
    passwords: Arc<dyn PasswordService>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
    ) -> Self {
        Self {
            users,
            tokens,
            passwords,
        }
    }

    /// Register a new account. The issued refresh token is persisted on
    /// the user record as the single active session.
    pub async fn register(&self, input: RegisterInput) -> DomainResult<(User, TokenPair)> {
        validate_name(&input.name)?;
        validate_email(&input.email)?;
        validate_password(&input.password)?;

        let email = input.email.trim().to_lowercase();
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let password_hash = self.passwords.hash(&input.password)?;
        let mut user = User::new(
            input.name,
            email,
            password_hash,
            input.role.unwrap_or(Role::Author),
        );

        let refresh_token = self.tokens.issue_refresh_token(&user)?;
        user.refresh_token = Some(refresh_token.clone());
        let user = self.users.create(user).await?;

        let access_token = self.tokens.issue_access_token(&user)?;
        tracing::info!(user_id = %user.id, "user registered");

        Ok((
            user,
            TokenPair {
                access_token,
                refresh_token,
                expires_in: self.tokens.access_expiration_seconds(),
            },
        ))
    }

    /// Login with email + password. Unknown email and wrong password fail
    /// identically so accounts cannot be enumerated.
    pub async fn login(&self, input: LoginInput) -> DomainResult<(User, TokenPair)> {
        let email = input.email.trim().to_lowercase();
        let mut user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(DomainError::Unauthenticated)?;

        if !self.passwords.verify(&input.password, &user.password_hash)? {
            return Err(DomainError::Unauthenticated);
        }

        let refresh_token = self.tokens.issue_refresh_token(&user)?;
        self.users
            .set_refresh_token(user.id, Some(refresh_token.clone()))
            .await?;
        user.refresh_token = Some(refresh_token.clone());

        let access_token = self.tokens.issue_access_token(&user)?;
        tracing::info!(user_id = %user.id, "user logged in");

        Ok((
            user,
            TokenPair {
                access_token,
                refresh_token,
                expires_in: self.tokens.access_expiration_seconds(),
            },
        ))
    }

    /// Rotate a refresh token. Succeeds only when the token verifies and
    /// still equals the stored value; the swap is a single atomic
    /// compare-and-swap, so a token can be rotated at most once.
    pub async fn refresh(&self, refresh_token: &str) -> DomainResult<TokenPair> {
        let user_id = self.tokens.verify_refresh_token(refresh_token)?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::Invalid("refresh token not recognized".to_string()))?;

        let new_refresh = self.tokens.issue_refresh_token(&user)?;
        let rotated = self
            .users
            .rotate_refresh_token(user.id, refresh_token, &new_refresh)
            .await?;
        if !rotated {
            // Already rotated or revoked; the presented token is dead.
            return Err(AuthError::Invalid("refresh token not recognized".to_string()).into());
        }

        let access_token = self.tokens.issue_access_token(&user)?;
        tracing::debug!(user_id = %user.id, "refresh token rotated");

        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh,
            expires_in: self.tokens.access_expiration_seconds(),
        })
    }

    /// Clear the stored refresh token; subsequent rotations fail.
    pub async fn logout(&self, actor: &Actor) -> DomainResult<()> {
        let identity = actor.identity().ok_or(DomainError::Unauthenticated)?;
        self.users.set_refresh_token(identity.id, None).await?;
        tracing::info!(user_id = %identity.id, "user logged out");
        Ok(())
    }

    pub async fn profile(&self, actor: &Actor) -> DomainResult<User> {
        let identity = actor.identity().ok_or(DomainError::Unauthenticated)?;
        self.users
            .find_by_id(identity.id)
            .await?
            .ok_or(DomainError::NotFound("user"))
    }
}

fn validate_name(name: &str) -> DomainResult<()> {
    let len = name.trim().chars().count();
    if !(2..=50).contains(&len) {
        return Err(DomainError::Validation(
            "Name must be between 2 and 50 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> DomainResult<()> {
    let email = email.trim();
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
    });
    if !valid {
        return Err(DomainError::Validation(
            "Please provide a valid email address".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> DomainResult<()> {
    let strong = password.len() >= 6
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit());
    if !strong {
        return Err(DomainError::Validation(
            "Password must be at least 6 characters with an uppercase letter, a lowercase letter, and a number"
                .to_string(),
        ));
    }
    Ok(())
}
