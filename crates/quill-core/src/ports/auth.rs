//! Authentication ports: token issuance/verification and password hashing.

use uuid::Uuid;

use crate::domain::{Role, User};

/// Claims carried by an access token.
#[derive(Debug, Clone)]
pub struct AccessClaims {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: i64,
}

/// Token service: stateless access tokens plus longer-lived refresh
/// tokens. Refresh tokens are only useful together with the value stored
/// on the user record; the service itself keeps no state.
pub trait TokenService: Send + Sync {
    /// Issue a short-lived access token encoding {id, email, role}.
    fn issue_access_token(&self, user: &User) -> Result<String, AuthError>;

    /// Issue a refresh token encoding only the user id.
    fn issue_refresh_token(&self, user: &User) -> Result<String, AuthError>;

    /// Decode and verify an access token.
    fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AuthError>;

    /// Decode and verify a refresh token, returning the user id.
    fn verify_refresh_token(&self, token: &str) -> Result<Uuid, AuthError>;

    /// Access-token lifetime, for the login/refresh response body.
    fn access_expiration_seconds(&self) -> i64;
}

/// Password hashing service: opaque one-way hash and verify.
pub trait PasswordService: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Authentication errors. `Expired` (valid signature, past expiry) is kept
/// separate from `Invalid` so callers can prompt a refresh instead of a
/// full re-login.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Missing authorization header")]
    MissingAuth,

    #[error("Hashing error: {0}")]
    Hashing(String),
}
