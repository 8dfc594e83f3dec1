//! JWT token service implementation.
//!
//! Access and refresh tokens are signed with separate secrets. Access
//! tokens are stateless; refresh tokens are only honored while they match
//! the value stored on the user record, which the auth service enforces.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quill_core::domain::{Role, User};
use quill_core::ports::{AccessClaims, AuthError, TokenService};

/// JWT token service configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_expiration_hours: i64,
    pub refresh_expiration_days: i64,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            access_secret: "change-me-in-production".to_string(),
            refresh_secret: "change-me-too-in-production".to_string(),
            access_expiration_hours: 1,
            refresh_expiration_days: 7,
            issuer: "quill-api".to_string(),
        }
    }
}

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
struct AccessTokenClaims {
    sub: String, // user id
    email: String,
    role: String,
    exp: i64,
    iat: i64,
    iss: String,
}

/// Claims carried by a refresh token; identity only.
#[derive(Debug, Serialize, Deserialize)]
struct RefreshTokenClaims {
    sub: String,
    exp: i64,
    iat: i64,
    iss: String,
}

/// JWT-based token service.
pub struct JwtTokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    config: JwtConfig,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            config,
        }
    }

    pub fn from_env() -> Self {
        let defaults = JwtConfig::default();

        let access_secret =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| defaults.access_secret.clone());
        let refresh_secret =
            std::env::var("JWT_REFRESH_SECRET").unwrap_or_else(|_| defaults.refresh_secret.clone());

        if access_secret == defaults.access_secret || refresh_secret == defaults.refresh_secret {
            let is_production = std::env::var("RUST_ENV")
                .map(|v| v == "production" || v == "prod")
                .unwrap_or(false);

            if is_production {
                tracing::error!(
                    "SECURITY: Using default JWT secrets in production! Set JWT_SECRET and JWT_REFRESH_SECRET."
                );
            } else {
                tracing::warn!(
                    "Using default JWT secrets. Set JWT_SECRET and JWT_REFRESH_SECRET for production use."
                );
            }
        }

        let config = JwtConfig {
            access_secret,
            refresh_secret,
            access_expiration_hours: std::env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.access_expiration_hours),
            refresh_expiration_days: std::env::var("JWT_REFRESH_EXPIRATION_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.refresh_expiration_days),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| defaults.issuer.clone()),
        };
        Self::new(config)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation
    }
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Invalid(e.to_string()),
    }
}

impl TokenService for JwtTokenService {
    fn issue_access_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + TimeDelta::hours(self.config.access_expiration_hours);

        let claims = AccessTokenClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| AuthError::Invalid(e.to_string()))
    }

    fn issue_refresh_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + TimeDelta::days(self.config.refresh_expiration_days);

        let claims = RefreshTokenClaims {
            sub: user.id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| AuthError::Invalid(e.to_string()))
    }

    fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let data = decode::<AccessTokenClaims>(token, &self.access_decoding, &self.validation())
            .map_err(map_decode_error)?;

        let user_id =
            Uuid::parse_str(&data.claims.sub).map_err(|e| AuthError::Invalid(e.to_string()))?;
        let role: Role = data
            .claims
            .role
            .parse()
            .map_err(|e: String| AuthError::Invalid(e))?;

        Ok(AccessClaims {
            user_id,
            email: data.claims.email,
            role,
            exp: data.claims.exp,
        })
    }

    fn verify_refresh_token(&self, token: &str) -> Result<Uuid, AuthError> {
        let data = decode::<RefreshTokenClaims>(token, &self.refresh_decoding, &self.validation())
            .map_err(map_decode_error)?;

        Uuid::parse_str(&data.claims.sub).map_err(|e| AuthError::Invalid(e.to_string()))
    }

    fn access_expiration_seconds(&self) -> i64 {
        self.config.access_expiration_hours * 3600
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            access_expiration_hours: 1,
            refresh_expiration_days: 7,
            issuer: "test-issuer".to_string(),
        }
    }

    fn test_user(role: Role) -> User {
        User::new("Ada".into(), "ada@example.com".into(), "hash".into(), role)
    }

    #[test]
    fn access_token_round_trip_preserves_identity() {
        let service = JwtTokenService::new(test_config());
        let user = test_user(Role::Admin);

        let token = service.issue_access_token(&user).unwrap();
        let claims = service.verify_access_token(&token).unwrap();

        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn refresh_token_round_trip() {
        let service = JwtTokenService::new(test_config());
        let user = test_user(Role::Author);

        let token = service.issue_refresh_token(&user).unwrap();
        assert_eq!(service.verify_refresh_token(&token).unwrap(), user.id);
    }

    #[test]
    fn access_and_refresh_secrets_are_not_interchangeable() {
        let service = JwtTokenService::new(test_config());
        let user = test_user(Role::Author);

        let refresh = service.issue_refresh_token(&user).unwrap();
        assert!(matches!(
            service.verify_access_token(&refresh),
            Err(AuthError::Invalid(_))
        ));

        let access = service.issue_access_token(&user).unwrap();
        assert!(matches!(
            service.verify_refresh_token(&access),
            Err(AuthError::Invalid(_))
        ));
    }

    #[test]
    fn expired_access_token_is_distinguished_from_invalid() {
        let mut config = test_config();
        // Negative lifetime puts the expiry safely past the decoder leeway.
        config.access_expiration_hours = -1;
        let service = JwtTokenService::new(config);
        let user = test_user(Role::Author);

        let token = service.issue_access_token(&user).unwrap();
        assert!(matches!(
            service.verify_access_token(&token),
            Err(AuthError::Expired)
        ));

        assert!(matches!(
            service.verify_access_token("garbage"),
            Err(AuthError::Invalid(_))
        ));
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let a = JwtTokenService::new(test_config());
        let mut other = test_config();
        other.issuer = "someone-else".to_string();
        let b = JwtTokenService::new(other);

        let token = a.issue_access_token(&test_user(Role::Author)).unwrap();
        assert!(b.verify_access_token(&token).is_err());
    }

    #[test]
    fn expiration_seconds() {
        let service = JwtTokenService::new(test_config());
        assert_eq!(service.access_expiration_seconds(), 3600);
    }
}
