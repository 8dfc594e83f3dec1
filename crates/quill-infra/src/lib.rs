//! # Quill Infrastructure
//!
//! Concrete implementations of the ports defined in `quill-core`:
//! JWT tokens, Argon2 password hashing, and the repositories.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `postgres` - PostgreSQL repositories via SeaORM
//! - `auth` - JWT + Argon2 authentication
//!
//! The in-memory repositories are always available and back the
//! no-database mode and the test suite.

pub mod database;

#[cfg(feature = "auth")]
pub mod auth;

// Re-exports - In-Memory
pub use database::{
    DatabaseConfig, InMemoryCommentRepository, InMemoryPostRepository, InMemoryUserRepository,
};

#[cfg(feature = "auth")]
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};

#[cfg(feature = "postgres")]
pub use database::{
    PostgresCommentRepository, PostgresPostRepository, PostgresUserRepository, connect,
};
