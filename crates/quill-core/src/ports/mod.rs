//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod repository;

pub use auth::{AccessClaims, AuthError, PasswordService, TokenService};
pub use repository::{
    AuthorStat, CommentRepository, PostFilter, PostRepository, PostStats, UserRepository,
};
