//! Persistence implementations.

mod connections;
pub mod memory;

#[cfg(feature = "postgres")]
pub mod entity;
#[cfg(feature = "postgres")]
mod postgres;

pub use connections::DatabaseConfig;
pub use memory::{InMemoryCommentRepository, InMemoryPostRepository, InMemoryUserRepository};

#[cfg(feature = "postgres")]
pub use connections::connect;
#[cfg(feature = "postgres")]
pub use postgres::{PostgresCommentRepository, PostgresPostRepository, PostgresUserRepository};

// The scenario tests drive the services through the real JWT/Argon2
// implementations, so they need the auth feature.
#[cfg(all(test, feature = "auth"))]
mod tests;
