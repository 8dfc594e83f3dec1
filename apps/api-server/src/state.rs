//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{CommentRepository, PasswordService, PostRepository, TokenService, UserRepository};
use quill_core::service::{AuthService, CommentService, PostService};
use quill_infra::{
    DatabaseConfig, InMemoryCommentRepository, InMemoryPostRepository, InMemoryUserRepository,
};

#[cfg(feature = "postgres")]
use quill_infra::{PostgresCommentRepository, PostgresPostRepository, PostgresUserRepository};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    /// Which repository backend is live: "postgres" or "in-memory".
    pub storage: &'static str,
}

struct Repositories {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
}

fn in_memory() -> Repositories {
    Repositories {
        users: Arc::new(InMemoryUserRepository::new()),
        posts: Arc::new(InMemoryPostRepository::new()),
        comments: Arc::new(InMemoryCommentRepository::new()),
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(
        db_config: Option<&DatabaseConfig>,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
    ) -> Self {
        #[cfg(feature = "postgres")]
        let (repos, storage) = {
            if let Some(config) = db_config {
                match quill_infra::connect(config).await {
                    Ok(conn) => (
                        Repositories {
                            users: Arc::new(PostgresUserRepository::new(conn.clone())),
                            posts: Arc::new(PostgresPostRepository::new(conn.clone())),
                            comments: Arc::new(PostgresCommentRepository::new(conn)),
                        },
                        "postgres",
                    ),
                    Err(e) => {
                        tracing::error!(
                            "Failed to connect to database: {}. Using in-memory fallback.",
                            e
                        );
                        (in_memory(), "in-memory")
                    }
                }
            } else {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                (in_memory(), "in-memory")
            }
        };

        #[cfg(not(feature = "postgres"))]
        let (repos, storage) = {
            let _ = db_config;
            tracing::info!("Running without postgres feature - using in-memory repositories");
            (in_memory(), "in-memory")
        };

        let auth = Arc::new(AuthService::new(
            repos.users.clone(),
            tokens,
            passwords,
        ));
        let posts = Arc::new(PostService::new(
            repos.posts.clone(),
            repos.comments.clone(),
            repos.users.clone(),
        ));
        let comments = Arc::new(CommentService::new(repos.comments, repos.posts, repos.users));

        tracing::info!("Application state initialized");

        Self {
            auth,
            posts,
            comments,
            storage,
        }
    }
}
