//! Application services: every backend operation as a named function
//! taking a validated input struct plus an [`Actor`](crate::authz::Actor).

mod auth;
mod comment;
mod post;

pub use auth::{AuthService, LoginInput, RegisterInput, TokenPair};
pub use comment::{CommentDetails, CommentListQuery, CommentService};
pub use post::{
    AuthorRef, CreatePostInput, PostDetails, PostListQuery, PostService, StatsReport, TopAuthor,
    UpdatePostInput,
};
