//! Domain entities - the core business objects.

mod comment;
mod post;
mod user;

pub use comment::Comment;
pub use post::{Post, PostPatch, PostStatus, normalize_tags, slugify};
pub use user::{Role, User};
