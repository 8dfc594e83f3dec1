//! Authorization policy.
//!
//! All per-operation access rules are consolidated into one pure decision
//! function so the rule set is testable in isolation and cannot drift
//! between call sites.

use uuid::Uuid;

use crate::domain::{Comment, Post, PostStatus, Role};
use crate::error::DomainError;

/// Authenticated identity attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
}

/// The party performing a request: an authenticated identity or nobody.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User(Identity),
}

impl Actor {
    pub fn user(id: Uuid, role: Role) -> Self {
        Actor::User(Identity { id, role })
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Actor::Anonymous => None,
            Actor::User(identity) => Some(identity),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::User(Identity { role: Role::Admin, .. }))
    }

    fn is(&self, user_id: Uuid) -> bool {
        matches!(self, Actor::User(identity) if identity.id == user_id)
    }
}

/// An action against a concrete resource state.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    ReadPost(&'a Post),
    CreatePost,
    UpdatePost(&'a Post),
    DeletePost(&'a Post),
    ChangePostStatus(&'a Post),
    ListComments(&'a Post),
    CreateComment(&'a Post),
    UpdateComment(&'a Comment),
    DeleteComment(&'a Comment),
    ViewStats,
}

/// Pure decision function mapping (actor, action, resource state) to a
/// verdict. No side effects, no I/O.
pub fn can_perform(actor: &Actor, action: &Action<'_>) -> bool {
    match action {
        Action::ReadPost(post) | Action::ListComments(post) => {
            post.status == PostStatus::Published || actor.is(post.author) || actor.is_admin()
        }
        // Both roles may write posts; authentication is the only gate.
        Action::CreatePost => actor.identity().is_some(),
        Action::UpdatePost(post) | Action::DeletePost(post) | Action::ChangePostStatus(post) => {
            actor.is(post.author) || actor.is_admin()
        }
        // Publication gates commenting; even the author cannot comment on
        // their own draft.
        Action::CreateComment(post) => {
            actor.identity().is_some() && post.status == PostStatus::Published
        }
        Action::UpdateComment(comment) => actor.is(comment.author),
        Action::DeleteComment(comment) => actor.is(comment.author) || actor.is_admin(),
        Action::ViewStats => actor.is_admin(),
    }
}

/// Gate an action, converting a denial into the right failure: anonymous
/// callers get `Unauthenticated`, authenticated ones `Forbidden`.
pub fn ensure(actor: &Actor, action: &Action<'_>) -> Result<(), DomainError> {
    if can_perform(actor, action) {
        return Ok(());
    }
    match actor {
        Actor::Anonymous => Err(DomainError::Unauthenticated),
        Actor::User(_) => Err(DomainError::Forbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Post;

    fn post(author: Uuid, status: PostStatus) -> Post {
        Post::new(
            author,
            "A title".into(),
            "Content long enough".into(),
            status,
            vec![],
        )
    }

    fn comment(author: Uuid) -> Comment {
        Comment::new(author, Uuid::new_v4(), "a comment".into())
    }

    #[test]
    fn anonymous_reads_exactly_published_posts() {
        let author = Uuid::new_v4();
        let published = post(author, PostStatus::Published);
        let draft = post(author, PostStatus::Draft);

        assert!(can_perform(&Actor::Anonymous, &Action::ReadPost(&published)));
        assert!(!can_perform(&Actor::Anonymous, &Action::ReadPost(&draft)));
    }

    #[test]
    fn author_and_admin_read_drafts() {
        let author = Uuid::new_v4();
        let draft = post(author, PostStatus::Draft);

        assert!(can_perform(&Actor::user(author, Role::Author), &Action::ReadPost(&draft)));
        assert!(can_perform(
            &Actor::user(Uuid::new_v4(), Role::Admin),
            &Action::ReadPost(&draft)
        ));
        assert!(!can_perform(
            &Actor::user(Uuid::new_v4(), Role::Author),
            &Action::ReadPost(&draft)
        ));
    }

    #[test]
    fn only_owner_or_admin_mutates_posts() {
        let author = Uuid::new_v4();
        let p = post(author, PostStatus::Published);
        let stranger = Actor::user(Uuid::new_v4(), Role::Author);

        assert!(!can_perform(&stranger, &Action::UpdatePost(&p)));
        assert!(!can_perform(&stranger, &Action::DeletePost(&p)));
        assert!(!can_perform(&stranger, &Action::ChangePostStatus(&p)));
        assert!(can_perform(&Actor::user(author, Role::Author), &Action::UpdatePost(&p)));
        assert!(can_perform(&Actor::user(Uuid::new_v4(), Role::Admin), &Action::DeletePost(&p)));
    }

    #[test]
    fn commenting_requires_auth_and_publication() {
        let author = Uuid::new_v4();
        let draft = post(author, PostStatus::Draft);
        let published = post(author, PostStatus::Published);

        assert!(!can_perform(&Actor::Anonymous, &Action::CreateComment(&published)));
        // The author cannot comment on their own draft either.
        assert!(!can_perform(
            &Actor::user(author, Role::Author),
            &Action::CreateComment(&draft)
        ));
        assert!(!can_perform(
            &Actor::user(Uuid::new_v4(), Role::Admin),
            &Action::CreateComment(&draft)
        ));
        assert!(can_perform(
            &Actor::user(Uuid::new_v4(), Role::Author),
            &Action::CreateComment(&published)
        ));
    }

    #[test]
    fn comment_edit_is_author_only_but_delete_permits_admin() {
        let author = Uuid::new_v4();
        let c = comment(author);
        let admin = Actor::user(Uuid::new_v4(), Role::Admin);

        assert!(!can_perform(&admin, &Action::UpdateComment(&c)));
        assert!(can_perform(&admin, &Action::DeleteComment(&c)));
        assert!(can_perform(&Actor::user(author, Role::Author), &Action::UpdateComment(&c)));
    }

    #[test]
    fn stats_are_admin_only() {
        assert!(can_perform(&Actor::user(Uuid::new_v4(), Role::Admin), &Action::ViewStats));
        assert!(!can_perform(&Actor::user(Uuid::new_v4(), Role::Author), &Action::ViewStats));
        assert!(!can_perform(&Actor::Anonymous, &Action::ViewStats));
    }

    #[test]
    fn ensure_distinguishes_401_from_403() {
        let draft = post(Uuid::new_v4(), PostStatus::Draft);

        assert!(matches!(
            ensure(&Actor::Anonymous, &Action::CreatePost),
            Err(DomainError::Unauthenticated)
        ));
        assert!(matches!(
            ensure(&Actor::user(Uuid::new_v4(), Role::Author), &Action::UpdatePost(&draft)),
            Err(DomainError::Forbidden)
        ));
    }
}
