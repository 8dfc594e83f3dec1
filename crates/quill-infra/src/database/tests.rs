//! Service-level scenario tests, wired with the in-memory repositories
//! and the real JWT and Argon2 services.

use std::sync::Arc;

use uuid::Uuid;

use quill_core::authz::Actor;
use quill_core::domain::{PostStatus, Role};
use quill_core::error::DomainError;
use quill_core::pagination::{SortBy, SortOrder};
use quill_core::ports::{
    AuthError, CommentRepository, PasswordService, PostRepository, TokenService, UserRepository,
};
use quill_core::service::{
    AuthService, CommentListQuery, CommentService, CreatePostInput, LoginInput, PostListQuery,
    PostService, RegisterInput,
};

use crate::auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
use crate::database::memory::{
    InMemoryCommentRepository, InMemoryPostRepository, InMemoryUserRepository,
};

struct Harness {
    auth: AuthService,
    posts: PostService,
    comments: CommentService,
    users: Arc<dyn UserRepository>,
    post_repo: Arc<dyn PostRepository>,
    comment_repo: Arc<dyn CommentRepository>,
}

fn harness() -> Harness {
    let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
    let post_repo: Arc<dyn PostRepository> = Arc::new(InMemoryPostRepository::new());
    let comment_repo: Arc<dyn CommentRepository> = Arc::new(InMemoryCommentRepository::new());
    let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(JwtConfig {
        access_secret: "test-access".into(),
        refresh_secret: "test-refresh".into(),
        access_expiration_hours: 1,
        refresh_expiration_days: 7,
        issuer: "test".into(),
    }));
    let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());

    Harness {
        auth: AuthService::new(users.clone(), tokens, passwords),
        posts: PostService::new(post_repo.clone(), comment_repo.clone(), users.clone()),
        comments: CommentService::new(comment_repo.clone(), post_repo.clone(), users.clone()),
        users,
        post_repo,
        comment_repo,
    }
}

async fn register(h: &Harness, name: &str, role: Role) -> (Actor, Uuid, String) {
    let (user, pair) = h
        .auth
        .register(RegisterInput {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password: "Secret1pass".to_string(),
            role: Some(role),
        })
        .await
        .unwrap();
    (Actor::user(user.id, user.role), user.id, pair.refresh_token)
}

fn post_input(title: &str, status: PostStatus) -> CreatePostInput {
    CreatePostInput {
        title: title.to_string(),
        content: "This content is long enough to publish.".to_string(),
        status: Some(status),
        tags: vec![],
    }
}

#[tokio::test]
async fn end_to_end_publish_flow() {
    let h = harness();
    let (author, _, _) = register(&h, "Ada", Role::Author).await;

    // Draft is invisible to anonymous readers.
    let draft = h
        .posts
        .create(&author, post_input("My first post", PostStatus::Draft))
        .await
        .unwrap();
    assert!(matches!(
        h.posts.get(&Actor::Anonymous, draft.id).await,
        Err(DomainError::NotFound(_))
    ));

    // The author still sees it, without a view increment.
    let seen = h.posts.get(&author, draft.id).await.unwrap();
    assert_eq!(seen.views, 0);

    // Publish, then each anonymous read increments views by one.
    h.posts
        .change_status(&author, draft.id, PostStatus::Published)
        .await
        .unwrap();
    let read1 = h.posts.get(&Actor::Anonymous, draft.id).await.unwrap();
    assert_eq!(read1.views, 1);
    let read2 = h.posts.get(&Actor::Anonymous, draft.id).await.unwrap();
    assert_eq!(read2.views, 2);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let h = harness();
    register(&h, "Ada", Role::Author).await;

    let result = h
        .auth
        .register(RegisterInput {
            name: "Ada Again".into(),
            email: "ADA@example.com".into(),
            password: "Secret1pass".into(),
            role: None,
        })
        .await;
    assert!(matches!(result, Err(DomainError::Conflict(_))));
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_email_alike() {
    let h = harness();
    register(&h, "Ada", Role::Author).await;

    let wrong = h
        .auth
        .login(LoginInput {
            email: "ada@example.com".into(),
            password: "WrongPass1".into(),
        })
        .await;
    assert!(matches!(wrong, Err(DomainError::Unauthenticated)));

    let unknown = h
        .auth
        .login(LoginInput {
            email: "nobody@example.com".into(),
            password: "Secret1pass".into(),
        })
        .await;
    assert!(matches!(unknown, Err(DomainError::Unauthenticated)));
}

#[tokio::test]
async fn refresh_rotation_is_single_use() {
    let h = harness();
    let (_, _, refresh) = register(&h, "Ada", Role::Author).await;

    let pair = h.auth.refresh(&refresh).await.unwrap();
    assert_ne!(pair.refresh_token, refresh);

    // The consumed token is dead even though it has not expired.
    assert!(matches!(
        h.auth.refresh(&refresh).await,
        Err(DomainError::Token(AuthError::Invalid(_)))
    ));

    // The replacement still works.
    h.auth.refresh(&pair.refresh_token).await.unwrap();
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let h = harness();
    let (actor, _, refresh) = register(&h, "Ada", Role::Author).await;

    h.auth.logout(&actor).await.unwrap();
    assert!(matches!(
        h.auth.refresh(&refresh).await,
        Err(DomainError::Token(AuthError::Invalid(_)))
    ));
}

#[tokio::test]
async fn login_replaces_the_previous_session() {
    let h = harness();
    let (_, _, first_refresh) = register(&h, "Ada", Role::Author).await;

    h.auth
        .login(LoginInput {
            email: "ada@example.com".into(),
            password: "Secret1pass".into(),
        })
        .await
        .unwrap();

    // Single active session per user: the earlier token is invalid.
    assert!(matches!(
        h.auth.refresh(&first_refresh).await,
        Err(DomainError::Token(AuthError::Invalid(_)))
    ));
}

#[tokio::test]
async fn strangers_cannot_update_others_posts() {
    let h = harness();
    let (author, _, _) = register(&h, "Ada", Role::Author).await;
    let (stranger, _, _) = register(&h, "Bob", Role::Author).await;
    let (admin, _, _) = register(&h, "Root", Role::Admin).await;

    let post = h
        .posts
        .create(&author, post_input("A published post", PostStatus::Published))
        .await
        .unwrap();

    let denied = h
        .posts
        .change_status(&stranger, post.id, PostStatus::Draft)
        .await;
    assert!(matches!(denied, Err(DomainError::Forbidden)));

    // Admin may transition anyone's post.
    h.posts
        .change_status(&admin, post.id, PostStatus::Draft)
        .await
        .unwrap();
}

#[tokio::test]
async fn deleting_a_post_cascades_to_its_comments() {
    let h = harness();
    let (author, _, _) = register(&h, "Ada", Role::Author).await;
    let (reader, _, _) = register(&h, "Bob", Role::Author).await;

    let post = h
        .posts
        .create(&author, post_input("A commented post", PostStatus::Published))
        .await
        .unwrap();
    let c1 = h
        .comments
        .create(&reader, post.id, "first comment".into())
        .await
        .unwrap();
    let c2 = h
        .comments
        .create(&author, post.id, "reply from the author".into())
        .await
        .unwrap();

    h.posts.delete(&author, post.id).await.unwrap();

    assert!(h.post_repo.find_by_id(post.id).await.unwrap().is_none());
    assert!(h.comment_repo.find_by_id(c1.id).await.unwrap().is_none());
    assert!(h.comment_repo.find_by_id(c2.id).await.unwrap().is_none());
}

#[tokio::test]
async fn nobody_comments_on_a_draft() {
    let h = harness();
    let (author, _, _) = register(&h, "Ada", Role::Author).await;
    let (other, _, _) = register(&h, "Bob", Role::Author).await;

    let draft = h
        .posts
        .create(&author, post_input("A quiet draft", PostStatus::Draft))
        .await
        .unwrap();

    // Publication is the gate: even the author is refused.
    assert!(matches!(
        h.comments.create(&author, draft.id, "self comment".into()).await,
        Err(DomainError::NotFound(_))
    ));
    assert!(matches!(
        h.comments.create(&other, draft.id, "hello".into()).await,
        Err(DomainError::NotFound(_))
    ));
    assert!(matches!(
        h.comments.create(&Actor::Anonymous, draft.id, "hi".into()).await,
        Err(DomainError::Unauthenticated)
    ));
}

#[tokio::test]
async fn comment_edit_rules() {
    let h = harness();
    let (author, _, _) = register(&h, "Ada", Role::Author).await;
    let (commenter, _, _) = register(&h, "Bob", Role::Author).await;
    let (admin, _, _) = register(&h, "Root", Role::Admin).await;

    let post = h
        .posts
        .create(&author, post_input("A commented post", PostStatus::Published))
        .await
        .unwrap();
    let comment = h
        .comments
        .create(&commenter, post.id, "original".into())
        .await
        .unwrap();
    assert!(!comment.is_edited);

    // Only the comment author may edit; not even an admin.
    assert!(matches!(
        h.comments.update(&admin, comment.id, "hijack".into()).await,
        Err(DomainError::Forbidden)
    ));

    let edited = h
        .comments
        .update(&commenter, comment.id, "revised".into())
        .await
        .unwrap();
    assert!(edited.is_edited);
    assert!(edited.edited_at.is_some());

    // Admin may delete, and deletion works on drafts too.
    h.posts
        .change_status(&author, post.id, PostStatus::Draft)
        .await
        .unwrap();
    h.comments.delete(&admin, comment.id).await.unwrap();
}

#[tokio::test]
async fn comment_listing_follows_post_visibility() {
    let h = harness();
    let (author, _, _) = register(&h, "Ada", Role::Author).await;
    let (other, _, _) = register(&h, "Bob", Role::Author).await;

    let post = h
        .posts
        .create(&author, post_input("Visible then hidden", PostStatus::Published))
        .await
        .unwrap();
    h.comments
        .create(&other, post.id, "a comment".into())
        .await
        .unwrap();

    let page = h
        .comments
        .list(&Actor::Anonymous, post.id, CommentListQuery::default())
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 1);

    // Unpublishing hides the thread from outsiders but not its author.
    h.posts
        .change_status(&author, post.id, PostStatus::Draft)
        .await
        .unwrap();
    assert!(matches!(
        h.comments
            .list(&Actor::Anonymous, post.id, CommentListQuery::default())
            .await,
        Err(DomainError::NotFound(_))
    ));
    assert!(
        h.comments
            .list(&author, post.id, CommentListQuery::default())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn published_listing_paginates_with_a_separate_count() {
    let h = harness();
    let (author, _, _) = register(&h, "Ada", Role::Author).await;

    for i in 0..25 {
        h.posts
            .create(&author, post_input(&format!("Post number {i}"), PostStatus::Published))
            .await
            .unwrap();
    }
    // Drafts stay out of the public listing.
    h.posts
        .create(&author, post_input("A hidden draft", PostStatus::Draft))
        .await
        .unwrap();

    let page = h
        .posts
        .list_published(PostListQuery {
            page: Some(3),
            limit: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.pagination.total_items, 25);
    assert_eq!(page.pagination.total_pages, 3);
    assert!(!page.pagination.has_next);
    assert!(page.pagination.has_prev);

    let empty = h
        .posts
        .list_published(PostListQuery {
            search: Some("no such phrase anywhere".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(empty.pagination.total_pages, 0);
    assert!(!empty.pagination.has_next);
    assert!(!empty.pagination.has_prev);
}

#[tokio::test]
async fn owner_listing_honors_the_status_filter() {
    let h = harness();
    let (author, _, _) = register(&h, "Ada", Role::Author).await;
    let (other, _, _) = register(&h, "Bob", Role::Author).await;

    h.posts
        .create(&author, post_input("Ada draft post", PostStatus::Draft))
        .await
        .unwrap();
    h.posts
        .create(&author, post_input("Ada published post", PostStatus::Published))
        .await
        .unwrap();
    h.posts
        .create(&other, post_input("Bob published post", PostStatus::Published))
        .await
        .unwrap();

    let drafts = h
        .posts
        .list_own(
            &author,
            PostListQuery {
                status: Some(PostStatus::Draft),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(drafts.pagination.total_items, 1);
    assert_eq!(drafts.items[0].title, "Ada draft post");

    let all_own = h.posts.list_own(&author, PostListQuery::default()).await.unwrap();
    assert_eq!(all_own.pagination.total_items, 2);
}

#[tokio::test]
async fn listing_sorts_by_title_ascending() {
    let h = harness();
    let (author, _, _) = register(&h, "Ada", Role::Author).await;

    for title in ["Charlie post", "Alpha post", "Bravo post"] {
        h.posts
            .create(&author, post_input(title, PostStatus::Published))
            .await
            .unwrap();
    }

    let page = h
        .posts
        .list_published(PostListQuery {
            sort_by: SortBy::Title,
            sort_order: SortOrder::Asc,
            ..Default::default()
        })
        .await
        .unwrap();
    let titles: Vec<&str> = page.items.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Alpha post", "Bravo post", "Charlie post"]);
}

#[tokio::test]
async fn stats_are_admin_only_and_aggregate() {
    let h = harness();
    let (author, author_id, _) = register(&h, "Ada", Role::Author).await;
    let (admin, _, _) = register(&h, "Root", Role::Admin).await;

    let p = h
        .posts
        .create(&author, post_input("A viewed post", PostStatus::Published))
        .await
        .unwrap();
    h.posts.get(&Actor::Anonymous, p.id).await.unwrap();
    h.posts.get(&Actor::Anonymous, p.id).await.unwrap();
    h.posts
        .create(&author, post_input("A resting draft", PostStatus::Draft))
        .await
        .unwrap();

    assert!(matches!(
        h.posts.stats(&author).await,
        Err(DomainError::Forbidden)
    ));
    assert!(matches!(
        h.posts.stats(&Actor::Anonymous).await,
        Err(DomainError::Unauthenticated)
    ));

    let report = h.posts.stats(&admin).await.unwrap();
    assert_eq!(report.stats.total_posts, 2);
    assert_eq!(report.stats.published_posts, 1);
    assert_eq!(report.stats.draft_posts, 1);
    assert_eq!(report.stats.total_views, 2);
    assert_eq!(report.top_authors.len(), 1);
    assert_eq!(report.top_authors[0].id, author_id);
    assert_eq!(report.top_authors[0].post_count, 1);
    assert_eq!(report.top_authors[0].total_views, 2);
}

#[tokio::test]
async fn profile_returns_the_stored_user() {
    let h = harness();
    let (actor, id, _) = register(&h, "Ada", Role::Author).await;

    let user = h.auth.profile(&actor).await.unwrap();
    assert_eq!(user.id, id);
    assert_eq!(user.email, "ada@example.com");
    assert!(h.users.find_by_id(id).await.unwrap().is_some());
}

#[tokio::test]
async fn read_payloads_resolve_author_and_comment_count() {
    let h = harness();
    let (author, author_id, _) = register(&h, "Ada", Role::Author).await;
    let (commenter, commenter_id, _) = register(&h, "Bob", Role::Author).await;

    let post = h
        .posts
        .create(&author, post_input("A discussed post", PostStatus::Published))
        .await
        .unwrap();
    h.comments
        .create(&commenter, post.id, "first".into())
        .await
        .unwrap();
    let second = h
        .comments
        .create(&commenter, post.id, "second".into())
        .await
        .unwrap();

    let details = h.posts.with_details(post).await.unwrap();
    let resolved = details.author.unwrap();
    assert_eq!(resolved.id, author_id);
    assert_eq!(resolved.name, "Ada");
    assert_eq!(resolved.email, "ada@example.com");
    assert_eq!(details.comments_count, 2);

    let comment_details = h.comments.with_author(second).await.unwrap();
    let resolved = comment_details.author.unwrap();
    assert_eq!(resolved.id, commenter_id);
    assert_eq!(resolved.name, "Bob");

    // The page path resolves the same details per item.
    let page = h
        .posts
        .list_published(PostListQuery::default())
        .await
        .unwrap();
    let page = h.posts.page_with_details(page).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].comments_count, 2);
}

#[cfg(feature = "postgres")]
mod postgres_mock {
    use std::collections::BTreeMap;

    use quill_core::domain::Post;
    use quill_core::ports::PostRepository;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    use crate::database::entity::post;
    use crate::database::postgres::PostgresPostRepository;

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::from(n))])
    }

    #[tokio::test]
    async fn find_post_by_id_maps_the_row() {
        let post_id = uuid::Uuid::new_v4();
        let author = uuid::Uuid::new_v4();
        let now = chrono::Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![post::Model {
                id: post_id,
                title: "Test Post".to_owned(),
                content: "Content long enough".to_owned(),
                author,
                status: "published".to_owned(),
                tags: vec!["rust".to_owned()],
                slug: "test-post-0".to_owned(),
                read_time: 1,
                views: 3,
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);

        let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();
        let post = result.unwrap();
        assert_eq!(post.id, post_id);
        assert_eq!(post.views, 3);
        assert_eq!(post.tags, vec!["rust".to_string()]);
    }

    // Drafts get their own status predicate; the count is never derived
    // by subtracting published from total.
    #[tokio::test]
    async fn stats_counts_drafts_independently() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![
                vec![count_row(5)],
                vec![count_row(3)],
                vec![count_row(1)],
                vec![BTreeMap::from([("total_views", Value::from(40i64))])],
            ])
            .into_connection();

        let repo = PostgresPostRepository::new(db);

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total_posts, 5);
        assert_eq!(stats.published_posts, 3);
        assert_eq!(stats.draft_posts, 1);
        assert_eq!(stats.total_views, 40);
    }
}
