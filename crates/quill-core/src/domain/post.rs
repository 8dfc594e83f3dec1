use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post publication status. Transitions are explicit status writes by an
/// authorized actor; there are no automatic transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// Post entity. Slug and read time are derived fields: the slug is
/// regenerated whenever the title changes, the read time whenever the
/// content changes. The author is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: Uuid,
    pub status: PostStatus,
    pub tags: Vec<String>,
    pub slug: String,
    /// Estimated reading time in minutes (200 words per minute, min 1).
    pub read_time: u32,
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for a post; only present fields are applied.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<PostStatus>,
    pub tags: Option<Vec<String>>,
}

impl Post {
    /// Create a new post, deriving slug and read time.
    pub fn new(
        author: Uuid,
        title: String,
        content: String,
        status: PostStatus,
        tags: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        let mut post = Self {
            id: Uuid::new_v4(),
            title,
            content,
            author,
            status,
            tags: normalize_tags(tags),
            slug: String::new(),
            read_time: 1,
            views: 0,
            created_at: now,
            updated_at: now,
        };
        post.regenerate_slug();
        post.recompute_read_time();
        post
    }

    /// Apply a partial update field by field. Title changes regenerate the
    /// slug; content changes recompute the read time.
    pub fn apply(&mut self, patch: PostPatch) {
        if let Some(title) = patch.title {
            let changed = title != self.title;
            self.title = title;
            if changed {
                self.regenerate_slug();
            }
        }
        if let Some(content) = patch.content {
            let changed = content != self.content;
            self.content = content;
            if changed {
                self.recompute_read_time();
            }
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        self.updated_at = Utc::now();
    }

    /// Slug = slugified title plus a creation-time millisecond suffix.
    /// The suffix keeps same-title posts apart; residual collisions are
    /// caught by the unique index and surfaced as a conflict.
    pub fn regenerate_slug(&mut self) {
        self.slug = format!(
            "{}-{}",
            slugify(&self.title),
            self.created_at.timestamp_millis()
        );
    }

    pub fn recompute_read_time(&mut self) {
        let words = self.content.split_whitespace().count();
        self.read_time = (words as u32).div_ceil(200).max(1);
    }
}

/// Lowercase the title and collapse every run of non-alphanumeric
/// characters into a single separator, stripping it at the edges.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_sep = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    slug
}

/// Trim, lowercase, and dedupe tags, preserving first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, content: &str) -> Post {
        Post::new(
            Uuid::new_v4(),
            title.to_string(),
            content.to_string(),
            PostStatus::Draft,
            vec![],
        )
    }

    #[test]
    fn slugify_collapses_and_trims_separators() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  --Rust & Tokio--  "), "rust-tokio");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn slug_keeps_creation_suffix_across_title_edits() {
        let mut post = draft("First title", "some content here for a post");
        let suffix = post.created_at.timestamp_millis().to_string();
        assert!(post.slug.ends_with(&suffix));

        post.apply(PostPatch {
            title: Some("Second title".into()),
            ..Default::default()
        });
        assert!(post.slug.starts_with("second-title-"));
        assert!(post.slug.ends_with(&suffix));
    }

    #[test]
    fn unchanged_title_keeps_slug() {
        let mut post = draft("Stable", "some content here for a post");
        let slug = post.slug.clone();
        post.apply(PostPatch {
            title: Some("Stable".into()),
            content: Some("fresh content for the same post".into()),
            ..Default::default()
        });
        assert_eq!(post.slug, slug);
    }

    #[test]
    fn read_time_rounds_up_at_two_hundred_words() {
        let mut post = draft("Words", &"a ".repeat(199));
        assert_eq!(post.read_time, 1);

        post.apply(PostPatch {
            content: Some("a ".repeat(200)),
            ..Default::default()
        });
        assert_eq!(post.read_time, 1);

        post.apply(PostPatch {
            content: Some("a ".repeat(201)),
            ..Default::default()
        });
        assert_eq!(post.read_time, 2);
    }

    #[test]
    fn read_time_has_a_floor_of_one() {
        let post = draft("Empty", "");
        assert_eq!(post.read_time, 1);
    }

    #[test]
    fn tags_are_normalized_and_deduped() {
        let tags = normalize_tags(vec![
            " Rust ".into(),
            "rust".into(),
            "Async".into(),
            "".into(),
        ]);
        assert_eq!(tags, vec!["rust".to_string(), "async".to_string()]);
    }
}
