use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Comment on a post. `is_edited` is set the first time the content
/// actually changes after creation and is never reset; `edited_at` is
/// refreshed on every real change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author: Uuid,
    pub post: Uuid,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author: Uuid, post: Uuid, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content: content.trim().to_string(),
            author,
            post,
            is_edited: false,
            edited_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the content, stamping the edit bookkeeping only when the
    /// content actually differs.
    pub fn edit(&mut self, content: String) {
        let content = content.trim().to_string();
        if content == self.content {
            return;
        }
        let now = Utc::now();
        self.content = content;
        self.is_edited = true;
        self.edited_at = Some(now);
        self.updated_at = now;
    }
}
