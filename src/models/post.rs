use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostCategory {
    #[default]
    General,
    Anxiety,
    Depression,
    Stress,
    Relationships,
    Academic,
    Loneliness,
    Other,
}

impl PostCategory {
    pub const ALL: [PostCategory; 8] = [
        PostCategory::General,
        PostCategory::Anxiety,
        PostCategory::Depression,
        PostCategory::Stress,
        PostCategory::Relationships,
        PostCategory::Academic,
        PostCategory::Loneliness,
        PostCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostCategory::General => "general",
            PostCategory::Anxiety => "anxiety",
            PostCategory::Depression => "depression",
            PostCategory::Stress => "stress",
            PostCategory::Relationships => "relationships",
            PostCategory::Academic => "academic",
            PostCategory::Loneliness => "loneliness",
            PostCategory::Other => "other",
        }
    }
}

impl fmt::Display for PostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        PostCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("Unknown category '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub content: String,
    pub anonymous_id: String,
    pub is_volunteer: bool,
    pub timestamp: DateTime<Utc>,
}

/// A peer-support post as the handlers see it. `id` is the hex form of the
/// MongoDB ObjectId.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub content: String,
    pub category: PostCategory,
    pub likes: i64,
    pub replies: Vec<Reply>,
    pub anonymous_id: String,
    pub ip_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public shape of a post; the ip hash and the active flag stay server-side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub content: String,
    pub category: PostCategory,
    pub likes: i64,
    pub replies: Vec<Reply>,
    pub reply_count: usize,
    pub anonymous_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Post> for PostView {
    fn from(p: &Post) -> Self {
        Self {
            id: p.id.clone(),
            content: p.content.clone(),
            category: p.category,
            likes: p.likes,
            replies: p.replies.clone(),
            reply_count: p.replies.len(),
            anonymous_id: p.anonymous_id.clone(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/* Client payloads                                                            */

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 2000, message = "Content must be between 1 and 2000 characters"))]
    pub content: String,
    #[serde(default)]
    pub category: PostCategory,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReplyRequest {
    #[validate(length(min = 1, max = 1000, message = "Reply must be between 1 and 1000 characters"))]
    pub content: String,
    #[serde(default)]
    pub is_volunteer: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category: Option<String>,
    pub search: Option<String>,
}

/* Listing                                                                    */

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category: Option<PostCategory>,
    /// Literal text, matched case-insensitively anywhere in the content.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based
    pub number: u64,
    pub size: u64,
}

impl Page {
    /// Out-of-range values are clamped rather than rejected.
    pub fn new(number: Option<u64>, size: Option<u64>) -> Self {
        Self {
            number: number.unwrap_or(1).max(1),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Saturates instead of overflowing and stays within the `i64` range
    /// the database driver accepts; a page past the end is simply empty.
    pub fn offset(&self) -> u64 {
        self.number
            .saturating_sub(1)
            .saturating_mul(self.size)
            .min(i64::MAX as u64)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(page: Page, total: u64) -> Self {
        let total_pages = total.div_ceil(page.size);
        Self {
            page: page.number,
            limit: page.size,
            total,
            total_pages,
            has_more: page.number < total_pages,
        }
    }
}
