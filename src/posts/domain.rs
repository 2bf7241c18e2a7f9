// Domain types - pure, no database access
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::config::FeedConfig;
use crate::db::models::Post;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Internal post identifier (UUID v7, so ids sort by creation time)
    PostId
);
string_id!(
    /// Internal user row id. Not the identity provider's account id.
    UserId
);
string_id!(
    /// Internal community row id
    CommunityId
);

impl PostId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }
}

/// Author fields attached to a populated post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: UserId,
    pub account_id: String,
    pub username: String,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub id: CommunityId,
    pub account_id: String,
    pub username: String,
    pub name: String,
    pub image: Option<String>,
}

/// A post with its author and community joined in.
///
/// `child_ids` is always the stored, ordered child list. `children` holds the
/// populated child posts only down to the depth the query asked for, and
/// skips child references whose post no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: PostId,
    pub text: String,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: AuthorSummary,
    pub community: Option<CommunitySummary>,
    pub child_ids: Vec<PostId>,
    pub children: Vec<PostView>,
}

impl PostView {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub is_next: bool,
}

/// Posts listed on a user's or community's profile, in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePosts<Owner> {
    pub owner: Owner,
    pub posts: Vec<PostView>,
}

/// A normalized feed page request. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(number: Option<u32>, size: Option<u32>, limits: &FeedConfig) -> Self {
        let number = number.unwrap_or(1).max(1);
        let size = match size.unwrap_or(0) {
            0 => limits.page_size,
            n => n,
        }
        .min(limits.max_page_size)
        .max(1);

        Self { number, size }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }
}

/// More pages exist when the total exceeds what this page and all previous
/// pages covered.
pub fn has_next_page(total: u64, skip: u64, returned: usize) -> bool {
    total > skip + returned as u64
}

/// A post about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub text: String,
    pub author_id: UserId,
    pub community_id: Option<CommunityId>,
    pub parent_id: Option<PostId>,
}

/// Everything a cascade deletion touches: the root post first, then its
/// descendants in depth-first order, plus the distinct owners whose post
/// lists must be cleaned up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionPlan {
    pub post_ids: Vec<PostId>,
    pub author_ids: BTreeSet<UserId>,
    pub community_ids: BTreeSet<CommunityId>,
}

impl DeletionPlan {
    pub fn new(root: &Post, descendants: &[Post]) -> Self {
        let affected = || std::iter::once(root).chain(descendants.iter());

        Self {
            post_ids: affected().map(|p| PostId::new(p.id.clone())).collect(),
            author_ids: affected().map(|p| UserId::new(p.author_id.clone())).collect(),
            community_ids: affected()
                .filter_map(|p| p.community_id.clone())
                .map(CommunityId::new)
                .collect(),
        }
    }

    pub fn descendant_count(&self) -> usize {
        self.post_ids.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    #[error("Text cannot be empty")]
    Empty,

    #[error("Minimum {0} characters.")]
    TooShort(usize),
}

/// Trim and validate post or comment text.
pub fn validate_text(raw: &str, min_len: usize) -> Result<String, TextError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(TextError::Empty);
    }
    if text.chars().count() < min_len {
        return Err(TextError::TooShort(min_len));
    }
    Ok(text.to_string())
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically in time order.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
