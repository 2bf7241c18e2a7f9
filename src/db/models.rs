use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub account_id: String,
    pub username: String,
    pub name: String,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub onboarded: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: String,
    pub account_id: String,
    pub username: String,
    pub name: String,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub created_by: Option<String>,
    pub created_at: String,
}

/// A row of the `posts` table, without any joined data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub community_id: Option<String>,
    pub parent_id: Option<String>,
    pub created_at: String,
}

impl User {
    pub(crate) const COLUMNS: &'static str =
        "id, account_id, username, name, image, bio, onboarded, created_at";

    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            account_id: row.get(1)?,
            username: row.get(2)?,
            name: row.get(3)?,
            image: row.get(4)?,
            bio: row.get(5)?,
            onboarded: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl Community {
    pub(crate) const COLUMNS: &'static str =
        "id, account_id, username, name, image, bio, created_by, created_at";

    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            account_id: row.get(1)?,
            username: row.get(2)?,
            name: row.get(3)?,
            image: row.get(4)?,
            bio: row.get(5)?,
            created_by: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl Post {
    pub(crate) const COLUMNS: &'static str =
        "id, text, author_id, community_id, parent_id, created_at";

    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            text: row.get(1)?,
            author_id: row.get(2)?,
            community_id: row.get(3)?,
            parent_id: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}
