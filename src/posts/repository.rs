// Repository pattern - isolates all database side effects
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::db::models::{Community, Post, User};
use crate::db::{json_array, RepositoryError};
use crate::posts::domain::*;
use crate::state::DbPool;

/// Repository trait - every database call the post actions make.
///
/// Each method is a single round-trip (or one statement per list) and none
/// of them share a transaction.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_user_by_account(&self, account_id: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_community_by_account(
        &self,
        account_id: &str,
    ) -> Result<Option<Community>, RepositoryError>;

    /// Insert a post, assigning its id and creation time
    async fn insert_post(&self, post: &NewPost) -> Result<Post, RepositoryError>;

    async fn find_post(&self, id: &PostId) -> Result<Option<Post>, RepositoryError>;

    /// Posts whose `parent_id` equals `id`, oldest first
    async fn find_replies(&self, id: &PostId) -> Result<Vec<Post>, RepositoryError>;

    async fn append_user_post(&self, user: &UserId, post: &PostId) -> Result<(), RepositoryError>;

    async fn append_community_post(
        &self,
        community: &CommunityId,
        post: &PostId,
    ) -> Result<(), RepositoryError>;

    async fn append_child(&self, parent: &PostId, child: &PostId) -> Result<(), RepositoryError>;

    /// Bulk delete, returns the number of posts removed
    async fn delete_posts(&self, ids: &[PostId]) -> Result<u64, RepositoryError>;

    async fn pull_user_posts(
        &self,
        users: &BTreeSet<UserId>,
        ids: &[PostId],
    ) -> Result<u64, RepositoryError>;

    async fn pull_community_posts(
        &self,
        communities: &BTreeSet<CommunityId>,
        ids: &[PostId],
    ) -> Result<u64, RepositoryError>;

    /// Remove `ids` from every child list that references them
    async fn pull_children(&self, ids: &[PostId]) -> Result<u64, RepositoryError>;

    async fn count_top_level(&self) -> Result<u64, RepositoryError>;

    /// Top-level post ids, newest first
    async fn list_top_level(&self, skip: u64, limit: u32) -> Result<Vec<PostId>, RepositoryError>;

    async fn user_post_ids(&self, user: &UserId) -> Result<Vec<PostId>, RepositoryError>;

    async fn community_post_ids(
        &self,
        community: &CommunityId,
    ) -> Result<Vec<PostId>, RepositoryError>;

    /// Load posts with author and community joined, keeping the order of
    /// `ids` and dropping ids with no post. Children are populated `depth`
    /// levels deep.
    async fn populate(&self, ids: &[PostId], depth: usize) -> Result<Vec<PostView>, RepositoryError>;
}

/// SQLite implementation
pub struct SqlitePostRepository {
    pool: DbPool,
}

impl SqlitePostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn find_user_by_account(&self, account_id: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE account_id = ?1", User::COLUMNS),
                params![account_id],
                User::from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn find_community_by_account(
        &self,
        account_id: &str,
    ) -> Result<Option<Community>, RepositoryError> {
        let conn = self.pool.get()?;
        let community = conn
            .query_row(
                &format!(
                    "SELECT {} FROM communities WHERE account_id = ?1",
                    Community::COLUMNS
                ),
                params![account_id],
                Community::from_row,
            )
            .optional()?;
        Ok(community)
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post, RepositoryError> {
        let conn = self.pool.get()?;

        let row = Post {
            id: PostId::generate().0,
            text: post.text.clone(),
            author_id: post.author_id.0.clone(),
            community_id: post.community_id.as_ref().map(|c| c.0.clone()),
            parent_id: post.parent_id.as_ref().map(|p| p.0.clone()),
            created_at: format_timestamp(&Utc::now()),
        };

        conn.execute(
            "INSERT INTO posts (id, text, author_id, community_id, parent_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.text,
                row.author_id,
                row.community_id,
                row.parent_id,
                row.created_at
            ],
        )?;

        Ok(row)
    }

    async fn find_post(&self, id: &PostId) -> Result<Option<Post>, RepositoryError> {
        let conn = self.pool.get()?;
        let post = conn
            .query_row(
                &format!("SELECT {} FROM posts WHERE id = ?1", Post::COLUMNS),
                params![id.as_str()],
                Post::from_row,
            )
            .optional()?;
        Ok(post)
    }

    async fn find_replies(&self, id: &PostId) -> Result<Vec<Post>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts WHERE parent_id = ?1 ORDER BY created_at ASC, id ASC",
            Post::COLUMNS
        ))?;
        let replies = stmt
            .query_map(params![id.as_str()], Post::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(replies)
    }

    async fn append_user_post(&self, user: &UserId, post: &PostId) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        append_to_list(&conn, "user_posts", "user_id", "post_id", user.as_str(), post.as_str())
    }

    async fn append_community_post(
        &self,
        community: &CommunityId,
        post: &PostId,
    ) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        append_to_list(
            &conn,
            "community_posts",
            "community_id",
            "post_id",
            community.as_str(),
            post.as_str(),
        )
    }

    async fn append_child(&self, parent: &PostId, child: &PostId) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        append_to_list(
            &conn,
            "post_children",
            "parent_id",
            "child_id",
            parent.as_str(),
            child.as_str(),
        )
    }

    async fn delete_posts(&self, ids: &[PostId]) -> Result<u64, RepositoryError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM posts WHERE id IN (SELECT value FROM json_each(?1))",
            params![json_array(ids.iter().map(PostId::as_str))],
        )?;
        Ok(deleted as u64)
    }

    async fn pull_user_posts(
        &self,
        users: &BTreeSet<UserId>,
        ids: &[PostId],
    ) -> Result<u64, RepositoryError> {
        let conn = self.pool.get()?;
        let owners: Vec<&str> = users.iter().map(UserId::as_str).collect();
        pull_from_list(&conn, "user_posts", "user_id", "post_id", &owners, ids)
    }

    async fn pull_community_posts(
        &self,
        communities: &BTreeSet<CommunityId>,
        ids: &[PostId],
    ) -> Result<u64, RepositoryError> {
        let conn = self.pool.get()?;
        let owners: Vec<&str> = communities.iter().map(CommunityId::as_str).collect();
        pull_from_list(
            &conn,
            "community_posts",
            "community_id",
            "post_id",
            &owners,
            ids,
        )
    }

    async fn pull_children(&self, ids: &[PostId]) -> Result<u64, RepositoryError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let conn = self.pool.get()?;
        // Drops both the lists owned by deleted posts and references to them
        let removed = conn.execute(
            "DELETE FROM post_children
             WHERE child_id IN (SELECT value FROM json_each(?1))
                OR parent_id IN (SELECT value FROM json_each(?1))",
            params![json_array(ids.iter().map(PostId::as_str))],
        )?;
        Ok(removed as u64)
    }

    async fn count_top_level(&self) -> Result<u64, RepositoryError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE parent_id IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    async fn list_top_level(&self, skip: u64, limit: u32) -> Result<Vec<PostId>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id FROM posts
             WHERE parent_id IS NULL
             ORDER BY created_at DESC, id DESC
             LIMIT ?1 OFFSET ?2",
        )?;
        let ids = stmt
            .query_map(params![i64::from(limit), skip as i64], |row| {
                row.get::<_, String>(0).map(PostId)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    async fn user_post_ids(&self, user: &UserId) -> Result<Vec<PostId>, RepositoryError> {
        let conn = self.pool.get()?;
        list_ids(&conn, "user_posts", "user_id", "post_id", user.as_str())
    }

    async fn community_post_ids(
        &self,
        community: &CommunityId,
    ) -> Result<Vec<PostId>, RepositoryError> {
        let conn = self.pool.get()?;
        list_ids(
            &conn,
            "community_posts",
            "community_id",
            "post_id",
            community.as_str(),
        )
    }

    async fn populate(&self, ids: &[PostId], depth: usize) -> Result<Vec<PostView>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(load_views(&conn, ids, depth)?)
    }
}

// --- Ordered reference lists ---

fn append_to_list(
    conn: &Connection,
    table: &str,
    owner_col: &str,
    item_col: &str,
    owner: &str,
    item: &str,
) -> Result<(), RepositoryError> {
    conn.execute(
        &format!(
            "INSERT INTO {table} ({owner_col}, {item_col}, position)
             VALUES (?1, ?2, COALESCE((SELECT MAX(position) + 1 FROM {table} WHERE {owner_col} = ?1), 0))"
        ),
        params![owner, item],
    )?;
    Ok(())
}

fn pull_from_list(
    conn: &Connection,
    table: &str,
    owner_col: &str,
    item_col: &str,
    owners: &[&str],
    items: &[PostId],
) -> Result<u64, RepositoryError> {
    if owners.is_empty() || items.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "DELETE FROM {table}
         WHERE {owner_col} IN (SELECT value FROM json_each(?1))
           AND {item_col} IN (SELECT value FROM json_each(?2))"
    );
    let removed = conn.execute(
        &sql,
        params![
            json_array(owners.iter().copied()),
            json_array(items.iter().map(PostId::as_str))
        ],
    )?;
    Ok(removed as u64)
}

fn list_ids(
    conn: &Connection,
    table: &str,
    owner_col: &str,
    item_col: &str,
    owner: &str,
) -> Result<Vec<PostId>, RepositoryError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {item_col} FROM {table} WHERE {owner_col} = ?1 ORDER BY position ASC"
    ))?;
    let ids = stmt
        .query_map(params![owner], |row| row.get::<_, String>(0).map(PostId))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

// --- Population ---

const VIEW_SELECT: &str = "SELECT p.id, p.text, p.parent_id, p.created_at,
        u.id, u.account_id, u.username, u.name, u.image,
        c.id, c.account_id, c.username, c.name, c.image
     FROM posts p
     JOIN users u ON u.id = p.author_id
     LEFT JOIN communities c ON c.id = p.community_id";

fn load_views(conn: &Connection, ids: &[PostId], depth: usize) -> rusqlite::Result<Vec<PostView>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(&format!(
        "{VIEW_SELECT} WHERE p.id IN (SELECT value FROM json_each(?1))"
    ))?;
    let mut loaded: HashMap<PostId, PostView> = stmt
        .query_map(params![json_array(ids.iter().map(PostId::as_str))], view_from_row)?
        .map(|r| r.map(|view| (view.id.clone(), view)))
        .collect::<rusqlite::Result<_>>()?;

    let found: Vec<PostId> = loaded.keys().cloned().collect();
    let mut child_lists = load_child_lists(conn, &found)?;

    let mut children_by_id: HashMap<PostId, PostView> = if depth > 0 {
        let all_children: Vec<PostId> = child_lists.values().flatten().cloned().collect();
        load_views(conn, &all_children, depth - 1)?
            .into_iter()
            .map(|child| (child.id.clone(), child))
            .collect()
    } else {
        HashMap::new()
    };

    let mut views = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(mut view) = loaded.remove(id) else {
            continue;
        };
        view.child_ids = child_lists.remove(id).unwrap_or_default();
        if depth > 0 {
            view.children = view
                .child_ids
                .iter()
                .filter_map(|child| children_by_id.remove(child))
                .collect();
        }
        views.push(view);
    }
    Ok(views)
}

fn load_child_lists(
    conn: &Connection,
    parents: &[PostId],
) -> rusqlite::Result<HashMap<PostId, Vec<PostId>>> {
    let mut lists: HashMap<PostId, Vec<PostId>> = HashMap::new();
    if parents.is_empty() {
        return Ok(lists);
    }

    let mut stmt = conn.prepare(
        "SELECT parent_id, child_id FROM post_children
         WHERE parent_id IN (SELECT value FROM json_each(?1))
         ORDER BY parent_id, position ASC",
    )?;
    let rows = stmt.query_map(params![json_array(parents.iter().map(PostId::as_str))], |row| {
        Ok((PostId(row.get(0)?), PostId(row.get(1)?)))
    })?;
    for row in rows {
        let (parent, child) = row?;
        lists.entry(parent).or_default().push(child);
    }
    Ok(lists)
}

fn view_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostView> {
    let created_at: String = row.get(3)?;
    let created_at = parse_timestamp(&created_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let community = match row.get::<_, Option<String>>(9)? {
        Some(id) => Some(CommunitySummary {
            id: CommunityId(id),
            account_id: row.get(10)?,
            username: row.get(11)?,
            name: row.get(12)?,
            image: row.get(13)?,
        }),
        None => None,
    };

    Ok(PostView {
        id: PostId(row.get(0)?),
        text: row.get(1)?,
        parent_id: row.get(2)?,
        created_at,
        author: AuthorSummary {
            id: UserId(row.get(4)?),
            account_id: row.get(5)?,
            username: row.get(6)?,
            name: row.get(7)?,
            image: row.get(8)?,
        },
        community,
        child_ids: Vec::new(),
        children: Vec::new(),
    })
}

/// Type alias for Arc-wrapped repository (for AppState)
pub type DynPostRepository = Arc<dyn PostRepository>;
