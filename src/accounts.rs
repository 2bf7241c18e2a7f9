//! Users and communities. Both are keyed externally by the identity
//! provider's account id and internally by a generated row id.

use rusqlite::{params, ErrorCode, OptionalExtension};
use serde::Deserialize;

use crate::db::models::{Community, User};
use crate::db::RepositoryError;
use crate::state::DbPool;

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub account_id: String,
    pub username: String,
    pub name: String,
    pub image: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCommunity {
    pub account_id: String,
    pub username: String,
    pub name: String,
    pub image: Option<String>,
    pub bio: Option<String>,
    /// Account id of the creating user
    pub created_by: Option<String>,
}

/// Create or update a user from onboarding and mark them onboarded.
pub fn upsert_user(pool: &DbPool, profile: &UserProfile) -> Result<User, RepositoryError> {
    let conn = pool.get()?;
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO users (id, account_id, username, name, image, bio, onboarded)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
         ON CONFLICT(account_id) DO UPDATE SET
           username = excluded.username,
           name = excluded.name,
           image = excluded.image,
           bio = excluded.bio,
           onboarded = 1",
        params![
            id,
            profile.account_id,
            profile.username.to_lowercase(),
            profile.name,
            profile.image,
            profile.bio
        ],
    )
    .map_err(|e| conflict_or(e, "username already taken"))?;

    tracing::info!(account_id = %profile.account_id, "User onboarded");

    conn.query_row(
        &format!("SELECT {} FROM users WHERE account_id = ?1", User::COLUMNS),
        params![profile.account_id],
        User::from_row,
    )
    .map_err(Into::into)
}

pub fn fetch_user(pool: &DbPool, account_id: &str) -> Result<Option<User>, RepositoryError> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE account_id = ?1", User::COLUMNS),
            params![account_id],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn create_community(
    pool: &DbPool,
    input: &NewCommunity,
) -> Result<Community, RepositoryError> {
    let conn = pool.get()?;

    let created_by: Option<String> = match input.created_by {
        Some(ref account_id) => Some(
            conn.query_row(
                "SELECT id FROM users WHERE account_id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound(format!("User {}", account_id)))?,
        ),
        None => None,
    };

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO communities (id, account_id, username, name, image, bio, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            input.account_id,
            input.username.to_lowercase(),
            input.name,
            input.image,
            input.bio,
            created_by
        ],
    )
    .map_err(|e| conflict_or(e, "community already exists"))?;

    tracing::info!(account_id = %input.account_id, "Community created");

    conn.query_row(
        &format!("SELECT {} FROM communities WHERE id = ?1", Community::COLUMNS),
        params![id],
        Community::from_row,
    )
    .map_err(Into::into)
}

fn conflict_or(err: rusqlite::Error, message: &str) -> RepositoryError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => RepositoryError::Conflict(message.to_string()),
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::TempDir;

    fn test_pool() -> (DbPool, TempDir) {
        let tmp = TempDir::new().unwrap();
        let pool = db::create_pool(&tmp.path().join("test.db")).unwrap();
        db::run_migrations(&pool).unwrap();
        (pool, tmp)
    }

    fn profile(account_id: &str, username: &str) -> UserProfile {
        UserProfile {
            account_id: account_id.to_string(),
            username: username.to_string(),
            name: "Alice".to_string(),
            image: None,
            bio: None,
        }
    }

    #[test]
    fn upsert_creates_then_updates() {
        let (pool, _tmp) = test_pool();

        let created = upsert_user(&pool, &profile("acct_1", "Alice")).unwrap();
        assert_eq!(created.username, "alice");
        assert!(created.onboarded);

        let updated = upsert_user(
            &pool,
            &UserProfile {
                bio: Some("hi".to_string()),
                ..profile("acct_1", "alice2")
            },
        )
        .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.bio.as_deref(), Some("hi"));
    }

    #[test]
    fn duplicate_username_is_a_conflict() {
        let (pool, _tmp) = test_pool();
        upsert_user(&pool, &profile("acct_1", "alice")).unwrap();

        let err = upsert_user(&pool, &profile("acct_2", "alice")).unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[test]
    fn fetch_user_returns_none_for_unknown_account() {
        let (pool, _tmp) = test_pool();
        assert!(fetch_user(&pool, "nobody").unwrap().is_none());
    }

    #[test]
    fn create_community_resolves_creator() {
        let (pool, _tmp) = test_pool();
        let user = upsert_user(&pool, &profile("acct_1", "alice")).unwrap();

        let community = create_community(
            &pool,
            &NewCommunity {
                account_id: "org_1".to_string(),
                username: "Rustaceans".to_string(),
                name: "Rustaceans".to_string(),
                image: None,
                bio: None,
                created_by: Some("acct_1".to_string()),
            },
        )
        .unwrap();
        assert_eq!(community.username, "rustaceans");
        assert_eq!(community.created_by, Some(user.id));
    }

    #[test]
    fn create_community_with_unknown_creator_fails() {
        let (pool, _tmp) = test_pool();
        let err = create_community(
            &pool,
            &NewCommunity {
                account_id: "org_1".to_string(),
                username: "rust".to_string(),
                name: "Rust".to_string(),
                image: None,
                bio: None,
                created_by: Some("ghost".to_string()),
            },
        )
        .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
