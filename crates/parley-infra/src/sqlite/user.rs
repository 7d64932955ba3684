//! SQLite user repository, including the refresh-token blacklist.

use chrono::{DateTime, Utc};
use parley_core::repository::user::UserRepository;
use parley_types::error::RepositoryError;
use parley_types::user::User;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, is_unique_violation, parse_datetime, parse_uuid, query_error};

/// SQLite-backed implementation of `UserRepository`.
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, sql: &str, value: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(sql)
            .bind(value)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Ok(Some(UserRow::from_row(&row).map_err(query_error)?.into_user()?)),
            None => Ok(None),
        }
    }
}

struct UserRow {
    id: String,
    email: String,
    username: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    avatar: Option<String>,
    is_verified: bool,
    is_active: bool,
    is_staff: bool,
    password_hash: String,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            username: row.try_get("username")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            phone: row.try_get("phone")?,
            avatar: row.try_get("avatar")?,
            is_verified: row.try_get("is_verified")?,
            is_active: row.try_get("is_active")?,
            is_staff: row.try_get("is_staff")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_user(self) -> Result<User, RepositoryError> {
        Ok(User {
            id: parse_uuid(&self.id)?,
            email: self.email,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            avatar: self.avatar,
            is_verified: self.is_verified,
            is_active: self.is_active,
            is_staff: self.is_staff,
            password_hash: self.password_hash,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

/// Map a UNIQUE violation to `Conflict` carrying the offending column
/// (`email` or `username`), as named in SQLite's "UNIQUE constraint
/// failed: users.<column>" message.
fn unique_conflict(e: sqlx::Error) -> RepositoryError {
    if !is_unique_violation(&e) {
        return query_error(e);
    }
    let column = match &e {
        sqlx::Error::Database(db_err) if db_err.message().contains("users.username") => "username",
        _ => "email",
    };
    RepositoryError::Conflict(column.to_string())
}

impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        sqlx::query(
            "INSERT INTO users (id, email, username, first_name, last_name, phone, avatar, is_verified, is_active, is_staff, password_hash, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.avatar)
        .bind(user.is_verified)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(&user.password_hash)
        .bind(format_datetime(&user.created_at))
        .bind(format_datetime(&user.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(unique_conflict)?;

        Ok(user.clone())
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by("SELECT * FROM users WHERE id = ?", &id.to_string())
            .await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by("SELECT * FROM users WHERE email = ?", &email.to_lowercase())
            .await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by("SELECT * FROM users WHERE username = ?", username)
            .await
    }

    async fn update(&self, user: &User) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET email = ?, username = ?, first_name = ?, last_name = ?, phone = ?, avatar = ?, is_verified = ?, is_active = ?, is_staff = ?, password_hash = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.avatar)
        .bind(user.is_verified)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(&user.password_hash)
        .bind(format_datetime(&user.updated_at))
        .bind(user.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(unique_conflict)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(user.clone())
    }

    async fn blacklist_token(
        &self,
        jti: &str,
        user_id: &Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        // Revoking twice is not an error.
        sqlx::query(
            "INSERT OR IGNORE INTO token_blacklist (jti, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(jti)
        .bind(user_id.to_string())
        .bind(format_datetime(&expires_at))
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;
        Ok(())
    }

    async fn is_token_blacklisted(&self, jti: &str) -> Result<bool, RepositoryError> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM token_blacklist WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_support::{make_user, test_pool};

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let user = make_user("lan");
        repo.create(&user).await.unwrap();

        let by_id = repo.get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "lan");
        assert!(by_id.is_active);
        assert!(!by_id.is_staff);

        let by_email = repo.get_by_email("LAN@parley.test").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert!(repo.get_by_username("lan").await.unwrap().is_some());
        assert!(repo.get_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_or_username_conflicts() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let user = make_user("lan");
        repo.create(&user).await.unwrap();

        let mut other = make_user("lan2");
        other.email = user.email.clone();
        let err = repo.create(&other).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref column) if column == "email"));

        let mut other = make_user("lan");
        other.email = "khac@parley.test".to_string();
        let err = repo.create(&other).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref column) if column == "username"));
    }

    #[tokio::test]
    async fn test_update_and_missing_user() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let mut user = make_user("lan");
        repo.create(&user).await.unwrap();

        user.first_name = "Lan".to_string();
        user.is_staff = true;
        repo.update(&user).await.unwrap();
        let found = repo.get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(found.first_name, "Lan");
        assert!(found.is_staff);

        let ghost = make_user("ghost");
        assert!(matches!(
            repo.update(&ghost).await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_token_blacklist() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let user = make_user("lan");
        repo.create(&user).await.unwrap();

        assert!(!repo.is_token_blacklisted("jti-1").await.unwrap());
        let expires = Utc::now() + chrono::Duration::days(7);
        repo.blacklist_token("jti-1", &user.id, expires).await.unwrap();
        repo.blacklist_token("jti-1", &user.id, expires).await.unwrap();
        assert!(repo.is_token_blacklisted("jti-1").await.unwrap());
    }
}
