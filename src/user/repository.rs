//! Handle database requests for users.

use sqlx::{Pool, Postgres};

use crate::error::{Result, ServerError};
use crate::user::{Profile, User};

const USER_COLUMNS: &str = "id, username, full_name, password, birthday, \
     phone_no, profile_pic, device_token, created_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a new user, returning its identifier.
    pub async fn insert(&self, user: &User) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO users (username, full_name, password, birthday, phone_no)
                VALUES ($1, $2, $3, $4, $5) RETURNING id"#,
        )
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.password)
        .bind(user.birthday)
        .bind(&user.phone_no)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Find current user using `id` field.
    pub async fn find_by_id(&self, user_id: i64) -> Result<User> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServerError::NotFound { entity: "user" })
    }

    /// Find current user using `username` field.
    pub async fn find_by_username(&self, username: &str) -> Result<User> {
        let query =
            format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServerError::NotFound { entity: "user" })
    }

    /// Whether a username is already registered.
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)"#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Whether a phone number is already registered.
    pub async fn phone_exists(&self, phone_no: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE phone_no = $1)"#,
        )
        .bind(phone_no)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Update mutable profile fields of current user.
    pub async fn update(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"UPDATE users
                SET username = $1, full_name = $2, password = $3,
                    birthday = $4, phone_no = $5
                WHERE id = $6"#,
        )
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.password)
        .bind(user.birthday)
        .bind(&user.phone_no)
        .bind(user.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist (or clear) the profile picture reference.
    pub async fn set_profile_pic(
        &self,
        user_id: i64,
        reference: Option<&str>,
    ) -> Result<()> {
        sqlx::query(r#"UPDATE users SET profile_pic = $1 WHERE id = $2"#)
            .bind(reference)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Persist the push device token.
    pub async fn set_device_token(
        &self,
        user_id: i64,
        token: &str,
    ) -> Result<()> {
        let result =
            sqlx::query(r#"UPDATE users SET device_token = $1 WHERE id = $2"#)
                .bind(token)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound { entity: "user" });
        }

        Ok(())
    }

    /// Case-insensitive substring search over username and full name.
    pub async fn search(&self, query: &str) -> Result<Vec<Profile>> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));

        let profiles = sqlx::query_as::<_, Profile>(
            r#"SELECT id, username, full_name, profile_pic
                FROM users
                WHERE username ILIKE $1 OR full_name ILIKE $1
                ORDER BY username
                LIMIT 20"#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }
}
