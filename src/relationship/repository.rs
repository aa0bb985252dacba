//! Handle database requests for friendship edges.

use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};

use crate::error::{Result, ServerError};
use crate::relationship::Edge;
use crate::user::Profile;

/// A recommendation candidate with its mutual-friend count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recommendation {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub profile_pic: Option<String>,
    pub mutual_count: i64,
}

#[derive(Clone)]
pub struct FriendshipRepository {
    pool: Pool<Postgres>,
}

impl FriendshipRepository {
    /// Create a new [`FriendshipRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Find the edge between two users, whichever side initiated it.
    pub async fn find_edge(&self, a: i64, b: i64) -> Result<Option<Edge>> {
        let edge = sqlx::query_as::<_, Edge>(
            r#"SELECT source_id, target_id, status, created_at
                FROM friendships
                WHERE (source_id = $1 AND target_id = $2)
                   OR (source_id = $2 AND target_id = $1)"#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(edge)
    }

    /// Insert a pending edge.
    ///
    /// The unique index on the unordered pair turns a racing duplicate into
    /// a `Conflict`.
    pub async fn insert_pending(&self, source: i64, target: i64) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO friendships (source_id, target_id, status)
                VALUES ($1, $2, 0)"#,
        )
        .bind(source)
        .bind(target)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Flip the pending edge `source -> target` to accepted.
    pub async fn accept(&self, source: i64, target: i64) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE friendships SET status = 1
                WHERE source_id = $1 AND target_id = $2 AND status = 0"#,
        )
        .bind(source)
        .bind(target)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound { entity: "request" });
        }

        Ok(())
    }

    /// Delete the edge between two users, any direction, any status.
    pub async fn delete(&self, a: i64, b: i64) -> Result<()> {
        let result = sqlx::query(
            r#"DELETE FROM friendships
                WHERE (source_id = $1 AND target_id = $2)
                   OR (source_id = $2 AND target_id = $1)"#,
        )
        .bind(a)
        .bind(b)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound { entity: "request" });
        }

        Ok(())
    }

    /// Accepted friends of a user, whichever side initiated the edge.
    pub async fn friends(&self, user_id: i64) -> Result<Vec<Profile>> {
        let friends = sqlx::query_as::<_, Profile>(
            r#"SELECT u.id, u.username, u.full_name, u.profile_pic
                FROM friendships f
                JOIN users u
                  ON u.id = CASE WHEN f.source_id = $1 THEN f.target_id
                                 ELSE f.source_id END
                WHERE (f.source_id = $1 OR f.target_id = $1) AND f.status = 1
                ORDER BY u.username"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(friends)
    }

    /// Senders of pending requests targeting a user.
    pub async fn incoming(&self, user_id: i64) -> Result<Vec<Profile>> {
        let senders = sqlx::query_as::<_, Profile>(
            r#"SELECT u.id, u.username, u.full_name, u.profile_pic
                FROM friendships f
                JOIN users u ON u.id = f.source_id
                WHERE f.target_id = $1 AND f.status = 0
                ORDER BY f.created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(senders)
    }

    /// Rank non-connected users by count of mutual accepted friends.
    ///
    /// Users with any edge to the viewer (pending included) are excluded.
    /// Ties break on ascending user id so the order is stable.
    pub async fn recommend(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<Recommendation>> {
        let candidates = sqlx::query_as::<_, Recommendation>(
            r#"WITH mine AS (
                    SELECT CASE WHEN source_id = $1 THEN target_id
                                ELSE source_id END AS other_id,
                           status
                    FROM friendships
                    WHERE source_id = $1 OR target_id = $1
                )
                SELECT u.id, u.username, u.full_name, u.profile_pic,
                       COUNT(*) AS mutual_count
                FROM mine m
                JOIN friendships e
                  ON m.status = 1
                 AND e.status = 1
                 AND (e.source_id = m.other_id OR e.target_id = m.other_id)
                JOIN users u
                  ON u.id = CASE WHEN e.source_id = m.other_id THEN e.target_id
                                 ELSE e.source_id END
                WHERE u.id <> $1
                  AND u.id NOT IN (SELECT other_id FROM mine)
                GROUP BY u.id, u.username, u.full_name, u.profile_pic
                ORDER BY mutual_count DESC, u.id
                LIMIT $2"#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(candidates)
    }
}
