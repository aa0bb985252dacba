//! Handle database requests for pins and like memberships.

use sqlx::{Pool, Postgres};

use crate::error::{Result, ServerError};
use crate::pin::{FeedPin, Pin};
use crate::user::Profile;

const PIN_COLUMNS: &str = "id, user_id, latitude, longitude, title, caption, \
     photo, visibility, location_tags, user_tags, created_at, edited_at";

#[derive(Clone)]
pub struct PinRepository {
    pool: Pool<Postgres>,
}

impl PinRepository {
    /// Create a new [`PinRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a new pin, returning its identifier.
    pub async fn insert(&self, pin: &Pin) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO pins (user_id, latitude, longitude, title, caption,
                    photo, visibility, location_tags, user_tags)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING id"#,
        )
        .bind(pin.user_id)
        .bind(pin.latitude)
        .bind(pin.longitude)
        .bind(&pin.title)
        .bind(&pin.caption)
        .bind(&pin.photo)
        .bind(pin.visibility)
        .bind(&pin.location_tags)
        .bind(&pin.user_tags)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Find a pin owned by `owner`.
    pub async fn find(&self, owner: i64, pin_id: i64) -> Result<Pin> {
        let query = format!(
            "SELECT {PIN_COLUMNS} FROM pins WHERE user_id = $1 AND id = $2"
        );

        sqlx::query_as::<_, Pin>(&query)
            .bind(owner)
            .bind(pin_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServerError::NotFound { entity: "pin" })
    }

    /// Find a pin regardless of owner.
    pub async fn find_by_id(&self, pin_id: i64) -> Result<Pin> {
        let query = format!("SELECT {PIN_COLUMNS} FROM pins WHERE id = $1");

        sqlx::query_as::<_, Pin>(&query)
            .bind(pin_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServerError::NotFound { entity: "pin" })
    }

    /// Whether `owner` already has a pin at these exact coordinates.
    pub async fn exists_at(
        &self,
        owner: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (
                    SELECT 1 FROM pins
                    WHERE user_id = $1 AND latitude = $2 AND longitude = $3
                )"#,
        )
        .bind(owner)
        .bind(latitude)
        .bind(longitude)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Update a pin's attributes and photo reference.
    pub async fn update(&self, pin: &Pin) -> Result<()> {
        sqlx::query(
            r#"UPDATE pins
                SET latitude = $1, longitude = $2, title = $3, caption = $4,
                    photo = $5, visibility = $6, location_tags = $7,
                    user_tags = $8, edited_at = NOW()
                WHERE user_id = $9 AND id = $10"#,
        )
        .bind(pin.latitude)
        .bind(pin.longitude)
        .bind(&pin.title)
        .bind(&pin.caption)
        .bind(&pin.photo)
        .bind(pin.visibility)
        .bind(&pin.location_tags)
        .bind(&pin.user_tags)
        .bind(pin.user_id)
        .bind(pin.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Narrow update of coordinates only.
    pub async fn update_location(
        &self,
        owner: i64,
        pin_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE pins
                SET latitude = $1, longitude = $2, edited_at = NOW()
                WHERE user_id = $3 AND id = $4"#,
        )
        .bind(latitude)
        .bind(longitude)
        .bind(owner)
        .bind(pin_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound { entity: "pin" });
        }

        Ok(())
    }

    /// Delete a pin owned by `owner`.
    pub async fn delete(&self, owner: i64, pin_id: i64) -> Result<()> {
        let result =
            sqlx::query(r#"DELETE FROM pins WHERE user_id = $1 AND id = $2"#)
                .bind(owner)
                .bind(pin_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound { entity: "pin" });
        }

        Ok(())
    }

    /// All pins of an owner, newest first.
    pub async fn by_owner(&self, owner: i64) -> Result<Vec<Pin>> {
        let query = format!(
            "SELECT {PIN_COLUMNS} FROM pins WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );

        let pins = sqlx::query_as::<_, Pin>(&query)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        Ok(pins)
    }

    /// Record a like; liking twice is a no-op.
    pub async fn like(&self, user_id: i64, pin_id: i64) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO pin_likes (pin_id, user_id) VALUES ($1, $2)
                ON CONFLICT DO NOTHING"#,
        )
        .bind(pin_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a like; removing an absent like is a no-op.
    pub async fn unlike(&self, user_id: i64, pin_id: i64) -> Result<()> {
        sqlx::query(
            r#"DELETE FROM pin_likes WHERE pin_id = $1 AND user_id = $2"#,
        )
        .bind(pin_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Public profiles of every user who liked a pin.
    pub async fn likers(&self, pin_id: i64) -> Result<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(
            r#"SELECT u.id, u.username, u.full_name, u.profile_pic
                FROM pin_likes l
                JOIN users u ON u.id = l.user_id
                WHERE l.pin_id = $1
                ORDER BY l.created_at DESC"#,
        )
        .bind(pin_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    /// Pins authored by accepted friends of `viewer`, paired with their
    /// author, newest first. Private pins stay private.
    pub async fn friend_pins(&self, viewer: i64) -> Result<Vec<FeedPin>> {
        let pins = sqlx::query_as::<_, FeedPin>(
            r#"SELECT p.id, p.user_id, p.latitude, p.longitude, p.title,
                      p.caption, p.photo, p.visibility, p.location_tags,
                      p.user_tags, p.created_at, p.edited_at,
                      u.username, u.full_name, u.profile_pic
                FROM pins p
                JOIN users u ON u.id = p.user_id
                WHERE p.visibility >= 1
                  AND p.user_id IN (
                      SELECT CASE WHEN source_id = $1 THEN target_id
                                  ELSE source_id END
                      FROM friendships
                      WHERE (source_id = $1 OR target_id = $1) AND status = 1
                  )
                ORDER BY p.created_at DESC, p.id DESC"#,
        )
        .bind(viewer)
        .fetch_all(&self.pool)
        .await?;

        Ok(pins)
    }

    /// Public pins discoverable by `viewer`: not their own, not authored by
    /// an accepted friend. Pending edges do not exclude.
    pub async fn public_pins(&self, viewer: i64) -> Result<Vec<FeedPin>> {
        let pins = sqlx::query_as::<_, FeedPin>(
            r#"SELECT p.id, p.user_id, p.latitude, p.longitude, p.title,
                      p.caption, p.photo, p.visibility, p.location_tags,
                      p.user_tags, p.created_at, p.edited_at,
                      u.username, u.full_name, u.profile_pic
                FROM pins p
                JOIN users u ON u.id = p.user_id
                WHERE p.visibility = 2
                  AND p.user_id <> $1
                  AND p.user_id NOT IN (
                      SELECT CASE WHEN source_id = $1 THEN target_id
                                  ELSE source_id END
                      FROM friendships
                      WHERE (source_id = $1 OR target_id = $1) AND status = 1
                  )
                ORDER BY p.created_at DESC, p.id DESC"#,
        )
        .bind(viewer)
        .fetch_all(&self.pool)
        .await?;

        Ok(pins)
    }

    /// Pins whose user-tag set contains `user_id`, newest first.
    pub async fn tagged_pins(&self, user_id: i64) -> Result<Vec<FeedPin>> {
        let pins = sqlx::query_as::<_, FeedPin>(
            r#"SELECT p.id, p.user_id, p.latitude, p.longitude, p.title,
                      p.caption, p.photo, p.visibility, p.location_tags,
                      p.user_tags, p.created_at, p.edited_at,
                      u.username, u.full_name, u.profile_pic
                FROM pins p
                JOIN users u ON u.id = p.user_id
                WHERE $1 = ANY(p.user_tags)
                ORDER BY p.created_at DESC, p.id DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(pins)
    }
}
