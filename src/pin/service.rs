use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::error::{Result, ServerError};
use crate::pin::{Pin, PinRepository, Visibility};
use crate::push::PushGateway;
use crate::storage::ObjectStorage;
use crate::user::{Profile, UserRepository};

/// Mutable attributes of a pin, as submitted by its owner.
#[derive(Clone, Debug, Default)]
pub struct PinAttrs {
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
    pub caption: Option<String>,
    pub visibility: Visibility,
    pub location_tags: Vec<String>,
    pub user_tags: Vec<i64>,
}

/// Pin manager: CRUD, photo handling, likes.
#[derive(Clone)]
pub struct PinService {
    pub repo: PinRepository,
    users: UserRepository,
    storage: Arc<dyn ObjectStorage>,
    push: Arc<dyn PushGateway>,
}

impl PinService {
    /// Create a new [`PinService`].
    pub fn new(
        pool: Pool<Postgres>,
        storage: Arc<dyn ObjectStorage>,
        push: Arc<dyn PushGateway>,
    ) -> Self {
        Self {
            repo: PinRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            storage,
            push,
        }
    }

    /// Create a pin for `owner`.
    ///
    /// A photo is uploaded first and only its reference stored; the key is
    /// namespaced by owner and creation instant so it never collides.
    /// Tagged users are notified best-effort after the row exists.
    pub async fn create_pin(
        &self,
        owner: i64,
        attrs: PinAttrs,
        photo: Option<Vec<u8>>,
    ) -> Result<Pin> {
        let author = self.users.find_by_id(owner).await?;

        if self
            .repo
            .exists_at(owner, attrs.latitude, attrs.longitude)
            .await?
        {
            return Err(ServerError::Conflict(
                "pin at this location already exists".into(),
            ));
        }

        let reference = match photo {
            Some(bytes) => {
                let key = format!(
                    "pins/{owner}/{}",
                    chrono::Utc::now().timestamp_millis()
                );
                Some(self.storage.put(&key, bytes).await?)
            },
            None => None,
        };

        let pin = Pin {
            user_id: owner,
            latitude: attrs.latitude,
            longitude: attrs.longitude,
            title: attrs.title,
            caption: attrs.caption,
            photo: reference,
            visibility: attrs.visibility,
            location_tags: attrs.location_tags,
            user_tags: attrs.user_tags,
            ..Default::default()
        };
        let id = self.repo.insert(&pin).await?;
        let pin = self.repo.find(owner, id).await?;

        for tagged in &pin.user_tags {
            let Ok(user) = self.users.find_by_id(*tagged).await else {
                continue;
            };
            if let Some(token) = &user.device_token {
                self.push
                    .notify_best_effort(
                        token,
                        "Tagged in a pin",
                        &format!("{} tagged you in \"{}\"", author.username, pin.title),
                    )
                    .await;
            }
        }

        Ok(pin)
    }

    /// Update a pin's attributes, optionally replacing its photo.
    ///
    /// The old photo is deleted before the new upload; a failure between
    /// the two is surfaced so the caller knows the reference may be stale.
    pub async fn update_pin(
        &self,
        owner: i64,
        pin_id: i64,
        attrs: PinAttrs,
        photo: Option<Vec<u8>>,
    ) -> Result<Pin> {
        let mut pin = self.repo.find(owner, pin_id).await?;

        if let Some(bytes) = photo {
            if let Some(old) = &pin.photo {
                self.storage.delete(old).await?;
            }
            let key = format!(
                "pins/{owner}/{}",
                chrono::Utc::now().timestamp_millis()
            );
            pin.photo = Some(self.storage.put(&key, bytes).await?);
        }

        pin.latitude = attrs.latitude;
        pin.longitude = attrs.longitude;
        pin.title = attrs.title;
        pin.caption = attrs.caption;
        pin.visibility = attrs.visibility;
        pin.location_tags = attrs.location_tags;
        pin.user_tags = attrs.user_tags;

        self.repo.update(&pin).await?;
        self.repo.find(owner, pin_id).await
    }

    /// Delete a pin and release its stored photo.
    pub async fn delete_pin(&self, owner: i64, pin_id: i64) -> Result<()> {
        let pin = self.repo.find(owner, pin_id).await?;

        if let Some(reference) = &pin.photo {
            self.storage.delete(reference).await?;
        }

        self.repo.delete(owner, pin_id).await
    }

    /// Narrow update of coordinates only.
    pub async fn update_location(
        &self,
        owner: i64,
        pin_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<()> {
        self.repo
            .update_location(owner, pin_id, latitude, longitude)
            .await
    }

    /// Read one pin of an owner.
    pub async fn pin(&self, owner: i64, pin_id: i64) -> Result<Pin> {
        self.repo.find(owner, pin_id).await
    }

    /// All pins of an owner, newest first.
    pub async fn pins_by_owner(&self, owner: i64) -> Result<Vec<Pin>> {
        self.repo.by_owner(owner).await
    }

    /// Like a pin; liking twice changes nothing.
    pub async fn like(&self, user_id: i64, pin_id: i64) -> Result<()> {
        self.repo.find_by_id(pin_id).await?;
        self.users.find_by_id(user_id).await?;
        self.repo.like(user_id, pin_id).await
    }

    /// Remove a like; removing an absent like changes nothing.
    pub async fn unlike(&self, user_id: i64, pin_id: i64) -> Result<()> {
        self.repo.find_by_id(pin_id).await?;
        self.repo.unlike(user_id, pin_id).await
    }

    /// Everyone who liked a pin.
    pub async fn likes(&self, pin_id: i64) -> Result<Vec<Profile>> {
        self.repo.find_by_id(pin_id).await?;
        self.repo.likers(pin_id).await
    }
}
