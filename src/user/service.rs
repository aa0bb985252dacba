use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::crypto::{Crypto, CryptoError};
use crate::error::{Result, ServerError};
use crate::storage::ObjectStorage;
use crate::user::{Profile, User, UserRepository};

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub phone_no: Option<String>,
}

/// Identity manager: registration, credential checks, profile mutation.
#[derive(Clone)]
pub struct IdentityService {
    pub repo: UserRepository,
    crypto: Arc<Crypto>,
    storage: Arc<dyn ObjectStorage>,
}

impl IdentityService {
    /// Create a new [`IdentityService`].
    pub fn new(
        pool: Pool<Postgres>,
        crypto: Arc<Crypto>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            repo: UserRepository::new(pool),
            crypto,
            storage,
        }
    }

    /// Register a new user.
    ///
    /// The password is hashed before it reaches the database.
    pub async fn register(
        &self,
        username: &str,
        full_name: &str,
        password: &str,
        birthday: Option<NaiveDate>,
        phone_no: &str,
    ) -> Result<i64> {
        if self.repo.username_exists(username).await? {
            return Err(ServerError::Conflict(
                "username already taken".into(),
            ));
        }
        if self.repo.phone_exists(phone_no).await? {
            return Err(ServerError::Conflict(
                "phone number already registered".into(),
            ));
        }

        let user = User {
            username: username.to_owned(),
            full_name: full_name.to_owned(),
            password: self.crypto.pwd.hash_password(password)?,
            birthday,
            phone_no: phone_no.to_owned(),
            ..Default::default()
        };

        self.repo.insert(&user).await
    }

    /// Check credentials, returning the user on success.
    ///
    /// The hashed credential never leaves this layer.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<User> {
        let user = self.repo.find_by_username(username).await?;

        match self.crypto.pwd.verify_password(password, &user.password) {
            Ok(()) => Ok(user),
            Err(CryptoError::Mismatch) => Err(ServerError::InvalidCredential),
            Err(err) => Err(err.into()),
        }
    }

    /// Apply a partial profile update.
    ///
    /// A supplied password is re-hashed, never stored as given.
    pub async fn update_profile(
        &self,
        user_id: i64,
        update: ProfileUpdate,
    ) -> Result<()> {
        let mut user = self.repo.find_by_id(user_id).await?;

        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(full_name) = update.full_name {
            user.full_name = full_name;
        }
        if let Some(password) = update.password {
            user.password = self.crypto.pwd.hash_password(password)?;
        }
        if let Some(birthday) = update.birthday {
            user.birthday = Some(birthday);
        }
        if let Some(phone_no) = update.phone_no {
            user.phone_no = phone_no;
        }

        self.repo.update(&user).await
    }

    /// Replace or clear the profile picture.
    ///
    /// Bytes are uploaded under a per-user key and only the reference is
    /// persisted. Storage failures here are surfaced, not swallowed.
    pub async fn update_profile_picture(
        &self,
        user_id: i64,
        photo: Option<Vec<u8>>,
    ) -> Result<Option<String>> {
        let user = self.repo.find_by_id(user_id).await?;

        match photo {
            Some(bytes) => {
                let key = format!("users/{user_id}/profile");
                let reference = self.storage.put(&key, bytes).await?;
                self.repo
                    .set_profile_pic(user_id, Some(&reference))
                    .await?;

                Ok(Some(reference))
            },
            None => {
                if let Some(reference) = &user.profile_pic {
                    self.storage.delete(reference).await?;
                }
                self.repo.set_profile_pic(user_id, None).await?;

                Ok(None)
            },
        }
    }

    /// Whether a username can still be claimed.
    pub async fn username_available(&self, username: &str) -> Result<bool> {
        Ok(!self.repo.username_exists(username).await?)
    }

    /// Whether a phone number can still be claimed.
    pub async fn phone_available(&self, phone_no: &str) -> Result<bool> {
        Ok(!self.repo.phone_exists(phone_no).await?)
    }

    /// Public profile lookup.
    pub async fn profile(&self, user_id: i64) -> Result<User> {
        self.repo.find_by_id(user_id).await
    }

    /// Search users by username or full name.
    pub async fn search(&self, query: &str) -> Result<Vec<Profile>> {
        self.repo.search(query).await
    }

    /// Store the push device token for a user.
    pub async fn register_device_token(
        &self,
        user_id: i64,
        token: &str,
    ) -> Result<()> {
        self.repo.set_device_token(user_id, token).await
    }
}
