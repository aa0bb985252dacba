//! Aggregation queries over friends' and public pins.

use rand::Rng;
use rand::seq::IteratorRandom;
use sqlx::{Pool, Postgres};

use crate::config::Feed as FeedConfig;
use crate::error::Result;
use crate::pin::{FeedPin, PinRepository};

/// Sample `min(k, len)` distinct items uniformly without replacement.
///
/// Replaces the loop-bounded resampling of earlier revisions, which was
/// biased and could return fewer items than available.
pub fn sample_without_replacement<T>(
    items: Vec<T>,
    k: usize,
    rng: &mut impl Rng,
) -> Vec<T> {
    items.into_iter().choose_multiple(rng, k)
}

/// Read-only feed aggregation.
#[derive(Clone)]
pub struct FeedService {
    pins: PinRepository,
    sample_size: usize,
}

impl FeedService {
    /// Create a new [`FeedService`].
    pub fn new(pool: Pool<Postgres>, config: &FeedConfig) -> Self {
        Self {
            pins: PinRepository::new(pool),
            sample_size: config.public_sample_size,
        }
    }

    /// Pins authored by accepted friends of `viewer`, newest first.
    pub async fn friend_pins(&self, viewer: i64) -> Result<Vec<FeedPin>> {
        self.pins.friend_pins(viewer).await
    }

    /// Discoverable public pins: everything public except the viewer's own
    /// and their accepted friends' pins, uniformly subsampled.
    ///
    /// The returned sample is presented newest first.
    pub async fn public_pins(
        &self,
        viewer: i64,
        rng: &mut impl Rng,
    ) -> Result<Vec<FeedPin>> {
        let pins = self.pins.public_pins(viewer).await?;

        let mut sample = sample_without_replacement(pins, self.sample_size, rng);
        sample.sort_by(|a, b| b.pin.created_at.cmp(&a.pin.created_at));

        Ok(sample)
    }

    /// Pins the user is tagged in, newest first.
    pub async fn tagged_pins(&self, user_id: i64) -> Result<Vec<FeedPin>> {
        self.pins.tagged_pins(user_id).await
    }
}
