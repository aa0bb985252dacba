use std::sync::Arc;

use sqlx::{Pool, Postgres};
use validator::{ValidationError, ValidationErrors};

use crate::error::{Result, ServerError};
use crate::push::PushGateway;
use crate::relationship::{
    FriendshipRepository, Recommendation, RelationshipStatus, classify,
};
use crate::user::{Profile, UserRepository};

/// Friendship lifecycle manager.
#[derive(Clone)]
pub struct RelationshipService {
    pub repo: FriendshipRepository,
    users: UserRepository,
    push: Arc<dyn PushGateway>,
}

impl RelationshipService {
    /// Create a new [`RelationshipService`].
    pub fn new(pool: Pool<Postgres>, push: Arc<dyn PushGateway>) -> Self {
        Self {
            repo: FriendshipRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            push,
        }
    }

    fn self_pair_error() -> ServerError {
        let mut errors = ValidationErrors::new();
        errors.add(
            "target_id",
            ValidationError::new("self")
                .with_message("Cannot send a request to yourself.".into()),
        );
        ServerError::Validation(errors)
    }

    /// Send a friend request from `viewer` to `other`.
    ///
    /// Any existing edge between the pair, whichever side initiated it,
    /// makes this a conflict.
    pub async fn send_request(&self, viewer: i64, other: i64) -> Result<()> {
        if viewer == other {
            return Err(Self::self_pair_error());
        }

        let sender = self.users.find_by_id(viewer).await?;
        let recipient = self.users.find_by_id(other).await?;

        if self.repo.find_edge(viewer, other).await?.is_some() {
            return Err(ServerError::Conflict(
                "request or friendship already exists".into(),
            ));
        }

        self.repo.insert_pending(viewer, other).await?;

        if let Some(token) = &recipient.device_token {
            self.push
                .notify_best_effort(
                    token,
                    "New friend request",
                    &format!("{} sent you a friend request", sender.username),
                )
                .await;
        }

        Ok(())
    }

    /// Accept the pending request `other` sent to `viewer`.
    ///
    /// Only the recipient side reaches this: the edge must run
    /// `other -> viewer` and still be pending.
    pub async fn accept_request(&self, viewer: i64, other: i64) -> Result<()> {
        self.repo.accept(other, viewer).await?;

        let accepter = self.users.find_by_id(viewer).await?;
        let sender = self.users.find_by_id(other).await?;
        if let Some(token) = &sender.device_token {
            self.push
                .notify_best_effort(
                    token,
                    "Friend request accepted",
                    &format!("{} accepted your friend request", accepter.username),
                )
                .await;
        }

        Ok(())
    }

    /// Delete the edge between two users, serving as decline, cancel and
    /// unfriend at once.
    pub async fn remove(&self, viewer: i64, other: i64) -> Result<()> {
        self.repo.delete(viewer, other).await
    }

    /// Relationship between `viewer` and `other`, as the viewer sees it.
    pub async fn status(
        &self,
        viewer: i64,
        other: i64,
    ) -> Result<RelationshipStatus> {
        if viewer == other {
            return Ok(RelationshipStatus::None);
        }

        let edge = self.repo.find_edge(viewer, other).await?;
        Ok(classify(viewer, edge.as_ref()))
    }

    /// Accepted friends of a user.
    pub async fn friends(&self, user_id: i64) -> Result<Vec<Profile>> {
        self.repo.friends(user_id).await
    }

    /// Pending requests targeting a user.
    pub async fn incoming_requests(&self, user_id: i64) -> Result<Vec<Profile>> {
        self.repo.incoming(user_id).await
    }

    /// Friend recommendations ranked by mutual accepted friends.
    pub async fn recommend(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<Recommendation>> {
        self.repo.recommend(user_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::RecordingPush;

    fn service(pool: Pool<Postgres>) -> (RelationshipService, Arc<RecordingPush>) {
        let push = Arc::new(RecordingPush::default());
        (RelationshipService::new(pool, push.clone()), push)
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_request_lifecycle(pool: Pool<Postgres>) {
        let (relations, _) = service(pool);

        // No edge yet.
        assert_eq!(
            relations.status(1, 2).await.unwrap(),
            RelationshipStatus::None
        );

        relations.send_request(1, 2).await.unwrap();
        assert_eq!(
            relations.status(1, 2).await.unwrap(),
            RelationshipStatus::PendingOutgoing
        );
        assert_eq!(
            relations.status(2, 1).await.unwrap(),
            RelationshipStatus::PendingIncoming
        );

        // Recipient accepts; both sides become friends.
        relations.accept_request(2, 1).await.unwrap();
        assert_eq!(
            relations.status(1, 2).await.unwrap(),
            RelationshipStatus::Friends
        );
        assert_eq!(
            relations.status(2, 1).await.unwrap(),
            RelationshipStatus::Friends
        );

        // Unfriend; back to no edge.
        relations.remove(1, 2).await.unwrap();
        assert_eq!(
            relations.status(1, 2).await.unwrap(),
            RelationshipStatus::None
        );
        assert_eq!(
            relations.status(2, 1).await.unwrap(),
            RelationshipStatus::None
        );
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_duplicate_request_conflicts(pool: Pool<Postgres>) {
        let (relations, _) = service(pool);

        relations.send_request(1, 2).await.unwrap();

        // Same direction.
        let err = relations.send_request(1, 2).await.unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));

        // Opposite direction: the pair already has an edge.
        let err = relations.send_request(2, 1).await.unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_only_recipient_accepts(pool: Pool<Postgres>) {
        let (relations, _) = service(pool);

        relations.send_request(1, 2).await.unwrap();

        // The sender cannot accept its own request.
        let err = relations.accept_request(1, 2).await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound { .. }));

        relations.accept_request(2, 1).await.unwrap();
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_self_request_rejected(pool: Pool<Postgres>) {
        let (relations, _) = service(pool);

        let err = relations.send_request(1, 1).await.unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
        assert_eq!(
            relations.status(1, 1).await.unwrap(),
            RelationshipStatus::None
        );
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_remove_without_edge_is_not_found(pool: Pool<Postgres>) {
        let (relations, _) = service(pool);

        let err = relations.remove(1, 2).await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound { .. }));
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_friends_and_incoming_lists(pool: Pool<Postgres>) {
        let (relations, _) = service(pool);

        relations.send_request(1, 2).await.unwrap();
        relations.accept_request(2, 1).await.unwrap();
        relations.send_request(3, 1).await.unwrap();

        let friends: Vec<i64> =
            relations.friends(1).await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(friends, vec![2]);

        let incoming: Vec<i64> = relations
            .incoming_requests(1)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(incoming, vec![3]);

        // Pending requests are not friendships.
        assert!(relations.friends(3).await.unwrap().is_empty());
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_mutual_friend_recommendation(pool: Pool<Postgres>) {
        let (relations, _) = service(pool);

        // 1-2 and 2-3 accepted, no edge between 1 and 3.
        relations.send_request(1, 2).await.unwrap();
        relations.accept_request(2, 1).await.unwrap();
        relations.send_request(2, 3).await.unwrap();
        relations.accept_request(3, 2).await.unwrap();

        let recommended = relations.recommend(1, 5).await.unwrap();
        let three = recommended.iter().find(|r| r.id == 3).unwrap();
        assert!(three.mutual_count >= 1);

        // Neither self nor existing friends show up.
        assert!(recommended.iter().all(|r| r.id != 1 && r.id != 2));
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_request_notifies_recipient(pool: Pool<Postgres>) {
        let (relations, push) = service(pool);

        relations.send_request(1, 2).await.unwrap();

        let sent = push.sent.lock().unwrap();
        // User 2's device token from the fixture.
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "device-2");
    }
}
