//! Friendship-related HTTP API.

use axum::extract::{Path, State};
use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;
use crate::relationship::{Recommendation, RelationshipStatus};
use crate::user::Profile;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
    pub status: RelationshipStatus,
}

/// `GET /{user_id}/request/{target_id}/status`
pub async fn status(
    State(state): State<AppState>,
    Path((user_id, target_id)): Path<(i64, i64)>,
) -> Result<Json<StatusResponse>> {
    let status = state.relationships().status(user_id, target_id).await?;

    Ok(Json(StatusResponse {
        message: "Status retrieved successfully".to_owned(),
        status,
    }))
}

/// `POST /{user_id}/request/{target_id}/create`
pub async fn create(
    State(state): State<AppState>,
    Path((user_id, target_id)): Path<(i64, i64)>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    state.relationships().send_request(user_id, target_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Friend request sent successfully".to_owned(),
        }),
    ))
}

/// `PATCH /{user_id}/request/{target_id}/accept`
pub async fn accept(
    State(state): State<AppState>,
    Path((user_id, target_id)): Path<(i64, i64)>,
) -> Result<Json<MessageResponse>> {
    state
        .relationships()
        .accept_request(user_id, target_id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Friend request accepted successfully".to_owned(),
    }))
}

/// `DELETE /{user_id}/request/{target_id}/delete`
pub async fn remove(
    State(state): State<AppState>,
    Path((user_id, target_id)): Path<(i64, i64)>,
) -> Result<Json<MessageResponse>> {
    state.relationships().remove(user_id, target_id).await?;

    Ok(Json(MessageResponse {
        message: "Request or friendship removed successfully".to_owned(),
    }))
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestsResponse {
    pub message: String,
    pub requests: Vec<Profile>,
}

/// `GET /{user_id}/requests`
pub async fn requests(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<RequestsResponse>> {
    let requests = state.relationships().incoming_requests(user_id).await?;

    Ok(Json(RequestsResponse {
        message: "Requests retrieved successfully".to_owned(),
        requests,
    }))
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct FriendsResponse {
    pub message: String,
    pub friends: Vec<Profile>,
}

/// `GET /{user_id}/friends`
pub async fn friends(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<FriendsResponse>> {
    let friends = state.relationships().friends(user_id).await?;

    Ok(Json(FriendsResponse {
        message: "Friends retrieved successfully".to_owned(),
        friends,
    }))
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendedResponse {
    pub message: String,
    pub recommendations: Vec<Recommendation>,
}

/// `GET /{user_id}/friends/recommended`
pub async fn recommended(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<RecommendedResponse>> {
    let limit = state.config.feed.recommendation_limit;
    let recommendations =
        state.relationships().recommend(user_id, limit).await?;

    Ok(Json(RecommendedResponse {
        message: "Recommendations retrieved successfully".to_owned(),
        recommendations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::signup;
    use crate::*;
    use axum::Router;
    use axum::http::Method;
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    async fn signup_user(app: Router, username: &str, phone_no: &str) -> i64 {
        let response = make_request(
            app,
            Method::POST,
            "/signup",
            json!(signup::tests::body(username, phone_no)).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: signup::Response = serde_json::from_slice(&bytes).unwrap();
        parsed.id
    }

    async fn status_of(app: Router, viewer: i64, other: i64) -> RelationshipStatus {
        let response = make_request(
            app,
            Method::GET,
            &format!("/{viewer}/request/{other}/status"),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: StatusResponse = serde_json::from_slice(&bytes).unwrap();
        parsed.status
    }

    #[sqlx::test]
    async fn test_request_lifecycle_over_http(pool: Pool<Postgres>) {
        let app = app(router::state(pool));
        let ada = signup_user(app.clone(), "ada", "+15550000001").await;
        let grace = signup_user(app.clone(), "grace", "+15550000002").await;

        let response = make_request(
            app.clone(),
            Method::POST,
            &format!("/{ada}/request/{grace}/create"),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        assert_eq!(
            status_of(app.clone(), ada, grace).await,
            RelationshipStatus::PendingOutgoing
        );
        assert_eq!(
            status_of(app.clone(), grace, ada).await,
            RelationshipStatus::PendingIncoming
        );

        // A second request, from either side, conflicts.
        let response = make_request(
            app.clone(),
            Method::POST,
            &format!("/{grace}/request/{ada}/create"),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = make_request(
            app.clone(),
            Method::PATCH,
            &format!("/{grace}/request/{ada}/accept"),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(
            status_of(app.clone(), ada, grace).await,
            RelationshipStatus::Friends
        );
        assert_eq!(
            status_of(app.clone(), grace, ada).await,
            RelationshipStatus::Friends
        );

        let response = make_request(
            app.clone(),
            Method::DELETE,
            &format!("/{ada}/request/{grace}/delete"),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(
            status_of(app.clone(), ada, grace).await,
            RelationshipStatus::None
        );
        assert_eq!(
            status_of(app, grace, ada).await,
            RelationshipStatus::None
        );
    }

    #[sqlx::test]
    async fn test_requests_and_friends_lists(pool: Pool<Postgres>) {
        let app = app(router::state(pool));
        let ada = signup_user(app.clone(), "ada", "+15550000001").await;
        let grace = signup_user(app.clone(), "grace", "+15550000002").await;
        let alan = signup_user(app.clone(), "alan", "+15550000003").await;

        // grace -> ada pending; alan -> ada accepted.
        for (from, to) in [(grace, ada), (alan, ada)] {
            let response = make_request(
                app.clone(),
                Method::POST,
                &format!("/{from}/request/{to}/create"),
                String::new(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }
        let response = make_request(
            app.clone(),
            Method::PATCH,
            &format!("/{ada}/request/{alan}/accept"),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = make_request(
            app.clone(),
            Method::GET,
            &format!("/{ada}/requests"),
            String::new(),
        )
        .await;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: RequestsResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.requests.len(), 1);
        assert_eq!(parsed.requests[0].username, "grace");

        let response = make_request(
            app,
            Method::GET,
            &format!("/{ada}/friends"),
            String::new(),
        )
        .await;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: FriendsResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.friends.len(), 1);
        assert_eq!(parsed.friends[0].username, "alan");
    }

    #[sqlx::test]
    async fn test_recommended_over_http(pool: Pool<Postgres>) {
        let app = app(router::state(pool));
        let ada = signup_user(app.clone(), "ada", "+15550000001").await;
        let grace = signup_user(app.clone(), "grace", "+15550000002").await;
        let alan = signup_user(app.clone(), "alan", "+15550000003").await;

        // ada-grace and grace-alan accepted; ada-alan unconnected.
        for (from, to) in [(ada, grace), (grace, alan)] {
            let response = make_request(
                app.clone(),
                Method::POST,
                &format!("/{from}/request/{to}/create"),
                String::new(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }
        for (viewer, other) in [(grace, ada), (alan, grace)] {
            let response = make_request(
                app.clone(),
                Method::PATCH,
                &format!("/{viewer}/request/{other}/accept"),
                String::new(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = make_request(
            app,
            Method::GET,
            &format!("/{ada}/friends/recommended"),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: RecommendedResponse =
            serde_json::from_slice(&bytes).unwrap();
        let alan_rec = parsed
            .recommendations
            .iter()
            .find(|r| r.id == alan)
            .expect("alan recommended");
        assert!(alan_rec.mutual_count >= 1);
    }
}
