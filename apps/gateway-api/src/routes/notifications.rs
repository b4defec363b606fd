//! Internal dispatch route. The notification service calls this after it has
//! durably persisted a record; the gateway turns it into directed sends.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::{ApiError, FieldError};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/internal/notifications", post(dispatch))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    New,
    Read,
    AllRead,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DispatchRequest {
    pub kind: DispatchKind,
    pub user_ids: Vec<String>,
    /// The persisted notification record. Required for `new`.
    #[serde(default)]
    pub notification: Option<Value>,
    /// Required for `read`.
    #[serde(default)]
    pub notification_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchResponse {
    pub status: &'static str,
}

#[utoipa::path(
    post,
    path = "/internal/notifications",
    tag = "Notifications",
    request_body = DispatchRequest,
    responses(
        (status = 202, description = "Queued for any live connections", body = DispatchResponse),
        (status = 400, description = "Invalid payload", body = crate::error::ApiErrorBody),
        (status = 401, description = "Invalid service key", body = crate::error::ApiErrorBody),
    ),
)]
pub async fn dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DispatchRequest>,
) -> Result<(StatusCode, Json<DispatchResponse>), ApiError> {
    let key = headers.get("x-service-key").and_then(|v| v.to_str().ok());
    if key != Some(state.config.service_key.as_str()) {
        return Err(ApiError::unauthorized("Invalid service key"));
    }

    match body.kind {
        DispatchKind::New => {
            let Some(notification) = body.notification else {
                return Err(ApiError::validation(vec![FieldError {
                    field: "notification".to_string(),
                    message: "required for kind=new".to_string(),
                }]));
            };
            state
                .relay
                .notify_users(body.user_ids.iter().map(String::as_str), notification);
        }
        DispatchKind::Read => {
            let Some(notification_id) = body.notification_id else {
                return Err(ApiError::validation(vec![FieldError {
                    field: "notification_id".to_string(),
                    message: "required for kind=read".to_string(),
                }]));
            };
            for user_id in &body.user_ids {
                state.relay.notify_read(user_id, &notification_id);
            }
        }
        DispatchKind::AllRead => {
            for user_id in &body.user_ids {
                state.relay.notify_all_read(user_id);
            }
        }
    }

    // Accepted means queued for any live connections, not delivered. The
    // persisted record remains the source of truth.
    Ok((
        StatusCode::ACCEPTED,
        Json(DispatchResponse { status: "accepted" }),
    ))
}
