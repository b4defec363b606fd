//! Presence queries for the HTTP surface. Mirrors the gateway's
//! `user:get-last-seen` reply for callers without a socket.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/presence/{user_id}", get(get_presence))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PresenceResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "isOnline")]
    pub is_online: bool,
    #[serde(rename = "lastSeenAt")]
    pub last_seen_at: Option<DateTime<Utc>>,
}

#[utoipa::path(
    get,
    path = "/api/v1/presence/{user_id}",
    tag = "Presence",
    params(("user_id" = String, Path, description = "User to look up")),
    responses(
        (status = 200, description = "Presence state", body = PresenceResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn get_presence(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(user_id): Path<String>,
) -> Json<PresenceResponse> {
    Json(PresenceResponse {
        is_online: state.registry.is_online(&user_id),
        last_seen_at: state.registry.get_last_seen(&user_id),
        user_id,
    })
}
