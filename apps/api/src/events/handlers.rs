use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::events::dismissal::{apply_event_action, EventAction};
use crate::events::matcher::{find_matching_events, MatchParams};
use crate::models::event::MatchedEvent;
use crate::routes::AppJson;
use crate::state::AppState;

#[derive(Serialize)]
pub struct EventsResponse {
    pub events: Vec<MatchedEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventActionRequest {
    pub event_id: String,
    pub action: EventAction,
    /// Optional; when present it must name the authenticated user.
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// GET /wine-events
pub async fn handle_list_events(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<EventsResponse>, AppError> {
    let now = state.clock.now();
    let events = find_matching_events(
        state.store.as_ref(),
        MatchParams {
            user_id: user.user_id,
            flags: &user.flags,
            today: now.date_naive(),
            window_days: state.config.event_window_days,
            now,
        },
    )
    .await?;
    Ok(Json(EventsResponse { events }))
}

/// POST /wine-events
pub async fn handle_event_action(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<EventActionRequest>,
) -> Result<Json<OkResponse>, AppError> {
    user.ensure_acting_as(req.user_id)?;
    apply_event_action(
        state.store.as_ref(),
        user.user_id,
        &req.event_id,
        req.action,
        state.clock.now(),
    )
    .await?;
    Ok(Json(OkResponse { ok: true }))
}
