use axum::{extract::State, Json};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::inventory::{summarize, InventorySummary};
use crate::state::AppState;

/// GET /inventory/summary
pub async fn handle_inventory_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<InventorySummary>, AppError> {
    let summary = summarize(state.store.as_ref(), user.user_id).await?;
    Ok(Json(summary))
}
