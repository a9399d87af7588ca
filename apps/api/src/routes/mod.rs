pub mod health;


use axum::{extract::FromRequest, routing::get, Router};

use crate::errors::AppError;
use crate::events::handlers as events;
use crate::flags::handlers as flags;
use crate::inventory::handlers as inventory;
use crate::state::AppState;

/// JSON body extractor whose rejections surface as `VALIDATION_ERROR` responses.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/wine-events",
            get(events::handle_list_events).post(events::handle_event_action),
        )
        .route(
            "/inventory/summary",
            get(inventory::handle_inventory_summary),
        )
        .route("/me/flags", get(flags::handle_get_flags))
        .with_state(state)
}
