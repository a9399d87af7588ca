use axum::Json;

use crate::auth::AuthUser;
use crate::flags::UserFlags;

/// GET /me/flags
pub async fn handle_get_flags(user: AuthUser) -> Json<UserFlags> {
    Json(user.flags)
}
