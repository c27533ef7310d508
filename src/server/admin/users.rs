use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::dashboard::list_users as list_profiles;
use crate::server::AppState;
use crate::server::dto::ListUsersParams;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::RoleFilter;

pub async fn list_users(
    auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListUsersParams>,
) -> impl IntoResponse {
    let filter = match params.role.as_deref() {
        None => RoleFilter::All,
        Some(role) => RoleFilter::parse(role)
            .ok_or_else(|| ApiError::bad_request("role must be one of: all, admin, user"))?,
    };

    let profiles = list_profiles(state.store.as_ref(), &auth.viewer(), filter)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(profiles)))
}
