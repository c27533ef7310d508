use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::dashboard::MutationGateway;
use crate::server::AppState;
use crate::server::dto::CategoryRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

pub async fn list_categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let categories = state
        .store
        .list_categories()
        .api_err("Failed to list categories")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(categories)))
}

pub async fn create_category(
    auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CategoryRequest>,
) -> impl IntoResponse {
    let outcome = MutationGateway::new(state.store.as_ref()).add_category(&req.name, &auth.viewer())?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::from(outcome))))
}

pub async fn update_category(
    auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CategoryRequest>,
) -> impl IntoResponse {
    let outcome =
        MutationGateway::new(state.store.as_ref()).edit_category(&id, &req.name, &auth.viewer())?;

    Ok::<_, ApiError>(Json(ApiResponse::from(outcome)))
}

pub async fn delete_category(
    auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    MutationGateway::new(state.store.as_ref()).delete_category(&id, &auth.viewer())?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
