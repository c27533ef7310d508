use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::auth::{IssuedToken, OptionalViewer, RequireViewer};
use crate::error::{Error, Result};
use crate::server::AppState;
use crate::server::dto::{CredentialsRequest, LoginResponse, MeResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};

/// Password and token hashing is CPU-bound; keep it off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(Error::from)?
}

fn login_response(state: &AppState, issued: IssuedToken) -> std::result::Result<LoginResponse, ApiError> {
    let profile = state
        .store
        .get_profile(&issued.user_id)
        .api_err("Failed to load profile")?
        .or_not_found("Profile not found")?;

    Ok(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        profile,
    })
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> impl IntoResponse {
    let auth = state.auth.clone();
    let profile = blocking(move || auth.sign_up(&req.email, &req.password)).await?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(profile))))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> impl IntoResponse {
    let auth = state.auth.clone();
    let issued = blocking(move || auth.sign_in(&req.email, &req.password)).await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(login_response(&state, issued)?)))
}

/// Exchanges the presented token for a fresh one; the old token stops working.
pub async fn refresh(auth: RequireViewer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let service = state.auth.clone();
    let issued = blocking(move || service.refresh(&auth.token)).await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(login_response(&state, issued)?)))
}

pub async fn logout(auth: RequireViewer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let service = state.auth.clone();
    blocking(move || service.sign_out(&auth.token)).await?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn me(OptionalViewer(viewer): OptionalViewer) -> impl IntoResponse {
    Json(ApiResponse::success(MeResponse { viewer }))
}
