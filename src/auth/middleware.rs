use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::extract_bearer_token;
use crate::dashboard::{SessionResolver, Viewer};
use crate::error::Error;
use crate::server::AppState;
use crate::types::Profile;

/// The viewer behind the request, anonymous when no usable token is sent.
/// Never rejects: bad tokens and missing profiles degrade to anonymous.
pub struct OptionalViewer(pub Viewer);

/// A signed-in viewer together with the raw token it presented.
pub struct RequireViewer {
    pub profile: Profile,
    pub token: String,
}

impl RequireViewer {
    pub fn viewer(&self) -> Viewer {
        Viewer::SignedIn(self.profile.clone())
    }
}

/// A signed-in viewer with the admin role.
pub struct RequireAdmin(pub Profile);

impl RequireAdmin {
    pub fn viewer(&self) -> Viewer {
        Viewer::SignedIn(self.0.clone())
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    NotAdmin,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });
        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"devmarks\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for OptionalViewer {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw_token = extract_bearer_token(&parts.headers).ok().flatten();
        let state = state.clone();

        let viewer = tokio::task::spawn_blocking(move || {
            SessionResolver::new(state.store.clone()).resolve_token(&state.auth, raw_token.as_deref())
        })
        .await
        .map_err(|e| {
            tracing::error!("Session resolution task failed: {e}");
            AuthError::InternalError
        })?;

        Ok(OptionalViewer(viewer))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireViewer {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .map_err(|_| AuthError::InvalidScheme)?
            .ok_or(AuthError::MissingAuth)?;

        let state = state.clone();
        let raw = token.clone();
        let profile = tokio::task::spawn_blocking(move || {
            let identity = state.auth.authenticate(&raw).map_err(|e| match e {
                Error::TokenExpired => AuthError::TokenExpired,
                Error::InvalidTokenFormat | Error::Unauthorized => AuthError::InvalidToken,
                other => {
                    tracing::error!("Token validation failed: {other}");
                    AuthError::InternalError
                }
            })?;

            match state.store.get_profile(&identity.user_id) {
                Ok(Some(profile)) => Ok(profile),
                Ok(None) => Err(AuthError::InvalidToken),
                Err(e) => {
                    tracing::error!(user_id = %identity.user_id, "Error loading profile: {e}");
                    Err(AuthError::InternalError)
                }
            }
        })
        .await
        .map_err(|_| AuthError::InternalError)??;

        Ok(RequireViewer { profile, token })
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let RequireViewer { profile, .. } = RequireViewer::from_request_parts(parts, state).await?;

        if !profile.role.is_admin() {
            return Err(AuthError::NotAdmin);
        }

        Ok(RequireAdmin(profile))
    }
}
