use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{OptionalViewer, RequireViewer};
use crate::dashboard::{Aggregator, CategoryFilter, MutationGateway, PageDraft};
use crate::server::AppState;
use crate::server::dto::{ListPagesParams, PagesResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};

pub async fn list_pages(
    OptionalViewer(viewer): OptionalViewer,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListPagesParams>,
) -> impl IntoResponse {
    let filter = CategoryFilter::parse(params.category.as_deref());
    let aggregator = Aggregator::new(state.store.as_ref());

    let pages = if params.grouped.unwrap_or(true) {
        PagesResponse::Grouped(aggregator.aggregate(&viewer, &filter))
    } else {
        PagesResponse::Flat(aggregator.flatten(&viewer, &filter))
    };

    Json(ApiResponse::success(pages))
}

pub async fn create_page(
    auth: RequireViewer,
    State(state): State<Arc<AppState>>,
    Json(draft): Json<PageDraft>,
) -> impl IntoResponse {
    let outcome = MutationGateway::new(state.store.as_ref()).add_page(&draft, &auth.viewer())?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::from(outcome))))
}

pub async fn update_page(
    auth: RequireViewer,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(draft): Json<PageDraft>,
) -> impl IntoResponse {
    let outcome =
        MutationGateway::new(state.store.as_ref()).edit_page(&id, &draft, &auth.viewer())?;

    Ok::<_, ApiError>(Json(ApiResponse::from(outcome)))
}

/// A page the caller owns is deleted as private, even when a stale common
/// flag is still set on the row.
pub async fn delete_page(
    auth: RequireViewer,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let page = store
        .get_page(&id)
        .api_err("Failed to get page")?
        .or_not_found("Page not found")?;
    let owner = store.get_page_owner(&id).api_err("Failed to get page owner")?;
    let owned_by_viewer = owner.as_deref() == Some(auth.profile.id.as_str());

    MutationGateway::new(store).delete_page(&id, page.is_common && !owned_by_viewer, &auth.viewer())?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
