mod auth;
mod categories;
mod pages;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        // Pages
        .route("/pages", get(pages::list_pages))
        .route("/pages", post(pages::create_page))
        .route("/pages/{id}", patch(pages::update_page))
        .route("/pages/{id}", delete(pages::delete_page))
        // Categories
        .route("/categories", get(categories::list_categories))
        .route("/categories", post(categories::create_category))
        .route("/categories/{id}", patch(categories::update_category))
        .route("/categories/{id}", delete(categories::delete_category))
}
