mod users;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new().route("/users", get(users::list_users))
}
