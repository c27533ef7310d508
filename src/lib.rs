//! # devmarks
//!
//! A self-hostable bookmark library for developers. Administrators curate
//! common pages visible to everyone; signed-in users keep private pages of
//! their own. Usable as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use devmarks::server::{AppState, create_router};
//! use devmarks::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/devmarks.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), None));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
