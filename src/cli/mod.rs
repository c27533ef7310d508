mod admin;
mod auth;
mod category;
mod commands;
pub mod credentials;
pub mod http_client;
mod page;
pub mod pickers;
mod user;

pub use admin::{run_admin_init, run_admin_set_role};
pub use auth::{run_auth_login, run_auth_logout, run_auth_register};
pub use category::{run_category_add, run_category_delete, run_category_list, run_category_rename};
pub use commands::{AdminCommands, AuthCommands, CategoryCommands, PageCommands, UserCommands};
pub use page::{run_page_add, run_page_delete, run_page_edit, run_page_list};
pub use user::run_user_list;

use crate::config::ServerConfig;
use crate::store::SqliteStore;

/// Opens the store in `data_dir`, failing if it was never initialized.
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let config = ServerConfig {
        data_dir: data_dir.into(),
        ..ServerConfig::default()
    };
    let db_path = config.db_path();

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'devmarks admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}
