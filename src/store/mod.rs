mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Account operations
    /// Inserts the account and its profile in one transaction.
    fn create_account_with_profile(&self, account: &Account, profile: &Profile) -> Result<()>;
    fn get_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    // Profile operations
    fn get_profile(&self, id: &str) -> Result<Option<Profile>>;
    fn list_profiles(&self) -> Result<Vec<Profile>>;
    fn update_profile_role(&self, id: &str, role: Role) -> Result<()>;
    fn has_admin(&self) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn delete_user_tokens(&self, user_id: &str) -> Result<usize>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Category operations
    fn create_category(&self, category: &Category) -> Result<()>;
    fn get_category(&self, id: &str) -> Result<Option<Category>>;
    fn list_categories(&self) -> Result<Vec<Category>>;
    fn update_category(&self, category: &Category) -> Result<()>;
    fn delete_category(&self, id: &str) -> Result<bool>;
    fn count_common_pages_in_category(&self, id: &str) -> Result<i64>;
    fn count_owned_pages_in_category(&self, id: &str) -> Result<i64>;

    // Page operations (listings are ordered by title)
    fn create_page(&self, page: &Page) -> Result<()>;
    fn get_page(&self, id: &str) -> Result<Option<Page>>;
    fn list_common_pages(&self) -> Result<Vec<PageWithCategory>>;
    fn list_owned_pages(&self, user_id: &str) -> Result<Vec<PageWithCategory>>;
    fn update_page(&self, page: &Page) -> Result<()>;
    fn delete_page(&self, id: &str) -> Result<bool>;

    // Ownership operations (private pages only)
    fn create_user_page(&self, link: &UserPage) -> Result<()>;
    fn get_page_owner(&self, page_id: &str) -> Result<Option<String>>;
    fn delete_user_page(&self, user_id: &str, page_id: &str) -> Result<bool>;
    fn delete_page_owners(&self, page_id: &str) -> Result<usize>;

    fn close(&self) -> Result<()>;
}
