mod aggregate;
mod client;
mod directory;
mod form;
mod gateway;
mod session;
mod validation;

pub use aggregate::{Aggregator, CategoryFilter, PageGroup, UNCATEGORIZED, group_by_category, merge_sources};
pub use client::Dashboard;
pub use directory::list_users;
pub use form::{FormMode, PageForm};
pub use gateway::{MutationGateway, MutationOutcome, PageDraft, PageFields};
pub use session::{SessionContext, SessionResolver, Viewer};
pub use validation::{
    normalize_category_id, normalize_description, validate_category_name, validate_title,
    validate_url,
};
