//! Create, update and delete of pages and categories.
//!
//! Every operation validates its input and checks the viewer's role before
//! issuing any write. These checks guard the user experience; the store's own
//! constraints remain the final authority.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::Viewer;
use super::validation::{
    normalize_category_id, normalize_description, validate_category_name, validate_title,
    validate_url,
};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Category, Page, Profile, UserPage};

/// Page fields as submitted by a form or API call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageDraft {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub is_common: bool,
}

/// Validated and trimmed [`PageDraft`].
#[derive(Debug, Clone, PartialEq)]
pub struct PageFields {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
}

impl PageDraft {
    pub fn validate(&self) -> Result<PageFields> {
        Ok(PageFields {
            title: validate_title(&self.title)?,
            url: validate_url(&self.url)?,
            description: normalize_description(self.description.as_deref())?,
            category_id: normalize_category_id(self.category_id.as_deref()),
        })
    }
}

/// Result of a successful mutation. Warnings report partial failures that
/// did not undo the write.
#[derive(Debug, Clone, Serialize)]
pub struct MutationOutcome<T> {
    pub value: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl<T> MutationOutcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }
}

fn require_signed_in(viewer: &Viewer) -> Result<&Profile> {
    viewer.profile().ok_or(Error::Unauthorized)
}

fn require_admin<'v>(viewer: &'v Viewer, action: &str) -> Result<&'v Profile> {
    let profile = require_signed_in(viewer)?;
    if !profile.role.is_admin() {
        return Err(Error::forbidden(format!("only administrators can {action}")));
    }
    Ok(profile)
}

pub struct MutationGateway<'a> {
    store: &'a dyn Store,
}

impl<'a> MutationGateway<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    fn ensure_category_exists(&self, category_id: Option<&str>) -> Result<()> {
        if let Some(id) = category_id {
            if self.store.get_category(id)?.is_none() {
                return Err(Error::validation("category does not exist"));
            }
        }
        Ok(())
    }

    /// Links a private page to its owner. Failure is reported as a warning;
    /// the page itself stays written.
    fn attach_owner(&self, user_id: &str, page_id: &str, warnings: &mut Vec<String>) {
        let link = UserPage {
            user_id: user_id.to_string(),
            page_id: page_id.to_string(),
            created_at: Utc::now(),
        };

        match self.store.create_user_page(&link) {
            Ok(()) => {}
            Err(Error::AlreadyExists) => match self.store.get_page_owner(page_id) {
                Ok(Some(owner)) if owner != user_id => {
                    tracing::warn!(page_id, user_id, owner, "Page already owned by another user");
                    warnings.push("The page was saved, but it already belongs to another user".to_string());
                }
                _ => {}
            },
            Err(e) => {
                tracing::warn!(page_id, user_id, "Failed to link page to owner: {e}");
                warnings.push(format!(
                    "The page was saved, but could not be linked to your account: {e}"
                ));
            }
        }
    }

    pub fn add_page(&self, draft: &PageDraft, viewer: &Viewer) -> Result<MutationOutcome<Page>> {
        let profile = require_signed_in(viewer)?;
        let fields = draft.validate()?;
        self.ensure_category_exists(fields.category_id.as_deref())?;

        let is_common = draft.is_common && profile.role.is_admin();
        if draft.is_common && !is_common {
            tracing::debug!(user_id = %profile.id, "Common flag dropped for non-admin page");
        }

        let now = Utc::now();
        let page = Page {
            id: Uuid::new_v4().to_string(),
            title: fields.title,
            url: fields.url,
            description: fields.description,
            category_id: fields.category_id,
            is_common,
            created_at: now,
            updated_at: now,
        };
        self.store.create_page(&page)?;

        let mut outcome = MutationOutcome::new(page);
        if !outcome.value.is_common {
            self.attach_owner(&profile.id, &outcome.value.id, &mut outcome.warnings);
        }

        tracing::info!(page_id = %outcome.value.id, is_common, "page created");
        Ok(outcome)
    }

    pub fn edit_page(
        &self,
        id: &str,
        draft: &PageDraft,
        viewer: &Viewer,
    ) -> Result<MutationOutcome<Page>> {
        let profile = require_signed_in(viewer)?;
        let fields = draft.validate()?;
        let is_admin = profile.role.is_admin();

        let existing = self.store.get_page(id)?.ok_or(Error::NotFound)?;
        let owner = self.store.get_page_owner(id)?;

        if existing.is_common {
            if !is_admin {
                return Err(Error::forbidden("only administrators can edit common pages"));
            }
        } else {
            let owns = owner.as_deref() == Some(profile.id.as_str());
            let orphaned_for_admin = owner.is_none() && is_admin;
            if !owns && !orphaned_for_admin {
                return Err(Error::NotFound);
            }
        }

        self.ensure_category_exists(fields.category_id.as_deref())?;

        let page = Page {
            title: fields.title,
            url: fields.url,
            description: fields.description,
            category_id: fields.category_id,
            is_common: draft.is_common && is_admin,
            updated_at: Utc::now(),
            ..existing.clone()
        };
        self.store.update_page(&page)?;

        let mut outcome = MutationOutcome::new(page);
        match (existing.is_common, outcome.value.is_common) {
            (false, true) => {
                self.store.delete_page_owners(id)?;
            }
            (true, false) => {
                self.attach_owner(&profile.id, id, &mut outcome.warnings);
            }
            _ => {}
        }

        tracing::info!(page_id = %id, "page updated");
        Ok(outcome)
    }

    /// Deletes a page. `is_common` is the flag the viewer saw; a private
    /// delete removes both the viewer's ownership link and the page row.
    pub fn delete_page(&self, id: &str, is_common: bool, viewer: &Viewer) -> Result<MutationOutcome<()>> {
        if is_common {
            require_admin(viewer, "delete common pages")?;

            let page = self.store.get_page(id)?.ok_or(Error::NotFound)?;
            if !page.is_common {
                return Err(Error::conflict("page is not a common page"));
            }
            if !self.store.delete_page(id)? {
                return Err(Error::NotFound);
            }
        } else {
            let profile = require_signed_in(viewer)?;

            if !self.store.delete_user_page(&profile.id, id)? {
                return Err(Error::NotFound);
            }
            if !self.store.delete_page(id)? {
                tracing::warn!(page_id = %id, "Ownership removed but page row was already gone");
            }
        }

        tracing::info!(page_id = %id, is_common, "page deleted");
        Ok(MutationOutcome::new(()))
    }

    pub fn add_category(&self, name: &str, viewer: &Viewer) -> Result<MutationOutcome<Category>> {
        require_admin(viewer, "add categories")?;
        let name = validate_category_name(name)?;

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name,
            created_at: Utc::now(),
        };
        self.store.create_category(&category)?;

        tracing::info!(category_id = %category.id, "category created");
        Ok(MutationOutcome::new(category))
    }

    pub fn edit_category(
        &self,
        id: &str,
        name: &str,
        viewer: &Viewer,
    ) -> Result<MutationOutcome<Category>> {
        require_admin(viewer, "edit categories")?;
        let name = validate_category_name(name)?;

        let mut category = self.store.get_category(id)?.ok_or(Error::NotFound)?;
        category.name = name;
        self.store.update_category(&category)?;

        tracing::info!(category_id = %id, "category renamed");
        Ok(MutationOutcome::new(category))
    }

    /// A category is deletable only when no common page and no owned page
    /// references it.
    pub fn delete_category(&self, id: &str, viewer: &Viewer) -> Result<MutationOutcome<()>> {
        require_admin(viewer, "delete categories")?;

        if self.store.get_category(id)?.is_none() {
            return Err(Error::NotFound);
        }

        if self.store.count_common_pages_in_category(id)? > 0 {
            return Err(Error::conflict(
                "cannot delete a category that contains public pages; delete or reassign them first",
            ));
        }
        if self.store.count_owned_pages_in_category(id)? > 0 {
            return Err(Error::conflict(
                "cannot delete a category that contains private pages of users; delete or reassign them first",
            ));
        }

        if !self.store.delete_category(id)? {
            return Err(Error::NotFound);
        }

        tracing::info!(category_id = %id, "category deleted");
        Ok(MutationOutcome::new(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::aggregate::{Aggregator, CategoryFilter};
    use crate::store::SqliteStore;
    use crate::types::{Account, Role};

    fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn viewer(store: &SqliteStore, id: &str, role: Role) -> Viewer {
        let profile = Profile {
            id: id.to_string(),
            username: format!("{id}@example.com"),
            role,
            created_at: Utc::now(),
        };
        let account = Account {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        };
        store.create_account_with_profile(&account, &profile).unwrap();
        Viewer::SignedIn(profile)
    }

    fn draft(title: &str, category_id: Option<&str>, is_common: bool) -> PageDraft {
        PageDraft {
            title: title.to_string(),
            url: "https://example.com".to_string(),
            description: None,
            category_id: category_id.map(str::to_string),
            is_common,
        }
    }

    #[test]
    fn test_add_page_requires_title_and_url() {
        let store = store();
        let user = viewer(&store, "u1", Role::User);
        let gateway = MutationGateway::new(&store);

        let mut bad = draft("  ", None, false);
        assert!(matches!(gateway.add_page(&bad, &user), Err(Error::Validation(_))));

        bad.title = "Ok".to_string();
        bad.url = " ".to_string();
        assert!(matches!(gateway.add_page(&bad, &user), Err(Error::Validation(_))));

        assert!(store.list_owned_pages("u1").unwrap().is_empty());
    }

    #[test]
    fn test_anonymous_cannot_add_page() {
        let store = store();
        let gateway = MutationGateway::new(&store);
        let result = gateway.add_page(&draft("Docs", None, false), &Viewer::Anonymous);
        assert!(matches!(result, Err(Error::Unauthorized)));
    }

    #[test]
    fn test_non_admin_common_request_is_stored_private() {
        let store = store();
        let user = viewer(&store, "u1", Role::User);
        let gateway = MutationGateway::new(&store);

        let outcome = gateway.add_page(&draft("Docs", None, true), &user).unwrap();

        assert!(!outcome.value.is_common);
        assert!(outcome.warnings.is_empty());
        let stored = store.get_page(&outcome.value.id).unwrap().unwrap();
        assert!(!stored.is_common);
        assert_eq!(store.get_page_owner(&stored.id).unwrap().as_deref(), Some("u1"));
    }

    #[test]
    fn test_admin_common_page_has_no_owner() {
        let store = store();
        let admin = viewer(&store, "admin", Role::Admin);
        let gateway = MutationGateway::new(&store);

        let outcome = gateway.add_page(&draft("Docs", None, true), &admin).unwrap();

        assert!(outcome.value.is_common);
        assert!(store.get_page_owner(&outcome.value.id).unwrap().is_none());
    }

    #[test]
    fn test_add_page_with_unknown_category_is_rejected() {
        let store = store();
        let user = viewer(&store, "u1", Role::User);
        let gateway = MutationGateway::new(&store);

        let result = gateway.add_page(&draft("Docs", Some("missing"), false), &user);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_failed_ownership_link_is_a_warning() {
        let store = store();
        let user = viewer(&store, "u1", Role::User);
        store
            .connection()
            .execute_batch("DROP TABLE user_pages;")
            .unwrap();
        let gateway = MutationGateway::new(&store);

        let outcome = gateway.add_page(&draft("Docs", None, false), &user).unwrap();

        assert_eq!(outcome.warnings.len(), 1);
        assert!(store.get_page(&outcome.value.id).unwrap().is_some());
    }

    #[test]
    fn test_non_admin_cannot_promote_or_edit_common_pages() {
        let store = store();
        let user = viewer(&store, "u1", Role::User);
        let admin = viewer(&store, "admin", Role::Admin);
        let gateway = MutationGateway::new(&store);

        let mine = gateway.add_page(&draft("Mine", None, false), &user).unwrap().value;
        let edited = gateway
            .edit_page(&mine.id, &draft("Mine v2", None, true), &user)
            .unwrap()
            .value;
        assert_eq!(edited.title, "Mine v2");
        assert!(!edited.is_common);

        let shared = gateway.add_page(&draft("Shared", None, true), &admin).unwrap().value;
        let result = gateway.edit_page(&shared.id, &draft("Hijack", None, false), &user);
        assert!(matches!(result, Err(Error::Forbidden(_))));
    }

    #[test]
    fn test_private_pages_of_others_are_hidden_from_edit() {
        let store = store();
        let owner = viewer(&store, "u1", Role::User);
        let other = viewer(&store, "u2", Role::User);
        let gateway = MutationGateway::new(&store);

        let mine = gateway.add_page(&draft("Mine", None, false), &owner).unwrap().value;
        let result = gateway.edit_page(&mine.id, &draft("Theirs", None, false), &other);
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn test_admin_visibility_change_keeps_ownership_invariant() {
        let store = store();
        let admin = viewer(&store, "admin", Role::Admin);
        let gateway = MutationGateway::new(&store);

        let page = gateway.add_page(&draft("Draft", None, false), &admin).unwrap().value;
        assert_eq!(store.get_page_owner(&page.id).unwrap().as_deref(), Some("admin"));

        gateway.edit_page(&page.id, &draft("Draft", None, true), &admin).unwrap();
        assert!(store.get_page_owner(&page.id).unwrap().is_none());

        gateway.edit_page(&page.id, &draft("Draft", None, false), &admin).unwrap();
        assert_eq!(store.get_page_owner(&page.id).unwrap().as_deref(), Some("admin"));
    }

    #[test]
    fn test_concurrent_flip_to_private_keeps_first_owner() {
        let store = store();
        let first = viewer(&store, "a1", Role::Admin);
        viewer(&store, "a2", Role::Admin);
        let gateway = MutationGateway::new(&store);

        let page = gateway.add_page(&draft("Shared", None, true), &first).unwrap().value;
        // Another admin's flip linked itself first.
        store
            .create_user_page(&UserPage {
                user_id: "a2".to_string(),
                page_id: page.id.clone(),
                created_at: Utc::now(),
            })
            .unwrap();

        let outcome = gateway
            .edit_page(&page.id, &draft("Shared", None, false), &first)
            .unwrap();

        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(store.get_page_owner(&page.id).unwrap().as_deref(), Some("a2"));
        assert_eq!(store.delete_page_owners(&page.id).unwrap(), 1);
    }

    #[test]
    fn test_delete_common_page_requires_admin() {
        let store = store();
        let user = viewer(&store, "u1", Role::User);
        let admin = viewer(&store, "admin", Role::Admin);
        let gateway = MutationGateway::new(&store);

        let shared = gateway.add_page(&draft("Shared", None, true), &admin).unwrap().value;

        let result = gateway.delete_page(&shared.id, true, &user);
        assert!(matches!(result, Err(Error::Forbidden(_))));
        assert!(store.get_page(&shared.id).unwrap().is_some());

        gateway.delete_page(&shared.id, true, &admin).unwrap();
        assert!(store.get_page(&shared.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_private_page_removes_link_and_row() {
        let store = store();
        let user = viewer(&store, "u1", Role::User);
        let gateway = MutationGateway::new(&store);

        let mine = gateway.add_page(&draft("Mine", None, false), &user).unwrap().value;
        gateway.delete_page(&mine.id, false, &user).unwrap();

        assert!(store.get_page(&mine.id).unwrap().is_none());
        assert!(store.get_page_owner(&mine.id).unwrap().is_none());

        let visible = Aggregator::new(&store).flatten(&user, &CategoryFilter::All);
        assert!(visible.iter().all(|p| p.page.id != mine.id));
    }

    #[test]
    fn test_delete_private_page_of_someone_else_is_not_found() {
        let store = store();
        let owner = viewer(&store, "u1", Role::User);
        let other = viewer(&store, "u2", Role::User);
        let gateway = MutationGateway::new(&store);

        let mine = gateway.add_page(&draft("Mine", None, false), &owner).unwrap().value;
        let result = gateway.delete_page(&mine.id, false, &other);
        assert!(matches!(result, Err(Error::NotFound)));
        assert!(store.get_page(&mine.id).unwrap().is_some());
    }

    #[test]
    fn test_category_mutations_are_admin_only() {
        let store = store();
        let user = viewer(&store, "u1", Role::User);
        let admin = viewer(&store, "admin", Role::Admin);
        let gateway = MutationGateway::new(&store);

        assert!(matches!(gateway.add_category("Tools", &user), Err(Error::Forbidden(_))));
        assert!(matches!(
            gateway.add_category("Tools", &Viewer::Anonymous),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(gateway.add_category("   ", &admin), Err(Error::Validation(_))));

        let category = gateway.add_category("  Tools ", &admin).unwrap().value;
        assert_eq!(category.name, "Tools");

        assert!(matches!(
            gateway.edit_category(&category.id, "DevTools", &user),
            Err(Error::Forbidden(_))
        ));
        let renamed = gateway.edit_category(&category.id, "DevTools", &admin).unwrap().value;
        assert_eq!(renamed.name, "DevTools");
        assert_eq!(store.get_category(&category.id).unwrap().unwrap().name, "DevTools");

        assert!(matches!(
            gateway.delete_category(&category.id, &user),
            Err(Error::Forbidden(_))
        ));
    }

    #[test]
    fn test_delete_category_with_public_pages_is_refused() {
        let store = store();
        let admin = viewer(&store, "admin", Role::Admin);
        let gateway = MutationGateway::new(&store);

        let frontend = gateway.add_category("Frontend", &admin).unwrap().value;
        let p1 = gateway
            .add_page(&draft("React", Some(&frontend.id), true), &admin)
            .unwrap()
            .value;

        let err = gateway.delete_category(&frontend.id, &admin).unwrap_err();
        match err {
            Error::Conflict(reason) => assert!(reason.contains("public pages")),
            other => panic!("unexpected error: {other:?}"),
        }

        gateway.delete_page(&p1.id, true, &admin).unwrap();
        gateway.delete_category(&frontend.id, &admin).unwrap();

        let names: Vec<String> = store
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert!(!names.contains(&frontend.id));
    }

    #[test]
    fn test_delete_category_with_private_pages_is_refused() {
        let store = store();
        let admin = viewer(&store, "admin", Role::Admin);
        let user = viewer(&store, "u1", Role::User);
        let gateway = MutationGateway::new(&store);

        let backend = gateway.add_category("Backend", &admin).unwrap().value;
        let mine = gateway
            .add_page(&draft("Axum", Some(&backend.id), false), &user)
            .unwrap()
            .value;

        let err = gateway.delete_category(&backend.id, &admin).unwrap_err();
        match err {
            Error::Conflict(reason) => assert!(reason.contains("private pages")),
            other => panic!("unexpected error: {other:?}"),
        }

        gateway.delete_page(&mine.id, false, &user).unwrap();
        gateway.delete_category(&backend.id, &admin).unwrap();
    }

    #[test]
    fn test_delete_missing_category_is_not_found() {
        let store = store();
        let admin = viewer(&store, "admin", Role::Admin);
        let gateway = MutationGateway::new(&store);

        assert!(matches!(
            gateway.delete_category("nope", &admin),
            Err(Error::NotFound)
        ));
    }
}
