//! In-process dashboard client: a session, a category filter and the last
//! aggregated snapshot, refreshed after every mutation.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use super::aggregate::{Aggregator, CategoryFilter, PageGroup};
use super::gateway::{MutationGateway, MutationOutcome, PageDraft};
use super::session::{SessionContext, Viewer};
use crate::auth::AuthService;
use crate::error::Result;
use crate::store::Store;
use crate::types::{Category, Page};

pub struct Dashboard {
    store: Arc<dyn Store>,
    session: SessionContext,
    filter: Mutex<CategoryFilter>,
    snapshot: Mutex<Vec<PageGroup>>,
}

impl Dashboard {
    /// Starts with an anonymous session. Must be called inside a Tokio runtime.
    pub fn new(store: Arc<dyn Store>, auth: Arc<AuthService>) -> Self {
        Self {
            session: SessionContext::start(auth, store.clone()),
            store,
            filter: Mutex::new(CategoryFilter::All),
            snapshot: Mutex::new(Vec::new()),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn viewer(&self) -> Viewer {
        self.session.viewer()
    }

    /// The last refreshed snapshot.
    pub fn pages(&self) -> Vec<PageGroup> {
        lock(&self.snapshot).clone()
    }

    pub fn filter(&self) -> CategoryFilter {
        lock(&self.filter).clone()
    }

    pub async fn select_category(&self, filter: CategoryFilter) -> Vec<PageGroup> {
        *lock(&self.filter) = filter;
        self.refresh().await
    }

    pub async fn refresh(&self) -> Vec<PageGroup> {
        let store = self.store.clone();
        let viewer = self.viewer();
        let filter = self.filter();

        let groups = tokio::task::spawn_blocking(move || {
            Aggregator::new(store.as_ref()).aggregate(&viewer, &filter)
        })
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Aggregation task failed: {e}");
            Vec::new()
        });

        *lock(&self.snapshot) = groups.clone();
        groups
    }

    /// Like [`Dashboard::refresh`], but the result is discarded and the
    /// snapshot left untouched if `cancel` fires first.
    pub async fn refresh_with(&self, cancel: &CancellationToken) -> Option<Vec<PageGroup>> {
        let store = self.store.clone();
        let viewer = self.viewer();
        let filter = self.filter();

        let task = tokio::task::spawn_blocking(move || {
            Aggregator::new(store.as_ref()).aggregate(&viewer, &filter)
        });

        let groups = tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("refresh cancelled");
                return None;
            }
            groups = task => groups,
        };

        match groups {
            Ok(groups) if !cancel.is_cancelled() => {
                *lock(&self.snapshot) = groups.clone();
                Some(groups)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::error!("Aggregation task failed: {e}");
                None
            }
        }
    }

    /// Runs a gateway operation off the async runtime, then refreshes the
    /// snapshot whether or not the write succeeded.
    async fn mutate<T, F>(&self, op: F) -> Result<MutationOutcome<T>>
    where
        T: Send + 'static,
        F: FnOnce(&MutationGateway<'_>, &Viewer) -> Result<MutationOutcome<T>> + Send + 'static,
    {
        let store = self.store.clone();
        let viewer = self.viewer();

        let result = tokio::task::spawn_blocking(move || {
            op(&MutationGateway::new(store.as_ref()), &viewer)
        })
        .await
        .map_err(crate::error::Error::from)
        .and_then(|r| r);

        self.refresh().await;
        result
    }

    pub async fn add_page(&self, draft: PageDraft) -> Result<MutationOutcome<Page>> {
        self.mutate(move |gateway, viewer| gateway.add_page(&draft, viewer))
            .await
    }

    pub async fn edit_page(&self, id: &str, draft: PageDraft) -> Result<MutationOutcome<Page>> {
        let id = id.to_string();
        self.mutate(move |gateway, viewer| gateway.edit_page(&id, &draft, viewer))
            .await
    }

    pub async fn delete_page(&self, id: &str, is_common: bool) -> Result<MutationOutcome<()>> {
        let id = id.to_string();
        self.mutate(move |gateway, viewer| gateway.delete_page(&id, is_common, viewer))
            .await
    }

    pub async fn add_category(&self, name: &str) -> Result<MutationOutcome<Category>> {
        let name = name.to_string();
        self.mutate(move |gateway, viewer| gateway.add_category(&name, viewer))
            .await
    }

    pub async fn edit_category(&self, id: &str, name: &str) -> Result<MutationOutcome<Category>> {
        let (id, name) = (id.to_string(), name.to_string());
        self.mutate(move |gateway, viewer| gateway.edit_category(&id, &name, viewer))
            .await
    }

    pub async fn delete_category(&self, id: &str) -> Result<MutationOutcome<()>> {
        let id = id.to_string();
        self.mutate(move |gateway, viewer| gateway.delete_category(&id, viewer))
            .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Viewer> {
        let viewer = self.session.sign_in(email, password).await?;
        self.refresh().await;
        Ok(viewer)
    }

    pub async fn sign_out(&self) -> Result<()> {
        let result = self.session.sign_out().await;
        self.refresh().await;
        result
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::SqliteStore;
    use crate::types::Role;

    struct Fixture {
        store: Arc<dyn Store>,
        auth: Arc<AuthService>,
    }

    fn fixture() -> Fixture {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        let store: Arc<dyn Store> = Arc::new(store);
        let auth = Arc::new(AuthService::new(store.clone(), None));

        let admin = auth.sign_up("admin@example.com", "Adm1n-secret").unwrap();
        auth.set_role(&admin.id, Role::Admin).unwrap();
        auth.sign_up("ana@example.com", "An4-secret!").unwrap();

        Fixture { store, auth }
    }

    fn draft(title: &str, category_id: Option<&str>, is_common: bool) -> PageDraft {
        PageDraft {
            title: title.to_string(),
            url: format!("https://example.com/{}", title.to_lowercase()),
            description: None,
            category_id: category_id.map(str::to_string),
            is_common,
        }
    }

    fn titles(groups: &[PageGroup]) -> Vec<&str> {
        groups
            .iter()
            .flat_map(|g| g.pages.iter().map(|p| p.page.title.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn test_anonymous_sees_only_common_pages() {
        let f = fixture();
        let admin = Dashboard::new(f.store.clone(), f.auth.clone());
        admin.sign_in("admin@example.com", "Adm1n-secret").await.unwrap();
        admin.add_page(draft("Shared", None, true)).await.unwrap();
        admin.add_page(draft("Secret", None, false)).await.unwrap();

        let anon = Dashboard::new(f.store.clone(), f.auth.clone());
        let groups = anon.refresh().await;
        assert_eq!(titles(&groups), vec!["Shared"]);
    }

    #[tokio::test]
    async fn test_snapshot_follows_mutations() {
        let f = fixture();
        let dashboard = Dashboard::new(f.store.clone(), f.auth.clone());
        dashboard.sign_in("ana@example.com", "An4-secret!").await.unwrap();

        let page = dashboard.add_page(draft("Mine", None, true)).await.unwrap().value;
        assert!(!page.is_common);
        assert_eq!(titles(&dashboard.pages()), vec!["Mine"]);
        assert_eq!(dashboard.pages()[0].category, "Uncategorized");

        dashboard.delete_page(&page.id, false).await.unwrap();
        assert!(dashboard.pages().is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_still_refreshes() {
        let f = fixture();
        let dashboard = Dashboard::new(f.store.clone(), f.auth.clone());
        dashboard.sign_in("ana@example.com", "An4-secret!").await.unwrap();
        dashboard.add_page(draft("Mine", None, false)).await.unwrap();

        *lock(&dashboard.snapshot) = Vec::new();
        let result = dashboard.add_category("Tools").await;
        assert!(matches!(result, Err(Error::Forbidden(_))));
        assert_eq!(titles(&dashboard.pages()), vec!["Mine"]);
    }

    #[tokio::test]
    async fn test_category_filter_and_delete_flow() {
        let f = fixture();
        let dashboard = Dashboard::new(f.store.clone(), f.auth.clone());
        dashboard.sign_in("admin@example.com", "Adm1n-secret").await.unwrap();

        let frontend = dashboard.add_category("Frontend").await.unwrap().value;
        let p1 = dashboard
            .add_page(draft("React", Some(&frontend.id), true))
            .await
            .unwrap()
            .value;
        dashboard.add_page(draft("Misc", None, true)).await.unwrap();

        let groups = dashboard
            .select_category(CategoryFilter::Category(frontend.id.clone()))
            .await;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].category, "Frontend");

        assert!(matches!(
            dashboard.delete_category(&frontend.id).await,
            Err(Error::Conflict(_))
        ));

        dashboard.delete_page(&p1.id, true).await.unwrap();
        dashboard.delete_category(&frontend.id).await.unwrap();

        let groups = dashboard.select_category(CategoryFilter::All).await;
        assert_eq!(titles(&groups), vec!["Misc"]);
    }

    #[tokio::test]
    async fn test_refresh_with_cancelled_token() {
        let f = fixture();
        let dashboard = Dashboard::new(f.store.clone(), f.auth.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(dashboard.refresh_with(&cancel).await.is_none());

        let live = CancellationToken::new();
        assert!(dashboard.refresh_with(&live).await.is_some());
    }

    #[tokio::test]
    async fn test_sign_out_drops_private_pages() {
        let f = fixture();
        let dashboard = Dashboard::new(f.store.clone(), f.auth.clone());
        dashboard.sign_in("ana@example.com", "An4-secret!").await.unwrap();
        dashboard.add_page(draft("Mine", None, false)).await.unwrap();
        assert_eq!(dashboard.pages().len(), 1);

        dashboard.sign_out().await.unwrap();
        assert_eq!(dashboard.viewer(), Viewer::Anonymous);
        assert!(dashboard.pages().is_empty());
    }
}
