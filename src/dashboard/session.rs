//! Viewer resolution and the client-side session context.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::auth::{AuthEvent, AuthService, Identity};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Profile, Role};

/// The current actor. Anonymous viewers only ever see common pages.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Viewer {
    #[default]
    Anonymous,
    SignedIn(Profile),
}

impl Viewer {
    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Viewer::Anonymous => None,
            Viewer::SignedIn(profile) => Some(profile),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.profile().map(|p| p.id.as_str())
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.profile().map(|p| p.role)
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        matches!(self, Viewer::SignedIn(_))
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role().is_some_and(Role::is_admin)
    }
}

/// Turns an authenticated identity into a [`Viewer`].
#[derive(Clone)]
pub struct SessionResolver {
    store: Arc<dyn Store>,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Never fails: a missing or unreadable profile degrades to anonymous.
    pub fn resolve(&self, identity: Option<&Identity>) -> Viewer {
        let Some(identity) = identity else {
            return Viewer::Anonymous;
        };

        match self.store.get_profile(&identity.user_id) {
            Ok(Some(profile)) => Viewer::SignedIn(profile),
            Ok(None) => {
                tracing::warn!(user_id = %identity.user_id, "No profile for identity, treating as anonymous");
                Viewer::Anonymous
            }
            Err(e) => {
                tracing::warn!(user_id = %identity.user_id, "Error loading profile: {e}");
                Viewer::Anonymous
            }
        }
    }

    /// Resolves the viewer behind a raw session token. Invalid, expired or
    /// revoked tokens resolve to anonymous.
    pub fn resolve_token(&self, auth: &AuthService, raw_token: Option<&str>) -> Viewer {
        let identity = raw_token.and_then(|token| match auth.authenticate(token) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::debug!("Session token rejected: {e}");
                None
            }
        });
        self.resolve(identity.as_ref())
    }
}

/// Scoped session state for one client: the current token and the viewer it
/// resolves to. The viewer is re-resolved on every [`AuthEvent`] about the
/// signed-in user until the context is dropped.
pub struct SessionContext {
    auth: Arc<AuthService>,
    resolver: SessionResolver,
    token: Arc<Mutex<Option<String>>>,
    viewer: watch::Sender<Viewer>,
    cancel: CancellationToken,
}

impl SessionContext {
    /// Starts an anonymous session. Must be called inside a Tokio runtime.
    pub fn start(auth: Arc<AuthService>, store: Arc<dyn Store>) -> Self {
        let (viewer, _) = watch::channel(Viewer::Anonymous);
        let context = Self {
            resolver: SessionResolver::new(store),
            token: Arc::new(Mutex::new(None)),
            viewer,
            cancel: CancellationToken::new(),
            auth,
        };
        context.spawn_listener();
        context
    }

    fn spawn_listener(&self) {
        let mut events = self.auth.subscribe();
        let auth = self.auth.clone();
        let resolver = self.resolver.clone();
        let token = self.token.clone();
        let viewer = self.viewer.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(event) => {
                            // A refresh leaves the viewer as it was; the refreshing
                            // context swaps its own token.
                            if matches!(event, AuthEvent::TokenRefreshed { .. })
                                || viewer.borrow().user_id() != Some(event.user_id())
                            {
                                continue;
                            }
                            tracing::debug!(?event, "re-resolving session");
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "auth events lagged, re-resolving session");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }

                let current = lock(&token).clone();
                let auth = auth.clone();
                let resolver = resolver.clone();
                let resolved = tokio::task::spawn_blocking(move || {
                    resolver.resolve_token(&auth, current.as_deref())
                })
                .await;

                match resolved {
                    Ok(resolved) if !cancel.is_cancelled() => {
                        viewer.send_if_modified(|v| replace_if_changed(v, resolved));
                    }
                    Ok(_) => break,
                    Err(e) => tracing::error!("Session resolution task failed: {e}"),
                }
            }
        });
    }

    #[must_use]
    pub fn viewer(&self) -> Viewer {
        self.viewer.borrow().clone()
    }

    /// Subscribes to viewer changes.
    pub fn watch(&self) -> watch::Receiver<Viewer> {
        self.viewer.subscribe()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        lock(&self.token).clone()
    }

    /// Signs in and resolves the new viewer before returning it.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Viewer> {
        let auth = self.auth.clone();
        let (email, password) = (email.to_string(), password.to_string());
        let issued = tokio::task::spawn_blocking(move || auth.sign_in(&email, &password)).await??;

        *lock(&self.token) = Some(issued.token);
        Ok(self.reresolve().await)
    }

    /// Swaps the current token for a fresh one. The old token is revoked.
    pub async fn refresh_token(&self) -> Result<Viewer> {
        let token = self.token().ok_or(Error::Unauthorized)?;
        let auth = self.auth.clone();
        let issued = tokio::task::spawn_blocking(move || auth.refresh(&token)).await??;

        *lock(&self.token) = Some(issued.token);
        Ok(self.reresolve().await)
    }

    /// Revokes the current token and drops back to anonymous.
    pub async fn sign_out(&self) -> Result<()> {
        let Some(token) = lock(&self.token).take() else {
            return Ok(());
        };
        self.viewer.send_replace(Viewer::Anonymous);

        let auth = self.auth.clone();
        tokio::task::spawn_blocking(move || auth.sign_out(&token)).await??;
        Ok(())
    }

    /// Re-resolves the viewer from the current token right away.
    pub async fn reresolve(&self) -> Viewer {
        let auth = self.auth.clone();
        let resolver = self.resolver.clone();
        let token = self.token();

        let resolved = tokio::task::spawn_blocking(move || resolver.resolve_token(&auth, token.as_deref()))
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Session resolution task failed: {e}");
                Viewer::Anonymous
            });

        self.viewer.send_replace(resolved.clone());
        resolved
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn replace_if_changed(current: &mut Viewer, resolved: Viewer) -> bool {
    if *current == resolved {
        false
    } else {
        *current = resolved;
        true
    }
}
