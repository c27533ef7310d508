use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::password::{check_password_policy, hash_password, normalize_email, verify_password};
use super::token::{TokenGenerator, parse_token};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Account, Profile, Role, Token};

const EVENT_CAPACITY: usize = 64;
const MAX_TOKEN_RETRIES: u32 = 3;

/// An authenticated identity, as proven by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub token_id: String,
}

/// Auth-state changes. Session holders re-resolve their viewer on each one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { user_id: String },
    SignedOut { user_id: String },
    TokenRefreshed { user_id: String },
    ProfileChanged { user_id: String },
}

impl AuthEvent {
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            AuthEvent::SignedIn { user_id }
            | AuthEvent::SignedOut { user_id }
            | AuthEvent::TokenRefreshed { user_id }
            | AuthEvent::ProfileChanged { user_id } => user_id,
        }
    }
}

/// A freshly issued session token. The raw value is never stored.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Sign-up, sign-in and sign-out over the store's account and token tables.
pub struct AuthService {
    store: Arc<dyn Store>,
    tokens: TokenGenerator,
    token_ttl: Option<Duration>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, token_ttl: Option<Duration>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            tokens: TokenGenerator::new(),
            token_ttl,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: AuthEvent) {
        tracing::debug!(?event, "auth state changed");
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Creates an account and its `user` profile. The username is the email.
    pub fn sign_up(&self, email: &str, password: &str) -> Result<Profile> {
        let email = normalize_email(email)?;
        check_password_policy(password)?;

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            password_hash: hash_password(password)?,
            created_at: now,
        };
        let profile = Profile {
            id: account.id.clone(),
            username: email,
            role: Role::User,
            created_at: now,
        };
        self.store.create_account_with_profile(&account, &profile)?;

        tracing::info!(user_id = %profile.id, "account created");
        Ok(profile)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<IssuedToken> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(Error::validation("password is required"));
        }

        let account = self
            .store
            .get_account_by_email(&email)?
            .ok_or(Error::InvalidCredentials)?;

        if !verify_password(password, &account.password_hash)? {
            return Err(Error::InvalidCredentials);
        }

        let issued = self.issue_token(&account.id)?;
        self.emit(AuthEvent::SignedIn {
            user_id: account.id,
        });
        Ok(issued)
    }

    /// Revokes the presented token.
    pub fn sign_out(&self, raw_token: &str) -> Result<()> {
        let identity = self.authenticate(raw_token)?;
        self.store.delete_token(&identity.token_id)?;
        self.emit(AuthEvent::SignedOut {
            user_id: identity.user_id,
        });
        Ok(())
    }

    /// Exchanges a valid token for a new one and revokes the old one.
    pub fn refresh(&self, raw_token: &str) -> Result<IssuedToken> {
        let identity = self.authenticate(raw_token)?;
        let issued = self.issue_token(&identity.user_id)?;
        self.store.delete_token(&identity.token_id)?;
        self.emit(AuthEvent::TokenRefreshed {
            user_id: identity.user_id,
        });
        Ok(issued)
    }

    /// Revokes every session token of a user.
    pub fn sign_out_everywhere(&self, user_id: &str) -> Result<usize> {
        let revoked = self.store.delete_user_tokens(user_id)?;
        if revoked > 0 {
            self.emit(AuthEvent::SignedOut {
                user_id: user_id.to_string(),
            });
        }
        Ok(revoked)
    }

    /// Changes a profile role and notifies session holders.
    pub fn set_role(&self, user_id: &str, role: Role) -> Result<()> {
        self.store.update_profile_role(user_id, role)?;
        self.emit(AuthEvent::ProfileChanged {
            user_id: user_id.to_string(),
        });
        Ok(())
    }

    /// Validates a raw token against the store.
    pub fn authenticate(&self, raw_token: &str) -> Result<Identity> {
        let (lookup, _secret) = parse_token(raw_token)?;

        let token = self
            .store
            .get_token_by_lookup(&lookup)?
            .ok_or(Error::Unauthorized)?;

        if !self.tokens.verify(raw_token, &token.token_hash)? {
            return Err(Error::Unauthorized);
        }

        if let Some(expires_at) = &token.expires_at {
            if expires_at < &Utc::now() {
                return Err(Error::TokenExpired);
            }
        }

        if let Err(e) = self.store.update_token_last_used(&token.id) {
            tracing::warn!("Failed to update token last_used_at: {e}");
        }

        Ok(Identity {
            user_id: token.user_id,
            token_id: token.id,
        })
    }

    fn issue_token(&self, user_id: &str) -> Result<IssuedToken> {
        let expires_at = self.token_ttl.map(|ttl| Utc::now() + ttl);

        for _ in 0..MAX_TOKEN_RETRIES {
            let (raw_token, lookup, hash) = self.tokens.generate()?;
            let token = Token {
                id: Uuid::new_v4().to_string(),
                token_hash: hash,
                token_lookup: lookup,
                user_id: user_id.to_string(),
                created_at: Utc::now(),
                expires_at,
                last_used_at: None,
            };

            match self.store.create_token(&token) {
                Ok(()) => {
                    return Ok(IssuedToken {
                        token: raw_token,
                        user_id: user_id.to_string(),
                        expires_at,
                    });
                }
                Err(Error::TokenLookupCollision) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(Error::TokenLookupCollision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn service() -> AuthService {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        AuthService::new(Arc::new(store), None)
    }

    #[test]
    fn test_sign_up_creates_user_profile() {
        let auth = service();
        let profile = auth.sign_up("Ana@Example.com", "Sup3r-secret").unwrap();

        assert_eq!(profile.username, "ana@example.com");
        assert_eq!(profile.role, Role::User);
    }

    #[test]
    fn test_sign_up_rejects_weak_password_and_duplicates() {
        let auth = service();
        assert!(matches!(
            auth.sign_up("ana@example.com", "weak"),
            Err(Error::Validation(_))
        ));

        auth.sign_up("ana@example.com", "Sup3r-secret").unwrap();
        assert!(matches!(
            auth.sign_up("ana@example.com", "Sup3r-secret"),
            Err(Error::AlreadyExists)
        ));
    }

    #[test]
    fn test_sign_in_and_authenticate() {
        let auth = service();
        let profile = auth.sign_up("ana@example.com", "Sup3r-secret").unwrap();

        assert!(matches!(
            auth.sign_in("ana@example.com", "wrong-Passw0rd"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            auth.sign_in("nobody@example.com", "Sup3r-secret"),
            Err(Error::InvalidCredentials)
        ));

        let issued = auth.sign_in("ana@example.com", "Sup3r-secret").unwrap();
        let identity = auth.authenticate(&issued.token).unwrap();
        assert_eq!(identity.user_id, profile.id);
    }

    #[test]
    fn test_sign_out_revokes_token_and_emits_event() {
        let auth = service();
        auth.sign_up("ana@example.com", "Sup3r-secret").unwrap();
        let mut events = auth.subscribe();

        let issued = auth.sign_in("ana@example.com", "Sup3r-secret").unwrap();
        auth.sign_out(&issued.token).unwrap();

        assert!(matches!(events.try_recv(), Ok(AuthEvent::SignedIn { .. })));
        assert!(matches!(events.try_recv(), Ok(AuthEvent::SignedOut { .. })));
        assert!(matches!(
            auth.authenticate(&issued.token),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn test_refresh_replaces_token() {
        let auth = service();
        auth.sign_up("ana@example.com", "Sup3r-secret").unwrap();
        let first = auth.sign_in("ana@example.com", "Sup3r-secret").unwrap();

        let second = auth.refresh(&first.token).unwrap();
        assert_ne!(first.token, second.token);
        assert!(auth.authenticate(&first.token).is_err());
        assert!(auth.authenticate(&second.token).is_ok());
    }

    #[test]
    fn test_sign_out_everywhere() {
        let auth = service();
        let profile = auth.sign_up("ana@example.com", "Sup3r-secret").unwrap();
        let first = auth.sign_in("ana@example.com", "Sup3r-secret").unwrap();
        let second = auth.sign_in("ana@example.com", "Sup3r-secret").unwrap();

        assert_eq!(auth.sign_out_everywhere(&profile.id).unwrap(), 2);
        assert!(auth.authenticate(&first.token).is_err());
        assert!(auth.authenticate(&second.token).is_err());
        assert_eq!(auth.sign_out_everywhere(&profile.id).unwrap(), 0);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        let auth = AuthService::new(Arc::new(store), Some(Duration::seconds(-1)));
        auth.sign_up("ana@example.com", "Sup3r-secret").unwrap();

        let issued = auth.sign_in("ana@example.com", "Sup3r-secret").unwrap();
        assert!(matches!(
            auth.authenticate(&issued.token),
            Err(Error::TokenExpired)
        ));
    }

    #[test]
    fn test_malformed_token() {
        let auth = service();
        assert!(matches!(
            auth.authenticate("not-a-token"),
            Err(Error::InvalidTokenFormat)
        ));
    }
}
