mod helpers;
mod middleware;
mod password;
mod service;
mod token;

pub use helpers::{HeaderTokenError, extract_bearer_token};
pub use middleware::{AuthError, OptionalViewer, RequireAdmin, RequireViewer};
pub use password::{check_password_policy, hash_password, normalize_email, verify_password};
pub use service::{AuthEvent, AuthService, Identity, IssuedToken};
pub use token::{TOKEN_PREFIX, TokenGenerator, parse_token};
