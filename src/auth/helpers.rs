use axum::http::{HeaderMap, header::AUTHORIZATION};

#[derive(Debug, PartialEq, Eq)]
pub enum HeaderTokenError {
    InvalidScheme,
}

/// Extracts the raw token from a `Bearer` authorization header.
///
/// Returns `Ok(None)` when no header is present and `Err` when the header
/// uses another scheme or carries no token.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<String>, HeaderTokenError> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = header.to_str().map_err(|_| HeaderTokenError::InvalidScheme)?;
    match value.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(Some(token.to_string())),
        _ => Err(HeaderTokenError::InvalidScheme),
    }
}
