use url::Url;

use crate::error::{Error, Result};

const MAX_TITLE_LEN: usize = 200;
const MAX_URL_LEN: usize = 2048;
const MAX_DESCRIPTION_LEN: usize = 1000;
const MAX_CATEGORY_NAME_LEN: usize = 64;

fn required(value: &str, field: &str, max_len: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty")));
    }
    if value.chars().count() > max_len {
        return Err(Error::validation(format!(
            "{field} cannot exceed {max_len} characters"
        )));
    }
    Ok(value.to_string())
}

pub fn validate_title(title: &str) -> Result<String> {
    required(title, "Title", MAX_TITLE_LEN)
}

/// Bookmarks must be absolute http(s) links with a host. Returns the
/// normalized form.
pub fn validate_url(url: &str) -> Result<String> {
    let url = required(url, "URL", MAX_URL_LEN)?;
    let invalid = || Error::validation("URL must be an absolute http:// or https:// link");

    let parsed = Url::parse(&url).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid());
    }

    let normalized = parsed.as_str();
    if normalized.chars().count() > MAX_URL_LEN {
        return Err(Error::validation(format!(
            "URL cannot exceed {MAX_URL_LEN} characters"
        )));
    }
    Ok(normalized.to_string())
}

/// Trims the description; blank input is stored as no description.
pub fn normalize_description(description: Option<&str>) -> Result<Option<String>> {
    match description.map(str::trim) {
        None | Some("") => Ok(None),
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => Err(Error::validation(format!(
            "Description cannot exceed {MAX_DESCRIPTION_LEN} characters"
        ))),
        Some(d) => Ok(Some(d.to_string())),
    }
}

/// Blank category ids mean "no category".
pub fn normalize_category_id(category_id: Option<&str>) -> Option<String> {
    category_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

pub fn validate_category_name(name: &str) -> Result<String> {
    required(name, "Category name", MAX_CATEGORY_NAME_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields_are_trimmed() {
        assert_eq!(validate_title("  Rust book ").unwrap(), "Rust book");
        assert!(validate_title("   ").is_err());
        assert_eq!(validate_category_name(" Frontend ").unwrap(), "Frontend");
        assert!(validate_category_name("").is_err());
        assert!(validate_category_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_url() {
        assert_eq!(
            validate_url(" https://doc.rust-lang.org/book/ ").unwrap(),
            "https://doc.rust-lang.org/book/"
        );
        assert_eq!(
            validate_url("HTTP://Example.COM").unwrap(),
            "http://example.com/"
        );
        assert!(validate_url("http://localhost:3000").is_ok());
        assert!(validate_url("").is_err());
        assert!(validate_url("doc.rust-lang.org").is_err());
        assert!(validate_url("https://").is_err());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("https://exa mple.com").is_err());
    }

    #[test]
    fn test_validate_url_rejects_malformed_hosts() {
        for url in [
            "https://?",
            "https://:",
            "http://#frag",
            "https://exa<mple>.com",
            "https://[::1",
            "mailto:dev@example.com",
        ] {
            assert!(validate_url(url).is_err(), "{url} should be rejected");
        }
        assert!(validate_url(&format!("https://example.com/{}", "a".repeat(2048))).is_err());
    }

    #[test]
    fn test_optional_fields() {
        assert_eq!(normalize_description(Some("   ")).unwrap(), None);
        assert_eq!(normalize_description(Some(" hi ")).unwrap().as_deref(), Some("hi"));
        assert_eq!(normalize_category_id(Some("")), None);
        assert_eq!(normalize_category_id(Some(" c1 ")).as_deref(), Some("c1"));
    }
}
