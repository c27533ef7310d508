use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{Error, Result};

const MIN_PASSWORD_LEN: usize = 8;

/// A sign-up password rule and the message shown when it fails.
struct Rule {
    label: &'static str,
    test: fn(&str) -> bool,
}

fn long_enough(pw: &str) -> bool {
    pw.chars().count() >= MIN_PASSWORD_LEN
}

fn has_uppercase(pw: &str) -> bool {
    pw.chars().any(|c| c.is_ascii_uppercase())
}

fn has_digit(pw: &str) -> bool {
    pw.chars().any(|c| c.is_ascii_digit())
}

fn has_symbol(pw: &str) -> bool {
    pw.chars().any(|c| !c.is_ascii_alphanumeric())
}

const RULES: &[Rule] = &[
    Rule { label: "at least 8 characters", test: long_enough },
    Rule { label: "an uppercase letter", test: has_uppercase },
    Rule { label: "a number", test: has_digit },
    Rule { label: "a symbol", test: has_symbol },
];

/// Checks a sign-up password, listing every rule it misses.
pub fn check_password_policy(password: &str) -> Result<()> {
    let missing: Vec<&str> = RULES
        .iter()
        .filter(|rule| !(rule.test)(password))
        .map(|rule| rule.label)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "password must contain {}",
            missing.join(", ")
        )))
    }
}

/// Normalizes an email address, rejecting obviously malformed input.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(Error::validation("email is required"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(Error::validation("email address is not valid")),
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Config(format!("failed to hash password: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| Error::Config(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Config(format!("failed to verify password: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_accepts_strong_password() {
        assert!(check_password_policy("Sup3r-secret").is_ok());
    }

    #[test]
    fn test_policy_lists_missing_rules() {
        let err = check_password_policy("short").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("at least 8 characters"));
        assert!(message.contains("an uppercase letter"));
        assert!(message.contains("a number"));
        assert!(message.contains("a symbol"));

        let err = check_password_policy("Longenough1").unwrap_err();
        assert!(err.to_string().ends_with("a symbol"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana@Example.com ").unwrap(), "ana@example.com");
        assert!(normalize_email("").is_err());
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("Sup3r-secret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Sup3r-secret", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }
}
