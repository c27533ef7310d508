use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use inquire::{Password, PasswordDisplayMode, Text};

use super::init_store;
use crate::auth::{AuthService, check_password_policy, normalize_email};
use crate::config::{CONFIG_FILE_NAME, ServerConfig};
use crate::error::Error;
use crate::store::{SqliteStore, Store};
use crate::types::{Profile, Role};

fn write_default_config(config: &ServerConfig) -> anyhow::Result<Option<PathBuf>> {
    let path = config.data_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Ok(None);
    }

    let content = format!(
        "# devmarks server configuration. Command-line flags take precedence.\n\
         host = \"{}\"\n\
         port = {}\n\
         # Session lifetime in hours; 0 keeps sessions until sign-out.\n\
         token_ttl_hours = {}\n",
        config.host, config.port, config.token_ttl_hours
    );
    fs::write(&path, content)?;
    Ok(Some(path))
}

pub fn run_admin_init(
    data_dir: String,
    admin_email: Option<String>,
    admin_password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir: data_dir.into(),
        ..ServerConfig::default()
    };
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    if store.has_admin()? {
        bail!(
            "Server already initialized. An administrator exists in {}",
            config.db_path().display()
        );
    }

    let email = if let Some(email) = admin_email {
        email
    } else if non_interactive {
        bail!("--admin-email is required in non-interactive mode");
    } else {
        Text::new("Administrator email:")
            .with_validator(|input: &str| {
                Ok(normalize_email(input)
                    .map(|_| inquire::validator::Validation::Valid)
                    .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.to_string().into())))
            })
            .prompt()?
    };

    let password = if let Some(password) = admin_password {
        password
    } else if non_interactive {
        bail!("--admin-password is required in non-interactive mode");
    } else {
        Password::new("Administrator password:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .with_validator(|input: &str| {
                Ok(check_password_policy(input)
                    .map(|()| inquire::validator::Validation::Valid)
                    .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.to_string().into())))
            })
            .prompt()?
    };

    let store: Arc<dyn Store> = Arc::new(store);
    let auth = AuthService::new(store.clone(), None);

    let profile = match auth.sign_up(&email, &password) {
        Ok(profile) => profile,
        Err(Error::AlreadyExists) => existing_profile(store.as_ref(), &email)?,
        Err(e) => return Err(e.into()),
    };
    auth.set_role(&profile.id, Role::Admin)?;

    let config_file = write_default_config(&config)?;

    println!();
    println!("========================================");
    println!("Initialized {}", config.db_path().display());
    println!("Administrator: {}", profile.username);
    if let Some(path) = config_file {
        println!("Configuration written to: {}", path.display());
    }
    println!("========================================");
    println!();

    Ok(())
}

fn existing_profile(store: &dyn Store, email: &str) -> anyhow::Result<Profile> {
    let email = normalize_email(email)?;
    let account = store
        .get_account_by_email(&email)?
        .ok_or_else(|| anyhow::anyhow!("No account with email {email}"))?;
    store
        .get_profile(&account.id)?
        .ok_or_else(|| anyhow::anyhow!("Account {email} has no profile"))
}

pub fn run_admin_set_role(data_dir: String, email: String, role: Role) -> anyhow::Result<()> {
    let store: Arc<dyn Store> = Arc::new(init_store(&data_dir)?);
    let profile = existing_profile(store.as_ref(), &email)?;

    if profile.role == role {
        println!("{} is already {}", profile.username, role);
        return Ok(());
    }

    if role == Role::User {
        let admins = store
            .list_profiles()?
            .into_iter()
            .filter(|p| p.role.is_admin())
            .count();
        if admins <= 1 {
            bail!("Cannot demote the last administrator");
        }
    }

    let auth = AuthService::new(store, None);
    auth.set_role(&profile.id, role)?;

    // Demoted administrators sign in again with their reduced role.
    let revoked = if role == Role::User {
        auth.sign_out_everywhere(&profile.id)?
    } else {
        0
    };

    println!();
    println!("{} is now {}", profile.username, role);
    if revoked > 0 {
        println!("Revoked {revoked} active session(s).");
    }
    println!();

    Ok(())
}
