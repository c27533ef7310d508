use inquire::{Password, PasswordDisplayMode, Text};
use serde::Serialize;

use super::credentials::{Credentials, delete_credentials, save_credentials, try_load_credentials};
use super::http_client::{ApiClient, normalize_server_url};
use crate::server::dto::LoginResponse;
use crate::types::Profile;

#[derive(Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
}

fn required_text(value: Option<String>, flag: &str, prompt: &str, non_interactive: bool) -> anyhow::Result<String> {
    match value {
        Some(v) if v.trim().is_empty() => anyhow::bail!("{flag} cannot be empty"),
        Some(v) => Ok(v),
        None if non_interactive => anyhow::bail!("{flag} is required in non-interactive mode"),
        None => Ok(Text::new(prompt)
            .with_validator(|input: &str| {
                if input.trim().is_empty() {
                    Ok(inquire::validator::Validation::Invalid("A value is required".into()))
                } else {
                    Ok(inquire::validator::Validation::Valid)
                }
            })
            .prompt()?),
    }
}

fn password(value: Option<String>, non_interactive: bool, confirm: bool) -> anyhow::Result<String> {
    match value {
        Some(p) => Ok(p),
        None if non_interactive => anyhow::bail!("--password is required in non-interactive mode"),
        None => {
            let prompt = Password::new("Password:").with_display_mode(PasswordDisplayMode::Masked);
            let prompt = if confirm {
                prompt
            } else {
                prompt.without_confirmation()
            };
            Ok(prompt.prompt()?)
        }
    }
}

pub fn run_auth_register(
    server: Option<String>,
    email: Option<String>,
    password_arg: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let server = required_text(server, "--server", "Server URL:", non_interactive)?;
    let email = required_text(email, "--email", "Email:", non_interactive)?;
    let password = password(password_arg, non_interactive, true)?;

    let client = ApiClient::new(&normalize_server_url(&server), None)?;
    let profile: Profile = client
        .post(
            "/auth/register",
            &CredentialsRequest {
                email: &email,
                password: &password,
            },
        )?
        .data;

    println!();
    println!("Registered {} on {}", profile.username, client.base_url());
    println!("Run 'devmarks auth login' to sign in.");
    println!();

    Ok(())
}

pub fn run_auth_login(
    server: Option<String>,
    email: Option<String>,
    password_arg: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let server = required_text(server, "--server", "Server URL:", non_interactive)?;
    let email = required_text(email, "--email", "Email:", non_interactive)?;
    let password = password(password_arg, non_interactive, false)?;

    let server_url = normalize_server_url(&server);
    let client = ApiClient::new(&server_url, None)?;
    let login: LoginResponse = client
        .post(
            "/auth/login",
            &CredentialsRequest {
                email: &email,
                password: &password,
            },
        )?
        .data;

    save_credentials(&Credentials {
        server_url: server_url.clone(),
        token: login.token,
    })?;

    println!();
    println!(
        "Logged in to {} as {} ({})",
        server_url, login.profile.username, login.profile.role
    );
    println!();

    Ok(())
}

pub fn run_auth_logout() -> anyhow::Result<()> {
    if let Some(creds) = try_load_credentials()? {
        let client = ApiClient::from_credentials(&creds)?;
        if let Err(e) = client.post_empty("/auth/logout") {
            tracing::warn!("Could not revoke session on {}: {e}", creds.server_url);
        }
    }

    if delete_credentials()? {
        println!();
        println!("Logged out successfully.");
        println!();
    } else {
        println!();
        println!("No credentials found.");
        println!();
    }
    Ok(())
}
