use super::credentials::load_credentials;
use super::http_client::ApiClient;
use super::pickers::format_relative_time;
use crate::types::{Profile, RoleFilter};

pub fn run_user_list(role: String, json: bool) -> anyhow::Result<()> {
    if RoleFilter::parse(&role).is_none() {
        anyhow::bail!("--role must be one of: all, admin, user");
    }

    let client = ApiClient::from_credentials(&load_credentials()?)?;
    let profiles: Vec<Profile> = client.get_query("/admin/users", &[("role", role.as_str())])?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    if profiles.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!();
    for profile in profiles {
        println!(
            "  {:<6} {}  joined {}",
            profile.role.as_str(),
            profile.username,
            format_relative_time(&profile.created_at)
        );
    }
    println!();

    Ok(())
}
