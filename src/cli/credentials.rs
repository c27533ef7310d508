use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub server_url: String,
    pub token: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CredentialsFile {
    pub default: Option<Credentials>,
}

/// `DEVMARKS_CONFIG_DIR` overrides the platform config directory.
pub fn credentials_path() -> anyhow::Result<PathBuf> {
    if let Some(dir) = std::env::var_os("DEVMARKS_CONFIG_DIR") {
        return Ok(PathBuf::from(dir).join("credentials.toml"));
    }

    let dirs = ProjectDirs::from("", "", "devmarks")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory. Is $HOME set?"))?;
    Ok(dirs.config_dir().join("credentials.toml"))
}

/// Stored credentials, or `None` when not logged in.
pub fn try_load_credentials() -> anyhow::Result<Option<Credentials>> {
    let path = credentials_path()?;
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let file: CredentialsFile = toml::from_str(&content)?;
    Ok(file.default)
}

pub fn load_credentials() -> anyhow::Result<Credentials> {
    try_load_credentials()?
        .ok_or_else(|| anyhow::anyhow!("Not logged in. Run 'devmarks auth login' first."))
}

pub fn save_credentials(creds: &Credentials) -> anyhow::Result<()> {
    let path = credentials_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = CredentialsFile {
        default: Some(creds.clone()),
    };
    let content = toml::to_string_pretty(&file)?;
    fs::write(&path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Returns `false` when there was nothing to delete.
pub fn delete_credentials() -> anyhow::Result<bool> {
    let path = credentials_path()?;
    match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
