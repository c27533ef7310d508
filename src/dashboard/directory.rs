use super::session::Viewer;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Profile, RoleFilter};

/// Lists profiles for the admin user directory, ordered by username.
pub fn list_users(store: &dyn Store, viewer: &Viewer, filter: RoleFilter) -> Result<Vec<Profile>> {
    let profile = viewer.profile().ok_or(Error::Unauthorized)?;
    if !profile.role.is_admin() {
        return Err(Error::forbidden("only administrators can list users"));
    }

    let mut profiles = store.list_profiles()?;
    profiles.retain(|p| filter.matches(p.role));
    Ok(profiles)
}
