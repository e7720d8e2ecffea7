// src/services/profile_service.rs
// DOCUMENTATION: Editing one's own profile

use crate::db::{ProfileRepository, RelationshipRepository};
use crate::errors::VillageError;
use crate::models::{EditProfileRequest, Profile};
use crate::services::membership::role_rename;
use sqlx::PgPool;
use validator::Validate;

/// Update name and role; village descriptions that repeated the old role follow it
pub async fn edit_profile(
    pool: &PgPool,
    profile: &Profile,
    req: &EditProfileRequest,
) -> Result<Profile, VillageError> {
    req.validate()?;
    let (name, role) = (req.name.trim(), req.role.trim());

    ProfileRepository::update_name_and_role(pool, profile.id, name, role).await?;
    if let Some((old_role, new_role)) = role_rename(&profile.role, role) {
        let updated =
            RelationshipRepository::replace_description(pool, profile.id, &old_role, &new_role).await?;
        log::debug!("Updated {} relationship descriptions for {}", updated, profile.id);
    }

    ProfileRepository::get_by_id(pool, profile.id).await
}
