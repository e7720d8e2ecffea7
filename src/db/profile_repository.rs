// src/db/profile_repository.rs
// DOCUMENTATION: Profile and user database operations
// PURPOSE: Every query touching the profiles and users tables

use crate::errors::VillageError;
use crate::models::{NewProfile, Profile, SignupState};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_ATTEMPTS: usize = 5;

/// Columns selected for Profile, from `profiles p JOIN users u`
pub(crate) const PROFILE_SELECT: &str = r#"
    SELECT
        p.id, p.user_id, p.school_id, p.name, p.phone, p.role,
        p.school_staff, p.code, p.invited_by, p.declined, p.deleted,
        p.state, u.email, u.is_active, p.created_at
    FROM profiles p
    JOIN users u ON u.id = p.user_id
"#;

pub struct ProfileRepository;

impl ProfileRepository {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Profile>, VillageError> {
        let sql = format!("{} WHERE p.id = $1", PROFILE_SELECT);
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(profile)
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Profile, VillageError> {
        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| VillageError::NotFound(format!("profile {}", id)))
    }

    pub async fn find_by_phone(pool: &PgPool, phone: &str) -> Result<Option<Profile>, VillageError> {
        let sql = format!("{} WHERE p.phone = $1", PROFILE_SELECT);
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(phone)
            .fetch_optional(pool)
            .await?;
        Ok(profile)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Profile>, VillageError> {
        let sql = format!("{} WHERE lower(u.email) = lower($1)", PROFILE_SELECT);
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(profile)
    }

    /// Resolve a bearer token to the profile of an active user
    pub async fn find_by_api_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<Profile>, VillageError> {
        let sql = format!("{} WHERE u.api_token = $1 AND u.is_active", PROFILE_SELECT);
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(token)
            .fetch_optional(pool)
            .await?;
        Ok(profile)
    }

    /// Teacher lookup for SMS signup; `code` must already be upper-cased
    pub async fn find_staff_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<Profile>, VillageError> {
        let sql = format!("{} WHERE p.code = $1 AND p.school_staff", PROFILE_SELECT);
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(code)
            .fetch_optional(pool)
            .await?;
        Ok(profile)
    }

    /// Non-deleted school staff of a school
    pub async fn school_staff(pool: &PgPool, school_id: Uuid) -> Result<Vec<Profile>, VillageError> {
        let sql = format!(
            "{} WHERE p.school_id = $1 AND p.school_staff AND NOT p.deleted ORDER BY p.name",
            PROFILE_SELECT
        );
        let staff = sqlx::query_as::<_, Profile>(&sql)
            .bind(school_id)
            .fetch_all(pool)
            .await?;
        Ok(staff)
    }

    /// Create a user and its profile in one transaction
    /// DOCUMENTATION: Staff profiles get a signup code parents can text in
    pub async fn create_with_user(pool: &PgPool, new: &NewProfile) -> Result<Profile, VillageError> {
        let mut tx = pool.begin().await?;
        let profile_id = Self::insert_with_user(&mut *tx, new).await?;
        tx.commit().await?;

        log::info!("Created profile with id: {}", profile_id);
        Self::get_by_id(pool, profile_id).await
    }

    /// Insert a user and its profile on an open transaction; returns the profile id
    pub async fn insert_with_user(
        conn: &mut PgConnection,
        new: &NewProfile,
    ) -> Result<Uuid, VillageError> {
        let api_token = Uuid::new_v4().simple().to_string();
        let user_id: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO users (email, is_active, api_token)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&new.email)
        .bind(new.is_active)
        .bind(&api_token)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            log::error!("Failed to create user: {}", e);
            VillageError::DatabaseError(e.to_string())
        })?;

        let code = if new.school_staff {
            Some(Self::unused_code(&mut *conn).await?)
        } else {
            None
        };
        let state = new.state.unwrap_or(SignupState::Done);

        let profile_id: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO profiles (
                user_id, school_id, name, phone, role, school_staff,
                code, invited_by, state
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(user_id.0)
        .bind(new.school_id)
        .bind(&new.name)
        .bind(&new.phone)
        .bind(&new.role)
        .bind(new.school_staff)
        .bind(&code)
        .bind(new.invited_by)
        .bind(state.as_str())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            log::error!("Failed to create profile: {}", e);
            VillageError::DatabaseError(e.to_string())
        })?;

        Ok(profile_id.0)
    }

    /// A signup code no profile holds yet
    async fn unused_code(conn: &mut PgConnection) -> Result<String, VillageError> {
        for _ in 0..CODE_ATTEMPTS {
            let code = generate_code();
            let taken: (bool,) =
                sqlx::query_as("SELECT EXISTS (SELECT 1 FROM profiles WHERE code = $1)")
                    .bind(&code)
                    .fetch_one(&mut *conn)
                    .await?;
            if !taken.0 {
                return Ok(code);
            }
            log::debug!("Signup code {} already taken, retrying", code);
        }

        log::error!("No free signup code after {} attempts", CODE_ATTEMPTS);
        Err(VillageError::DatabaseError(
            "Could not allocate a signup code".to_string(),
        ))
    }

    pub async fn update_name_and_role(
        pool: &PgPool,
        id: Uuid,
        name: &str,
        role: &str,
    ) -> Result<(), VillageError> {
        sqlx::query("UPDATE profiles SET name = $2, role = $3 WHERE id = $1")
            .bind(id)
            .bind(name)
            .bind(role)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn rename(pool: &PgPool, id: Uuid, name: &str) -> Result<(), VillageError> {
        sqlx::query("UPDATE profiles SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Fill in staff flag and empty role on an existing profile
    pub async fn update_staff_and_role(
        pool: &PgPool,
        id: Uuid,
        school_staff: bool,
        role: &str,
    ) -> Result<(), VillageError> {
        sqlx::query("UPDATE profiles SET school_staff = $2, role = $3 WHERE id = $1")
            .bind(id)
            .bind(school_staff)
            .bind(role)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_state<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        state: SignupState,
    ) -> Result<(), VillageError> {
        sqlx::query("UPDATE profiles SET state = $2 WHERE id = $1")
            .bind(id)
            .bind(state.as_str())
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn set_role_and_state(
        pool: &PgPool,
        id: Uuid,
        role: &str,
        state: SignupState,
    ) -> Result<(), VillageError> {
        sqlx::query("UPDATE profiles SET role = $2, state = $3 WHERE id = $1")
            .bind(id)
            .bind(role)
            .bind(state.as_str())
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_deleted(pool: &PgPool, id: Uuid, deleted: bool) -> Result<(), VillageError> {
        sqlx::query("UPDATE profiles SET deleted = $2 WHERE id = $1")
            .bind(id)
            .bind(deleted)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_active(pool: &PgPool, user_id: Uuid, active: bool) -> Result<(), VillageError> {
        sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(user_id)
            .bind(active)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark a profile as having opted out and deactivate its user
    pub async fn decline(pool: &PgPool, profile: &Profile) -> Result<(), VillageError> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE profiles SET declined = TRUE WHERE id = $1")
            .bind(profile.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
            .bind(profile.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        log::info!("Profile {} declined", profile.id);
        Ok(())
    }
}

/// Six-character signup code from an alphabet without look-alike characters
fn generate_code() -> String {
    Uuid::new_v4().as_bytes()[..6]
        .iter()
        .map(|b| CODE_ALPHABET[*b as usize % CODE_ALPHABET.len()] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), 6);
        assert_eq!(code, code.to_uppercase());
        assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_generate_code_avoids_lookalikes() {
        for _ in 0..200 {
            let code = generate_code();
            assert!(!code.contains(['0', 'O', '1', 'I']));
        }
    }
}
