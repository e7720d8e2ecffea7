// src/db/relationship_repository.rs
// DOCUMENTATION: Relationship database operations
// PURPOSE: Who belongs to which village, and how they are described there

use crate::db::profile_repository::{ProfileRepository, PROFILE_SELECT};
use crate::errors::VillageError;
use crate::models::{Membership, Profile, Relationship, VillageElder, KIND_ELDER};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

pub struct RelationshipRepository;

impl RelationshipRepository {
    pub async fn find(
        pool: &PgPool,
        elder_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<Relationship>, VillageError> {
        let rel = sqlx::query_as::<_, Relationship>(
            r#"
            SELECT * FROM relationships
            WHERE from_profile_id = $1 AND to_profile_id = $2 AND kind = $3
            "#,
        )
        .bind(elder_id)
        .bind(student_id)
        .bind(KIND_ELDER)
        .fetch_optional(pool)
        .await?;
        Ok(rel)
    }

    /// Elder relationship between a profile and a student, with both ends
    /// DOCUMENTATION: NotFound when the profile is not an elder of the student
    pub async fn get_membership(
        pool: &PgPool,
        student_id: Uuid,
        elder_id: Uuid,
    ) -> Result<Membership, VillageError> {
        let relationship = Self::find(pool, elder_id, student_id)
            .await?
            .ok_or_else(|| VillageError::NotFound(format!("village {}", student_id)))?;

        let elder = ProfileRepository::get_by_id(pool, elder_id).await?;
        let student = ProfileRepository::get_by_id(pool, student_id).await?;

        Ok(Membership {
            relationship,
            elder,
            student,
        })
    }

    /// All non-deleted elders of a student's village
    pub async fn village_elders(
        pool: &PgPool,
        student_id: Uuid,
    ) -> Result<Vec<VillageElder>, VillageError> {
        let sql = r#"
            SELECT
                p.id, p.user_id, p.school_id, p.name, p.phone, p.role,
                p.school_staff, p.code, p.invited_by, p.declined, p.deleted,
                p.state, u.email, u.is_active, p.created_at,
                r.description, r.from_group_id
            FROM relationships r
            JOIN profiles p ON p.id = r.from_profile_id
            JOIN users u ON u.id = p.user_id
            WHERE r.to_profile_id = $1 AND r.kind = $2 AND NOT p.deleted
            ORDER BY p.school_staff DESC, p.name
        "#;

        let elders = sqlx::query_as::<_, VillageElder>(sql)
            .bind(student_id)
            .bind(KIND_ELDER)
            .fetch_all(pool)
            .await
            .map_err(|e| {
                log::error!("Failed to fetch elders of student {}: {}", student_id, e);
                VillageError::DatabaseError(e.to_string())
            })?;

        Ok(elders)
    }

    /// Non-deleted students an elder is related to
    pub async fn students_of(pool: &PgPool, elder_id: Uuid) -> Result<Vec<Profile>, VillageError> {
        let sql = format!(
            r#"{}
            JOIN relationships r ON r.to_profile_id = p.id
            WHERE r.from_profile_id = $1 AND r.kind = $2 AND NOT p.deleted
            ORDER BY p.name
            "#,
            PROFILE_SELECT
        );

        let students = sqlx::query_as::<_, Profile>(&sql)
            .bind(elder_id)
            .bind(KIND_ELDER)
            .fetch_all(pool)
            .await?;
        Ok(students)
    }

    /// Non-deleted students of an elder with exactly this name
    pub async fn students_of_named(
        pool: &PgPool,
        elder_id: Uuid,
        name: &str,
    ) -> Result<Vec<Profile>, VillageError> {
        let sql = format!(
            r#"{}
            JOIN relationships r ON r.to_profile_id = p.id
            WHERE r.from_profile_id = $1 AND r.kind = $2 AND NOT p.deleted AND p.name = $3
            ORDER BY p.created_at
            "#,
            PROFILE_SELECT
        );

        let students = sqlx::query_as::<_, Profile>(&sql)
            .bind(elder_id)
            .bind(KIND_ELDER)
            .bind(name)
            .fetch_all(pool)
            .await?;
        Ok(students)
    }

    /// Students related to an elder directly (not through a group)
    pub async fn direct_student_ids(pool: &PgPool, elder_id: Uuid) -> Result<Vec<Uuid>, VillageError> {
        let ids: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT r.to_profile_id
            FROM relationships r
            JOIN profiles s ON s.id = r.to_profile_id
            WHERE r.from_profile_id = $1 AND r.from_group_id IS NULL AND NOT s.deleted
            "#,
        )
        .bind(elder_id)
        .fetch_all(pool)
        .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Direct (non-group) elders of a student other than `exclude`
    pub async fn direct_other_elder_ids(
        pool: &PgPool,
        student_id: Uuid,
        exclude: Uuid,
    ) -> Result<Vec<Uuid>, VillageError> {
        let ids: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT r.from_profile_id
            FROM relationships r
            JOIN profiles e ON e.id = r.from_profile_id
            WHERE r.to_profile_id = $1
              AND r.from_group_id IS NULL
              AND r.from_profile_id <> $2
              AND NOT e.deleted
            "#,
        )
        .bind(student_id)
        .bind(exclude)
        .fetch_all(pool)
        .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Create an elder relationship unless one already exists
    /// DOCUMENTATION: Returns the relationship and whether it was created
    pub async fn get_or_create(
        pool: &PgPool,
        elder_id: Uuid,
        student_id: Uuid,
        description: &str,
        from_group_id: Option<Uuid>,
    ) -> Result<(Relationship, bool), VillageError> {
        let inserted = sqlx::query_as::<_, Relationship>(
            r#"
            INSERT INTO relationships (from_profile_id, to_profile_id, kind, description, from_group_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (from_profile_id, to_profile_id, kind) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(elder_id)
        .bind(student_id)
        .bind(KIND_ELDER)
        .bind(description)
        .bind(from_group_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            log::error!("Failed to create relationship: {}", e);
            VillageError::DatabaseError(e.to_string())
        })?;

        if let Some(rel) = inserted {
            log::debug!("Related elder {} to student {}", elder_id, student_id);
            return Ok((rel, true));
        }

        let mut existing = Self::find(pool, elder_id, student_id)
            .await?
            .ok_or_else(|| VillageError::NotFound(format!("relationship {}->{}", elder_id, student_id)))?;

        // A direct link outlives the group that first created it
        if from_group_id.is_none() && existing.from_group_id.is_some() {
            sqlx::query("UPDATE relationships SET from_group_id = NULL WHERE id = $1")
                .bind(existing.id)
                .execute(pool)
                .await?;
            existing.from_group_id = None;
        }

        Ok((existing, false))
    }

    /// Direct elder relationship inside a larger unit of work; an existing
    /// group link becomes direct
    pub async fn link_direct<'e>(
        executor: impl PgExecutor<'e>,
        elder_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), VillageError> {
        sqlx::query(
            r#"
            INSERT INTO relationships (from_profile_id, to_profile_id, kind)
            VALUES ($1, $2, $3)
            ON CONFLICT (from_profile_id, to_profile_id, kind)
            DO UPDATE SET from_group_id = NULL
            "#,
        )
        .bind(elder_id)
        .bind(student_id)
        .bind(KIND_ELDER)
        .execute(executor)
        .await
        .map_err(|e| {
            log::error!("Failed to link elder {} to {}: {}", elder_id, student_id, e);
            VillageError::DatabaseError(e.to_string())
        })?;
        Ok(())
    }

    /// Remove an elder's relationships to the given students
    pub async fn delete_for_elder(
        pool: &PgPool,
        elder_id: Uuid,
        student_ids: &[Uuid],
    ) -> Result<u64, VillageError> {
        let result = sqlx::query(
            "DELETE FROM relationships WHERE from_profile_id = $1 AND to_profile_id = ANY($2)",
        )
        .bind(elder_id)
        .bind(student_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Remove a student's relationships to the given elders
    pub async fn delete_for_student(
        pool: &PgPool,
        student_id: Uuid,
        elder_ids: &[Uuid],
    ) -> Result<u64, VillageError> {
        let result = sqlx::query(
            "DELETE FROM relationships WHERE to_profile_id = $1 AND from_profile_id = ANY($2)",
        )
        .bind(student_id)
        .bind(elder_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_description(
        pool: &PgPool,
        relationship_id: Uuid,
        description: &str,
    ) -> Result<(), VillageError> {
        sqlx::query("UPDATE relationships SET description = $2 WHERE id = $1")
            .bind(relationship_id)
            .bind(description)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Rewrite an elder's relationship descriptions equal to `old`
    pub async fn replace_description(
        pool: &PgPool,
        elder_id: Uuid,
        old: &str,
        new: &str,
    ) -> Result<u64, VillageError> {
        let result = sqlx::query(
            "UPDATE relationships SET description = $3 WHERE from_profile_id = $1 AND description = $2",
        )
        .bind(elder_id)
        .bind(old)
        .bind(new)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
