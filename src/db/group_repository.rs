// src/db/group_repository.rs
// DOCUMENTATION: Group database operations
// PURPOSE: Groups, their memberships and the relationships they imply

use crate::errors::VillageError;
use crate::models::{Group, GroupResponse, KIND_ELDER};
use sqlx::PgPool;
use std::collections::BTreeMap;
use uuid::Uuid;

pub struct GroupRepository;

impl GroupRepository {
    pub async fn create(pool: &PgPool, owner_id: Uuid, name: &str) -> Result<Group, VillageError> {
        let group = sqlx::query_as::<_, Group>(
            "INSERT INTO groups (name, owner_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(owner_id)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            log::error!("Failed to create group: {}", e);
            VillageError::DatabaseError(e.to_string())
        })?;

        log::info!("Created group {} for owner {}", group.id, owner_id);
        Ok(group)
    }

    pub async fn rename(pool: &PgPool, id: Uuid, name: &str) -> Result<(), VillageError> {
        sqlx::query("UPDATE groups SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Group owned by `owner_id`, else NotFound
    pub async fn get_owned(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<Group, VillageError> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| VillageError::NotFound(format!("group {}", id)))
    }

    pub async fn owned_by(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Group>, VillageError> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT * FROM groups WHERE owner_id = $1 ORDER BY name",
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await?;
        Ok(groups)
    }

    /// Ids among `ids` that are groups owned by `owner_id`
    pub async fn owned_ids(
        pool: &PgPool,
        owner_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Uuid>, VillageError> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM groups WHERE owner_id = $1 AND id = ANY($2)")
                .bind(owner_id)
                .bind(ids)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), VillageError> {
        sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        log::info!("Deleted group {}", id);
        Ok(())
    }

    pub async fn student_ids(pool: &PgPool, group_id: Uuid) -> Result<Vec<Uuid>, VillageError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT gs.student_id FROM group_students gs
            JOIN profiles p ON p.id = gs.student_id
            WHERE gs.group_id = $1 AND NOT p.deleted
            "#,
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn elder_ids(pool: &PgPool, group_id: Uuid) -> Result<Vec<Uuid>, VillageError> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT elder_id FROM group_elders WHERE group_id = $1")
                .bind(group_id)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Groups (owned by `owner_id`) a student belongs to
    pub async fn groups_of_student(
        pool: &PgPool,
        student_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Vec<Uuid>, VillageError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT gs.group_id FROM group_students gs
            JOIN groups g ON g.id = gs.group_id
            WHERE gs.student_id = $1 AND g.owner_id = $2
            "#,
        )
        .bind(student_id)
        .bind(owner_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Groups (owned by `owner_id`) an elder belongs to
    pub async fn groups_of_elder(
        pool: &PgPool,
        elder_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Vec<Uuid>, VillageError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT ge.group_id FROM group_elders ge
            JOIN groups g ON g.id = ge.group_id
            WHERE ge.elder_id = $1 AND g.owner_id = $2
            "#,
        )
        .bind(elder_id)
        .bind(owner_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn add_student(pool: &PgPool, group_id: Uuid, student_id: Uuid) -> Result<(), VillageError> {
        sqlx::query(
            "INSERT INTO group_students (group_id, student_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(group_id)
        .bind(student_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn remove_student(pool: &PgPool, group_id: Uuid, student_id: Uuid) -> Result<(), VillageError> {
        sqlx::query("DELETE FROM group_students WHERE group_id = $1 AND student_id = $2")
            .bind(group_id)
            .bind(student_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn add_elder(pool: &PgPool, group_id: Uuid, elder_id: Uuid) -> Result<(), VillageError> {
        sqlx::query(
            "INSERT INTO group_elders (group_id, elder_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(group_id)
        .bind(elder_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn remove_elder(pool: &PgPool, group_id: Uuid, elder_id: Uuid) -> Result<(), VillageError> {
        sqlx::query("DELETE FROM group_elders WHERE group_id = $1 AND elder_id = $2")
            .bind(group_id)
            .bind(elder_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// (elder, student) pairs currently linked because of this group
    pub async fn group_relationship_pairs(
        pool: &PgPool,
        group_id: Uuid,
    ) -> Result<Vec<(Uuid, Uuid)>, VillageError> {
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT from_profile_id, to_profile_id FROM relationships
            WHERE from_group_id = $1 AND kind = $2
            "#,
        )
        .bind(group_id)
        .bind(KIND_ELDER)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// For each pair, some group other than `group_id` that also implies it
    pub async fn pairs_implied_elsewhere(
        pool: &PgPool,
        group_id: Uuid,
        pairs: &[(Uuid, Uuid)],
    ) -> Result<BTreeMap<(Uuid, Uuid), Uuid>, VillageError> {
        let elders: Vec<Uuid> = pairs.iter().map(|(e, _)| *e).collect();
        let students: Vec<Uuid> = pairs.iter().map(|(_, s)| *s).collect();

        let rows: Vec<(Uuid, Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT DISTINCT ON (ge.elder_id, gs.student_id)
                ge.elder_id, gs.student_id, ge.group_id
            FROM group_elders ge
            JOIN group_students gs ON gs.group_id = ge.group_id
            WHERE ge.group_id <> $1
              AND ge.elder_id = ANY($2)
              AND gs.student_id = ANY($3)
            ORDER BY ge.elder_id, gs.student_id, ge.group_id
            "#,
        )
        .bind(group_id)
        .bind(&elders)
        .bind(&students)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(elder_id, student_id, other)| ((elder_id, student_id), other))
            .collect())
    }

    /// Move a group relationship from one group to another
    pub async fn repoint_group_relationship(
        pool: &PgPool,
        from_group: Uuid,
        to_group: Uuid,
        elder_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), VillageError> {
        sqlx::query(
            r#"
            UPDATE relationships SET from_group_id = $2
            WHERE from_group_id = $1 AND from_profile_id = $3 AND to_profile_id = $4
            "#,
        )
        .bind(from_group)
        .bind(to_group)
        .bind(elder_id)
        .bind(student_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete_group_relationship(
        pool: &PgPool,
        group_id: Uuid,
        elder_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), VillageError> {
        sqlx::query(
            r#"
            DELETE FROM relationships
            WHERE from_group_id = $1 AND from_profile_id = $2 AND to_profile_id = $3
            "#,
        )
        .bind(group_id)
        .bind(elder_id)
        .bind(student_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Group with memberships, for API responses
    pub async fn to_response(pool: &PgPool, group: &Group) -> Result<GroupResponse, VillageError> {
        Ok(GroupResponse {
            id: group.id,
            name: group.name.clone(),
            owner_id: group.owner_id,
            students: Self::student_ids(pool, group.id).await?,
            elders: Self::elder_ids(pool, group.id).await?,
        })
    }
}
