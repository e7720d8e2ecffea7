// src/services/group_service.rs
// DOCUMENTATION: Teacher-owned groups of students and elders
// PURPOSE: Group CRUD and keeping group-implied relationships in sync

use crate::db::{GroupRepository, ProfileRepository, RelationshipRepository};
use crate::errors::VillageError;
use crate::models::{GroupRequest, GroupResponse, Profile};
use crate::services::events::{GROUP_ADDED, GROUP_EDITED};
use crate::services::formats::required_name;
use crate::services::membership::{
    check_choices, group_pair_diff, group_pairs, release_pairs, SetDiff,
};
use crate::services::notifiers::Notifiers;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

pub const MISSING_GROUP_NAME: &str = "Please enter a name for the group.";

/// Make the group's relationships match its current membership
/// DOCUMENTATION: Every group elder is related to every group student with
/// `from_group_id` set; group relationships no longer implied are removed
/// unless another group still implies them. Existing direct relationships
/// are left as they are.
pub async fn sync_relationships(pool: &PgPool, group_id: Uuid) -> Result<(), VillageError> {
    let elders = GroupRepository::elder_ids(pool, group_id).await?;
    let students = GroupRepository::student_ids(pool, group_id).await?;
    let wanted = group_pairs(&elders, &students);

    let existing = GroupRepository::group_relationship_pairs(pool, group_id).await?;
    let (create, delete) = group_pair_diff(&existing, &wanted);

    for (elder_id, student_id) in &create {
        RelationshipRepository::get_or_create(pool, *elder_id, *student_id, "", Some(group_id))
            .await?;
    }
    release_relationships(pool, group_id, &delete).await?;

    if !create.is_empty() || !delete.is_empty() {
        log::info!(
            "Synced group {}: {} relationships added, {} removed",
            group_id,
            create.len(),
            delete.len()
        );
    }
    Ok(())
}

/// Let go of relationships `group_id` no longer implies
/// DOCUMENTATION: A pair some other group still implies is handed over to
/// that group instead of being deleted.
async fn release_relationships(
    pool: &PgPool,
    group_id: Uuid,
    pairs: &[(Uuid, Uuid)],
) -> Result<(), VillageError> {
    if pairs.is_empty() {
        return Ok(());
    }

    let elsewhere = GroupRepository::pairs_implied_elsewhere(pool, group_id, pairs).await?;
    let (repoint, delete) = release_pairs(pairs, &elsewhere);

    for ((elder_id, student_id), other_group) in &repoint {
        GroupRepository::repoint_group_relationship(pool, group_id, *other_group, *elder_id, *student_id)
            .await?;
    }
    for (elder_id, student_id) in &delete {
        GroupRepository::delete_group_relationship(pool, group_id, *elder_id, *student_id).await?;
    }

    if !repoint.is_empty() {
        log::debug!(
            "Group {}: {} relationships handed to overlapping groups",
            group_id,
            repoint.len()
        );
    }
    Ok(())
}

/// Put a student in exactly the given groups of `owner_id`
pub async fn set_student_groups(
    pool: &PgPool,
    owner_id: Uuid,
    student_id: Uuid,
    groups: &[Uuid],
) -> Result<(), VillageError> {
    let current = GroupRepository::groups_of_student(pool, student_id, owner_id).await?;
    let diff = SetDiff::between(&current, groups);

    for group_id in &diff.add {
        GroupRepository::add_student(pool, *group_id, student_id).await?;
    }
    for group_id in &diff.remove {
        GroupRepository::remove_student(pool, *group_id, student_id).await?;
    }
    for group_id in diff.add.iter().chain(&diff.remove) {
        sync_relationships(pool, *group_id).await?;
    }
    Ok(())
}

/// Put an elder in exactly the given groups of `owner_id`
pub async fn set_elder_groups(
    pool: &PgPool,
    owner_id: Uuid,
    elder_id: Uuid,
    groups: &[Uuid],
) -> Result<(), VillageError> {
    let current = GroupRepository::groups_of_elder(pool, elder_id, owner_id).await?;
    let diff = SetDiff::between(&current, groups);

    for group_id in &diff.add {
        GroupRepository::add_elder(pool, *group_id, elder_id).await?;
    }
    for group_id in &diff.remove {
        GroupRepository::remove_elder(pool, *group_id, elder_id).await?;
    }
    for group_id in diff.add.iter().chain(&diff.remove) {
        sync_relationships(pool, *group_id).await?;
    }
    Ok(())
}

/// Reject members the owner may not put in a group
async fn check_members(pool: &PgPool, owner: &Profile, req: &GroupRequest) -> Result<(), VillageError> {
    let students: Vec<Uuid> = RelationshipRepository::students_of(pool, owner.id)
        .await?
        .iter()
        .map(|s| s.id)
        .collect();
    check_choices("students", &req.students, &students)?;

    let staff: Vec<Uuid> = ProfileRepository::school_staff(pool, owner.school_id)
        .await?
        .iter()
        .map(|p| p.id)
        .collect();
    check_choices("elders", &req.elders, &staff)
}

pub async fn list_groups(pool: &PgPool, owner: &Profile) -> Result<Vec<GroupResponse>, VillageError> {
    let groups = GroupRepository::owned_by(pool, owner.id).await?;
    let mut responses = Vec::with_capacity(groups.len());
    for group in &groups {
        responses.push(GroupRepository::to_response(pool, group).await?);
    }
    Ok(responses)
}

pub async fn add_group(
    pool: &PgPool,
    notifiers: &Notifiers,
    owner: &Profile,
    req: &GroupRequest,
) -> Result<GroupResponse, VillageError> {
    req.validate()?;
    let name = required_name(&req.name, MISSING_GROUP_NAME)?;
    check_members(pool, owner, req).await?;

    let group = GroupRepository::create(pool, owner.id, &name).await?;
    for student_id in &req.students {
        GroupRepository::add_student(pool, group.id, *student_id).await?;
    }
    for elder_id in &req.elders {
        GroupRepository::add_elder(pool, group.id, *elder_id).await?;
    }
    sync_relationships(pool, group.id).await?;

    notifiers.push.group_event(GROUP_ADDED, &group).await;
    GroupRepository::to_response(pool, &group).await
}

pub async fn edit_group(
    pool: &PgPool,
    notifiers: &Notifiers,
    owner: &Profile,
    group_id: Uuid,
    req: &GroupRequest,
) -> Result<GroupResponse, VillageError> {
    let mut group = GroupRepository::get_owned(pool, group_id, owner.id).await?;
    req.validate()?;
    let name = required_name(&req.name, MISSING_GROUP_NAME)?;
    check_members(pool, owner, req).await?;

    if group.name != name {
        GroupRepository::rename(pool, group.id, &name).await?;
        group.name = name;
    }

    let current_students = GroupRepository::student_ids(pool, group.id).await?;
    let students = SetDiff::between(&current_students, &req.students);
    for student_id in &students.add {
        GroupRepository::add_student(pool, group.id, *student_id).await?;
    }
    for student_id in &students.remove {
        GroupRepository::remove_student(pool, group.id, *student_id).await?;
    }

    let current_elders = GroupRepository::elder_ids(pool, group.id).await?;
    let elders = SetDiff::between(&current_elders, &req.elders);
    for elder_id in &elders.add {
        GroupRepository::add_elder(pool, group.id, *elder_id).await?;
    }
    for elder_id in &elders.remove {
        GroupRepository::remove_elder(pool, group.id, *elder_id).await?;
    }

    sync_relationships(pool, group.id).await?;

    notifiers.push.group_event(GROUP_EDITED, &group).await;
    GroupRepository::to_response(pool, &group).await
}

/// Delete an owned group; relationships only it implied go with it
pub async fn delete_group(pool: &PgPool, owner: &Profile, group_id: Uuid) -> Result<(), VillageError> {
    let group = GroupRepository::get_owned(pool, group_id, owner.id).await?;
    let pairs = GroupRepository::group_relationship_pairs(pool, group.id).await?;
    release_relationships(pool, group.id, &pairs).await?;
    GroupRepository::delete(pool, group.id).await
}
