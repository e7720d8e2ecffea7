// src/services/village_service.rs
// DOCUMENTATION: Village access and management
// PURPOSE: Who may see and change a student's village, and the edits staff can make

use crate::db::{GroupRepository, ProfileRepository, RelationshipRepository};
use crate::errors::VillageError;
use crate::models::{
    post_char_limit, DashboardResponse, EditElderRequest, ElderResponse, Membership, NewProfile,
    Profile, RenameStudentRequest, StudentRequest, StudentSummary, VillageElder, VillageResponse,
};
use crate::services::events::{STUDENT_ADDED, STUDENT_EDITED};
use crate::services::formats::required_name;
use crate::services::group_service::{list_groups, set_elder_groups, set_student_groups};
use crate::services::membership::{
    check_choices, editable_students, role_change, RoleChange, SetDiff,
};
use crate::services::notifiers::Notifiers;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// The caller's elder relationship to a non-deleted student
/// DOCUMENTATION: NotFound unless the caller is an elder of the student
pub async fn membership(
    pool: &PgPool,
    student_id: Uuid,
    caller: &Profile,
) -> Result<Membership, VillageError> {
    let membership = RelationshipRepository::get_membership(pool, student_id, caller.id).await?;
    if membership.student.deleted {
        return Err(VillageError::NotFound(format!("village {}", student_id)));
    }
    Ok(membership)
}

pub const MISSING_STUDENT_NAME: &str = "Please enter the student's name.";

pub fn require_staff(profile: &Profile) -> Result<(), VillageError> {
    if profile.school_staff {
        Ok(())
    } else {
        Err(VillageError::Forbidden)
    }
}

/// Caller's membership, requiring school staff
pub async fn staff_membership(
    pool: &PgPool,
    student_id: Uuid,
    caller: &Profile,
) -> Result<Membership, VillageError> {
    let membership = membership(pool, student_id, caller).await?;
    require_staff(caller)?;
    Ok(membership)
}

pub async fn village_view(pool: &PgPool, membership: &Membership) -> Result<VillageResponse, VillageError> {
    let elders = RelationshipRepository::village_elders(pool, membership.student.id).await?;

    Ok(VillageResponse {
        student: StudentSummary::from(&membership.student),
        role: membership.description_or_role(),
        school_staff: membership.elder.school_staff,
        post_char_limit: post_char_limit(&membership.elder.display_name()),
        elders: elders.iter().map(|e| e.to_response()).collect(),
    })
}

pub async fn rename_student(
    pool: &PgPool,
    membership: &Membership,
    req: &RenameStudentRequest,
) -> Result<String, VillageError> {
    req.validate()?;
    let name = required_name(&req.name, MISSING_STUDENT_NAME)?;

    ProfileRepository::rename(pool, membership.student.id, &name).await?;
    log::info!("Renamed student {} to {}", membership.student.id, name);
    Ok(name)
}

pub async fn remove_student(pool: &PgPool, membership: &Membership) -> Result<(), VillageError> {
    ProfileRepository::set_deleted(pool, membership.student.id, true).await?;
    log::info!(
        "Student {} removed by {}",
        membership.student.id,
        membership.elder.id
    );
    Ok(())
}

/// Reject elders and groups the caller may not assign to a student
async fn check_student_choices(
    pool: &PgPool,
    caller: &Profile,
    req: &StudentRequest,
) -> Result<(), VillageError> {
    let staff: Vec<Uuid> = ProfileRepository::school_staff(pool, caller.school_id)
        .await?
        .iter()
        .map(|p| p.id)
        .collect();
    check_choices("elders", &req.elders, &staff)?;

    let groups = GroupRepository::owned_ids(pool, caller.id, &req.groups).await?;
    check_choices("groups", &req.groups, &groups)
}

/// Give a student exactly these direct elders besides the caller
async fn set_direct_elders(
    pool: &PgPool,
    caller: &Profile,
    student_id: Uuid,
    elders: &[Uuid],
) -> Result<(), VillageError> {
    let current = RelationshipRepository::direct_other_elder_ids(pool, student_id, caller.id).await?;
    let diff = SetDiff::between(&current, elders);

    if !diff.remove.is_empty() {
        RelationshipRepository::delete_for_student(pool, student_id, &diff.remove).await?;
    }
    for elder_id in &diff.add {
        RelationshipRepository::get_or_create(pool, *elder_id, student_id, "", None).await?;
    }
    Ok(())
}

async fn elder_ids(pool: &PgPool, student_id: Uuid) -> Result<Vec<Uuid>, VillageError> {
    Ok(RelationshipRepository::village_elders(pool, student_id)
        .await?
        .iter()
        .map(|e| e.profile.id)
        .collect())
}

/// Create a student in the caller's school with the caller as elder
pub async fn add_student(
    pool: &PgPool,
    notifiers: &Notifiers,
    caller: &Profile,
    req: &StudentRequest,
) -> Result<StudentSummary, VillageError> {
    require_staff(caller)?;
    req.validate()?;
    let name = required_name(&req.name, MISSING_STUDENT_NAME)?;
    check_student_choices(pool, caller, req).await?;

    let student = ProfileRepository::create_with_user(
        pool,
        &NewProfile {
            school_id: caller.school_id,
            name,
            invited_by: Some(caller.id),
            ..Default::default()
        },
    )
    .await?;

    RelationshipRepository::get_or_create(pool, caller.id, student.id, "", None).await?;
    set_direct_elders(pool, caller, student.id, &req.elders).await?;
    set_student_groups(pool, caller.id, student.id, &req.groups).await?;

    let elders = elder_ids(pool, student.id).await?;
    notifiers
        .push
        .student_event(STUDENT_ADDED, &student, &elders)
        .await;

    Ok(StudentSummary::from(&student))
}

pub async fn edit_student(
    pool: &PgPool,
    notifiers: &Notifiers,
    membership: &Membership,
    req: &StudentRequest,
) -> Result<StudentSummary, VillageError> {
    let caller = &membership.elder;
    req.validate()?;
    let name = required_name(&req.name, MISSING_STUDENT_NAME)?;
    check_student_choices(pool, caller, req).await?;

    let student_id = membership.student.id;
    ProfileRepository::rename(pool, student_id, &name).await?;
    set_direct_elders(pool, caller, student_id, &req.elders).await?;
    set_student_groups(pool, caller.id, student_id, &req.groups).await?;

    let student = ProfileRepository::get_by_id(pool, student_id).await?;
    let elders = elder_ids(pool, student_id).await?;
    notifiers
        .push
        .student_event(STUDENT_EDITED, &student, &elders)
        .await;

    Ok(StudentSummary::from(&student))
}

/// Edit a non-staff elder in the context of one village
pub async fn edit_elder(
    pool: &PgPool,
    membership: &Membership,
    elder_id: Uuid,
    req: &EditElderRequest,
) -> Result<ElderResponse, VillageError> {
    let editor = &membership.elder;
    let student_id = membership.student.id;

    let target = RelationshipRepository::get_membership(pool, student_id, elder_id).await?;
    if target.elder.school_staff {
        return Err(VillageError::NotFound(format!("elder {}", elder_id)));
    }
    req.validate()?;

    let editor_students: Vec<Uuid> = RelationshipRepository::students_of(pool, editor.id)
        .await?
        .iter()
        .map(|s| s.id)
        .collect();
    check_choices("students", &req.students, &editor_students)?;
    let groups = GroupRepository::owned_ids(pool, editor.id, &req.groups).await?;
    check_choices("groups", &req.groups, &groups)?;

    let elder = &target.elder;
    match role_change(&elder.role, &target.description_or_role(), &req.role) {
        RoleChange::ProfileRole { old_role, new_role } => {
            ProfileRepository::update_name_and_role(pool, elder.id, &req.name, &new_role).await?;
            RelationshipRepository::replace_description(pool, elder.id, &old_role, "").await?;
        }
        RoleChange::RelationshipDescription { new_role } => {
            ProfileRepository::update_name_and_role(pool, elder.id, &req.name, &elder.role).await?;
            RelationshipRepository::set_description(pool, target.relationship.id, &new_role).await?;
        }
    }

    set_elder_groups(pool, editor.id, elder.id, &req.groups).await?;

    let direct = RelationshipRepository::direct_student_ids(pool, elder.id).await?;
    let current = editable_students(&direct, &editor_students);
    let diff = SetDiff::between(&current, &req.students);
    if !diff.remove.is_empty() {
        RelationshipRepository::delete_for_elder(pool, elder.id, &diff.remove).await?;
    }
    for student in &diff.add {
        RelationshipRepository::get_or_create(pool, elder.id, *student, "", None).await?;
    }

    log::info!("Elder {} edited by {}", elder.id, editor.id);

    let updated = RelationshipRepository::village_elders(pool, student_id)
        .await?
        .into_iter()
        .find(|e| e.profile.id == elder.id);
    match updated {
        Some(elder) => Ok(elder.to_response()),
        // the edit removed the elder from this village
        None => {
            let profile = ProfileRepository::get_by_id(pool, elder.id).await?;
            Ok(VillageElder {
                profile,
                description: String::new(),
                from_group_id: None,
            }
            .to_response())
        }
    }
}

pub async fn dashboard(pool: &PgPool, caller: &Profile) -> Result<DashboardResponse, VillageError> {
    let students = RelationshipRepository::students_of(pool, caller.id).await?;
    let groups = list_groups(pool, caller).await?;

    Ok(DashboardResponse {
        profile: caller.to_response(),
        students: students.iter().map(StudentSummary::from).collect(),
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{profile, teacher};

    #[test]
    fn test_require_staff() {
        assert!(require_staff(&teacher("Ms. Smith", "ABCDEF")).is_ok());
        assert!(matches!(
            require_staff(&profile("Dad")),
            Err(VillageError::Forbidden)
        ));
    }
}
