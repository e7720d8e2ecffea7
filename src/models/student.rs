// src/models/student.rs
// DOCUMENTATION: Student-facing DTOs
// PURPOSE: Requests and responses for village and dashboard endpoints

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ElderResponse, GroupResponse, Profile, ProfileResponse};

/// POST /students and PUT /students/{id}
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StudentRequest {
    #[validate(length(min = 1, max = 255, message = "Please enter the student's name."))]
    pub name: String,

    /// Exact set of direct other-than-me elders
    #[serde(default)]
    pub elders: Vec<Uuid>,

    #[serde(default)]
    pub groups: Vec<Uuid>,
}

/// POST /students/{id}/rename
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenameStudentRequest {
    #[validate(length(min = 1, max = 255, message = "Please enter the student's name."))]
    pub name: String,
}

/// Short student listing
#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    pub id: Uuid,
    pub name: String,
    pub village_uri: String,
}

impl From<&Profile> for StudentSummary {
    fn from(student: &Profile) -> Self {
        StudentSummary {
            id: student.id,
            name: student.name.clone(),
            village_uri: village_uri(student.id),
        }
    }
}

pub fn village_uri(student_id: Uuid) -> String {
    format!("/students/{}", student_id)
}

pub fn edit_student_uri(student_id: Uuid) -> String {
    format!("/students/{}/edit", student_id)
}

/// GET /students/{id}
#[derive(Debug, Clone, Serialize)]
pub struct VillageResponse {
    pub student: StudentSummary,
    /// The caller's role in this village
    pub role: String,
    pub school_staff: bool,
    pub post_char_limit: usize,
    pub elders: Vec<ElderResponse>,
}

/// GET /dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub profile: ProfileResponse,
    pub students: Vec<StudentSummary>,
    pub groups: Vec<GroupResponse>,
}

/// Result of rename/remove on a village
#[derive(Debug, Clone, Serialize)]
pub struct VillageUpdateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
