// src/models/relationship.rs
// DOCUMENTATION: Elder -> student links
// PURPOSE: Relationship record, village membership context and elder DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::Profile;

pub const KIND_ELDER: &str = "elder";

/// A relationship row
/// DOCUMENTATION: `from_profile_id` is the elder, `to_profile_id` the student
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Relationship {
    pub id: Uuid,
    pub from_profile_id: Uuid,
    pub to_profile_id: Uuid,
    pub kind: String,

    /// Overrides the elder's profile role inside this village when non-empty
    pub description: String,

    /// Set when the relationship exists because of group membership
    pub from_group_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

/// An elder relationship with both ends loaded
#[derive(Debug, Clone)]
pub struct Membership {
    pub relationship: Relationship,
    pub elder: Profile,
    pub student: Profile,
}

impl Membership {
    pub fn description_or_role(&self) -> String {
        description_or_role(&self.relationship.description, &self.elder.role)
    }
}

pub fn description_or_role(description: &str, role: &str) -> String {
    if description.is_empty() {
        role.to_string()
    } else {
        description.to_string()
    }
}

/// An elder of a village together with their relationship description
#[derive(Debug, Clone, FromRow)]
pub struct VillageElder {
    #[sqlx(flatten)]
    pub profile: Profile,
    pub description: String,
    pub from_group_id: Option<Uuid>,
}

impl VillageElder {
    pub fn description_or_role(&self) -> String {
        description_or_role(&self.description, &self.profile.role)
    }

    pub fn to_response(&self) -> ElderResponse {
        ElderResponse {
            id: self.profile.id,
            name: self.profile.display_name(),
            role: self.description_or_role(),
            email: self.profile.email.clone(),
            phone: self.profile.phone.clone(),
            school_staff: self.profile.school_staff,
            declined: self.profile.declined,
        }
    }
}

/// Elder DTO exposed in the village view
#[derive(Debug, Clone, Serialize)]
pub struct ElderResponse {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub school_staff: bool,
    pub declined: bool,
}

/// One invitee in POST /students/{id}/invite
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InviteElderRequest {
    /// Email address or US mobile number
    #[validate(length(min = 1, max = 255, message = "Please supply an email or phone."))]
    pub contact: String,

    /// e.g. "Mother", "Math Teacher"
    #[validate(length(min = 1, max = 200, message = "Please describe the relationship."))]
    pub relationship: String,

    #[serde(default)]
    pub school_staff: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteEldersRequest {
    pub elders: Vec<InviteElderRequest>,
}

/// PUT /students/{id}/elders/{elder_id}
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EditElderRequest {
    #[validate(length(max = 255, message = "Ensure the name has at most 255 characters."))]
    #[serde(default)]
    pub name: String,

    #[validate(length(min = 1, max = 200, message = "Please enter a role."))]
    pub role: String,

    #[serde(default)]
    pub groups: Vec<Uuid>,

    /// Exact set of direct (non-group) students for this elder
    #[serde(default)]
    pub students: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::profile;

    #[test]
    fn test_description_or_role() {
        assert_eq!(description_or_role("", "Teacher"), "Teacher");
        assert_eq!(description_or_role("Math Teacher", "Teacher"), "Math Teacher");
    }

    #[test]
    fn test_elder_response_uses_relationship_description() {
        let mut elder = profile("");
        elder.role = "Parent".to_string();
        elder.phone = Some("+13216430987".to_string());

        let village_elder = VillageElder {
            profile: elder,
            description: "Father".to_string(),
            from_group_id: None,
        };
        let response = village_elder.to_response();

        assert_eq!(response.role, "Father");
        assert_eq!(response.name, "+13216430987");
    }

    #[test]
    fn test_invite_relationship_length() {
        let req = InviteElderRequest {
            contact: "dad@example.com".to_string(),
            relationship: "x".repeat(201),
            school_staff: false,
        };
        assert!(req.validate().is_err());
    }
}
