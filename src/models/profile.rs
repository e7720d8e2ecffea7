// src/models/profile.rs
// DOCUMENTATION: People in the system (elders and students)
// PURPOSE: Profile record joined with its user account, plus profile edit DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Progress of a parent through SMS code signup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignupState {
    /// Waiting for the child's name
    Kidname,
    /// Waiting for the parent's relationship to the child
    Relationship,
    Done,
}

impl SignupState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignupState::Kidname => "kidname",
            SignupState::Relationship => "relationship",
            SignupState::Done => "done",
        }
    }

    /// Unknown values count as finished signups
    pub fn parse(value: &str) -> Self {
        match value {
            "kidname" => SignupState::Kidname,
            "relationship" => SignupState::Relationship,
            _ => SignupState::Done,
        }
    }
}

/// A profile row joined with the owning user's account fields
/// DOCUMENTATION: Maps to `profiles p JOIN users u ON u.id = p.user_id`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub school_id: Uuid,

    /// Display name; may be empty for elders invited by phone or email
    pub name: String,

    /// E.164 mobile number, e.g. "+13216430987"
    pub phone: Option<String>,

    /// Default relationship description, e.g. "Teacher", "Father"
    pub role: String,

    pub school_staff: bool,

    /// Signup code a teacher hands out to parents
    pub code: Option<String>,

    pub invited_by: Option<Uuid>,

    /// Parent texted "stop"
    pub declined: bool,

    /// Soft delete flag (students only)
    pub deleted: bool,

    /// SMS signup state, see SignupState
    pub state: String,

    /// From the users table
    pub email: Option<String>,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn signup_state(&self) -> SignupState {
        SignupState::parse(&self.state)
    }

    /// Best human-readable label: name, then email, then phone
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        self.email
            .clone()
            .or_else(|| self.phone.clone())
            .unwrap_or_default()
    }

    pub fn to_response(&self) -> ProfileResponse {
        ProfileResponse {
            id: self.id,
            name: self.name.clone(),
            role: self.role.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            school_staff: self.school_staff,
            code: self.code.clone(),
        }
    }
}

/// Fields needed to create a profile and its user in one go
#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub school_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub school_staff: bool,
    pub invited_by: Option<Uuid>,
    pub is_active: bool,
    pub state: Option<SignupState>,
}

/// Profile DTO exposed via API
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub school_staff: bool,
    pub code: Option<String>,
}

/// PUT /profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EditProfileRequest {
    #[validate(length(min = 1, max = 255, message = "Please enter a name."))]
    pub name: String,

    #[validate(length(min = 1, max = 200, message = "Please enter a role."))]
    pub role: String,
}
