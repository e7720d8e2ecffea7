// src/models/group.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A teacher-owned set of students and elders
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Group with its memberships loaded
#[derive(Debug, Clone, Serialize)]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub students: Vec<Uuid>,
    pub elders: Vec<Uuid>,
}

/// POST /groups and PUT /groups/{id}
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GroupRequest {
    #[validate(length(min = 1, max = 255, message = "Please enter a group name."))]
    pub name: String,

    #[serde(default)]
    pub students: Vec<Uuid>,

    #[serde(default)]
    pub elders: Vec<Uuid>,
}
