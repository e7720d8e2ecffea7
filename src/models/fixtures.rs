// src/models/fixtures.rs
// Test builders shared across modules

use chrono::Utc;
use uuid::Uuid;

use super::{Profile, VillageElder};

pub fn profile(name: &str) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        school_id: Uuid::nil(),
        name: name.to_string(),
        phone: None,
        role: String::new(),
        school_staff: false,
        code: None,
        invited_by: None,
        declined: false,
        deleted: false,
        state: "done".to_string(),
        email: None,
        is_active: true,
        created_at: Utc::now(),
    }
}

pub fn teacher(name: &str, code: &str) -> Profile {
    let mut p = profile(name);
    p.school_staff = true;
    p.role = "Teacher".to_string();
    p.code = Some(code.to_string());
    p
}

pub fn elder(profile: Profile, description: &str) -> VillageElder {
    VillageElder {
        profile,
        description: description.to_string(),
        from_group_id: None,
    }
}
