// src/handlers/mod.rs
// DOCUMENTATION: Handlers module organization
// PURPOSE: Re-export handler components

pub mod auth;
pub mod groups;
pub mod health;
pub mod profile;
pub mod pusher;
pub mod sms;
pub mod village;

pub use groups::config as groups_config;
pub use health::config as health_config;
pub use profile::config as profile_config;
pub use pusher::config as pusher_config;
pub use sms::config as sms_config;
pub use village::config as village_config;
