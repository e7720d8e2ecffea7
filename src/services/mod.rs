// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Village logic and outbound integrations

pub mod email_client;
pub mod events;
pub mod formats;
pub mod group_service;
pub mod highlight;
pub mod invite_service;
pub mod membership;
pub mod notifiers;
pub mod post_service;
pub mod profile_service;
pub mod pusher_client;
pub mod rate_limit;
pub mod sms_client;
pub mod sms_hook;
pub mod village_service;

pub use events::PushNotifier;
pub use notifiers::Notifiers;
pub use pusher_client::PusherClient;
pub use rate_limit::SmsRateLimiter;
