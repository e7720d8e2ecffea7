// src/models/post.rs
// DOCUMENTATION: Village chat posts
// PURPOSE: Post record, its JSON rendering and the new-post DTO

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Profile;

/// Longest text a single SMS can carry
pub const SMS_MAX_LENGTH: usize = 160;

/// Number of posts returned in a village backlog
pub const BACKLOG_POSTS: i64 = 100;

/// Author label used for automated replies
pub const AUTOMATED_ROLE: &str = "Portfoliyo";

/// A post row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    /// None for automated SMS replies
    pub author_id: Option<Uuid>,
    /// The student in whose village this was posted
    pub student_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// The text as entered
    pub original_text: String,
    /// Escaped text with highlights wrapped in <b> and newlines as <br>
    pub html_text: String,
    pub from_sms: bool,
    pub to_sms: bool,
}

/// Flags controlling how a post is created and announced
#[derive(Debug, Clone, Copy)]
pub struct PostOptions {
    pub from_sms: bool,
    pub to_sms: bool,
    /// Text highlighted elders
    pub notify: bool,
}

impl Default for PostOptions {
    fn default() -> Self {
        PostOptions {
            from_sms: false,
            to_sms: false,
            notify: true,
        }
    }
}

impl PostOptions {
    pub fn from_sms() -> Self {
        PostOptions {
            from_sms: true,
            ..Default::default()
        }
    }

    /// An automated reply that already went out by text
    pub fn automated_reply() -> Self {
        PostOptions {
            from_sms: false,
            to_sms: true,
            notify: false,
        }
    }
}

/// A post with what is needed to render it
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: Post,
    pub author: Option<Profile>,
    /// description_or_role of the author's relationship to the student, if any
    pub relationship_role: Option<String>,
}

/// JSON rendering of a post, as sent to browsers and Pusher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostJson {
    pub post_id: Uuid,
    pub author_id: Option<Uuid>,
    pub student_id: Uuid,
    pub author: String,
    pub role: String,
    pub date: String,
    pub time: String,
    pub timestamp: String,
    pub text: String,
    pub sms: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_sequence_id: Option<String>,
}

impl PostView {
    pub fn to_json(&self, author_sequence_id: Option<&str>) -> PostJson {
        let (author, role) = match &self.author {
            Some(author) => {
                let role = match &self.relationship_role {
                    Some(role) if !role.is_empty() => role.clone(),
                    _ => author.role.clone(),
                };
                (author.display_name(), role)
            }
            None => (String::new(), AUTOMATED_ROLE.to_string()),
        };

        PostJson {
            post_id: self.post.id,
            author_id: self.post.author_id,
            student_id: self.post.student_id,
            author,
            role,
            date: format_date(&self.post.timestamp),
            time: format_time(&self.post.timestamp),
            timestamp: self.post.timestamp.to_rfc3339(),
            text: self.post.html_text.clone(),
            sms: self.post.from_sms || self.post.to_sms,
            author_sequence_id: author_sequence_id.map(|s| s.to_string()),
        }
    }
}

/// "3/7/2013" style date
pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%-m/%-d/%Y").to_string()
}

/// "1:30 p.m." style time, with "noon" and "midnight" special cases
pub fn format_time(timestamp: &DateTime<Utc>) -> String {
    let (hour, minute) = (timestamp.hour(), timestamp.minute());
    match (hour, minute) {
        (0, 0) => return "midnight".to_string(),
        (12, 0) => return "noon".to_string(),
        _ => {}
    }

    let suffix = if hour < 12 { "a.m." } else { "p.m." };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };

    if minute == 0 {
        format!("{} {}", hour12, suffix)
    } else {
        format!("{}:{:02} {}", hour12, minute, suffix)
    }
}

/// Signature appended to a post when it is texted out
pub fn sms_suffix(author_name: &str) -> String {
    format!(" --{}", author_name)
}

/// Max post length for an elder, leaving room for the SMS signature
pub fn post_char_limit(author_name: &str) -> usize {
    SMS_MAX_LENGTH.saturating_sub(sms_suffix(author_name).chars().count())
}

/// POST /students/{id}/posts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub text: String,
    /// Client-side id echoed back so the browser can match its optimistic post
    pub author_sequence_id: Option<String>,
}

/// GET /students/{id}/posts
#[derive(Debug, Clone, Serialize)]
pub struct BacklogResponse {
    pub posts: Vec<PostJson>,
}
