// src/services/events.rs
// DOCUMENTATION: Push events sent to browsers through Pusher
// PURPOSE: Channel naming, event payloads and a trigger that never fails the caller

use crate::models::{edit_student_uri, village_uri, Group, PostJson, Profile};
use crate::services::pusher_client::PusherClient;
use serde_json::{json, Value};
use uuid::Uuid;

pub const MESSAGE_POSTED: &str = "message_posted";
pub const STUDENT_ADDED: &str = "student_added";
pub const STUDENT_EDITED: &str = "student_edited";
pub const GROUP_ADDED: &str = "group_added";
pub const GROUP_EDITED: &str = "group_edited";

/// Private channel of one profile
pub fn channel_for(profile_id: Uuid) -> String {
    format!("private-user_{}", profile_id)
}

/// `message_posted` payload for one recipient
pub fn posted_payload(post: &PostJson, recipient_id: Uuid) -> Value {
    let mut object = serde_json::to_value(post).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut object {
        map.insert(
            "mine".to_string(),
            Value::Bool(post.author_id == Some(recipient_id)),
        );
    }
    json!({ "objects": [object] })
}

pub fn student_payload(student: &Profile) -> Value {
    json!({
        "objects": [{
            "id": student.id,
            "name": student.name,
            "village_uri": village_uri(student.id),
            "edit_student_uri": edit_student_uri(student.id),
            "resource_uri": format!("/api/v1/user/{}", student.id),
        }]
    })
}

pub fn group_payload(group: &Group) -> Value {
    json!({
        "objects": [{
            "id": group.id,
            "name": group.name,
            "resource_uri": format!("/api/v1/group/{}", group.id),
        }]
    })
}

/// Sends push events, or does nothing when Pusher is not configured
pub struct PushNotifier {
    client: Option<PusherClient>,
}

impl PushNotifier {
    pub fn new(client: Option<PusherClient>) -> Self {
        Self { client }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn client(&self) -> Option<&PusherClient> {
        self.client.as_ref()
    }

    /// Trigger an event, logging and swallowing any failure
    pub async fn trigger(&self, channel: &str, event: &str, data: &Value) {
        let Some(client) = &self.client else {
            return;
        };

        if let Err(e) = client.trigger(channel, event, data).await {
            log::warn!("Pusher exception: {}", e);
        }
    }

    /// Tell every elder of a village about a new post
    pub async fn posted_event(&self, post: &PostJson, elder_ids: &[Uuid]) {
        for elder_id in elder_ids {
            let payload = posted_payload(post, *elder_id);
            self.trigger(&channel_for(*elder_id), MESSAGE_POSTED, &payload)
                .await;
        }
    }

    pub async fn student_event(&self, event: &str, student: &Profile, elder_ids: &[Uuid]) {
        let payload = student_payload(student);
        for elder_id in elder_ids {
            self.trigger(&channel_for(*elder_id), event, &payload).await;
        }
    }

    pub async fn group_event(&self, event: &str, group: &Group) {
        let payload = group_payload(group);
        self.trigger(&channel_for(group.owner_id), event, &payload)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::profile;
    use chrono::Utc;

    fn post_json(author_id: Option<Uuid>) -> PostJson {
        PostJson {
            post_id: Uuid::new_v4(),
            author_id,
            student_id: Uuid::new_v4(),
            author: "Ms. Smith".to_string(),
            role: "Teacher".to_string(),
            date: "3/7/2013".to_string(),
            time: "noon".to_string(),
            timestamp: "2013-03-07T12:00:00+00:00".to_string(),
            text: "hi".to_string(),
            sms: false,
            author_sequence_id: None,
        }
    }

    #[test]
    fn test_channel_for() {
        let id = Uuid::new_v4();
        assert_eq!(channel_for(id), format!("private-user_{}", id));
    }

    #[test]
    fn test_posted_payload_marks_own_posts() {
        let author = Uuid::new_v4();
        let post = post_json(Some(author));

        let mine = posted_payload(&post, author);
        assert_eq!(mine["objects"][0]["mine"], json!(true));
        assert_eq!(mine["objects"][0]["author"], json!("Ms. Smith"));

        let theirs = posted_payload(&post, Uuid::new_v4());
        assert_eq!(theirs["objects"][0]["mine"], json!(false));
    }

    #[test]
    fn test_automated_post_is_nobodys() {
        let post = post_json(None);
        let payload = posted_payload(&post, Uuid::new_v4());
        assert_eq!(payload["objects"][0]["mine"], json!(false));
    }

    #[test]
    fn test_student_payload() {
        let student = profile("Johnny");
        let payload = student_payload(&student);
        let object = &payload["objects"][0];

        assert_eq!(object["name"], json!("Johnny"));
        assert_eq!(object["village_uri"], json!(format!("/students/{}", student.id)));
        assert_eq!(
            object["edit_student_uri"],
            json!(format!("/students/{}/edit", student.id))
        );
        assert_eq!(
            object["resource_uri"],
            json!(format!("/api/v1/user/{}", student.id))
        );
    }

    #[test]
    fn test_group_payload() {
        let group = Group {
            id: Uuid::new_v4(),
            name: "Math".to_string(),
            owner_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        let payload = group_payload(&group);

        assert_eq!(payload["objects"][0]["name"], json!("Math"));
        assert_eq!(
            payload["objects"][0]["resource_uri"],
            json!(format!("/api/v1/group/{}", group.id))
        );
    }

    #[tokio::test]
    async fn test_trigger_swallows_errors() {
        let client = PusherClient::new("1".into(), "key".into(), "secret".into(), "")
            .with_base_url("http://127.0.0.1:9");
        let notifier = PushNotifier::new(Some(client));

        // returns without panicking even though nothing is listening
        notifier.trigger("private-user_x", "event", &json!({})).await;
    }

    #[test]
    fn test_disabled_notifier_is_noop() {
        let notifier = PushNotifier::disabled();
        assert!(notifier.client().is_none());
        tokio_test::block_on(notifier.posted_event(&post_json(None), &[Uuid::new_v4()]));
    }
}
