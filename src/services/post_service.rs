// src/services/post_service.rs
// DOCUMENTATION: Posting into villages
// PURPOSE: Render, persist and fan out posts; render village backlogs

use crate::db::{PostRepository, ProfileRepository, RelationshipRepository};
use crate::errors::VillageError;
use crate::models::{
    sms_suffix, Post, PostJson, PostOptions, PostView, Profile, VillageElder, BACKLOG_POSTS,
};
use crate::services::highlight::{highlight_names, render_post_html};
use crate::services::notifiers::Notifiers;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Phones to text about a post
/// DOCUMENTATION: Highlighted elders with a phone who are active, have not
/// declined and did not write the post
pub fn sms_recipients(
    elders: &[VillageElder],
    highlighted: &HashSet<Uuid>,
    author_id: Option<Uuid>,
) -> Vec<String> {
    elders
        .iter()
        .map(|e| &e.profile)
        .filter(|p| highlighted.contains(&p.id))
        .filter(|p| Some(p.id) != author_id)
        .filter(|p| p.is_active && !p.declined)
        .filter_map(|p| p.phone.clone())
        .collect()
}

/// Build the renderable view of a post from the village's elders
fn post_view(post: Post, elders: &HashMap<Uuid, &VillageElder>, others: &HashMap<Uuid, Profile>) -> PostView {
    let (author, relationship_role) = match post.author_id {
        Some(id) => match elders.get(&id) {
            Some(elder) => (Some(elder.profile.clone()), Some(elder.description_or_role())),
            None => (others.get(&id).cloned(), None),
        },
        None => (None, None),
    };

    PostView {
        post,
        author,
        relationship_role,
    }
}

/// Create a post in a student's village
/// DOCUMENTATION: `author` is None for automated replies. Highlighted elders
/// are texted unless `options.notify` is false; every elder of the village
/// gets a `message_posted` push event.
pub async fn create_post(
    pool: &PgPool,
    notifiers: &Notifiers,
    author: Option<&Profile>,
    student: &Profile,
    text: &str,
    options: PostOptions,
    author_sequence_id: Option<&str>,
) -> Result<PostJson, VillageError> {
    let elders = RelationshipRepository::village_elders(pool, student.id).await?;
    let name_map = highlight_names(&elders);
    let (html_text, highlighted) = render_post_html(text, &name_map);

    let author_id = author.map(|a| a.id);
    let post = PostRepository::create(
        pool,
        author_id,
        student.id,
        text,
        &html_text,
        options.from_sms,
        options.to_sms,
    )
    .await?;

    log::info!(
        "Created post {} in village {} ({} highlights)",
        post.id,
        student.id,
        highlighted.len()
    );

    if options.notify {
        let signature = sms_suffix(&author.map(|a| a.display_name()).unwrap_or_default());
        let sms_text = format!("{}{}", text, signature);
        for phone in sms_recipients(&elders, &highlighted, author_id) {
            notifiers.send_sms(&phone, &sms_text).await;
        }
    }

    let by_id: HashMap<Uuid, &VillageElder> = elders.iter().map(|e| (e.profile.id, e)).collect();
    let mut others = HashMap::new();
    if let Some(author) = author {
        others.insert(author.id, author.clone());
    }
    let json = post_view(post, &by_id, &others).to_json(author_sequence_id);

    let elder_ids: Vec<Uuid> = elders.iter().map(|e| e.profile.id).collect();
    notifiers.push.posted_event(&json, &elder_ids).await;

    Ok(json)
}

/// The latest posts of a village, oldest first
pub async fn backlog(pool: &PgPool, student_id: Uuid) -> Result<Vec<PostJson>, VillageError> {
    let posts = PostRepository::backlog(pool, student_id, BACKLOG_POSTS).await?;
    let elders = RelationshipRepository::village_elders(pool, student_id).await?;
    let by_id: HashMap<Uuid, &VillageElder> = elders.iter().map(|e| (e.profile.id, e)).collect();

    // authors who have since left the village
    let mut others = HashMap::new();
    for author_id in posts.iter().filter_map(|p| p.author_id) {
        if by_id.contains_key(&author_id) || others.contains_key(&author_id) {
            continue;
        }
        if let Some(profile) = ProfileRepository::find_by_id(pool, author_id).await? {
            others.insert(author_id, profile);
        }
    }

    Ok(posts
        .into_iter()
        .map(|post| post_view(post, &by_id, &others).to_json(None))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{elder, profile};
    use chrono::Utc;

    fn parent(name: &str, phone: Option<&str>) -> VillageElder {
        let mut p = profile(name);
        p.phone = phone.map(|s| s.to_string());
        p.role = "Parent".to_string();
        elder(p, "")
    }

    fn post(author_id: Option<Uuid>) -> Post {
        Post {
            id: Uuid::new_v4(),
            author_id,
            student_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            original_text: "hi".to_string(),
            html_text: "hi".to_string(),
            from_sms: false,
            to_sms: false,
        }
    }

    #[test]
    fn test_sms_recipients_only_highlighted_reachable_elders() {
        let texted = parent("A", Some("+13216430987"));
        let no_phone = parent("B", None);
        let mut declined = parent("C", Some("+13216430988"));
        declined.profile.declined = true;
        let mut inactive = parent("D", Some("+13216430989"));
        inactive.profile.is_active = false;
        let not_highlighted = parent("E", Some("+13216430980"));

        let highlighted: HashSet<Uuid> = [&texted, &no_phone, &declined, &inactive]
            .iter()
            .map(|e| e.profile.id)
            .collect();
        let elders = vec![texted, no_phone, declined, inactive, not_highlighted];

        assert_eq!(
            sms_recipients(&elders, &highlighted, None),
            vec!["+13216430987".to_string()]
        );
    }

    #[test]
    fn test_sms_recipients_skips_author() {
        let author = parent("A", Some("+13216430987"));
        let author_id = author.profile.id;
        let highlighted: HashSet<Uuid> = [author_id].into_iter().collect();

        assert!(sms_recipients(&[author], &highlighted, Some(author_id)).is_empty());
    }

    #[test]
    fn test_post_view_uses_village_role() {
        let mut teacher = profile("Ms. Smith");
        teacher.role = "Teacher".to_string();
        let teacher = elder(teacher, "Math Teacher");
        let by_id: HashMap<Uuid, &VillageElder> = [(teacher.profile.id, &teacher)].into_iter().collect();

        let json = post_view(post(Some(teacher.profile.id)), &by_id, &HashMap::new()).to_json(None);
        assert_eq!(json.author, "Ms. Smith");
        assert_eq!(json.role, "Math Teacher");
    }

    #[test]
    fn test_post_view_for_departed_author() {
        let mut gone = profile("Old Teacher");
        gone.role = "Teacher".to_string();
        let others: HashMap<Uuid, Profile> = [(gone.id, gone.clone())].into_iter().collect();

        let json = post_view(post(Some(gone.id)), &HashMap::new(), &others).to_json(None);
        assert_eq!(json.author, "Old Teacher");
        assert_eq!(json.role, "Teacher");
    }

    #[test]
    fn test_post_view_automated() {
        let json = post_view(post(None), &HashMap::new(), &HashMap::new()).to_json(None);
        assert_eq!(json.author, "");
        assert_eq!(json.role, "Portfoliyo");
    }
}
