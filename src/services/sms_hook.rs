// src/services/sms_hook.rs
// DOCUMENTATION: Inbound SMS handling
// PURPOSE: Route texts from parents: code signup, opt-out, activation and relay into the village
//
// Routing is decided by `route`, a pure function over the sender's profile,
// the teacher code lookup and the number of villages the sender belongs to.
// `receive_sms` loads that context, applies the route and returns the reply.

use crate::db::{ProfileRepository, RelationshipRepository};
use crate::errors::VillageError;
use crate::models::{NewProfile, PostOptions, Profile, SignupState};
use crate::services::highlight::escape_html;
use crate::services::notifiers::Notifiers;
use crate::services::post_service::create_post;
use sqlx::PgPool;

pub const UNKNOWN_CODE: &str = "Bummer, we don't recognize your invite code! \
Please make sure it's typed exactly as it is on the paper, \
followed by a space and then your name.";

pub const MISSING_NAME: &str = "Please include your name after the code.";

pub const ASK_RELATIONSHIP: &str =
    "Last question: what is your relationship to that child (mother, father, ...)?";

pub const DECLINED: &str = "No problem! Sorry to have bothered you.";

pub const NO_STUDENTS: &str = "You're not part of any student's Portfoliyo Village, \
so we're not able to deliver your message. Sorry!";

pub const MULTIPLE_STUDENTS: &str = "You're part of more than one student's Portfoliyo Village; \
we're not yet able to route your texts. We'll fix that soon!";

pub fn ask_student_name(teacher_name: &str) -> String {
    format!(
        "Thanks! What is the name of your child in {}'s class?",
        teacher_name
    )
}

pub fn signup_done(student_name: &str) -> String {
    format!(
        "All done, thank you! You can text this number any time to talk with {}'s teachers.",
        student_name
    )
}

pub fn activated(student_name: &str) -> String {
    format!(
        "Thank you! You can text this number any time to talk with {}'s teachers.",
        student_name
    )
}

/// Automated reply as it appears in the village chat
pub fn tag(phone: &str, reply: &str) -> String {
    format!("@{} {}", phone, reply)
}

/// Split "abcdef John Doe" into ("ABCDEF", "John Doe")
pub fn split_code(body: &str) -> (String, String) {
    let body = body.trim();
    match body.split_once(char::is_whitespace) {
        Some((code, rest)) => (code.to_uppercase(), rest.trim().to_string()),
        None => (body.to_uppercase(), String::new()),
    }
}

/// What to do with an inbound text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmsRoute {
    /// Unknown sender without a valid teacher code
    UnknownCode,
    /// Valid teacher code but no name after it
    MissingName,
    /// Create a parent profile with this name
    Signup { name: String },
    /// Signup step two: the body is the child's name
    StudentName,
    /// Signup step three: the body is the parent's relationship to the child
    Role,
    Decline,
    NoStudents,
    MultipleStudents,
    Activate,
    Relay,
}

/// Decide how to handle a text
/// DOCUMENTATION: `teacher` and `name` come from the code lookup and only
/// matter for unknown senders. `student_count` counts the sender's villages.
pub fn route(
    sender: Option<&Profile>,
    teacher: Option<&Profile>,
    name: &str,
    student_count: usize,
    body: &str,
) -> SmsRoute {
    let Some(sender) = sender else {
        return match teacher {
            None => SmsRoute::UnknownCode,
            Some(_) if name.is_empty() => SmsRoute::MissingName,
            Some(_) => SmsRoute::Signup {
                name: name.to_string(),
            },
        };
    };

    match sender.signup_state() {
        SignupState::Kidname if sender.invited_by.is_some() => return SmsRoute::StudentName,
        SignupState::Relationship => return SmsRoute::Role,
        _ => {}
    }

    if body.trim().eq_ignore_ascii_case("stop") {
        return SmsRoute::Decline;
    }

    match student_count {
        0 => SmsRoute::NoStudents,
        1 if !sender.is_active => SmsRoute::Activate,
        1 => SmsRoute::Relay,
        _ => SmsRoute::MultipleStudents,
    }
}

/// Teacher whose code starts the text, and the name following it
pub async fn teacher_and_name(
    pool: &PgPool,
    body: &str,
) -> Result<(Option<Profile>, String), VillageError> {
    let (code, name) = split_code(body);
    if code.is_empty() {
        return Ok((None, String::new()));
    }

    match ProfileRepository::find_staff_by_code(pool, &code).await? {
        Some(teacher) => Ok((Some(teacher), name)),
        None => Ok((None, String::new())),
    }
}

/// Post the sender's text and then the automated reply into a village
async fn post_exchange(
    pool: &PgPool,
    notifiers: &Notifiers,
    sender: &Profile,
    student: &Profile,
    body: &str,
    reply: Option<&str>,
) -> Result<(), VillageError> {
    create_post(
        pool,
        notifiers,
        Some(sender),
        student,
        body,
        PostOptions::from_sms(),
        None,
    )
    .await?;

    if let Some(reply) = reply {
        let phone = sender.phone.as_deref().unwrap_or_default();
        create_post(
            pool,
            notifiers,
            None,
            student,
            &tag(phone, reply),
            PostOptions::automated_reply(),
            None,
        )
        .await?;
    }

    Ok(())
}

fn only_student(students: &[Profile]) -> Result<&Profile, VillageError> {
    match students {
        [student] => Ok(student),
        _ => Err(VillageError::InvalidInput("Expected exactly one village".to_string())),
    }
}

/// Handle a text from `phone`; returns the reply to send back, if any
pub async fn receive_sms(
    pool: &PgPool,
    notifiers: &Notifiers,
    phone: &str,
    body: &str,
) -> Result<Option<String>, VillageError> {
    let body = body.trim();
    let sender = ProfileRepository::find_by_phone(pool, phone).await?;

    let (teacher, name) = match sender {
        None => teacher_and_name(pool, body).await?,
        Some(_) => (None, String::new()),
    };
    let students = match &sender {
        Some(sender) => RelationshipRepository::students_of(pool, sender.id).await?,
        None => Vec::new(),
    };

    let action = route(sender.as_ref(), teacher.as_ref(), &name, students.len(), body);
    log::info!("SMS from {} routed as {:?}", phone, action);

    let reply = match (action, sender, teacher) {
        (SmsRoute::UnknownCode, _, _) => UNKNOWN_CODE.to_string(),
        (SmsRoute::MissingName, _, _) => MISSING_NAME.to_string(),

        (SmsRoute::Signup { name }, _, Some(teacher)) => {
            let parent = ProfileRepository::create_with_user(
                pool,
                &NewProfile {
                    school_id: teacher.school_id,
                    name,
                    phone: Some(phone.to_string()),
                    invited_by: Some(teacher.id),
                    is_active: true,
                    state: Some(SignupState::Kidname),
                    ..Default::default()
                },
            )
            .await?;
            log::info!("Parent {} signed up with {}'s code", parent.id, teacher.id);
            ask_student_name(&teacher.name)
        }

        (SmsRoute::StudentName, Some(parent), _) => {
            let teacher_id = parent
                .invited_by
                .ok_or_else(|| VillageError::InvalidInput("Signup has no inviting teacher".to_string()))?;
            let teacher = ProfileRepository::get_by_id(pool, teacher_id).await?;

            let existing = RelationshipRepository::students_of_named(pool, teacher.id, body).await?;

            let mut tx = pool.begin().await?;
            let student_id = match existing.first() {
                Some(student) => student.id,
                None => {
                    let student_id = ProfileRepository::insert_with_user(
                        &mut *tx,
                        &NewProfile {
                            school_id: teacher.school_id,
                            name: body.to_string(),
                            invited_by: Some(teacher.id),
                            ..Default::default()
                        },
                    )
                    .await?;
                    RelationshipRepository::link_direct(&mut *tx, teacher.id, student_id).await?;
                    student_id
                }
            };
            RelationshipRepository::link_direct(&mut *tx, parent.id, student_id).await?;
            ProfileRepository::set_state(&mut *tx, parent.id, SignupState::Relationship).await?;
            tx.commit().await?;

            let student = ProfileRepository::get_by_id(pool, student_id).await?;
            let reply = ASK_RELATIONSHIP.to_string();
            post_exchange(pool, notifiers, &parent, &student, body, Some(&reply)).await?;
            reply
        }

        (SmsRoute::Role, Some(parent), _) => {
            ProfileRepository::set_role_and_state(pool, parent.id, body, SignupState::Done).await?;
            RelationshipRepository::replace_description(pool, parent.id, "", body).await?;

            match students.first() {
                Some(student) => {
                    let parent = ProfileRepository::get_by_id(pool, parent.id).await?;
                    let reply = signup_done(&student.name);
                    post_exchange(pool, notifiers, &parent, student, body, Some(&reply)).await?;
                    reply
                }
                None => NO_STUDENTS.to_string(),
            }
        }

        (SmsRoute::Decline, Some(profile), _) => {
            ProfileRepository::decline(pool, &profile).await?;
            let reply = DECLINED.to_string();
            if let [student] = students.as_slice() {
                post_exchange(pool, notifiers, &profile, student, body, Some(&reply)).await?;
            }
            reply
        }

        (SmsRoute::NoStudents, _, _) => NO_STUDENTS.to_string(),
        (SmsRoute::MultipleStudents, _, _) => MULTIPLE_STUDENTS.to_string(),

        (SmsRoute::Activate, Some(profile), _) => {
            let student = only_student(&students)?;
            ProfileRepository::set_active(pool, profile.user_id, true).await?;
            let reply = activated(&student.name);
            post_exchange(pool, notifiers, &profile, student, body, Some(&reply)).await?;
            reply
        }

        (SmsRoute::Relay, Some(profile), _) => {
            let student = only_student(&students)?;
            post_exchange(pool, notifiers, &profile, student, body, None).await?;
            return Ok(None);
        }

        (action, _, _) => {
            log::error!("Inconsistent SMS route {:?} for {}", action, phone);
            return Err(VillageError::InvalidInput("Unable to route text".to_string()));
        }
    };

    Ok(Some(reply))
}

/// TwiML document answering the webhook
pub fn twiml(reply: Option<&str>) -> String {
    match reply {
        Some(reply) => format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Sms>{}</Sms></Response>"#,
            escape_html(reply)
        ),
        None => r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{profile, teacher};
    use uuid::Uuid;

    fn parent(state: SignupState) -> Profile {
        let mut p = profile("John Doe");
        p.phone = Some("+13216430987".to_string());
        p.state = state.as_str().to_string();
        p.invited_by = Some(Uuid::new_v4());
        p
    }

    #[test]
    fn test_split_code() {
        assert_eq!(split_code("abcdef John Doe"), ("ABCDEF".to_string(), "John Doe".to_string()));
        assert_eq!(split_code("ABCDEF"), ("ABCDEF".to_string(), String::new()));
        assert_eq!(split_code("  abc   Jane  "), ("ABC".to_string(), "Jane".to_string()));
        assert_eq!(split_code(""), (String::new(), String::new()));
    }

    #[test]
    fn test_unknown_sender() {
        let jane = teacher("Teacher Jane", "ABCDEF");

        assert_eq!(route(None, None, "", 0, "foo"), SmsRoute::UnknownCode);
        assert_eq!(route(None, Some(&jane), "", 0, "ABCDEF"), SmsRoute::MissingName);
        assert_eq!(
            route(None, Some(&jane), "John Doe", 0, "abcdef John Doe"),
            SmsRoute::Signup {
                name: "John Doe".to_string()
            }
        );
    }

    #[test]
    fn test_signup_steps_take_precedence() {
        let kid = parent(SignupState::Kidname);
        assert_eq!(route(Some(&kid), None, "", 0, "Jimmy Doe"), SmsRoute::StudentName);
        assert_eq!(route(Some(&kid), None, "", 0, "stop"), SmsRoute::StudentName);

        let rel = parent(SignupState::Relationship);
        assert_eq!(route(Some(&rel), None, "", 1, "father"), SmsRoute::Role);
    }

    #[test]
    fn test_kidname_without_inviter_is_ordinary() {
        let mut p = parent(SignupState::Kidname);
        p.invited_by = None;
        assert_eq!(route(Some(&p), None, "", 1, "hello"), SmsRoute::Relay);
    }

    #[test]
    fn test_stop_declines_regardless_of_villages() {
        let mut p = parent(SignupState::Done);
        assert_eq!(route(Some(&p), None, "", 1, "stop"), SmsRoute::Decline);
        assert_eq!(route(Some(&p), None, "", 0, "STOP"), SmsRoute::Decline);
        p.is_active = false;
        assert_eq!(route(Some(&p), None, "", 2, " Stop "), SmsRoute::Decline);
    }

    #[test]
    fn test_village_count_routing() {
        let mut p = parent(SignupState::Done);
        assert_eq!(route(Some(&p), None, "", 0, "foo"), SmsRoute::NoStudents);
        assert_eq!(route(Some(&p), None, "", 2, "foo"), SmsRoute::MultipleStudents);
        assert_eq!(route(Some(&p), None, "", 1, "foo"), SmsRoute::Relay);

        p.is_active = false;
        assert_eq!(route(Some(&p), None, "", 1, "foo"), SmsRoute::Activate);
    }

    #[test]
    fn test_reply_texts() {
        assert_eq!(
            ask_student_name("Teacher Jane"),
            "Thanks! What is the name of your child in Teacher Jane's class?"
        );
        assert_eq!(
            signup_done("Jimmy Doe"),
            "All done, thank you! You can text this number any time to talk with Jimmy Doe's teachers."
        );
        assert_eq!(
            activated("Jimmy Doe"),
            "Thank you! You can text this number any time to talk with Jimmy Doe's teachers."
        );
        assert_eq!(
            UNKNOWN_CODE,
            "Bummer, we don't recognize your invite code! Please make sure it's typed exactly \
             as it is on the paper, followed by a space and then your name."
        );
        assert_eq!(
            NO_STUDENTS,
            "You're not part of any student's Portfoliyo Village, so we're not able to deliver \
             your message. Sorry!"
        );
        assert_eq!(MISSING_NAME, "Please include your name after the code.");
        assert_eq!(
            ASK_RELATIONSHIP,
            "Last question: what is your relationship to that child (mother, father, ...)?"
        );
        assert_eq!(DECLINED, "No problem! Sorry to have bothered you.");
        assert_eq!(
            MULTIPLE_STUDENTS,
            "You're part of more than one student's Portfoliyo Village; we're not yet able to \
             route your texts. We'll fix that soon!"
        );
    }

    #[test]
    fn test_tag() {
        assert_eq!(tag("+13216430987", "Thanks!"), "@+13216430987 Thanks!");
    }

    #[test]
    fn test_twiml() {
        assert_eq!(
            twiml(Some("You're in & done")),
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Sms>You&#39;re in &amp; done</Sms></Response>"#
        );
        assert_eq!(
            twiml(None),
            r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#
        );
    }
}
