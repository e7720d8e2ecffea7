// src/services/invite_service.rs
// DOCUMENTATION: Inviting elders into a village
// PURPOSE: Match or create the invited profile, relate it to the student, send the invite

use crate::db::{ProfileRepository, RelationshipRepository};
use crate::errors::VillageError;
use crate::models::{village_uri, InviteElderRequest, Membership, NewProfile, Profile};
use crate::services::formats::{parse_contact, Contact};
use crate::services::notifiers::Notifiers;
use sqlx::PgPool;
use validator::Validate;

/// Staff flag and role to store on an already existing invitee, if anything changes
/// DOCUMENTATION: Invites never revoke staff status or overwrite a role
pub fn fill_existing(profile: &Profile, school_staff: bool, relationship: &str) -> Option<(bool, String)> {
    let make_staff = school_staff && !profile.school_staff;
    let fill_role = !relationship.is_empty() && profile.role.is_empty();
    if !make_staff && !fill_role {
        return None;
    }

    let role = if fill_role {
        relationship.to_string()
    } else {
        profile.role.clone()
    };
    Some((profile.school_staff || school_staff, role))
}

pub fn invite_email_subject(inviter: &Profile) -> String {
    format!("{} invited you to Portfoliyo", inviter.display_name())
}

pub fn invite_email_body(inviter: &Profile, student: &Profile, site_url: &str) -> String {
    format!(
        "Hi!\n\n\
         {inviter} has invited you to join {student}'s Portfoliyo Village, \
         where you can chat with {student}'s teachers and family.\n\n\
         Join here: {site}{uri}\n",
        inviter = inviter.display_name(),
        student = student.name,
        site = site_url.trim_end_matches('/'),
        uri = village_uri(student.id),
    )
}

pub fn invite_sms(inviter: &Profile, student: &Profile) -> String {
    format!(
        "{} invited you to {}'s Portfoliyo Village. Text this number any time to talk with {}'s teachers. Reply \"stop\" to opt out.",
        inviter.display_name(),
        student.name,
        student.name
    )
}

/// Invite one elder into the caller's village
/// DOCUMENTATION: Returns the invited profile and whether it was newly created
pub async fn invite_elder(
    pool: &PgPool,
    notifiers: &Notifiers,
    site_url: &str,
    membership: &Membership,
    req: &InviteElderRequest,
) -> Result<(Profile, bool), VillageError> {
    req.validate()?;
    let contact = parse_contact(&req.contact)?;
    let relationship = req.relationship.trim();

    let existing = match &contact {
        Contact::Email(email) => ProfileRepository::find_by_email(pool, email).await?,
        Contact::Phone(phone) => ProfileRepository::find_by_phone(pool, phone).await?,
    };

    let (profile, created) = match existing {
        Some(profile) => {
            if let Some((school_staff, role)) = fill_existing(&profile, req.school_staff, relationship) {
                ProfileRepository::update_staff_and_role(pool, profile.id, school_staff, &role).await?;
            }
            (profile, false)
        }
        None => {
            let (email, phone, is_active) = match &contact {
                Contact::Email(email) => (Some(email.clone()), None, false),
                Contact::Phone(phone) => (None, Some(phone.clone()), true),
            };
            let profile = ProfileRepository::create_with_user(
                pool,
                &NewProfile {
                    school_id: membership.student.school_id,
                    email,
                    phone,
                    role: relationship.to_string(),
                    school_staff: req.school_staff,
                    invited_by: Some(membership.elder.id),
                    is_active,
                    ..Default::default()
                },
            )
            .await?;
            (profile, true)
        }
    };

    RelationshipRepository::get_or_create(pool, profile.id, membership.student.id, relationship, None)
        .await?;

    if created {
        let (inviter, student) = (&membership.elder, &membership.student);
        match &contact {
            Contact::Email(email) => {
                notifiers
                    .send_email(
                        email,
                        &invite_email_subject(inviter),
                        &invite_email_body(inviter, student, site_url),
                    )
                    .await
            }
            Contact::Phone(phone) => notifiers.send_sms(phone, &invite_sms(inviter, student)).await,
        }
        log::info!("Invited {} to village {}", profile.id, student.id);
    }

    Ok((profile, created))
}

/// Invite several elders, stopping at the first invalid one
pub async fn invite_elders(
    pool: &PgPool,
    notifiers: &Notifiers,
    site_url: &str,
    membership: &Membership,
    invites: &[InviteElderRequest],
) -> Result<Vec<Profile>, VillageError> {
    // reject the whole batch before anything is sent
    for invite in invites {
        invite.validate()?;
        parse_contact(&invite.contact)?;
    }

    let mut invited = Vec::with_capacity(invites.len());
    for invite in invites {
        let (profile, _) = invite_elder(pool, notifiers, site_url, membership, invite).await?;
        invited.push(profile);
    }
    Ok(invited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{profile, teacher};

    #[test]
    fn test_fill_existing_leaves_complete_profiles_alone() {
        let mut p = profile("Dad");
        p.role = "Father".to_string();
        assert_eq!(fill_existing(&p, false, "Dad"), None);
    }

    #[test]
    fn test_fill_existing_fills_empty_role() {
        let p = profile("Dad");
        assert_eq!(
            fill_existing(&p, false, "Father"),
            Some((false, "Father".to_string()))
        );
    }

    #[test]
    fn test_fill_existing_promotes_to_staff_keeping_role() {
        let mut p = profile("Mr. Jones");
        p.role = "Aide".to_string();
        assert_eq!(
            fill_existing(&p, true, "Math Teacher"),
            Some((true, "Aide".to_string()))
        );
    }

    #[test]
    fn test_invite_texts() {
        let inviter = teacher("Ms. Smith", "ABCDEF");
        let student = profile("Jimmy Doe");

        assert_eq!(invite_email_subject(&inviter), "Ms. Smith invited you to Portfoliyo");

        let body = invite_email_body(&inviter, &student, "https://example.com/");
        assert!(body.contains("Ms. Smith has invited you to join Jimmy Doe's Portfoliyo Village"));
        assert!(body.contains(&format!("https://example.com/students/{}", student.id)));

        let sms = invite_sms(&inviter, &student);
        assert!(sms.starts_with("Ms. Smith invited you to Jimmy Doe's Portfoliyo Village."));
        assert!(sms.len() <= 160);
    }
}
