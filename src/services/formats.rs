// src/services/formats.rs
// DOCUMENTATION: Contact normalization
// PURPOSE: Turn user-typed phone numbers and emails into canonical forms

use crate::errors::VillageError;

pub const INVALID_CONTACT: &str = "Please supply a valid email address or US mobile number.";

/// A normalized way to reach an invited elder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contact {
    Phone(String),
    Email(String),
}

/// Normalize a US phone number to E.164 ("+13216430987")
/// DOCUMENTATION: Accepts digits with common punctuation; returns None for
/// anything else or for numbers that are not 10 digits (11 with a leading 1)
pub fn normalize_phone(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty()
        || !input
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '(' | ')' | '-' | '.' | '+'))
    {
        return None;
    }

    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => Some(format!("+1{}", digits)),
        11 if digits.starts_with('1') => Some(format!("+{}", digits)),
        _ => None,
    }
}

/// Trim an email and lower-case its domain, or None if it is not an email
pub fn normalize_email(input: &str) -> Option<String> {
    let input = input.trim();
    if !validator::validate_email(input) {
        return None;
    }

    let (local, domain) = input.rsplit_once('@')?;
    Some(format!("{}@{}", local, domain.to_lowercase()))
}

/// Classify an invite contact field
pub fn parse_contact(input: &str) -> Result<Contact, VillageError> {
    if let Some(phone) = normalize_phone(input) {
        return Ok(Contact::Phone(phone));
    }
    if let Some(email) = normalize_email(input) {
        return Ok(Contact::Email(email));
    }
    Err(VillageError::field("contact", INVALID_CONTACT))
}

/// Trimmed name, or a `name` field error when nothing but whitespace was typed
pub fn required_name(input: &str, message: &str) -> Result<String, VillageError> {
    let name = input.trim();
    if name.is_empty() {
        return Err(VillageError::field("name", message));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(123)456-7890").as_deref(), Some("+11234567890"));
        assert_eq!(normalize_phone("321.643.0987").as_deref(), Some("+13216430987"));
        assert_eq!(normalize_phone("+1 321 643 0987").as_deref(), Some("+13216430987"));
        assert_eq!(normalize_phone("13216430987").as_deref(), Some("+13216430987"));
    }

    #[test]
    fn test_normalize_phone_rejects() {
        assert!(normalize_phone("").is_none());
        assert!(normalize_phone("123").is_none());
        assert!(normalize_phone("23216430987").is_none());
        assert!(normalize_phone("321-643-0987 ext 5").is_none());
        assert!(normalize_phone("dad@example.com").is_none());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email(" Dad@Example.COM ").as_deref(),
            Some("Dad@example.com")
        );
        assert!(normalize_email("not an email").is_none());
    }

    #[test]
    fn test_parse_contact() {
        assert_eq!(
            parse_contact("(321) 643-0987").unwrap(),
            Contact::Phone("+13216430987".to_string())
        );
        assert_eq!(
            parse_contact("mom@example.com").unwrap(),
            Contact::Email("mom@example.com".to_string())
        );

        match parse_contact("nope") {
            Err(VillageError::FormErrors(fields)) => {
                assert_eq!(fields["contact"], vec![INVALID_CONTACT.to_string()]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_required_name() {
        assert_eq!(required_name("  Johnny ", "missing").unwrap(), "Johnny");

        for blank in ["", "   ", "\t\n"] {
            match required_name(blank, "Please enter a name.") {
                Err(VillageError::FormErrors(fields)) => {
                    assert_eq!(fields["name"], vec!["Please enter a name.".to_string()]);
                }
                other => panic!("unexpected: {:?}", other),
            }
        }
    }
}
