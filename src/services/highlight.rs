// src/services/highlight.rs
// DOCUMENTATION: "@name" highlights in village posts
// PURPOSE: Resolve mentions against a student's elders and render them as name tags

use crate::models::VillageElder;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use uuid::Uuid;

/// A mention: "@" at the start of the text or after whitespace, up to the next whitespace
static HIGHLIGHT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\A|\s)@(\S+)").expect("Invalid highlight regex"));

/// Lower-case and strip spaces so "@JohnDoe" matches "John Doe"
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "")
}

/// Build the map of highlightable names in a village
/// DOCUMENTATION: Each elder can be highlighted by name, phone (with and
/// without the +1 prefix), email, or village role. A name claimed by more
/// than one elder is dropped so nobody can use it.
pub fn highlight_names(elders: &[VillageElder]) -> HashMap<String, Uuid> {
    let mut name_map = HashMap::new();
    let mut collisions = HashSet::new();

    for elder in elders {
        let profile = &elder.profile;
        let mut names = Vec::new();

        if !profile.name.is_empty() {
            names.push(normalize_name(&profile.name));
        }
        if let Some(phone) = &profile.phone {
            names.push(normalize_name(phone));
            names.push(normalize_name(
                phone.trim_start_matches('+').trim_start_matches('1'),
            ));
        }
        if let Some(email) = &profile.email {
            names.push(normalize_name(email));
        }
        names.push(normalize_name(&elder.description_or_role()));

        names.retain(|n| !n.is_empty());
        names.sort();
        names.dedup();

        for name in names {
            if name_map.contains_key(&name) {
                collisions.insert(name.clone());
            }
            name_map.insert(name, profile.id);
        }
    }

    for collision in &collisions {
        name_map.remove(collision);
    }

    name_map
}

/// Wrap resolvable mentions in `text` with a name tag
/// DOCUMENTATION: `text` must already be HTML-escaped. Returns the new text
/// and the ids of highlighted elders; unknown mentions are left untouched.
pub fn replace_highlights(text: &str, name_map: &HashMap<String, Uuid>) -> (String, HashSet<Uuid>) {
    let mut highlighted = HashSet::new();
    let mut rendered = String::with_capacity(text.len());
    let mut last = 0;

    for caps in HIGHLIGHT_REGEX.captures_iter(text) {
        let Some(name) = caps.get(1) else { continue };
        let Some(profile_id) = name_map.get(&normalize_name(name.as_str())) else {
            continue;
        };

        // include the "@" just before the captured name
        let start = name.start() - 1;
        rendered.push_str(&text[last..start]);
        rendered.push_str(&format!(
            r#"<b class="nametag" data-user-id="{}">@{}</b>"#,
            profile_id,
            name.as_str()
        ));
        last = name.end();
        highlighted.insert(*profile_id);
    }

    rendered.push_str(&text[last..]);
    (rendered, highlighted)
}

/// Escape the five HTML-significant characters
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Turn raw post text into stored HTML
pub fn render_post_html(text: &str, name_map: &HashMap<String, Uuid>) -> (String, HashSet<Uuid>) {
    let (html, highlighted) = replace_highlights(&escape_html(text), name_map);
    (html.replace('\n', "<br>"), highlighted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{elder, profile};

    fn parent(name: &str, phone: &str, description: &str) -> VillageElder {
        let mut p = profile(name);
        p.phone = Some(phone.to_string());
        p.role = "Parent".to_string();
        elder(p, description)
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("John Doe"), "johndoe");
        assert_eq!(normalize_name("MS. Smith "), "ms.smith");
    }

    #[test]
    fn test_names_include_phone_variants_and_role() {
        let dad = parent("John Doe", "+13216430987", "Father");
        let id = dad.profile.id;
        let map = highlight_names(&[dad]);

        assert_eq!(map.get("johndoe"), Some(&id));
        assert_eq!(map.get("+13216430987"), Some(&id));
        assert_eq!(map.get("3216430987"), Some(&id));
        assert_eq!(map.get("father"), Some(&id));
    }

    #[test]
    fn test_email_is_highlightable() {
        let mut p = profile("");
        p.email = Some("Mom@Example.com".to_string());
        let id = p.id;
        let map = highlight_names(&[elder(p, "")]);

        assert_eq!(map.get("mom@example.com"), Some(&id));
    }

    #[test]
    fn test_colliding_names_are_dropped() {
        let a = parent("Pat", "+13216430987", "Parent");
        let b = parent("Pat", "+13216430988", "Parent");
        let a_id = a.profile.id;
        let map = highlight_names(&[a, b]);

        assert!(!map.contains_key("pat"));
        assert!(!map.contains_key("parent"));
        assert_eq!(map.get("3216430987"), Some(&a_id));
    }

    #[test]
    fn test_same_elder_duplicate_names_do_not_collide() {
        // name and role normalize to the same string
        let mut teacher = parent("Teacher", "+13216430987", "");
        teacher.profile.role = "teacher".to_string();
        let id = teacher.profile.id;
        let map = highlight_names(&[teacher]);

        assert_eq!(map.get("teacher"), Some(&id));
    }

    #[test]
    fn test_replace_highlights() {
        let dad = parent("John Doe", "+13216430987", "Father");
        let id = dad.profile.id;
        let map = highlight_names(&[dad]);

        let (text, highlighted) = replace_highlights("Hi @johndoe see you", &map);
        assert_eq!(
            text,
            format!(r#"Hi <b class="nametag" data-user-id="{}">@johndoe</b> see you"#, id)
        );
        assert!(highlighted.contains(&id));

        // trailing punctuation is part of the token, so it does not resolve
        let (text, highlighted) = replace_highlights("Hi @johndoe, see you", &map);
        assert_eq!(text, "Hi @johndoe, see you");
        assert!(highlighted.is_empty());
    }

    #[test]
    fn test_replace_highlights_at_start_and_consecutive() {
        let dad = parent("John Doe", "+13216430987", "Father");
        let mom = parent("Jane Doe", "+13216430988", "Mother");
        let (dad_id, mom_id) = (dad.profile.id, mom.profile.id);
        let map = highlight_names(&[dad, mom]);

        let (text, highlighted) = replace_highlights("@father @mother hello", &map);

        assert_eq!(
            text,
            format!(
                concat!(
                    r#"<b class="nametag" data-user-id="{}">@father</b> "#,
                    r#"<b class="nametag" data-user-id="{}">@mother</b> hello"#
                ),
                dad_id, mom_id
            )
        );
        assert_eq!(highlighted.len(), 2);
    }

    #[test]
    fn test_unknown_and_embedded_mentions_untouched() {
        let dad = parent("John Doe", "+13216430987", "Father");
        let map = highlight_names(&[dad]);

        let (text, highlighted) = replace_highlights("mail me@father or @nobody", &map);
        assert_eq!(text, "mail me@father or @nobody");
        assert!(highlighted.is_empty());
    }

    #[test]
    fn test_render_escapes_before_tagging() {
        let dad = parent("John Doe", "+13216430987", "Father");
        let id = dad.profile.id;
        let map = highlight_names(&[dad]);

        let (html, highlighted) = render_post_html("<script> & @Father\nbye", &map);
        assert_eq!(
            html,
            format!(
                r#"&lt;script&gt; &amp; <b class="nametag" data-user-id="{}">@Father</b><br>bye"#,
                id
            )
        );
        assert!(highlighted.contains(&id));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"a<b>"c"&'d'"#), "a&lt;b&gt;&quot;c&quot;&amp;&#39;d&#39;");
    }
}
