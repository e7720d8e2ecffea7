// src/services/membership.rs
// DOCUMENTATION: Pure decisions behind village membership edits
// PURPOSE: Exact-set diffs, group relationship pairs and role-edit rules

use crate::errors::VillageError;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

pub const INVALID_CHOICE: &str = "Select a valid choice.";

/// What to add and remove to turn `current` into `target`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetDiff {
    pub add: Vec<Uuid>,
    pub remove: Vec<Uuid>,
}

impl SetDiff {
    pub fn between(current: &[Uuid], target: &[Uuid]) -> Self {
        let current: BTreeSet<Uuid> = current.iter().copied().collect();
        let target: BTreeSet<Uuid> = target.iter().copied().collect();

        SetDiff {
            add: target.difference(&current).copied().collect(),
            remove: current.difference(&target).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Every (elder, student) pair a group should link
pub fn group_pairs(elders: &[Uuid], students: &[Uuid]) -> BTreeSet<(Uuid, Uuid)> {
    elders
        .iter()
        .flat_map(|e| students.iter().map(move |s| (*e, *s)))
        .collect()
}

/// Group relationships to create and to delete
pub fn group_pair_diff(
    existing: &[(Uuid, Uuid)],
    wanted: &BTreeSet<(Uuid, Uuid)>,
) -> (Vec<(Uuid, Uuid)>, Vec<(Uuid, Uuid)>) {
    let existing: BTreeSet<(Uuid, Uuid)> = existing.iter().copied().collect();
    let create = wanted.difference(&existing).copied().collect();
    let delete = existing.difference(wanted).copied().collect();
    (create, delete)
}

/// Split pairs a group no longer implies into ones another group takes over
/// (with that group) and ones to delete
pub fn release_pairs(
    pairs: &[(Uuid, Uuid)],
    implied_elsewhere: &BTreeMap<(Uuid, Uuid), Uuid>,
) -> (Vec<((Uuid, Uuid), Uuid)>, Vec<(Uuid, Uuid)>) {
    let mut repoint = Vec::new();
    let mut delete = Vec::new();
    for pair in pairs {
        match implied_elsewhere.get(pair) {
            Some(other) => repoint.push((*pair, *other)),
            None => delete.push(*pair),
        }
    }
    (repoint, delete)
}

/// How changing an elder's role inside one village is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChange {
    /// The village showed the profile role: change the profile role and clear
    /// relationship descriptions that merely repeated the old role
    ProfileRole { old_role: String, new_role: String },
    /// The village had its own description: only that relationship changes
    RelationshipDescription { new_role: String },
}

pub fn role_change(profile_role: &str, description_or_role: &str, new_role: &str) -> RoleChange {
    if profile_role == description_or_role {
        RoleChange::ProfileRole {
            old_role: profile_role.to_string(),
            new_role: new_role.to_string(),
        }
    } else {
        RoleChange::RelationshipDescription {
            new_role: new_role.to_string(),
        }
    }
}

/// Descriptions to rewrite when a profile's own role changes: relationships
/// described by the old role take the new one. None when nothing follows.
pub fn role_rename(old_role: &str, new_role: &str) -> Option<(String, String)> {
    if old_role.is_empty() || old_role == new_role {
        return None;
    }
    Some((old_role.to_string(), new_role.to_string()))
}

/// The part of `student_ids` an editor may change: students they are an elder of
pub fn editable_students(student_ids: &[Uuid], editor_students: &[Uuid]) -> Vec<Uuid> {
    let editor: BTreeSet<&Uuid> = editor_students.iter().collect();
    student_ids
        .iter()
        .filter(|id| editor.contains(id))
        .copied()
        .collect()
}

/// Ids in `requested` that are not in `allowed`
pub fn disallowed(requested: &[Uuid], allowed: &[Uuid]) -> Vec<Uuid> {
    let allowed: BTreeSet<&Uuid> = allowed.iter().collect();
    requested
        .iter()
        .filter(|id| !allowed.contains(id))
        .copied()
        .collect()
}

/// Field error when any requested id is not among the allowed choices
pub fn check_choices(field: &str, requested: &[Uuid], allowed: &[Uuid]) -> Result<(), VillageError> {
    let invalid = disallowed(requested, allowed);
    if invalid.is_empty() {
        return Ok(());
    }

    log::debug!("Rejected {} choices for {}: {:?}", invalid.len(), field, invalid);
    Err(VillageError::field(field, INVALID_CHOICE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_set_diff() {
        let v = ids(4);
        let diff = SetDiff::between(&[v[0], v[1], v[2]], &[v[1], v[2], v[3]]);

        assert_eq!(diff.add, vec![v[3]]);
        assert_eq!(diff.remove, vec![v[0]]);
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_set_diff_ignores_duplicates_and_order() {
        let v = ids(2);
        let diff = SetDiff::between(&[v[1], v[0]], &[v[0], v[1], v[0]]);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_group_pairs_and_diff() {
        let elders = ids(2);
        let students = ids(2);
        let wanted = group_pairs(&elders, &students);
        assert_eq!(wanted.len(), 4);

        let stale = (elders[0], Uuid::new_v4());
        let existing = vec![(elders[0], students[0]), stale];
        let (create, delete) = group_pair_diff(&existing, &wanted);

        assert_eq!(create.len(), 3);
        assert!(!create.contains(&(elders[0], students[0])));
        assert_eq!(delete, vec![stale]);
    }

    #[test]
    fn test_overlapping_group_keeps_shared_relationship() {
        let (aide, student) = (Uuid::new_v4(), Uuid::new_v4());
        let (g1, g2) = (Uuid::new_v4(), Uuid::new_v4());

        // g1 drops the student; g2 still has both of them
        let (_, delete) = group_pair_diff(&[(aide, student)], &group_pairs(&[aide], &[]));
        assert_eq!(delete, vec![(aide, student)]);

        let elsewhere: BTreeMap<(Uuid, Uuid), Uuid> = group_pairs(&[aide], &[student])
            .into_iter()
            .map(|pair| (pair, g2))
            .collect();
        let (repoint, delete) = release_pairs(&delete, &elsewhere);

        assert_eq!(repoint, vec![((aide, student), g2)]);
        assert!(delete.is_empty());
        assert_ne!(repoint[0].1, g1);
    }

    #[test]
    fn test_release_pairs_deletes_when_no_other_group() {
        let v = ids(3);
        let shared = (v[0], v[1]);
        let alone = (v[0], v[2]);
        let elsewhere = BTreeMap::from([(shared, Uuid::new_v4())]);

        let (repoint, delete) = release_pairs(&[shared, alone], &elsewhere);
        assert_eq!(repoint.len(), 1);
        assert_eq!(repoint[0].0, shared);
        assert_eq!(delete, vec![alone]);
    }

    #[test]
    fn test_role_rename() {
        assert_eq!(
            role_rename("Parent", "Mother"),
            Some(("Parent".to_string(), "Mother".to_string()))
        );
        assert_eq!(role_rename("", "Mother"), None);
        assert_eq!(role_rename("Parent", "Parent"), None);
    }

    #[test]
    fn test_editable_students() {
        let v = ids(3);
        assert_eq!(editable_students(&[v[0], v[1]], &[v[1], v[2]]), vec![v[1]]);
        assert!(editable_students(&[v[0]], &[]).is_empty());
    }

    #[test]
    fn test_role_change_updates_profile_when_village_shows_profile_role() {
        assert_eq!(
            role_change("foo", "foo", "new"),
            RoleChange::ProfileRole {
                old_role: "foo".to_string(),
                new_role: "new".to_string()
            }
        );
    }

    #[test]
    fn test_role_change_updates_relationship_when_described() {
        assert_eq!(
            role_change("Parent", "Father", "Dad"),
            RoleChange::RelationshipDescription {
                new_role: "Dad".to_string()
            }
        );
    }

    #[test]
    fn test_disallowed() {
        let v = ids(3);
        assert_eq!(disallowed(&[v[0], v[2]], &[v[0], v[1]]), vec![v[2]]);
        assert!(disallowed(&[], &[v[0]]).is_empty());
    }

    #[test]
    fn test_check_choices() {
        let v = ids(2);
        assert!(check_choices("elders", &[v[0]], &v).is_ok());

        match check_choices("elders", &[Uuid::new_v4()], &v) {
            Err(VillageError::FormErrors(fields)) => {
                assert_eq!(fields["elders"], vec![INVALID_CHOICE.to_string()]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
