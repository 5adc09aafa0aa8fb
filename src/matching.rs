use serde::Deserialize;

use crate::db::Profile;

/// How many partners the dashboard suggests.
pub const SUGGESTION_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Partners who can help with the subject.
    #[default]
    Offering,
    /// Partners who need help with the subject.
    Seeking,
}

/// Filters `profiles` for the match finder. `me` is never part of the result.
pub fn find_partners<'a>(
    profiles: &'a [Profile],
    me: i64,
    subject: Option<i64>,
    role: Role,
) -> Vec<&'a Profile> {
    profiles
        .iter()
        .filter(|p| p.user_id != me)
        .filter(|p| match (subject, role) {
            (None, _) => true,
            (Some(s), Role::Offering) => p.subjects_can_help.contains(&s),
            (Some(s), Role::Seeking) => p.subjects_need_help.contains(&s),
        })
        .collect()
}

/// Profiles that can help with anything `mine` needs help with.
pub fn suggest_partners<'a>(
    profiles: &'a [Profile],
    me: i64,
    mine: Option<&Profile>,
) -> Vec<&'a Profile> {
    let Some(mine) = mine else {
        return Vec::new();
    };

    profiles
        .iter()
        .filter(|p| p.user_id != me)
        .filter(|p| p.subjects_can_help.iter().any(|s| mine.subjects_need_help.contains(s)))
        .take(SUGGESTION_LIMIT)
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::db::seed_profiles;

    use super::*;

    const PHYSICS: i64 = 2;
    const HISTORY: i64 = 3;
    const CS: i64 = 4;

    fn users(found: Vec<&Profile>) -> Vec<i64> {
        found.into_iter().map(|p| p.user_id).collect()
    }

    #[test]
    fn offering_matches_can_help_lists() {
        let profiles = seed_profiles();
        assert_eq!(users(find_partners(&profiles, 4, Some(HISTORY), Role::Offering)), vec![2]);
        assert_eq!(users(find_partners(&profiles, 4, Some(PHYSICS), Role::Offering)), vec![1]);
    }

    #[test]
    fn seeking_matches_need_help_lists() {
        let profiles = seed_profiles();
        assert_eq!(users(find_partners(&profiles, 1, Some(CS), Role::Seeking)), vec![2]);
        assert_eq!(users(find_partners(&profiles, 1, Some(PHYSICS), Role::Seeking)), vec![3]);
    }

    #[test]
    fn current_user_is_always_excluded() {
        let profiles = seed_profiles();
        for p in &profiles {
            let all = find_partners(&profiles, p.user_id, None, Role::Offering);
            assert_eq!(all.len(), profiles.len() - 1);
            assert!(all.iter().all(|found| found.user_id != p.user_id));

            for subject in 1..=6 {
                for role in [Role::Offering, Role::Seeking] {
                    assert!(find_partners(&profiles, p.user_id, Some(subject), role)
                        .iter()
                        .all(|found| found.user_id != p.user_id));
                }
            }
        }
    }

    #[test]
    fn alice_is_suggested_bob_not_charlie() {
        let profiles = seed_profiles();
        let alice = profiles.iter().find(|p| p.user_id == 1);
        let suggested = users(suggest_partners(&profiles, 1, alice));
        assert!(suggested.contains(&2));
        assert!(!suggested.contains(&3));
    }

    #[test]
    fn suggestions_are_capped() {
        let mut profiles = seed_profiles();
        for p in &mut profiles {
            p.subjects_can_help.push(HISTORY);
        }
        let alice = profiles[0].clone();
        assert_eq!(suggest_partners(&profiles, 1, Some(&alice)).len(), SUGGESTION_LIMIT);
        assert!(suggest_partners(&profiles, 1, None).is_empty());
    }
}
