//! Core provider selection, free of any storage concerns

use super::models::{MatchCriteria, MatchInfo, Rejection};
use crate::models::ProviderProfile;
use std::cmp::Ordering;

/// Check a single provider against already-lowercased criteria.
/// Empty criteria text is contained in every string and so matches anything.
fn check_normalized(
    provider: &ProviderProfile,
    service_type: &str,
    location: &str,
) -> Result<(), Rejection> {
    if !provider.verified {
        return Err(Rejection::Unverified);
    }
    if !provider.service_category.to_lowercase().contains(service_type) {
        return Err(Rejection::CategoryMismatch);
    }
    if !provider.location.to_lowercase().contains(location) {
        return Err(Rejection::LocationMismatch);
    }
    Ok(())
}

/// Check whether a provider qualifies for the criteria
pub fn check(provider: &ProviderProfile, criteria: &MatchCriteria) -> Result<(), Rejection> {
    let (service_type, location) = criteria.normalized();
    check_normalized(provider, &service_type, &location)
}

/// Highest rating first. NaN ratings sort last.
fn by_rating_desc(a: &ProviderProfile, b: &ProviderProfile) -> Ordering {
    match (a.rating.is_nan(), b.rating.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.rating.total_cmp(&a.rating),
    }
}

/// All qualifying providers, best first. The sort is stable, so equal ratings
/// keep the order of `candidates`.
pub fn rank<'a>(candidates: &'a [ProviderProfile], criteria: &MatchCriteria) -> Vec<&'a ProviderProfile> {
    let (service_type, location) = criteria.normalized();

    let mut qualifying: Vec<&ProviderProfile> = candidates
        .iter()
        .filter(|p| check_normalized(p, &service_type, &location).is_ok())
        .collect();

    qualifying.sort_by(|a, b| by_rating_desc(a, b));
    qualifying
}

/// Pick the best provider for the criteria, if any qualifies
pub fn best_match<'a>(
    candidates: &'a [ProviderProfile],
    criteria: &MatchCriteria,
) -> Option<MatchInfo<'a>> {
    let ranked = rank(candidates, criteria);
    ranked.first().map(|&provider| MatchInfo {
        provider,
        qualifying: ranked.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(id: i64, category: &str, location: &str, verified: bool, rating: f64) -> ProviderProfile {
        ProviderProfile {
            id,
            user_id: id,
            company_name: format!("Company {}", id),
            service_category: category.to_string(),
            description: String::new(),
            verified,
            rating,
            location: location.to_string(),
            address: String::new(),
            contact_number: String::new(),
            latitude: None,
            longitude: None,
            profile_completed: true,
        }
    }

    #[test]
    fn test_highest_rating_wins() {
        let candidates = vec![
            provider(1, "Plumbing", "Nairobi", true, 3.5),
            provider(2, "Plumbing", "Nairobi", true, 4.8),
            provider(3, "Plumbing", "Nairobi", true, 4.1),
        ];
        let best = best_match(&candidates, &MatchCriteria::new("plumbing", "nairobi")).unwrap();
        assert_eq!(best.provider.id, 2);
        assert_eq!(best.qualifying, 3);
    }

    #[test]
    fn test_unverified_is_never_selected() {
        let candidates = vec![
            provider(1, "Plumbing", "Nairobi", false, 5.0),
            provider(2, "Plumbing", "Nairobi", true, 1.0),
        ];
        let best = best_match(&candidates, &MatchCriteria::new("Plumbing", "Nairobi")).unwrap();
        assert_eq!(best.provider.id, 2);
        assert_eq!(
            check(&candidates[0], &MatchCriteria::new("Plumbing", "Nairobi")),
            Err(Rejection::Unverified)
        );
    }

    #[test]
    fn test_substring_is_case_insensitive() {
        let candidates = vec![provider(1, "Home Cleaning Services", "Westlands, NAIROBI", true, 2.0)];
        assert!(best_match(&candidates, &MatchCriteria::new("CLEANING", "nairobi")).is_some());
        assert!(best_match(&candidates, &MatchCriteria::new("cleaning", "westlands")).is_some());
    }

    #[test]
    fn test_category_and_location_must_both_contain_request_text() {
        let candidates = vec![
            provider(1, "Electrical", "Nairobi", true, 5.0),
            provider(2, "Plumbing", "Mombasa", true, 5.0),
        ];
        let criteria = MatchCriteria::new("plumbing", "nairobi");
        assert!(best_match(&candidates, &criteria).is_none());
        assert_eq!(check(&candidates[0], &criteria), Err(Rejection::CategoryMismatch));
        assert_eq!(check(&candidates[1], &criteria), Err(Rejection::LocationMismatch));
        assert_eq!(Rejection::LocationMismatch.label(), "location does not match");
    }

    #[test]
    fn test_containment_is_one_directional() {
        // The provider field must contain the request text, not the reverse
        let candidates = vec![provider(1, "Plumb", "Nairobi", true, 5.0)];
        assert!(best_match(&candidates, &MatchCriteria::new("Plumbing", "Nairobi")).is_none());
    }

    #[test]
    fn test_ties_keep_candidate_order() {
        let candidates = vec![
            provider(7, "Plumbing", "Nairobi", true, 4.0),
            provider(3, "Plumbing", "Nairobi", true, 4.0),
        ];
        let ranked = rank(&candidates, &MatchCriteria::new("plumbing", "nairobi"));
        assert_eq!(ranked.iter().map(|p| p.id).collect::<Vec<_>>(), vec![7, 3]);
    }

    #[test]
    fn test_empty_criteria_match_any_verified_provider() {
        let candidates = vec![
            provider(1, "Plumbing", "", true, 1.0),
            provider(2, "Catering", "Kisumu", true, 2.0),
        ];
        let best = best_match(&candidates, &MatchCriteria::new("", "")).unwrap();
        assert_eq!(best.provider.id, 2);
    }

    #[test]
    fn test_nan_rating_sorts_last() {
        let candidates = vec![
            provider(1, "Plumbing", "Nairobi", true, f64::NAN),
            provider(2, "Plumbing", "Nairobi", true, -1.0),
        ];
        let best = best_match(&candidates, &MatchCriteria::new("plumbing", "nairobi")).unwrap();
        assert_eq!(best.provider.id, 2);
    }

    #[test]
    fn test_no_candidates() {
        assert!(best_match(&[], &MatchCriteria::new("plumbing", "nairobi")).is_none());
    }
}
