use super::common::*;
use std::sync::Arc;

use chrono::Duration;

use crate::market::clock::Clock;
use crate::market::domain::PropertyType;
use crate::market::matching::{
    CandidateProperty, MatchCriterion, PropertyMatchScorer, PropertyPreference,
    PropertyRecommender, MAX_CANDIDATES,
};
use crate::market::service::MatchRequest;

fn full_preference() -> PropertyPreference {
    PropertyPreference {
        budget: Some(1_000.0),
        location: Some("Fallowfield".to_string()),
        property_type: Some(PropertyType::Flat),
        min_bedrooms: Some(2),
        must_have_features: vec!["washing machine".to_string(), "bike".to_string()],
        university: Some("University of Manchester".to_string()),
        move_in_date: None,
    }
}

fn recommender() -> (PropertyRecommender, Arc<crate::market::clock::ManualClock>) {
    let clock = manual_clock();
    let shared: Arc<dyn Clock> = clock.clone();
    (
        PropertyRecommender::new(PropertyMatchScorer::default(), shared, Duration::minutes(5)),
        clock,
    )
}

#[test]
fn perfect_fit_caps_at_one_hundred() {
    let scorer = PropertyMatchScorer::default();
    let matched = scorer.score(&full_preference(), &candidate("p-1", 800.0), true);

    assert_eq!(matched.score, 100);
    assert_eq!(matched.matched_features.len(), 2);
    assert!(matched.matched_criteria.contains(&MatchCriterion::University));
    assert!(matched.matched_criteria.contains(&MatchCriterion::Furnished));
}

#[test]
fn total_mismatch_floors_at_zero() {
    let scorer = PropertyMatchScorer::default();
    let preference = PropertyPreference {
        budget: Some(400.0),
        location: Some("Headingley".to_string()),
        property_type: Some(PropertyType::Detached),
        min_bedrooms: Some(6),
        must_have_features: (0..10).map(|n| format!("feature {n}")).collect(),
        university: Some("University of Leeds".to_string()),
        move_in_date: None,
    };
    let mut listing = candidate("p-2", 950.0);
    listing.bills_included = false;
    listing.furnished = false;

    let matched = scorer.score(&preference, &listing, true);
    assert_eq!(matched.score, 0);
    assert!(matched.matched_criteria.is_empty());
    assert!(matched.matched_features.is_empty());
}

#[test]
fn reasons_follow_rule_order() {
    let scorer = PropertyMatchScorer::default();
    let matched = scorer.score(&full_preference(), &candidate("p-1", 800.0), true);

    assert_eq!(
        matched.match_reasons,
        vec![
            "Located in Fallowfield",
            "Serves University of Manchester",
            "Walking distance to campus (0.8)",
            "£800 per month is within your £1000 budget",
            "Well under budget",
            "Flat as requested",
            "2 bedrooms (wanted at least 2)",
            "Has washing machine",
            "Has bike",
            "Bills included",
            "Furnished",
        ]
    );
}

#[test]
fn adjustments_add_up_to_the_unclamped_score() {
    let scorer = PropertyMatchScorer::default();
    let mut listing = candidate("p-3", 1_050.0);
    listing.university = None;
    listing.nearby_universities.clear();
    listing.furnished = false;

    let preference = full_preference();
    let adjustments = scorer.adjustments(&preference, &listing);
    let total: i32 = 50 + adjustments.iter().map(|a| a.delta).sum::<i32>();
    // location 25, budget -5, type 15, bedrooms 15, features 20, bills 10
    assert_eq!(total, 130);
    assert_eq!(scorer.score(&preference, &listing, false).score, 100);
    assert!(scorer.score(&preference, &listing, false).match_reasons.is_empty());
}

#[test]
fn ranking_is_stable_descending_and_defaults_to_four() {
    let (recommender, _) = recommender();
    let preference = PropertyPreference {
        budget: Some(900.0),
        ..PropertyPreference::default()
    };
    let candidates: Vec<CandidateProperty> = [
        ("a", 1_200.0),
        ("b", 850.0),
        ("c", 700.0),
        ("d", 860.0),
        ("e", 990.0),
        ("f", 600.0),
    ]
    .into_iter()
    .map(|(id, rent)| candidate(id, rent))
    .collect();

    let ranked = recommender.recommend(&preference, &candidates, None, false);
    let ids: Vec<&str> = ranked.iter().map(|m| m.property_id.as_str()).collect();
    // c and f are well under budget; b and d tie and keep their input order.
    assert_eq!(ids, vec!["c", "f", "b", "d"]);
    assert!(ranked.windows(2).all(|pair| pair[0].score >= pair[1].score));
}

#[test]
fn only_the_first_fifty_candidates_are_scored() {
    let (recommender, _) = recommender();
    let preference = PropertyPreference {
        budget: Some(900.0),
        ..PropertyPreference::default()
    };
    let mut candidates: Vec<CandidateProperty> = (0..60)
        .map(|n| candidate(&format!("over-{n}"), 2_000.0))
        .collect();
    candidates[MAX_CANDIDATES + 2] = candidate("bargain", 500.0);

    let ranked = recommender.recommend(&preference, &candidates, Some(10), false);
    assert_eq!(ranked.len(), 10);
    assert!(ranked.iter().all(|m| m.property_id != "bargain"));
}

#[test]
fn identical_requests_are_served_from_cache_until_ttl() {
    let (recommender, clock) = recommender();
    let preference = PropertyPreference {
        budget: Some(900.0),
        ..PropertyPreference::default()
    };

    let first = recommender.recommend(&preference, &[candidate("p-1", 800.0)], None, true);
    // Same candidate identity with a different rent still hits the cache.
    let cached = recommender.recommend(&preference, &[candidate("p-1", 2_000.0)], None, true);
    assert_eq!(first, cached);

    clock.advance(Duration::minutes(5));
    let fresh = recommender.recommend(&preference, &[candidate("p-1", 2_000.0)], None, true);
    assert!(fresh[0].score < first[0].score);

    let without_reasons =
        recommender.recommend(&preference, &[candidate("p-1", 2_000.0)], None, false);
    assert!(without_reasons[0].match_reasons.is_empty());
}

#[test]
fn cache_prunes_expired_entries_past_one_hundred() {
    let (recommender, clock) = recommender();
    let listing = [candidate("p-1", 800.0)];
    for budget in 0..101 {
        let preference = PropertyPreference {
            budget: Some(500.0 + f64::from(budget)),
            ..PropertyPreference::default()
        };
        recommender.recommend(&preference, &listing, None, false);
    }
    assert_eq!(recommender.cached_len(), 101);

    clock.advance(Duration::minutes(6));
    recommender.recommend(&PropertyPreference::default(), &listing, None, false);
    assert_eq!(recommender.cached_len(), 1);
}

#[test]
fn service_exposes_property_recommendations() {
    let harness = harness();
    let request = MatchRequest {
        preferences: full_preference(),
        candidates: vec![candidate("p-1", 800.0), candidate("p-2", 1_400.0)],
        count: Some(1),
        include_reasons: false,
    };
    let ranked = harness.service.generate_property_recommendations(&request);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].property_id, "p-1");
}
