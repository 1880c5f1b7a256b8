use super::common::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::market::clock::Clock;
use crate::market::domain::{PropertyType, UserId};
use crate::market::recommendations::{
    describe, CriteriaError, InvestmentCriteria, RecommendationError, RecommendationPersister,
    MAX_RECOMMENDATIONS,
};
use crate::market::repository::RecommendationRepository;
use crate::market::sources::{AreaFigures, FixtureSourceAdapter, PropertyTypeFigures, SourceKind};

fn areas(rows: &[crate::market::domain::InvestmentRecommendation]) -> Vec<&str> {
    rows.iter().map(|row| row.area.as_str()).collect()
}

#[tokio::test]
async fn recommendations_replace_the_previous_set() {
    let harness = harness_with(yield_fixture());
    let user = UserId("investor-1".to_string());
    harness
        .recommendations
        .replace_for_user(&user, vec![prior_recommendation("investor-1", "Bath")])
        .expect("seed prior rows");

    let outcome = harness
        .service
        .generate_investment_recommendations(&InvestmentCriteria::for_user("investor-1", 6.0))
        .await
        .expect("recommendations generated");

    assert_eq!(areas(&outcome.recommendations), vec!["Salford", "Liverpool"]);
    assert_eq!(outcome.recommendations[0].rental_yield, 8.1);
    assert_eq!(outcome.recommendations[1].rental_yield, 6.5);
    assert_eq!(outcome.saved_recommendation_count, 2);
    assert!(outcome.recommendations.iter().all(|row| row.property_type.is_none()));

    let stored = harness
        .service
        .stored_recommendations(&user)
        .expect("repository readable")
        .expect("rows generated");
    assert_eq!(areas(&stored), vec!["Salford", "Liverpool"]);
    assert!(stored.iter().all(|row| row.created_at == start()));
}

#[tokio::test]
async fn description_uses_area_wide_label_without_type() {
    let harness = harness_with(yield_fixture());
    let outcome = harness
        .service
        .generate_investment_recommendations(&InvestmentCriteria::for_user("investor-1", 8.0))
        .await
        .expect("recommendations generated");

    assert_eq!(
        outcome.recommendations[0].description,
        "Residential properties in Salford offer an estimated rental yield of 8.1% with an \
         average price of £100000 and average rent of £675 per month."
    );
    assert_eq!(
        describe("Leeds", Some(PropertyType::Flat), 5.76, 192_000.0, 920.0),
        "Flat properties in Leeds offer an estimated rental yield of 5.8% with an average \
         price of £192000 and average rent of £920 per month."
    );
}

#[tokio::test]
async fn price_outage_fails_and_keeps_prior_rows() {
    let harness = harness_with(yield_fixture());
    let user = UserId("investor-2".to_string());
    harness
        .recommendations
        .replace_for_user(&user, vec![prior_recommendation("investor-2", "Bath")])
        .expect("seed prior rows");
    harness.adapter.fail_source(SourceKind::HousePriceIndex);

    let result = harness
        .service
        .generate_investment_recommendations(&InvestmentCriteria::for_user("investor-2", 0.0))
        .await;
    match result {
        Err(RecommendationError::Source(error)) => {
            assert_eq!(error.source_kind(), SourceKind::HousePriceIndex)
        }
        other => panic!("expected source error, got {other:?}"),
    }

    let stored = harness
        .service
        .stored_recommendations(&user)
        .expect("repository readable")
        .expect("prior rows kept");
    assert_eq!(areas(&stored), vec!["Bath"]);
}

#[tokio::test]
async fn rental_outage_is_tolerated() {
    let harness = harness_with(yield_fixture());
    harness.adapter.fail_source(SourceKind::RentalStatistics);

    let outcome = harness
        .service
        .generate_investment_recommendations(&InvestmentCriteria::for_user("investor-3", 0.0))
        .await
        .expect("rents are best-effort");
    // No rent figures and no community data leave nothing to rank.
    assert!(outcome.recommendations.is_empty());
    assert_eq!(
        harness
            .service
            .stored_recommendations(&UserId("investor-3".to_string()))
            .expect("repository readable"),
        Some(Vec::new())
    );
}

#[tokio::test]
async fn invalid_criteria_are_rejected_before_fetching() {
    let harness = harness();

    let missing_user = InvestmentCriteria::for_user("  ", 5.0);
    let negative = InvestmentCriteria::for_user("investor-4", -1.0);
    let zero_budget = InvestmentCriteria {
        max_budget: Some(0.0),
        ..InvestmentCriteria::for_user("investor-4", 5.0)
    };

    for (criteria, expected) in [
        (missing_user, CriteriaError::MissingUser),
        (negative, CriteriaError::InvalidMinYield(-1.0)),
        (zero_budget, CriteriaError::InvalidBudget(0.0)),
    ] {
        match harness.service.generate_investment_recommendations(&criteria).await {
            Err(RecommendationError::Validation(error)) => assert_eq!(error, expected),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
    assert_eq!(harness.adapter.fetch_count(), 0);
}

#[tokio::test]
async fn type_filter_ranks_top_five_flats() {
    let harness = harness();
    let criteria = InvestmentCriteria {
        property_type: Some(PropertyType::Flat),
        ..InvestmentCriteria::for_user("investor-5", 0.0)
    };

    let outcome = harness
        .service
        .generate_investment_recommendations(&criteria)
        .await
        .expect("recommendations generated");

    let rows = &outcome.recommendations;
    assert_eq!(rows.len(), MAX_RECOMMENDATIONS);
    assert_eq!(
        areas(rows),
        vec!["Liverpool", "Salford", "Glasgow", "Newcastle", "Manchester"]
    );
    assert!(rows.windows(2).all(|pair| pair[0].rental_yield >= pair[1].rental_yield));
    assert!(rows
        .iter()
        .all(|row| row.property_type == Some(PropertyType::Flat)));
    assert!(rows[0].description.starts_with("Flat properties in Liverpool"));
}

#[tokio::test]
async fn untyped_search_ranks_each_property_type_separately() {
    let leeds = AreaFigures {
        area: "Leeds".to_string(),
        average_price: Some(200_000.0),
        average_rent: Some(900.0),
        annual_price_change: Some(2.0),
        annual_rent_change: Some(3.0),
        transactions: Some(400),
        property_types: vec![
            PropertyTypeFigures {
                property_type: PropertyType::Flat,
                average_price: Some(120_000.0),
                average_rent: Some(800.0),
            },
            PropertyTypeFigures {
                property_type: PropertyType::Detached,
                average_price: Some(350_000.0),
                average_rent: Some(1_300.0),
            },
        ],
    };
    let harness = harness_with(FixtureSourceAdapter::new(vec![leeds]));

    let outcome = harness
        .service
        .generate_investment_recommendations(&InvestmentCriteria::for_user("investor-11", 6.0))
        .await
        .expect("recommendations generated");

    let rows = &outcome.recommendations;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].area, "Leeds");
    assert_eq!(rows[0].property_type, Some(PropertyType::Flat));
    assert_eq!(rows[0].rental_yield, 8.0);
    assert_eq!(rows[0].average_price, 120_000.0);
    assert!(rows[0].description.starts_with("Flat properties in Leeds"));

    let everything = harness
        .service
        .generate_investment_recommendations(&InvestmentCriteria::for_user("investor-11", 0.0))
        .await
        .expect("recommendations generated");
    let kinds: Vec<_> = everything
        .recommendations
        .iter()
        .map(|row| row.property_type)
        .collect();
    assert_eq!(kinds, vec![Some(PropertyType::Flat), Some(PropertyType::Detached)]);
}

#[tokio::test]
async fn budget_excludes_expensive_areas() {
    let harness = harness_with(yield_fixture());
    let criteria = InvestmentCriteria {
        max_budget: Some(110_000.0),
        ..InvestmentCriteria::for_user("investor-6", 0.0)
    };
    let outcome = harness
        .service
        .generate_investment_recommendations(&criteria)
        .await
        .expect("recommendations generated");
    assert_eq!(areas(&outcome.recommendations), vec!["Salford"]);
}

#[tokio::test]
async fn bedroom_filter_prefers_community_rent_for_that_size() {
    let harness = harness();
    for (postcode, bedrooms, rent) in [
        ("M6 5PU", 2, 900.0),
        ("M7 1AA", 2, 1_100.0),
        ("M5 3EZ", 3, 1_600.0),
    ] {
        harness
            .service
            .contribute(draft(postcode, PropertyType::Flat, bedrooms, rent))
            .expect("contribution stored");
    }

    let criteria = InvestmentCriteria {
        area: Some("salford".to_string()),
        property_type: Some(PropertyType::Flat),
        bedrooms: Some(2),
        ..InvestmentCriteria::for_user("investor-7", 0.0)
    };
    let outcome = harness
        .service
        .generate_investment_recommendations(&criteria)
        .await
        .expect("recommendations generated");

    let row = &outcome.recommendations[0];
    assert_eq!(outcome.recommendations.len(), 1);
    assert_eq!(row.area, "Salford");
    assert_eq!(row.average_price, 164_000.0);
    assert_eq!(row.monthly_rent, 1_000.0);
    assert_eq!(row.rental_yield, 7.32);
}

#[test]
fn single_conflict_is_retried() {
    let repository = Arc::new(FlakyRecommendations::new(1));
    let clock: Arc<dyn Clock> = manual_clock();
    let persister = RecommendationPersister::new(repository.clone(), clock);
    let user = UserId("investor-8".to_string());

    let saved = persister
        .replace(&user, vec![prior_recommendation("investor-8", "Leeds")])
        .expect("second attempt succeeds");
    assert_eq!(saved, 1);
    assert_eq!(repository.attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn repeated_conflict_is_reported() {
    let repository = Arc::new(FlakyRecommendations::new(2));
    let clock: Arc<dyn Clock> = manual_clock();
    let persister = RecommendationPersister::new(repository.clone(), clock);
    let user = UserId("investor-9".to_string());

    let result = persister.replace(&user, vec![prior_recommendation("investor-9", "Leeds")]);
    match result {
        Err(RecommendationError::ConcurrencyConflict { user }) => assert_eq!(user, "investor-9"),
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(persister.stored(&user).expect("readable"), None);
}

#[test]
fn readers_never_observe_a_partial_set() {
    let repository = Arc::new(crate::market::memory::InMemoryRecommendationRepository::default());
    let clock: Arc<dyn Clock> = manual_clock();
    let persister = RecommendationPersister::new(repository.clone(), clock);
    let user = UserId("investor-10".to_string());
    persister
        .replace(&user, vec![prior_recommendation("investor-10", "Bath")])
        .expect("seeded");

    let done = AtomicBool::new(false);
    thread::scope(|scope| {
        scope.spawn(|| {
            for round in 0..200 {
                let rows = (0..3)
                    .map(|n| prior_recommendation("investor-10", &format!("Area {round}-{n}")))
                    .collect();
                persister.replace(&user, rows).expect("replace");
            }
            done.store(true, Ordering::SeqCst);
        });
        scope.spawn(|| {
            while !done.load(Ordering::SeqCst) {
                let rows = repository
                    .for_user(&user)
                    .expect("readable")
                    .expect("rows present");
                assert!(rows.len() == 1 || rows.len() == 3);
            }
        });
    });
}

#[tokio::test]
async fn fixture_without_rents_yields_no_rows() {
    let harness = harness_with(FixtureSourceAdapter::new(Vec::new()));
    let outcome = harness
        .service
        .generate_investment_recommendations(&InvestmentCriteria::for_user("investor-11", 0.0))
        .await
        .expect("empty market is not an error");
    assert!(outcome.recommendations.is_empty());
    assert_eq!(outcome.saved_recommendation_count, 0);
}
