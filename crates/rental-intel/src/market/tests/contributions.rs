use super::common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::market::areas::AreaRuleTable;
use crate::market::clock::Clock;
use crate::market::contributions::{ContributionError, ContributionStore, ValidationError};
use crate::market::domain::{ContributionQuery, PropertyType};
use crate::market::memory::{InMemoryContributionRepository, InMemoryStatisticsRepository};
use crate::market::repository::RepositoryError;

fn store() -> ContributionStore<InMemoryContributionRepository, InMemoryStatisticsRepository> {
    let clock: Arc<dyn Clock> = manual_clock();
    ContributionStore::new(
        Arc::new(InMemoryContributionRepository::default()),
        Arc::new(InMemoryStatisticsRepository::default()),
        clock,
        Arc::new(AreaRuleTable::standard().clone()),
    )
}

#[test]
fn contribution_is_visible_in_area_statistics_immediately() {
    let harness = harness();
    let receipt = harness
        .service
        .contribute(draft("M14 5TH", PropertyType::Flat, 2, 850.0))
        .expect("contribution accepted");

    assert_eq!(receipt.record.area, "Manchester");
    assert_eq!(receipt.record.postcode, "M14 5TH");

    let statistics = harness
        .service
        .area_statistics("Manchester")
        .expect("statistics readable")
        .expect("statistics present");
    assert!(statistics.data_point_count >= 1);
    assert_eq!(statistics.average_rent, 850.0);
    assert_eq!(statistics.type_average(PropertyType::Flat), Some(850.0));
    assert_eq!(statistics.last_recalculated_at, start());
}

#[test]
fn concurrent_contributions_to_one_area_are_both_counted() {
    for _ in 0..25 {
        let harness = harness();
        let service = harness.service.clone();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                service
                    .contribute(draft("M14 5TH", PropertyType::Flat, 2, 800.0))
                    .expect("first contribution")
            });
            scope.spawn(|| {
                service
                    .contribute(draft("M1 1AE", PropertyType::Terraced, 3, 1_000.0))
                    .expect("second contribution")
            });
        });

        let statistics = service
            .area_statistics("Manchester")
            .expect("statistics readable")
            .expect("statistics present");
        assert_eq!(statistics.data_point_count, 2);
        assert_eq!(statistics.average_rent, 900.0);
    }
}

#[test]
fn invalid_drafts_are_rejected_before_persistence() {
    let harness = harness();

    match harness
        .service
        .contribute(draft("M14 5TH", PropertyType::Flat, 2, 0.0))
    {
        Err(ContributionError::Validation(ValidationError::NonPositiveRent(rent))) => {
            assert_eq!(rent, 0.0)
        }
        other => panic!("expected rent validation error, got {other:?}"),
    }

    assert!(matches!(
        harness
            .service
            .contribute(draft("   ", PropertyType::Flat, 2, 700.0)),
        Err(ContributionError::Validation(ValidationError::MissingPostcode))
    ));
    assert!(matches!(
        harness
            .service
            .contribute(draft("LS6 1AA", PropertyType::Flat, -1, 700.0)),
        Err(ContributionError::Validation(ValidationError::NegativeBedrooms(-1)))
    ));

    assert!(harness.contributions.is_empty());
    assert!(harness
        .service
        .all_area_statistics()
        .expect("statistics readable")
        .is_empty());
}

#[test]
fn recompute_is_idempotent_and_keeps_prior_rollup_without_records() {
    let store = store();
    store
        .contribute(draft("LS6 1AA", PropertyType::Terraced, 4, 1_600.0))
        .expect("contribution accepted");

    let first = store.recompute("Leeds").expect("recompute").expect("rollup");
    let second = store.recompute("Leeds").expect("recompute").expect("rollup");
    assert_eq!(first, second);
    assert_eq!(second.average_rent, 1_600.0);

    assert_eq!(store.recompute("Bath").expect("recompute"), None);
}

#[test]
fn recompute_accepts_any_casing_of_the_area() {
    let store = store();
    store
        .contribute(draft("LS6 1AA", PropertyType::Terraced, 4, 1_600.0))
        .expect("contribution accepted");

    let rollup = store.recompute(" leeds ").expect("recompute").expect("rollup");
    assert_eq!(rollup.area, "Leeds");
    assert_eq!(rollup.data_point_count, 1);
    assert_eq!(rollup.average_rent, 1_600.0);
}

#[test]
fn failed_rollup_write_withdraws_the_contribution() {
    let contributions = Arc::new(InMemoryContributionRepository::default());
    let clock: Arc<dyn Clock> = manual_clock();
    let store = ContributionStore::new(
        contributions.clone(),
        Arc::new(UnavailableStatistics),
        clock,
        Arc::new(AreaRuleTable::standard().clone()),
    );

    assert!(matches!(
        store.contribute(draft("M14 5TH", PropertyType::Flat, 2, 850.0)),
        Err(ContributionError::Repository(RepositoryError::Unavailable(_)))
    ));
    assert!(contributions.is_empty());
    assert!(store
        .list(&ContributionQuery::for_area("Manchester"))
        .expect("list")
        .is_empty());
}

#[test]
fn anonymous_contributions_drop_the_submitter() {
    let harness = harness();
    let mut anonymous = draft("L7 8TX", PropertyType::Flat, 1, 675.0);
    anonymous.anonymous = true;
    anonymous.notes = Some("   ".to_string());

    let receipt = harness.service.contribute(anonymous).expect("accepted");
    assert_eq!(receipt.record.submitter, None);
    assert_eq!(receipt.record.notes, None);
    assert_eq!(receipt.record.area, "Liverpool");
}

#[test]
fn list_combines_filters_with_and_semantics() {
    let harness = harness();
    for (postcode, kind, bedrooms, rent) in [
        ("M14 5TH", PropertyType::Flat, 2, 850.0),
        ("M14 6HR", PropertyType::Terraced, 4, 1_700.0),
        ("M13 9PL", PropertyType::Flat, 2, 900.0),
        ("M6 5PU", PropertyType::Flat, 2, 780.0),
    ] {
        harness
            .service
            .contribute(draft(postcode, kind, bedrooms, rent))
            .expect("accepted");
    }

    let query = ContributionQuery {
        area: Some("manchester".to_string()),
        property_type: Some(PropertyType::Flat),
        bedrooms: Some(2),
        postcode: None,
    };
    assert_eq!(harness.service.list_contributions(&query).expect("list").len(), 2);

    let query = ContributionQuery {
        postcode: Some("m14".to_string()),
        ..ContributionQuery::default()
    };
    let records = harness.service.list_contributions(&query).expect("list");
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.postcode.starts_with("M14")));

    let salford = harness
        .service
        .area_statistics("salford")
        .expect("readable")
        .expect("present");
    assert_eq!(salford.area, "Salford");
    assert_eq!(salford.data_point_count, 1);
}

#[test]
fn persistent_conflicts_are_retried_once_then_surfaced() {
    let repository = Arc::new(ConflictContributions::default());
    let clock: Arc<dyn Clock> = manual_clock();
    let store = ContributionStore::new(
        repository.clone(),
        Arc::new(InMemoryStatisticsRepository::default()),
        clock,
        Arc::new(AreaRuleTable::standard().clone()),
    );

    match store.contribute(draft("M14 5TH", PropertyType::Flat, 2, 850.0)) {
        Err(ContributionError::ConcurrencyConflict { area }) => assert_eq!(area, "Manchester"),
        other => panic!("expected concurrency conflict, got {other:?}"),
    }
    assert_eq!(repository.attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn repository_outages_are_reported_as_repository_errors() {
    let clock: Arc<dyn Clock> = manual_clock();
    let store = ContributionStore::new(
        Arc::new(UnavailableContributions),
        Arc::new(InMemoryStatisticsRepository::default()),
        clock,
        Arc::new(AreaRuleTable::standard().clone()),
    );

    assert!(matches!(
        store.contribute(draft("M14 5TH", PropertyType::Flat, 2, 850.0)),
        Err(ContributionError::Repository(RepositoryError::Unavailable(_)))
    ));
}
