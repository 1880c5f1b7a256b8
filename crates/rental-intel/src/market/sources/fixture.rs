use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{AreaFigures, PropertyTypeFigures, SourceAdapter, SourceError, SourceKind};
use crate::market::domain::PropertyType;

/// Compact seed row: area, sale price, monthly rent, price change %, rent change %, sales.
pub type FixtureArea = (&'static str, f64, f64, f64, f64, u32);

const STANDARD_AREAS: &[FixtureArea] = &[
    ("Manchester", 235_000.0, 1_150.0, 4.2, 6.8, 1_840),
    ("Salford", 205_000.0, 1_025.0, 5.6, 7.1, 910),
    ("Stockport", 265_000.0, 1_050.0, 2.1, 3.2, 760),
    ("Leeds", 240_000.0, 1_000.0, 3.4, 5.1, 1_520),
    ("Bradford", 165_000.0, 750.0, 1.5, 2.9, 830),
    ("Liverpool", 180_000.0, 900.0, 6.1, 4.6, 1_390),
    ("Birmingham", 245_000.0, 1_050.0, 2.8, 4.1, 2_210),
    ("Coventry", 230_000.0, 950.0, 0.4, 1.2, 720),
    ("London", 525_000.0, 2_100.0, -1.8, 3.9, 6_480),
    ("Bristol", 345_000.0, 1_450.0, -0.5, 2.5, 1_130),
    ("Bath", 420_000.0, 1_500.0, -3.2, 0.8, 310),
    ("Sheffield", 195_000.0, 875.0, 1.9, 3.8, 1_050),
    ("Nottingham", 215_000.0, 925.0, 2.2, -0.6, 980),
    ("Newcastle", 170_000.0, 850.0, -0.8, 1.9, 890),
    ("Edinburgh", 315_000.0, 1_400.0, 0.9, -1.6, 1_210),
    ("Glasgow", 190_000.0, 950.0, 3.7, 5.5, 1_470),
];

/// (type, price multiplier, rent multiplier) applied to the area averages.
const TYPE_PROFILE: &[(PropertyType, f64, f64)] = &[
    (PropertyType::Flat, 0.80, 0.92),
    (PropertyType::Terraced, 0.95, 1.08),
    (PropertyType::SemiDetached, 1.15, 1.20),
];

/// Deterministic stand-in for the external statistics feeds.
pub struct FixtureSourceAdapter {
    areas: Vec<AreaFigures>,
    fetches: AtomicUsize,
    failing: Mutex<HashSet<SourceKind>>,
}

impl FixtureSourceAdapter {
    pub fn standard() -> Self {
        Self::from_seed(STANDARD_AREAS)
    }

    pub fn from_seed(seed: &[FixtureArea]) -> Self {
        let areas = seed
            .iter()
            .map(|&(area, price, rent, price_change, rent_change, transactions)| AreaFigures {
                area: area.to_string(),
                average_price: Some(price),
                average_rent: Some(rent),
                annual_price_change: Some(price_change),
                annual_rent_change: Some(rent_change),
                transactions: Some(transactions),
                property_types: TYPE_PROFILE
                    .iter()
                    .map(|&(kind, price_factor, rent_factor)| PropertyTypeFigures {
                        property_type: kind,
                        average_price: Some(round_to(price * price_factor, 1_000.0)),
                        average_rent: Some(round_to(rent * rent_factor, 5.0)),
                    })
                    .collect(),
            })
            .collect();
        Self::new(areas)
    }

    pub fn new(areas: Vec<AreaFigures>) -> Self {
        Self {
            areas,
            fetches: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Make every subsequent fetch of `source` fail until `restore` is called.
    pub fn fail_source(&self, source: SourceKind) {
        self.failing
            .lock()
            .expect("fixture mutex poisoned")
            .insert(source);
    }

    pub fn restore(&self, source: SourceKind) {
        self.failing
            .lock()
            .expect("fixture mutex poisoned")
            .remove(&source);
    }

    fn project(&self, source: SourceKind) -> Vec<AreaFigures> {
        self.areas
            .iter()
            .map(|figures| match source {
                SourceKind::HousePriceIndex => AreaFigures {
                    area: figures.area.clone(),
                    average_price: figures.average_price,
                    annual_price_change: figures.annual_price_change,
                    property_types: figures
                        .property_types
                        .iter()
                        .map(|entry| PropertyTypeFigures {
                            average_rent: None,
                            ..entry.clone()
                        })
                        .collect(),
                    ..AreaFigures::default()
                },
                SourceKind::RentalStatistics => AreaFigures {
                    area: figures.area.clone(),
                    average_rent: figures.average_rent,
                    annual_rent_change: figures.annual_rent_change,
                    property_types: figures
                        .property_types
                        .iter()
                        .map(|entry| PropertyTypeFigures {
                            average_price: None,
                            ..entry.clone()
                        })
                        .collect(),
                    ..AreaFigures::default()
                },
                SourceKind::PricePaid => AreaFigures {
                    area: figures.area.clone(),
                    average_price: figures.average_price,
                    transactions: figures.transactions,
                    ..AreaFigures::default()
                },
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl SourceAdapter for FixtureSourceAdapter {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn fetch(
        &self,
        source: SourceKind,
        _region: &str,
        _period: &str,
    ) -> Result<Vec<AreaFigures>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self
            .failing
            .lock()
            .expect("fixture mutex poisoned")
            .contains(&source)
        {
            return Err(SourceError::Unavailable {
                kind: source,
                reason: "fixture outage".to_string(),
            });
        }
        Ok(self.project(source))
    }
}

fn round_to(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}
