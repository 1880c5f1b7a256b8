//! Market analysis: fuses cached source snapshots with community statistics
//! and derives trends, yields, rankings, predictions, and comparisons.
//!
//! Every sub-result is optional. A missing figure is left out, a failed
//! source is named in `unavailable_sources`, and the analysis itself never
//! fails.

pub mod competitors;
pub mod dashboard;
pub mod fusion;
pub mod nearby;
pub mod opportunities;
pub mod trends;
pub mod yields;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use competitors::{analyze_competitors, CompetitorAnalysis};
pub use dashboard::{build_dashboard, DashboardFilters, MarketDashboard};
pub use fusion::{fuse, FigureSource, FusedArea, SnapshotSet};
pub use nearby::{compare_nearby, NearbyComparison};
pub use opportunities::{
    investment_opportunities, predict, top_performing_areas, undervalued_areas, AreaPerformance,
    InvestmentOpportunities, Prediction, UndervaluedArea,
};
pub use trends::{classify_rent_trend, classify_sale_trend, TrendBand};
pub use yields::{rental_yield, MarketComparison, YieldCalculation, YieldVerdict};

use self::yields::round2;
use super::cache::TtlCache;
use super::clock::Clock;
use super::domain::{AreaStatistics, ContributedRentalRecord, PropertyType};
use super::snapshots::MarketDataCache;
use super::sources::{MarketSnapshot, SourceError, SourceKind};
use super::statistics::mean;

pub const DEFAULT_ANALYSIS_TTL_MINUTES: i64 = 240;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub include_nearby: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AnalysisKey {
    area: String,
    property_type: Option<PropertyType>,
    period: String,
    include_nearby: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketOverview {
    pub areas_covered: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_yield: Option<f64>,
    pub community_data_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub area: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_trend: Option<TrendBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_trend: Option<TrendBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_price_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_rent_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldByType {
    pub property_type: PropertyType,
    pub rental_yield: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldInsight {
    pub area: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_yield: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_type_yield: Option<f64>,
    pub by_property_type: Vec<YieldByType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    pub region: String,
    pub period: String,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<MarketOverview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_area: Option<FusedArea>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<TrendSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_yield: Option<YieldInsight>,
    pub top_performing_areas: Vec<AreaPerformance>,
    pub undervalued_areas: Vec<UndervaluedArea>,
    pub predictions: Vec<Prediction>,
    pub investment_opportunities: InvestmentOpportunities,
    pub competitors: CompetitorAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearby: Option<NearbyComparison>,
    pub unavailable_sources: Vec<SourceKind>,
}

/// Fused figures for every known area plus the sources that failed to load.
#[derive(Debug, Clone)]
pub struct FusedMarket {
    pub areas: Vec<FusedArea>,
    pub unavailable_sources: Vec<SourceKind>,
}

impl FusedMarket {
    pub fn area(&self, name: &str) -> Option<&FusedArea> {
        self.areas
            .iter()
            .find(|area| area.area.eq_ignore_ascii_case(name))
    }
}

pub struct MarketAnalysisEngine {
    snapshots: Arc<MarketDataCache>,
    analyses: TtlCache<AnalysisKey, MarketAnalysis>,
    clock: Arc<dyn Clock>,
    region: String,
    default_period: String,
}

impl MarketAnalysisEngine {
    pub fn new(
        snapshots: Arc<MarketDataCache>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        region: impl Into<String>,
        default_period: impl Into<String>,
    ) -> Self {
        Self {
            snapshots,
            analyses: TtlCache::new(ttl, clock.clone()),
            clock,
            region: region.into(),
            default_period: default_period.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn default_period(&self) -> &str {
        &self.default_period
    }

    pub fn cached_analyses(&self) -> usize {
        self.analyses.len()
    }

    pub fn evict_expired(&self) -> usize {
        self.analyses.evict_expired() + self.snapshots.evict_expired()
    }

    fn resolve_period(&self, period: Option<&str>) -> String {
        period
            .map(str::trim)
            .filter(|period| !period.is_empty())
            .unwrap_or(&self.default_period)
            .to_string()
    }

    async fn load(&self, period: &str) -> (SnapshotSet, Vec<(SourceKind, SourceError)>) {
        let region = self.region.as_str();
        let (house_prices, rents, price_paid) = tokio::join!(
            self.snapshots.get(SourceKind::HousePriceIndex, region, period),
            self.snapshots.get(SourceKind::RentalStatistics, region, period),
            self.snapshots.get(SourceKind::PricePaid, region, period),
        );

        let mut failures = Vec::new();
        let mut keep = |kind: SourceKind, result: Result<MarketSnapshot, SourceError>| match result {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                failures.push((kind, error));
                None
            }
        };

        let set = SnapshotSet {
            house_prices: keep(SourceKind::HousePriceIndex, house_prices),
            rents: keep(SourceKind::RentalStatistics, rents),
            price_paid: keep(SourceKind::PricePaid, price_paid),
        };
        (set, failures)
    }

    /// Best-effort fusion: every source that loads contributes, failures are listed.
    pub async fn fused_market(
        &self,
        period: Option<&str>,
        community: &[AreaStatistics],
    ) -> FusedMarket {
        let period = self.resolve_period(period);
        let (set, failures) = self.load(&period).await;
        for (kind, error) in &failures {
            warn!(source = %kind, error = %error, "continuing analysis without source");
        }
        FusedMarket {
            areas: fuse(&set, community),
            unavailable_sources: failures.into_iter().map(|(kind, _)| kind).collect(),
        }
    }

    /// Fusion for callers that cannot proceed without sale prices.
    ///
    /// A failed house price index is returned as an error; the other sources
    /// stay best-effort.
    pub async fn fused_market_requiring_prices(
        &self,
        period: Option<&str>,
        community: &[AreaStatistics],
    ) -> Result<FusedMarket, SourceError> {
        let period = self.resolve_period(period);
        let (set, failures) = self.load(&period).await;

        let mut unavailable_sources = Vec::new();
        for (kind, error) in failures {
            if kind == SourceKind::HousePriceIndex {
                return Err(error);
            }
            warn!(source = %kind, error = %error, "continuing without optional source");
            unavailable_sources.push(kind);
        }

        Ok(FusedMarket {
            areas: fuse(&set, community),
            unavailable_sources,
        })
    }

    /// Compare a candidate yield with the area's fused yield, when both are known.
    pub async fn market_comparison(
        &self,
        area: &str,
        candidate_yield: Option<f64>,
        community: &[AreaStatistics],
    ) -> Option<MarketComparison> {
        let candidate_yield = candidate_yield?;
        let market = self.fused_market(None, community).await;
        let fused = market.area(area)?;
        let area_yield = fused.rental_yield?;
        Some(MarketComparison::new(fused.area.clone(), candidate_yield, area_yield))
    }

    /// Full analysis for `params`, served from the 4-hour cache when possible.
    ///
    /// `comparables` are community records already filtered to the requested
    /// area and type; they feed the competitor section.
    pub async fn analyze(
        &self,
        params: &AnalysisParams,
        community: &[AreaStatistics],
        comparables: &[ContributedRentalRecord],
    ) -> MarketAnalysis {
        let period = self.resolve_period(params.period.as_deref());
        let key = AnalysisKey {
            area: params
                .area
                .as_deref()
                .map(|area| area.trim().to_ascii_lowercase())
                .unwrap_or_default(),
            property_type: params.property_type,
            period: period.clone(),
            include_nearby: params.include_nearby,
        };

        if let Some(cached) = self.analyses.get(&key) {
            debug!(area = %key.area, period = %key.period, "analysis cache hit");
            return cached;
        }

        let market = self.fused_market(Some(&period), community).await;
        let analysis = self.compose(params, period, &market, community, comparables);

        // A partial result would pin the outage for the whole TTL.
        if analysis.unavailable_sources.is_empty() {
            self.analyses.set(key, analysis.clone());
        }
        analysis
    }

    fn compose(
        &self,
        params: &AnalysisParams,
        period: String,
        market: &FusedMarket,
        community: &[AreaStatistics],
        comparables: &[ContributedRentalRecord],
    ) -> MarketAnalysis {
        let kind = params.property_type;
        let focus = params
            .area
            .as_deref()
            .and_then(|area| market.area(area.trim()))
            .cloned();

        // A requested area that is not covered yields no area-scoped sections.
        let scope: Vec<&FusedArea> = if params.area.is_some() {
            focus.iter().collect()
        } else {
            market.areas.iter().collect()
        };
        let predictions: Vec<Prediction> = scope
            .iter()
            .filter(|area| area.average_price.is_some())
            .map(|area| predict(area))
            .collect();

        let nearby = if params.include_nearby {
            focus
                .as_ref()
                .map(|area| compare_nearby(area, &market.areas))
        } else {
            None
        };

        MarketAnalysis {
            area: params.area.clone(),
            property_type: kind,
            region: self.region.clone(),
            period,
            generated_at: self.clock.now(),
            overview: overview(&scope, kind, community),
            trends: focus.as_ref().map(trend_summary),
            rental_yield: focus.as_ref().map(|area| yield_insight(area, kind)),
            top_performing_areas: top_performing_areas(&market.areas),
            undervalued_areas: undervalued_areas(&market.areas, kind),
            predictions,
            investment_opportunities: investment_opportunities(&market.areas, kind),
            competitors: analyze_competitors(comparables),
            nearby,
            focus_area: focus,
            unavailable_sources: market.unavailable_sources.clone(),
        }
    }
}

fn overview(
    areas: &[&FusedArea],
    kind: Option<PropertyType>,
    community: &[AreaStatistics],
) -> Option<MarketOverview> {
    if areas.is_empty() {
        return None;
    }
    let prices: Vec<f64> = areas.iter().filter_map(|area| area.average_price).collect();
    let rents: Vec<f64> = areas.iter().filter_map(|area| area.average_rent).collect();
    let yields: Vec<f64> = areas.iter().filter_map(|area| area.yield_for(kind)).collect();
    let community_data_points = community
        .iter()
        .filter(|stats| {
            areas
                .iter()
                .any(|area| area.area.eq_ignore_ascii_case(&stats.area))
        })
        .map(|stats| stats.data_point_count)
        .sum();

    Some(MarketOverview {
        areas_covered: areas.len(),
        average_price: mean(&prices).map(f64::round),
        average_rent: mean(&rents).map(round2),
        average_yield: mean(&yields).map(round2),
        community_data_points,
    })
}

fn trend_summary(area: &FusedArea) -> TrendSummary {
    TrendSummary {
        area: area.area.clone(),
        sale_trend: area.sale_trend,
        rent_trend: area.rent_trend,
        annual_price_change: area.annual_price_change,
        annual_rent_change: area.annual_rent_change,
    }
}

fn yield_insight(area: &FusedArea, kind: Option<PropertyType>) -> YieldInsight {
    YieldInsight {
        area: area.area.clone(),
        rental_yield: area.rental_yield,
        requested_type_yield: kind.and_then(|kind| area.yield_for(Some(kind))),
        by_property_type: area
            .property_types
            .iter()
            .filter_map(|entry| {
                entry.rental_yield.map(|rental_yield| YieldByType {
                    property_type: entry.property_type,
                    rental_yield,
                })
            })
            .collect(),
    }
}
