//! Merge source snapshots and community statistics into one view per area.
//!
//! Precedence per figure: price comes from the house price index, then from
//! price-paid averages; rent comes from rental statistics, then from the
//! community average. Each fused figure records where it came from.

use serde::{Deserialize, Serialize};

use super::trends::{classify_rent_trend, classify_sale_trend, TrendBand};
use super::yields::rental_yield;
use crate::market::domain::{AreaStatistics, PropertyType};
use crate::market::sources::{AreaFigures, MarketSnapshot, PropertyTypeFigures};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureSource {
    HousePriceIndex,
    PricePaid,
    RentalStatistics,
    Community,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedPropertyType {
    pub property_type: PropertyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_source: Option<FigureSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_yield: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub average_rent: f64,
    pub data_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedArea {
    pub area: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_source: Option<FigureSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_source: Option<FigureSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_price_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_rent_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_trend: Option<TrendBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_trend: Option<TrendBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_yield: Option<f64>,
    pub property_types: Vec<FusedPropertyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<CommunitySummary>,
}

impl FusedArea {
    pub fn property_type(&self, kind: PropertyType) -> Option<&FusedPropertyType> {
        self.property_types
            .iter()
            .find(|entry| entry.property_type == kind)
    }

    /// Yield for the requested type, or the area-wide yield when no type is given.
    pub fn yield_for(&self, kind: Option<PropertyType>) -> Option<f64> {
        match kind {
            Some(kind) => self.property_type(kind).and_then(|entry| entry.rental_yield),
            None => self.rental_yield,
        }
    }
}

/// Snapshots that loaded successfully; any of them may be absent.
#[derive(Debug, Default)]
pub struct SnapshotSet {
    pub house_prices: Option<MarketSnapshot>,
    pub rents: Option<MarketSnapshot>,
    pub price_paid: Option<MarketSnapshot>,
}

pub fn fuse(snapshots: &SnapshotSet, community: &[AreaStatistics]) -> Vec<FusedArea> {
    let mut names: Vec<String> = Vec::new();
    let mut remember = |name: &str| {
        if !names.iter().any(|known| known.eq_ignore_ascii_case(name)) {
            names.push(name.to_string());
        }
    };
    for snapshot in [&snapshots.house_prices, &snapshots.rents, &snapshots.price_paid]
        .into_iter()
        .flatten()
    {
        snapshot.areas.iter().for_each(|figures| remember(&figures.area));
    }
    community.iter().for_each(|stats| remember(&stats.area));

    names
        .into_iter()
        .map(|name| fuse_area(&name, snapshots, community))
        .collect()
}

fn lookup<'a>(snapshot: &'a Option<MarketSnapshot>, area: &str) -> Option<&'a AreaFigures> {
    snapshot.as_ref().and_then(|snapshot| snapshot.area(area))
}

fn type_figure<'a>(
    figures: Option<&'a AreaFigures>,
    kind: PropertyType,
) -> Option<&'a PropertyTypeFigures> {
    figures.and_then(|f| f.property_types.iter().find(|t| t.property_type == kind))
}

fn fuse_area(name: &str, snapshots: &SnapshotSet, community: &[AreaStatistics]) -> FusedArea {
    let hpi = lookup(&snapshots.house_prices, name);
    let rents = lookup(&snapshots.rents, name);
    let paid = lookup(&snapshots.price_paid, name);
    let stats = community
        .iter()
        .find(|stats| stats.area.eq_ignore_ascii_case(name));

    let (average_price, price_source) = first_figure([
        (hpi.and_then(|f| f.average_price), FigureSource::HousePriceIndex),
        (paid.and_then(|f| f.average_price), FigureSource::PricePaid),
    ]);
    let (average_rent, rent_source) = first_figure([
        (rents.and_then(|f| f.average_rent), FigureSource::RentalStatistics),
        (stats.map(|s| s.average_rent), FigureSource::Community),
    ]);

    let annual_price_change = hpi.and_then(|f| f.annual_price_change);
    let annual_rent_change = rents.and_then(|f| f.annual_rent_change);

    let property_types = PropertyType::ordered()
        .into_iter()
        .filter_map(|kind| {
            let (price, _) = first_figure([
                (
                    type_figure(hpi, kind).and_then(|t| t.average_price),
                    FigureSource::HousePriceIndex,
                ),
                (
                    type_figure(paid, kind).and_then(|t| t.average_price),
                    FigureSource::PricePaid,
                ),
            ]);
            let (rent, rent_source) = first_figure([
                (
                    type_figure(rents, kind).and_then(|t| t.average_rent),
                    FigureSource::RentalStatistics,
                ),
                (stats.and_then(|s| s.type_average(kind)), FigureSource::Community),
            ]);
            if price.is_none() && rent.is_none() {
                return None;
            }
            Some(FusedPropertyType {
                property_type: kind,
                average_price: price,
                average_rent: rent,
                rent_source,
                rental_yield: rental_yield(price, rent),
            })
        })
        .collect();

    FusedArea {
        area: hpi
            .or(rents)
            .or(paid)
            .map(|f| f.area.clone())
            .or_else(|| stats.map(|s| s.area.clone()))
            .unwrap_or_else(|| name.to_string()),
        average_price,
        price_source,
        average_rent,
        rent_source,
        annual_price_change,
        annual_rent_change,
        sale_trend: annual_price_change.map(classify_sale_trend),
        rent_trend: annual_rent_change.map(classify_rent_trend),
        rental_yield: rental_yield(average_price, average_rent),
        property_types,
        community: stats.map(|s| CommunitySummary {
            average_rent: s.average_rent,
            data_points: s.data_point_count,
        }),
    }
}

fn first_figure<const N: usize>(
    candidates: [(Option<f64>, FigureSource); N],
) -> (Option<f64>, Option<FigureSource>) {
    candidates
        .into_iter()
        .find_map(|(value, source)| value.map(|value| (Some(value), Some(source))))
        .unwrap_or((None, None))
}
