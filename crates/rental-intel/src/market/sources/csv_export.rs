use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::{AreaFigures, PropertyTypeFigures, SourceAdapter, SourceError, SourceKind};
use crate::market::domain::PropertyType;

/// Wildcard period that resolves to the newest period present for a source and region.
pub const LATEST_PERIOD: &str = "latest";

/// One row of an official statistics export. Rows without a property type carry
/// area-level figures; typed rows contribute to the per-type breakdown.
#[derive(Debug, Clone, Deserialize)]
struct StatisticsRow {
    source: SourceKind,
    region: String,
    period: String,
    area: String,
    #[serde(default)]
    property_type: Option<PropertyType>,
    #[serde(default)]
    average_price: Option<f64>,
    #[serde(default)]
    average_rent: Option<f64>,
    #[serde(default)]
    annual_change: Option<f64>,
    #[serde(default)]
    transactions: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum CsvLoadError {
    #[error("unable to open statistics export: {0}")]
    Io(#[from] std::io::Error),
    #[error("statistics export row {line}: {source}")]
    Row { line: u64, source: csv::Error },
}

/// Serves snapshots out of a pre-loaded statistics CSV export.
pub struct CsvSourceAdapter {
    rows: Vec<StatisticsRow>,
}

impl CsvSourceAdapter {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CsvLoadError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CsvLoadError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut rows = Vec::new();
        for (index, row) in csv_reader.deserialize::<StatisticsRow>().enumerate() {
            let row = row.map_err(|source| CsvLoadError::Row {
                line: index as u64 + 2,
                source,
            })?;
            rows.push(row);
        }
        Ok(Self { rows })
    }

    fn resolve_period(&self, source: SourceKind, region: &str, period: &str) -> Option<String> {
        if period != LATEST_PERIOD {
            return Some(period.to_string());
        }
        self.rows
            .iter()
            .filter(|row| row.source == source && row.region.eq_ignore_ascii_case(region))
            .map(|row| row.period.clone())
            .max()
    }
}

#[async_trait::async_trait]
impl SourceAdapter for CsvSourceAdapter {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn fetch(
        &self,
        source: SourceKind,
        region: &str,
        period: &str,
    ) -> Result<Vec<AreaFigures>, SourceError> {
        let unavailable = || SourceError::Unavailable {
            kind: source,
            reason: format!("no rows for region '{region}' period '{period}'"),
        };
        let period = self
            .resolve_period(source, region, period)
            .ok_or_else(unavailable)?;

        let mut figures: Vec<AreaFigures> = Vec::new();
        for row in self.rows.iter().filter(|row| {
            row.source == source && row.region.eq_ignore_ascii_case(region) && row.period == period
        }) {
            let index = match figures.iter().position(|entry| entry.area == row.area) {
                Some(index) => index,
                None => {
                    figures.push(AreaFigures {
                        area: row.area.clone(),
                        ..AreaFigures::default()
                    });
                    figures.len() - 1
                }
            };
            let entry = &mut figures[index];

            match row.property_type {
                Some(kind) => entry.property_types.push(PropertyTypeFigures {
                    property_type: kind,
                    average_price: row.average_price,
                    average_rent: row.average_rent,
                }),
                None => {
                    entry.average_price = row.average_price;
                    entry.average_rent = row.average_rent;
                    entry.transactions = row.transactions;
                    match source {
                        SourceKind::RentalStatistics => {
                            entry.annual_rent_change = row.annual_change
                        }
                        _ => entry.annual_price_change = row.annual_change,
                    }
                }
            }
        }

        if figures.is_empty() {
            return Err(unavailable());
        }
        Ok(figures)
    }
}
