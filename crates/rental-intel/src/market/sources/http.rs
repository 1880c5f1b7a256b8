use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{AreaFigures, PropertyTypeFigures, SourceAdapter, SourceError, SourceKind};
use crate::market::domain::PropertyType;

/// Fetches published statistics over HTTP and normalizes each feed's own shape.
pub struct HttpSourceAdapter {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpSourceAdapter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!("rental-intel/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| SourceError::Unavailable {
                kind: SourceKind::HousePriceIndex,
                reason: format!("http client could not be built: {err}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, source: SourceKind) -> String {
        format!("{}/{}", self.base_url, source.path())
    }
}

#[async_trait::async_trait]
impl SourceAdapter for HttpSourceAdapter {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(
        &self,
        source: SourceKind,
        region: &str,
        period: &str,
    ) -> Result<Vec<AreaFigures>, SourceError> {
        let url = self.url(source);
        debug!(%url, region, period, "fetching market source");

        let response = self
            .client
            .get(&url)
            .query(&[("region", region), ("period", period)])
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SourceError::Timeout {
                        kind: source,
                        after: self.timeout,
                    }
                } else {
                    SourceError::Unavailable {
                        kind: source,
                        reason: err.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            return Err(SourceError::Unavailable {
                kind: source,
                reason: format!("HTTP {}", response.status()),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| SourceError::Unavailable {
                kind: source,
                reason: err.to_string(),
            })?;

        normalize(source, &body)
    }
}

pub(crate) fn normalize(source: SourceKind, body: &str) -> Result<Vec<AreaFigures>, SourceError> {
    let malformed = |err: serde_json::Error| SourceError::Malformed {
        kind: source,
        reason: err.to_string(),
    };

    match source {
        SourceKind::HousePriceIndex => serde_json::from_str::<HpiPayload>(body)
            .map(HpiPayload::into_figures)
            .map_err(malformed),
        SourceKind::RentalStatistics => serde_json::from_str::<RentalPayload>(body)
            .map(RentalPayload::into_figures)
            .map_err(malformed),
        SourceKind::PricePaid => serde_json::from_str::<PricePaidPayload>(body)
            .map(PricePaidPayload::into_figures)
            .map_err(malformed),
    }
}

#[derive(Debug, Deserialize)]
struct HpiPayload {
    data: Vec<HpiRow>,
}

#[derive(Debug, Deserialize)]
struct HpiRow {
    region_name: String,
    average_price: Option<f64>,
    annual_change: Option<f64>,
    #[serde(default)]
    property_types: Vec<HpiTypeRow>,
}

#[derive(Debug, Deserialize)]
struct HpiTypeRow {
    #[serde(rename = "type")]
    kind: PropertyType,
    average_price: Option<f64>,
}

impl HpiPayload {
    fn into_figures(self) -> Vec<AreaFigures> {
        self.data
            .into_iter()
            .map(|row| AreaFigures {
                area: row.region_name,
                average_price: row.average_price,
                annual_price_change: row.annual_change,
                property_types: row
                    .property_types
                    .into_iter()
                    .map(|entry| PropertyTypeFigures {
                        property_type: entry.kind,
                        average_price: entry.average_price,
                        average_rent: None,
                    })
                    .collect(),
                ..AreaFigures::default()
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RentalPayload {
    areas: Vec<RentalRow>,
}

#[derive(Debug, Deserialize)]
struct RentalRow {
    name: String,
    median_monthly_rent: Option<f64>,
    annual_change_pct: Option<f64>,
    #[serde(default)]
    by_type: BTreeMap<PropertyType, f64>,
}

impl RentalPayload {
    fn into_figures(self) -> Vec<AreaFigures> {
        self.areas
            .into_iter()
            .map(|row| AreaFigures {
                area: row.name,
                average_rent: row.median_monthly_rent,
                annual_rent_change: row.annual_change_pct,
                property_types: row
                    .by_type
                    .into_iter()
                    .map(|(kind, rent)| PropertyTypeFigures {
                        property_type: kind,
                        average_price: None,
                        average_rent: Some(rent),
                    })
                    .collect(),
                ..AreaFigures::default()
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct PricePaidPayload {
    transactions: Vec<PricePaidRow>,
}

#[derive(Debug, Deserialize)]
struct PricePaidRow {
    town: String,
    price: f64,
    /// Land Registry codes: F, T, S, D, O.
    property_type: String,
}

impl PricePaidPayload {
    fn into_figures(self) -> Vec<AreaFigures> {
        let mut towns: Vec<(String, Vec<(PropertyType, f64)>)> = Vec::new();
        for row in self.transactions {
            let kind = match row.property_type.trim().to_ascii_uppercase().as_str() {
                "F" => PropertyType::Flat,
                "T" => PropertyType::Terraced,
                "S" => PropertyType::SemiDetached,
                "D" => PropertyType::Detached,
                _ => PropertyType::Other,
            };
            match towns.iter_mut().find(|(town, _)| town.eq_ignore_ascii_case(&row.town)) {
                Some((_, sales)) => sales.push((kind, row.price)),
                None => towns.push((row.town, vec![(kind, row.price)])),
            }
        }

        towns
            .into_iter()
            .map(|(town, sales)| {
                let prices: Vec<f64> = sales.iter().map(|(_, price)| *price).collect();
                let property_types = PropertyType::ordered()
                    .into_iter()
                    .filter_map(|kind| {
                        let prices: Vec<f64> = sales
                            .iter()
                            .filter(|(sale_kind, _)| *sale_kind == kind)
                            .map(|(_, price)| *price)
                            .collect();
                        crate::market::statistics::mean(&prices).map(|average| {
                            PropertyTypeFigures {
                                property_type: kind,
                                average_price: Some(average),
                                average_rent: None,
                            }
                        })
                    })
                    .collect();
                AreaFigures {
                    area: town,
                    average_price: crate::market::statistics::mean(&prices),
                    transactions: Some(prices.len() as u32),
                    property_types,
                    ..AreaFigures::default()
                }
            })
            .collect()
    }
}
