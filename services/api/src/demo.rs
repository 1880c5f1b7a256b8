use crate::infra::{in_memory_service, market_adapter, ApiService};
use clap::Args;
use rental_intel::config::{AppConfig, MarketConfig};
use rental_intel::error::AppError;
use rental_intel::market::{
    AnalysisParams, CandidateProperty, ContributionDraft, DashboardFilters, FixtureSourceAdapter,
    InvestmentCriteria, MarketAnalysis, MatchRequest, PropertyPreference, PropertyType,
    SourceAdapter, UserId, YieldRequest,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct AnalysisArgs {
    /// Area to focus on; omit for a market-wide view
    #[arg(long)]
    pub(crate) area: Option<String>,
    /// Restrict yields to one property type (flat, terraced, semi-detached, detached)
    #[arg(long, value_parser = parse_property_type)]
    pub(crate) property_type: Option<PropertyType>,
    /// Statistics period; defaults to the configured period
    #[arg(long)]
    pub(crate) period: Option<String>,
    /// Compare the area against its neighbours
    #[arg(long = "nearby")]
    pub(crate) include_nearby: bool,
    /// Print the full analysis as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Area used for the focused analysis step
    #[arg(long, default_value = "Manchester")]
    pub(crate) area: String,
    /// Minimum yield, in percent, for the investment step
    #[arg(long, default_value_t = 5.5)]
    pub(crate) min_yield: f64,
    /// Monthly budget for the property matching step
    #[arg(long, default_value_t = 900.0)]
    pub(crate) budget: f64,
}

fn parse_property_type(raw: &str) -> Result<PropertyType, String> {
    raw.parse()
}

pub(crate) async fn run_analysis_report(args: AnalysisArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let adapter = market_adapter(&config.market)?;
    let service = in_memory_service(adapter, &config.market);

    let analysis = service
        .generate_market_analysis(&AnalysisParams {
            area: args.area,
            property_type: args.property_type,
            period: args.period,
            include_nearby: args.include_nearby,
        })
        .await;

    if args.json {
        let rendered = serde_json::to_string_pretty(&analysis).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        render_analysis(&analysis);
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        area,
        min_yield,
        budget,
    } = args;

    let config = MarketConfig::default();
    let adapter: Arc<dyn SourceAdapter> = Arc::new(FixtureSourceAdapter::standard());
    let service = in_memory_service(adapter, &config);

    println!("Rental market intelligence demo");
    seed_contributions(&service);
    render_dashboard(&service)?;

    let analysis = service
        .generate_market_analysis(&AnalysisParams {
            area: Some(area.clone()),
            include_nearby: true,
            ..AnalysisParams::default()
        })
        .await;
    render_analysis(&analysis);

    let calculation = service
        .calculate_rental_yield(&YieldRequest {
            purchase_price: 180_000.0,
            monthly_rent: 1_050.0,
            area: Some(area.clone()),
        })
        .await;
    println!("\nYield check for a £180000 purchase let at £1050 per month");
    match calculation.rental_yield {
        Some(value) => println!("  - Gross yield: {value:.2}%"),
        None => println!("  - Gross yield: unavailable"),
    }
    if let Some(comparison) = &calculation.market_comparison {
        println!(
            "  - {} average {:.2}% ({:+.2} points, {:?})",
            comparison.area, comparison.area_yield, comparison.difference, comparison.verdict
        );
    }

    let criteria = InvestmentCriteria::for_user("demo-investor", min_yield);
    match service.generate_investment_recommendations(&criteria).await {
        Ok(outcome) => {
            println!(
                "\nInvestment recommendations at {min_yield:.1}% or better ({} saved)",
                outcome.saved_recommendation_count
            );
            for row in &outcome.recommendations {
                println!("  - {}", row.description);
            }
        }
        Err(err) => println!("\nInvestment recommendations unavailable: {err}"),
    }

    let matches = service.generate_property_recommendations(&MatchRequest {
        preferences: PropertyPreference {
            budget: Some(budget),
            location: Some(area.clone()),
            min_bedrooms: Some(2),
            must_have_features: vec!["washing machine".to_string()],
            university: Some("University of Manchester".to_string()),
            ..PropertyPreference::default()
        },
        candidates: sample_listings(),
        count: Some(3),
        include_reasons: true,
    });
    println!("\nTop property matches within £{budget:.0} per month");
    for matched in &matches {
        println!("  - {} scored {}", matched.property_id, matched.score);
        for reason in &matched.match_reasons {
            println!("      * {reason}");
        }
    }

    let stored = service
        .stored_recommendations(&UserId("demo-investor".to_string()))
        .map(|rows| rows.map_or(0, |rows| rows.len()))
        .unwrap_or(0);
    println!("\nStored recommendations for demo-investor: {stored}");
    Ok(())
}

fn seed_contributions(service: &ApiService) {
    let drafts = [
        ("M14 5TH", PropertyType::Flat, 2, 875.0, true),
        ("M14 6AB", PropertyType::Terraced, 4, 1_600.0, false),
        ("M13 9PL", PropertyType::Flat, 1, 725.0, true),
        ("M6 5PU", PropertyType::Terraced, 3, 1_150.0, false),
        ("LS6 1AA", PropertyType::Terraced, 5, 1_900.0, true),
    ];

    println!("\nTenant contributions");
    for (postcode, property_type, bedrooms, monthly_rent, bills_included) in drafts {
        let draft = ContributionDraft {
            submitter: None,
            postcode: postcode.to_string(),
            property_type,
            bedrooms,
            monthly_rent,
            bills_included,
            anonymous: true,
            notes: None,
        };
        match service.contribute(draft) {
            Ok(receipt) => println!(
                "  - {} {} at £{:.0}: {} now averages £{:.2} over {} contributions",
                receipt.record.postcode,
                property_type.label(),
                monthly_rent,
                receipt.statistics.area,
                receipt.statistics.average_rent,
                receipt.statistics.data_point_count
            ),
            Err(err) => println!("  - {postcode} rejected: {err}"),
        }
    }
}

fn render_dashboard(service: &ApiService) -> Result<(), AppError> {
    let dashboard = service
        .collect_market_dashboard_data(&DashboardFilters::default())?;

    println!("\nCommunity dashboard");
    if let Some(overall) = &dashboard.overall_stats {
        println!(
            "  - {} contributions, average £{:.2}, median £{:.2} (£{:.0} to £{:.0})",
            overall.total_contributions,
            overall.average_rent,
            overall.median_rent,
            overall.min_rent,
            overall.max_rent
        );
    }
    for area in &dashboard.area_breakdown {
        println!(
            "  - {}: {} data points, average £{:.2}",
            area.area, area.data_points, area.average_rent
        );
    }
    Ok(())
}

fn render_analysis(analysis: &MarketAnalysis) {
    let scope = analysis.area.as_deref().unwrap_or("all areas");
    println!(
        "\nMarket analysis for {scope} ({} / {})",
        analysis.region, analysis.period
    );

    if let Some(overview) = &analysis.overview {
        println!("  - Areas covered: {}", overview.areas_covered);
        if let Some(price) = overview.average_price {
            println!("  - Average price: £{price:.0}");
        }
        if let Some(rent) = overview.average_rent {
            println!("  - Average rent: £{rent:.2} per month");
        }
        if let Some(value) = overview.average_yield {
            println!("  - Average yield: {value:.2}%");
        }
        println!("  - Community data points: {}", overview.community_data_points);
    } else {
        println!("  - No market figures available");
    }

    if let Some(trends) = &analysis.trends {
        println!(
            "  - Sales {} / rents {}",
            trends.sale_trend.map_or("unknown", |band| band.label()),
            trends.rent_trend.map_or("unknown", |band| band.label())
        );
    }

    if !analysis.top_performing_areas.is_empty() {
        println!("  Top performing areas");
        for entry in &analysis.top_performing_areas {
            println!("    * {} ({}, score {})", entry.area, entry.sale_trend.label(), entry.score);
        }
    }

    if let Some(nearby) = &analysis.nearby {
        let names: Vec<&str> = nearby
            .neighbours
            .iter()
            .map(|neighbour| neighbour.area.as_str())
            .collect();
        println!("  Nearby: {}", names.join(", "));
    }

    for source in &analysis.unavailable_sources {
        println!("  ! {source} could not be loaded; figures may be incomplete");
    }
}

fn sample_listings() -> Vec<CandidateProperty> {
    let listing = |id: &str, address: &str, bedrooms: u32, rent: f64, features: &[&str]| {
        CandidateProperty {
            id: id.to_string(),
            title: format!("{bedrooms} bed near campus"),
            address: address.to_string(),
            city: Some("Manchester".to_string()),
            property_type: PropertyType::Flat,
            bedrooms,
            monthly_rent: rent,
            features: features.iter().map(|feature| feature.to_string()).collect(),
            bills_included: rent < 900.0,
            furnished: true,
            university: Some("University of Manchester".to_string()),
            nearby_universities: vec!["Manchester Metropolitan University".to_string()],
            distance_to_university: Some(0.4 * f64::from(bedrooms)),
        }
    };

    vec![
        listing("oxford-road-2", "Oxford Road", 2, 820.0, &["Washing machine", "Desk"]),
        listing("fallowfield-3", "Wilmslow Road, Fallowfield", 3, 990.0, &["Garden"]),
        listing("rusholme-2", "Dickenson Road, Rusholme", 2, 760.0, &["Washing machine"]),
        listing("didsbury-4", "Lapwing Lane, Didsbury", 4, 1_300.0, &["Parking"]),
    ]
}
