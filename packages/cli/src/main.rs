#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line client for the Koroad accident data gateway.
//!
//! Every command prints pretty JSON on stdout. Logs go to stderr and are
//! filtered with `RUST_LOG`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use safewalk_koroad::{KoroadApi as _, KoroadConfig, KoroadGateway};
use safewalk_koroad_models::{HotspotCategory, RouteInfo, SearchCriteria, VehicleType};
use safewalk_risk_models::{RiskLevel, classify};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "safewalk", about = "Traffic accident data and risk classification")]
struct Cli {
    /// TOML config file. Without it, `KOROAD_API_KEY` and
    /// `KOROAD_BASE_URL` are read from the environment.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the provider and report availability and latency
    Health,
    /// Fetch one resource for a year and region
    Fetch {
        resource: Resource,
        #[command(flatten)]
        criteria: CriteriaArgs,
        /// Follow pages until a short page or this many pages (hotspots only)
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// Look up the real-time risk index for a road segment
    RiskIndex {
        /// Geometry such as `"LineString(127.0 37.5, 127.1 37.6)"`
        #[arg(long)]
        line_string: String,
        /// Vehicle class (car, bus, taxi, truck)
        #[arg(long, default_value = "car")]
        vehicle: VehicleType,
    },
    /// Fetch all six batch resources for a region concurrently
    Collect {
        #[command(flatten)]
        criteria: CriteriaArgs,
    },
    /// Classify values without calling the provider
    Classify {
        #[command(subcommand)]
        input: ClassifyInput,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Resource {
    Pedestrian,
    ElderlyPedestrian,
    LocalGovernment,
    Holiday,
    Statistics,
    RiskAreas,
}

impl Resource {
    const fn hotspot_category(self) -> Option<HotspotCategory> {
        match self {
            Self::Pedestrian => Some(HotspotCategory::Pedestrian),
            Self::ElderlyPedestrian => Some(HotspotCategory::ElderlyPedestrian),
            Self::LocalGovernment => Some(HotspotCategory::LocalGovernment),
            Self::Holiday => Some(HotspotCategory::Holiday),
            Self::Statistics | Self::RiskAreas => None,
        }
    }
}

#[derive(Args)]
struct CriteriaArgs {
    /// Four-digit search year (e.g., "2023")
    #[arg(long)]
    year: String,
    /// Two-digit province code (e.g., "11" for Seoul)
    #[arg(long)]
    si_do: Option<String>,
    /// Three-digit district code (e.g., "680" for Gangnam-gu)
    #[arg(long)]
    gu_gun: Option<String>,
    /// Rows per page; defaults to `default_page_size` from the config
    #[arg(long)]
    rows: Option<u32>,
    /// 1-based page number
    #[arg(long, default_value = "1")]
    page: u32,
}

impl CriteriaArgs {
    fn to_criteria(&self, config: &KoroadConfig) -> SearchCriteria {
        let mut criteria = config.search_criteria(self.year.clone()).with_page(self.page);
        criteria.si_do.clone_from(&self.si_do);
        criteria.gu_gun.clone_from(&self.gu_gun);
        if let Some(rows) = self.rows {
            criteria = criteria.with_page_size(rows);
        }
        criteria
    }
}

#[derive(Subcommand)]
enum ClassifyInput {
    /// Provider road risk grade (1-4)
    Grade { grade: i32 },
    /// Composite score (0-100)
    Score {
        #[arg(allow_negative_numbers = true)]
        score: f64,
    },
    /// Fatality rate in percent
    Fatality {
        #[arg(allow_negative_numbers = true)]
        rate: f64,
    },
    /// Raw accident, casualty, and death counts
    Accidents {
        accidents: i32,
        casualties: i32,
        deaths: i32,
    },
    /// Level name, Korean label, or numeric level
    Text { text: String },
}

impl ClassifyInput {
    fn classify(&self) -> RiskLevel {
        match self {
            Self::Grade { grade } => classify::from_api_grade(Some(*grade)),
            Self::Score { score } => classify::from_score(*score),
            Self::Fatality { rate } => classify::from_fatality_rate(*rate),
            Self::Accidents {
                accidents,
                casualties,
                deaths,
            } => classify::from_accident_data(*accidents, *casualties, *deaths),
            Self::Text { text } => classify::from_text(Some(text)),
        }
    }
}

/// A level with the lookups downstream features display.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Assessment {
    level: RiskLevel,
    label: &'static str,
    color_code: &'static str,
    message: &'static str,
    recommended_speed_limit: u8,
    recommended_action: &'static str,
    pedestrian_safety_guide: &'static str,
    requires_notification: bool,
}

impl From<RiskLevel> for Assessment {
    fn from(level: RiskLevel) -> Self {
        Self {
            level,
            label: level.label(),
            color_code: level.color_code(),
            message: level.message(),
            recommended_speed_limit: level.recommended_speed_limit(),
            recommended_action: level.recommended_action(),
            pedestrian_safety_guide: level.pedestrian_safety_guide(),
            requires_notification: level.requires_notification(),
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<KoroadConfig, safewalk_koroad::KoroadError> {
    path.map_or_else(KoroadConfig::from_env, |path| KoroadConfig::from_file(path))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    if let Commands::Classify { input } = &cli.command {
        return print_json(&Assessment::from(input.classify()));
    }

    let gateway = KoroadGateway::new(load_config(cli.config.as_ref())?)?;

    match cli.command {
        Commands::Health => print_json(&gateway.health_status().await)?,
        Commands::Fetch {
            resource,
            criteria,
            max_pages,
        } => {
            let criteria = criteria.to_criteria(gateway.config());
            match (resource.hotspot_category(), max_pages) {
                (Some(category), Some(max_pages)) => print_json(
                    &gateway
                        .fetch_all_pages(category, &criteria, max_pages)
                        .await?,
                )?,
                (Some(category), None) => {
                    print_json(&gateway.fetch_accidents(category, &criteria).await?)?;
                }
                (None, _) => {
                    if max_pages.is_some() {
                        log::warn!("--max-pages only applies to hotspot resources; ignoring");
                    }
                    if matches!(resource, Resource::Statistics) {
                        print_json(&gateway.accident_statistics(&criteria).await?)?;
                    } else {
                        print_json(&gateway.link_risk_areas(&criteria).await?)?;
                    }
                }
            }
        }
        Commands::RiskIndex {
            line_string,
            vehicle,
        } => {
            let route = RouteInfo::new(line_string, vehicle);
            print_json(&gateway.real_time_risk_index(&route).await?)?;
        }
        Commands::Collect { criteria } => {
            let report = gateway
                .collect_region(&criteria.to_criteria(gateway.config()))
                .await?;
            log::info!(
                "Highest risk level: {}",
                report.highest_risk_level().display_string()
            );
            print_json(&report)?;
        }
        Commands::Classify { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_fetch_arguments() {
        let cli = Cli::parse_from([
            "safewalk",
            "fetch",
            "elderly-pedestrian",
            "--year",
            "2023",
            "--si-do",
            "11",
            "--gu-gun",
            "680",
            "--max-pages",
            "5",
        ]);
        let Commands::Fetch {
            resource,
            criteria,
            max_pages,
        } = cli.command
        else {
            panic!("expected fetch");
        };
        assert_eq!(
            resource.hotspot_category(),
            Some(HotspotCategory::ElderlyPedestrian)
        );
        assert_eq!(max_pages, Some(5));
        let criteria = criteria.to_criteria(&KoroadConfig::with_api_key("abc"));
        assert_eq!(criteria.region_key(), "11-680");
        assert_eq!(criteria.num_of_rows, 100);
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn rows_default_to_configured_page_size() {
        let mut config = KoroadConfig::with_api_key("abc");
        config.default_page_size = 500;

        let cli = Cli::parse_from(["safewalk", "collect", "--year", "2023", "--page", "3"]);
        let Commands::Collect { criteria } = cli.command else {
            panic!("expected collect");
        };
        let built = criteria.to_criteria(&config);
        assert_eq!(built.num_of_rows, 500);
        assert_eq!(built.page_no, 3);
        assert_eq!(built.si_do, None);

        let cli = Cli::parse_from(["safewalk", "collect", "--year", "2023", "--rows", "20"]);
        let Commands::Collect { criteria } = cli.command else {
            panic!("expected collect");
        };
        assert_eq!(criteria.to_criteria(&config).num_of_rows, 20);
    }

    #[test]
    fn parses_vehicle_case_insensitively() {
        let cli = Cli::parse_from([
            "safewalk",
            "risk-index",
            "--line-string",
            "LineString(127.0 37.5, 127.1 37.6)",
            "--vehicle",
            "bus",
        ]);
        assert!(matches!(
            cli.command,
            Commands::RiskIndex {
                vehicle: VehicleType::Bus,
                ..
            }
        ));
    }

    #[test]
    fn classify_commands_use_pure_rules() {
        let cli = Cli::parse_from(["safewalk", "classify", "accidents", "50", "10", "10"]);
        let Commands::Classify { input } = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(input.classify(), RiskLevel::VeryDanger);

        let cli = Cli::parse_from(["safewalk", "classify", "score", "-1"]);
        let Commands::Classify { input } = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(input.classify(), RiskLevel::Unknown);
    }

    #[test]
    fn assessment_serializes_lookups() {
        let json = serde_json::to_value(Assessment::from(RiskLevel::Danger)).unwrap();
        assert_eq!(json["level"], "DANGER");
        assert_eq!(json["recommendedSpeedLimit"], 30);
        assert_eq!(json["requiresNotification"], true);
    }
}
