#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Normalized records for the Koroad (Korea Road Traffic Authority) open
//! traffic-accident data service.
//!
//! The provider exposes six batch resources plus a real-time road risk
//! index. Every wire shape is normalized into the records in this crate
//! before anything downstream (map layers, alerting) sees it.

pub mod criteria;

use safewalk_risk_models::{RiskLevel, classify};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use criteria::{
    Coordinate, InvalidCriteriaError, RouteInfo, SearchCriteria, VehicleType,
};

/// One provider resource, identified by its fixed path.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Endpoint {
    /// Pedestrian accident hotspots.
    PedestrianAccidents,
    /// Elderly pedestrian accident hotspots.
    ElderlyPedestrianAccidents,
    /// Accident hotspots per local government.
    LocalGovernmentAccidents,
    /// Accident hotspots during public holidays.
    HolidayAccidents,
    /// Yearly accident statistics per local government.
    AccidentStatistics,
    /// Link-based accident risk areas.
    LinkRiskAreas,
    /// Real-time road risk index per link.
    RoadRiskIndex,
}

impl Endpoint {
    /// Path relative to the provider base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::PedestrianAccidents => "/frequentzone/pedstrians",
            Self::ElderlyPedestrianAccidents => "/frequentzone/oldman",
            Self::LocalGovernmentAccidents => "/frequentzone/lg",
            Self::HolidayAccidents => "/frequentzone/tmzon",
            Self::AccidentStatistics => "/stt",
            Self::LinkRiskAreas => "/accident/riskArea",
            Self::RoadRiskIndex => "/road/dgdgr/link",
        }
    }

    /// Korean service name as listed by the provider.
    #[must_use]
    pub const fn korean_name(self) -> &'static str {
        match self {
            Self::PedestrianAccidents => "보행자 사고다발지역정보",
            Self::ElderlyPedestrianAccidents => "보행노인 사고다발지역정보",
            Self::LocalGovernmentAccidents => "지자체별 사고다발지역정보",
            Self::HolidayAccidents => "연휴기간별 사고다발지역정보",
            Self::AccidentStatistics => "지자체별 대상사고통계",
            Self::LinkRiskAreas => "링크기반 사고위험지역정보",
            Self::RoadRiskIndex => "세부링크 도로위험지수정보",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::PedestrianAccidents,
            Self::ElderlyPedestrianAccidents,
            Self::LocalGovernmentAccidents,
            Self::HolidayAccidents,
            Self::AccidentStatistics,
            Self::LinkRiskAreas,
            Self::RoadRiskIndex,
        ]
    }
}

/// The four hotspot resources that share the [`AccidentData`] shape.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum HotspotCategory {
    Pedestrian,
    ElderlyPedestrian,
    LocalGovernment,
    Holiday,
}

impl HotspotCategory {
    #[must_use]
    pub const fn endpoint(self) -> Endpoint {
        match self {
            Self::Pedestrian => Endpoint::PedestrianAccidents,
            Self::ElderlyPedestrian => Endpoint::ElderlyPedestrianAccidents,
            Self::LocalGovernment => Endpoint::LocalGovernmentAccidents,
            Self::Holiday => Endpoint::HolidayAccidents,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Pedestrian,
            Self::ElderlyPedestrian,
            Self::LocalGovernment,
            Self::Holiday,
        ]
    }
}

fn count_or_zero(value: Option<u32>) -> i32 {
    value.map_or(0, |v| i32::try_from(v).unwrap_or(i32::MAX))
}

/// Sums the present counts, saturating at `u32::MAX`.
fn saturating_total(counts: &[Option<u32>]) -> u32 {
    counts
        .iter()
        .flatten()
        .fold(0_u32, |total, count| total.saturating_add(*count))
}

fn ratio_percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole) * 100.0
    }
}

/// A normalized accident hotspot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidentData {
    /// Hotspot feature ID (`afos_fid`).
    pub afos_fid: Option<String>,
    /// Hotspot area ID (`afos_id`).
    pub afos_id: Option<String>,
    /// Legal-dong code (`bjd_cd`).
    pub legal_dong_code: Option<String>,
    /// Spot code (`spot_cd`).
    pub spot_code: Option<String>,
    /// Province and district, e.g. `"서울특별시 강남구"`.
    pub region_name: Option<String>,
    /// Spot description, e.g. `"역삼동 (선릉역사거리 부근)"`.
    pub spot_name: Option<String>,
    pub accident_count: Option<u32>,
    pub casualty_count: Option<u32>,
    pub death_count: Option<u32>,
    pub serious_injury_count: Option<u32>,
    pub minor_injury_count: Option<u32>,
    pub injury_report_count: Option<u32>,
    /// Longitude (EPSG:4326).
    pub longitude: Option<f64>,
    /// Latitude (EPSG:4326).
    pub latitude: Option<f64>,
    /// Hotspot polygon as GeoJSON text.
    pub geometry_json: Option<String>,
    /// Which hotspot resource produced this record.
    pub api_type: HotspotCategory,
}

impl AccidentData {
    /// Deaths over casualties, in percent.
    #[must_use]
    pub fn fatality_rate(&self) -> f64 {
        classify::fatality_rate(
            count_or_zero(self.casualty_count),
            count_or_zero(self.death_count),
        )
    }

    /// Deaths plus serious injuries over casualties, in percent.
    #[must_use]
    pub fn serious_injury_rate(&self) -> f64 {
        let serious = saturating_total(&[self.death_count, self.serious_injury_count]);
        ratio_percent(serious, self.casualty_count.unwrap_or(0))
    }

    /// Classifies the hotspot from its accident, casualty and death counts.
    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        classify::from_accident_data(
            count_or_zero(self.accident_count),
            count_or_zero(self.casualty_count),
            count_or_zero(self.death_count),
        )
    }

    /// Both coordinates present and within WGS84 bounds.
    #[must_use]
    pub fn has_valid_location(&self) -> bool {
        matches!(
            (self.longitude, self.latitude),
            (Some(lon), Some(lat)) if (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat)
        )
    }
}

/// Yearly accident statistics for one classification and region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidentStatisticsData {
    pub standard_year: Option<String>,
    /// Accident classification, e.g. `"보행노인사고"`.
    pub accident_classification_name: Option<String>,
    pub region_name: Option<String>,
    pub accident_count: Option<u32>,
    /// Share of the national accident count, in percent.
    pub accident_count_ratio: Option<f64>,
    pub death_count: Option<u32>,
    pub death_count_ratio: Option<f64>,
    /// Deaths per 100 accidents.
    pub fatality_rate: Option<f64>,
    pub injured_person_count: Option<u32>,
    pub injured_person_count_ratio: Option<f64>,
    pub total_accident_count: Option<u32>,
    pub total_death_count: Option<u32>,
    pub total_injured_person_count: Option<u32>,
    pub accidents_per_100k_population: Option<f64>,
    pub accidents_per_10k_vehicles: Option<f64>,
    pub speeding_count: Option<u32>,
    pub center_line_violation_count: Option<u32>,
    pub signal_violation_count: Option<u32>,
    pub safe_distance_violation_count: Option<u32>,
    pub safe_driving_violation_count: Option<u32>,
    pub intersection_violation_count: Option<u32>,
    pub pedestrian_protection_violation_count: Option<u32>,
    pub other_violation_count: Option<u32>,
    pub vehicle_vs_pedestrian_count: Option<u32>,
    pub vehicle_vs_vehicle_count: Option<u32>,
    pub single_vehicle_count: Option<u32>,
    pub railway_crossing_count: Option<u32>,
}

impl AccidentStatisticsData {
    /// Sum of the eight law-violation sub-counts.
    #[must_use]
    pub fn total_violation_count(&self) -> u32 {
        saturating_total(&[
            self.speeding_count,
            self.center_line_violation_count,
            self.signal_violation_count,
            self.safe_distance_violation_count,
            self.safe_driving_violation_count,
            self.intersection_violation_count,
            self.pedestrian_protection_violation_count,
            self.other_violation_count,
        ])
    }

    /// Sum of the four accident-type sub-counts.
    #[must_use]
    pub fn total_accident_type_count(&self) -> u32 {
        saturating_total(&[
            self.vehicle_vs_pedestrian_count,
            self.vehicle_vs_vehicle_count,
            self.single_vehicle_count,
            self.railway_crossing_count,
        ])
    }

    /// Vehicle-vs-pedestrian accidents plus pedestrian-protection violations
    /// over all accidents, in percent.
    #[must_use]
    pub fn pedestrian_accident_ratio(&self) -> f64 {
        let pedestrian = saturating_total(&[
            self.vehicle_vs_pedestrian_count,
            self.pedestrian_protection_violation_count,
        ]);
        ratio_percent(pedestrian, self.accident_count.unwrap_or(0))
    }

    /// Classifies the region from the published fatality rate.
    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        self.fatality_rate
            .map_or(RiskLevel::Unknown, classify::from_fatality_rate)
    }
}

/// A link-based accident risk area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAreaData {
    pub risk_area_name: Option<String>,
    pub total_accident_count: Option<u32>,
    pub total_death_count: Option<u32>,
    pub total_serious_injury_count: Option<u32>,
    pub total_minor_injury_count: Option<u32>,
    pub total_injury_report_count: Option<u32>,
    /// Cause-analysis tags in provider order.
    pub accident_analysis_types: Vec<String>,
    /// Center point X in UTM-K.
    pub center_point_utmk_x: Option<f64>,
    /// Center point Y in UTM-K.
    pub center_point_utmk_y: Option<f64>,
    /// Area polygon as well-known text.
    pub geometry_wkt: Option<String>,
}

impl RiskAreaData {
    /// Deaths plus all injury classes.
    #[must_use]
    pub fn total_casualty_count(&self) -> u32 {
        saturating_total(&[
            self.total_death_count,
            self.total_serious_injury_count,
            self.total_minor_injury_count,
            self.total_injury_report_count,
        ])
    }

    /// Deaths over total casualties, in percent.
    #[must_use]
    pub fn fatality_rate(&self) -> f64 {
        ratio_percent(self.total_death_count.unwrap_or(0), self.total_casualty_count())
    }

    /// First cause-analysis tag, if any.
    #[must_use]
    pub fn primary_cause(&self) -> Option<&str> {
        self.accident_analysis_types.first().map(String::as_str)
    }

    /// Classifies the area from its totals.
    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        classify::from_accident_data(
            count_or_zero(self.total_accident_count),
            count_or_zero(Some(self.total_casualty_count())),
            count_or_zero(self.total_death_count),
        )
    }
}

/// Real-time risk index for one road link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskIndexData {
    pub index: Option<i64>,
    /// Link geometry as `LineString(...)` text.
    pub line_string: Option<String>,
    pub analysis_value: Option<f64>,
    /// Provider grade, 1 (safe) to 4 (very dangerous).
    pub analysis_grade: Option<i32>,
    /// Level derived from [`Self::analysis_grade`].
    pub risk_level: RiskLevel,
}

impl RiskIndexData {
    /// Grade rescaled to a 0-100 score (25 per grade step).
    #[must_use]
    pub fn risk_score(&self) -> f64 {
        match self.analysis_grade {
            Some(1) => 25.0,
            Some(2) => 50.0,
            Some(3) => 75.0,
            Some(4) => 100.0,
            _ => 0.0,
        }
    }
}

/// Snapshot of provider availability. Rebuilt on every probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealthStatus {
    pub available: bool,
    /// When the probe ran, in milliseconds since the Unix epoch.
    pub last_checked_epoch_millis: i64,
    /// Round trip of a separate timing probe, in milliseconds.
    pub response_time_millis: u64,
}

/// Every batch resource for one [`SearchCriteria`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionAccidentReport {
    pub pedestrian: Vec<AccidentData>,
    pub elderly_pedestrian: Vec<AccidentData>,
    pub local_government: Vec<AccidentData>,
    pub holiday: Vec<AccidentData>,
    pub statistics: Vec<AccidentStatisticsData>,
    pub risk_areas: Vec<RiskAreaData>,
}

impl RegionAccidentReport {
    /// All hotspot records regardless of category.
    pub fn hotspots(&self) -> impl Iterator<Item = &AccidentData> {
        self.pedestrian
            .iter()
            .chain(&self.elderly_pedestrian)
            .chain(&self.local_government)
            .chain(&self.holiday)
    }

    /// Total number of records across all resources.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.hotspots().count() + self.statistics.len() + self.risk_areas.len()
    }

    /// The most dangerous level among hotspots and risk areas, or `Unknown`
    /// when the report is empty.
    #[must_use]
    pub fn highest_risk_level(&self) -> RiskLevel {
        self.hotspots()
            .map(AccidentData::risk_level)
            .chain(self.risk_areas.iter().map(RiskAreaData::risk_level))
            .max()
            .unwrap_or(RiskLevel::Unknown)
    }
}
