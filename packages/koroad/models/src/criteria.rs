//! Query scopes for the batch endpoints and the real-time risk index.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Largest page the provider will serve.
pub const MAX_ROWS_PER_PAGE: u32 = 1000;

/// Default page size for ordinary queries.
pub const DEFAULT_ROWS_PER_PAGE: u32 = 100;

/// Errors returned by [`SearchCriteria::validate`] and [`RouteInfo::multi_point`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCriteriaError {
    /// The year is not four ASCII digits.
    #[error("invalid search year {0:?}: expected 4 digits")]
    Year(String),
    /// The `siDo` code is not two ASCII digits.
    #[error("invalid siDo code {0:?}: expected 2 digits")]
    SiDo(String),
    /// The `guGun` code is not three ASCII digits.
    #[error("invalid guGun code {0:?}: expected 3 digits")]
    GuGun(String),
    /// Page size is zero or exceeds [`MAX_ROWS_PER_PAGE`].
    #[error("invalid numOfRows {0}: expected 1-{MAX_ROWS_PER_PAGE}")]
    NumOfRows(u32),
    /// Page numbers start at 1.
    #[error("invalid pageNo {0}: pages start at 1")]
    PageNo(u32),
    /// Page size is above the limit a client is configured for.
    #[error("numOfRows {num_of_rows} exceeds the configured limit of {max}")]
    ExceedsPageLimit {
        /// Requested page size.
        num_of_rows: u32,
        /// Configured maximum.
        max: u32,
    },
    /// A route needs at least two coordinates.
    #[error("a route needs at least 2 coordinates, got {0}")]
    TooFewCoordinates(usize),
    /// The route geometry is blank.
    #[error("route line string is empty")]
    EmptyLineString,
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Scope of one batch query: a year, an optional region, and a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    /// Four-digit search year (`searchYearCd`).
    pub year: String,
    /// Two-digit province code (e.g. `"11"` for Seoul).
    pub si_do: Option<String>,
    /// Three-digit district code (e.g. `"680"` for Gangnam-gu).
    pub gu_gun: Option<String>,
    /// Rows per page, `1..=1000`.
    pub num_of_rows: u32,
    /// 1-based page number.
    pub page_no: u32,
}

impl SearchCriteria {
    /// Creates criteria for `year` with no region, the default page size and
    /// the first page.
    #[must_use]
    pub fn new(year: impl Into<String>) -> Self {
        Self {
            year: year.into(),
            si_do: None,
            gu_gun: None,
            num_of_rows: DEFAULT_ROWS_PER_PAGE,
            page_no: 1,
        }
    }

    /// Restricts the query to one province/district pair.
    #[must_use]
    pub fn with_region(mut self, si_do: impl Into<String>, gu_gun: impl Into<String>) -> Self {
        self.si_do = Some(si_do.into());
        self.gu_gun = Some(gu_gun.into());
        self
    }

    #[must_use]
    pub const fn with_page_size(mut self, num_of_rows: u32) -> Self {
        self.num_of_rows = num_of_rows;
        self
    }

    #[must_use]
    pub const fn with_page(mut self, page_no: u32) -> Self {
        self.page_no = page_no;
        self
    }

    /// Same scope, following page.
    #[must_use]
    pub fn next_page(&self) -> Self {
        self.clone().with_page(self.page_no.saturating_add(1))
    }

    /// Largest allowed page, for bulk collection jobs.
    #[must_use]
    pub fn for_bulk_collection(
        year: impl Into<String>,
        si_do: impl Into<String>,
        gu_gun: impl Into<String>,
    ) -> Self {
        Self::new(year)
            .with_region(si_do, gu_gun)
            .with_page_size(MAX_ROWS_PER_PAGE)
    }

    /// Ten rows, for smoke tests against the live provider.
    #[must_use]
    pub fn for_testing(
        year: impl Into<String>,
        si_do: impl Into<String>,
        gu_gun: impl Into<String>,
    ) -> Self {
        Self::new(year).with_region(si_do, gu_gun).with_page_size(10)
    }

    /// `"{siDo}-{guGun}"`, with empty segments for a missing region.
    #[must_use]
    pub fn region_key(&self) -> String {
        format!(
            "{}-{}",
            self.si_do.as_deref().unwrap_or_default(),
            self.gu_gun.as_deref().unwrap_or_default()
        )
    }

    /// Checks the formats the provider accepts.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidCriteriaError`] found.
    pub fn validate(&self) -> Result<(), InvalidCriteriaError> {
        if !is_digits(&self.year, 4) {
            return Err(InvalidCriteriaError::Year(self.year.clone()));
        }
        if let Some(si_do) = &self.si_do {
            if !is_digits(si_do, 2) {
                return Err(InvalidCriteriaError::SiDo(si_do.clone()));
            }
        }
        if let Some(gu_gun) = &self.gu_gun {
            if !is_digits(gu_gun, 3) {
                return Err(InvalidCriteriaError::GuGun(gu_gun.clone()));
            }
        }
        if self.num_of_rows == 0 || self.num_of_rows > MAX_ROWS_PER_PAGE {
            return Err(InvalidCriteriaError::NumOfRows(self.num_of_rows));
        }
        if self.page_no == 0 {
            return Err(InvalidCriteriaError::PageNo(self.page_no));
        }
        Ok(())
    }

    /// [`Self::validate`], plus a page size no larger than `max_rows`.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidCriteriaError`] found.
    pub fn validate_with_limit(&self, max_rows: u32) -> Result<(), InvalidCriteriaError> {
        self.validate()?;
        if self.num_of_rows > max_rows {
            return Err(InvalidCriteriaError::ExceedsPageLimit {
                num_of_rows: self.num_of_rows,
                max: max_rows,
            });
        }
        Ok(())
    }
}

/// Vehicle class used by the real-time risk index (`vhctyCd`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum VehicleType {
    /// Passenger car, code `01`.
    Car,
    /// Bus, code `02`.
    Bus,
    /// Taxi, code `03`.
    Taxi,
    /// Freight truck, code `04`.
    Truck,
}

impl VehicleType {
    /// Returns the provider's two-digit code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Car => "01",
            Self::Bus => "02",
            Self::Taxi => "03",
            Self::Truck => "04",
        }
    }

    /// Parses a two-digit provider code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "01" => Some(Self::Car),
            "02" => Some(Self::Bus),
            "03" => Some(Self::Taxi),
            "04" => Some(Self::Truck),
            _ => None,
        }
    }

    /// Korean display name.
    #[must_use]
    pub const fn korean_name(self) -> &'static str {
        match self {
            Self::Car => "승용차",
            Self::Bus => "버스",
            Self::Taxi => "택시",
            Self::Truck => "화물차",
        }
    }
}

/// A longitude/latitude pair (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
}

/// Scope of a real-time risk index lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteInfo {
    /// `LineString(lon lat, lon lat, ...)` geometry.
    pub line_string: String,
    /// Vehicle class the index is computed for.
    pub vehicle_type: VehicleType,
}

impl RouteInfo {
    #[must_use]
    pub fn new(line_string: impl Into<String>, vehicle_type: VehicleType) -> Self {
        Self {
            line_string: line_string.into(),
            vehicle_type,
        }
    }

    #[must_use]
    pub fn for_car(line_string: impl Into<String>) -> Self {
        Self::new(line_string, VehicleType::Car)
    }

    #[must_use]
    pub fn for_bus(line_string: impl Into<String>) -> Self {
        Self::new(line_string, VehicleType::Bus)
    }

    #[must_use]
    pub fn for_taxi(line_string: impl Into<String>) -> Self {
        Self::new(line_string, VehicleType::Taxi)
    }

    #[must_use]
    pub fn for_truck(line_string: impl Into<String>) -> Self {
        Self::new(line_string, VehicleType::Truck)
    }

    /// Straight segment between two points.
    #[must_use]
    pub fn simple(start: Coordinate, end: Coordinate, vehicle_type: VehicleType) -> Self {
        Self::new(format_line_string(&[start, end]), vehicle_type)
    }

    /// Polyline through every point in order.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCriteriaError::TooFewCoordinates`] for fewer than two
    /// points.
    pub fn multi_point(
        points: &[Coordinate],
        vehicle_type: VehicleType,
    ) -> Result<Self, InvalidCriteriaError> {
        if points.len() < 2 {
            return Err(InvalidCriteriaError::TooFewCoordinates(points.len()));
        }
        Ok(Self::new(format_line_string(points), vehicle_type))
    }

    /// Rejects a blank geometry.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCriteriaError::EmptyLineString`] if the line string
    /// is empty or whitespace.
    pub fn validate(&self) -> Result<(), InvalidCriteriaError> {
        if self.line_string.trim().is_empty() {
            return Err(InvalidCriteriaError::EmptyLineString);
        }
        Ok(())
    }

    /// Parses the coordinates out of [`Self::line_string`]. Pairs that do not
    /// parse are skipped.
    #[must_use]
    pub fn coordinates(&self) -> Vec<Coordinate> {
        parse_line_string(&self.line_string)
    }
}

fn format_line_string(points: &[Coordinate]) -> String {
    let pairs: Vec<String> = points
        .iter()
        .map(|p| format!("{:.10} {:.10}", p.longitude, p.latitude))
        .collect();
    format!("LineString({})", pairs.join(", "))
}

/// Extracts `lon lat` pairs from a `LineString(...)` text.
#[must_use]
pub fn parse_line_string(text: &str) -> Vec<Coordinate> {
    let trimmed = text.trim();
    let body = trimmed
        .get(..10)
        .filter(|prefix| prefix.eq_ignore_ascii_case("linestring"))
        .map_or(trimmed, |_| &trimmed[10..]);
    let body = body.trim().trim_start_matches('(').trim_end_matches(')');

    body.split(',')
        .filter_map(|pair| {
            let mut parts = pair.split_whitespace();
            let longitude = parts.next()?.parse::<f64>().ok()?;
            let latitude = parts.next()?.parse::<f64>().ok()?;
            Some(Coordinate {
                longitude,
                latitude,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_of_hundred() {
        let criteria = SearchCriteria::new("2023");
        assert_eq!(criteria.num_of_rows, 100);
        assert_eq!(criteria.page_no, 1);
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn next_page_keeps_scope() {
        let criteria = SearchCriteria::for_bulk_collection("2022", "11", "680");
        let next = criteria.next_page();
        assert_eq!(next.page_no, 2);
        assert_eq!(next.num_of_rows, 1000);
        assert_eq!(next.region_key(), "11-680");
    }

    #[test]
    fn rejects_malformed_fields() {
        assert_eq!(
            SearchCriteria::new("23").validate(),
            Err(InvalidCriteriaError::Year("23".to_string()))
        );
        assert_eq!(
            SearchCriteria::new("2023").with_region("1", "680").validate(),
            Err(InvalidCriteriaError::SiDo("1".to_string()))
        );
        assert_eq!(
            SearchCriteria::new("2023").with_region("11", "68a").validate(),
            Err(InvalidCriteriaError::GuGun("68a".to_string()))
        );
        assert_eq!(
            SearchCriteria::new("2023").with_page_size(0).validate(),
            Err(InvalidCriteriaError::NumOfRows(0))
        );
        assert_eq!(
            SearchCriteria::new("2023").with_page_size(1001).validate(),
            Err(InvalidCriteriaError::NumOfRows(1001))
        );
        assert_eq!(
            SearchCriteria::new("2023").with_page(0).validate(),
            Err(InvalidCriteriaError::PageNo(0))
        );
    }

    #[test]
    fn configured_page_limit_is_enforced() {
        let criteria = SearchCriteria::new("2023").with_page_size(500);
        assert!(criteria.validate_with_limit(1000).is_ok());
        assert_eq!(
            criteria.validate_with_limit(200),
            Err(InvalidCriteriaError::ExceedsPageLimit {
                num_of_rows: 500,
                max: 200
            })
        );
        assert_eq!(
            SearchCriteria::new("20x3").validate_with_limit(200),
            Err(InvalidCriteriaError::Year("20x3".to_string()))
        );
    }

    #[test]
    fn blank_route_is_rejected() {
        assert_eq!(
            RouteInfo::for_taxi("   ").validate(),
            Err(InvalidCriteriaError::EmptyLineString)
        );
        assert_eq!(
            InvalidCriteriaError::EmptyLineString.to_string(),
            "route line string is empty"
        );
        assert!(RouteInfo::for_taxi("LineString(127.0 37.5, 127.1 37.6)").validate().is_ok());
    }

    #[test]
    fn region_key_without_region() {
        assert_eq!(SearchCriteria::new("2023").region_key(), "-");
    }

    #[test]
    fn vehicle_codes_roundtrip() {
        for vehicle in [
            VehicleType::Car,
            VehicleType::Bus,
            VehicleType::Taxi,
            VehicleType::Truck,
        ] {
            assert_eq!(VehicleType::from_code(vehicle.code()), Some(vehicle));
        }
        assert_eq!(VehicleType::from_code("05"), None);
    }

    #[test]
    fn parses_line_string_coordinates() {
        let route = RouteInfo::for_car(
            "LineString(126.9877427718531 37.571846624073224, 126.9878281347612 37.572345363517954)",
        );
        let coords = route.coordinates();
        assert_eq!(coords.len(), 2);
        assert!((coords[0].longitude - 126.987_742_771_853_1).abs() < 1e-9);
        assert!((coords[1].latitude - 37.572_345_363_517_954).abs() < 1e-9);
    }

    #[test]
    fn simple_route_formats_both_points() {
        let route = RouteInfo::simple(
            Coordinate {
                longitude: 127.0,
                latitude: 37.5,
            },
            Coordinate {
                longitude: 127.1,
                latitude: 37.6,
            },
            VehicleType::Bus,
        );
        assert!(route.line_string.starts_with("LineString(127.0000000000 37.5000000000,"));
        assert_eq!(route.coordinates().len(), 2);
        assert_eq!(route.vehicle_type.code(), "02");
    }

    #[test]
    fn multi_point_needs_two_points() {
        let one = [Coordinate {
            longitude: 127.0,
            latitude: 37.5,
        }];
        assert_eq!(
            RouteInfo::multi_point(&one, VehicleType::Car),
            Err(InvalidCriteriaError::TooFewCoordinates(1))
        );
    }
}
