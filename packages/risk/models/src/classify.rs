//! Pure risk classification rules.
//!
//! Every function here is total: out-of-domain input (negative numbers,
//! `NaN`, unknown grades, blank text) degrades to [`RiskLevel::Unknown`]
//! instead of failing. None of them hold state, so they can be called from
//! any thread without synchronization.

use crate::{RiskLevel, SCORE_CEILING};

/// Points added per recorded accident in [`from_accident_data`].
pub const ACCIDENT_WEIGHT: f64 = 2.0;

/// Points added per fatality-rate percentage point in [`from_accident_data`].
pub const FATALITY_WEIGHT: f64 = 5.0;

/// Maps the provider's road risk grade (1-4) to a level.
#[must_use]
pub const fn from_api_grade(grade: Option<i32>) -> RiskLevel {
    match grade {
        Some(1) => RiskLevel::Safe,
        Some(2) => RiskLevel::Caution,
        Some(3) => RiskLevel::Danger,
        Some(4) => RiskLevel::VeryDanger,
        _ => RiskLevel::Unknown,
    }
}

/// Finds the level whose score band contains `score`.
///
/// Bands are checked from `Safe` upward. Scores below zero or above
/// [`SCORE_CEILING`] match no band.
#[must_use]
pub fn from_score(score: f64) -> RiskLevel {
    if score < 0.0 {
        return RiskLevel::Unknown;
    }

    RiskLevel::RANKED
        .iter()
        .copied()
        .find(|level| level.score_band().contains(score))
        .unwrap_or(RiskLevel::Unknown)
}

/// Classifies a fatality rate expressed in percent.
///
/// Thresholds are checked from the top so a rate sitting exactly on a
/// boundary gets the more dangerous level.
#[must_use]
pub fn from_fatality_rate(rate_percent: f64) -> RiskLevel {
    if rate_percent >= 10.0 {
        RiskLevel::VeryDanger
    } else if rate_percent >= 5.0 {
        RiskLevel::Danger
    } else if rate_percent >= 2.0 {
        RiskLevel::Caution
    } else if rate_percent >= 0.0 {
        RiskLevel::Safe
    } else {
        RiskLevel::Unknown
    }
}

/// Deaths divided by casualties, in percent. Zero when there are no
/// casualties.
#[must_use]
pub fn fatality_rate(casualty_count: i32, death_count: i32) -> f64 {
    if casualty_count > 0 {
        f64::from(death_count) / f64::from(casualty_count) * 100.0
    } else {
        0.0
    }
}

/// Composite severity score used by [`from_accident_data`], capped at
/// [`SCORE_CEILING`].
#[must_use]
pub fn severity_score(accident_count: i32, casualty_count: i32, death_count: i32) -> f64 {
    let raw = f64::from(accident_count).mul_add(
        ACCIDENT_WEIGHT,
        fatality_rate(casualty_count, death_count) * FATALITY_WEIGHT,
    );
    raw.min(SCORE_CEILING)
}

/// Classifies an accident hotspot from its raw counts.
///
/// No accidents at all means `Safe`, not `Unknown`.
#[must_use]
pub fn from_accident_data(accident_count: i32, casualty_count: i32, death_count: i32) -> RiskLevel {
    if accident_count <= 0 {
        return RiskLevel::Safe;
    }

    from_score(severity_score(accident_count, casualty_count, death_count))
}

/// Parses a level from its enum name, Korean label, common English alias,
/// or numeric level. Case and surrounding whitespace are ignored.
#[must_use]
pub fn from_text(text: Option<&str>) -> RiskLevel {
    let Some(text) = text else {
        return RiskLevel::Unknown;
    };

    match text.trim().to_uppercase().as_str() {
        "VERY_DANGER" | "VERY_DANGEROUS" | "매우위험" | "4" => RiskLevel::VeryDanger,
        "DANGER" | "DANGEROUS" | "위험" | "3" => RiskLevel::Danger,
        "CAUTION" | "WARNING" | "주의" | "2" => RiskLevel::Caution,
        "SAFE" | "안전" | "1" => RiskLevel::Safe,
        _ => RiskLevel::Unknown,
    }
}
