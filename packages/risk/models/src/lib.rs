#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Traffic risk tiers and score band definitions.
//!
//! Every locality, accident hotspot, and road segment handled by safewalk is
//! eventually reduced to one [`RiskLevel`]. The [`classify`] module holds the
//! pure rules that produce a level from provider grades, composite scores,
//! fatality rates, raw accident counts, or free text.

pub mod classify;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Highest score any band accepts.
pub const SCORE_CEILING: f64 = 100.0;

/// Inclusive score interval owned by exactly one [`RiskLevel`].
///
/// Integer scores fall in exactly `[min, max]`. A fractional score that lands
/// between one band's `max` and the next band's `min` (e.g. `39.5`) belongs to
/// the lower band, so the four real bands tile `[0, 100]` without gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreBand {
    /// Lowest score in the band.
    pub min: i16,
    /// Highest integer score in the band.
    pub max: i16,
}

impl ScoreBand {
    /// The band owned by [`RiskLevel::Unknown`]. It contains no score.
    pub const SENTINEL: Self = Self { min: -1, max: -1 };

    /// Returns `true` if `score` belongs to this band.
    #[must_use]
    pub fn contains(self, score: f64) -> bool {
        if self == Self::SENTINEL {
            return false;
        }
        let lower = f64::from(self.min);
        let upper = f64::from(self.max);
        if upper >= SCORE_CEILING {
            return score >= lower && score <= upper;
        }
        score >= lower && score < upper + 1.0
    }
}

/// Ordinal traffic risk tier.
///
/// Variants are declared in ascending order of danger so the derived
/// [`Ord`] matches [`RiskLevel::level`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// No usable data; risk cannot be assessed.
    #[default]
    Unknown = 0,
    /// Provider grade 1, fatality rate under 2%.
    Safe = 1,
    /// Provider grade 2, fatality rate 2-5%.
    Caution = 2,
    /// Provider grade 3, fatality rate 5-10%.
    Danger = 3,
    /// Provider grade 4, fatality rate of 10% or more.
    VeryDanger = 4,
}

impl RiskLevel {
    /// Every level, `Unknown` first, in ascending order of danger.
    pub const ALL: &'static [Self] = &[
        Self::Unknown,
        Self::Safe,
        Self::Caution,
        Self::Danger,
        Self::VeryDanger,
    ];

    /// The four assessable levels in band order (`Safe` first).
    pub const RANKED: &'static [Self] = &[Self::Safe, Self::Caution, Self::Danger, Self::VeryDanger];

    /// Returns the numeric level (0 for `Unknown` up to 4).
    #[must_use]
    pub const fn level(self) -> u8 {
        self as u8
    }

    /// Returns the score band owned by this level.
    #[must_use]
    pub const fn score_band(self) -> ScoreBand {
        match self {
            Self::Unknown => ScoreBand::SENTINEL,
            Self::Safe => ScoreBand { min: 0, max: 39 },
            Self::Caution => ScoreBand { min: 40, max: 69 },
            Self::Danger => ScoreBand { min: 70, max: 89 },
            Self::VeryDanger => ScoreBand { min: 90, max: 100 },
        }
    }

    /// Korean display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "알수없음",
            Self::Safe => "안전",
            Self::Caution => "주의",
            Self::Danger => "위험",
            Self::VeryDanger => "매우위험",
        }
    }

    /// Hex color used by map layers.
    #[must_use]
    pub const fn color_code(self) -> &'static str {
        match self {
            Self::Unknown => "#808080",
            Self::Safe => "#00FF00",
            Self::Caution => "#FFFF00",
            Self::Danger => "#FF8000",
            Self::VeryDanger => "#FF0000",
        }
    }

    /// Short user-facing message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Unknown => "위험도 평가 불가",
            Self::Safe => "상대적으로 안전",
            Self::Caution => "주의 필요",
            Self::Danger => "각별한 주의 필요",
            Self::VeryDanger => "즉시 주의 필요",
        }
    }

    /// Label and message combined, e.g. `"주의 (주의 필요)"`.
    #[must_use]
    pub fn display_string(self) -> String {
        format!("{} ({})", self.label(), self.message())
    }

    #[must_use]
    pub const fn is_more_dangerous_than(self, other: Self) -> bool {
        self.level() > other.level()
    }

    #[must_use]
    pub const fn is_safer_than(self, other: Self) -> bool {
        self.level() < other.level()
    }

    /// `Danger` or worse.
    #[must_use]
    pub const fn is_dangerous(self) -> bool {
        self.level() >= Self::Danger.level()
    }

    /// `Caution` or worse.
    #[must_use]
    pub const fn requires_caution(self) -> bool {
        self.level() >= Self::Caution.level()
    }

    /// `Caution` or worse.
    #[must_use]
    pub const fn requires_notification(self) -> bool {
        self.level() >= Self::Caution.level()
    }

    /// `Danger` or worse.
    #[must_use]
    pub const fn requires_immediate_warning(self) -> bool {
        self.level() >= Self::Danger.level()
    }

    /// Exactly `Safe`. A score inside the safe band does not matter here,
    /// only the level identity does.
    #[must_use]
    pub const fn is_safe(self) -> bool {
        matches!(self, Self::Safe)
    }

    /// Returns `true` if moving from `previous` to `self` raises the risk.
    #[must_use]
    pub const fn is_upgrade_from(self, previous: Self) -> bool {
        self.is_more_dangerous_than(previous)
    }

    /// Returns `true` if moving from `previous` to `self` lowers the risk.
    #[must_use]
    pub const fn is_downgrade_from(self, previous: Self) -> bool {
        self.is_safer_than(previous)
    }

    /// Recommended speed limit in km/h. `Unknown` is treated conservatively.
    #[must_use]
    pub const fn recommended_speed_limit(self) -> u8 {
        match self {
            Self::VeryDanger => 20,
            Self::Danger | Self::Unknown => 30,
            Self::Caution => 40,
            Self::Safe => 50,
        }
    }

    /// Alert priority; higher fires first.
    #[must_use]
    pub const fn notification_priority(self) -> u8 {
        self.level()
    }

    /// Recommended driver action.
    #[must_use]
    pub const fn recommended_action(self) -> &'static str {
        match self {
            Self::VeryDanger => "우회 경로 이용 권장, 부득이한 경우 최대 주의",
            Self::Danger => "속도 감소, 보행자 및 주변 차량 주의",
            Self::Caution => "안전거리 확보, 신호 준수",
            Self::Safe => "평상시 안전운전 수칙 준수",
            Self::Unknown => "주의 깊은 운전",
        }
    }

    /// Guidance shown to pedestrians.
    #[must_use]
    pub const fn pedestrian_safety_guide(self) -> &'static str {
        match self {
            Self::VeryDanger => "이 구간 보행 피하기, 대중교통 이용 권장",
            Self::Danger => "보행시 극도로 주의, 가능하면 다른 경로 이용",
            Self::Caution => "신호 준수, 횡단보도 이용, 주변 살피기",
            Self::Safe => "기본 보행 안전수칙 준수",
            Self::Unknown => "항상 주의하며 보행",
        }
    }

    /// Levels that trigger a notification (`Caution` and above).
    #[must_use]
    pub fn dangerous_levels() -> Vec<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|level| level.requires_notification())
            .collect()
    }

    /// Assessable levels, most dangerous first.
    #[must_use]
    pub fn ordered_by_danger() -> Vec<Self> {
        Self::RANKED.iter().rev().copied().collect()
    }
}
