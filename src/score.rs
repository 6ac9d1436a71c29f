//! Flight Score: weighted composite readiness score, tier and trend.

use crate::models::{SchoolRecord, TrackedYears};
use crate::parse::round1;
use serde::{Serialize, Serializer};

/// Fewer present metrics than this and no score is computed.
pub const MIN_METRICS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub ready_grad_weight: f64,
    pub college_going_weight: f64,
    pub act_weight: f64,
    pub graduation_weight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            ready_grad_weight: 0.40,
            college_going_weight: 0.25,
            act_weight: 0.20,
            graduation_weight: 0.15,
        }
    }
}

/// Most recent available value of each input metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatestValues {
    pub graduation_rate: Option<f64>,
    pub ready_grad_rate: Option<f64>,
    pub college_going_rate: Option<f64>,
    pub act_composite: Option<f64>,
}

impl LatestValues {
    fn present(&self) -> usize {
        [
            self.graduation_rate,
            self.ready_grad_rate,
            self.college_going_rate,
            self.act_composite,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Elite,
    Strong,
    Ready,
    BuildingMomentum,
    RoomToGrow,
    InsufficientData,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Elite,
        Tier::Strong,
        Tier::Ready,
        Tier::BuildingMomentum,
        Tier::RoomToGrow,
        Tier::InsufficientData,
    ];

    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            None => Tier::InsufficientData,
            Some(s) if s >= 85.0 => Tier::Elite,
            Some(s) if s >= 70.0 => Tier::Strong,
            Some(s) if s >= 55.0 => Tier::Ready,
            Some(s) if s >= 40.0 => Tier::BuildingMomentum,
            Some(_) => Tier::RoomToGrow,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Elite => "Elite",
            Tier::Strong => "Strong",
            Tier::Ready => "Ready",
            Tier::BuildingMomentum => "Building Momentum",
            Tier::RoomToGrow => "Room to Grow",
            Tier::InsufficientData => "Insufficient Data",
        }
    }

    pub fn class(self) -> &'static str {
        match self {
            Tier::Elite => "tier-elite",
            Tier::Strong => "tier-strong",
            Tier::Ready => "tier-ready",
            Tier::BuildingMomentum => "tier-building",
            Tier::RoomToGrow => "tier-grow",
            Tier::InsufficientData => "tier-na",
        }
    }

    /// Short key used in tier histograms and the meta block.
    pub fn key(self) -> &'static str {
        match self {
            Tier::Elite => "elite",
            Tier::Strong => "strong",
            Tier::Ready => "ready",
            Tier::BuildingMomentum => "building",
            Tier::RoomToGrow => "grow",
            Tier::InsufficientData => "na",
        }
    }

    /// Lower bound of the tier, `None` for insufficient data.
    pub fn min_score(self) -> Option<f64> {
        match self {
            Tier::Elite => Some(85.0),
            Tier::Strong => Some(70.0),
            Tier::Ready => Some(55.0),
            Tier::BuildingMomentum => Some(40.0),
            Tier::RoomToGrow => Some(0.0),
            Tier::InsufficientData => None,
        }
    }
}

impl Serialize for Tier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub change: Option<f64>,
    pub arrow: &'static str,
}

impl Trend {
    /// Classify a two-year ready-grad change.
    pub fn from_change(change: Option<f64>) -> Self {
        let Some(raw) = change else {
            return Self {
                direction: TrendDirection::None,
                change: None,
                arrow: "",
            };
        };

        let change = round1(raw);
        let (direction, arrow) = if change >= 5.0 {
            (TrendDirection::Up, "up")
        } else if change <= -5.0 {
            (TrendDirection::Down, "down")
        } else {
            (TrendDirection::Stable, "stable")
        };
        Self {
            direction,
            change: Some(change),
            arrow,
        }
    }
}

/// Everything the score engine derives for one school.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    pub latest: LatestValues,
    pub score: Option<f64>,
    pub tier: Tier,
    pub trend: Trend,
}

/// Affine rescale of an ACT composite onto 0-100.
pub fn normalize_act(composite: f64) -> f64 {
    ((composite - 10.0) * 100.0 / 26.0).clamp(0.0, 100.0)
}

/// Additive adjustment for the two-year ready-grad change.
pub fn momentum_bonus(change: Option<f64>) -> f64 {
    match change {
        Some(c) if c >= 10.0 => 5.0,
        Some(c) if c >= 5.0 => 3.0,
        Some(c) if c <= -10.0 => -5.0,
        Some(c) if c <= -5.0 => -3.0,
        _ => 0.0,
    }
}

/// Newest value among `years` (oldest first) for which `value` is present.
fn latest_of<F>(years: &[String], value: F) -> Option<f64>
where
    F: Fn(&str) -> Option<f64>,
{
    years.iter().rev().find_map(|year| value(year.as_str()))
}

#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    weights: ScoreWeights,
    years: TrackedYears,
}

impl ScoreEngine {
    pub fn new(weights: ScoreWeights, years: TrackedYears) -> Self {
        Self { weights, years }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn latest(&self, record: &SchoolRecord) -> LatestValues {
        LatestValues {
            graduation_rate: latest_of(&self.years.graduation, |y| record.graduation_rate(y)),
            ready_grad_rate: latest_of(&self.years.ready_grad, |y| record.ready_grad_rate(y)),
            college_going_rate: latest_of(&self.years.college_going, |y| record.college_going_rate(y)),
            act_composite: latest_of(&self.years.act, |y| record.act_composite(y)),
        }
    }

    /// Unrounded ready-grad change between the earliest and latest tracked years.
    pub fn ready_grad_change(&self, record: &SchoolRecord) -> Option<f64> {
        let (start, end) = self.years.ready_grad_span()?;
        Some(record.ready_grad_rate(end)? - record.ready_grad_rate(start)?)
    }

    /// Weighted score over the present metrics, renormalized by the weight
    /// actually applied, plus momentum, clamped to 0-100.
    pub fn flight_score(&self, latest: &LatestValues, change: Option<f64>) -> Option<f64> {
        if latest.present() < MIN_METRICS {
            return None;
        }

        let w = &self.weights;
        let components = [
            (latest.ready_grad_rate, w.ready_grad_weight),
            (latest.college_going_rate, w.college_going_weight),
            (latest.act_composite.map(normalize_act), w.act_weight),
            (latest.graduation_rate, w.graduation_weight),
        ];

        let (weighted, total_weight) = components
            .iter()
            .filter_map(|(value, weight)| value.map(|v| (v * weight, *weight)))
            .fold((0.0, 0.0), |(sum, total), (v, w)| (sum + v, total + w));

        if total_weight <= 0.0 {
            return None;
        }

        let score = weighted / total_weight + momentum_bonus(change);
        Some(round1(score.clamp(0.0, 100.0)))
    }

    pub fn evaluate(&self, record: &SchoolRecord) -> ScoreResult {
        let latest = self.latest(record);
        let change = self.ready_grad_change(record);
        let score = self.flight_score(&latest, change);
        ScoreResult {
            latest,
            score,
            tier: Tier::from_score(score),
            trend: Trend::from_change(change),
        }
    }
}
