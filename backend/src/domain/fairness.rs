//! Fairness scoring for a pair of skill values.
//!
//! The score is the ratio of the smaller value to the larger, as a rounded
//! percentage. Explanations are presentation only and never feed back into
//! the number.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Default hard acceptance threshold for matches.
pub const DEFAULT_FAIRNESS_THRESHOLD: u8 = 60;

/// A fairness score in `0..=100`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct FairnessScore(u8);

impl FairnessScore {
    /// Highest possible score.
    pub const PERFECT: Self = Self(100);
    /// Score for degenerate comparisons.
    pub const ZERO: Self = Self(0);

    /// Build a score, saturating at 100.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        if value > 100 { Self(100) } else { Self(value) }
    }

    /// The score as an integer percentage.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Tier used to phrase explanations.
    #[must_use]
    pub const fn tier(self) -> FairnessTier {
        match self.0 {
            90.. => FairnessTier::Excellent,
            75..=89 => FairnessTier::Good,
            60..=74 => FairnessTier::Fair,
            _ => FairnessTier::Borderline,
        }
    }

    /// Whether the score reaches `threshold`.
    #[must_use]
    pub const fn meets(self, threshold: u8) -> bool {
        self.0 >= threshold
    }
}

impl fmt::Display for FairnessScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Qualitative band of a [`FairnessScore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FairnessTier {
    /// 90 and above.
    Excellent,
    /// 75 to 89.
    Good,
    /// 60 to 74.
    Fair,
    /// Below 60.
    Borderline,
}

impl FairnessTier {
    /// Lowercase label used in API payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Borderline => "borderline",
        }
    }

    fn headline(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent match",
            Self::Good => "Good match",
            Self::Fair => "Fair match",
            Self::Borderline => "Borderline match",
        }
    }
}

/// Compare two skill values.
///
/// Any non-positive or non-finite value yields [`FairnessScore::ZERO`]. The
/// result is symmetric in its arguments.
///
/// # Examples
/// ```
/// use skillswap::domain::compute_fairness;
///
/// assert_eq!(compute_fairness(92.4, 46.2).value(), 50);
/// assert_eq!(compute_fairness(46.2, 92.4).value(), 50);
/// assert_eq!(compute_fairness(0.0, 10.0).value(), 0);
/// ```
#[must_use]
pub fn compute_fairness(value_a: f64, value_b: f64) -> FairnessScore {
    if !is_usable(value_a) || !is_usable(value_b) {
        return FairnessScore::ZERO;
    }
    let ratio = value_a.min(value_b) / value_a.max(value_b);
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "ratio is bounded to (0, 1]"
    )]
    let percent = (ratio * 100.0).round() as u8;
    FairnessScore::new(percent)
}

fn is_usable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// One side of an exchange, as shown in explanations.
#[derive(Debug, Clone, Copy)]
pub struct ValuedSkill<'a> {
    /// Skill name as shown to the user.
    pub name: &'a str,
    /// Output of the valuation for this side.
    pub value: f64,
}

/// Percentage difference `|a - b| / max(a, b) * 100`, zero when both are
/// zero.
#[must_use]
pub fn percentage_difference(value_a: f64, value_b: f64) -> f64 {
    let max = value_a.abs().max(value_b.abs());
    if max == 0.0 || !max.is_finite() {
        return 0.0;
    }
    (value_a - value_b).abs() / max * 100.0
}

/// Render the rationale shown next to a match.
#[must_use]
pub fn explain_fairness(a: ValuedSkill<'_>, b: ValuedSkill<'_>, score: FairnessScore) -> String {
    let headline = score.tier().headline();
    let difference = percentage_difference(a.value, b.value);
    if difference < 0.05 {
        return format!(
            "{headline} ({score}/100): {} and {} are valued equally.",
            a.name, b.name
        );
    }
    let (higher, lower) = if a.value >= b.value { (a, b) } else { (b, a) };
    format!(
        "{headline} ({score}/100): {} ({:.1}) is valued {difference:.1}% above {} ({:.1}).",
        higher.name, higher.value, lower.name, lower.value
    )
}
