//! Quantitative risk scoring.
//!
//! The score of a scenario is `e^impact × probability / safeguard`, where
//! impact and probability are categorical 1-3 ratings and the safeguard
//! rating grades control effectiveness on a (0, 1] scale (better controls
//! divide the score down). The same formula applied to the target ratings of
//! a planned treatment yields the residual risk.
//!
//! Everything here is pure computation over its inputs. Scores are full
//! precision `f64`; rounding for display is the caller's concern.

use serde::{Deserialize, Serialize};

use crate::error::InvalidRatingError;
use crate::types::Severity;

/// Scores at or above this value classify as [`Severity::Medium`].
pub const MEDIUM_THRESHOLD: f64 = 31.0;

/// Scores at or above this value classify as [`Severity::High`].
pub const HIGH_THRESHOLD: f64 = 221.0;

/// One scored scenario: the impact/probability/safeguard triple.
///
/// Carried by a risk twice: once for the current state and optionally once
/// for the state targeted by the treatment plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingTriple {
    /// Impact rating, 1-3.
    pub impact: u8,
    /// Probability rating, 1-3.
    pub probability: u8,
    /// Safeguard effectiveness rating in (0, 1].
    pub safeguard: f64,
}

impl RatingTriple {
    /// Create a rating triple. Validation happens on [`Self::score`].
    #[must_use]
    pub fn new(impact: u8, probability: u8, safeguard: f64) -> Self {
        Self {
            impact,
            probability,
            safeguard,
        }
    }

    /// Check that each rating is inside its domain.
    pub fn validate(&self) -> Result<(), InvalidRatingError> {
        if !(1..=3).contains(&self.impact) {
            return Err(InvalidRatingError::ImpactOutOfRange(self.impact));
        }
        if !(1..=3).contains(&self.probability) {
            return Err(InvalidRatingError::ProbabilityOutOfRange(self.probability));
        }
        if !self.safeguard.is_finite() || self.safeguard <= 0.0 || self.safeguard > 1.0 {
            return Err(InvalidRatingError::SafeguardOutOfRange(self.safeguard));
        }
        Ok(())
    }

    /// Compute the risk score of this triple.
    pub fn score(&self) -> Result<f64, InvalidRatingError> {
        self.validate()?;
        Ok(f64::from(self.impact).exp() * f64::from(self.probability) / self.safeguard)
    }

    /// Classify the score of this triple into a severity band.
    pub fn severity(&self) -> Result<Severity, InvalidRatingError> {
        Ok(classify(self.score()?))
    }
}

/// Compute a risk score from the three ratings.
///
/// The UI constrains the safeguard rating to an enumerated set, but any
/// finite value in (0, 1] is accepted here.
pub fn score(impact: u8, probability: u8, safeguard: f64) -> Result<f64, InvalidRatingError> {
    RatingTriple::new(impact, probability, safeguard).score()
}

/// Classify a score into its severity band.
///
/// Band edges are inclusive on the lower side: exactly 31.0 is medium and
/// exactly 221.0 is high.
#[must_use]
pub fn classify(score: f64) -> Severity {
    if score >= HIGH_THRESHOLD {
        Severity::High
    } else if score >= MEDIUM_THRESHOLD {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Compute the residual risk projected for a planned treatment.
///
/// Same formula as [`score`], applied to the target triple.
pub fn residual(
    target_impact: u8,
    target_probability: u8,
    target_safeguard: f64,
) -> Result<f64, InvalidRatingError> {
    score(target_impact, target_probability, target_safeguard)
}

/// Percentage reduction a treatment plan would achieve.
///
/// `100 × (1 − residual/current)` when `current > 0`, else `0.0`. The result
/// is deliberately not clamped: a negative reduction means the planned state
/// is worse than the current one and should be surfaced, not hidden.
#[must_use]
pub fn reduction_percent(current: f64, residual: f64) -> f64 {
    if current > 0.0 {
        100.0 * (1.0 - residual / current)
    } else {
        0.0
    }
}
