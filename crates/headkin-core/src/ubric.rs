//! UBrIC: Universal Brain Injury Criterion
//!
//! Combines per-axis peak angular velocity and peak angular acceleration into
//! a single score:
//!
//! ```text
//!   ω(t)   = ∫ α dt                     (cumulative trapezoid, ω(t0) = 0)
//!   w'_i   = max|ω_i| / ω_cr,i
//!   a'_i   = max|α_i| / α_cr,i
//!   term_i = w'_i + (a'_i - w'_i) · exp(-a'_i / w'_i)
//!   UBrIC  = (Σ term_i^r)^(1/r)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use headkin_core::types::{KinematicProfile, TimeVector};
//! use headkin_core::ubric::UbricScorer;
//!
//! let accel = KinematicProfile::from_rows(&[
//!     [0.0, 0.0, 0.0],
//!     [2000.0, -1000.0, 500.0],
//!     [0.0, 0.0, 0.0],
//! ]).unwrap();
//! let time = TimeVector::uniform(3, 1000.0).unwrap();
//! let score = UbricScorer::default().score(&accel, &time).unwrap();
//! assert!(score > 0.0);
//! ```

use crate::types::{
    check_aligned, KinematicProfile, PreprocessError, PreprocessResult, TimeVector, Vec3,
};
use serde::{Deserialize, Serialize};

/// Critical values and the norm exponent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UbricParams {
    /// Critical angular velocity per axis (rad/s)
    pub critical_velocity: Vec3,
    /// Critical angular acceleration per axis (rad/s²)
    pub critical_acceleration: Vec3,
    /// Exponent of the axis combination
    pub exponent: f64,
}

impl Default for UbricParams {
    fn default() -> Self {
        Self {
            critical_velocity: [179.0, 208.0, 112.0],
            critical_acceleration: [13.7e3, 10.1e3, 8.54e3],
            exponent: 2.0,
        }
    }
}

impl UbricParams {
    pub fn validate(&self) -> PreprocessResult<()> {
        let critical = self
            .critical_velocity
            .iter()
            .chain(self.critical_acceleration.iter());
        for c in critical {
            if !(*c > 0.0) || !c.is_finite() {
                return Err(PreprocessError::InvalidParameter(format!(
                    "critical values must be positive, got {}",
                    c
                )));
            }
        }
        if !(self.exponent > 0.0) || !self.exponent.is_finite() {
            return Err(PreprocessError::InvalidParameter(format!(
                "exponent must be positive, got {}",
                self.exponent
            )));
        }
        Ok(())
    }
}

/// Intermediate quantities of one UBrIC evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UbricFeatureSet {
    pub peak_velocity: Vec3,
    pub peak_acceleration: Vec3,
    pub normalized_velocity: Vec3,
    pub normalized_acceleration: Vec3,
    pub terms: Vec3,
    pub score: f64,
}

/// Cumulative trapezoidal integral of `y` over `t`, starting at 0.
pub fn cumulative_trapezoid(y: &[f64], t: &[f64]) -> PreprocessResult<Vec<f64>> {
    if y.len() != t.len() {
        return Err(PreprocessError::LengthMismatch {
            expected: y.len(),
            actual: t.len(),
        });
    }
    let mut out = Vec::with_capacity(y.len());
    let mut acc = 0.0;
    if !y.is_empty() {
        out.push(0.0);
    }
    for i in 1..y.len() {
        acc += 0.5 * (y[i] + y[i - 1]) * (t[i] - t[i - 1]);
        out.push(acc);
    }
    Ok(out)
}

/// One axis' contribution from its normalized peaks.
pub fn ubric_term(w: f64, a: f64) -> PreprocessResult<f64> {
    if w == 0.0 {
        return Err(PreprocessError::ZeroDenominator(
            "normalized peak angular velocity is zero".to_string(),
        ));
    }
    Ok(w + (a - w) * (-a / w).exp())
}

/// UBrIC evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct UbricScorer {
    params: UbricParams,
}

impl UbricScorer {
    pub fn new(params: UbricParams) -> PreprocessResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &UbricParams {
        &self.params
    }

    /// Full evaluation of an angular-acceleration profile (rad/s²).
    pub fn evaluate(
        &self,
        profile: &KinematicProfile,
        time: &TimeVector,
    ) -> PreprocessResult<UbricFeatureSet> {
        profile.require_channels(3)?;
        check_aligned(profile, time, 2)?;

        let p = &self.params;
        let mut features = UbricFeatureSet {
            peak_velocity: [0.0; 3],
            peak_acceleration: [0.0; 3],
            normalized_velocity: [0.0; 3],
            normalized_acceleration: [0.0; 3],
            terms: [0.0; 3],
            score: 0.0,
        };

        for axis in 0..3 {
            let accel = profile.channel(axis);
            let velocity = cumulative_trapezoid(&accel, time.as_slice())?;
            features.peak_velocity[axis] = abs_max(&velocity);
            features.peak_acceleration[axis] = abs_max(&accel);
            features.normalized_velocity[axis] =
                features.peak_velocity[axis] / p.critical_velocity[axis];
            features.normalized_acceleration[axis] =
                features.peak_acceleration[axis] / p.critical_acceleration[axis];
        }
        for axis in 0..3 {
            features.terms[axis] = ubric_term(
                features.normalized_velocity[axis],
                features.normalized_acceleration[axis],
            )
            .map_err(|_| {
                PreprocessError::ZeroDenominator(format!(
                    "peak angular velocity on axis {} is zero",
                    axis
                ))
            })?;
        }

        let sum: f64 = features
            .terms
            .iter()
            .map(|t| t.max(0.0).powf(p.exponent))
            .sum();
        features.score = sum.powf(1.0 / p.exponent).max(0.0);

        tracing::debug!(score = features.score, terms = ?features.terms, "ubric evaluated");
        Ok(features)
    }

    /// Score only.
    pub fn score(&self, profile: &KinematicProfile, time: &TimeVector) -> PreprocessResult<f64> {
        self.evaluate(profile, time).map(|f| f.score)
    }
}

fn abs_max(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |m, v| m.max(v.abs()))
}
