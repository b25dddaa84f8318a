//! Conjugate rotation axis transform
//!
//! A contralateral impact produces a brain response that mirrors the original
//! about the mid-sagittal plane. The transform finds the rotation axis at the
//! profile's peak, mirrors it when it points backwards (|theta| > 90°), and
//! rescales every channel so the whole profile rotates about the mirrored axis.
//!
//! ```text
//!   theta in [-90, 90]  -> unchanged
//!   theta >= 0          -> theta' = 180 - theta
//!   theta <  0          -> theta' = -180 - theta
//!   alpha               -> alpha' = -alpha
//! ```
//!
//! The per-channel scale is `conjugate_axis / axis`, which for a mirrored axis
//! is `(-1, 1, -1)` up to round-off.

use crate::resultant::resultant;
use crate::types::{KinematicProfile, PreprocessError, PreprocessResult, Vec3};
use crate::vector_angle::RotationAxis;

/// Components smaller than this are treated as exactly zero when scaling.
const ZERO_COMPONENT: f64 = 1e-12;

/// Mirror `(theta, alpha)` about the mid-sagittal plane.
pub fn conjugate_rotational_axis(theta: f64, alpha: f64) -> (f64, f64) {
    let theta_new = if theta >= 0.0 {
        180.0 - theta
    } else {
        -180.0 - theta
    };
    (theta_new, -alpha)
}

/// Axis analysis of one profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConjugateAxes {
    /// Sample index the axis was taken from.
    pub peak_index: usize,
    /// Axis of the original profile.
    pub original: RotationAxis,
    /// Mirrored axis (equal to `original` when no mirroring is needed).
    pub conjugate: RotationAxis,
    /// Whether the axis was mirrored.
    pub mirrored: bool,
    /// Per-channel scale factors.
    pub scale: Vec3,
}

/// Locate the peak axis of a 3-channel profile and compute its conjugate.
pub fn conjugate_axes(profile: &KinematicProfile) -> PreprocessResult<ConjugateAxes> {
    profile.require_channels(3)?;
    let peak_index = resultant(profile)?
        .peak_index()
        .ok_or(PreprocessError::TooFewSamples {
            required: 1,
            actual: 0,
        })?;
    let original = RotationAxis::from_vector(&profile.vec3(peak_index))?;

    if (-90.0..=90.0).contains(&original.theta) {
        return Ok(ConjugateAxes {
            peak_index,
            original,
            conjugate: original,
            mirrored: false,
            scale: [1.0; 3],
        });
    }

    let (theta, alpha) = conjugate_rotational_axis(original.theta, original.alpha);
    let conjugate = RotationAxis::from_angles(theta, alpha);
    let scale = scale_vector(&original.vector, &conjugate.vector)?;

    Ok(ConjugateAxes {
        peak_index,
        original,
        conjugate,
        mirrored: true,
        scale,
    })
}

/// Transform a rotational profile to the profile about the conjugate axis.
///
/// Returns a copy of the input when the peak axis already points forwards.
/// Fails with a degenerate-geometry error when the peak sample is the zero
/// vector, or when an axis component is zero but its mirror is not.
pub fn conjugate_transform(profile: &KinematicProfile) -> PreprocessResult<KinematicProfile> {
    let axes = conjugate_axes(profile)?;
    tracing::debug!(
        peak = axes.peak_index,
        theta = axes.original.theta,
        alpha = axes.original.alpha,
        mirrored = axes.mirrored,
        "conjugate axis"
    );
    if !axes.mirrored {
        return Ok(profile.clone());
    }
    profile.scale_channels(&axes.scale)
}

fn scale_vector(original: &Vec3, conjugate: &Vec3) -> PreprocessResult<Vec3> {
    let mut scale = [1.0; 3];
    for i in 0..3 {
        if original[i].abs() < ZERO_COMPONENT {
            // 0/0: the channel is zero at the peak on both sides, leave it.
            if conjugate[i].abs() < ZERO_COMPONENT {
                continue;
            }
            return Err(PreprocessError::ZeroDenominator(format!(
                "axis component {} is zero but its conjugate is {}",
                i, conjugate[i]
            )));
        }
        scale[i] = conjugate[i] / original[i];
    }
    Ok(scale)
}
