//! Vector ⇄ azimuth/elevation conversion
//!
//! A rotation axis is a unit vector in the head frame. For mirroring and
//! reporting it is easier to reason about its spherical angles:
//!
//! ```text
//!   theta (azimuth)   = atan2(y, x)               in (-180, 180]
//!   alpha (elevation) = atan2(z, sqrt(x² + y²))    in [-90, 90]
//! ```
//!
//! ## Example
//!
//! ```rust
//! use headkin_core::vector_angle::{angles_to_vector, vector_to_angles};
//!
//! let (theta, alpha) = vector_to_angles(&[0.0, 1.0, 0.0]).unwrap();
//! assert!((theta - 90.0).abs() < 1e-12);
//! assert!(alpha.abs() < 1e-12);
//!
//! let v = angles_to_vector(theta, alpha);
//! assert!((v[1] - 1.0).abs() < 1e-12);
//! ```

use crate::types::{norm3, PreprocessError, PreprocessResult, Vec3};

/// Convert a vector to `(theta, alpha)` in degrees.
///
/// The vector does not need to be normalized. A zero or non-finite vector has
/// no direction; `atan2(0, 0)` would report `(0, 0)` for it, so it is rejected
/// with [`PreprocessError::ZeroNorm`] instead. At the poles (`x = y = 0`,
/// `z != 0`) the azimuth is reported as 0.
pub fn vector_to_angles(v: &Vec3) -> PreprocessResult<(f64, f64)> {
    if v.iter().any(|c| !c.is_finite()) {
        return Err(PreprocessError::ZeroNorm(format!("non-finite vector {:?}", v)));
    }
    if norm3(v) == 0.0 {
        return Err(PreprocessError::ZeroNorm("zero vector has no direction".to_string()));
    }
    let theta = v[1].atan2(v[0]).to_degrees();
    let alpha = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt()).to_degrees();
    Ok((theta, alpha))
}

/// Convert `(theta, alpha)` in degrees to a unit vector.
pub fn angles_to_vector(theta: f64, alpha: f64) -> Vec3 {
    let (st, ct) = theta.to_radians().sin_cos();
    let (sa, ca) = alpha.to_radians().sin_cos();
    [ca * ct, ca * st, sa]
}

/// A unit rotation axis together with its spherical angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationAxis {
    /// Unit vector.
    pub vector: Vec3,
    /// Azimuth in degrees.
    pub theta: f64,
    /// Elevation in degrees.
    pub alpha: f64,
}

impl RotationAxis {
    /// Normalize `v` and compute its angles.
    pub fn from_vector(v: &Vec3) -> PreprocessResult<Self> {
        let (theta, alpha) = vector_to_angles(v)?;
        let n = norm3(v);
        Ok(Self {
            vector: [v[0] / n, v[1] / n, v[2] / n],
            theta,
            alpha,
        })
    }

    /// Build from angles.
    pub fn from_angles(theta: f64, alpha: f64) -> Self {
        Self {
            vector: angles_to_vector(theta, alpha),
            theta,
            alpha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cardinal_directions() {
        let (t, a) = vector_to_angles(&[1.0, 0.0, 0.0]).unwrap();
        assert_abs_diff_eq!(t, 0.0);
        assert_abs_diff_eq!(a, 0.0);

        let (t, _) = vector_to_angles(&[-1.0, 0.0, 0.0]).unwrap();
        assert_abs_diff_eq!(t, 180.0);

        let (_, a) = vector_to_angles(&[0.0, 0.0, -2.0]).unwrap();
        assert_abs_diff_eq!(a, -90.0);
    }

    #[test]
    fn test_angles_roundtrip_grid() {
        let mut theta = -179.5;
        while theta <= 180.0 {
            let mut alpha = -89.5;
            while alpha < 90.0 {
                let v = angles_to_vector(theta, alpha);
                assert_abs_diff_eq!(norm3(&v), 1.0, epsilon = 1e-12);
                let (t, a) = vector_to_angles(&v).unwrap();
                assert_abs_diff_eq!(t, theta, epsilon = 1e-9);
                assert_abs_diff_eq!(a, alpha, epsilon = 1e-9);
                alpha += 7.25;
            }
            theta += 11.5;
        }
    }

    #[test]
    fn test_theta_180_is_preserved() {
        let v = angles_to_vector(180.0, 30.0);
        let (t, a) = vector_to_angles(&v).unwrap();
        assert_abs_diff_eq!(t.abs(), 180.0, epsilon = 1e-9);
        assert_abs_diff_eq!(a, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_vector_rejected() {
        let err = vector_to_angles(&[0.0, 0.0, 0.0]).unwrap_err();
        assert!(err.is_degenerate());
        assert!(RotationAxis::from_vector(&[0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_rotation_axis_normalizes() {
        let axis = RotationAxis::from_vector(&[0.0, 3.0, 4.0]).unwrap();
        assert_abs_diff_eq!(axis.vector[1], 0.6, epsilon = 1e-15);
        assert_abs_diff_eq!(axis.vector[2], 0.8, epsilon = 1e-15);
        assert_abs_diff_eq!(axis.theta, 90.0, epsilon = 1e-12);
    }
}
