//! Resultant magnitude of multi-channel kinematics
//!
//! - 3 channels `(x, y, z)` → `|v|` per sample.
//! - 4 channels `(c0, x, y, z)` → `c0` passed through plus `|(x, y, z)|`.
//!
//! The 4-channel layout carries a leading scalar channel (for example a
//! linear-acceleration resultant) next to the rotational vector.

use crate::types::{argmax, KinematicProfile, PreprocessError, PreprocessResult};

/// Per-sample resultant of a profile.
#[derive(Debug, Clone, PartialEq)]
pub enum Resultant {
    /// 3-channel input: one magnitude per sample.
    Magnitude(Vec<f64>),
    /// 4-channel input: channel 0 unchanged, magnitude of channels 1..3.
    Split {
        passthrough: Vec<f64>,
        magnitude: Vec<f64>,
    },
}

impl Resultant {
    /// The vector-magnitude channel.
    pub fn magnitude(&self) -> &[f64] {
        match self {
            Resultant::Magnitude(m) => m,
            Resultant::Split { magnitude, .. } => magnitude,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.magnitude().len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitude().is_empty()
    }

    /// Index of the first sample with the largest magnitude.
    pub fn peak_index(&self) -> Option<usize> {
        argmax(self.magnitude())
    }
}

/// Compute the resultant of a 3- or 4-channel profile.
pub fn resultant(profile: &KinematicProfile) -> PreprocessResult<Resultant> {
    match profile.channels() {
        3 => Ok(Resultant::Magnitude(
            profile.rows().map(|r| magnitude(&r[0..3])).collect(),
        )),
        4 => {
            let passthrough = profile.rows().map(|r| r[0]).collect();
            let magnitude = profile.rows().map(|r| magnitude(&r[1..4])).collect();
            Ok(Resultant::Split {
                passthrough,
                magnitude,
            })
        }
        c => Err(PreprocessError::InvalidShape(format!(
            "resultant needs 3 or 4 channels, got {}",
            c
        ))),
    }
}

/// Index of the peak resultant magnitude (first occurrence).
pub fn peak_index(profile: &KinematicProfile) -> PreprocessResult<usize> {
    resultant(profile)?
        .peak_index()
        .ok_or(PreprocessError::TooFewSamples {
            required: 1,
            actual: 0,
        })
}

#[inline]
fn magnitude(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_channel_magnitude() {
        let p = KinematicProfile::from_rows(&[[0.0, 0.0, 0.0], [3.0, 4.0, 0.0], [1.0, 2.0, 2.0]])
            .unwrap();
        let r = resultant(&p).unwrap();
        assert_eq!(r.magnitude(), &[0.0, 5.0, 3.0]);
        assert_eq!(r.peak_index(), Some(1));
    }

    #[test]
    fn test_four_channel_split() {
        let p = KinematicProfile::from_rows(&[[-7.0, 3.0, 4.0, 0.0], [2.0, 0.0, 0.0, 1.0]]).unwrap();
        match resultant(&p).unwrap() {
            Resultant::Split {
                passthrough,
                magnitude,
            } => {
                assert_eq!(passthrough, vec![-7.0, 2.0]);
                assert_eq!(magnitude, vec![5.0, 1.0]);
            }
            other => panic!("expected split resultant, got {:?}", other),
        }
    }

    #[test]
    fn test_other_channel_counts_rejected() {
        let p = KinematicProfile::from_rows(&[[1.0, 2.0]]).unwrap();
        assert!(resultant(&p).unwrap_err().is_validation());
        let p = KinematicProfile::from_rows(&[[1.0, 2.0, 3.0, 4.0, 5.0]]).unwrap();
        assert!(resultant(&p).is_err());
    }

    #[test]
    fn test_peak_index_ties_take_first() {
        let p = KinematicProfile::from_rows(&[[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, -2.0]])
            .unwrap();
        assert_eq!(peak_index(&p).unwrap(), 1);
    }

    #[test]
    fn test_peak_index_empty_profile() {
        let p = KinematicProfile::zeros(0, 3);
        assert!(matches!(
            peak_index(&p),
            Err(PreprocessError::TooFewSamples { .. })
        ));
    }
}
