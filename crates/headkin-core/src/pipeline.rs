//! Axis-permutation augmentation for CNN input
//!
//! Every recording is expanded into six training tensors, one per ordering of
//! its three rotational axes. Each permuted profile is mirrored onto its
//! forward-facing conjugate axis and then peak-aligned and padded to the
//! network's input length:
//!
//! ```text
//!   profile ──► [filter] ──┬─► permute (0,1,2) ──► conjugate ──► shift+pad ──► perm_1
//!                          ├─► permute (0,2,1) ──► conjugate ──► shift+pad ──► perm_2
//!                          │   ...
//!                          └─► permute (2,1,0) ──► conjugate ──► shift+pad ──► perm_6
//! ```
//!
//! Permutations are visited in lexicographic order, so `perm_k` always names
//! the same axis ordering.

use crate::conjugate::conjugate_transform;
use crate::filter::FilterConfig;
use crate::shift_pad::{PadMode, ShiftAndPad};
use crate::types::{KinematicProfile, PreprocessError, PreprocessResult};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The six orderings of three axes, lexicographic.
pub const AXIS_PERMUTATIONS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

/// Augmentation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Output length L of every tensor
    pub cnn_length: usize,
    /// Row the peak is moved to (None = L / 2)
    pub target_index: Option<usize>,
    /// Padding around the placed profile
    pub pad_mode: PadMode,
    /// Mirror backward-facing axes before padding
    pub conjugate: bool,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            cnn_length: 550,
            target_index: None,
            pad_mode: PadMode::Repeat,
            conjugate: true,
        }
    }
}

impl AugmentConfig {
    /// Effective target row.
    pub fn target(&self) -> usize {
        self.target_index.unwrap_or(self.cnn_length / 2)
    }

    /// The padder these settings describe.
    pub fn padder(&self) -> PreprocessResult<ShiftAndPad> {
        Ok(ShiftAndPad::new(self.cnn_length, self.target())?.with_mode(self.pad_mode))
    }

    pub fn validate(&self) -> PreprocessResult<()> {
        self.padder().map(|_| ())
    }
}

/// One augmented training example.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedTensor {
    /// Dataset name, `perm_1` .. `perm_6`
    pub dataset: String,
    /// Source axis of each output channel
    pub permutation: [usize; 3],
    /// L × C samples
    pub profile: KinematicProfile,
}

impl AugmentedTensor {
    /// Shape of the channels-first CNN view: `[1, C, L]`.
    pub fn shape(&self) -> [usize; 3] {
        [1, self.profile.channels(), self.profile.len()]
    }

    /// Channels-first data, one row per channel.
    pub fn channels_first(&self) -> Vec<Vec<f64>> {
        self.profile.to_channels_first()
    }
}

/// Builds the six augmented tensors for a recording.
#[derive(Debug, Clone)]
pub struct Augmenter {
    config: AugmentConfig,
    padder: ShiftAndPad,
    filter: FilterConfig,
}

impl Augmenter {
    pub fn new(config: AugmentConfig) -> PreprocessResult<Self> {
        Ok(Self {
            padder: config.padder()?,
            config,
            filter: FilterConfig::default(),
        })
    }

    /// Clean profiles with `filter` before augmenting them.
    pub fn with_filter(mut self, filter: FilterConfig) -> PreprocessResult<Self> {
        if filter.enabled {
            filter.validate()?;
        }
        self.filter = filter;
        Ok(self)
    }

    pub fn config(&self) -> &AugmentConfig {
        &self.config
    }

    /// Produce `perm_1` .. `perm_6` for a 3-channel profile.
    pub fn augment<R: Rng + ?Sized>(
        &self,
        profile: &KinematicProfile,
        rng: &mut R,
    ) -> PreprocessResult<Vec<AugmentedTensor>> {
        profile.require_channels(3)?;
        if profile.len() > self.config.cnn_length {
            return Err(PreprocessError::OutputTooShort {
                output_len: self.config.cnn_length,
                input_len: profile.len(),
            });
        }
        let cleaned = self.filter.apply(profile)?;

        AXIS_PERMUTATIONS
            .iter()
            .enumerate()
            .map(|(i, perm)| {
                let tensor = self.augment_one(&cleaned, *perm, rng)?;
                Ok(AugmentedTensor {
                    dataset: format!("perm_{}", i + 1),
                    permutation: *perm,
                    profile: tensor,
                })
            })
            .collect()
    }

    /// Permute, conjugate and pad a single ordering.
    pub fn augment_one<R: Rng + ?Sized>(
        &self,
        profile: &KinematicProfile,
        permutation: [usize; 3],
        rng: &mut R,
    ) -> PreprocessResult<KinematicProfile> {
        let permuted = profile.permute_channels(&permutation)?;
        let aligned = if self.config.conjugate {
            conjugate_transform(&permuted)?
        } else {
            permuted
        };
        self.padder.apply(&aligned, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn impact() -> KinematicProfile {
        let rows: Vec<[f64; 3]> = (0..40)
            .map(|i| {
                let s = (std::f64::consts::PI * i as f64 / 39.0).sin();
                [-900.0 * s, 350.0 * s, 120.0 * s + 1.0]
            })
            .collect();
        KinematicProfile::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_permutation_order() {
        assert_eq!(AXIS_PERMUTATIONS.len(), 6);
        let mut sorted = AXIS_PERMUTATIONS;
        sorted.sort();
        assert_eq!(sorted, AXIS_PERMUTATIONS);
    }

    #[test]
    fn test_six_tensors_of_fixed_shape() {
        let augmenter = Augmenter::new(AugmentConfig {
            cnn_length: 120,
            ..Default::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let tensors = augmenter.augment(&impact(), &mut rng).unwrap();

        assert_eq!(tensors.len(), 6);
        for (i, t) in tensors.iter().enumerate() {
            assert_eq!(t.dataset, format!("perm_{}", i + 1));
            assert_eq!(t.permutation, AXIS_PERMUTATIONS[i]);
            assert_eq!(t.profile.len(), 120);
            assert_eq!(t.profile.channels(), 3);
            assert_eq!(t.shape(), [1, 3, 120]);
            assert_eq!(t.channels_first().len(), 3);
            assert_eq!(t.channels_first()[0].len(), 120);
        }
    }

    #[test]
    fn test_same_seed_same_tensors() {
        let augmenter = Augmenter::new(AugmentConfig {
            cnn_length: 200,
            ..Default::default()
        })
        .unwrap();
        let a = augmenter.augment(&impact(), &mut StdRng::seed_from_u64(3)).unwrap();
        let b = augmenter.augment(&impact(), &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_peak_lands_on_target() {
        let config = AugmentConfig {
            cnn_length: 100,
            target_index: Some(30),
            pad_mode: PadMode::Zero,
            conjugate: true,
        };
        let augmenter = Augmenter::new(config).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        for t in augmenter.augment(&impact(), &mut rng).unwrap() {
            assert_eq!(crate::resultant::peak_index(&t.profile).unwrap(), 30);
        }
    }

    #[test]
    fn test_conjugate_faces_forward() {
        // Peak axis points along -x, so the identity ordering gets mirrored.
        let config = AugmentConfig {
            cnn_length: 60,
            pad_mode: PadMode::Zero,
            ..Default::default()
        };
        let augmenter = Augmenter::new(config).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let out = augmenter
            .augment_one(&impact(), [0, 1, 2], &mut rng)
            .unwrap();
        let peak = crate::resultant::peak_index(&out).unwrap();
        assert!(out.row(peak)[0] > 0.0);

        let plain = Augmenter::new(AugmentConfig {
            conjugate: false,
            ..config
        })
        .unwrap()
        .augment_one(&impact(), [0, 1, 2], &mut rng)
        .unwrap();
        assert!(plain.row(peak)[0] < 0.0);
    }

    #[test]
    fn test_rejects_long_or_wide_input() {
        let augmenter = Augmenter::new(AugmentConfig {
            cnn_length: 20,
            ..Default::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            augmenter.augment(&impact(), &mut rng),
            Err(PreprocessError::OutputTooShort { output_len: 20, input_len: 40 })
        ));

        let wide = KinematicProfile::zeros(5, 4);
        assert!(augmenter.augment(&wide, &mut rng).unwrap_err().is_validation());
    }

    #[test]
    fn test_invalid_config() {
        let config = AugmentConfig {
            cnn_length: 10,
            target_index: Some(10),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(Augmenter::new(config).is_err());
        assert_eq!(AugmentConfig::default().target(), 275);
    }

    #[test]
    fn test_filter_is_applied() {
        let filter = FilterConfig {
            enabled: true,
            ..Default::default()
        };
        let augmenter = Augmenter::new(AugmentConfig {
            cnn_length: 80,
            pad_mode: PadMode::Zero,
            conjugate: false,
            ..Default::default()
        })
        .unwrap()
        .with_filter(filter)
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let tensors = augmenter.augment(&impact(), &mut rng).unwrap();
        let unfiltered = Augmenter::new(*augmenter.config())
            .unwrap()
            .augment(&impact(), &mut rng)
            .unwrap();
        assert_eq!(tensors[0].profile.len(), 80);
        assert_ne!(tensors[0].profile, unfiltered[0].profile);

        let bad = FilterConfig {
            enabled: true,
            cutoff_hz: 5000.0,
            ..Default::default()
        };
        assert!(Augmenter::new(AugmentConfig::default())
            .unwrap()
            .with_filter(bad)
            .is_err());
    }
}
