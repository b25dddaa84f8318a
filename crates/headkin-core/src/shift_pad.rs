//! Peak-aligned shift and repeat padding
//!
//! CNN inputs have a fixed length `L`. A recording of `N <= L` samples is
//! placed so that its peak resultant sample lands on a target index, and the
//! empty space around it is filled with whole copies of the recording
//! separated by a single zero row (repeat padding):
//!
//! ```text
//!   leading                  placed                 trailing
//! ┌──────────────────────┬──────────────────┬──────────────────────────┐
//! │ 0 0 [p 0] [p 0]      │        p         │ [0 p] [0 p] 0 0 0 0       │
//! └──────────────────────┴──────────────────┴──────────────────────────┘
//!                        start              end
//! ```
//!
//! The number of copies on each side is drawn uniformly from
//! `1..=space / (N + 1)`, so the same input yields different tensors on every
//! call. The random source is always supplied by the caller; seed it to get
//! reproducible output.
//!
//! ## Example
//!
//! ```rust
//! use headkin_core::shift_pad::{PadMode, ShiftAndPad};
//! use headkin_core::types::KinematicProfile;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let profile = KinematicProfile::from_rows(&[[0.0, 0.0, 1.0], [0.0, 3.0, 0.0]]).unwrap();
//! let padder = ShiftAndPad::new(10, 5).unwrap().with_mode(PadMode::Repeat);
//! let mut rng = StdRng::seed_from_u64(7);
//! let out = padder.apply(&profile, &mut rng).unwrap();
//! assert_eq!(out.len(), 10);
//! assert_eq!(out.row(5), &[0.0, 3.0, 0.0]);
//! ```

use crate::resultant::resultant;
use crate::types::{KinematicProfile, PreprocessError, PreprocessResult};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How the space around the placed profile is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadMode {
    /// Randomized whole-copy repeat padding
    Repeat,
    /// Replicate the first/last row (deterministic)
    Edge,
    /// Leave the padding zero
    Zero,
}

impl Default for PadMode {
    fn default() -> Self {
        PadMode::Repeat
    }
}

/// Where the profile ended up inside the output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Peak index within the input profile.
    pub peak_index: usize,
    /// First output row holding the profile.
    pub start: usize,
    /// One past the last output row holding the profile.
    pub end: usize,
    /// Copies tiled before `start` (repeat mode only).
    pub leading_copies: usize,
    /// Copies tiled after `end` (repeat mode only).
    pub trailing_copies: usize,
}

/// Fixed-length peak alignment with padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftAndPad {
    output_len: usize,
    target_index: usize,
    mode: PadMode,
}

impl ShiftAndPad {
    /// Create a padder producing `output_len` rows with the peak at `target_index`.
    pub fn new(output_len: usize, target_index: usize) -> PreprocessResult<Self> {
        if output_len == 0 {
            return Err(PreprocessError::InvalidParameter(
                "output length must be > 0".to_string(),
            ));
        }
        if target_index >= output_len {
            return Err(PreprocessError::InvalidParameter(format!(
                "target index {} outside output length {}",
                target_index, output_len
            )));
        }
        Ok(Self {
            output_len,
            target_index,
            mode: PadMode::Repeat,
        })
    }

    /// Set the padding mode.
    pub fn with_mode(mut self, mode: PadMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn output_len(&self) -> usize {
        self.output_len
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    pub fn mode(&self) -> PadMode {
        self.mode
    }

    /// Shift and pad a profile.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        profile: &KinematicProfile,
        rng: &mut R,
    ) -> PreprocessResult<KinematicProfile> {
        self.apply_with_placement(profile, rng).map(|(out, _)| out)
    }

    /// Shift and pad a profile, also reporting where it was placed.
    pub fn apply_with_placement<R: Rng + ?Sized>(
        &self,
        profile: &KinematicProfile,
        rng: &mut R,
    ) -> PreprocessResult<(KinematicProfile, Placement)> {
        let n = profile.len();
        let c = profile.channels();
        let len = self.output_len;
        if n == 0 {
            return Err(PreprocessError::TooFewSamples {
                required: 1,
                actual: 0,
            });
        }
        if len < n {
            return Err(PreprocessError::OutputTooShort {
                output_len: len,
                input_len: n,
            });
        }

        let peak_index = peak_for_padding(profile)?;
        let shift = self.target_index as isize - peak_index as isize;
        let start = shift.max(0) as usize;
        let end = (start + n).min(len);

        let mut out = KinematicProfile::zeros(len, c);
        for (dst, src) in (start..end).zip(0..end - start) {
            out.row_mut(dst).copy_from_slice(profile.row(src));
        }

        let mut placement = Placement {
            peak_index,
            start,
            end,
            leading_copies: 0,
            trailing_copies: 0,
        };

        match self.mode {
            PadMode::Zero => {}
            PadMode::Edge => {
                let first = profile.row(0).to_vec();
                for i in 0..start {
                    out.row_mut(i).copy_from_slice(&first);
                }
                let last = profile.row(end - start - 1).to_vec();
                for i in end..len {
                    out.row_mut(i).copy_from_slice(&last);
                }
            }
            PadMode::Repeat => {
                if start > 0 {
                    placement.leading_copies = fill_leading(&mut out, profile, start, rng);
                }
                if end < len {
                    placement.trailing_copies = fill_trailing(&mut out, profile, end, rng);
                }
            }
        }

        tracing::trace!(
            peak = peak_index,
            start,
            end,
            leading = placement.leading_copies,
            trailing = placement.trailing_copies,
            "shift and pad"
        );
        Ok((out, placement))
    }
}

/// Convenience wrapper: repeat-pad `profile` to `output_len` with its peak at `target_index`.
pub fn shift_and_pad<R: Rng + ?Sized>(
    profile: &KinematicProfile,
    target_index: usize,
    output_len: usize,
    rng: &mut R,
) -> PreprocessResult<KinematicProfile> {
    ShiftAndPad::new(output_len, target_index)?.apply(profile, rng)
}

/// Peak used for alignment: the vector-magnitude channel for 3/4-channel
/// data, the largest absolute value across channels otherwise.
fn peak_for_padding(profile: &KinematicProfile) -> PreprocessResult<usize> {
    match profile.channels() {
        3 | 4 => resultant(profile)?
            .peak_index()
            .ok_or(PreprocessError::TooFewSamples {
                required: 1,
                actual: 0,
            }),
        _ => {
            let peaks: Vec<f64> = profile
                .rows()
                .map(|r| r.iter().fold(0.0_f64, |m, v| m.max(v.abs())))
                .collect();
            crate::types::argmax(&peaks).ok_or(PreprocessError::TooFewSamples {
                required: 1,
                actual: 0,
            })
        }
    }
}

/// Tile `[profile; 0]` and right-align it against `start`. Returns the copy count.
fn fill_leading<R: Rng + ?Sized>(
    out: &mut KinematicProfile,
    profile: &KinematicProfile,
    start: usize,
    rng: &mut R,
) -> usize {
    let n = profile.len();
    let max_pad = start / (n + 1);
    if max_pad == 0 {
        return 0;
    }
    let copies = rng.gen_range(1..=max_pad);
    let block = n + 1;
    let pad_len = copies * block;
    let first = start - pad_len;
    for k in 0..pad_len {
        let pos = k % block;
        if pos < n {
            out.row_mut(first + k).copy_from_slice(profile.row(pos));
        }
    }
    copies
}

/// Tile `[0; profile]` and left-align it at `end`. Returns the copy count.
fn fill_trailing<R: Rng + ?Sized>(
    out: &mut KinematicProfile,
    profile: &KinematicProfile,
    end: usize,
    rng: &mut R,
) -> usize {
    let n = profile.len();
    let remaining = out.len() - end;
    let max_pad = remaining / (n + 1);
    if max_pad == 0 {
        return 0;
    }
    let copies = rng.gen_range(1..=max_pad);
    let block = n + 1;
    for k in 0..copies * block {
        let pos = k % block;
        if pos > 0 {
            out.row_mut(end + k).copy_from_slice(profile.row(pos - 1));
        }
    }
    copies
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ramp(n: usize, peak: usize) -> KinematicProfile {
        let rows: Vec<[f64; 3]> = (0..n)
            .map(|i| {
                let v = if i == peak { 10.0 } else { 1.0 + i as f64 * 0.01 };
                [v, 0.5, -0.25]
            })
            .collect();
        KinematicProfile::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_no_slack_is_identity() {
        let p = ramp(8, 3);
        let mut rng = StdRng::seed_from_u64(1);
        let out = shift_and_pad(&p, 3, 8, &mut rng).unwrap();
        assert_eq!(out, p);
    }

    #[test]
    fn test_shape_is_fixed_for_any_draw() {
        let p = ramp(5, 2);
        let padder = ShiftAndPad::new(64, 32).unwrap();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = padder.apply(&p, &mut rng).unwrap();
            assert_eq!(out.len(), 64);
            assert_eq!(out.channels(), 3);
        }
    }

    #[test]
    fn test_peak_lands_on_target_and_core_is_intact() {
        let p = ramp(5, 2);
        let padder = ShiftAndPad::new(40, 20).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let (out, placement) = padder.apply_with_placement(&p, &mut rng).unwrap();
        assert_eq!(placement.start, 18);
        assert_eq!(placement.end, 23);
        for i in 0..5 {
            assert_eq!(out.row(18 + i), p.row(i));
        }
        assert_eq!(out.row(20)[0], 10.0);
    }

    #[test]
    fn test_leading_copies_are_right_aligned() {
        let p = ramp(3, 1);
        // start = 10 - 1 = 9, max_pad = 9 / 4 = 2
        let padder = ShiftAndPad::new(14, 10).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let (out, placement) = padder.apply_with_placement(&p, &mut rng).unwrap();
        assert!((1..=2).contains(&placement.leading_copies));
        // Row just before the profile is the separator zero row.
        assert_eq!(out.row(8), &[0.0, 0.0, 0.0]);
        // Preceded by the last profile row.
        assert_eq!(out.row(7), p.row(2));
        assert_eq!(out.row(5), p.row(0));
        let filled = placement.leading_copies * 4;
        for i in 0..9 - filled {
            assert_eq!(out.row(i), &[0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_trailing_copies_are_left_aligned() {
        let p = ramp(3, 0);
        // start = 0, end = 3, remaining = 9, max_pad = 2
        let padder = ShiftAndPad::new(12, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let (out, placement) = padder.apply_with_placement(&p, &mut rng).unwrap();
        assert_eq!(placement.start, 0);
        assert!((1..=2).contains(&placement.trailing_copies));
        assert_eq!(out.row(3), &[0.0, 0.0, 0.0]);
        assert_eq!(out.row(4), p.row(0));
        assert_eq!(out.row(6), p.row(2));
        let filled_to = 3 + placement.trailing_copies * 4;
        for i in filled_to..12 {
            assert_eq!(out.row(i), &[0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_insufficient_space_stays_zero() {
        let p = ramp(6, 0);
        // start = 3 < N + 1
        let padder = ShiftAndPad::new(9, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let (out, placement) = padder.apply_with_placement(&p, &mut rng).unwrap();
        assert_eq!(placement.leading_copies, 0);
        for i in 0..3 {
            assert_eq!(out.row(i), &[0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_late_placement_truncates_profile() {
        let p = ramp(4, 0);
        let padder = ShiftAndPad::new(6, 4).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let (out, placement) = padder.apply_with_placement(&p, &mut rng).unwrap();
        assert_eq!(placement.start, 4);
        assert_eq!(placement.end, 6);
        assert_eq!(out.row(4), p.row(0));
        assert_eq!(out.row(5), p.row(1));
    }

    #[test]
    fn test_negative_shift_places_at_zero() {
        let p = ramp(6, 5);
        let padder = ShiftAndPad::new(10, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let (out, placement) = padder.apply_with_placement(&p, &mut rng).unwrap();
        assert_eq!(placement.start, 0);
        assert_eq!(out.row(0), p.row(0));
    }

    #[test]
    fn test_seeded_draws_are_reproducible() {
        let p = ramp(4, 1);
        let padder = ShiftAndPad::new(60, 30).unwrap();
        let a = padder.apply(&p, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = padder.apply(&p, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_edge_mode() {
        let p = ramp(3, 1);
        let padder = ShiftAndPad::new(8, 4).unwrap().with_mode(PadMode::Edge);
        let mut rng = StdRng::seed_from_u64(0);
        let out = padder.apply(&p, &mut rng).unwrap();
        for i in 0..3 {
            assert_eq!(out.row(i), p.row(0));
        }
        for i in 6..8 {
            assert_eq!(out.row(i), p.row(2));
        }
    }

    #[test]
    fn test_zero_mode() {
        let p = ramp(3, 1);
        let padder = ShiftAndPad::new(20, 10).unwrap().with_mode(PadMode::Zero);
        let out = padder.apply(&p, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(out.row(0), &[0.0, 0.0, 0.0]);
        assert_eq!(out.row(19), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_preconditions() {
        assert!(ShiftAndPad::new(10, 10).is_err());
        assert!(ShiftAndPad::new(0, 0).is_err());
        let p = ramp(5, 0);
        let err = shift_and_pad(&p, 0, 4, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert_eq!(
            err,
            PreprocessError::OutputTooShort {
                output_len: 4,
                input_len: 5
            }
        );
    }

    #[test]
    fn test_single_channel_peak() {
        let p = KinematicProfile::from_rows(&[[0.1], [-2.0], [0.3]]).unwrap();
        let padder = ShiftAndPad::new(5, 2).unwrap().with_mode(PadMode::Zero);
        let out = padder.apply(&p, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(out.row(2), &[-2.0]);
    }
}
