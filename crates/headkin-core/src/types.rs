//! Core types for head-impact kinematics processing
//!
//! This module defines the sample containers shared by every transform in the
//! crate and the crate-wide error type.
//!
//! ## Profiles and Time
//!
//! A recording is a table of samples taken over a shared time axis. Each row is
//! one instant; each column is one channel, typically angular acceleration or
//! velocity about the head's x, y and z axes:
//!
//! ```text
//!   t [s]      ch0 (x)    ch1 (y)    ch2 (z)
//!   0.00000    12.4       -3.1        0.8     <- row 0
//!   0.00031    15.0       -2.7        1.1     <- row 1
//!   ...
//! ```
//!
//! [`KinematicProfile`] stores the channel values row-major and guarantees that
//! every row has the same width and every value is finite. [`TimeVector`] holds
//! the timestamps separately because most transforms (conjugation, padding)
//! never look at time.

use std::fmt;

/// A single scalar sample.
pub type Sample = f64;

/// A 3-component vector (x, y, z).
pub type Vec3 = [f64; 3];

/// Result type for preprocessing operations
pub type PreprocessResult<T> = Result<T, PreprocessError>;

/// Broad classification of a [`PreprocessError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input: shape, channel count, time axis, lengths.
    Validation,
    /// Zero-norm vectors or zero denominators in geometric/normalizing steps.
    DegenerateGeometry,
    /// The ODE solver could not produce a trustworthy solution.
    Numerical,
    /// Reading or writing collaborator files failed.
    Io,
}

/// Errors that can occur during preprocessing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreprocessError {
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Too few samples: need at least {required}, got {actual}")]
    TooFewSamples { required: usize, actual: usize },

    #[error("Time axis is not increasing at index {index}")]
    NonMonotonicTime { index: usize },

    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Output length {output_len} is shorter than input length {input_len}")]
    OutputTooShort { output_len: usize, input_len: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Time {t} is outside the sampled range [{start}, {end}]")]
    OutOfRange { t: f64, start: f64, end: f64 },

    #[error("Zero-norm vector: {0}")]
    ZeroNorm(String),

    #[error("Zero denominator: {0}")]
    ZeroDenominator(String),

    #[error("ODE solver failed: {0}")]
    SolverFailure(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Metadata not found: {0}")]
    MetadataNotFound(String),
}

impl PreprocessError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PreprocessError::InvalidShape(_)
            | PreprocessError::TooFewSamples { .. }
            | PreprocessError::NonMonotonicTime { .. }
            | PreprocessError::LengthMismatch { .. }
            | PreprocessError::OutputTooShort { .. }
            | PreprocessError::InvalidParameter(_)
            | PreprocessError::OutOfRange { .. } => ErrorKind::Validation,
            PreprocessError::ZeroNorm(_) | PreprocessError::ZeroDenominator(_) => {
                ErrorKind::DegenerateGeometry
            }
            PreprocessError::SolverFailure(_) => ErrorKind::Numerical,
            PreprocessError::Io(_)
            | PreprocessError::Parse(_)
            | PreprocessError::MetadataNotFound(_) => ErrorKind::Io,
        }
    }

    /// True for malformed-input errors.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// True for zero-norm / zero-denominator errors.
    pub fn is_degenerate(&self) -> bool {
        self.kind() == ErrorKind::DegenerateGeometry
    }
}

impl From<std::io::Error> for PreprocessError {
    fn from(e: std::io::Error) -> Self {
        PreprocessError::Io(e.to_string())
    }
}

/// Multi-channel time series with a fixed channel count.
///
/// Samples are stored row-major: `data[row * channels + ch]`.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicProfile {
    channels: usize,
    data: Vec<Sample>,
}

impl KinematicProfile {
    /// Build a profile from rows. All rows must have the same, non-zero width.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> PreprocessResult<Self> {
        let channels = match rows.first() {
            Some(r) => r.as_ref().len(),
            None => {
                return Err(PreprocessError::InvalidShape(
                    "cannot infer channel count from zero rows".to_string(),
                ))
            }
        };
        if channels == 0 {
            return Err(PreprocessError::InvalidShape("rows have no channels".to_string()));
        }

        let mut data = Vec::with_capacity(rows.len() * channels);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != channels {
                return Err(PreprocessError::InvalidShape(format!(
                    "row {} has {} channels, expected {}",
                    i,
                    row.len(),
                    channels
                )));
            }
            data.extend_from_slice(row);
        }
        Self::from_flat(data, channels)
    }

    /// Build a profile from row-major flat data.
    pub fn from_flat(data: Vec<Sample>, channels: usize) -> PreprocessResult<Self> {
        if channels == 0 {
            return Err(PreprocessError::InvalidShape("channel count must be > 0".to_string()));
        }
        if data.len() % channels != 0 {
            return Err(PreprocessError::InvalidShape(format!(
                "{} values do not divide into {} channels",
                data.len(),
                channels
            )));
        }
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            return Err(PreprocessError::InvalidShape(format!(
                "non-finite value at row {}, channel {}",
                pos / channels,
                pos % channels
            )));
        }
        Ok(Self { channels, data })
    }

    /// Build a profile from per-channel columns of equal length.
    pub fn from_channels<C: AsRef<[f64]>>(columns: &[C]) -> PreprocessResult<Self> {
        let channels = columns.len();
        if channels == 0 {
            return Err(PreprocessError::InvalidShape("no channels given".to_string()));
        }
        let len = columns[0].as_ref().len();
        for (c, col) in columns.iter().enumerate() {
            if col.as_ref().len() != len {
                return Err(PreprocessError::InvalidShape(format!(
                    "channel {} has {} samples, expected {}",
                    c,
                    col.as_ref().len(),
                    len
                )));
            }
        }
        let mut data = Vec::with_capacity(len * channels);
        for i in 0..len {
            for col in columns {
                data.push(col.as_ref()[i]);
            }
        }
        Self::from_flat(data, channels)
    }

    /// An all-zero profile of `len` rows.
    pub fn zeros(len: usize, channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            channels,
            data: vec![0.0; len * channels],
        }
    }

    /// Number of samples (rows).
    pub fn len(&self) -> usize {
        self.data.len() / self.channels
    }

    /// True when the profile has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of channels (columns).
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// One sample row.
    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.channels;
        &self.data[start..start + self.channels]
    }

    pub(crate) fn row_mut(&mut self, index: usize) -> &mut [f64] {
        let start = index * self.channels;
        &mut self.data[start..start + self.channels]
    }

    /// Iterate over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.channels)
    }

    /// Copy out a single channel.
    pub fn channel(&self, ch: usize) -> Vec<f64> {
        self.rows().map(|r| r[ch]).collect()
    }

    /// Row-major view of all samples.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Row `index` of a 3-channel profile as a vector.
    pub fn vec3(&self, index: usize) -> Vec3 {
        let r = self.row(index);
        [r[0], r[1], r[2]]
    }

    /// Fail unless the profile has exactly `expected` channels.
    pub fn require_channels(&self, expected: usize) -> PreprocessResult<()> {
        if self.channels != expected {
            return Err(PreprocessError::InvalidShape(format!(
                "expected {} channels, got {}",
                expected, self.channels
            )));
        }
        Ok(())
    }

    /// Reorder channels: output channel `i` is input channel `order[i]`.
    pub fn permute_channels(&self, order: &[usize]) -> PreprocessResult<Self> {
        if order.len() != self.channels {
            return Err(PreprocessError::InvalidShape(format!(
                "permutation of length {} for {} channels",
                order.len(),
                self.channels
            )));
        }
        let mut seen = vec![false; self.channels];
        for &c in order {
            if c >= self.channels || seen[c] {
                return Err(PreprocessError::InvalidParameter(format!(
                    "{:?} is not a permutation of 0..{}",
                    order, self.channels
                )));
            }
            seen[c] = true;
        }
        let data = self
            .rows()
            .flat_map(|r| order.iter().map(move |&c| r[c]))
            .collect();
        Ok(Self {
            channels: self.channels,
            data,
        })
    }

    /// Multiply each channel by its own factor, broadcast over all rows.
    pub fn scale_channels(&self, factors: &[f64]) -> PreprocessResult<Self> {
        if factors.len() != self.channels {
            return Err(PreprocessError::InvalidShape(format!(
                "{} scale factors for {} channels",
                factors.len(),
                self.channels
            )));
        }
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(i, &v)| v * factors[i % self.channels])
            .collect();
        Self::from_flat(data, self.channels)
    }

    /// Transposed copy: one `Vec` per channel.
    pub fn to_channels_first(&self) -> Vec<Vec<f64>> {
        (0..self.channels).map(|c| self.channel(c)).collect()
    }
}

impl fmt::Display for KinematicProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KinematicProfile({} x {})", self.len(), self.channels)
    }
}

/// Timestamps paired 1:1 with the rows of a profile.
///
/// Values are finite and non-decreasing. Strict monotonicity is checked
/// separately by the consumers that need it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeVector(Vec<f64>);

impl TimeVector {
    /// Validate and wrap timestamps.
    pub fn new(times: Vec<f64>) -> PreprocessResult<Self> {
        if let Some(pos) = times.iter().position(|t| !t.is_finite()) {
            return Err(PreprocessError::InvalidShape(format!(
                "non-finite timestamp at index {}",
                pos
            )));
        }
        if let Some(i) = times.windows(2).position(|w| w[1] < w[0]) {
            return Err(PreprocessError::NonMonotonicTime { index: i + 1 });
        }
        Ok(Self(times))
    }

    /// Uniformly sampled time axis starting at zero.
    pub fn uniform(len: usize, sample_rate: f64) -> PreprocessResult<Self> {
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(PreprocessError::InvalidParameter(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        Ok(Self((0..len).map(|i| i as f64 / sample_rate).collect()))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<f64> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.0.last().copied()
    }

    /// Fail on the first repeated timestamp.
    pub fn require_strictly_increasing(&self) -> PreprocessResult<()> {
        match self.0.windows(2).position(|w| w[1] <= w[0]) {
            Some(i) => Err(PreprocessError::NonMonotonicTime { index: i + 1 }),
            None => Ok(()),
        }
    }

    /// Sample rate estimated from the first interval.
    pub fn sample_rate(&self) -> Option<f64> {
        match self.0.as_slice() {
            [t0, t1, ..] if t1 > t0 => Some(1.0 / (t1 - t0)),
            _ => None,
        }
    }
}

/// Check that a profile and its time axis can be consumed together.
pub(crate) fn check_aligned(
    profile: &KinematicProfile,
    time: &TimeVector,
    min_samples: usize,
) -> PreprocessResult<()> {
    if time.len() != profile.len() {
        return Err(PreprocessError::LengthMismatch {
            expected: profile.len(),
            actual: time.len(),
        });
    }
    if profile.len() < min_samples {
        return Err(PreprocessError::TooFewSamples {
            required: min_samples,
            actual: profile.len(),
        });
    }
    Ok(())
}

/// Index of the first maximum of `values`.
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Euclidean norm of a 3-vector.
#[inline]
pub fn norm3(v: &Vec3) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
