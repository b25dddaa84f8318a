//! Detrending and zero-phase Butterworth low-pass filtering
//!
//! Raw sensor channels are cleaned before augmentation: a least-squares line
//! is removed from each channel, then the channel is low-pass filtered forward
//! and backward so the result has no phase delay.
//!
//! ## Design
//!
//! The analog Butterworth prototype is mapped to the z-plane with the bilinear
//! transform, pre-warped so the -3 dB point lands exactly on the requested
//! cutoff. Poles are grouped into second-order sections (plus one first-order
//! section for odd orders) and run as a cascade of Direct Form II Transposed
//! biquads.
//!
//! ```text
//!   x ──► detrend ──► [odd-extend] ──► H(z) ──► reverse ──► H(z) ──► reverse ──► trim ──► y
//! ```
//!
//! ## Example
//!
//! ```rust
//! use headkin_core::filter::ButterworthLowpass;
//!
//! let lpf = ButterworthLowpass::new(4, 300.0, 3200.0).unwrap();
//! let x: Vec<f64> = (0..256).map(|i| (i as f64 * 0.01).sin()).collect();
//! let y = lpf.filtfilt(&x).unwrap();
//! assert_eq!(y.len(), x.len());
//! ```

use crate::types::{KinematicProfile, PreprocessError, PreprocessResult};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Highest supported filter order.
pub const MAX_ORDER: usize = 20;

/// Optional cleaning step applied before augmentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub enabled: bool,
    pub cutoff_hz: f64,
    pub sample_rate_hz: f64,
    pub order: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cutoff_hz: 300.0,
            sample_rate_hz: 3200.0,
            order: 4,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> PreprocessResult<()> {
        check_design(self.order, self.cutoff_hz, self.sample_rate_hz)
    }

    /// Apply the configured cleaning, or return a copy when disabled.
    pub fn apply(&self, profile: &KinematicProfile) -> PreprocessResult<KinematicProfile> {
        if !self.enabled {
            return Ok(profile.clone());
        }
        filter_and_detrend(profile, self.cutoff_hz, self.sample_rate_hz, self.order)
    }
}

/// A single second-order section.
///
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone)]
pub struct Biquad {
    /// Numerator coefficients [b0, b1, b2]
    b: [f64; 3],
    /// Denominator coefficients [a1, a2] (a0 is normalized to 1)
    a: [f64; 2],
    state: [f64; 2],
}

impl Biquad {
    pub fn new(b: [f64; 3], a: [f64; 2]) -> Self {
        Self { b, a, state: [0.0; 2] }
    }

    /// Process a single sample using Direct Form II Transposed.
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b[0] * input + self.state[0];
        self.state[0] = self.b[1] * input - self.a[0] * output + self.state[1];
        self.state[1] = self.b[2] * input - self.a[1] * output;
        output
    }

    pub fn reset(&mut self) {
        self.state = [0.0; 2];
    }

    /// Gain at z = 1.
    pub fn dc_gain(&self) -> f64 {
        (self.b[0] + self.b[1] + self.b[2]) / (1.0 + self.a[0] + self.a[1])
    }

    /// Load the state this section settles to under a constant input.
    /// Returns the matching constant output.
    pub fn settle(&mut self, input: f64) -> f64 {
        let output = self.dc_gain() * input;
        self.state[0] = output - self.b[0] * input;
        self.state[1] = self.b[2] * input - self.a[1] * output;
        output
    }

    pub fn numerator(&self) -> &[f64; 3] {
        &self.b
    }

    pub fn denominator(&self) -> &[f64; 2] {
        &self.a
    }

    /// Poles inside the unit circle.
    pub fn is_stable(&self) -> bool {
        self.a[1].abs() < 1.0 && self.a[0].abs() < 1.0 + self.a[1]
    }

    fn response(&self, z_inv: Complex64) -> Complex64 {
        let z_inv2 = z_inv * z_inv;
        let num = self.b[0] + self.b[1] * z_inv + self.b[2] * z_inv2;
        let den = 1.0 + self.a[0] * z_inv + self.a[1] * z_inv2;
        num / den
    }
}

/// Digital Butterworth low-pass as a biquad cascade.
#[derive(Debug, Clone)]
pub struct ButterworthLowpass {
    sections: Vec<Biquad>,
    order: usize,
    cutoff_hz: f64,
    sample_rate: f64,
}

impl ButterworthLowpass {
    /// Design a low-pass of `order` with its -3 dB point at `cutoff_hz`.
    pub fn new(order: usize, cutoff_hz: f64, sample_rate: f64) -> PreprocessResult<Self> {
        check_design(order, cutoff_hz, sample_rate)?;
        let wc = prewarp(cutoff_hz, sample_rate);
        let k = 2.0 * sample_rate;

        let sections = butterworth_poles(order)
            .into_iter()
            .map(|p| {
                let (b, a) = if p.im.abs() < 1e-10 {
                    bilinear_1pole(p.re * wc, k)
                } else {
                    bilinear_2pole(p * wc, k)
                };
                Biquad::new(b, a)
            })
            .collect();

        Ok(Self {
            sections,
            order,
            cutoff_hz,
            sample_rate,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff_hz
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    /// Edge padding used by [`filtfilt`](Self::filtfilt).
    pub fn padlen(&self) -> usize {
        3 * (self.order + 1)
    }

    /// Complex response at `freq_hz`.
    pub fn frequency_response(&self, freq_hz: f64) -> Complex64 {
        let w = 2.0 * PI * freq_hz / self.sample_rate;
        let z_inv = Complex64::from_polar(1.0, -w);
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |h, s| h * s.response(z_inv))
    }

    /// |H| at `freq_hz`.
    pub fn magnitude(&self, freq_hz: f64) -> f64 {
        self.frequency_response(freq_hz).norm()
    }

    /// Causal single pass, started from the steady state of `x[0]`.
    pub fn filter(&self, x: &[f64]) -> Vec<f64> {
        let mut sections = self.sections.clone();
        if let Some(&x0) = x.first() {
            let mut level = x0;
            for s in sections.iter_mut() {
                level = s.settle(level);
            }
        }
        x.iter()
            .map(|&v| sections.iter_mut().fold(v, |acc, s| s.process(acc)))
            .collect()
    }

    /// Zero-phase forward-backward filtering with odd-extension padding.
    pub fn filtfilt(&self, x: &[f64]) -> PreprocessResult<Vec<f64>> {
        let pad = self.padlen();
        if x.len() <= pad {
            return Err(PreprocessError::TooFewSamples {
                required: pad + 1,
                actual: x.len(),
            });
        }
        let n = x.len();
        let (first, last) = (x[0], x[n - 1]);

        let mut ext = Vec::with_capacity(n + 2 * pad);
        ext.extend((1..=pad).rev().map(|i| 2.0 * first - x[i]));
        ext.extend_from_slice(x);
        ext.extend((1..=pad).map(|i| 2.0 * last - x[n - 1 - i]));

        let mut y = self.filter(&ext);
        y.reverse();
        let mut y = self.filter(&y);
        y.reverse();
        Ok(y[pad..pad + n].to_vec())
    }
}

/// Remove the least-squares line from `x`.
pub fn detrend(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }
    let t_mean = (n - 1) as f64 / 2.0;
    let x_mean = x.iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, &v) in x.iter().enumerate() {
        let dt = i as f64 - t_mean;
        sxy += dt * (v - x_mean);
        sxx += dt * dt;
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    x.iter()
        .enumerate()
        .map(|(i, &v)| v - x_mean - slope * (i as f64 - t_mean))
        .collect()
}

/// Detrend then zero-phase low-pass every channel of a profile.
pub fn filter_and_detrend(
    profile: &KinematicProfile,
    cutoff_hz: f64,
    sample_rate_hz: f64,
    order: usize,
) -> PreprocessResult<KinematicProfile> {
    let lpf = ButterworthLowpass::new(order, cutoff_hz, sample_rate_hz)?;
    let columns = profile
        .to_channels_first()
        .iter()
        .map(|c| lpf.filtfilt(&detrend(c)))
        .collect::<PreprocessResult<Vec<_>>>()?;
    tracing::debug!(
        order,
        cutoff_hz,
        sample_rate_hz,
        samples = profile.len(),
        "filtered profile"
    );
    KinematicProfile::from_channels(&columns)
}

fn check_design(order: usize, cutoff_hz: f64, sample_rate: f64) -> PreprocessResult<()> {
    if order == 0 || order > MAX_ORDER {
        return Err(PreprocessError::InvalidParameter(format!(
            "filter order must be 1-{}, got {}",
            MAX_ORDER, order
        )));
    }
    if !(sample_rate > 0.0) || !(cutoff_hz > 0.0 && cutoff_hz < sample_rate / 2.0) {
        return Err(PreprocessError::InvalidParameter(format!(
            "cutoff {} Hz must lie inside (0, {}) Hz",
            cutoff_hz,
            sample_rate / 2.0
        )));
    }
    Ok(())
}

/// Pre-warp frequency for bilinear transform.
fn prewarp(freq_hz: f64, sample_rate: f64) -> f64 {
    2.0 * sample_rate * (PI * freq_hz / sample_rate).tan()
}

/// Analog prototype poles: one per conjugate pair (upper half plane), plus
/// the real pole at -1 for odd orders.
fn butterworth_poles(order: usize) -> Vec<Complex64> {
    let mut poles: Vec<Complex64> = (0..order / 2)
        .map(|k| {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            Complex64::from_polar(1.0, theta)
        })
        .collect();
    if order % 2 == 1 {
        poles.push(Complex64::new(-1.0, 0.0));
    }
    poles
}

/// Bilinear transform of H(s) = -p / (s - p).
fn bilinear_1pole(p: f64, k: f64) -> ([f64; 3], [f64; 2]) {
    let alpha = k - p;
    let beta = k + p;
    let b0 = -p / alpha;
    ([b0, b0, 0.0], [-beta / alpha, 0.0])
}

/// Bilinear transform of H(s) = |p|² / ((s - p)(s - p*)).
fn bilinear_2pole(p: Complex64, k: f64) -> ([f64; 3], [f64; 2]) {
    let p_mag_sq = p.norm_sqr();
    let k2 = k * k;
    let d = k2 - 2.0 * k * p.re + p_mag_sq;

    let g = p_mag_sq / d;
    let a1 = 2.0 * (p_mag_sq - k2) / d;
    let a2 = (k2 + 2.0 * k * p.re + p_mag_sq) / d;
    ([g, 2.0 * g, g], [a1, a2])
}
