//! DAMAGE: Diffuse Axonal Multi-Axis General Evaluation
//!
//! Models the brain as a 3-DOF mass-spring-damper driven by the head's angular
//! acceleration and reports the scaled peak displacement:
//!
//! ```text
//!   M δ'' + C δ' + K δ = α(t),      δ(t0) = δ'(t0) = 0
//!   DAMAGE = β · max_t |δ(t)|
//! ```
//!
//! with `M = diag(m)`, proportional damping `C = a1 · K` and the coupled
//! stiffness matrix
//!
//! ```text
//!       ┌ kxx+kxy+kxz   -kxy          -kxz        ┐
//!   K = │ -kxy          kxy+kyy+kyz   -kyz        │
//!       └ -kxz          -kyz          kxz+kyz+kzz ┘
//! ```
//!
//! The system is integrated in first-order form `x' = A x + [0; α(t)]` with
//! `x = [δ; δ']` and `A = [[0, I], [-M⁻¹K, -M⁻¹C]]`. The input `α(t)` is the
//! piecewise-linear interpolation of the samples.

use crate::ode::{OdeSolver, OdeSystem, SolverMethod, SolverOptions};
use crate::types::{
    check_aligned, norm3, KinematicProfile, PreprocessError, PreprocessResult, TimeVector, Vec3,
};
use serde::{Deserialize, Serialize};

/// Calibrated model constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageParams {
    /// Diagonal of the mass matrix
    pub mass: Vec3,
    pub kxx: f64,
    pub kyy: f64,
    pub kzz: f64,
    pub kxy: f64,
    pub kyz: f64,
    pub kxz: f64,
    /// Proportional damping coefficient (C = a1 · K)
    pub a1: f64,
    /// Output scale factor
    pub beta: f64,
}

impl Default for DamageParams {
    fn default() -> Self {
        Self {
            mass: [1.0, 1.0, 1.0],
            kxx: 32142.0,
            kyy: 23493.0,
            kzz: 16935.0,
            kxy: 0.0,
            kyz: 0.0,
            kxz: 1636.3,
            a1: 5.9148e-3,
            beta: 2.9903,
        }
    }
}

impl DamageParams {
    /// Check that the model is physically meaningful.
    pub fn validate(&self) -> PreprocessResult<()> {
        if self.mass.iter().any(|m| !(*m > 0.0) || !m.is_finite()) {
            return Err(PreprocessError::InvalidParameter(format!(
                "masses must be positive, got {:?}",
                self.mass
            )));
        }
        let all = [
            self.kxx, self.kyy, self.kzz, self.kxy, self.kyz, self.kxz, self.a1, self.beta,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(PreprocessError::InvalidParameter(
                "model constants must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Coupled stiffness matrix.
    pub fn stiffness_matrix(&self) -> [[f64; 3]; 3] {
        let (kxx, kyy, kzz) = (self.kxx, self.kyy, self.kzz);
        let (kxy, kyz, kxz) = (self.kxy, self.kyz, self.kxz);
        [
            [kxx + kxy + kxz, -kxy, -kxz],
            [-kxy, kxy + kyy + kyz, -kyz],
            [-kxz, -kyz, kxz + kyz + kzz],
        ]
    }

    /// Proportional damping matrix.
    pub fn damping_matrix(&self) -> [[f64; 3]; 3] {
        let k = self.stiffness_matrix();
        let mut c = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                c[i][j] = self.a1 * k[i][j];
            }
        }
        c
    }

    /// First-order state matrix.
    pub fn state_matrix(&self) -> [[f64; 6]; 6] {
        let k = self.stiffness_matrix();
        let c = self.damping_matrix();
        let mut a = [[0.0; 6]; 6];
        for i in 0..3 {
            a[i][3 + i] = 1.0;
            for j in 0..3 {
                a[3 + i][j] = -k[i][j] / self.mass[i];
                a[3 + i][3 + j] = -c[i][j] / self.mass[i];
            }
        }
        a
    }
}

/// Piecewise-linear interpolation of a 3-channel signal.
///
/// Queries outside the sampled range are rejected; round-off beyond the end
/// points (relative `1e-9` of the span) is clamped.
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    time: Vec<f64>,
    values: Vec<Vec3>,
    tolerance: f64,
}

impl LinearInterpolator {
    /// Build from a 3-channel profile and a strictly increasing time axis.
    pub fn new(profile: &KinematicProfile, time: &TimeVector) -> PreprocessResult<Self> {
        profile.require_channels(3)?;
        check_aligned(profile, time, 2)?;
        time.require_strictly_increasing()?;
        let t = time.as_slice().to_vec();
        let span = t[t.len() - 1] - t[0];
        Ok(Self {
            values: (0..profile.len()).map(|i| profile.vec3(i)).collect(),
            tolerance: span * 1e-9,
            time: t,
        })
    }

    /// First and last sample time.
    pub fn range(&self) -> (f64, f64) {
        (self.time[0], self.time[self.time.len() - 1])
    }

    /// Interpolated value at `t`.
    pub fn at(&self, t: f64) -> PreprocessResult<Vec3> {
        let (start, end) = self.range();
        if !(t >= start - self.tolerance && t <= end + self.tolerance) {
            return Err(PreprocessError::OutOfRange { t, start, end });
        }
        let t = t.clamp(start, end);

        // First sample strictly after t, kept inside 1..len-1.
        let upper = self
            .time
            .partition_point(|&ti| ti <= t)
            .clamp(1, self.time.len() - 1);
        let lower = upper - 1;
        let (t0, t1) = (self.time[lower], self.time[upper]);
        let w = (t - t0) / (t1 - t0);
        let (v0, v1) = (self.values[lower], self.values[upper]);
        Ok([
            v0[0] + w * (v1[0] - v0[0]),
            v0[1] + w * (v1[1] - v0[1]),
            v0[2] + w * (v1[2] - v0[2]),
        ])
    }
}

/// The driven oscillator as an ODE system.
struct DamageSystem {
    a: [[f64; 6]; 6],
    forcing: LinearInterpolator,
}

impl OdeSystem for DamageSystem {
    fn dim(&self) -> usize {
        6
    }

    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) -> PreprocessResult<()> {
        let alpha = self.forcing.at(t)?;
        for i in 0..6 {
            dydt[i] = self.a[i].iter().zip(y).map(|(a, x)| a * x).sum();
        }
        for i in 0..3 {
            dydt[3 + i] += alpha[i];
        }
        Ok(())
    }

    fn jacobian(&self, _t: f64, _y: &[f64]) -> PreprocessResult<Vec<Vec<f64>>> {
        Ok(self.a.iter().map(|row| row.to_vec()).collect())
    }
}

/// Result of a DAMAGE evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageReport {
    /// β · peak displacement norm
    pub damage: f64,
    /// Sample index of the peak displacement
    pub peak_index: usize,
    /// Time of the peak displacement
    pub peak_time: f64,
    /// |δ(t)| at every input sample
    pub displacement_norm: Vec<f64>,
}

/// DAMAGE evaluator with a configurable ODE method.
pub struct DamageIntegrator {
    params: DamageParams,
    solver: Box<dyn OdeSolver>,
}

impl std::fmt::Debug for DamageIntegrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DamageIntegrator")
            .field("params", &self.params)
            .field("solver", &self.solver.name())
            .finish()
    }
}

impl Default for DamageIntegrator {
    fn default() -> Self {
        Self {
            params: DamageParams::default(),
            solver: SolverMethod::default().solver(SolverOptions::default()),
        }
    }
}

impl DamageIntegrator {
    /// Create an integrator using one of the built-in methods.
    pub fn new(
        params: DamageParams,
        method: SolverMethod,
        options: SolverOptions,
    ) -> PreprocessResult<Self> {
        options.validate()?;
        Self::with_solver(params, method.solver(options))
    }

    /// Create an integrator with any [`OdeSolver`].
    pub fn with_solver(params: DamageParams, solver: Box<dyn OdeSolver>) -> PreprocessResult<Self> {
        params.validate()?;
        Ok(Self { params, solver })
    }

    pub fn params(&self) -> &DamageParams {
        &self.params
    }

    /// Name of the configured solver.
    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    /// Evaluate DAMAGE for an angular-acceleration profile (rad/s²).
    pub fn evaluate(
        &self,
        profile: &KinematicProfile,
        time: &TimeVector,
    ) -> PreprocessResult<DamageReport> {
        let forcing = LinearInterpolator::new(profile, time)?;
        let system = DamageSystem {
            a: self.params.state_matrix(),
            forcing,
        };

        let states = self.solver.solve(&system, &[0.0; 6], time.as_slice())?;
        let displacement_norm: Vec<f64> = states
            .iter()
            .map(|x| norm3(&[x[0], x[1], x[2]]))
            .collect();
        let peak_index = crate::types::argmax(&displacement_norm).unwrap_or(0);
        let damage = self.params.beta * displacement_norm[peak_index];

        tracing::debug!(
            solver = self.solver.name(),
            samples = time.len(),
            damage,
            peak_index,
            "damage evaluated"
        );
        Ok(DamageReport {
            damage,
            peak_index,
            peak_time: time.as_slice()[peak_index],
            displacement_norm,
        })
    }

    /// DAMAGE value only.
    pub fn damage(&self, profile: &KinematicProfile, time: &TimeVector) -> PreprocessResult<f64> {
        self.evaluate(profile, time).map(|r| r.damage)
    }
}

/// DAMAGE with the calibrated constants and the default solver.
pub fn compute_damage(profile: &KinematicProfile, time: &TimeVector) -> PreprocessResult<f64> {
    DamageIntegrator::default().damage(profile, time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::solve_dense;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// Half-sine acceleration pulse followed by rest.
    fn pulse(peak: Vec3, pulse_s: f64, total_s: f64, fs: f64) -> (KinematicProfile, TimeVector) {
        let n = (total_s * fs) as usize + 1;
        let time = TimeVector::uniform(n, fs).unwrap();
        let rows: Vec<Vec3> = time
            .as_slice()
            .iter()
            .map(|&t| {
                let s = if t <= pulse_s { (PI * t / pulse_s).sin() } else { 0.0 };
                [peak[0] * s, peak[1] * s, peak[2] * s]
            })
            .collect();
        (KinematicProfile::from_rows(&rows).unwrap(), time)
    }

    #[test]
    fn test_stiffness_convention() {
        let k = DamageParams::default().stiffness_matrix();
        assert_eq!(k[0][0], 32142.0 + 1636.3);
        assert_eq!(k[1][1], 23493.0);
        assert_eq!(k[2][2], 1636.3 + 16935.0);
        assert_eq!(k[0][2], -1636.3);
        assert_eq!(k[2][0], -1636.3);
        assert_eq!(k[0][1], 0.0);
    }

    #[test]
    fn test_state_matrix_layout() {
        let p = DamageParams::default();
        let a = p.state_matrix();
        assert_eq!(a[0][3], 1.0);
        assert_eq!(a[2][5], 1.0);
        assert_eq!(a[3][0], -(32142.0 + 1636.3));
        assert_relative_eq!(a[3][3], -p.a1 * (32142.0 + 1636.3));
    }

    #[test]
    fn test_zero_input_gives_zero_damage() {
        let profile = KinematicProfile::zeros(200, 3);
        let time = TimeVector::uniform(200, 10_000.0).unwrap();
        let report = DamageIntegrator::default().evaluate(&profile, &time).unwrap();
        assert_eq!(report.damage, 0.0);
        assert!(report.displacement_norm.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_static_deflection_under_constant_input() {
        let alpha = [500.0, -300.0, 200.0];
        let n = 1001;
        let profile = KinematicProfile::from_rows(&vec![alpha; n]).unwrap();
        let time = TimeVector::uniform(n, 2000.0).unwrap();
        let params = DamageParams::default();
        let report = DamageIntegrator::default().evaluate(&profile, &time).unwrap();

        let k: Vec<Vec<f64>> = params.stiffness_matrix().iter().map(|r| r.to_vec()).collect();
        let static_delta = solve_dense(&k, &alpha).unwrap();
        let expected = norm3(&[static_delta[0], static_delta[1], static_delta[2]]);
        let settled = *report.displacement_norm.last().unwrap();
        assert_relative_eq!(settled, expected, max_relative = 1e-3);
        assert!(report.damage >= params.beta * settled);
        assert!(report.peak_time < 0.1);
    }

    #[test]
    fn test_methods_agree() {
        let (profile, time) = pulse([4000.0, -2500.0, 1500.0], 0.01, 0.04, 10_000.0);
        let options = SolverOptions {
            rtol: 1e-6,
            atol: 1e-9,
            ..Default::default()
        };
        let explicit = DamageIntegrator::new(DamageParams::default(), SolverMethod::Rk45, options)
            .unwrap()
            .damage(&profile, &time)
            .unwrap();
        let implicit =
            DamageIntegrator::new(DamageParams::default(), SolverMethod::Trapezoid, options)
                .unwrap()
                .damage(&profile, &time)
                .unwrap();
        assert!(explicit > 0.0);
        assert_relative_eq!(explicit, implicit, max_relative = 1e-2);
    }

    #[test]
    fn test_damage_scales_linearly() {
        let (p1, t) = pulse([1000.0, 500.0, -800.0], 0.008, 0.03, 8000.0);
        let (p2, _) = pulse([2000.0, 1000.0, -1600.0], 0.008, 0.03, 8000.0);
        let d1 = compute_damage(&p1, &t).unwrap();
        let d2 = compute_damage(&p2, &t).unwrap();
        assert_relative_eq!(d2, 2.0 * d1, max_relative = 1e-2);
    }

    #[test]
    fn test_validation_errors() {
        let integrator = DamageIntegrator::default();
        let one = KinematicProfile::from_rows(&[[1.0, 0.0, 0.0]]).unwrap();
        let t1 = TimeVector::new(vec![0.0]).unwrap();
        assert!(matches!(
            integrator.evaluate(&one, &t1),
            Err(PreprocessError::TooFewSamples { .. })
        ));

        let p = KinematicProfile::from_rows(&[[1.0, 0.0, 0.0]; 3]).unwrap();
        let dup = TimeVector::new(vec![0.0, 0.001, 0.001]).unwrap();
        assert_eq!(
            integrator.evaluate(&p, &dup).unwrap_err(),
            PreprocessError::NonMonotonicTime { index: 2 }
        );

        let short = TimeVector::new(vec![0.0, 0.001]).unwrap();
        assert!(matches!(
            integrator.evaluate(&p, &short),
            Err(PreprocessError::LengthMismatch { .. })
        ));

        let four = KinematicProfile::from_rows(&[[1.0, 0.0, 0.0, 0.0]; 3]).unwrap();
        let t3 = TimeVector::uniform(3, 1000.0).unwrap();
        assert!(integrator.evaluate(&four, &t3).unwrap_err().is_validation());
    }

    #[test]
    fn test_interpolator() {
        let p = KinematicProfile::from_rows(&[[0.0, 0.0, 0.0], [2.0, -2.0, 4.0], [4.0, 0.0, 0.0]])
            .unwrap();
        let t = TimeVector::new(vec![0.0, 1.0, 3.0]).unwrap();
        let interp = LinearInterpolator::new(&p, &t).unwrap();
        assert_eq!(interp.at(0.5).unwrap(), [1.0, -1.0, 2.0]);
        assert_eq!(interp.at(2.0).unwrap(), [3.0, -1.0, 2.0]);
        assert_eq!(interp.at(3.0).unwrap(), [4.0, 0.0, 0.0]);
        assert_eq!(interp.at(0.0).unwrap(), [0.0, 0.0, 0.0]);
        assert!(matches!(
            interp.at(3.5),
            Err(PreprocessError::OutOfRange { .. })
        ));
        assert!(interp.at(-0.1).is_err());
    }

    #[test]
    fn test_invalid_params() {
        let params = DamageParams {
            mass: [1.0, 0.0, 1.0],
            ..Default::default()
        };
        assert!(DamageIntegrator::new(params, SolverMethod::Rk45, SolverOptions::default()).is_err());
    }
}
