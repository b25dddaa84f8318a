//! Adaptive ODE solvers
//!
//! Integrates first-order systems `y' = f(t, y)` and reports the state at a
//! caller-supplied list of output times. Two methods sit behind the
//! [`OdeSolver`] trait:
//!
//! - [`DormandPrince45`]: explicit embedded Runge-Kutta 5(4) ("RK45"), the
//!   default for non-stiff problems.
//! - [`ImplicitTrapezoid`]: A-stable trapezoidal rule with Newton iteration and
//!   step-doubling error control, for stiff problems.
//!
//! Both clamp their steps so that every output time is hit exactly, which
//! also keeps every right-hand-side evaluation inside `[t_eval[0], t_eval[last]]`.
//!
//! ## Example
//!
//! ```rust
//! use headkin_core::ode::{DormandPrince45, OdeSolver, OdeSystem, SolverOptions};
//! use headkin_core::types::PreprocessResult;
//!
//! struct Decay;
//!
//! impl OdeSystem for Decay {
//!     fn dim(&self) -> usize { 1 }
//!     fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) -> PreprocessResult<()> {
//!         dydt[0] = -y[0];
//!         Ok(())
//!     }
//! }
//!
//! let solver = DormandPrince45::new(SolverOptions::default());
//! let ys = solver.solve(&Decay, &[1.0], &[0.0, 1.0]).unwrap();
//! assert!((ys[1][0] - (-1.0f64).exp()).abs() < 1e-3);
//! ```

use crate::types::{PreprocessError, PreprocessResult};
use serde::{Deserialize, Serialize};

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;

/// A first-order ODE system.
pub trait OdeSystem {
    /// State dimension.
    fn dim(&self) -> usize;

    /// Evaluate `dydt = f(t, y)`.
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) -> PreprocessResult<()>;

    /// Jacobian `df/dy` as rows. Defaults to forward differences.
    fn jacobian(&self, t: f64, y: &[f64]) -> PreprocessResult<Vec<Vec<f64>>> {
        let n = self.dim();
        let mut f0 = vec![0.0; n];
        self.rhs(t, y, &mut f0)?;

        let mut jac = vec![vec![0.0; n]; n];
        let mut yp = y.to_vec();
        let mut fp = vec![0.0; n];
        for j in 0..n {
            let h = f64::EPSILON.sqrt() * y[j].abs().max(1.0);
            yp[j] = y[j] + h;
            self.rhs(t, &yp, &mut fp)?;
            for i in 0..n {
                jac[i][j] = (fp[i] - f0[i]) / h;
            }
            yp[j] = y[j];
        }
        Ok(jac)
    }
}

/// Tolerances and limits shared by all solvers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Relative tolerance
    pub rtol: f64,
    /// Absolute tolerance
    pub atol: f64,
    /// Maximum accepted + rejected steps per solve
    pub max_steps: usize,
    /// Maximum Newton iterations per implicit stage
    pub max_newton_iters: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-3,
            atol: 1e-6,
            max_steps: 1_000_000,
            max_newton_iters: 10,
        }
    }
}

impl SolverOptions {
    /// Reject tolerances that cannot drive step control.
    pub fn validate(&self) -> PreprocessResult<()> {
        if !(self.rtol > 0.0) || !(self.atol > 0.0) {
            return Err(PreprocessError::InvalidParameter(format!(
                "tolerances must be positive (rtol={}, atol={})",
                self.rtol, self.atol
            )));
        }
        if self.max_steps == 0 || self.max_newton_iters == 0 {
            return Err(PreprocessError::InvalidParameter(
                "step and iteration limits must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// An integration method.
pub trait OdeSolver: Send + Sync {
    /// Short method name for logs.
    fn name(&self) -> &'static str;

    /// Integrate from `y0` at `t_eval[0]` and return the state at every
    /// `t_eval` point (the first entry is `y0`).
    fn solve(
        &self,
        system: &dyn OdeSystem,
        y0: &[f64],
        t_eval: &[f64],
    ) -> PreprocessResult<Vec<Vec<f64>>>;
}

/// Selectable solver method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverMethod {
    /// Explicit Dormand-Prince 5(4)
    Rk45,
    /// Implicit trapezoidal rule
    Trapezoid,
}

impl Default for SolverMethod {
    fn default() -> Self {
        SolverMethod::Rk45
    }
}

impl std::fmt::Display for SolverMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverMethod::Rk45 => write!(f, "rk45"),
            SolverMethod::Trapezoid => write!(f, "trapezoid"),
        }
    }
}

impl std::str::FromStr for SolverMethod {
    type Err = PreprocessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rk45" => Ok(SolverMethod::Rk45),
            "trapezoid" | "implicit" => Ok(SolverMethod::Trapezoid),
            other => Err(PreprocessError::InvalidParameter(format!(
                "unknown solver method '{}'",
                other
            ))),
        }
    }
}

impl SolverMethod {
    /// Instantiate the solver.
    pub fn solver(self, options: SolverOptions) -> Box<dyn OdeSolver> {
        match self {
            SolverMethod::Rk45 => Box::new(DormandPrince45::new(options)),
            SolverMethod::Trapezoid => Box::new(ImplicitTrapezoid::new(options)),
        }
    }
}

// ============================================================================
// Shared driver
// ============================================================================

enum StepOutcome {
    /// Step computed; `err` is the scaled error norm (accept when <= 1).
    Done { y: Vec<f64>, f: Vec<f64>, err: f64 },
    /// Step could not be computed at this size (e.g. Newton failed).
    Retry,
}

trait StepMethod {
    /// Order of the error estimate; step factor uses `err^(-1/(order+1))`.
    fn error_order(&self) -> f64;

    fn step(
        &self,
        system: &dyn OdeSystem,
        t: f64,
        y: &[f64],
        f: &[f64],
        h: f64,
    ) -> PreprocessResult<StepOutcome>;
}

fn integrate<M: StepMethod>(
    method: &M,
    options: &SolverOptions,
    system: &dyn OdeSystem,
    y0: &[f64],
    t_eval: &[f64],
) -> PreprocessResult<Vec<Vec<f64>>> {
    options.validate()?;
    let n = system.dim();
    if y0.len() != n {
        return Err(PreprocessError::LengthMismatch {
            expected: n,
            actual: y0.len(),
        });
    }
    if t_eval.is_empty() {
        return Err(PreprocessError::TooFewSamples {
            required: 1,
            actual: 0,
        });
    }
    if let Some(i) = t_eval.windows(2).position(|w| !(w[1] > w[0])) {
        return Err(PreprocessError::NonMonotonicTime { index: i + 1 });
    }

    let mut out = Vec::with_capacity(t_eval.len());
    out.push(y0.to_vec());
    if t_eval.len() == 1 {
        return Ok(out);
    }

    let t0 = t_eval[0];
    let t_end = t_eval[t_eval.len() - 1];
    let span = t_end - t0;
    let mut t = t0;
    let mut y = y0.to_vec();
    let mut f = vec![0.0; n];
    system.rhs(t, &y, &mut f)?;

    let mut h = initial_step(system, t, &y, &f, span, method.error_order() + 1.0, options)?;
    let min_step = 16.0 * f64::EPSILON * t0.abs().max(t_end.abs()).max(span);
    let exponent = -1.0 / (method.error_order() + 1.0);
    let mut steps = 0usize;

    for &target in &t_eval[1..] {
        while t < target {
            if steps >= options.max_steps {
                return Err(PreprocessError::SolverFailure(format!(
                    "step budget of {} exhausted at t={}",
                    options.max_steps, t
                )));
            }
            steps += 1;

            let remaining = target - t;
            let lands = h >= remaining;
            let h_try = if lands { remaining } else { h };
            if h_try < min_step && !lands {
                return Err(PreprocessError::SolverFailure(format!(
                    "step size underflow ({:e}) at t={}",
                    h_try, t
                )));
            }

            match method.step(system, t, &y, &f, h_try)? {
                StepOutcome::Done {
                    y: y_new,
                    f: f_new,
                    err,
                } if err <= 1.0 => {
                    t = if lands { target } else { t + h_try };
                    y = y_new;
                    f = f_new;
                    let factor = if err == 0.0 {
                        MAX_FACTOR
                    } else {
                        (SAFETY * err.powf(exponent)).clamp(MIN_FACTOR, MAX_FACTOR)
                    };
                    // A step shortened to hit an output time says little about h.
                    h = if lands && h_try < h { h } else { h_try * factor };
                }
                StepOutcome::Done { err, .. } => {
                    let factor = if err.is_finite() {
                        (SAFETY * err.powf(exponent)).max(MIN_FACTOR)
                    } else {
                        MIN_FACTOR
                    };
                    h = h_try * factor;
                    if h < min_step {
                        return Err(PreprocessError::SolverFailure(format!(
                            "error tolerance not met at t={} (err={:e})",
                            t, err
                        )));
                    }
                }
                StepOutcome::Retry => {
                    h = h_try * 0.5;
                    if h < min_step {
                        return Err(PreprocessError::SolverFailure(format!(
                            "implicit iteration failed to converge at t={}",
                            t
                        )));
                    }
                }
            }
        }

        if y.iter().any(|v| !v.is_finite()) {
            return Err(PreprocessError::SolverFailure(format!(
                "non-finite state at t={}",
                target
            )));
        }
        out.push(y.clone());
    }

    tracing::trace!(steps, points = t_eval.len(), "ode solve finished");
    Ok(out)
}

/// Starting step heuristic (Hairer, Nørsett & Wanner, II.4).
fn initial_step(
    system: &dyn OdeSystem,
    t0: f64,
    y0: &[f64],
    f0: &[f64],
    span: f64,
    order: f64,
    options: &SolverOptions,
) -> PreprocessResult<f64> {
    let scale: Vec<f64> = y0.iter().map(|v| options.atol + v.abs() * options.rtol).collect();
    let d0 = rms_scaled(y0, &scale);
    let d1 = rms_scaled(f0, &scale);
    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    }
    .min(span);

    let y1: Vec<f64> = y0.iter().zip(f0).map(|(y, f)| y + h0 * f).collect();
    let mut f1 = vec![0.0; y0.len()];
    system.rhs(t0 + h0, &y1, &mut f1)?;
    let diff: Vec<f64> = f1.iter().zip(f0).map(|(a, b)| a - b).collect();
    let d2 = rms_scaled(&diff, &scale) / h0;

    let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(1.0 / order)
    };
    Ok((100.0 * h0).min(h1).min(span))
}

fn rms_scaled(v: &[f64], scale: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().zip(scale).map(|(x, s)| (x / s) * (x / s)).sum();
    (sum / v.len() as f64).sqrt()
}

fn error_norm(err: &[f64], y_old: &[f64], y_new: &[f64], options: &SolverOptions) -> f64 {
    let scale: Vec<f64> = y_old
        .iter()
        .zip(y_new)
        .map(|(a, b)| options.atol + a.abs().max(b.abs()) * options.rtol)
        .collect();
    rms_scaled(err, &scale)
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` for a (numerically) singular matrix.
pub(crate) fn solve_dense(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    let mut aug: Vec<Vec<f64>> = a
        .iter()
        .zip(b)
        .map(|(row, &bi)| {
            let mut r = row.clone();
            r.push(bi);
            r
        })
        .collect();

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            if aug[row][col].abs() > max_val {
                max_val = aug[row][col].abs();
                max_row = row;
            }
        }
        if max_val < 1e-300 {
            return None;
        }
        aug.swap(col, max_row);

        let pivot = aug[col][col];
        for row in (col + 1)..n {
            let factor = aug[row][col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for j in col..=n {
                aug[row][j] -= factor * aug[col][j];
            }
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = aug[i][n];
        for j in (i + 1)..n {
            sum -= aug[i][j] * x[j];
        }
        x[i] = sum / aug[i][i];
    }
    Some(x)
}

// ============================================================================
// Dormand-Prince 5(4)
// ============================================================================

const DP_C: [f64; 6] = [1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

const DP_A: [[f64; 6]; 6] = [
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0, 0.0, 0.0],
    [9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0, 0.0],
    [35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0],
];

/// Difference between the 5th- and 4th-order weights (7 stages, FSAL).
const DP_E: [f64; 7] = [
    -71.0 / 57600.0,
    0.0,
    71.0 / 16695.0,
    -71.0 / 1920.0,
    17253.0 / 339200.0,
    -22.0 / 525.0,
    1.0 / 40.0,
];

/// Explicit Dormand-Prince 5(4) with adaptive steps.
#[derive(Debug, Clone, Default)]
pub struct DormandPrince45 {
    options: SolverOptions,
}

impl DormandPrince45 {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }
}

impl StepMethod for DormandPrince45 {
    fn error_order(&self) -> f64 {
        4.0
    }

    fn step(
        &self,
        system: &dyn OdeSystem,
        t: f64,
        y: &[f64],
        f: &[f64],
        h: f64,
    ) -> PreprocessResult<StepOutcome> {
        let n = y.len();
        let mut k: Vec<Vec<f64>> = Vec::with_capacity(7);
        k.push(f.to_vec());
        let mut ytmp = vec![0.0; n];

        for stage in 0..6 {
            for i in 0..n {
                let mut acc = 0.0;
                for (j, kj) in k.iter().enumerate() {
                    acc += DP_A[stage][j] * kj[i];
                }
                ytmp[i] = y[i] + h * acc;
            }
            let mut kn = vec![0.0; n];
            system.rhs(t + DP_C[stage] * h, &ytmp, &mut kn)?;
            k.push(kn);
        }

        // The 6th stage input is the 5th-order solution.
        let y_new = ytmp;
        let f_new = k[6].clone();
        let err_vec: Vec<f64> = (0..n)
            .map(|i| h * DP_E.iter().zip(&k).map(|(e, kj)| e * kj[i]).sum::<f64>())
            .collect();
        let err = error_norm(&err_vec, y, &y_new, &self.options);
        Ok(StepOutcome::Done {
            y: y_new,
            f: f_new,
            err,
        })
    }
}

impl OdeSolver for DormandPrince45 {
    fn name(&self) -> &'static str {
        "rk45"
    }

    fn solve(
        &self,
        system: &dyn OdeSystem,
        y0: &[f64],
        t_eval: &[f64],
    ) -> PreprocessResult<Vec<Vec<f64>>> {
        integrate(self, &self.options, system, y0, t_eval)
    }
}

// ============================================================================
// Implicit trapezoidal rule
// ============================================================================

/// Implicit trapezoidal rule with Newton iteration.
///
/// The local error is estimated by step doubling: one step of `h` against two
/// of `h/2`, scaled by `1/(2^2 - 1)`.
#[derive(Debug, Clone, Default)]
pub struct ImplicitTrapezoid {
    options: SolverOptions,
}

impl ImplicitTrapezoid {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    /// One trapezoidal step. `None` when Newton does not converge.
    fn trapezoid(
        &self,
        system: &dyn OdeSystem,
        t: f64,
        y: &[f64],
        f: &[f64],
        h: f64,
    ) -> PreprocessResult<Option<Vec<f64>>> {
        let n = y.len();
        let t1 = t + h;
        let mut z: Vec<f64> = y.iter().zip(f).map(|(yi, fi)| yi + h * fi).collect();
        let mut f1 = vec![0.0; n];

        for _ in 0..self.options.max_newton_iters {
            system.rhs(t1, &z, &mut f1)?;
            let residual: Vec<f64> = (0..n)
                .map(|i| -(z[i] - y[i] - 0.5 * h * (f[i] + f1[i])))
                .collect();

            let mut m = system.jacobian(t1, &z)?;
            for (i, row) in m.iter_mut().enumerate() {
                for v in row.iter_mut() {
                    *v *= -0.5 * h;
                }
                row[i] += 1.0;
            }

            let delta = match solve_dense(&m, &residual) {
                Some(d) => d,
                None => return Ok(None),
            };
            for i in 0..n {
                z[i] += delta[i];
            }
            if z.iter().any(|v| !v.is_finite()) {
                return Ok(None);
            }
            if error_norm(&delta, y, &z, &self.options) < 1e-2 {
                return Ok(Some(z));
            }
        }
        Ok(None)
    }
}

impl StepMethod for ImplicitTrapezoid {
    fn error_order(&self) -> f64 {
        2.0
    }

    fn step(
        &self,
        system: &dyn OdeSystem,
        t: f64,
        y: &[f64],
        f: &[f64],
        h: f64,
    ) -> PreprocessResult<StepOutcome> {
        let full = match self.trapezoid(system, t, y, f, h)? {
            Some(v) => v,
            None => return Ok(StepOutcome::Retry),
        };
        let half = 0.5 * h;
        let mid = match self.trapezoid(system, t, y, f, half)? {
            Some(v) => v,
            None => return Ok(StepOutcome::Retry),
        };
        let mut f_mid = vec![0.0; y.len()];
        system.rhs(t + half, &mid, &mut f_mid)?;
        let y_new = match self.trapezoid(system, t + half, &mid, &f_mid, h - half)? {
            Some(v) => v,
            None => return Ok(StepOutcome::Retry),
        };

        let err_vec: Vec<f64> = y_new.iter().zip(&full).map(|(a, b)| (a - b) / 3.0).collect();
        let err = error_norm(&err_vec, y, &y_new, &self.options);
        let mut f_new = vec![0.0; y.len()];
        system.rhs(t + h, &y_new, &mut f_new)?;
        Ok(StepOutcome::Done {
            y: y_new,
            f: f_new,
            err,
        })
    }
}

impl OdeSolver for ImplicitTrapezoid {
    fn name(&self) -> &'static str {
        "trapezoid"
    }

    fn solve(
        &self,
        system: &dyn OdeSystem,
        y0: &[f64],
        t_eval: &[f64],
    ) -> PreprocessResult<Vec<Vec<f64>>> {
        integrate(self, &self.options, system, y0, t_eval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Decay(f64);

    impl OdeSystem for Decay {
        fn dim(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) -> PreprocessResult<()> {
            dydt[0] = -self.0 * y[0];
            Ok(())
        }
    }

    /// x'' = -x as a first-order system.
    struct Oscillator;

    impl OdeSystem for Oscillator {
        fn dim(&self) -> usize {
            2
        }
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) -> PreprocessResult<()> {
            dydt[0] = y[1];
            dydt[1] = -y[0];
            Ok(())
        }
        fn jacobian(&self, _t: f64, _y: &[f64]) -> PreprocessResult<Vec<Vec<f64>>> {
            Ok(vec![vec![0.0, 1.0], vec![-1.0, 0.0]])
        }
    }

    /// Stiff relaxation towards cos(t).
    struct Stiff;

    impl OdeSystem for Stiff {
        fn dim(&self) -> usize {
            1
        }
        fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) -> PreprocessResult<()> {
            dydt[0] = -1000.0 * (y[0] - t.cos());
            Ok(())
        }
    }

    fn tight() -> SolverOptions {
        SolverOptions {
            rtol: 1e-8,
            atol: 1e-10,
            ..Default::default()
        }
    }

    fn grid(n: usize, end: f64) -> Vec<f64> {
        (0..n).map(|i| end * i as f64 / (n - 1) as f64).collect()
    }

    #[test]
    fn test_rk45_decay() {
        let solver = DormandPrince45::new(tight());
        let t = grid(11, 2.0);
        let ys = solver.solve(&Decay(1.5), &[2.0], &t).unwrap();
        assert_eq!(ys.len(), 11);
        for (ti, yi) in t.iter().zip(&ys) {
            assert_relative_eq!(yi[0], 2.0 * (-1.5 * ti).exp(), max_relative = 1e-6);
        }
    }

    #[test]
    fn test_trapezoid_decay() {
        let solver = ImplicitTrapezoid::new(tight());
        let t = grid(5, 1.0);
        let ys = solver.solve(&Decay(1.0), &[1.0], &t).unwrap();
        assert_relative_eq!(ys[4][0], (-1.0f64).exp(), max_relative = 1e-5);
    }

    #[test]
    fn test_oscillator_both_methods() {
        let t = grid(21, std::f64::consts::PI);
        for method in [SolverMethod::Rk45, SolverMethod::Trapezoid] {
            let solver = method.solver(tight());
            let ys = solver.solve(&Oscillator, &[1.0, 0.0], &t).unwrap();
            for (ti, yi) in t.iter().zip(&ys) {
                assert!((yi[0] - ti.cos()).abs() < 1e-4, "{} at t={}", solver.name(), ti);
            }
        }
    }

    #[test]
    fn test_stiff_problem_with_trapezoid() {
        let solver = ImplicitTrapezoid::new(SolverOptions::default());
        let ys = solver.solve(&Stiff, &[0.0], &[0.0, 1.0, 2.0]).unwrap();
        // After the fast transient the solution tracks cos(t).
        assert!((ys[2][0] - 2.0f64.cos()).abs() < 1e-2);
    }

    #[test]
    fn test_step_budget_exhaustion() {
        let options = SolverOptions {
            max_steps: 3,
            ..tight()
        };
        let solver = DormandPrince45::new(options);
        let err = solver.solve(&Stiff, &[0.0], &[0.0, 10.0]).unwrap_err();
        assert!(matches!(err, PreprocessError::SolverFailure(_)));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let solver = DormandPrince45::default();
        assert!(solver.solve(&Decay(1.0), &[1.0, 2.0], &[0.0, 1.0]).is_err());
        assert_eq!(
            solver.solve(&Decay(1.0), &[1.0], &[0.0, 1.0, 1.0]).unwrap_err(),
            PreprocessError::NonMonotonicTime { index: 2 }
        );
        assert!(solver.solve(&Decay(1.0), &[1.0], &[]).is_err());
    }

    #[test]
    fn test_single_point_returns_initial_state() {
        let ys = DormandPrince45::default()
            .solve(&Decay(1.0), &[3.0], &[0.5])
            .unwrap();
        assert_eq!(ys, vec![vec![3.0]]);
    }

    #[test]
    fn test_default_jacobian_matches_analytic() {
        struct Plain;
        impl OdeSystem for Plain {
            fn dim(&self) -> usize {
                2
            }
            fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) -> PreprocessResult<()> {
                dydt[0] = y[1];
                dydt[1] = -y[0];
                Ok(())
            }
        }
        let jac = Plain.jacobian(0.0, &[0.3, -0.2]).unwrap();
        assert!((jac[0][1] - 1.0).abs() < 1e-6);
        assert!((jac[1][0] + 1.0).abs() < 1e-6);
        assert!(jac[0][0].abs() < 1e-6);
    }

    #[test]
    fn test_solve_dense() {
        let a = vec![vec![0.0, 2.0], vec![1.0, 1.0]];
        let x = solve_dense(&a, &[4.0, 3.0]).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-12);
        assert!(solve_dense(&[vec![1.0, 2.0], vec![2.0, 4.0]], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("RK45".parse::<SolverMethod>().unwrap(), SolverMethod::Rk45);
        assert_eq!("implicit".parse::<SolverMethod>().unwrap(), SolverMethod::Trapezoid);
        assert!("euler".parse::<SolverMethod>().is_err());
        assert_eq!(SolverMethod::Trapezoid.to_string(), "trapezoid");
    }
}
