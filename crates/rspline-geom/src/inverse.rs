//! Two-phase inverse evaluation shared by every curve and patch type.
//!
//! Given a forward evaluator (parameter → point), recover the parameter whose
//! point is nearest a target:
//!
//! 1. **Coarse search**: sample a regular grid over the search box, keep the
//!    nearest sample, then repeatedly re-sample a shrinking bracket around it.
//! 2. **Newton refinement**: minimise `½‖S − p‖²` with Newton steps built
//!    from the analytic derivatives, constrained to the search box.
//!
//! The result is a locally consistent answer, not a global optimum.

use nalgebra::Matrix2;
use rspline_math::{Point2, Point3, Vec2, Vec3, NEWTON_TOL, ORTHONORMAL_TOL};
use serde::{Deserialize, Serialize};

use crate::{Curve3d, GeomError, GeomResult, Patch};

/// Maximum number of step halvings per Newton iteration.
const MAX_BACKTRACK: usize = 8;

/// Tuning knobs for inverse evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InverseSettings {
    /// Lower bound on the per-axis sample count before the `+ 1`.
    pub min_samples: usize,
    /// Number of bracket-tightening passes after the initial grid.
    pub refinement_passes: usize,
    /// Newton iteration budget.
    pub max_iterations: usize,
    /// Distance (and step length) below which Newton stops.
    pub tolerance: f64,
}

impl InverseSettings {
    /// Per-axis grid size for an object with `num_control_points` control points.
    pub fn num_samples(&self, num_control_points: usize) -> usize {
        num_control_points.max(self.min_samples) + 1
    }
}

impl Default for InverseSettings {
    fn default() -> Self {
        Self {
            min_samples: 7,
            refinement_passes: 10,
            max_iterations: 20,
            tolerance: NEWTON_TOL,
        }
    }
}

/// A closed search interval along one parameter axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamInterval {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
    /// Whether iterates wrap around instead of clamping.
    pub periodic: bool,
}

impl ParamInterval {
    /// A clamping interval. Fails if `min > max` or a bound is not finite.
    pub fn new(min: f64, max: f64) -> GeomResult<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(GeomError::invalid(format!(
                "non-finite search interval [{min}, {max}]"
            )));
        }
        if min > max {
            return Err(GeomError::invalid(format!(
                "inverted search interval [{min}, {max}]"
            )));
        }
        Ok(Self {
            min,
            max,
            periodic: false,
        })
    }

    /// Mark the interval periodic when the axis is periodic with the given
    /// `period` and the interval covers a whole period.
    pub fn with_period(mut self, periodic: bool, period: f64) -> Self {
        self.periodic = periodic && period > 0.0 && self.span() >= period - ORTHONORMAL_TOL;
        self
    }

    /// Length of the interval.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Map `t` into the interval: wrap when periodic, clamp otherwise.
    pub fn constrain(&self, t: f64) -> f64 {
        let span = self.span();
        if self.periodic && span > 0.0 {
            self.min + (t - self.min).rem_euclid(span)
        } else {
            t.clamp(self.min, self.max)
        }
    }

    fn contains(&self, t: f64) -> bool {
        t >= self.min && t <= self.max
    }
}

/// Regularly spaced samples `lo, ..., hi` (inclusive) with their spacing.
fn grid(lo: f64, hi: f64, n: usize) -> (impl Iterator<Item = f64>, f64) {
    let step = (hi - lo) / (n - 1) as f64;
    ((0..n).map(move |i| lo + step * i as f64), step)
}

// =============================================================================
// Patches
// =============================================================================

/// Coarse search for the grid sample of `patch` nearest `target`.
///
/// Samples `num_samples × num_samples` points over the box, then performs
/// `passes` further passes, each re-sampling the cell neighbourhood of the
/// current best (clamped to the box).
pub fn approximate_inverse_evaluate<P: Patch + ?Sized>(
    patch: &P,
    target: &Point3,
    num_samples: usize,
    u: ParamInterval,
    v: ParamInterval,
    passes: usize,
) -> GeomResult<Point2> {
    let n = num_samples.max(2);
    let (mut u_lo, mut u_hi, mut v_lo, mut v_hi) = (u.min, u.max, v.min, v.max);
    let mut best = Point2::new(u.min, v.min);
    let mut best_dist = f64::INFINITY;

    for _ in 0..=passes {
        let (us, du) = grid(u_lo, u_hi, n);
        let us: Vec<f64> = us.collect();
        let (vs, dv) = grid(v_lo, v_hi, n);
        for vv in vs {
            for &uu in &us {
                let d = (patch.evaluate(uu, vv)? - target).norm_squared();
                if d < best_dist {
                    best_dist = d;
                    best = Point2::new(uu, vv);
                }
            }
        }
        u_lo = (best.x - du).max(u.min);
        u_hi = (best.x + du).min(u.max);
        v_lo = (best.y - dv).max(v.min);
        v_hi = (best.y + dv).min(v.max);
    }

    log::trace!(
        "coarse inverse seed ({}, {}) at distance {}",
        best.x,
        best.y,
        best_dist.sqrt()
    );
    Ok(best)
}

/// Second-order part of the squared-distance Hessian: `[S_uu·r, S_uv·r; S_uv·r, S_vv·r]`.
fn curvature_terms<P: Patch + ?Sized>(patch: &P, uv: &Point2, r: &Vec3) -> GeomResult<Matrix2<f64>> {
    let suu = patch.evaluate_2nd_derivative_uu(uv.x, uv.y)?;
    let suv = patch.evaluate_2nd_derivative_uv(uv.x, uv.y)?;
    let svv = patch.evaluate_2nd_derivative_vv(uv.x, uv.y)?;
    let off = suv.dot(r);
    Ok(Matrix2::new(suu.dot(r), off, off, svv.dot(r)))
}

fn is_positive_definite(h: &Matrix2<f64>) -> bool {
    h[(0, 0)] > 0.0 && h.determinant() > 0.0
}

/// Solve `H δ = −g`. Singular systems fall back to independent per-axis steps
/// on the axes with non-vanishing curvature.
fn solve_step(h: &Matrix2<f64>, g: &Vec2) -> Option<Vec2> {
    let scale = h.abs().max();
    if scale <= f64::MIN_POSITIVE {
        return None;
    }
    let det = h.determinant();
    if det.abs() > f64::EPSILON * scale * scale {
        if let Some(inv) = h.try_inverse() {
            return Some(-(inv * g));
        }
    }
    let axis_step = |hii: f64, gi: f64| {
        if hii.abs() > f64::EPSILON * scale {
            -gi / hii
        } else {
            0.0
        }
    };
    let step = Vec2::new(axis_step(h[(0, 0)], g.x), axis_step(h[(1, 1)], g.y));
    (step != Vec2::zeros()).then_some(step)
}

/// Bounded Newton–Raphson refinement of `seed` towards `target`.
///
/// Uses the full Hessian of the squared distance when the patch supplies
/// second derivatives and it is positive definite, otherwise the Gauss–Newton
/// approximation. Never leaves the search box. Exhausting the iteration
/// budget is not an error: the best iterate found is returned.
pub fn newton_raphson<P: Patch + ?Sized>(
    patch: &P,
    target: &Point3,
    seed: Point2,
    max_iterations: usize,
    tolerance: f64,
    u: ParamInterval,
    v: ParamInterval,
) -> GeomResult<Point2> {
    let mut uv = Point2::new(u.constrain(seed.x), v.constrain(seed.y));
    let mut r = patch.evaluate(uv.x, uv.y)? - target;
    let mut dist = r.norm();

    for _ in 0..max_iterations {
        if dist < tolerance {
            return Ok(uv);
        }
        let su = patch.evaluate_derivative_u(uv.x, uv.y)?;
        let sv = patch.evaluate_derivative_v(uv.x, uv.y)?;
        let g = Vec2::new(su.dot(&r), sv.dot(&r));
        let cross = su.dot(&sv);
        let jtj = Matrix2::new(su.dot(&su), cross, cross, sv.dot(&sv));

        let h = match curvature_terms(patch, &uv, &r) {
            Ok(c) if is_positive_definite(&(jtj + c)) => jtj + c,
            Ok(_) => jtj,
            Err(e) if e.is_not_implemented() => jtj,
            Err(e) => return Err(e),
        };
        let Some(step) = solve_step(&h, &g) else {
            return Ok(uv);
        };

        let mut scale = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACK {
            let candidate = Point2::new(
                u.constrain(uv.x + scale * step.x),
                v.constrain(uv.y + scale * step.y),
            );
            let rc = patch.evaluate(candidate.x, candidate.y)? - target;
            if rc.norm() < dist {
                accepted = Some((candidate, rc));
                break;
            }
            scale *= 0.5;
        }
        // No descent along the step: a stationary point of the distance
        let Some((candidate, rc)) = accepted else {
            return Ok(uv);
        };
        let moved = (candidate - uv).norm();
        uv = candidate;
        r = rc;
        dist = r.norm();
        if moved < tolerance {
            return Ok(uv);
        }
    }

    if dist >= tolerance {
        log::debug!(
            "newton refinement stopped after {} iterations at ({}, {}), residual {}",
            max_iterations,
            uv.x,
            uv.y,
            dist
        );
    }
    Ok(uv)
}

/// Full inversion protocol for a patch: coarse search then Newton refinement.
pub fn inverse_evaluate_patch<P: Patch + ?Sized>(
    patch: &P,
    target: &Point3,
    num_control_points: usize,
    settings: &InverseSettings,
    u: ParamInterval,
    v: ParamInterval,
) -> GeomResult<Point2> {
    let num_samples = settings.num_samples(num_control_points);
    let seed = approximate_inverse_evaluate(
        patch,
        target,
        num_samples,
        u,
        v,
        settings.refinement_passes,
    )?;
    let uv = newton_raphson(
        patch,
        target,
        seed,
        settings.max_iterations,
        settings.tolerance,
        u,
        v,
    )?;
    debug_assert!(u.contains(uv.x) && v.contains(uv.y));
    Ok(uv)
}

// =============================================================================
// Curves
// =============================================================================

/// Coarse search for the sample of `curve` nearest `target`.
pub fn approximate_curve_inverse<C: Curve3d + ?Sized>(
    curve: &C,
    target: &Point3,
    num_samples: usize,
    t: ParamInterval,
    passes: usize,
) -> GeomResult<f64> {
    let n = num_samples.max(2);
    let (mut lo, mut hi) = (t.min, t.max);
    let mut best = t.min;
    let mut best_dist = f64::INFINITY;

    for _ in 0..=passes {
        let (ts, dt) = grid(lo, hi, n);
        for tt in ts {
            let d = (curve.evaluate(tt)? - target).norm_squared();
            if d < best_dist {
                best_dist = d;
                best = tt;
            }
        }
        lo = (best - dt).max(t.min);
        hi = (best + dt).min(t.max);
    }

    log::trace!("coarse curve inverse seed {} at distance {}", best, best_dist.sqrt());
    Ok(best)
}

/// Bounded 1D Newton–Raphson refinement on `½‖C(t) − p‖²`.
pub fn curve_newton_raphson<C: Curve3d + ?Sized>(
    curve: &C,
    target: &Point3,
    seed: f64,
    max_iterations: usize,
    tolerance: f64,
    t: ParamInterval,
) -> GeomResult<f64> {
    let mut x = t.constrain(seed);
    let mut r = curve.evaluate(x)? - target;
    let mut dist = r.norm();

    for _ in 0..max_iterations {
        if dist < tolerance {
            return Ok(x);
        }
        let d1 = curve.evaluate_derivative(x)?;
        let g = d1.dot(&r);
        let gauss = d1.norm_squared();
        let h = match curve.evaluate_2nd_derivative(x) {
            Ok(d2) if gauss + d2.dot(&r) > 0.0 => gauss + d2.dot(&r),
            Ok(_) => gauss,
            Err(e) if e.is_not_implemented() => gauss,
            Err(e) => return Err(e),
        };
        if h <= f64::MIN_POSITIVE {
            return Ok(x);
        }
        let step = -g / h;

        let mut scale = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACK {
            let candidate = t.constrain(x + scale * step);
            let rc = curve.evaluate(candidate)? - target;
            if rc.norm() < dist {
                accepted = Some((candidate, rc));
                break;
            }
            scale *= 0.5;
        }
        let Some((candidate, rc)) = accepted else {
            return Ok(x);
        };
        let moved = (candidate - x).abs();
        x = candidate;
        r = rc;
        dist = r.norm();
        if moved < tolerance {
            return Ok(x);
        }
    }

    if dist >= tolerance {
        log::debug!(
            "curve newton refinement stopped after {} iterations at {}, residual {}",
            max_iterations,
            x,
            dist
        );
    }
    Ok(x)
}

/// Full inversion protocol for a curve: coarse search then Newton refinement.
pub fn inverse_evaluate_curve<C: Curve3d + ?Sized>(
    curve: &C,
    target: &Point3,
    settings: &InverseSettings,
    t: ParamInterval,
) -> GeomResult<f64> {
    let num_samples = settings.num_samples(curve.num_control_points());
    let seed =
        approximate_curve_inverse(curve, target, num_samples, t, settings.refinement_passes)?;
    let x = curve_newton_raphson(
        curve,
        target,
        seed,
        settings.max_iterations,
        settings.tolerance,
        t,
    )?;
    debug_assert!(t.contains(x));
    Ok(x)
}
