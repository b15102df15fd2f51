//! Non-rational B-spline curves.

use nalgebra::SVector;
use rspline_geom::{
    inverse_evaluate_curve, Curve3d, CurveKind, GeomError, GeomResult, InverseSettings,
    ParamInterval,
};
use rspline_math::{Point3, Vec3};

use crate::{basis_functions, find_span, validate_knots};

/// Parameters closer than this to an existing knot are treated as that knot.
const KNOT_TOL: f64 = 1e-12;

/// A non-rational B-spline curve in `D` dimensions.
///
/// Defined by control points, a knot vector, and a polynomial degree.
/// Evaluated using De Boor's algorithm. Setters do not validate; every query
/// does, so a curve left in an inconsistent state (say, new control points
/// without matching knots) fails with [`GeomError::InvalidConfiguration`]
/// until it is repaired.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineCurve<const D: usize> {
    control_points: Vec<SVector<f64, D>>,
    knots: Vec<f64>,
    degree: usize,
}

/// A B-spline curve in the plane.
pub type BSplineCurve2d = BSplineCurve<2>;

/// A B-spline curve in space.
pub type BSplineCurve3d = BSplineCurve<3>;

impl<const D: usize> BSplineCurve<D> {
    /// Create a B-spline curve.
    ///
    /// Fails if the knot vector length doesn't match `n + degree + 1`, the
    /// knots decrease, or the curve has fewer than `degree + 1` control points.
    pub fn new(
        control_points: Vec<SVector<f64, D>>,
        knots: Vec<f64>,
        degree: usize,
    ) -> GeomResult<Self> {
        validate_knots(&knots, control_points.len(), degree)?;
        Ok(Self {
            control_points,
            knots,
            degree,
        })
    }

    /// Create a clamped uniform B-spline with the given degree.
    ///
    /// The knot vector is clamped (first and last knots repeated `degree+1` times)
    /// with uniform internal spacing over `[0, 1]`.
    pub fn clamped_uniform(control_points: Vec<SVector<f64, D>>, degree: usize) -> GeomResult<Self> {
        let n = control_points.len();
        if n <= degree {
            return Err(GeomError::invalid(format!(
                "degree {degree} needs at least {} control points, got {n}",
                degree + 1
            )));
        }
        let m = n + degree + 1;
        let mut knots = vec![0.0; m];

        let n_internal = m - 2 * (degree + 1);
        for i in 0..=degree {
            knots[m - 1 - i] = 1.0;
        }
        for i in 1..=n_internal {
            knots[degree + i] = i as f64 / (n_internal + 1) as f64;
        }

        Self::new(control_points, knots, degree)
    }

    /// Check that the knot vector, control points and degree agree.
    pub fn validate(&self) -> GeomResult<()> {
        validate_knots(&self.knots, self.control_points.len(), self.degree)
    }

    /// Control points.
    pub fn control_points(&self) -> &[SVector<f64, D>] {
        &self.control_points
    }

    /// Replace the control points.
    pub fn set_control_points(&mut self, control_points: Vec<SVector<f64, D>>) {
        self.control_points = control_points;
    }

    /// Knot vector.
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Replace the knot vector.
    pub fn set_knots(&mut self, knots: Vec<f64>) {
        self.knots = knots;
    }

    /// Polynomial degree (order = degree + 1).
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of control points.
    pub fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    /// Parameter domain `(t_min, t_max)`.
    pub fn parameter_domain(&self) -> (f64, f64) {
        let lo = self.knots.get(self.degree).copied().unwrap_or(0.0);
        let hi = self
            .knots
            .get(self.control_points.len())
            .copied()
            .unwrap_or(lo);
        (lo, hi)
    }

    /// Evaluate the curve at parameter `t`. Parameters outside the domain
    /// are clamped to it.
    pub fn evaluate(&self, t: f64) -> GeomResult<SVector<f64, D>> {
        self.validate()?;
        Ok(self.eval(t))
    }

    /// First derivative at `t`.
    pub fn evaluate_derivative(&self, t: f64) -> GeomResult<SVector<f64, D>> {
        self.validate()?;
        Ok(self.hodograph().eval(t))
    }

    /// Second derivative at `t`.
    pub fn evaluate_2nd_derivative(&self, t: f64) -> GeomResult<SVector<f64, D>> {
        self.validate()?;
        Ok(self.hodograph().hodograph().eval(t))
    }

    /// The derivative curve `C'(t)`, a B-spline of one degree lower.
    pub fn derivative_curve(&self) -> GeomResult<Self> {
        self.validate()?;
        Ok(self.hodograph())
    }

    /// Insert the knot `t` `multiplicity` times using Boehm's algorithm.
    ///
    /// The represented curve is unchanged; each insertion adds one control
    /// point. Fails if `t` lies outside the parameter domain or the
    /// resulting knot multiplicity would exceed the degree.
    pub fn insert_knot(&mut self, t: f64, multiplicity: usize) -> GeomResult<()> {
        self.validate()?;
        if multiplicity == 0 {
            return Ok(());
        }
        let (t_min, t_max) = self.parameter_domain();
        if !(t_min..=t_max).contains(&t) {
            return Err(GeomError::invalid(format!(
                "knot {t} lies outside the domain [{t_min}, {t_max}]"
            )));
        }

        let t = self
            .knots
            .iter()
            .copied()
            .find(|k| (k - t).abs() <= KNOT_TOL)
            .unwrap_or(t);
        let existing = self.knots.iter().filter(|&&k| k == t).count();
        if existing + multiplicity > self.degree {
            return Err(GeomError::invalid(format!(
                "inserting knot {t} {multiplicity} times exceeds degree {} (existing multiplicity {existing})",
                self.degree
            )));
        }

        for _ in 0..multiplicity {
            self.insert_once(t);
        }
        log::trace!(
            "inserted knot {} x{}, curve now has {} control points",
            t,
            multiplicity,
            self.control_points.len()
        );
        Ok(())
    }

    /// De Boor evaluation; the curve must be valid.
    fn eval(&self, t: f64) -> SVector<f64, D> {
        let n = self.control_points.len() - 1;
        let t = t.clamp(self.knots[self.degree], self.knots[n + 1]);
        let span = find_span(&self.knots, n, self.degree, t);
        let basis = basis_functions(&self.knots, span, self.degree, t);

        basis
            .iter()
            .enumerate()
            .fold(SVector::zeros(), |acc, (i, &b)| {
                acc + self.control_points[span - self.degree + i] * b
            })
    }

    /// Derivative curve with control points `p·(P[i+1] − P[i]) / (u[i+p+1] − u[i+1])`
    /// over the knot vector with its first and last knot dropped.
    fn hodograph(&self) -> Self {
        let p = self.degree;
        if p == 0 {
            return Self {
                control_points: vec![SVector::zeros(); self.control_points.len()],
                knots: self.knots.clone(),
                degree: 0,
            };
        }
        let control_points = self
            .control_points
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let span = self.knots[i + p + 1] - self.knots[i + 1];
                if span.abs() < 1e-30 {
                    SVector::zeros()
                } else {
                    (w[1] - w[0]) * (p as f64 / span)
                }
            })
            .collect();
        Self {
            control_points,
            knots: self.knots[1..self.knots.len() - 1].to_vec(),
            degree: p - 1,
        }
    }

    /// Single Boehm insertion of `t`.
    fn insert_once(&mut self, t: f64) {
        let n = self.control_points.len() - 1;
        let p = self.degree;
        let span = find_span(&self.knots, n, p, t);

        let mut new_knots = Vec::with_capacity(self.knots.len() + 1);
        new_knots.extend_from_slice(&self.knots[..=span]);
        new_knots.push(t);
        new_knots.extend_from_slice(&self.knots[span + 1..]);

        let mut new_pts = Vec::with_capacity(self.control_points.len() + 1);
        new_pts.extend_from_slice(&self.control_points[..=span - p]);
        for i in (span - p + 1)..=span {
            let alpha = (t - self.knots[i]) / (self.knots[i + p] - self.knots[i]);
            new_pts.push(self.control_points[i - 1] * (1.0 - alpha) + self.control_points[i] * alpha);
        }
        new_pts.extend_from_slice(&self.control_points[span..]);

        self.knots = new_knots;
        self.control_points = new_pts;
    }
}

impl Curve3d for BSplineCurve<3> {
    fn evaluate(&self, t: f64) -> GeomResult<Point3> {
        BSplineCurve::evaluate(self, t).map(Point3::from)
    }

    fn evaluate_derivative(&self, t: f64) -> GeomResult<Vec3> {
        BSplineCurve::evaluate_derivative(self, t)
    }

    fn evaluate_2nd_derivative(&self, t: f64) -> GeomResult<Vec3> {
        BSplineCurve::evaluate_2nd_derivative(self, t)
    }

    fn inverse_evaluate(&self, p: &Point3, t_min: f64, t_max: f64) -> GeomResult<f64> {
        self.validate()?;
        let t = ParamInterval::new(t_min, t_max)?;
        inverse_evaluate_curve(self, p, &InverseSettings::default(), t)
    }

    fn domain(&self) -> (f64, f64) {
        self.parameter_domain()
    }

    fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    fn curve_type(&self) -> CurveKind {
        CurveKind::BSpline
    }

    fn clone_box(&self) -> Box<dyn Curve3d> {
        Box::new(self.clone())
    }
}
