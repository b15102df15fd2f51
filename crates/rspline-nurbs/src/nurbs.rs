//! Rational B-spline curves via homogeneous lifting.

use nalgebra::SVector;
use rspline_geom::{Curve3d, CurveKind, GeomError, GeomResult};
use rspline_math::{Point3, Vec3};

use crate::BSplineCurve;

/// A rational B-spline (NURBS) curve in `D` dimensions.
///
/// `H` is the homogeneous dimension and must equal `D + 1`; this is checked
/// at compile time when the curve is constructed. Use the [`NurbsCurve2d`]
/// and [`NurbsCurve3d`] aliases rather than spelling both out.
///
/// The curve keeps a homogeneous copy `BSplineCurve<H>` with control points
/// `(w·P, w)`. Every setter rebuilds that copy when control points, weights
/// and knots agree. When they do not, the copy is dropped and queries fail
/// with [`GeomError::InvalidConfiguration`] until the data is made
/// consistent again.
#[derive(Debug, Clone)]
pub struct NurbsCurve<const D: usize, const H: usize> {
    control_points: Vec<SVector<f64, D>>,
    weights: Vec<f64>,
    knots: Vec<f64>,
    degree: usize,
    homogeneous: Option<BSplineCurve<H>>,
}

/// A NURBS curve in the plane.
pub type NurbsCurve2d = NurbsCurve<2, 3>;

/// A NURBS curve in space.
pub type NurbsCurve3d = NurbsCurve<3, 4>;

/// `(w·p, w)`
fn lift<const D: usize, const H: usize>(p: &SVector<f64, D>, w: f64) -> SVector<f64, H> {
    SVector::from_fn(|i, _| if i < D { w * p[i] } else { w })
}

/// First `D` coordinates of a homogeneous vector.
fn head<const D: usize, const H: usize>(h: &SVector<f64, H>) -> SVector<f64, D> {
    SVector::from_fn(|i, _| h[i])
}

impl<const D: usize, const H: usize> NurbsCurve<D, H> {
    const HOMOGENEOUS_DIM: () = assert!(
        H == D + 1,
        "homogeneous dimension must be one more than the curve dimension"
    );

    /// Create a NURBS curve and build its homogeneous representation.
    ///
    /// Fails if the weights do not pair up with the control points or the
    /// knot vector does not fit the control points and degree.
    pub fn new(
        control_points: Vec<SVector<f64, D>>,
        weights: Vec<f64>,
        knots: Vec<f64>,
        degree: usize,
    ) -> GeomResult<Self> {
        let () = Self::HOMOGENEOUS_DIM;
        let mut curve = Self {
            control_points,
            weights,
            knots,
            degree,
            homogeneous: None,
        };
        curve.initialize()?;
        Ok(curve)
    }

    /// Create a NURBS curve from its homogeneous representation, recovering
    /// weights from the last coordinate and points by dividing it out.
    pub fn from_homogeneous(homogeneous: BSplineCurve<H>) -> GeomResult<Self> {
        let () = Self::HOMOGENEOUS_DIM;
        homogeneous.validate()?;
        let mut curve = Self {
            control_points: Vec::new(),
            weights: Vec::new(),
            knots: Vec::new(),
            degree: homogeneous.degree(),
            homogeneous: None,
        };
        curve.adopt(homogeneous);
        Ok(curve)
    }

    /// Rebuild the homogeneous curve from control points, weights and knots.
    ///
    /// Setters already do this; calling it directly reports why the current
    /// data is inconsistent.
    pub fn initialize(&mut self) -> GeomResult<()> {
        self.homogeneous = None;
        if self.weights.len() != self.control_points.len() {
            return Err(GeomError::invalid(format!(
                "{} weights for {} control points",
                self.weights.len(),
                self.control_points.len()
            )));
        }
        let lifted: Vec<SVector<f64, H>> = self
            .control_points
            .iter()
            .zip(&self.weights)
            .map(|(p, &w)| lift(p, w))
            .collect();
        self.homogeneous = Some(BSplineCurve::new(lifted, self.knots.clone(), self.degree)?);
        Ok(())
    }

    /// Evaluate the curve at `t`.
    ///
    /// Weights are expected to be positive; a vanishing homogeneous weight
    /// yields non-finite coordinates.
    pub fn evaluate(&self, t: f64) -> GeomResult<SVector<f64, D>> {
        let h = self.ready()?.evaluate(t)?;
        Ok(head::<D, H>(&h) / h[D])
    }

    /// First derivative at `t` by the quotient rule on `head(t) / w(t)`.
    pub fn evaluate_derivative(&self, t: f64) -> GeomResult<SVector<f64, D>> {
        let homogeneous = self.ready()?;
        let p = homogeneous.evaluate(t)?;
        let d = homogeneous.evaluate_derivative(t)?;
        let (p_last, d_last) = (p[D], d[D]);
        Ok((head::<D, H>(&d) - head::<D, H>(&p) * (d_last / p_last)) / p_last)
    }

    /// Not supported for rational curves.
    pub fn evaluate_2nd_derivative(&self, _t: f64) -> GeomResult<SVector<f64, D>> {
        Err(GeomError::not_implemented(
            "second derivative of a rational curve",
        ))
    }

    /// Not supported for rational curves.
    pub fn inverse_evaluate(&self, _p: &SVector<f64, D>, _t_min: f64, _t_max: f64) -> GeomResult<f64> {
        Err(GeomError::not_implemented(
            "inverse evaluation of a rational curve",
        ))
    }

    /// Insert the knot `t` `multiplicity` times.
    ///
    /// Insertion runs on the homogeneous curve; control points, weights and
    /// knots are then re-derived from it, so the represented curve is
    /// unchanged.
    pub fn insert_knot(&mut self, t: f64, multiplicity: usize) -> GeomResult<()> {
        let mut homogeneous = self.ready()?.clone();
        homogeneous.insert_knot(t, multiplicity)?;
        self.adopt(homogeneous);
        Ok(())
    }

    /// The homogeneous curve, if the rational data is consistent.
    pub fn homogeneous(&self) -> GeomResult<&BSplineCurve<H>> {
        self.ready()
    }

    /// Replace the curve by a homogeneous representation.
    pub fn set_homogeneous(&mut self, homogeneous: BSplineCurve<H>) -> GeomResult<()> {
        homogeneous.validate()?;
        self.adopt(homogeneous);
        Ok(())
    }

    /// Control points in physical space.
    pub fn control_points(&self) -> &[SVector<f64, D>] {
        &self.control_points
    }

    /// Replace the control points.
    pub fn set_control_points(&mut self, control_points: Vec<SVector<f64, D>>) {
        self.control_points = control_points;
        self.resync();
    }

    /// Weights, one per control point.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Replace all weights.
    pub fn set_weights(&mut self, weights: Vec<f64>) {
        self.weights = weights;
        self.resync();
    }

    /// Weight of control point `i`.
    pub fn weight(&self, i: usize) -> GeomResult<f64> {
        self.weights.get(i).copied().ok_or_else(|| {
            GeomError::invalid(format!(
                "weight index {i} out of range ({} weights)",
                self.weights.len()
            ))
        })
    }

    /// Set the weight of control point `i`.
    pub fn set_weight(&mut self, i: usize, value: f64) -> GeomResult<()> {
        let len = self.weights.len();
        let slot = self.weights.get_mut(i).ok_or_else(|| {
            GeomError::invalid(format!("weight index {i} out of range ({len} weights)"))
        })?;
        *slot = value;
        self.resync();
        Ok(())
    }

    /// Knot vector.
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Replace the knot vector.
    pub fn set_knots(&mut self, knots: Vec<f64>) {
        self.knots = knots;
        self.resync();
    }

    /// Polynomial degree.
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

    /// The homogeneous curve when its control-point count matches both the
    /// control points and the weights.
    fn ready(&self) -> GeomResult<&BSplineCurve<H>> {
        match &self.homogeneous {
            Some(h)
                if h.num_control_points() == self.control_points.len()
                    && h.num_control_points() == self.weights.len() =>
            {
                Ok(h)
            }
            _ => Err(GeomError::invalid(format!(
                "curve is not initialized: {} control points, {} weights, {} knots, degree {}",
                self.control_points.len(),
                self.weights.len(),
                self.knots.len(),
                self.degree
            ))),
        }
    }

    fn resync(&mut self) {
        if let Err(e) = self.initialize() {
            log::trace!("rational curve left uninitialized: {e}");
        }
    }

    /// Take `homogeneous` as the source of truth and re-derive the rational data.
    fn adopt(&mut self, homogeneous: BSplineCurve<H>) {
        let lifted = homogeneous.control_points();
        self.weights = lifted.iter().map(|h| h[D]).collect();
        self.control_points = lifted.iter().map(|h| head::<D, H>(h) / h[D]).collect();
        self.knots = homogeneous.knots().to_vec();
        self.degree = homogeneous.degree();
        self.homogeneous = Some(homogeneous);
    }
}

impl NurbsCurve3d {
    /// Create a NURBS circle in the XY plane.
    ///
    /// A full circle requires 9 control points with degree 2; the parameter
    /// runs over `[0, 1]` starting at `center + (radius, 0, 0)`.
    pub fn circle(center: Point3, radius: f64) -> GeomResult<Self> {
        let w = 1.0_f64 / 2.0_f64.sqrt(); // cos(45°)
        let (r, c) = (radius, center.coords);

        let control_points = [
            (r, 0.0),
            (r, r),
            (0.0, r),
            (-r, r),
            (-r, 0.0),
            (-r, -r),
            (0.0, -r),
            (r, -r),
            (r, 0.0),
        ]
        .iter()
        .map(|&(x, y)| c + Vec3::new(x, y, 0.0))
        .collect();
        let weights = vec![1.0, w, 1.0, w, 1.0, w, 1.0, w, 1.0];
        let knots = vec![
            0.0, 0.0, 0.0, 0.25, 0.25, 0.5, 0.5, 0.75, 0.75, 1.0, 1.0, 1.0,
        ];

        Self::new(control_points, weights, knots, 2)
    }
}

impl Curve3d for NurbsCurve3d {
    fn evaluate(&self, t: f64) -> GeomResult<Point3> {
        NurbsCurve::evaluate(self, t).map(Point3::from)
    }

    fn evaluate_derivative(&self, t: f64) -> GeomResult<Vec3> {
        NurbsCurve::evaluate_derivative(self, t)
    }

    fn evaluate_2nd_derivative(&self, t: f64) -> GeomResult<Vec3> {
        NurbsCurve::evaluate_2nd_derivative(self, t)
    }

    fn inverse_evaluate(&self, p: &Point3, t_min: f64, t_max: f64) -> GeomResult<f64> {
        NurbsCurve::inverse_evaluate(self, &p.coords, t_min, t_max)
    }

    fn domain(&self) -> (f64, f64) {
        self.parameter_domain()
    }

    fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    fn curve_type(&self) -> CurveKind {
        CurveKind::Nurbs
    }

    fn clone_box(&self) -> Box<dyn Curve3d> {
        Box::new(self.clone())
    }
}
