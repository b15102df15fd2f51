//! Parametric curves in 3D.
//!
//! [`Curve3d`] is the capability set a patch needs from its profile curve.
//! Analytic lines and circles live here; spline curves implement the trait
//! in `rspline-nurbs`.

use std::f64::consts::PI;

use rspline_math::{Dir3, Point3, Vec3};

use crate::GeomResult;

/// The kind of a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    /// Straight line.
    Line,
    /// Circle.
    Circle,
    /// Non-rational B-spline.
    BSpline,
    /// Rational B-spline.
    Nurbs,
}

/// A parametric curve in 3D space.
pub trait Curve3d: Send + Sync + std::fmt::Debug {
    /// Evaluate the curve at parameter `t` to get a 3D point.
    fn evaluate(&self, t: f64) -> GeomResult<Point3>;

    /// First derivative at parameter `t`.
    fn evaluate_derivative(&self, t: f64) -> GeomResult<Vec3>;

    /// Second derivative at parameter `t`.
    fn evaluate_2nd_derivative(&self, t: f64) -> GeomResult<Vec3>;

    /// Parameter in `[t_min, t_max]` whose point is closest to `p`.
    fn inverse_evaluate(&self, p: &Point3, t_min: f64, t_max: f64) -> GeomResult<f64>;

    /// Parameter domain `(t_min, t_max)`.
    fn domain(&self) -> (f64, f64);

    /// Whether the parameter wraps from the upper to the lower bound.
    fn is_periodic(&self) -> bool {
        false
    }

    /// Number of control points; 0 for analytic curves.
    fn num_control_points(&self) -> usize;

    /// The kind of this curve.
    fn curve_type(&self) -> CurveKind;

    /// Clone into a boxed trait object.
    fn clone_box(&self) -> Box<dyn Curve3d>;
}

impl Clone for Box<dyn Curve3d> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

fn check_interval(t_min: f64, t_max: f64) -> GeomResult<()> {
    if t_min > t_max {
        return Err(crate::GeomError::invalid(format!(
            "inverted parameter interval [{t_min}, {t_max}]"
        )));
    }
    Ok(())
}

// =============================================================================
// Line3d
// =============================================================================

/// A 3D line segment defined by origin and direction.
///
/// Parameterization: `P(t) = origin + t * direction`, `t ∈ [0, 1]`.
#[derive(Debug, Clone)]
pub struct Line3d {
    /// Starting point.
    pub origin: Point3,
    /// Direction (not necessarily unit length; magnitude determines speed).
    pub direction: Vec3,
}

impl Line3d {
    /// Create a line from two endpoints, parameterized so `t=0` gives `start` and `t=1` gives `end`.
    pub fn from_points(start: Point3, end: Point3) -> Self {
        Self {
            origin: start,
            direction: end - start,
        }
    }
}

impl Curve3d for Line3d {
    fn evaluate(&self, t: f64) -> GeomResult<Point3> {
        Ok(self.origin + t * self.direction)
    }

    fn evaluate_derivative(&self, _t: f64) -> GeomResult<Vec3> {
        Ok(self.direction)
    }

    fn evaluate_2nd_derivative(&self, _t: f64) -> GeomResult<Vec3> {
        Ok(Vec3::zeros())
    }

    fn inverse_evaluate(&self, p: &Point3, t_min: f64, t_max: f64) -> GeomResult<f64> {
        check_interval(t_min, t_max)?;
        let len2 = self.direction.norm_squared();
        if len2 < 1e-30 {
            return Ok(t_min);
        }
        let t = (p - self.origin).dot(&self.direction) / len2;
        Ok(t.clamp(t_min, t_max))
    }

    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn num_control_points(&self) -> usize {
        2
    }

    fn curve_type(&self) -> CurveKind {
        CurveKind::Line
    }

    fn clone_box(&self) -> Box<dyn Curve3d> {
        Box::new(self.clone())
    }
}

// =============================================================================
// Circle3d
// =============================================================================

/// A circle in 3D space defined by center, normal, and radius.
///
/// Parameterization: `P(t) = center + radius * (cos(t) * x_dir + sin(t) * y_dir)`
///
/// Where `t ∈ [0, 2π)`.
#[derive(Debug, Clone)]
pub struct Circle3d {
    /// Center of the circle.
    pub center: Point3,
    /// Radius.
    pub radius: f64,
    /// Reference direction for t=0.
    pub x_dir: Dir3,
    /// Second in-plane direction (perpendicular to x_dir and normal).
    pub y_dir: Dir3,
    /// Normal to the circle plane.
    pub normal: Dir3,
}

impl Circle3d {
    /// Create a circle in the XY plane centered at the given point.
    pub fn new(center: Point3, radius: f64) -> Self {
        Self {
            center,
            radius,
            x_dir: Dir3::new_normalize(Vec3::x()),
            y_dir: Dir3::new_normalize(Vec3::y()),
            normal: Dir3::new_normalize(Vec3::z()),
        }
    }

    /// Create a circle whose `t=0` point lies along `x_dir` from the center,
    /// in the plane spanned by `x_dir` and `y_dir`.
    pub fn with_axes(center: Point3, radius: f64, x_dir: Vec3, y_dir: Vec3) -> Self {
        let x = Dir3::new_normalize(x_dir);
        let y = Dir3::new_normalize(y_dir - y_dir.dot(x.as_ref()) * x.as_ref());
        let n = Dir3::new_normalize(x.as_ref().cross(y.as_ref()));
        Self {
            center,
            radius,
            x_dir: x,
            y_dir: y,
            normal: n,
        }
    }
}

impl Curve3d for Circle3d {
    fn evaluate(&self, t: f64) -> GeomResult<Point3> {
        let (sin_t, cos_t) = t.sin_cos();
        Ok(self.center
            + self.radius * (cos_t * self.x_dir.as_ref() + sin_t * self.y_dir.as_ref()))
    }

    fn evaluate_derivative(&self, t: f64) -> GeomResult<Vec3> {
        let (sin_t, cos_t) = t.sin_cos();
        Ok(self.radius * (-sin_t * self.x_dir.as_ref() + cos_t * self.y_dir.as_ref()))
    }

    fn evaluate_2nd_derivative(&self, t: f64) -> GeomResult<Vec3> {
        let (sin_t, cos_t) = t.sin_cos();
        Ok(-self.radius * (cos_t * self.x_dir.as_ref() + sin_t * self.y_dir.as_ref()))
    }

    fn inverse_evaluate(&self, p: &Point3, t_min: f64, t_max: f64) -> GeomResult<f64> {
        check_interval(t_min, t_max)?;
        let d = p - self.center;
        let (x, y) = (d.dot(self.x_dir.as_ref()), d.dot(self.y_dir.as_ref()));
        if x.abs() < 1e-30 && y.abs() < 1e-30 {
            // Every parameter is equidistant from the center
            return Ok(t_min);
        }
        // Shift the angle into the first turn at or after t_min
        let angle = y.atan2(x);
        let t = t_min + (angle - t_min).rem_euclid(2.0 * PI);
        if t <= t_max {
            return Ok(t);
        }
        let d_min = (self.evaluate(t_min)? - p).norm();
        let d_max = (self.evaluate(t_max)? - p).norm();
        Ok(if d_min <= d_max { t_min } else { t_max })
    }

    fn domain(&self) -> (f64, f64) {
        (0.0, 2.0 * PI)
    }

    fn is_periodic(&self) -> bool {
        true
    }

    fn num_control_points(&self) -> usize {
        0
    }

    fn curve_type(&self) -> CurveKind {
        CurveKind::Circle
    }

    fn clone_box(&self) -> Box<dyn Curve3d> {
        Box::new(self.clone())
    }
}
