//! The parametric patch interface.

use std::any::Any;
use std::sync::Arc;

use rspline_math::{Dir3, Point2, Point3, Vec3};

use crate::{Curve3d, GeomError, GeomResult};

/// The kind of a patch (for match-based dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    /// Profile curve rotated about an axis.
    Revolution,
    /// Profile curve swept along a straight direction.
    Extrusion,
}

/// A parametric surface patch over a rectangular `(u, v)` domain.
///
/// Forward queries are pure functions of the patch state. Control-point
/// based accessors (weights, knots, control points) are part of the
/// interface so generic code can query any patch; variants that are not
/// control-point based answer with [`GeomError::NotImplemented`].
pub trait Patch: Send + Sync + std::fmt::Debug {
    /// Evaluate the patch at `(u, v)`.
    fn evaluate(&self, u: f64, v: f64) -> GeomResult<Point3>;

    /// Partial derivative with respect to u.
    fn evaluate_derivative_u(&self, u: f64, v: f64) -> GeomResult<Vec3>;

    /// Partial derivative with respect to v.
    fn evaluate_derivative_v(&self, u: f64, v: f64) -> GeomResult<Vec3>;

    /// Second partial derivative with respect to u.
    fn evaluate_2nd_derivative_uu(&self, u: f64, v: f64) -> GeomResult<Vec3>;

    /// Second partial derivative with respect to v.
    fn evaluate_2nd_derivative_vv(&self, u: f64, v: f64) -> GeomResult<Vec3>;

    /// Mixed second partial derivative.
    fn evaluate_2nd_derivative_uv(&self, u: f64, v: f64) -> GeomResult<Vec3>;

    /// Parameters within `[min_u, max_u] × [min_v, max_v]` whose point is
    /// nearest `p`.
    fn inverse_evaluate(
        &self,
        p: &Point3,
        min_u: f64,
        max_u: f64,
        min_v: f64,
        max_v: f64,
    ) -> GeomResult<Point2>;

    /// Validate the configuration and derive periodicity.
    fn initialize(&mut self) -> GeomResult<()>;

    /// Lower bound of the u domain.
    fn u_lower_bound(&self) -> f64;
    /// Upper bound of the u domain.
    fn u_upper_bound(&self) -> f64;
    /// Lower bound of the v domain.
    fn v_lower_bound(&self) -> f64;
    /// Upper bound of the v domain.
    fn v_upper_bound(&self) -> f64;

    /// Whether u wraps from the upper to the lower bound.
    fn is_periodic_u(&self) -> bool;
    /// Whether v wraps from the upper to the lower bound.
    fn is_periodic_v(&self) -> bool;

    /// Nominal polynomial degree in u.
    fn degree_u(&self) -> usize;
    /// Nominal polynomial degree in v.
    fn degree_v(&self) -> usize;

    /// The kind of this patch.
    fn patch_type(&self) -> PatchKind;

    /// Clone this patch into a boxed trait object.
    fn clone_box(&self) -> Box<dyn Patch>;

    /// Downcast to a concrete type via `Any`.
    fn as_any(&self) -> &dyn Any;

    /// Unit normal `S_u × S_v` at `(u, v)`.
    ///
    /// Falls back to `+Z` where the cross product vanishes (poles, axis points).
    fn normal(&self, u: f64, v: f64) -> GeomResult<Dir3> {
        let n = self
            .evaluate_derivative_u(u, v)?
            .cross(&self.evaluate_derivative_v(u, v)?);
        if n.norm() < 1e-15 {
            Ok(Dir3::new_normalize(Vec3::z()))
        } else {
            Ok(Dir3::new_normalize(n))
        }
    }

    /// Number of control points in u.
    fn num_control_points_u(&self) -> usize;
    /// Number of control points in v.
    fn num_control_points_v(&self) -> usize;
    /// Parameter values associated with control point `(i, j)`.
    fn control_point_preimage(&self, i: usize, j: usize) -> GeomResult<Point2>;

    /// Number of weights in u.
    fn num_weights_u(&self) -> usize;
    /// Number of weights in v.
    fn num_weights_v(&self) -> usize;
    /// Weight of control point `(i, j)`.
    fn weight(&self, i: usize, j: usize) -> GeomResult<f64>;
    /// Set the weight of control point `(i, j)`.
    fn set_weight(&mut self, i: usize, j: usize, value: f64) -> GeomResult<()>;

    /// Number of knots in u.
    fn num_knots_u(&self) -> usize;
    /// Knot `i` in u.
    fn knot_u(&self, i: usize) -> GeomResult<f64>;
    /// Set knot `i` in u.
    fn set_knot_u(&mut self, i: usize, value: f64) -> GeomResult<()>;
    /// Number of knots in v.
    fn num_knots_v(&self) -> usize;
    /// Knot `i` in v.
    fn knot_v(&self, i: usize) -> GeomResult<f64>;
    /// Set knot `i` in v.
    fn set_knot_v(&mut self, i: usize, value: f64) -> GeomResult<()>;
}

impl Clone for Box<dyn Patch> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Implements the control-net accessors of [`Patch`] for a patch type that
/// has no control points, weights or knots: counts are zero and every
/// element access fails with `NotImplemented`.
macro_rules! impl_no_control_net {
    ($name:literal) => {
        fn num_control_points_u(&self) -> usize {
            0
        }

        fn num_control_points_v(&self) -> usize {
            0
        }

        fn control_point_preimage(&self, _i: usize, _j: usize) -> GeomResult<Point2> {
            Err(GeomError::not_implemented(concat!(
                $name,
                " does not have control points"
            )))
        }

        fn num_weights_u(&self) -> usize {
            0
        }

        fn num_weights_v(&self) -> usize {
            0
        }

        fn weight(&self, _i: usize, _j: usize) -> GeomResult<f64> {
            Err(GeomError::not_implemented(concat!(
                $name,
                " does not support weights"
            )))
        }

        fn set_weight(&mut self, _i: usize, _j: usize, _value: f64) -> GeomResult<()> {
            Err(GeomError::not_implemented(concat!(
                $name,
                " does not support weights"
            )))
        }

        fn num_knots_u(&self) -> usize {
            0
        }

        fn knot_u(&self, _i: usize) -> GeomResult<f64> {
            Err(GeomError::not_implemented(concat!(
                $name,
                " does not support knots"
            )))
        }

        fn set_knot_u(&mut self, _i: usize, _value: f64) -> GeomResult<()> {
            Err(GeomError::not_implemented(concat!(
                $name,
                " does not support knots"
            )))
        }

        fn num_knots_v(&self) -> usize {
            0
        }

        fn knot_v(&self, _i: usize) -> GeomResult<f64> {
            Err(GeomError::not_implemented(concat!(
                $name,
                " does not support knots"
            )))
        }

        fn set_knot_v(&mut self, _i: usize, _value: f64) -> GeomResult<()> {
            Err(GeomError::not_implemented(concat!(
                $name,
                " does not support knots"
            )))
        }
    };
}

pub(crate) use impl_no_control_net;

/// Borrow the profile of a profile-driven patch, failing if none is set.
pub(crate) fn require_profile(profile: &Option<Arc<dyn Curve3d>>) -> GeomResult<&dyn Curve3d> {
    profile
        .as_deref()
        .ok_or_else(|| GeomError::invalid("profile not set"))
}
