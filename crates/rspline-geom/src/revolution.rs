//! Surface of revolution: a profile curve rotated about an axis.

use std::any::Any;
use std::f64::consts::PI;
use std::sync::Arc;

use rspline_math::{frame_axis, Frame, Point2, Point3, Transform, Vec3, ORTHONORMAL_TOL};

use crate::inverse::{inverse_evaluate_patch, InverseSettings, ParamInterval};
use crate::patch::{impl_no_control_net, require_profile};
use crate::{Curve3d, GeomError, GeomResult, Patch, PatchKind};

/// A surface of revolution.
///
/// Parameterization:
/// ```text
/// S(u, v) = location + R(axis, v) · (C(u) − location)
/// ```
///
/// Where `C` is the profile curve, `axis` is row 2 of the frame and
/// `R(axis, v)` is the rotation by `v` radians about it. `u` follows the
/// profile's parameter, `v` is an angle (ranges beyond 2π sweep repeatedly).
///
/// The profile is shared, not owned: cloning the patch shares the same
/// profile. Queries on a patch without a profile fail with
/// [`GeomError::InvalidConfiguration`].
#[derive(Debug, Clone)]
pub struct RevolutionPatch {
    location: Point3,
    frame: Frame,
    profile: Option<Arc<dyn Curve3d>>,
    u_lower: f64,
    u_upper: f64,
    v_lower: f64,
    v_upper: f64,
    periodic_u: bool,
    periodic_v: bool,
    settings: InverseSettings,
}

impl RevolutionPatch {
    /// Create a patch with the identity frame (axis along Z), location at the
    /// origin, no profile, `u ∈ [0, 1]` and `v ∈ [0, 2π]`.
    pub fn new() -> Self {
        Self {
            location: Point3::origin(),
            frame: Frame::identity(),
            profile: None,
            u_lower: 0.0,
            u_upper: 1.0,
            v_lower: 0.0,
            v_upper: 2.0 * PI,
            periodic_u: false,
            periodic_v: false,
            settings: InverseSettings::default(),
        }
    }

    /// Point on the rotation axis.
    pub fn location(&self) -> &Point3 {
        &self.location
    }

    /// Set the point on the rotation axis.
    pub fn set_location(&mut self, location: Point3) {
        self.location = location;
    }

    /// Frame whose row 2 is the rotation axis.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Set the frame. Orthonormality is checked by [`Patch::initialize`].
    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    /// The profile curve, if set.
    pub fn profile(&self) -> Option<&Arc<dyn Curve3d>> {
        self.profile.as_ref()
    }

    /// Set the profile and mirror its parameter domain into the u bounds.
    pub fn set_profile(&mut self, profile: Arc<dyn Curve3d>) {
        let (t_min, t_max) = profile.domain();
        self.u_lower = t_min;
        self.u_upper = t_max;
        self.profile = Some(profile);
    }

    /// Detach the profile.
    pub fn clear_profile(&mut self) {
        self.profile = None;
    }

    /// Set the lower u bound.
    pub fn set_u_lower_bound(&mut self, t: f64) {
        self.u_lower = t;
    }

    /// Set the upper u bound.
    pub fn set_u_upper_bound(&mut self, t: f64) {
        self.u_upper = t;
    }

    /// Set the lower v (angle) bound.
    pub fn set_v_lower_bound(&mut self, t: f64) {
        self.v_lower = t;
    }

    /// Set the upper v (angle) bound.
    pub fn set_v_upper_bound(&mut self, t: f64) {
        self.v_upper = t;
    }

    /// Settings used by [`Patch::inverse_evaluate`].
    pub fn inverse_settings(&self) -> &InverseSettings {
        &self.settings
    }

    /// Replace the inverse evaluation settings.
    pub fn set_inverse_settings(&mut self, settings: InverseSettings) {
        self.settings = settings;
    }

    fn axis(&self) -> Vec3 {
        frame_axis(&self.frame, 2)
    }

    fn rotation(&self, v: f64) -> Transform {
        Transform::rotation(&self.axis(), v)
    }

    /// Rescale `d` (perpendicular to the axis) to the length of its
    /// off-axis component, leaving near-zero vectors untouched.
    fn rescale_tangent(&self, d: Vec3, radial: &Vec3) -> Vec3 {
        if d.norm() > ORTHONORMAL_TOL {
            let axis = self.axis();
            let r = (radial - radial.dot(&axis) * axis).norm();
            d.normalize() * r
        } else {
            d
        }
    }
}

impl Default for RevolutionPatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Patch for RevolutionPatch {
    fn evaluate(&self, u: f64, v: f64) -> GeomResult<Point3> {
        let p = require_profile(&self.profile)?.evaluate(u)?;
        Ok(self.location + self.rotation(v).apply_vec(&(p - self.location)))
    }

    fn evaluate_derivative_u(&self, u: f64, v: f64) -> GeomResult<Vec3> {
        let d = require_profile(&self.profile)?.evaluate_derivative(u)?;
        Ok(self.rotation(v).apply_vec(&d))
    }

    fn evaluate_derivative_v(&self, u: f64, v: f64) -> GeomResult<Vec3> {
        let w = self.evaluate(u, v)? - self.location;
        let d = self.axis().cross(&w);
        Ok(self.rescale_tangent(d, &w))
    }

    fn evaluate_2nd_derivative_uu(&self, u: f64, v: f64) -> GeomResult<Vec3> {
        let d = require_profile(&self.profile)?.evaluate_2nd_derivative(u)?;
        Ok(self.rotation(v).apply_vec(&d))
    }

    fn evaluate_2nd_derivative_vv(&self, u: f64, v: f64) -> GeomResult<Vec3> {
        let d = self.evaluate(u, v)? - self.location;
        let axis = self.axis();
        Ok(-d + d.dot(&axis) * axis)
    }

    fn evaluate_2nd_derivative_uv(&self, u: f64, v: f64) -> GeomResult<Vec3> {
        let du = self.evaluate_derivative_u(u, v)?;
        let duv = self.axis().cross(&du);
        Ok(self.rescale_tangent(duv, &duv))
    }

    fn inverse_evaluate(
        &self,
        p: &Point3,
        min_u: f64,
        max_u: f64,
        min_v: f64,
        max_v: f64,
    ) -> GeomResult<Point2> {
        let profile = require_profile(&self.profile)?;
        // u wraps with the profile's own period, not the patch window
        let (t_min, t_max) = profile.domain();
        let u = ParamInterval::new(min_u, max_u)?.with_period(self.periodic_u, t_max - t_min);
        let v = ParamInterval::new(min_v, max_v)?.with_period(self.periodic_v, 2.0 * PI);
        inverse_evaluate_patch(self, p, profile.num_control_points(), &self.settings, u, v)
    }

    fn initialize(&mut self) -> GeomResult<()> {
        const TOL: f64 = ORTHONORMAL_TOL;
        let profile = require_profile(&self.profile)?;

        let rows = [0, 1, 2].map(|i| frame_axis(&self.frame, i));
        for (i, row) in rows.iter().enumerate() {
            if (row.norm_squared() - 1.0).abs() >= TOL {
                return Err(GeomError::invalid(format!(
                    "frame row {i} is not unit length"
                )));
            }
        }
        for (i, j) in [(0, 1), (1, 2), (2, 0)] {
            if rows[i].dot(&rows[j]).abs() >= TOL {
                return Err(GeomError::invalid(format!(
                    "frame rows {i} and {j} are not orthogonal"
                )));
            }
        }
        if self.u_upper <= self.u_lower {
            return Err(GeomError::invalid(format!(
                "u bounds [{}, {}] are not increasing",
                self.u_lower, self.u_upper
            )));
        }
        if self.v_upper <= self.v_lower {
            return Err(GeomError::invalid(format!(
                "v bounds [{}, {}] are not increasing",
                self.v_lower, self.v_upper
            )));
        }

        self.periodic_u = profile.is_periodic();
        self.periodic_v = self.v_upper - self.v_lower > 2.0 * PI - TOL;
        Ok(())
    }

    fn u_lower_bound(&self) -> f64 {
        self.u_lower
    }

    fn u_upper_bound(&self) -> f64 {
        self.u_upper
    }

    fn v_lower_bound(&self) -> f64 {
        self.v_lower
    }

    fn v_upper_bound(&self) -> f64 {
        self.v_upper
    }

    fn is_periodic_u(&self) -> bool {
        self.periodic_u
    }

    fn is_periodic_v(&self) -> bool {
        self.periodic_v
    }

    fn degree_u(&self) -> usize {
        2
    }

    fn degree_v(&self) -> usize {
        2
    }

    fn patch_type(&self) -> PatchKind {
        PatchKind::Revolution
    }

    fn clone_box(&self) -> Box<dyn Patch> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    impl_no_control_net!("RevolutionPatch");
}
