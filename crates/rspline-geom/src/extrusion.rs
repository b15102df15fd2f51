//! Linear extrusion of a profile curve.

use std::any::Any;
use std::sync::Arc;

use rspline_math::{Point2, Point3, Vec3, ORTHONORMAL_TOL};

use crate::inverse::{inverse_evaluate_patch, InverseSettings, ParamInterval};
use crate::patch::{impl_no_control_net, require_profile};
use crate::{Curve3d, GeomError, GeomResult, Patch, PatchKind};

/// A profile curve swept along a fixed direction.
///
/// Parameterization: `S(u, v) = C(u) + v · direction`. The direction is not
/// normalized, so `v` measures multiples of it.
#[derive(Debug, Clone)]
pub struct ExtrusionPatch {
    profile: Option<Arc<dyn Curve3d>>,
    direction: Vec3,
    u_lower: f64,
    u_upper: f64,
    v_lower: f64,
    v_upper: f64,
    periodic_u: bool,
    settings: InverseSettings,
}

impl ExtrusionPatch {
    /// Create an extrusion along +Z with no profile, `u ∈ [0, 1]`, `v ∈ [0, 1]`.
    pub fn new() -> Self {
        Self {
            profile: None,
            direction: Vec3::z(),
            u_lower: 0.0,
            u_upper: 1.0,
            v_lower: 0.0,
            v_upper: 1.0,
            periodic_u: false,
            settings: InverseSettings::default(),
        }
    }

    /// Extrusion of `profile` along `direction` over its full domain and `v ∈ [0, 1]`.
    pub fn from_profile(profile: Arc<dyn Curve3d>, direction: Vec3) -> Self {
        let mut patch = Self::new();
        patch.set_profile(profile);
        patch.direction = direction;
        patch
    }

    /// Sweep direction.
    pub fn direction(&self) -> &Vec3 {
        &self.direction
    }

    /// Set the sweep direction.
    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction;
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

    /// Set the u bounds.
    pub fn set_u_bounds(&mut self, lower: f64, upper: f64) {
        self.u_lower = lower;
        self.u_upper = upper;
    }

    /// Set the v bounds.
    pub fn set_v_bounds(&mut self, lower: f64, upper: f64) {
        self.v_lower = lower;
        self.v_upper = upper;
    }

    /// Settings used by [`Patch::inverse_evaluate`].
    pub fn inverse_settings(&self) -> &InverseSettings {
        &self.settings
    }

    /// Replace the inverse evaluation settings.
    pub fn set_inverse_settings(&mut self, settings: InverseSettings) {
        self.settings = settings;
    }
}

impl Default for ExtrusionPatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Patch for ExtrusionPatch {
    fn evaluate(&self, u: f64, v: f64) -> GeomResult<Point3> {
        let p = require_profile(&self.profile)?.evaluate(u)?;
        Ok(p + v * self.direction)
    }

    fn evaluate_derivative_u(&self, u: f64, _v: f64) -> GeomResult<Vec3> {
        require_profile(&self.profile)?.evaluate_derivative(u)
    }

    fn evaluate_derivative_v(&self, _u: f64, _v: f64) -> GeomResult<Vec3> {
        require_profile(&self.profile)?;
        Ok(self.direction)
    }

    fn evaluate_2nd_derivative_uu(&self, u: f64, _v: f64) -> GeomResult<Vec3> {
        require_profile(&self.profile)?.evaluate_2nd_derivative(u)
    }

    fn evaluate_2nd_derivative_vv(&self, _u: f64, _v: f64) -> GeomResult<Vec3> {
        require_profile(&self.profile)?;
        Ok(Vec3::zeros())
    }

    fn evaluate_2nd_derivative_uv(&self, _u: f64, _v: f64) -> GeomResult<Vec3> {
        require_profile(&self.profile)?;
        Ok(Vec3::zeros())
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
        let v = ParamInterval::new(min_v, max_v)?;
        inverse_evaluate_patch(self, p, profile.num_control_points(), &self.settings, u, v)
    }

    fn initialize(&mut self) -> GeomResult<()> {
        let profile = require_profile(&self.profile)?;
        if self.direction.norm() <= ORTHONORMAL_TOL {
            return Err(GeomError::invalid("extrusion direction has zero length"));
        }
        if self.u_upper <= self.u_lower || self.v_upper <= self.v_lower {
            return Err(GeomError::invalid(format!(
                "bounds [{}, {}] x [{}, {}] are not increasing",
                self.u_lower, self.u_upper, self.v_lower, self.v_upper
            )));
        }
        self.periodic_u = profile.is_periodic();
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
        false
    }

    fn degree_u(&self) -> usize {
        2
    }

    fn degree_v(&self) -> usize {
        1
    }

    fn patch_type(&self) -> PatchKind {
        PatchKind::Extrusion
    }

    fn clone_box(&self) -> Box<dyn Patch> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    impl_no_control_net!("ExtrusionPatch");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Circle3d, Line3d};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn cylinder() -> ExtrusionPatch {
        let mut patch = ExtrusionPatch::from_profile(
            Arc::new(Circle3d::new(Point3::new(1.0, 2.0, 0.0), 2.0)),
            Vec3::new(0.0, 0.0, 3.0),
        );
        patch.initialize().unwrap();
        patch
    }

    #[test]
    fn test_extrusion_evaluate() {
        let patch = cylinder();
        let p = patch.evaluate(0.0, 0.5).unwrap();
        assert_abs_diff_eq!(p, Point3::new(3.0, 2.0, 1.5), epsilon = 1e-12);
        assert!(patch.is_periodic_u());
        assert!(!patch.is_periodic_v());
        assert_abs_diff_eq!(patch.u_upper_bound(), 2.0 * PI);
    }

    #[test]
    fn test_extrusion_derivatives() {
        let patch = cylinder();
        let (u, v) = (0.7, 0.3);
        let eps = 1e-6;
        let fd_u =
            (patch.evaluate(u + eps, v).unwrap() - patch.evaluate(u - eps, v).unwrap()) / (2.0 * eps);
        assert_abs_diff_eq!(patch.evaluate_derivative_u(u, v).unwrap(), fd_u, epsilon = 1e-7);
        assert_eq!(patch.evaluate_derivative_v(u, v).unwrap(), Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(patch.evaluate_2nd_derivative_vv(u, v).unwrap(), Vec3::zeros());
        assert_eq!(patch.evaluate_2nd_derivative_uv(u, v).unwrap(), Vec3::zeros());
        // Circle: second derivative points at the center
        let uu = patch.evaluate_2nd_derivative_uu(u, v).unwrap();
        let p = patch.evaluate(u, 0.0).unwrap();
        assert_abs_diff_eq!(p + uu, Point3::new(1.0, 2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_extrusion_inverse_round_trip() {
        let patch = cylinder();
        for &(u, v) in &[(0.2, 0.1), (3.0, 0.5), (6.0, 0.9)] {
            let p = patch.evaluate(u, v).unwrap();
            let uv = patch.inverse_evaluate(&p, 0.0, 2.0 * PI, 0.0, 1.0).unwrap();
            assert_abs_diff_eq!(patch.evaluate(uv.x, uv.y).unwrap(), p, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_extrusion_inverse_clamps_v() {
        // Plane strip x ∈ [0,1], y ∈ [0,1]; target above the strip's far edge
        let mut patch = ExtrusionPatch::from_profile(
            Arc::new(Line3d::from_points(Point3::origin(), Point3::new(1.0, 0.0, 0.0))),
            Vec3::y(),
        );
        patch.initialize().unwrap();
        let uv = patch
            .inverse_evaluate(&Point3::new(0.25, 5.0, 0.0), 0.0, 1.0, 0.0, 1.0)
            .unwrap();
        assert_abs_diff_eq!(uv.x, 0.25, epsilon = 1e-9);
        assert_abs_diff_eq!(uv.y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_extrusion_inverse_on_half_circle() {
        // Half cylinder y >= 0: the target below it is nearest to the u = π edge
        let mut patch = ExtrusionPatch::from_profile(
            Arc::new(Circle3d::new(Point3::origin(), 1.0)),
            Vec3::z(),
        );
        patch.set_u_bounds(0.0, PI);
        patch.initialize().unwrap();
        assert!(patch.is_periodic_u());

        let uv = patch
            .inverse_evaluate(&Point3::new(-1.0, -0.2, 0.5), 0.0, PI, 0.0, 1.0)
            .unwrap();
        assert_abs_diff_eq!(uv.x, PI, epsilon = 1e-9);
        assert_abs_diff_eq!(uv.y, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_extrusion_invalid_configuration() {
        let mut patch = ExtrusionPatch::new();
        assert!(matches!(
            patch.evaluate(0.0, 0.0),
            Err(GeomError::InvalidConfiguration(_))
        ));
        assert!(patch.initialize().is_err());

        let mut flat = cylinder();
        flat.set_direction(Vec3::zeros());
        assert!(flat.initialize().is_err());

        let mut inverted = cylinder();
        inverted.set_v_bounds(1.0, 0.0);
        assert!(inverted.initialize().is_err());
    }

    #[test]
    fn test_extrusion_dispatch() {
        let boxed: Box<dyn Patch> = Box::new(cylinder());
        assert_eq!(boxed.patch_type(), PatchKind::Extrusion);
        assert_eq!(boxed.degree_v(), 1);
        assert!(boxed.knot_v(0).unwrap_err().is_not_implemented());
        assert!(boxed.as_any().downcast_ref::<ExtrusionPatch>().is_some());
    }
}
