#![warn(missing_docs)]

//! Rational spline curves and parametric patches for rspline.
//!
//! Re-exports the layers of the kernel: math types ([`rspline_math`]), the
//! curve and patch interfaces with inverse evaluation ([`rspline_geom`]),
//! and B-spline / NURBS curves ([`rspline_nurbs`]).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rspline::prelude::*;
//!
//! // Cylinder of radius 2: a vertical segment revolved about Z
//! let mut patch = RevolutionPatch::new();
//! patch.set_profile(Arc::new(Line3d::from_points(
//!     Point3::new(2.0, 0.0, 0.0),
//!     Point3::new(2.0, 0.0, 3.0),
//! )));
//! patch.initialize()?;
//!
//! let p = patch.evaluate(0.5, 1.0)?;
//! let uv = patch.inverse_evaluate(&p, 0.0, 1.0, 0.0, std::f64::consts::TAU)?;
//! assert!((patch.evaluate(uv.x, uv.y)? - p).norm() < 1e-9);
//! # Ok::<(), GeomError>(())
//! ```

pub use rspline_geom;
pub use rspline_math;
pub use rspline_nurbs;

/// The commonly used types and traits.
pub mod prelude {
    pub use rspline_geom::{
        Circle3d, Curve3d, CurveKind, ExtrusionPatch, GeomError, GeomResult, InverseSettings,
        Line3d, Patch, PatchKind, RevolutionPatch,
    };
    pub use rspline_math::{Dir3, Frame, Point2, Point3, Transform, Vec3};
    pub use rspline_nurbs::{BSplineCurve, BSplineCurve3d, NurbsCurve, NurbsCurve2d, NurbsCurve3d};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_1_SQRT_2, PI};
    use std::sync::Arc;

    /// Unit half circle in the XZ plane from the south pole to the north pole.
    fn meridian() -> NurbsCurve3d {
        NurbsCurve::new(
            vec![
                Vec3::new(0.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(0.0, 0.0, 1.0),
            ],
            vec![1.0, FRAC_1_SQRT_2, 1.0, FRAC_1_SQRT_2, 1.0],
            vec![0.0, 0.0, 0.0, 0.5, 0.5, 1.0, 1.0, 1.0],
            2,
        )
        .unwrap()
    }

    fn unit_sphere() -> RevolutionPatch {
        let mut patch = RevolutionPatch::new();
        patch.set_profile(Arc::new(meridian()));
        patch.initialize().unwrap();
        patch
    }

    #[test]
    fn test_nurbs_sphere_evaluate() {
        let sphere = unit_sphere();
        assert_eq!(sphere.u_lower_bound(), 0.0);
        assert_eq!(sphere.u_upper_bound(), 1.0);
        assert!(sphere.is_periodic_v());
        assert!(!sphere.is_periodic_u());

        for i in 0..=10 {
            for j in 0..=8 {
                let u = i as f64 / 10.0;
                let v = 2.0 * PI * j as f64 / 8.0;
                let p = sphere.evaluate(u, v).unwrap();
                assert_abs_diff_eq!(p.coords.norm(), 1.0, epsilon = 1e-12);
            }
        }
        assert_abs_diff_eq!(
            sphere.evaluate(0.5, PI / 2.0).unwrap(),
            Point3::new(0.0, 1.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_nurbs_sphere_normal_is_radial() {
        let sphere = unit_sphere();
        for &(u, v) in &[(0.3, 0.4), (0.5, 2.0), (0.8, 5.0)] {
            let p = sphere.evaluate(u, v).unwrap();
            let n = sphere.normal(u, v).unwrap();
            // Meridian runs upward and v turns counter-clockwise: S_u × S_v points inward
            assert_abs_diff_eq!(n.into_inner(), -p.coords, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_nurbs_sphere_uses_first_order_fallback() {
        let sphere = unit_sphere();
        assert!(sphere
            .evaluate_2nd_derivative_uu(0.5, 0.0)
            .unwrap_err()
            .is_not_implemented());
        // vv only needs the profile point
        let p = sphere.evaluate(0.5, 0.0).unwrap();
        assert_abs_diff_eq!(
            sphere.evaluate_2nd_derivative_vv(0.5, 0.0).unwrap(),
            -p.coords,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_nurbs_sphere_inverse_round_trip() {
        let sphere = unit_sphere();
        for i in 1..=8 {
            for j in 0..8 {
                let u = 0.1 * i as f64;
                let v = 0.3 + 0.75 * j as f64;
                let p = sphere.evaluate(u, v).unwrap();
                let uv = sphere.inverse_evaluate(&p, 0.0, 1.0, 0.0, 2.0 * PI).unwrap();
                assert!((0.0..=1.0).contains(&uv.x));
                assert!((0.0..=2.0 * PI).contains(&uv.y));
                let q = sphere.evaluate(uv.x, uv.y).unwrap();
                assert_abs_diff_eq!(q, p, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_nurbs_sphere_inverse_of_pole() {
        let sphere = unit_sphere();
        let north = Point3::new(0.0, 0.0, 1.0);
        let uv = sphere.inverse_evaluate(&north, 0.0, 1.0, 0.0, 2.0 * PI).unwrap();
        assert_abs_diff_eq!(uv.x, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(sphere.evaluate(uv.x, uv.y).unwrap(), north, epsilon = 1e-9);
    }

    #[test]
    fn test_inverse_of_off_surface_point() {
        // Point outside the sphere projects radially
        let sphere = unit_sphere();
        let target = Point3::new(0.0, 2.0, 0.0);
        let uv = sphere.inverse_evaluate(&target, 0.0, 1.0, 0.0, 2.0 * PI).unwrap();
        let q = sphere.evaluate(uv.x, uv.y).unwrap();
        assert_abs_diff_eq!(q, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_knot_insertion_leaves_surface_unchanged() {
        let sphere = unit_sphere();
        let mut refined_profile = meridian();
        refined_profile.insert_knot(0.3, 1).unwrap();
        refined_profile.insert_knot(0.75, 1).unwrap();
        assert_eq!(refined_profile.num_control_points(), 7);

        let mut refined = sphere.clone();
        refined.set_profile(Arc::new(refined_profile));
        refined.initialize().unwrap();

        for i in 0..=10 {
            let u = i as f64 / 10.0;
            for &v in &[0.0, 1.0, 4.0] {
                assert_abs_diff_eq!(
                    refined.evaluate(u, v).unwrap(),
                    sphere.evaluate(u, v).unwrap(),
                    epsilon = 1e-12
                );
            }
        }
    }

    #[test]
    fn test_bspline_dome_inverse() {
        // Cubic profile that meets the axis through (1, 1, 0) at its top
        let profile = BSplineCurve3d::clamped_uniform(
            vec![
                Vec3::new(3.0, 1.0, 0.0),
                Vec3::new(3.0, 1.0, 1.0),
                Vec3::new(2.0, 1.0, 2.0),
                Vec3::new(1.0, 1.0, 2.0),
            ],
            3,
        )
        .unwrap();
        let mut dome = RevolutionPatch::new();
        dome.set_location(Point3::new(1.0, 1.0, 0.0));
        dome.set_profile(Arc::new(profile));
        dome.initialize().unwrap();

        let apex = dome.evaluate(1.0, 0.0).unwrap();
        assert_abs_diff_eq!(apex, Point3::new(1.0, 1.0, 2.0), epsilon = 1e-12);
        let uv = dome.inverse_evaluate(&apex, 0.0, 1.0, 0.0, 2.0 * PI).unwrap();
        assert_abs_diff_eq!(dome.evaluate(uv.x, uv.y).unwrap(), apex, epsilon = 1e-9);

        for &(u, v) in &[(0.2, 0.5), (0.6, 3.0), (0.9, 6.0)] {
            let p = dome.evaluate(u, v).unwrap();
            let uv = dome.inverse_evaluate(&p, 0.0, 1.0, 0.0, 2.0 * PI).unwrap();
            assert_abs_diff_eq!(dome.evaluate(uv.x, uv.y).unwrap(), p, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_half_turn_window() {
        // v restricted to [0, π]: the far side projects onto the window edge
        let mut sphere = unit_sphere();
        sphere.set_v_upper_bound(PI);
        sphere.initialize().unwrap();
        assert!(!sphere.is_periodic_v());

        let target = Point3::new(0.5, -2.0, 0.0);
        let uv = sphere.inverse_evaluate(&target, 0.0, 1.0, 0.0, PI).unwrap();
        assert!((0.0..=PI).contains(&uv.y));
    }

    #[test]
    fn test_extruded_nurbs_profile() {
        let mut wall = ExtrusionPatch::from_profile(
            Arc::new(NurbsCurve3d::circle(Point3::origin(), 3.0).unwrap()),
            Vec3::new(0.0, 0.0, 2.0),
        );
        wall.initialize().unwrap();
        let p = wall.evaluate(0.125, 0.5).unwrap();
        assert_abs_diff_eq!(p.xy().coords.norm(), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.z, 1.0, epsilon = 1e-12);

        let uv = wall.inverse_evaluate(&p, 0.0, 1.0, 0.0, 1.0).unwrap();
        assert_abs_diff_eq!(wall.evaluate(uv.x, uv.y).unwrap(), p, epsilon = 1e-8);
    }

    #[test]
    fn test_inverse_settings_from_config() {
        let settings: InverseSettings =
            serde_json::from_str(r#"{"min_samples": 16, "max_iterations": 40}"#).unwrap();
        assert_eq!(settings.refinement_passes, 10);

        let mut sphere = unit_sphere();
        sphere.set_inverse_settings(settings);
        assert_eq!(sphere.inverse_settings().min_samples, 16);

        let p = sphere.evaluate(0.35, 2.5).unwrap();
        let uv = sphere.inverse_evaluate(&p, 0.0, 1.0, 0.0, 2.0 * PI).unwrap();
        assert_abs_diff_eq!(sphere.evaluate(uv.x, uv.y).unwrap(), p, epsilon = 1e-8);
    }

    #[test]
    fn test_generic_patch_processing() {
        let patches: Vec<Box<dyn Patch>> = vec![
            Box::new(unit_sphere()),
            Box::new(ExtrusionPatch::from_profile(
                Arc::new(Line3d::from_points(Point3::origin(), Point3::new(1.0, 0.0, 0.0))),
                Vec3::y(),
            )),
        ];
        let kinds: Vec<PatchKind> = patches.iter().map(|p| p.patch_type()).collect();
        assert_eq!(kinds, vec![PatchKind::Revolution, PatchKind::Extrusion]);
        for patch in &patches {
            // Not control-point based: generic code branches on NotImplemented
            assert_eq!(patch.num_weights_u(), 0);
            assert!(patch.weight(0, 0).unwrap_err().is_not_implemented());
        }
    }
}
