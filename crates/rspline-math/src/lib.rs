#![warn(missing_docs)]

//! Math types for the rspline geometry kernel.
//!
//! Thin wrappers around nalgebra providing the points, vectors, frames and
//! rotations used by curve and patch evaluation, plus the tolerance
//! constants shared by validation and the inverse solvers.

use nalgebra::{Matrix3, Unit, Vector2, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space, `(u, v)`.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// An orthonormal frame stored row-wise: rows 0 and 1 span the reference
/// plane, row 2 is the principal axis.
pub type Frame = Matrix3<f64>;

/// Frame orthonormality checks and the degenerate-radius cutoff.
pub const ORTHONORMAL_TOL: f64 = f64::EPSILON * 10.0;

/// Residual at which Newton refinement is considered converged.
pub const NEWTON_TOL: f64 = f64::EPSILON * 100.0;

/// Row `i` of a frame as a column vector.
pub fn frame_axis(frame: &Frame, i: usize) -> Vec3 {
    frame.row(i).transpose()
}

/// A rotation about an axis through the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 3x3 rotation matrix.
    pub matrix: Matrix3<f64>,
}

impl Transform {
    /// Rotation about `axis` by `angle` radians (Rodrigues' formula).
    ///
    /// The axis is expected to be unit length; a non-unit axis yields a
    /// non-rigid matrix.
    pub fn rotation(axis: &Vec3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);
        #[rustfmt::skip]
        let matrix = Matrix3::new(
            t * x * x + c,     t * x * y - s * z, t * x * z + s * y,
            t * x * y + s * z, t * y * y + c,     t * y * z - s * x,
            t * x * z - s * y, t * y * z + s * x, t * z * z + c,
        );
        Self { matrix }
    }

    /// Rotate a vector.
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        self.matrix * v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_rotation_quarter_turn() {
        let r = Transform::rotation(&Vec3::z(), PI / 2.0);
        assert_abs_diff_eq!(r.apply_vec(&Vec3::x()), Vec3::y(), epsilon = 1e-12);
        // Components along the axis are fixed
        assert_abs_diff_eq!(r.apply_vec(&Vec3::z()), Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_half_turn_about_diagonal() {
        // 180° about (1,1,0)/√2 swaps x and y
        let axis = Vec3::new(1.0, 1.0, 0.0).normalize();
        let r = Transform::rotation(&axis, PI);
        assert_abs_diff_eq!(r.apply_vec(&Vec3::x()), Vec3::y(), epsilon = 1e-12);
        assert_abs_diff_eq!(r.matrix * r.matrix.transpose(), Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_frame_axis() {
        let frame = Frame::new(1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, -1.0, 0.0);
        assert_eq!(frame_axis(&frame, 1), Vec3::z());
        assert_eq!(frame_axis(&frame, 2), -Vec3::y());
    }
}
