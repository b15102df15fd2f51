#![warn(missing_docs)]

//! B-spline and NURBS curves for the rspline kernel.
//!
//! The rational curve is never evaluated directly. Each weighted control
//! point `(x, w)` is lifted to the homogeneous point `(w·x, w)` one
//! dimension higher, a plain B-spline is evaluated there, and the result is
//! projected back by dividing out the last coordinate.
//!
//! # Key types
//!
//! - [`BSplineCurve`]: non-rational B-spline curve in `D` dimensions
//! - [`NurbsCurve`]: rational B-spline curve in `D` dimensions, backed by a
//!   `BSplineCurve<D + 1>`
//!
//! Both implement [`rspline_geom::Curve3d`] in three dimensions so they can
//! serve as patch profiles.
//!
//! # Algorithms
//!
//! - **De Boor's algorithm** for stable B-spline evaluation
//! - **Hodograph curves** for analytic derivatives
//! - **Boehm's algorithm** for knot insertion (refinement)

mod bspline;
mod nurbs;

pub use bspline::{BSplineCurve, BSplineCurve2d, BSplineCurve3d};
pub use nurbs::{NurbsCurve, NurbsCurve2d, NurbsCurve3d};

use rspline_geom::{GeomError, GeomResult};

// =============================================================================
// Knot vector utilities
// =============================================================================

/// Validate a knot vector: non-decreasing, finite,
/// length = n_control_points + degree + 1, and a non-empty domain.
pub(crate) fn validate_knots(knots: &[f64], n_points: usize, degree: usize) -> GeomResult<()> {
    if n_points <= degree {
        return Err(GeomError::invalid(format!(
            "degree {degree} needs at least {} control points, got {n_points}",
            degree + 1
        )));
    }
    if knots.len() != n_points + degree + 1 {
        return Err(GeomError::invalid(format!(
            "invalid knot vector: len={} but expected {} (n={}, p={})",
            knots.len(),
            n_points + degree + 1,
            n_points,
            degree
        )));
    }
    if knots.iter().any(|k| !k.is_finite()) {
        return Err(GeomError::invalid("knot vector contains non-finite values"));
    }
    if let Some(i) = (1..knots.len()).find(|&i| knots[i] < knots[i - 1]) {
        return Err(GeomError::invalid(format!(
            "knot vector decreases at index {i}: {} < {}",
            knots[i],
            knots[i - 1]
        )));
    }
    if knots[degree] >= knots[n_points] {
        return Err(GeomError::invalid(format!(
            "empty parameter domain [{}, {}]",
            knots[degree], knots[n_points]
        )));
    }
    Ok(())
}

/// Find the knot span index for parameter `t`.
///
/// Returns `i` such that `knots[i] <= t < knots[i+1]`, clamped to valid range.
/// For `t` at the end of the domain, returns the last valid span.
pub(crate) fn find_span(knots: &[f64], n: usize, degree: usize, t: f64) -> usize {
    // n = number of control points - 1 (last index)
    if t >= knots[n + 1] {
        return n;
    }
    if t <= knots[degree] {
        return degree;
    }
    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Compute non-zero basis function values at parameter `t`.
///
/// Returns a vector of `degree + 1` values `N[span-degree..=span]` at `t`.
pub(crate) fn basis_functions(knots: &[f64], span: usize, degree: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            if denom.abs() < 1e-30 {
                // Zero-length knot interval
                n[j] = saved;
                continue;
            }
            let temp = n[r] / denom;
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }

    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_span() {
        let knots = vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0];
        // 4 control points, degree 2, n=3
        assert_eq!(find_span(&knots, 3, 2, 0.0), 2);
        assert_eq!(find_span(&knots, 3, 2, 0.25), 2);
        assert_eq!(find_span(&knots, 3, 2, 0.5), 3);
        assert_eq!(find_span(&knots, 3, 2, 1.0), 3);
    }

    #[test]
    fn test_basis_partition_of_unity() {
        let knots = vec![0.0, 0.0, 0.0, 0.25, 0.5, 0.75, 1.0, 1.0, 1.0];
        let degree = 2;
        let n = 5;

        for i in 0..=20 {
            let t = i as f64 / 20.0;
            let span = find_span(&knots, n, degree, t);
            let basis = basis_functions(&knots, span, degree, t);
            let sum: f64 = basis.iter().sum();
            assert!(
                (sum - 1.0).abs() < 1e-10,
                "partition of unity failed at t={}: sum={}",
                t,
                sum
            );
            assert!(basis.iter().all(|&b| b >= -1e-15));
        }
    }

    #[test]
    fn test_validate_knots() {
        assert!(validate_knots(&[0.0, 0.0, 1.0, 1.0], 2, 1).is_ok());
        // Wrong length
        assert!(validate_knots(&[0.0, 0.0, 1.0], 2, 1).is_err());
        // Decreasing
        assert!(validate_knots(&[0.0, 0.5, 0.2, 1.0], 2, 1).is_err());
        // Too few control points for the degree
        assert!(validate_knots(&[0.0, 0.0, 0.0, 1.0, 1.0], 2, 2).is_err());
        // Empty domain
        assert!(validate_knots(&[0.0, 0.0, 0.0, 0.0], 2, 1).is_err());
        assert!(validate_knots(&[0.0, f64::NAN, 1.0, 1.0], 2, 1).is_err());
    }
}
