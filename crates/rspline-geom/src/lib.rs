#![warn(missing_docs)]

//! Parametric curve and patch abstractions for the rspline kernel.
//!
//! Provides the [`Curve3d`] and [`Patch`] traits, analytic profile curves
//! (lines and circles), profile-driven patches (surfaces of revolution and
//! linear extrusions), and the generic two-phase inverse evaluation that
//! every curve and patch type shares.

mod curve;
mod error;
mod extrusion;
mod inverse;
mod patch;
mod revolution;

pub use curve::{Circle3d, Curve3d, CurveKind, Line3d};
pub use error::{GeomError, GeomResult};
pub use extrusion::ExtrusionPatch;
pub use inverse::{
    approximate_curve_inverse, approximate_inverse_evaluate, curve_newton_raphson,
    inverse_evaluate_curve, inverse_evaluate_patch, newton_raphson, InverseSettings,
    ParamInterval,
};
pub use patch::{Patch, PatchKind};
pub use revolution::RevolutionPatch;
