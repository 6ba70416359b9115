//! Camclay -- Modified Cam-clay return-mapping material model
//!
//! This crate implements the stress-update (return-mapping) algorithm and the
//! consistent tangent operator of the modified Cambridge (Cam) clay model. The
//! models are evaluated at a single material (Gauss) point and are meant to be
//! called by a finite element solver at each quadrature point; thus, no mesh or
//! assembly machinery is included here.
//!
//! A strain-controlled triaxial test driver is available to exercise the
//! models without a finite element solver.

/// Defines a type alias for the error type as a static string
pub type StrError = &'static str;

pub mod base;
pub mod material;
pub mod prelude;
pub mod util;
