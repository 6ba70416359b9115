//! Implements material models

mod cam_clay;
mod linear_elastic;
mod local_state;
mod model_stress_strain;
mod triaxial;
mod triaxial_plot;
pub use crate::material::cam_clay::*;
pub use crate::material::linear_elastic::*;
pub use crate::material::local_state::*;
pub use crate::material::model_stress_strain::*;
pub use crate::material::triaxial::*;
pub use crate::material::triaxial_plot::*;
