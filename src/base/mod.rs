//! Implements the base structures for a material point simulation

mod constants;
mod idealization;
mod parameters;
pub use crate::base::constants::*;
pub use crate::base::idealization::*;
pub use crate::base::parameters::*;
