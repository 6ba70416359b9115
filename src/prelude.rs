//! Makes available common structures needed to run a material point simulation
//!
//! You may write `use camclay::prelude::*` in your code and obtain
//! access to commonly used functionality.

pub use crate::base::{Idealization, ParamOverstress, ParamSolid, ParamStressStrain, ParamStressUpdate, DEFAULT_OUT_DIR};
pub use crate::material::{CamClay, LocalState, ModelStressStrain, StressStrainTrait};
pub use crate::material::{TriaxialAxis, TriaxialPlotter, TriaxialPoint, TriaxialTest};
pub use crate::util::{TriaxialReference, TriaxialReferenceSet};
pub use crate::StrError;
