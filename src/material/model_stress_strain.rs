use super::{CamClay, LinearElastic, LocalState};
use crate::base::{Idealization, ParamSolid, ParamStressStrain, ParamStressUpdate};
use crate::StrError;
use russell_tensor::{Tensor2, Tensor4};

/// Specifies the essential functions for stress-strain models
///
/// The functions are called once per integration point by the finite element solver;
/// thus, the evaluation of distinct integration points is independent.
pub trait StressStrainTrait: Send {
    /// Indicates that the stiffness matrix is symmetric
    fn symmetric_stiffness(&self) -> bool;

    /// Returns the number of internal values
    fn n_internal_values(&self) -> usize;

    /// Initializes the internal values for the initial stress state
    fn initialize_internal_values(&self, state: &mut LocalState) -> Result<(), StrError>;

    /// Computes the consistent tangent stiffness
    fn stiffness(&mut self, dd: &mut Tensor4, state: &LocalState) -> Result<(), StrError>;

    /// Updates the stress tensor given the strain increment tensor and the time increment
    fn update_stress(&mut self, state: &mut LocalState, delta_strain: &Tensor2, delta_time: f64) -> Result<(), StrError>;
}

/// Holds the actual stress-strain model implementation
pub struct ModelStressStrain {
    /// Holds the actual model implementation
    pub actual: Box<dyn StressStrainTrait>,
}

impl ModelStressStrain {
    /// Allocates a new instance
    pub fn new(ideal: &Idealization, param: &ParamSolid) -> Result<Self, StrError> {
        ideal.validate()?;
        param.validate()?;
        let stress_update = match param.stress_update {
            Some(su) => su,
            None => ParamStressUpdate::new(),
        };
        let actual: Box<dyn StressStrainTrait> = match param.stress_strain {
            // Linear elastic model
            ParamStressStrain::LinearElastic { young, poisson } => Box::new(LinearElastic::new(ideal, young, poisson)),

            // Modified Cambridge (Cam) clay model
            ParamStressStrain::CamClay { .. } => Box::new(CamClay::new(ideal, &param.stress_strain, &stress_update)?),
        };
        Ok(ModelStressStrain { actual })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
