use crate::StrError;
use russell_tensor::Mandel;
use serde::{Deserialize, Serialize};

/// Defines the geometry idealization of the material point (plane-strain, plane-stress, none)
///
/// # Default values
///
/// * In 2D, the default choice is **plane-strain**
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Idealization {
    /// Indicates 2D instead of 3D
    pub two_dim: bool,

    /// Indicates a plane-stress idealization in 2D
    pub plane_stress: bool,
}

impl Idealization {
    /// Allocates a new instance
    ///
    /// # Default values
    ///
    /// * `2D`: plane-strain
    /// * `3D`: no idealization
    pub fn new(ndim: usize) -> Self {
        Idealization {
            two_dim: ndim == 2,
            plane_stress: false,
        }
    }

    /// Returns the symmetric Mandel representation associated with the idealization
    ///
    /// # Results
    ///
    /// * `2D`: [Mandel::Symmetric2D]
    /// * `3D`: [Mandel::Symmetric]
    pub fn mandel(&self) -> Mandel {
        if self.two_dim {
            Mandel::Symmetric2D
        } else {
            Mandel::Symmetric
        }
    }

    /// Validates the idealization
    pub fn validate(&self) -> Result<(), StrError> {
        if self.plane_stress && !self.two_dim {
            return Err("plane-stress requires a 2D idealization");
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
