use crate::StrError;
use serde::{Deserialize, Serialize};

/// Holds parameters for the rate-dependent (overstress) flow rule
///
/// The magnitude of the plastic strain increment is given by
///
/// ```text
/// Δγ = ε̇₀ Δt ⟨d / (pc/2)⟩ᵐ
/// ```
///
/// where `d` is the distance between the stress point and the yield surface.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ParamOverstress {
    /// Reference plastic strain rate ε̇₀
    pub ref_rate: f64,

    /// Rate sensitivity exponent m (must be ≥ 1)
    pub exponent: f64,
}

/// Holds parameters for stress-strain relations (total or effective stress)
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum ParamStressStrain {
    /// Linear elastic model
    LinearElastic {
        /// Young's modulus
        young: f64,

        /// Poisson's coefficient
        poisson: f64,
    },

    /// Modified Cambridge (Cam) clay model
    CamClay {
        /// Young's modulus
        young: f64,

        /// Poisson's coefficient
        poisson: f64,

        /// Critical state line slope (slope of the yield surface)
        mm: f64,

        /// Compression coefficient
        lambda: f64,

        /// Recompression coefficient
        kappa: f64,

        /// Initial specific volume v = 1 + e
        v_ini: f64,

        /// Initial preconsolidation pressure (size of the yield surface)
        ///
        /// Ignored if `ocr` is given.
        pc_ini: f64,

        /// Overconsolidation ratio used to compute pc from the initial stress state
        ocr: Option<f64>,

        /// Enables the rate-dependent (overstress) flow rule
        overstress: Option<ParamOverstress>,
    },
}

/// Holds data to control the stress update algorithms
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ParamStressUpdate {
    /// Tolerance for the local Newton-Raphson iterations of the return map
    pub rm_tolerance: f64,

    /// Max number of local Newton-Raphson iterations of the return map
    pub rm_n_max_it: usize,

    /// Allows an initial yield surface drift (e.g., for debugging)
    pub allow_initial_drift: bool,

    /// Prints the local iterations
    pub verbose: bool,
}

/// Holds parameters for solid media mechanics simulations
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ParamSolid {
    /// Parameters for the stress-strain model
    pub stress_strain: ParamStressStrain,

    /// Options for the stress update algorithms
    pub stress_update: Option<ParamStressUpdate>,
}

impl ParamOverstress {
    /// Validates the parameters
    pub fn validate(&self) -> Result<(), StrError> {
        if self.ref_rate <= 0.0 {
            return Err("reference plastic strain rate must be > 0.0");
        }
        if self.exponent < 1.0 {
            return Err("rate sensitivity exponent must be ≥ 1.0");
        }
        Ok(())
    }
}

impl ParamStressStrain {
    /// Validates the parameters
    pub fn validate(&self) -> Result<(), StrError> {
        match *self {
            ParamStressStrain::LinearElastic { young, poisson } => validate_elastic(young, poisson),
            ParamStressStrain::CamClay {
                young,
                poisson,
                mm,
                lambda,
                kappa,
                v_ini,
                pc_ini,
                ocr,
                overstress,
            } => {
                validate_elastic(young, poisson)?;
                if mm <= 0.0 {
                    return Err("critical state line slope M must be > 0.0");
                }
                if kappa <= 0.0 {
                    return Err("recompression coefficient κ must be > 0.0");
                }
                if lambda <= kappa {
                    return Err("compression coefficient λ must be greater than κ");
                }
                if v_ini <= 1.0 {
                    return Err("initial specific volume must be > 1.0");
                }
                match ocr {
                    Some(value) => {
                        if value < 1.0 {
                            return Err("overconsolidation ratio must be ≥ 1.0");
                        }
                    }
                    None => {
                        if pc_ini <= 0.0 {
                            return Err("initial preconsolidation pressure must be > 0.0");
                        }
                    }
                }
                if let Some(p) = overstress {
                    p.validate()?;
                }
                Ok(())
            }
        }
    }
}

impl ParamStressUpdate {
    /// Allocates a new instance with default values
    pub fn new() -> Self {
        ParamStressUpdate {
            rm_tolerance: 1e-10,
            rm_n_max_it: 30,
            allow_initial_drift: false,
            verbose: false,
        }
    }

    /// Validates the parameters
    pub fn validate(&self) -> Result<(), StrError> {
        if self.rm_tolerance <= 0.0 {
            return Err("return-mapping tolerance must be > 0.0");
        }
        if self.rm_n_max_it < 1 {
            return Err("return-mapping max number of iterations must be ≥ 1");
        }
        Ok(())
    }
}

impl ParamSolid {
    /// Returns sample parameters for the linear elastic model
    pub fn sample_linear_elastic() -> Self {
        ParamSolid {
            stress_strain: ParamStressStrain::LinearElastic {
                young: 10_000.0, // kPa
                poisson: 0.2,    // [-]
            },
            stress_update: None,
        }
    }

    /// Returns sample parameters for the (rate-independent) Cam clay model
    pub fn sample_cam_clay() -> Self {
        ParamSolid {
            stress_strain: ParamStressStrain::CamClay {
                young: 1500.0, // kPa
                poisson: 0.25, // [-]
                mm: 1.0,
                lambda: 0.2,
                kappa: 0.04,
                v_ini: 2.0,
                pc_ini: 100.0, // kPa
                ocr: None,
                overstress: None,
            },
            stress_update: None,
        }
    }

    /// Returns sample parameters for the rate-dependent Cam clay model
    pub fn sample_cam_clay_overstress(ref_rate: f64, exponent: f64) -> Self {
        let mut param = ParamSolid::sample_cam_clay();
        if let ParamStressStrain::CamClay { overstress, .. } = &mut param.stress_strain {
            *overstress = Some(ParamOverstress { ref_rate, exponent });
        }
        param
    }

    /// Validates all parameters
    pub fn validate(&self) -> Result<(), StrError> {
        self.stress_strain.validate()?;
        if let Some(su) = self.stress_update {
            su.validate()?;
        }
        Ok(())
    }
}

/// Validates the elastic parameters
fn validate_elastic(young: f64, poisson: f64) -> Result<(), StrError> {
    if young <= 0.0 {
        return Err("Young's modulus must be > 0.0");
    }
    if poisson <= -1.0 || poisson >= 0.5 {
        return Err("Poisson's coefficient must be in (-1.0, 0.5)");
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
