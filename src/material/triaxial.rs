use super::{LocalState, ModelStressStrain, StressStrainTrait};
use crate::base::{Idealization, ParamSolid};
use crate::StrError;
use russell_tensor::{Mandel, Tensor2, Tensor4};
use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Holds the data of a strain-controlled triaxial compression test
///
/// The test is performed on a single material point in 3D with the axial direction along z.
/// The specimen is first isotropically consolidated to `p_ini` and then sheared by applying
/// `n_increments` equal increments of (compressive) axial strain.
///
/// * **Drained** tests keep the radial (confining) stress constant; the radial strain is found
///   by Newton-Raphson iterations using the consistent tangent of the model.
/// * **Undrained** tests are isochoric; the radial strain is `-Δεa/2`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TriaxialTest {
    /// Indicates a drained test (constant confining stress) instead of an undrained test
    pub drained: bool,

    /// Initial (compression-positive) isotropic pressure
    pub p_ini: f64,

    /// Final (compression-positive) axial strain
    pub axial_strain: f64,

    /// Number of axial strain increments
    pub n_increments: usize,

    /// Time increment of each step (used by rate-dependent models)
    pub delta_time: f64,

    /// Tolerance for the radial stress iterations (relative to p_ini)
    pub tolerance: f64,

    /// Max number of radial stress iterations
    pub n_max_it: usize,
}

/// Holds the results at the end of one increment of a triaxial test
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriaxialPoint {
    /// Compression-positive axial strain
    pub axial_strain: f64,

    /// Compression-positive volumetric strain
    pub volumetric_strain: f64,

    /// Compression-positive mean pressure
    pub p: f64,

    /// Deviatoric stress
    pub q: f64,

    /// Differential stress σ1 - σ3 (compression-positive axial minus radial stress)
    pub differential_stress: f64,

    /// Preconsolidation pressure (NaN for models without internal values)
    pub pc: f64,

    /// Yield function value
    pub yield_value: f64,

    /// Indicates an elastic increment
    pub elastic: bool,
}

impl TriaxialTest {
    /// Allocates a new instance with default tolerances
    pub fn new(drained: bool, p_ini: f64, axial_strain: f64, n_increments: usize) -> Self {
        TriaxialTest {
            drained,
            p_ini,
            axial_strain,
            n_increments,
            delta_time: 1.0,
            tolerance: 1e-10,
            n_max_it: 20,
        }
    }

    /// Validates the data
    pub fn validate(&self) -> Result<(), StrError> {
        if self.p_ini <= 0.0 {
            return Err("initial pressure must be > 0.0");
        }
        if self.n_increments < 1 {
            return Err("number of increments must be ≥ 1");
        }
        if self.delta_time <= 0.0 {
            return Err("time increment must be > 0.0");
        }
        if self.tolerance <= 0.0 {
            return Err("tolerance must be > 0.0");
        }
        if self.n_max_it < 1 {
            return Err("max number of iterations must be ≥ 1");
        }
        Ok(())
    }

    /// Allocates a 3D model and runs the test
    ///
    /// Returns the results at the initial state and after each increment.
    pub fn run(&self, param: &ParamSolid) -> Result<Vec<TriaxialPoint>, StrError> {
        let ideal = Idealization::new(3);
        let mut model = ModelStressStrain::new(&ideal, param)?;
        self.run_model(&ideal, model.actual.as_mut())
    }

    /// Runs a batch of tests, one for each confining pressure
    ///
    /// Each confining pressure replaces `p_ini`; a fresh model is allocated for every test.
    /// The results follow the order of `confining_pressures`.
    pub fn run_batch(&self, param: &ParamSolid, confining_pressures: &[f64]) -> Result<Vec<Vec<TriaxialPoint>>, StrError> {
        if confining_pressures.is_empty() {
            return Err("there are no confining pressures");
        }
        confining_pressures
            .iter()
            .map(|&p_ini| TriaxialTest { p_ini, ..*self }.run(param))
            .collect()
    }

    /// Runs the test with an existing model
    ///
    /// # Input
    ///
    /// * `ideal` -- the idealization used to allocate the model (must be 3D)
    /// * `model` -- the stress-strain model
    pub fn run_model(&self, ideal: &Idealization, model: &mut dyn StressStrainTrait) -> Result<Vec<TriaxialPoint>, StrError> {
        self.validate()?;
        if ideal.two_dim {
            return Err("triaxial test requires a 3D model");
        }
        let mandel = Mandel::Symmetric;

        // initial state
        let mut state = LocalState::new(mandel, model.n_internal_values(), false);
        for i in 0..3 {
            state.stress.vector_mut()[i] = -self.p_ini;
        }
        model.initialize_internal_values(&mut state)?;
        let mut points = vec![point(&state, 0.0, 0.0)];

        // auxiliary
        let mut backup = state.clone();
        let mut delta_strain = Tensor2::new(mandel);
        let mut dd = Tensor4::new(mandel);
        let sigma_r = -self.p_ini;
        let delta_axial = -self.axial_strain / (self.n_increments as f64);
        let mut delta_radial = if self.drained { 0.0 } else { -delta_axial / 2.0 };

        // increments
        let (mut eps_a, mut eps_v) = (0.0, 0.0);
        for _ in 0..self.n_increments {
            backup.mirror(&state);
            let mut it = 0;
            loop {
                state.mirror(&backup);
                let deps = delta_strain.vector_mut();
                deps[0] = delta_radial;
                deps[1] = delta_radial;
                deps[2] = delta_axial;
                model.update_stress(&mut state, &delta_strain, self.delta_time)?;
                if !self.drained {
                    break;
                }
                let residual = state.stress.vector()[0] - sigma_r;
                if f64::abs(residual) < self.tolerance * self.p_ini {
                    break;
                }
                if it == self.n_max_it {
                    return Err("radial stress iterations did not converge");
                }
                model.stiffness(&mut dd, &state)?;
                let slope = dd.matrix().get(0, 0) + dd.matrix().get(0, 1);
                if slope == 0.0 {
                    return Err("radial stiffness is zero");
                }
                delta_radial -= residual / slope;
                it += 1;
            }
            eps_a -= delta_axial;
            eps_v -= 2.0 * delta_radial + delta_axial;
            points.push(point(&state, eps_a, eps_v));
        }
        Ok(points)
    }
}

impl TriaxialPoint {
    /// Returns a copy with all stress quantities divided by `stress`
    pub fn normalized(&self, stress: f64) -> Self {
        TriaxialPoint {
            p: self.p / stress,
            q: self.q / stress,
            differential_stress: self.differential_stress / stress,
            pc: self.pc / stress,
            ..self.clone()
        }
    }
}

/// Divides the stress quantities of all points by a normalisation stress
pub fn normalize_stress(points: &[TriaxialPoint], stress: f64) -> Result<Vec<TriaxialPoint>, StrError> {
    if stress <= 0.0 {
        return Err("normalisation stress must be > 0.0");
    }
    Ok(points.iter().map(|r| r.normalized(stress)).collect())
}

/// Extracts the results from the local state
fn point(state: &LocalState, axial_strain: f64, volumetric_strain: f64) -> TriaxialPoint {
    let sig = state.stress.vector();
    TriaxialPoint {
        axial_strain,
        volumetric_strain,
        p: state.pressure(),
        q: state.deviatoric_stress(),
        differential_stress: sig[0] - sig[2],
        pc: if state.internal_values.dim() > 0 {
            state.internal_values[0]
        } else {
            f64::NAN
        },
        yield_value: state.yield_value,
        elastic: state.elastic,
    }
}

/// Writes the triaxial results to a CSV file
///
/// The directory of the file is created if it does not exist.
pub fn write_triaxial_csv<P>(points: &[TriaxialPoint], full_path: &P) -> Result<(), StrError>
where
    P: AsRef<Path> + ?Sized,
{
    let path = Path::new(full_path.as_ref());
    if let Some(p) = path.parent() {
        fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
    }
    let mut buffer = String::new();
    writeln!(&mut buffer, "axial_strain,volumetric_strain,p,q,differential_stress,pc,yield_value,elastic").map_err(|_| "cannot format header")?;
    for r in points {
        writeln!(
            &mut buffer,
            "{:e},{:e},{:e},{:e},{:e},{:e},{:e},{}",
            r.axial_strain,
            r.volumetric_strain,
            r.p,
            r.q,
            r.differential_stress,
            r.pc,
            r.yield_value,
            r.elastic
        )
        .map_err(|_| "cannot format results")?;
    }
    let mut file = File::create(path).map_err(|_| "cannot create file")?;
    file.write_all(buffer.as_bytes()).map_err(|_| "cannot write file")?;
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
