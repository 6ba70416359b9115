use super::{LocalState, StressStrainTrait};
use crate::base::{Idealization, ParamOverstress, ParamStressStrain, ParamStressUpdate};
use crate::StrError;
use russell_lab::{mat_inverse, solve_lin_sys, Matrix, Vector};
use russell_tensor::{t4_ddot_t2_update, LinElasticity, Tensor2, Tensor4};
use russell_tensor::{IDENTITY2, P_SYMDEV, SQRT_2, SQRT_2_BY_3, SQRT_3};

/// Defines an alias to IDENTITY2
const I: &[f64; 9] = &IDENTITY2;

/// Defines an alias to P_SYMDEV
const PSD: &[[f64; 9]; 9] = &P_SYMDEV;

/// Holds the index of the preconsolidation pressure pc (size of the yield surface)
const Z_PC: usize = 0;

/// Holds the index of the accumulated (compressive) volumetric plastic strain
const Z_EPS_V: usize = 1;

/// Holds the index of the accumulated deviatoric plastic strain
const Z_EPS_Q: usize = 2;

/// Holds the number of internal values: pc, εv_p, εq_p
const N_INTERNAL_VALUES: usize = 3;

/// Holds the yield function tolerance (relative to pc²) to accept initial states on the yield surface
const YF_TOL: f64 = 1e-10;

/// Holds the number of unknowns of the local problem: p, q, ln(pc), Λ
const N_LOCAL: usize = 4;

/// Implements the modified Cam clay model
///
/// The yield function is written in terms of the compression-positive mean pressure `p = -σm`
/// and the deviatoric stress `q = σd`:
///
/// ```text
/// f(p, q, pc) = q²/M² + p (p - pc)
/// ```
///
/// The flow rule is associated and the preconsolidation pressure evolves with the
/// volumetric plastic strain:
///
/// ```text
/// Δεp = Λ ∂f/∂σ
/// pc = pc_n exp(χ Δεv_p)    with    χ = v / (λ - κ)
/// ```
///
/// If the overstress parameters are given, the plastic multiplier is computed by a Perzyna-type
/// (rate-dependent) law instead of the consistency condition f = 0.
///
/// The internal values are `[pc, εv_p, εq_p]`.
///
/// **Note:** This model works in 2D (plane-strain only) or 3D.
pub struct CamClay {
    /// Linear elasticity
    lin_elasticity: LinElasticity,

    /// Bulk modulus K
    kk: f64,

    /// Shear modulus G
    gg: f64,

    /// Slope of the critical state line (yield surface)
    mm: f64,

    /// Hardening coefficient χ = v / (λ - κ)
    chi: f64,

    /// Initial preconsolidation pressure
    pc_ini: f64,

    /// Overconsolidation ratio to compute pc from the initial stress
    ocr: Option<f64>,

    /// Parameters of the rate-dependent flow rule
    overstress: Option<ParamOverstress>,

    /// Parameters of the stress update algorithm
    su: ParamStressUpdate,

    /// Time increment of the last stress update
    delta_time: f64,

    /// Trial stress σ_trial = σ + Dₑ : Δε
    sigma_trial: Tensor2,

    /// Deviatoric stress: s = dev(σ)
    s: Tensor2,

    /// Local residual vector (or the increment of the local unknowns)
    rr: Vector,

    /// Local Jacobian matrix
    jj: Matrix,

    /// Inverse of the local Jacobian matrix
    jj_inv: Matrix,
}

impl CamClay {
    /// Allocates a new instance
    pub fn new(ideal: &Idealization, param: &ParamStressStrain, su: &ParamStressUpdate) -> Result<Self, StrError> {
        if ideal.plane_stress {
            return Err("Cam clay model does not work in plane-stress");
        }
        param.validate()?;
        su.validate()?;
        match *param {
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
                let lin_elasticity = LinElasticity::new(young, poisson, ideal.two_dim, false);
                let (kk, gg) = lin_elasticity.get_bulk_shear();
                let mandel = ideal.mandel();
                Ok(CamClay {
                    lin_elasticity,
                    kk,
                    gg,
                    mm,
                    chi: v_ini / (lambda - kappa),
                    pc_ini,
                    ocr,
                    overstress,
                    su: *su,
                    delta_time: 0.0,
                    sigma_trial: Tensor2::new(mandel),
                    s: Tensor2::new(mandel),
                    rr: Vector::new(N_LOCAL),
                    jj: Matrix::new(N_LOCAL, N_LOCAL),
                    jj_inv: Matrix::new(N_LOCAL, N_LOCAL),
                })
            }
            _ => Err("parameters do not correspond to the Cam clay model"),
        }
    }

    /// Evaluates the yield function f(p, q, pc) = q²/M² + p (p - pc)
    pub fn yield_function(&self, p: f64, q: f64, pc: f64) -> f64 {
        q * q / (self.mm * self.mm) + p * (p - pc)
    }

    /// Computes the yield surface support point (p_y, q_y) associated with (p, q)
    ///
    /// The support point is the projection of (p, q) onto the yield surface along the ray
    /// starting at the center of the ellipse (pc/2, 0). If (p, q) coincides with the center,
    /// the top of the ellipse (pc/2, M pc/2) is returned.
    pub fn yield_point(&self, p: f64, q: f64, pc: f64) -> (f64, f64) {
        let center = pc / 2.0;
        let dp = p - center;
        let radius = f64::sqrt(dp * dp + q * q / (self.mm * self.mm));
        if radius == 0.0 {
            return (center, self.mm * center);
        }
        let t = center / radius;
        (center + t * dp, t * q)
    }

    /// Computes the flow tensor N = ∂f/∂σ (direction of the plastic strain increment)
    ///
    /// ```text
    /// N = -(2p - pc)/3 I + (3/M²) s
    /// ```
    ///
    /// # Panics
    ///
    /// A panic will occur if the tensors have different [russell_tensor::Mandel].
    pub fn flow_tensor(&self, nn: &mut Tensor2, sigma: &Tensor2, pc: f64) {
        assert_eq!(nn.mandel(), sigma.mandel());
        let sigma_m = sigma.invariant_sigma_m();
        let p = -sigma_m;
        let c = 3.0 / (self.mm * self.mm);
        let nd = sigma.dim();
        let sig = sigma.vector();
        let vec = nn.vector_mut();
        for i in 0..nd {
            vec[i] = -(2.0 * p - pc) / 3.0 * I[i] + c * (sig[i] - sigma_m * I[i]);
        }
    }

    /// Computes the magnitude of the plastic strain increment given by the overstress law
    ///
    /// ```text
    /// Δγ = ε̇₀ Δt ⟨d / (pc/2)⟩ᵐ
    /// ```
    ///
    /// where `d` is the distance (in the (p, q/M) space) between (p, q) and the support point.
    /// The result is zero for the rate-independent model or if (p, q) is inside the yield surface.
    pub fn flow_increment(&self, p: f64, q: f64, pc: f64, delta_time: f64) -> f64 {
        let param = match self.overstress {
            Some(o) => o,
            None => return 0.0,
        };
        if self.yield_function(p, q, pc) <= 0.0 {
            return 0.0;
        }
        let (p_y, q_y) = self.yield_point(p, q, pc);
        let dp = p - p_y;
        let dq = (q - q_y) / self.mm;
        let ratio = f64::sqrt(dp * dp + dq * dq) / (pc / 2.0);
        param.ref_rate * delta_time * f64::powf(ratio, param.exponent)
    }

    /// Computes the derivatives of the flow increment (∂Δγ/∂p, ∂Δγ/∂q, ∂Δγ/∂pc)
    pub fn deriv_flow_increment(&self, p: f64, q: f64, pc: f64, delta_time: f64) -> (f64, f64, f64) {
        let param = match self.overstress {
            Some(o) => o,
            None => return (0.0, 0.0, 0.0),
        };
        if self.yield_function(p, q, pc) <= 0.0 {
            return (0.0, 0.0, 0.0);
        }
        let m2 = self.mm * self.mm;
        let dp = p - pc / 2.0;
        let radius = f64::sqrt(dp * dp + q * q / m2);
        let ratio = 2.0 * radius / pc - 1.0;
        let d_ratio = param.ref_rate * delta_time * param.exponent * f64::powf(ratio, param.exponent - 1.0);
        (
            d_ratio * 2.0 * dp / (pc * radius),
            d_ratio * 2.0 * q / (m2 * pc * radius),
            d_ratio * (-dp / (pc * radius) - 2.0 * radius / (pc * pc)),
        )
    }

    /// Performs the return mapping given the strain increment
    ///
    /// The trial stress `σ_tr = σ + Dₑ : Δε` is projected back onto the yield surface (or onto
    /// the overstress surface for the rate-dependent model) by solving the local problem in
    /// (p, q, ln(pc), Λ) with the Newton-Raphson method. The deviatoric stress is scaled radially.
    /// Using ln(pc) as unknown keeps pc positive when tensile increments shrink the surface
    /// towards the apex.
    ///
    /// On output, the state holds the updated stress, internal values, the plastic multiplier
    /// Λ (`algo_lagrange`), and the number of local iterations. If an error occurs, the state
    /// is not modified.
    pub fn return_map(&mut self, state: &mut LocalState, delta_strain: &Tensor2, delta_time: f64) -> Result<(), StrError> {
        // check
        self.check_state(state)?;
        if delta_strain.mandel() != self.s.mandel() {
            return Err("local state and model have incompatible dimensions");
        }
        let pc_n = state.internal_values[Z_PC];
        if pc_n <= 0.0 {
            return Err("preconsolidation pressure must be > 0.0");
        }
        if self.overstress.is_some() && delta_time <= 0.0 {
            return Err("time increment must be > 0.0 for the rate-dependent model");
        }

        // trial stress: σ_trial = σ + D : Δε
        let dde = self.lin_elasticity.get_modulus();
        self.sigma_trial.set_tensor(1.0, &state.stress);
        t4_ddot_t2_update(&mut self.sigma_trial, 1.0, dde, delta_strain, 1.0);

        // elastic update
        let p_trial = -self.sigma_trial.invariant_sigma_m();
        let q_trial = self.sigma_trial.invariant_sigma_d();
        let f_trial = self.yield_function(p_trial, q_trial, pc_n);
        if f_trial <= 0.0 {
            state.stress.set_tensor(1.0, &self.sigma_trial);
            state.update_strain(1.0, delta_strain);
            state.elastic = true;
            state.algo_lagrange = 0.0;
            state.algo_iterations = 0;
            state.yield_value = f_trial;
            return Ok(());
        }

        // s_trial = dev(σ_trial)
        self.sigma_trial.deviator(&mut self.s);

        // local Newton-Raphson iterations
        let ln_pc_n = f64::ln(pc_n);
        let (mut p, mut q, mut ln_pc, mut lambda) = (p_trial, q_trial, ln_pc_n, 0.0);
        if self.su.verbose {
            println!(
                "{:>4}{:>15}{:>15}{:>15}{:>15}{:>11}",
                "it", "p", "q", "pc", "Λ", "error"
            );
        }
        let mut it = 0;
        loop {
            let pc = f64::exp(ln_pc);
            self.calc_residual(p_trial, q_trial, ln_pc_n, p, q, ln_pc, lambda, delta_time);
            let error = self.residual_error(pc_n);
            if self.su.verbose {
                println!("{:>4}{:>15.6e}{:>15.6e}{:>15.6e}{:>15.6e}{:>11.3e}", it, p, q, pc, lambda, error);
            }
            if !error.is_finite() {
                return Err("return-mapping failed with non-finite values");
            }
            if error < self.su.rm_tolerance {
                break;
            }
            if it == self.su.rm_n_max_it {
                return Err("return-mapping did not converge");
            }
            self.calc_jacobian(p, q, pc, lambda, delta_time);
            for i in 0..N_LOCAL {
                self.rr[i] = -self.rr[i];
            }
            solve_lin_sys(&mut self.rr, &mut self.jj)?; // rr ← δx
            p += self.rr[0];
            q += self.rr[1];
            ln_pc += self.rr[2];
            lambda += self.rr[3];
            if !(p.is_finite() && q.is_finite() && ln_pc.is_finite() && lambda.is_finite()) {
                return Err("return-mapping failed with non-finite values");
            }
            it += 1;
        }
        let pc = f64::exp(ln_pc);

        // σ_new = -p I + r s_trial
        let r = self.deviatoric_ratio(lambda);
        let nd = state.stress.dim();
        let vec = state.stress.vector_mut();
        let s_trial = self.s.vector();
        for i in 0..nd {
            vec[i] = -p * I[i] + r * s_trial[i];
        }
        state.update_strain(1.0, delta_strain);

        // plastic strain: Δεp = Λ N
        if state.plastic_strain.is_some() {
            let mut nn = Tensor2::new(state.stress.mandel());
            self.flow_tensor(&mut nn, &state.stress, pc);
            if let Some(eps_p) = state.plastic_strain.as_mut() {
                let eps = eps_p.vector_mut();
                for i in 0..nd {
                    eps[i] += lambda * nn.vector()[i];
                }
            }
        }

        // elastoplastic update
        state.internal_values[Z_PC] = pc;
        state.internal_values[Z_EPS_V] += lambda * (2.0 * p - pc);
        state.internal_values[Z_EPS_Q] += lambda * 2.0 * q / (self.mm * self.mm);
        state.elastic = false;
        state.algo_lagrange = lambda;
        state.algo_iterations = it;
        state.yield_value = self.yield_function(p, q, pc);
        Ok(())
    }

    /// Computes the consistent tangent modulus at an updated state
    ///
    /// With `J⁻¹` being the inverse of the local Jacobian, `ŝ` the unit deviator, and
    /// `r = 1/(1 + 6GΛ/M²)`:
    ///
    /// ```text
    /// D = K J⁻¹₀₀ I⊗I - √6 G J⁻¹₀₁ I⊗ŝ - √(2/3) K J⁻¹₁₀ ŝ⊗I + 2G (J⁻¹₁₁ - r) ŝ⊗ŝ + 2G r Psd
    /// ```
    pub fn consistent_tangent(&mut self, dd: &mut Tensor4, state: &LocalState, delta_time: f64) -> Result<(), StrError> {
        // check
        self.check_state(state)?;
        if dd.mandel() != self.s.mandel() {
            return Err("local state and model have incompatible dimensions");
        }

        // handle elastic case
        if state.elastic {
            dd.set_tensor(1.0, self.lin_elasticity.get_modulus()); // D ← Dₑ
            return Ok(());
        }

        // extract current state variables
        let p = state.pressure();
        let q = state.deviatoric_stress();
        let pc = state.internal_values[Z_PC];
        let lambda = state.algo_lagrange;

        // inverse of the local Jacobian at the converged state
        self.calc_jacobian(p, q, pc, lambda, delta_time);
        mat_inverse(&mut self.jj_inv, &self.jj)?;

        // unit deviator
        state.stress.deviator(&mut self.s);
        let nd = state.stress.dim();
        let norm_s = f64::sqrt((0..nd).map(|i| self.s.vector()[i] * self.s.vector()[i]).sum());
        let s_hat: Vec<f64> = if norm_s > 0.0 {
            (0..nd).map(|i| self.s.vector()[i] / norm_s).collect()
        } else {
            vec![0.0; nd]
        };

        // coefficients
        let (kk, gg) = (self.kk, self.gg);
        let r = self.deviatoric_ratio(lambda);
        let a = kk * self.jj_inv.get(0, 0);
        let b = -SQRT_2 * SQRT_3 * gg * self.jj_inv.get(0, 1);
        let c = -SQRT_2_BY_3 * kk * self.jj_inv.get(1, 0);
        let d = 2.0 * gg * (self.jj_inv.get(1, 1) - r);
        let e = 2.0 * gg * r;

        // consistent tangent modulus
        let mat = dd.matrix_mut();
        for i in 0..nd {
            for j in 0..nd {
                mat.set(
                    i,
                    j,
                    a * I[i] * I[j] + b * I[i] * s_hat[j] + c * s_hat[i] * I[j] + d * s_hat[i] * s_hat[j] + e * PSD[i][j],
                );
            }
        }
        Ok(())
    }

    /// Checks that the local state was allocated for this model
    fn check_state(&self, state: &LocalState) -> Result<(), StrError> {
        if state.stress.mandel() != self.s.mandel() {
            return Err("local state and model have incompatible dimensions");
        }
        if state.internal_values.dim() != N_INTERNAL_VALUES {
            return Err("local state has an incorrect number of internal values");
        }
        Ok(())
    }

    /// Returns the ratio between the updated and the trial deviatoric stresses
    fn deviatoric_ratio(&self, lambda: f64) -> f64 {
        1.0 / (1.0 + 6.0 * self.gg * lambda / (self.mm * self.mm))
    }

    /// Calculates the local residual vector
    fn calc_residual(
        &mut self,
        p_trial: f64,
        q_trial: f64,
        ln_pc_n: f64,
        p: f64,
        q: f64,
        ln_pc: f64,
        lambda: f64,
        delta_time: f64,
    ) {
        let m2 = self.mm * self.mm;
        let pc = f64::exp(ln_pc);
        let a = 2.0 * p - pc;
        let b = 2.0 * q / m2;
        self.rr[0] = p - p_trial + self.kk * lambda * a;
        self.rr[1] = q - q_trial + 3.0 * self.gg * lambda * b;
        self.rr[2] = ln_pc - ln_pc_n - self.chi * lambda * a;
        let consistency = match self.overstress {
            Some(_) => lambda * f64::sqrt(a * a + b * b) - self.flow_increment(p, q, pc, delta_time),
            None => self.yield_function(p, q, pc),
        };
        self.rr[3] = consistency;
    }

    /// Returns the scaled max-norm of the local residual vector
    fn residual_error(&self, pc_n: f64) -> f64 {
        let consistency = match self.overstress {
            Some(_) => f64::abs(self.rr[3]),
            None => f64::abs(self.rr[3]) / (pc_n * pc_n),
        };
        let stress = f64::max(f64::abs(self.rr[0]), f64::abs(self.rr[1])) / pc_n;
        f64::max(f64::max(stress, f64::abs(self.rr[2])), consistency)
    }

    /// Calculates the local Jacobian matrix
    ///
    /// The unknowns are ordered as (p, q, ln(pc), Λ); thus, the derivatives with respect
    /// to pc are multiplied by pc.
    fn calc_jacobian(&mut self, p: f64, q: f64, pc: f64, lambda: f64, delta_time: f64) {
        let (kk, gg, chi) = (self.kk, self.gg, self.chi);
        let m2 = self.mm * self.mm;
        let a = 2.0 * p - pc;
        let b = 2.0 * q / m2;

        // p - p_trial + K Λ a
        self.jj.set(0, 0, 1.0 + 2.0 * kk * lambda);
        self.jj.set(0, 1, 0.0);
        self.jj.set(0, 2, -kk * lambda * pc);
        self.jj.set(0, 3, kk * a);

        // q - q_trial + 3G Λ b
        self.jj.set(1, 0, 0.0);
        self.jj.set(1, 1, 1.0 + 6.0 * gg * lambda / m2);
        self.jj.set(1, 2, 0.0);
        self.jj.set(1, 3, 3.0 * gg * b);

        // ln(pc) - ln(pc_n) - χ Λ a
        self.jj.set(2, 0, -2.0 * chi * lambda);
        self.jj.set(2, 1, 0.0);
        self.jj.set(2, 2, 1.0 + chi * lambda * pc);
        self.jj.set(2, 3, -chi * a);

        // consistency
        match self.overstress {
            Some(_) => {
                // Λ g - Δγ(p, q, pc) with g = √(a² + b²)
                let g = f64::sqrt(a * a + b * b);
                let (dg_dp, dg_dq, dg_dpc) = if g > 0.0 {
                    (2.0 * a / g, 2.0 * b / (m2 * g), -a / g)
                } else {
                    (0.0, 0.0, 0.0)
                };
                let (dphi_dp, dphi_dq, dphi_dpc) = self.deriv_flow_increment(p, q, pc, delta_time);
                self.jj.set(3, 0, lambda * dg_dp - dphi_dp);
                self.jj.set(3, 1, lambda * dg_dq - dphi_dq);
                self.jj.set(3, 2, (lambda * dg_dpc - dphi_dpc) * pc);
                self.jj.set(3, 3, g);
            }
            None => {
                // f(p, q, pc)
                self.jj.set(3, 0, a);
                self.jj.set(3, 1, b);
                self.jj.set(3, 2, -p * pc);
                self.jj.set(3, 3, 0.0);
            }
        }
    }
}

impl StressStrainTrait for CamClay {
    /// Indicates that the stiffness matrix is symmetric
    fn symmetric_stiffness(&self) -> bool {
        false
    }

    /// Returns the number of internal values
    fn n_internal_values(&self) -> usize {
        N_INTERNAL_VALUES
    }

    /// Initializes the internal values for the initial stress state
    fn initialize_internal_values(&self, state: &mut LocalState) -> Result<(), StrError> {
        self.check_state(state)?;
        let p = state.pressure();
        let q = state.deviatoric_stress();
        let pc = match self.ocr {
            Some(ocr) => {
                if p <= 0.0 {
                    return Err("initial mean pressure must be > 0.0 to compute pc from the OCR");
                }
                ocr * (p + q * q / (self.mm * self.mm * p))
            }
            None => self.pc_ini,
        };
        state.internal_values[Z_PC] = pc;
        state.internal_values[Z_EPS_V] = 0.0;
        state.internal_values[Z_EPS_Q] = 0.0;
        state.yield_value = self.yield_function(p, q, pc);
        if !self.su.allow_initial_drift && state.yield_value > YF_TOL * pc * pc {
            return Err("stress is outside the yield surface");
        }
        Ok(())
    }

    /// Computes the consistent tangent stiffness
    fn stiffness(&mut self, dd: &mut Tensor4, state: &LocalState) -> Result<(), StrError> {
        self.consistent_tangent(dd, state, self.delta_time)
    }

    /// Updates the stress tensor given the strain increment tensor
    fn update_stress(&mut self, state: &mut LocalState, delta_strain: &Tensor2, delta_time: f64) -> Result<(), StrError> {
        self.delta_time = delta_time;
        self.return_map(state, delta_strain, delta_time)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::CamClay;
    use crate::base::{Idealization, ParamOverstress, ParamStressStrain, ParamStressUpdate};
    use crate::material::{LocalState, StressStrainTrait};
    use russell_lab::approx_eq;
    use russell_tensor::{t4_ddot_t2, Mandel, Tensor2, Tensor4, SQRT_2};

    fn params(mm: f64, overstress: Option<ParamOverstress>) -> ParamStressStrain {
        ParamStressStrain::CamClay {
            young: 1500.0,
            poisson: 0.25,
            mm,
            lambda: 0.2,
            kappa: 0.04,
            v_ini: 2.0,
            pc_ini: 100.0,
            ocr: None,
            overstress,
        }
    }

    fn new_model(ndim: usize, mm: f64, overstress: Option<ParamOverstress>) -> CamClay {
        let ideal = Idealization::new(ndim);
        CamClay::new(&ideal, &params(mm, overstress), &ParamStressUpdate::new()).unwrap()
    }

    fn isotropic_state(model: &CamClay, mandel: Mandel, p: f64) -> LocalState {
        let mut state = LocalState::new(mandel, model.n_internal_values(), true);
        for i in 0..3 {
            state.stress.vector_mut()[i] = -p;
        }
        model.initialize_internal_values(&mut state).unwrap();
        state
    }

    fn new_tensor(mandel: Mandel, values: &[f64]) -> Tensor2 {
        let mut deps = Tensor2::new(mandel);
        for i in 0..deps.dim() {
            deps.vector_mut()[i] = values[i];
        }
        deps
    }

    #[test]
    fn new_captures_errors() {
        let mut ideal = Idealization::new(2);
        let su = ParamStressUpdate::new();
        let param = ParamStressStrain::LinearElastic {
            young: 1000.0,
            poisson: 0.2,
        };
        assert_eq!(
            CamClay::new(&ideal, &param, &su).err(),
            Some("parameters do not correspond to the Cam clay model")
        );
        ideal.plane_stress = true;
        assert_eq!(
            CamClay::new(&ideal, &params(1.0, None), &su).err(),
            Some("Cam clay model does not work in plane-stress")
        );
    }

    #[test]
    fn yield_function_and_yield_point_work() {
        let model = new_model(3, 1.2, None);
        let pc = 100.0;
        assert_eq!(model.yield_function(0.0, 0.0, pc), 0.0);
        assert_eq!(model.yield_function(pc, 0.0, pc), 0.0);
        approx_eq(model.yield_function(50.0, 60.0, pc), 0.0, 1e-12);
        assert!(model.yield_function(50.0, 59.0, pc) < 0.0);

        // points outside and inside, on both sides of the critical state line
        for (p, q) in [(80.0, 90.0), (10.0, 30.0), (120.0, 5.0), (40.0, 10.0), (-10.0, 0.0)] {
            let (p_y, q_y) = model.yield_point(p, q, pc);
            approx_eq(model.yield_function(p_y, q_y, pc), 0.0, 1e-10);
            // collinear with the center of the ellipse
            let cross = (p - pc / 2.0) * q_y - (p_y - pc / 2.0) * q;
            approx_eq(cross, 0.0, 1e-10);
        }

        // center
        let (p_y, q_y) = model.yield_point(50.0, 0.0, pc);
        assert_eq!(p_y, 50.0);
        approx_eq(q_y, 60.0, 1e-14);
    }

    #[test]
    fn flow_tensor_works() {
        let model = new_model(3, 1.2, None);
        let pc = 100.0;
        let mandel = Mandel::Symmetric;
        let sigma = new_tensor(mandel, &[-80.0, -50.0, -30.0, -10.0 * SQRT_2, 5.0 * SQRT_2, 2.0 * SQRT_2]);
        let mut nn = Tensor2::new(mandel);
        model.flow_tensor(&mut nn, &sigma, pc);

        // compare with central differences of f(σ)
        let f = |s: &Tensor2| model.yield_function(-s.invariant_sigma_m(), s.invariant_sigma_d(), pc);
        let h = 1e-5;
        for i in 0..sigma.dim() {
            let mut sp = sigma.clone();
            let mut sm = sigma.clone();
            sp.vector_mut()[i] += h;
            sm.vector_mut()[i] -= h;
            let num = (f(&sp) - f(&sm)) / (2.0 * h);
            approx_eq(nn.vector()[i], num, 1e-6);
        }
    }

    #[test]
    fn flow_increment_works() {
        let overstress = ParamOverstress {
            ref_rate: 1e-3,
            exponent: 2.0,
        };
        let model = new_model(3, 1.0, Some(overstress));
        let pc = 100.0;

        // inside or on the yield surface
        assert_eq!(model.flow_increment(50.0, 40.0, pc, 2.0), 0.0);
        assert_eq!(model.flow_increment(50.0, 50.0, pc, 2.0), 0.0);
        assert_eq!(model.deriv_flow_increment(50.0, 40.0, pc, 2.0), (0.0, 0.0, 0.0));

        // on the critical state line at twice the radius: d/(pc/2) = 1
        approx_eq(model.flow_increment(50.0, 100.0, pc, 2.0), 2e-3, 1e-15);

        // rate-independent model
        let ri = new_model(3, 1.0, None);
        assert_eq!(ri.flow_increment(50.0, 100.0, pc, 2.0), 0.0);

        // derivatives
        let dt = 2.0;
        let h = 1e-6;
        for (p, q) in [(50.0, 100.0), (120.0, 30.0), (20.0, 70.0)] {
            let (dp, dq, dpc) = model.deriv_flow_increment(p, q, pc, dt);
            let num_p = (model.flow_increment(p + h, q, pc, dt) - model.flow_increment(p - h, q, pc, dt)) / (2.0 * h);
            let num_q = (model.flow_increment(p, q + h, pc, dt) - model.flow_increment(p, q - h, pc, dt)) / (2.0 * h);
            let num_pc = (model.flow_increment(p, q, pc + h, dt) - model.flow_increment(p, q, pc - h, dt)) / (2.0 * h);
            approx_eq(dp, num_p, 1e-9);
            approx_eq(dq, num_q, 1e-9);
            approx_eq(dpc, num_pc, 1e-9);
        }
    }

    #[test]
    fn initialize_internal_values_works() {
        let model = new_model(2, 1.0, None);
        let state = isotropic_state(&model, Mandel::Symmetric2D, 60.0);
        assert_eq!(state.internal_values.as_data(), &[100.0, 0.0, 0.0]);
        assert!(state.yield_value < 0.0);

        // outside
        let mut state = LocalState::new(Mandel::Symmetric2D, 3, false);
        for i in 0..3 {
            state.stress.vector_mut()[i] = -150.0;
        }
        assert_eq!(
            model.initialize_internal_values(&mut state).err(),
            Some("stress is outside the yield surface")
        );
        let ideal = Idealization::new(2);
        let mut su = ParamStressUpdate::new();
        su.allow_initial_drift = true;
        let drift = CamClay::new(&ideal, &params(1.0, None), &su).unwrap();
        drift.initialize_internal_values(&mut state).unwrap();
        approx_eq(state.yield_value, 150.0 * 50.0, 1e-10);

        // from OCR
        let ideal = Idealization::new(3);
        let mut param = params(1.0, None);
        if let ParamStressStrain::CamClay { ocr, .. } = &mut param {
            *ocr = Some(2.0);
        }
        let model = CamClay::new(&ideal, &param, &ParamStressUpdate::new()).unwrap();
        let mut state = LocalState::new(Mandel::Symmetric, 3, false);
        state.stress.vector_mut()[0] = -40.0;
        state.stress.vector_mut()[1] = -40.0;
        state.stress.vector_mut()[2] = -70.0; // p = 50, q = 30
        model.initialize_internal_values(&mut state).unwrap();
        approx_eq(state.internal_values[0], 2.0 * (50.0 + 900.0 / 50.0), 1e-12);

        // OCR with tension
        let mut state = LocalState::new(Mandel::Symmetric, 3, false);
        assert_eq!(
            model.initialize_internal_values(&mut state).err(),
            Some("initial mean pressure must be > 0.0 to compute pc from the OCR")
        );
    }

    #[test]
    fn return_map_elastic_works() {
        let mut model = new_model(3, 1.2, None);
        let mandel = Mandel::Symmetric;
        let mut state = isotropic_state(&model, mandel, 60.0);
        let deps = new_tensor(mandel, &[-0.001, -0.001, -0.001, 0.0, 0.0, 0.0]);
        model.update_stress(&mut state, &deps, 1.0).unwrap();
        let kk = 1500.0 / (3.0 * (1.0 - 2.0 * 0.25));
        approx_eq(state.pressure(), 60.0 + kk * 0.003, 1e-12);
        approx_eq(state.deviatoric_stress(), 0.0, 1e-12);
        assert_eq!(state.elastic, true);
        assert_eq!(state.algo_lagrange, 0.0);
        assert_eq!(state.internal_values.as_data(), &[100.0, 0.0, 0.0]);
        approx_eq(state.strain.as_ref().unwrap().invariant_eps_v(), -0.003, 1e-15);
    }

    #[test]
    fn return_map_plastic_works() {
        let mut model = new_model(3, 1.2, None);
        let mandel = Mandel::Symmetric;
        let mut state = isotropic_state(&model, mandel, 60.0);
        let sigma_ini = state.stress.clone();
        let deps = new_tensor(mandel, &[0.012, 0.004, -0.05, 0.006 * SQRT_2, 0.0, 0.002 * SQRT_2]);
        model.update_stress(&mut state, &deps, 1.0).unwrap();

        // updated state
        let (p, q, pc) = (state.pressure(), state.deviatoric_stress(), state.internal_values[0]);
        approx_eq(p, 86.27176201358436, 1e-8);
        approx_eq(q, 54.45611796151921, 1e-8);
        approx_eq(pc, 110.14229941501473, 1e-8);
        approx_eq(state.algo_lagrange, 0.00012384753719897978, 1e-12);
        approx_eq(state.yield_value / (pc * pc), 0.0, 1e-10);
        assert_eq!(state.elastic, false);
        assert!(state.algo_iterations > 0);

        // hardening law: pc = pc_n exp(χ εv_p)
        let eps_v_p = state.internal_values[1];
        approx_eq(pc, 100.0 * f64::exp(2.0 / (0.2 - 0.04) * eps_v_p), 1e-10);

        // plastic strain: trace(εp) = -εv_p
        let eps_p = state.plastic_strain.as_ref().unwrap();
        approx_eq(eps_p.invariant_eps_v(), -eps_v_p, 1e-14);
        approx_eq(eps_p.invariant_eps_d(), state.internal_values[2], 1e-12);

        // elastic relation: σ - σ_ini = Dₑ : (Δε - Δεp)
        let mut deps_e = deps.clone();
        for i in 0..deps_e.dim() {
            deps_e.vector_mut()[i] -= eps_p.vector()[i];
        }
        let mut dsigma = Tensor2::new(mandel);
        t4_ddot_t2(&mut dsigma, 1.0, model.lin_elasticity.get_modulus(), &deps_e);
        for i in 0..dsigma.dim() {
            approx_eq(state.stress.vector()[i] - sigma_ini.vector()[i], dsigma.vector()[i], 1e-7);
        }
    }

    #[test]
    fn return_map_dry_side_softens() {
        let mut model = new_model(3, 1.2, None);
        let mandel = Mandel::Symmetric;
        let mut state = isotropic_state(&model, mandel, 20.0);
        let deps = new_tensor(mandel, &[0.1, 0.1, -0.2, 0.0, 0.0, 0.0]);
        model.update_stress(&mut state, &deps, 1.0).unwrap();
        approx_eq(state.pressure(), 37.079457710563844, 1e-8);
        approx_eq(state.deviatoric_stress(), 48.302576203068206, 1e-8);
        approx_eq(state.internal_values[0], 80.77576356124145, 1e-8);
        assert!(state.internal_values[1] < 0.0); // dilation
    }

    #[test]
    fn return_map_overstress_works() {
        let overstress = ParamOverstress {
            ref_rate: 0.5,
            exponent: 2.0,
        };
        let mut model = new_model(3, 1.2, Some(overstress));
        let mandel = Mandel::Symmetric;
        let mut state = isotropic_state(&model, mandel, 60.0);
        let deps = new_tensor(mandel, &[0.012, 0.004, -0.05, 0.006 * SQRT_2, 0.0, 0.002 * SQRT_2]);
        assert_eq!(
            model.update_stress(&mut state.clone(), &deps, 0.0).err(),
            Some("time increment must be > 0.0 for the rate-dependent model")
        );
        model.update_stress(&mut state, &deps, 1.0).unwrap();
        let (p, q, pc) = (state.pressure(), state.deviatoric_stress(), state.internal_values[0]);
        approx_eq(p, 88.45681824846754, 1e-8);
        approx_eq(q, 59.494499648830846, 1e-8);
        approx_eq(pc, 107.17467262355274, 1e-8);
        approx_eq(state.algo_lagrange, 7.948471619963561e-05, 1e-12);

        // the stress point stays outside the yield surface
        assert!(state.yield_value > 0.0);

        // equivalent plastic strain increment equals the overstress flow increment
        let lambda = state.algo_lagrange;
        let a = 2.0 * p - pc;
        let b = 2.0 * q / (1.2 * 1.2);
        let delta_gamma = lambda * f64::sqrt(a * a + b * b);
        approx_eq(delta_gamma, model.flow_increment(p, q, pc, 1.0), 1e-10);
    }

    fn assert_same_state(a: &LocalState, b: &LocalState) {
        assert_eq!(a.stress.vector().as_data(), b.stress.vector().as_data());
        assert_eq!(a.internal_values.as_data(), b.internal_values.as_data());
        assert_eq!(a.elastic, b.elastic);
        assert_eq!(a.algo_lagrange, b.algo_lagrange);
        assert_eq!(a.algo_iterations, b.algo_iterations);
        assert_eq!(a.yield_value, b.yield_value);
        let (ea, eb) = (a.strain.as_ref().unwrap(), b.strain.as_ref().unwrap());
        assert_eq!(ea.vector().as_data(), eb.vector().as_data());
        let (pa, pb) = (a.plastic_strain.as_ref().unwrap(), b.plastic_strain.as_ref().unwrap());
        assert_eq!(pa.vector().as_data(), pb.vector().as_data());
    }

    #[test]
    fn return_map_captures_non_convergence() {
        let ideal = Idealization::new(3);
        let mut su = ParamStressUpdate::new();
        su.rm_n_max_it = 1;
        let mut model = CamClay::new(&ideal, &params(1.2, None), &su).unwrap();
        let mandel = Mandel::Symmetric;
        let mut state = isotropic_state(&model, mandel, 60.0);
        let backup = state.clone();
        let deps = new_tensor(mandel, &[0.012, 0.004, -0.05, 0.006 * SQRT_2, 0.0, 0.002 * SQRT_2]);
        assert_eq!(
            model.update_stress(&mut state, &deps, 1.0).err(),
            Some("return-mapping did not converge")
        );
        assert_same_state(&state, &backup);

        let mut state = LocalState::new(mandel, 3, false);
        assert_eq!(
            model.update_stress(&mut state, &deps, 1.0).err(),
            Some("preconsolidation pressure must be > 0.0")
        );
    }

    #[test]
    fn return_map_tension_works() {
        let mut model = new_model(3, 1.2, None);
        let mandel = Mandel::Symmetric;

        // isotropic extension past the apex: p → 0 and K Λ pc = -p_trial
        let mut state = isotropic_state(&model, mandel, 60.0);
        let deps = new_tensor(mandel, &[0.05, 0.05, 0.05, 0.0, 0.0, 0.0]);
        model.update_stress(&mut state, &deps, 1.0).unwrap();
        let kk = 1000.0;
        let chi = 2.0 / (0.2 - 0.04);
        let lambda_pc = (kk * 0.15 - 60.0) / kk;
        let pc = 100.0 * f64::exp(-chi * lambda_pc);
        approx_eq(state.pressure(), 0.0, 1e-10);
        approx_eq(state.deviatoric_stress(), 0.0, 1e-12);
        approx_eq(state.internal_values[0], pc, 1e-8);
        approx_eq(state.algo_lagrange, lambda_pc / pc, 1e-12);
        assert_eq!(state.elastic, false);
        assert!(state.internal_values[1] < 0.0);

        // mixed tension and shear
        let mut state = isotropic_state(&model, mandel, 60.0);
        let deps = new_tensor(mandel, &[0.03, 0.02, 0.06, 0.01 * SQRT_2, 0.0, 0.0]);
        model.update_stress(&mut state, &deps, 1.0).unwrap();
        approx_eq(state.pressure(), 2.2823448684026686, 1e-8);
        approx_eq(state.deviatoric_stress(), 12.785490636154346, 1e-8);
        approx_eq(state.internal_values[0], 52.02065624229427, 1e-8);
        let pc = state.internal_values[0];
        approx_eq(state.yield_value / (pc * pc), 0.0, 1e-10);

        // rate-dependent model with mixed tension and shear
        let overstress = ParamOverstress {
            ref_rate: 0.5,
            exponent: 2.0,
        };
        let mut model_rd = new_model(3, 1.2, Some(overstress));
        let mut state = isotropic_state(&model_rd, mandel, 60.0);
        model_rd.update_stress(&mut state, &deps, 1.0).unwrap();
        approx_eq(state.pressure(), -5.586505085300709, 1e-8);
        approx_eq(state.deviatoric_stress(), 18.325767982787628, 1e-8);
        approx_eq(state.internal_values[0], 57.39754311611716, 1e-8);

        // extreme extension: pc collapses towards zero and the local iterations stop early
        let mut state = isotropic_state(&model, mandel, 60.0);
        let backup = state.clone();
        let deps = new_tensor(mandel, &[0.5, 0.5, 0.5, 0.0, 0.0, 0.0]);
        assert_eq!(
            model.update_stress(&mut state, &deps, 1.0).err(),
            Some("return-mapping did not converge")
        );
        assert_same_state(&state, &backup);
    }

    #[test]
    fn return_map_verbose_works() {
        let ideal = Idealization::new(3);
        let mut su = ParamStressUpdate::new();
        su.verbose = true;
        let mut model = CamClay::new(&ideal, &params(1.2, None), &su).unwrap();
        let mandel = Mandel::Symmetric;
        let mut state = isotropic_state(&model, mandel, 60.0);
        let deps = new_tensor(mandel, &[0.012, 0.004, -0.05, 0.006 * SQRT_2, 0.0, 0.002 * SQRT_2]);
        model.update_stress(&mut state, &deps, 1.0).unwrap();
        approx_eq(state.pressure(), 86.27176201358436, 1e-8);
        assert!(state.algo_iterations > 0);
    }

    #[test]
    fn incompatible_dimensions_are_captured() {
        let mut model = new_model(2, 1.2, None);
        let mut state = LocalState::new(Mandel::Symmetric, 3, false);
        state.internal_values[0] = 100.0;
        let deps = Tensor2::new(Mandel::Symmetric);
        assert_eq!(
            model.update_stress(&mut state, &deps, 1.0).err(),
            Some("local state and model have incompatible dimensions")
        );
        let mut dd = Tensor4::new(Mandel::Symmetric);
        assert_eq!(
            model.stiffness(&mut dd, &state).err(),
            Some("local state and model have incompatible dimensions")
        );
        assert_eq!(
            model.initialize_internal_values(&mut state).err(),
            Some("local state and model have incompatible dimensions")
        );
        let mut state = LocalState::new(Mandel::Symmetric2D, 0, false);
        assert_eq!(
            model.initialize_internal_values(&mut state).err(),
            Some("local state has an incorrect number of internal values")
        );
    }

    fn check_tangent(ndim: usize, overstress: Option<ParamOverstress>, values: &[f64]) {
        let ideal = Idealization::new(ndim);
        let mandel = ideal.mandel();
        let mut su = ParamStressUpdate::new();
        su.rm_tolerance = 1e-13;
        let mut model = CamClay::new(&ideal, &params(1.2, overstress), &su).unwrap();
        let state_ini = isotropic_state(&model, mandel, 60.0);
        let deps = new_tensor(mandel, values);

        // analytical tangent
        let mut state = state_ini.clone();
        model.update_stress(&mut state, &deps, 1.0).unwrap();
        assert_eq!(state.elastic, false);
        let mut dd = Tensor4::new(mandel);
        model.stiffness(&mut dd, &state).unwrap();

        // numerical tangent
        let h = 1e-6;
        let nd = deps.dim();
        for j in 0..nd {
            let mut deps_p = deps.clone();
            let mut deps_m = deps.clone();
            deps_p.vector_mut()[j] += h;
            deps_m.vector_mut()[j] -= h;
            let mut state_p = state_ini.clone();
            let mut state_m = state_ini.clone();
            model.update_stress(&mut state_p, &deps_p, 1.0).unwrap();
            model.update_stress(&mut state_m, &deps_m, 1.0).unwrap();
            for i in 0..nd {
                let num = (state_p.stress.vector()[i] - state_m.stress.vector()[i]) / (2.0 * h);
                approx_eq(dd.matrix().get(i, j), num, 1e-4);
            }
        }
    }

    #[test]
    fn consistent_tangent_works() {
        let values_3d = &[0.012, 0.004, -0.05, 0.006 * SQRT_2, 0.0, 0.002 * SQRT_2];
        let values_2d = &[0.01, -0.04, 0.0, 0.004 * SQRT_2];
        check_tangent(3, None, values_3d);
        check_tangent(2, None, values_2d);
        for exponent in [1.0, 2.0] {
            let overstress = ParamOverstress {
                ref_rate: 0.5,
                exponent,
            };
            check_tangent(3, Some(overstress), values_3d);
            check_tangent(2, Some(overstress), values_2d);
        }
    }

    #[test]
    fn consistent_tangent_elastic_works() {
        let mut model = new_model(3, 1.2, None);
        let state = isotropic_state(&model, Mandel::Symmetric, 60.0);
        let mut dd = Tensor4::new(Mandel::Symmetric);
        model.stiffness(&mut dd, &state).unwrap();
        approx_eq(dd.matrix().get(0, 0), 1800.0, 1e-12);
        approx_eq(dd.matrix().get(0, 1), 600.0, 1e-12);
        approx_eq(dd.matrix().get(5, 5), 1200.0, 1e-12);
    }
}
