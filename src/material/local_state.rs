use russell_lab::Vector;
use russell_tensor::{Mandel, Tensor2};
use serde::{Deserialize, Serialize};

/// Holds local state data for FEM simulations of solid materials
///
/// This data is associated with a Gauss (integration) point
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalState {
    /// Holds the internal values Z
    pub internal_values: Vector,

    /// Holds the stress tensor σ
    pub stress: Tensor2,

    /// Holds the elastic (vs elastoplastic) flag
    pub elastic: bool,

    /// Holds the algorithmic lagrange multiplier (Λ) for implicit methods
    pub algo_lagrange: f64,

    /// Holds the number of local iterations of the last stress update
    pub algo_iterations: usize,

    /// Holds the yield function value at the updated state (plasticity models only)
    pub yield_value: f64,

    /// Holds the (optional) strain tensor ε
    pub strain: Option<Tensor2>,

    /// Holds the (optional) plastic strain tensor εp
    pub plastic_strain: Option<Tensor2>,
}

impl LocalState {
    /// Allocates a new instance
    ///
    /// # Input
    ///
    /// * `mandel` -- the Mandel representation of the stress and strain tensors
    /// * `n_internal_values` -- the number of internal values of the model
    /// * `with_strains` -- allocates the (optional) strain and plastic strain tensors
    pub fn new(mandel: Mandel, n_internal_values: usize, with_strains: bool) -> Self {
        let (strain, plastic_strain) = if with_strains {
            (Some(Tensor2::new(mandel)), Some(Tensor2::new(mandel)))
        } else {
            (None, None)
        };
        LocalState {
            internal_values: Vector::new(n_internal_values),
            stress: Tensor2::new(mandel),
            elastic: true,
            algo_lagrange: 0.0,
            algo_iterations: 0,
            yield_value: 0.0,
            strain,
            plastic_strain,
        }
    }

    /// Copies the data from another state (e.g., to restore a backup)
    ///
    /// # Panics
    ///
    /// A panic will occur if the states have incompatible dimensions.
    pub fn mirror(&mut self, other: &LocalState) {
        assert_eq!(self.stress.mandel(), other.stress.mandel());
        assert_eq!(self.internal_values.dim(), other.internal_values.dim());
        self.internal_values.set_vector(other.internal_values.as_data());
        self.stress.set_tensor(1.0, &other.stress);
        self.elastic = other.elastic;
        self.algo_lagrange = other.algo_lagrange;
        self.algo_iterations = other.algo_iterations;
        self.yield_value = other.yield_value;
        if let (Some(a), Some(b)) = (self.strain.as_mut(), other.strain.as_ref()) {
            a.set_tensor(1.0, b);
        }
        if let (Some(a), Some(b)) = (self.plastic_strain.as_mut(), other.plastic_strain.as_ref()) {
            a.set_tensor(1.0, b);
        }
    }

    /// Updates the strain tensor given Δε (if enabled)
    ///
    /// ```text
    /// ε += α Δε
    /// ```
    ///
    /// # Panics
    ///
    /// A panic will occur if the tensors have different [Mandel].
    pub fn update_strain(&mut self, alpha: f64, delta_strain: &Tensor2) {
        if let Some(strain) = self.strain.as_mut() {
            assert_eq!(delta_strain.mandel(), strain.mandel());
            let eps = strain.vector_mut();
            for i in 0..eps.dim() {
                eps[i] += alpha * delta_strain.vector()[i];
            }
        }
    }

    /// Returns the compression-positive mean pressure p = -σm
    pub fn pressure(&self) -> f64 {
        -self.stress.invariant_sigma_m()
    }

    /// Returns the deviatoric stress invariant q = σd
    pub fn deviatoric_stress(&self) -> f64 {
        self.stress.invariant_sigma_d()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
