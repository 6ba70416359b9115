use super::TriaxialPoint;
use crate::util::TriaxialReference;
use crate::StrError;
use plotpy::{Curve, Legend, Plot};
use std::collections::HashMap;
use std::ffi::OsStr;

/// Defines the quantity of a triaxial test to be plot along the x or y axis
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TriaxialAxis {
    /// Axial strain (percent)
    EpsA(/*percent*/ bool),

    /// Volumetric strain (percent)
    EpsV(/*percent*/ bool),

    /// Mean pressure p
    P,

    /// Deviatoric stress q
    Q,

    /// Differential stress σ1 - σ3
    DiffStress,

    /// Stress ratio q/p
    Eta,

    /// Preconsolidation pressure
    Pc,
}

impl TriaxialAxis {
    /// Calculates the values for the axis
    pub(crate) fn calc(&self, points: &[TriaxialPoint]) -> Vec<f64> {
        match self {
            Self::EpsA(percent) => {
                let m = if *percent { 100.0 } else { 1.0 };
                points.iter().map(|r| m * r.axial_strain).collect()
            }
            Self::EpsV(percent) => {
                let m = if *percent { 100.0 } else { 1.0 };
                points.iter().map(|r| m * r.volumetric_strain).collect()
            }
            Self::P => points.iter().map(|r| r.p).collect(),
            Self::Q => points.iter().map(|r| r.q).collect(),
            Self::DiffStress => points.iter().map(|r| r.differential_stress).collect(),
            Self::Eta => points.iter().map(|r| r.q / r.p).collect(),
            Self::Pc => points.iter().map(|r| r.pc).collect(),
        }
    }

    /// Generates labels for the axis
    pub(crate) fn label(&self) -> String {
        let percent = |p: &bool| if *p { "\\;[\\%]" } else { "" };
        match self {
            Self::EpsA(p) => format!("$\\varepsilon_a{}$", percent(p)),
            Self::EpsV(p) => format!("$\\varepsilon_v{}$", percent(p)),
            Self::P => "$p$".to_string(),
            Self::Q => "$q$".to_string(),
            Self::DiffStress => "$\\sigma_1-\\sigma_3$".to_string(),
            Self::Eta => "$q/p$".to_string(),
            Self::Pc => "$p_c$".to_string(),
        }
    }
}

/// Holds the colors of the curves in a batch of tests
const COLORS: [&str; 6] = ["#e41a1c", "#377eb8", "#4daf4a", "#17becf", "#984ea3", "#bcbd22"];

/// Plots the results of triaxial tests
pub struct TriaxialPlotter {
    /// Holds all curves
    curves: HashMap<(TriaxialAxis, TriaxialAxis), Vec<Curve>>,
}

impl TriaxialPlotter {
    /// Allocates a new instance
    pub fn new() -> Self {
        TriaxialPlotter { curves: HashMap::new() }
    }

    /// Draws a curve with the results of a triaxial test
    ///
    /// # Input
    ///
    /// * `x_axis` -- the quantity along x
    /// * `y_axis` -- the quantity along y
    /// * `points` -- the results of the test
    /// * `config` -- a function `|curve| {}` to configure the curve
    pub fn draw<F>(&mut self, x_axis: TriaxialAxis, y_axis: TriaxialAxis, points: &[TriaxialPoint], mut config: F)
    where
        F: FnMut(&mut Curve),
    {
        let x = x_axis.calc(points);
        let y = y_axis.calc(points);
        let mut curve = Curve::new();
        config(&mut curve);
        curve.draw(&x, &y);
        self.add(x_axis, y_axis, curve);
    }

    /// Draws a reference (e.g., experimental) curve in the (εa, σ1 - σ3) space
    ///
    /// The reference is drawn with markers and no line.
    ///
    /// # Input
    ///
    /// * `percent` -- plots the axial strain in percent
    /// * `reference` -- the reference curve
    /// * `config` -- a function `|curve| {}` to configure the curve
    pub fn draw_reference<F>(&mut self, percent: bool, reference: &TriaxialReference, mut config: F)
    where
        F: FnMut(&mut Curve),
    {
        let m = if percent { 100.0 } else { 1.0 };
        let x: Vec<_> = reference.axial_strain.iter().map(|e| m * e).collect();
        let mut curve = Curve::new();
        curve
            .set_label(&reference.label)
            .set_line_style("None")
            .set_marker_style("o")
            .set_marker_void(true);
        config(&mut curve);
        curve.draw(&x, &reference.differential_stress);
        self.add(TriaxialAxis::EpsA(percent), TriaxialAxis::DiffStress, curve);
    }

    /// Draws the critical state line q = M p in the (p, q) space
    pub fn draw_critical_state_line<F>(&mut self, mm: f64, p_max: f64, mut config: F)
    where
        F: FnMut(&mut Curve),
    {
        let mut curve = Curve::new();
        curve.set_line_color("black").set_line_style("--");
        config(&mut curve);
        curve.draw(&vec![0.0, p_max], &vec![0.0, mm * p_max]);
        self.add(TriaxialAxis::P, TriaxialAxis::Q, curve);
    }

    /// Draws the upper half of the yield surface q²/M² + p (p - pc) = 0 in the (p, q) space
    pub fn draw_yield_surface<F>(&mut self, mm: f64, pc: f64, mut config: F)
    where
        F: FnMut(&mut Curve),
    {
        let np = 101;
        let center = pc / 2.0;
        let mut x = vec![0.0; np];
        let mut y = vec![0.0; np];
        for i in 0..np {
            let alpha = std::f64::consts::PI * (i as f64) / ((np - 1) as f64);
            x[i] = center + center * f64::cos(alpha);
            y[i] = mm * center * f64::sin(alpha);
        }
        let mut curve = Curve::new();
        curve.set_line_color("#8a8a8a");
        config(&mut curve);
        curve.draw(&x, &y);
        self.add(TriaxialAxis::P, TriaxialAxis::Q, curve);
    }

    /// Saves a grid of triaxial curves
    ///
    /// **Note:** Call this function after [TriaxialPlotter::draw()].
    ///
    /// # Input
    ///
    /// * `axes` -- the keys of the (x-axis,y-axis) already drawn with `draw`
    /// * `filepath` -- may be a String, &str, or Path
    pub fn save_grid<P>(&self, axes: &[Vec<(TriaxialAxis, TriaxialAxis)>], filepath: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let nrow = axes.len();
        if nrow < 1 {
            return Err("there are no rows in the axes array");
        }
        let ncol = axes[0].len();
        if ncol < 1 {
            return Err("there are no columns in the axes array");
        }
        let handle = "grid";
        let mut plot = Plot::new();
        plot.set_gridspec(handle, nrow, ncol, "wspace=0.38,hspace=0.35");
        for row in 0..nrow {
            if axes[row].len() != ncol {
                return Err("the number of columns is inconsistent");
            }
            for col in 0..ncol {
                let (x_axis, y_axis) = axes[row][col];
                plot.set_subplot_grid(handle, format!("{}", row).as_str(), format!("{}", col).as_str());
                match self.curves.get(&(x_axis, y_axis)) {
                    Some(all) => {
                        for curve in all {
                            plot.add(curve);
                        }
                        plot.grid_and_labels(&x_axis.label(), &y_axis.label());
                    }
                    None => return Err("(x_axis, y_axis) curve is not available"),
                }
            }
        }
        plot.set_figure_size_points(300.0 * ncol as f64, 250.0 * nrow as f64)
            .save(filepath)
    }

    /// Saves the standard 2x2 grid: q-εa, εv-εa, q-p and q/p-εa
    pub fn save_standard<P>(&self, filepath: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        use TriaxialAxis::*;
        let axes = vec![
            vec![(EpsA(true), Q), (EpsA(true), EpsV(true))],
            vec![(P, Q), (EpsA(true), Eta)],
        ];
        self.save_grid(&axes, filepath)
    }

    /// Saves the (εa, σ1 - σ3) curves of a batch of tests with a legend
    ///
    /// **Note:** Call this function after [draw_triaxial_batch()].
    pub fn save_comparison<P>(&self, filepath: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let x_axis = TriaxialAxis::EpsA(true);
        let y_axis = TriaxialAxis::DiffStress;
        let all = self
            .curves
            .get(&(x_axis, y_axis))
            .ok_or("(x_axis, y_axis) curve is not available")?;
        let mut plot = Plot::new();
        for curve in all {
            plot.add(curve);
        }
        let mut legend = Legend::new();
        legend.set_num_col(2).set_outside(true).draw();
        plot.add(&legend)
            .grid_and_labels(&x_axis.label(), &y_axis.label())
            .set_figure_size_points(450.0, 300.0)
            .save(filepath)
    }

    /// Appends a curve to the list associated with (x_axis, y_axis)
    fn add(&mut self, x_axis: TriaxialAxis, y_axis: TriaxialAxis, curve: Curve) {
        self.curves.entry((x_axis, y_axis)).or_insert_with(Vec::new).push(curve);
    }
}

/// Draws all curves of the standard grid for one triaxial test
///
/// The yield surfaces at the beginning and at the end of the test are also drawn.
pub fn draw_triaxial_standard(plotter: &mut TriaxialPlotter, points: &[TriaxialPoint], mm: f64, label: &str) {
    use TriaxialAxis::*;
    plotter.draw(EpsA(true), Q, points, |c| {
        c.set_label(label);
    });
    plotter.draw(EpsA(true), EpsV(true), points, |c| {
        c.set_label(label);
    });
    plotter.draw(P, Q, points, |c| {
        c.set_label(label).set_marker_style(".");
    });
    plotter.draw(EpsA(true), Eta, points, |c| {
        c.set_label(label);
    });
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        if first.pc.is_finite() && last.pc.is_finite() {
            plotter.draw_yield_surface(mm, first.pc, |_| {});
            plotter.draw_yield_surface(mm, last.pc, |c| {
                c.set_line_style(":");
            });
            let p_max = points.iter().fold(last.pc, |acc, r| f64::max(acc, r.p));
            plotter.draw_critical_state_line(mm, p_max, |_| {});
        }
    }
}

/// Draws the (εa, σ1 - σ3) curves of a batch of tests and the reference curves
///
/// The i-th simulation and the i-th reference share the same color.
///
/// # Input
///
/// * `plotter` -- the plotter
/// * `batch` -- the results of each test
/// * `confining_pressures` -- the confining pressure of each test (for the labels)
/// * `references` -- the reference curves (may be empty)
pub fn draw_triaxial_batch(
    plotter: &mut TriaxialPlotter,
    batch: &[Vec<TriaxialPoint>],
    confining_pressures: &[f64],
    references: &[TriaxialReference],
) -> Result<(), StrError> {
    if batch.len() != confining_pressures.len() {
        return Err("the number of confining pressures must equal the number of tests");
    }
    for (i, (points, sigma_c)) in batch.iter().zip(confining_pressures).enumerate() {
        let color = COLORS[i % COLORS.len()];
        let label = format!("$\\sigma_3={}$", sigma_c);
        plotter.draw(TriaxialAxis::EpsA(true), TriaxialAxis::DiffStress, points, |c| {
            c.set_label(&label).set_line_color(color);
        });
    }
    for (i, reference) in references.iter().enumerate() {
        let color = COLORS[i % COLORS.len()];
        plotter.draw_reference(true, reference, |c| {
            c.set_marker_color(color).set_marker_line_color(color);
        });
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
