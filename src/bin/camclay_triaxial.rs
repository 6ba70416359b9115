use camclay::material::{draw_triaxial_batch, draw_triaxial_standard, normalize_stress, write_triaxial_csv};
use camclay::prelude::*;
use camclay::util::{DigitisedCsv, TriaxialReferenceSet};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use structopt::StructOpt;

/// Command line options
#[derive(StructOpt, Debug)]
#[structopt(
    name = "camclay_triaxial",
    about = "Runs strain-controlled triaxial tests on a single material point"
)]
struct Options {
    /// JSON file with the "solid" parameters and the "test" data
    input: String,

    /// Directory for the output files [default: /tmp/camclay/results]
    #[structopt(short, long)]
    out_dir: Option<String>,

    /// Generates SVG figures with the results
    #[structopt(short, long)]
    figure: bool,
}

/// Holds the input data
#[derive(Deserialize)]
struct Input {
    solid: ParamSolid,
    test: TriaxialTest,

    /// Runs one test per confining pressure (replacing the p_ini of the test)
    #[serde(default)]
    confining_pressures: Vec<f64>,

    /// JSON file with reference curves
    #[serde(default)]
    reference: Option<String>,

    /// CSV files with digitised reference curves
    #[serde(default)]
    digitised: Vec<DigitisedCsv>,

    /// Divides the stresses of the comparison figure by this value
    #[serde(default)]
    normalisation_stress: Option<f64>,
}

fn main() -> Result<(), StrError> {
    // parse options
    let options = Options::from_args();
    let out_dir = options.out_dir.as_deref().unwrap_or(DEFAULT_OUT_DIR);

    // load data
    let contents = fs::read_to_string(&options.input).map_err(|_| "cannot open input file")?;
    let input: Input = serde_json::from_str(&contents).map_err(|_| "cannot parse input file")?;
    let fn_stem = Path::new(&options.input)
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or("cannot extract the file stem of the input file")?;

    // reference curves
    let mut references = match &input.reference {
        Some(path) => TriaxialReferenceSet::read_json(path)?,
        None => TriaxialReferenceSet { all: Vec::new() },
    };
    references
        .all
        .extend(TriaxialReferenceSet::from_digitised(&input.digitised)?.all);

    // run tests
    let batch_mode = !input.confining_pressures.is_empty();
    let pressures = if batch_mode {
        input.confining_pressures.clone()
    } else {
        vec![input.test.p_ini]
    };
    let batch = input.test.run_batch(&input.solid, &pressures)?;

    // write results
    let mut paths = Vec::new();
    for (i, points) in batch.iter().enumerate() {
        let path_csv = if batch_mode {
            format!("{}/{}_{}.csv", out_dir, fn_stem, i + 1)
        } else {
            format!("{}/{}.csv", out_dir, fn_stem)
        };
        write_triaxial_csv(points, &path_csv)?;
        paths.push(path_csv);
    }

    // figures
    if options.figure {
        if !batch_mode {
            let mm = match input.solid.stress_strain {
                ParamStressStrain::CamClay { mm, .. } => mm,
                _ => 1.0,
            };
            let path_svg = format!("{}/{}.svg", out_dir, fn_stem);
            let mut plotter = TriaxialPlotter::new();
            draw_triaxial_standard(&mut plotter, &batch[0], mm, fn_stem);
            plotter.save_standard(&path_svg)?;
            paths.push(path_svg);
        }
        if batch_mode || !references.all.is_empty() {
            let (batch, references, pressures) = match input.normalisation_stress {
                Some(stress) => (
                    batch
                        .iter()
                        .map(|points| normalize_stress(points, stress))
                        .collect::<Result<Vec<_>, _>>()?,
                    references.normalized(stress)?,
                    pressures.iter().map(|p| p / stress).collect(),
                ),
                None => (batch.clone(), references, pressures.clone()),
            };
            let path_svg = format!("{}/{}_comparison.svg", out_dir, fn_stem);
            let mut plotter = TriaxialPlotter::new();
            draw_triaxial_batch(&mut plotter, &batch, &pressures, &references.all)?;
            plotter.save_comparison(&path_svg)?;
            paths.push(path_svg);
        }
    }

    // message
    let width = paths.iter().fold(0, |acc, p| usize::max(acc, p.len()));
    let thin_line = format!("{:─^1$}", "", width);
    println!("\n\n{}", thin_line);
    println!(
        "{} {} finished with:",
        if input.test.drained { "drained" } else { "undrained" },
        if batch_mode { "tests" } else { "test" }
    );
    for (points, sigma_c) in batch.iter().zip(&pressures) {
        let last = points.last().ok_or("there are no results")?;
        if batch_mode {
            println!("σc = {:?}", sigma_c);
        }
        println!("εa = {:?}", last.axial_strain);
        println!("εv = {:?}", last.volumetric_strain);
        println!("p  = {:?}", last.p);
        println!("q  = {:?}", last.q);
        println!("pc = {:?}", last.pc);
    }
    println!("results saved in:");
    for path in &paths {
        println!("{}", path);
    }
    println!("{}\n\n", thin_line);
    Ok(())
}
