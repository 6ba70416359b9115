use crate::StrError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Holds the stress-strain curve of a laboratory triaxial test
///
/// The axial strain is compression-positive (not in percent) and the
/// differential stress is σ1 - σ3.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriaxialReference {
    /// Name of the experiment (e.g., CD1)
    pub label: String,

    /// Confining pressure σ3 of the experiment
    pub confining_pressure: f64,

    /// Compression-positive axial strain
    pub axial_strain: Vec<f64>,

    /// Differential stress σ1 - σ3
    pub differential_stress: Vec<f64>,
}

/// Holds reference curves for comparisons
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriaxialReferenceSet {
    pub all: Vec<TriaxialReference>,
}

/// Describes a CSV file with a digitised stress-strain curve
///
/// Each data line has the axial strain in the first column and the
/// differential stress in the second column. The first `n_header` lines
/// hold metadata and are skipped.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DigitisedCsv {
    /// Name of the experiment
    pub label: String,

    /// Confining pressure σ3 of the experiment
    pub confining_pressure: f64,

    /// Path to the CSV file
    pub path: String,

    /// Number of metadata lines at the top of the file
    #[serde(default)]
    pub n_header: usize,

    /// Indicates that the axial strain is given in percent
    #[serde(default)]
    pub strain_in_percent: bool,
}

impl DigitisedCsv {
    /// Reads the CSV file
    ///
    /// The points are sorted by axial strain.
    pub fn read(&self) -> Result<TriaxialReference, StrError> {
        let file = File::open(&self.path).map_err(|_| "file not found")?;
        let reader = BufReader::new(file);
        let scale = if self.strain_in_percent { 0.01 } else { 1.0 };
        let mut pairs = Vec::new();
        for line in reader.lines().skip(self.n_header) {
            let line = line.map_err(|_| "cannot read line")?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut columns = trimmed.split(',').map(|s| s.trim());
            let (x, y) = match (columns.next(), columns.next()) {
                (Some(x), Some(y)) => (x, y),
                _ => return Err("digitised line must have two columns"),
            };
            let x: f64 = x.parse().map_err(|_| "cannot parse digitised strain")?;
            let y: f64 = y.parse().map_err(|_| "cannot parse digitised stress")?;
            pairs.push((scale * x, y));
        }
        if pairs.is_empty() {
            return Err("digitised file has no data");
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(TriaxialReference {
            label: self.label.clone(),
            confining_pressure: self.confining_pressure,
            axial_strain: pairs.iter().map(|p| p.0).collect(),
            differential_stress: pairs.iter().map(|p| p.1).collect(),
        })
    }
}

impl TriaxialReference {
    /// Returns a copy with the stresses divided by `stress`
    pub fn normalized(&self, stress: f64) -> Result<Self, StrError> {
        if stress <= 0.0 {
            return Err("normalisation stress must be > 0.0");
        }
        Ok(TriaxialReference {
            label: self.label.clone(),
            confining_pressure: self.confining_pressure / stress,
            axial_strain: self.axial_strain.clone(),
            differential_stress: self.differential_stress.iter().map(|s| s / stress).collect(),
        })
    }
}

impl TriaxialReferenceSet {
    /// Reads the digitised CSV files
    pub fn from_digitised(files: &[DigitisedCsv]) -> Result<Self, StrError> {
        let all = files.iter().map(|f| f.read()).collect::<Result<Vec<_>, _>>()?;
        Ok(TriaxialReferenceSet { all })
    }

    /// Reads a JSON file containing the reference curves
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let file = File::open(&path).map_err(|_| "file not found")?;
        let reader = BufReader::new(file);
        let data: Self = serde_json::from_reader(reader).map_err(|_| "deserialize failed")?;
        for reference in &data.all {
            if reference.axial_strain.len() != reference.differential_stress.len() {
                return Err("reference curve has inconsistent number of points");
            }
        }
        Ok(data)
    }

    /// Writes a JSON file with the reference curves
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        if let Some(p) = path.parent() {
            fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
        }
        let mut file = File::create(&path).map_err(|_| "cannot create file")?;
        serde_json::to_writer_pretty(&mut file, &self).map_err(|_| "cannot write file")?;
        Ok(())
    }

    /// Returns a copy with the stresses of all curves divided by `stress`
    pub fn normalized(&self, stress: f64) -> Result<Self, StrError> {
        let all = self.all.iter().map(|r| r.normalized(stress)).collect::<Result<Vec<_>, _>>()?;
        Ok(TriaxialReferenceSet { all })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
