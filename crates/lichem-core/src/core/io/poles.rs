use crate::core::io::traits::RecordFile;
use crate::core::models::multipole::{CartesianMoments, CartesianMultipole, LocalFrame, Octupole};
use crate::core::units::{BUCKINGHAM_TO_AU, DEBYE_ANGSTROM2_TO_AU, DEBYE_TO_AU};
use nalgebra::{Matrix3, Vector3};
use serde::Deserialize;
use std::fmt;
use std::io::{self, BufRead};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoleTableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Row {row}: expected atom index {expected}, found {found}")]
    OutOfOrder {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Row {row}: atom {atom} names itself as a frame reference")]
    SelfReference { row: usize, atom: usize },
    #[error("Row {row}: atom {atom} has a non-finite multipole component")]
    NonFinite { row: usize, atom: usize },
}

/// Units of the dipole, quadrupole and octupole columns of a pole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PoleUnits {
    /// e·a0, e·a0², e·a0³.
    #[default]
    Atomic,
    /// Debye, Buckingham (D·Å), D·Å².
    Debye,
}

impl PoleUnits {
    fn scales(&self) -> (f64, f64, f64) {
        match self {
            PoleUnits::Atomic => (1.0, 1.0, 1.0),
            PoleUnits::Debye => (DEBYE_TO_AU, BUCKINGHAM_TO_AU, DEBYE_ANGSTROM2_TO_AU),
        }
    }
}

impl FromStr for PoleUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atomic" | "au" | "a.u." => Ok(PoleUnits::Atomic),
            "debye" => Ok(PoleUnits::Debye),
            other => Err(format!(
                "Unknown pole units '{}'. Expected 'atomic' or 'debye'.",
                other
            )),
        }
    }
}

impl fmt::Display for PoleUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PoleUnits::Atomic => "atomic",
            PoleUnits::Debye => "debye",
        })
    }
}

#[derive(Debug, Deserialize)]
struct PoleRow {
    atom: usize,
    z_atom: Option<usize>,
    x_atom: Option<usize>,
    chiral_atom: Option<usize>,
    charge: f64,
    #[serde(default)]
    dx: f64,
    #[serde(default)]
    dy: f64,
    #[serde(default)]
    dz: f64,
    #[serde(default)]
    qxx: f64,
    #[serde(default)]
    qxy: f64,
    #[serde(default)]
    qxz: f64,
    #[serde(default)]
    qyy: f64,
    #[serde(default)]
    qyz: f64,
    #[serde(default)]
    qzz: f64,
    #[serde(default)]
    oxxx: f64,
    #[serde(default)]
    oxxy: f64,
    #[serde(default)]
    oxxz: f64,
    #[serde(default)]
    oxyy: f64,
    #[serde(default)]
    oxyz: f64,
    #[serde(default)]
    oxzz: f64,
    #[serde(default)]
    oyyy: f64,
    #[serde(default)]
    oyyz: f64,
    #[serde(default)]
    oyzz: f64,
    #[serde(default)]
    ozzz: f64,
}

impl PoleRow {
    fn into_multipole(self, units: PoleUnits) -> CartesianMultipole {
        let (d, q, o) = units.scales();
        let moments = CartesianMoments {
            charge: self.charge,
            dipole: Vector3::new(self.dx, self.dy, self.dz) * d,
            quadrupole: Matrix3::new(
                self.qxx, self.qxy, self.qxz, self.qxy, self.qyy, self.qyz, self.qxz, self.qyz,
                self.qzz,
            ) * q,
            octupole: Octupole::from_components(
                [
                    self.oxxx, self.oxxy, self.oxxz, self.oxyy, self.oxyz, self.oxzz, self.oyyy,
                    self.oyyz, self.oyzz, self.ozzz,
                ]
                .map(|v| v * o),
            ),
        };
        let frame = LocalFrame {
            z_atom: self.z_atom,
            x_atom: self.x_atom,
            chiral_atom: self.chiral_atom,
        };
        CartesianMultipole::new(moments, frame)
    }
}

/// Reader for local-frame multipole tables, one CSV row per atom in atom order.
///
/// Columns: `atom, z_atom, x_atom, chiral_atom, charge`, then the dipole `dx, dy, dz`, the six
/// unique primitive quadrupole components and the ten unique octupole components. Frame
/// columns may be empty; missing moment columns default to zero. Lines starting with `#` are
/// ignored. Moments are converted to atomic units on ingestion.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoleTable {
    pub units: PoleUnits,
}

impl PoleTable {
    pub fn new(units: PoleUnits) -> Self {
        Self { units }
    }
}

impl RecordFile for PoleTable {
    type Record = CartesianMultipole;
    type Error = PoleTableError;

    fn read_from(
        &self,
        reader: &mut impl BufRead,
    ) -> Result<Vec<CartesianMultipole>, PoleTableError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut poles = Vec::new();
        for (expected, result) in csv_reader.deserialize::<PoleRow>().enumerate() {
            let row = result?;
            let row_num = expected + 1;
            if row.atom != expected {
                return Err(PoleTableError::OutOfOrder {
                    row: row_num,
                    expected,
                    found: row.atom,
                });
            }
            if [row.z_atom, row.x_atom, row.chiral_atom].contains(&Some(row.atom)) {
                return Err(PoleTableError::SelfReference {
                    row: row_num,
                    atom: row.atom,
                });
            }
            let atom = row.atom;
            let multipole = row.into_multipole(self.units);
            if !multipole.moments.is_finite() {
                return Err(PoleTableError::NonFinite { row: row_num, atom });
            }
            poles.push(multipole);
        }
        Ok(poles)
    }
}
