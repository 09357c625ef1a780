use nalgebra::Point3;
use std::str::FromStr;

/// The simulation region an atom is assigned to.
///
/// Regions decide how an atom is treated by the external engines: QM atoms are part of the
/// wavefunction calculation, MM and boundary atoms contribute to the electrostatic embedding
/// field, and pseudo-bond atoms cap the QM region across covalent QM/MM boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Region {
    /// Treated quantum mechanically.
    Qm,
    /// Treated with the classical force field.
    #[default]
    Mm,
    /// Pseudo-bond atom on the QM side of a cut covalent bond.
    PseudoBond,
    /// Boundary atom on the MM side of a cut covalent bond.
    Boundary,
}

impl Region {
    /// Whether this atom's multipole is handed to the QM engine as embedding charges.
    pub fn embeds(&self) -> bool {
        matches!(self, Region::Mm | Region::Boundary)
    }
}

impl FromStr for Region {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "qm" => Ok(Region::Qm),
            "mm" => Ok(Region::Mm),
            "pb" | "pseudo-bond" | "pseudobond" | "pseudo_bond" => Ok(Region::PseudoBond),
            "ba" | "boundary" => Ok(Region::Boundary),
            _ => Err(()),
        }
    }
}

/// An atom of a QM/MM system with one position per replica (bead).
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Element symbol or QM atom type from the structure file (e.g., "C", "O").
    pub element: String,
    /// The region this atom is assigned to.
    pub region: Region,
    /// Frozen atoms keep the same coordinates on every bead.
    pub frozen: bool,
    /// Global-frame coordinates in Ångström, one per replica.
    pub positions: Vec<Point3<f64>>,
}

impl Atom {
    /// Creates an MM atom with a single replica at `position`.
    pub fn new(element: &str, position: Point3<f64>) -> Self {
        Self {
            element: element.to_string(),
            region: Region::default(),
            frozen: false,
            positions: vec![position],
        }
    }

    pub fn replica_count(&self) -> usize {
        self.positions.len()
    }

    pub fn position(&self, replica: usize) -> Option<&Point3<f64>> {
        self.positions.get(replica)
    }
}
