use phf::{Map, Set, phf_map, phf_set};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unrecognized {kind} '{value}'")]
pub struct ParseKeywordError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseKeywordError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// What an external engine wrapper can do, queried instead of comparing wrapper names.
pub trait EngineCapabilities {
    fn name(&self) -> &'static str;

    /// Whether the engine's own optimizer can drive a QM/MM `opt` calculation.
    fn supports_native_optimizer(&self) -> bool;

    /// Whether pseudo-bond and boundary atoms across a covalent QM/MM cut are supported.
    fn supports_covalent_boundary(&self) -> bool;

    /// Whether polarizable multipole potentials (AMOEBA, GEM) are available.
    fn supports_multipoles(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QmWrapper {
    Psi4,
    NWChem,
    Gaussian,
}

static QM_WRAPPER_ALIASES: Map<&'static str, QmWrapper> = phf_map! {
    "psi4" => QmWrapper::Psi4,
    "nwchem" => QmWrapper::NWChem,
    "gaussian" => QmWrapper::Gaussian,
    "g09" => QmWrapper::Gaussian,
    "g16" => QmWrapper::Gaussian,
};

impl FromStr for QmWrapper {
    type Err = ParseKeywordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QM_WRAPPER_ALIASES
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| ParseKeywordError::new("QM wrapper", s))
    }
}

impl EngineCapabilities for QmWrapper {
    fn name(&self) -> &'static str {
        match self {
            QmWrapper::Psi4 => "PSI4",
            QmWrapper::NWChem => "NWChem",
            QmWrapper::Gaussian => "Gaussian",
        }
    }

    fn supports_native_optimizer(&self) -> bool {
        matches!(self, QmWrapper::Gaussian)
    }

    fn supports_covalent_boundary(&self) -> bool {
        !matches!(self, QmWrapper::Psi4)
    }

    fn supports_multipoles(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MmWrapper {
    Tinker,
    Amber,
    Lammps,
}

static MM_WRAPPER_ALIASES: Map<&'static str, MmWrapper> = phf_map! {
    "tinker" => MmWrapper::Tinker,
    "amber" => MmWrapper::Amber,
    "lammps" => MmWrapper::Lammps,
};

impl FromStr for MmWrapper {
    type Err = ParseKeywordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MM_WRAPPER_ALIASES
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| ParseKeywordError::new("MM wrapper", s))
    }
}

impl EngineCapabilities for MmWrapper {
    fn name(&self) -> &'static str {
        match self {
            MmWrapper::Tinker => "TINKER",
            MmWrapper::Amber => "AMBER",
            MmWrapper::Lammps => "LAMMPS",
        }
    }

    fn supports_native_optimizer(&self) -> bool {
        true
    }

    fn supports_covalent_boundary(&self) -> bool {
        true
    }

    fn supports_multipoles(&self) -> bool {
        !matches!(self, MmWrapper::Lammps)
    }
}

impl fmt::Display for QmWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for MmWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The classical potential used for the MM region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MmPotential {
    /// Fixed point charges only.
    Charges,
    /// AMOEBA polarizable multipoles.
    Amoeba,
    /// Gaussian electrostatic model.
    Gem,
}

static MM_POTENTIAL_ALIASES: Map<&'static str, MmPotential> = phf_map! {
    "charges" => MmPotential::Charges,
    "charge" => MmPotential::Charges,
    "point-charge" => MmPotential::Charges,
    "amoeba" => MmPotential::Amoeba,
    "gem" => MmPotential::Gem,
};

impl MmPotential {
    /// Whether MM atoms carry local-frame multipoles that must be transformed for embedding.
    pub fn uses_multipoles(&self) -> bool {
        matches!(self, MmPotential::Amoeba | MmPotential::Gem)
    }
}

impl FromStr for MmPotential {
    type Err = ParseKeywordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MM_POTENTIAL_ALIASES
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| ParseKeywordError::new("MM potential", s))
    }
}

impl fmt::Display for MmPotential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MmPotential::Charges => "point charges",
            MmPotential::Amoeba => "AMOEBA",
            MmPotential::Gem => "GEM",
        })
    }
}

static SEMI_EMPIRICAL_ALIASES: Set<&'static str> = phf_set! {
    "semiempirical",
    "semi-empirical",
    "se-scf",
    "sescf",
    "semiemp",
};

/// The QM method: either a semi-empirical Hamiltonian or a named functional / method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QmMethod {
    SemiEmpirical,
    Named(String),
}

impl QmMethod {
    /// Semi-empirical Hamiltonians carry no separate basis set.
    pub fn uses_basis_set(&self) -> bool {
        !matches!(self, QmMethod::SemiEmpirical)
    }
}

impl FromStr for QmMethod {
    type Err = ParseKeywordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseKeywordError::new("QM method", s));
        }
        if SEMI_EMPIRICAL_ALIASES.contains(trimmed.to_ascii_lowercase().as_str()) {
            Ok(QmMethod::SemiEmpirical)
        } else {
            Ok(QmMethod::Named(trimmed.to_string()))
        }
    }
}

impl fmt::Display for QmMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QmMethod::SemiEmpirical => f.write_str("SemiEmp"),
            QmMethod::Named(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qm_wrapper_aliases_are_case_insensitive() {
        assert_eq!("PSI4".parse(), Ok(QmWrapper::Psi4));
        assert_eq!("NWchem".parse(), Ok(QmWrapper::NWChem));
        assert_eq!("g09".parse(), Ok(QmWrapper::Gaussian));
        assert_eq!(
            "orca".parse::<QmWrapper>(),
            Err(ParseKeywordError {
                kind: "QM wrapper",
                value: "orca".to_string()
            })
        );
    }

    #[test]
    fn mm_wrapper_and_potential_parse() {
        assert_eq!("Tinker".parse(), Ok(MmWrapper::Tinker));
        assert_eq!("LAMMPS".parse(), Ok(MmWrapper::Lammps));
        assert_eq!("point-charge".parse(), Ok(MmPotential::Charges));
        assert_eq!("AMOEBA".parse(), Ok(MmPotential::Amoeba));
        assert!("mmff".parse::<MmPotential>().is_err());
    }

    #[test]
    fn capabilities_follow_wrapper_kind() {
        assert!(QmWrapper::Gaussian.supports_native_optimizer());
        assert!(!QmWrapper::Psi4.supports_native_optimizer());
        assert!(!QmWrapper::NWChem.supports_native_optimizer());
        assert!(!QmWrapper::Psi4.supports_covalent_boundary());
        assert!(MmWrapper::Tinker.supports_multipoles());
        assert!(!MmWrapper::Lammps.supports_multipoles());
    }

    #[test]
    fn semi_empirical_aliases_collapse() {
        for alias in ["SemiEmpirical", "SE-SCF", "sescf", "SemiEmp", "semi-empirical"] {
            assert_eq!(alias.parse(), Ok(QmMethod::SemiEmpirical), "{alias}");
        }
        assert_eq!(
            "B3LYP".parse(),
            Ok(QmMethod::Named("B3LYP".to_string()))
        );
        assert!(!QmMethod::SemiEmpirical.uses_basis_set());
        assert!("  ".parse::<QmMethod>().is_err());
    }

    #[test]
    fn potentials_report_multipole_usage() {
        assert!(MmPotential::Amoeba.uses_multipoles());
        assert!(MmPotential::Gem.uses_multipoles());
        assert!(!MmPotential::Charges.uses_multipoles());
    }
}
