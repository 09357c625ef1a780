use super::mode::{CalculationMode, Ensemble};
use super::wrappers::{EngineCapabilities, MmPotential, MmWrapper, ParseKeywordError, QmMethod, QmWrapper};
use crate::core::models::atom::Region;
use crate::core::models::system::QmmmSystem;
use nalgebra::Vector3;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Which parts of the system are described by which level of theory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PotentialKind {
    QmOnly,
    MmOnly,
    #[default]
    QmMm,
}

impl PotentialKind {
    pub fn needs_qm(&self) -> bool {
        matches!(self, PotentialKind::QmOnly | PotentialKind::QmMm)
    }

    pub fn needs_mm(&self) -> bool {
        matches!(self, PotentialKind::MmOnly | PotentialKind::QmMm)
    }
}

impl FromStr for PotentialKind {
    type Err = ParseKeywordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qm" | "qm-only" | "pureqm" => Ok(PotentialKind::QmOnly),
            "mm" | "mm-only" | "puremm" => Ok(PotentialKind::MmOnly),
            "qmmm" | "qm/mm" | "qm-mm" => Ok(PotentialKind::QmMm),
            _ => Err(ParseKeywordError {
                kind: "potential type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for PotentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PotentialKind::QmOnly => "QM",
            PotentialKind::MmOnly => "MM",
            PotentialKind::QmMm => "QM/MM",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryUnit {
    #[default]
    Mb,
    Gb,
}

impl FromStr for MemoryUnit {
    type Err = ParseKeywordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mb" => Ok(MemoryUnit::Mb),
            "gb" => Ok(MemoryUnit::Gb),
            _ => Err(ParseKeywordError {
                kind: "memory unit",
                value: s.to_string(),
            }),
        }
    }
}

/// Memory granted to the QM engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QmMemory {
    pub amount: u64,
    pub unit: MemoryUnit,
}

impl Default for QmMemory {
    fn default() -> Self {
        Self {
            amount: 1000,
            unit: MemoryUnit::Mb,
        }
    }
}

impl fmt::Display for QmMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            MemoryUnit::Mb => "MB",
            MemoryUnit::Gb => "GB",
        };
        write!(f, "{} {}", self.amount, unit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QmSettings {
    pub wrapper: QmWrapper,
    pub method: QmMethod,
    /// Basis set name; ignored for semi-empirical methods.
    pub basis: Option<String>,
    pub memory: QmMemory,
    /// Net charge of the QM region.
    pub charge: i32,
    /// Spin multiplicity of the QM region.
    pub spin: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmSettings {
    pub wrapper: MmWrapper,
    pub potential: MmPotential,
}

/// Orthorhombic periodic box, lengths in Å.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicBox {
    pub lengths: Vector3<f64>,
}

impl PeriodicBox {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            lengths: Vector3::new(x, y, z),
        }
    }
}

/// Atom indices assigned to the non-default regions. Unlisted atoms are MM.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Regions {
    pub qm: Vec<usize>,
    pub pseudo_bond: Vec<usize>,
    pub boundary: Vec<usize>,
    pub frozen: Vec<usize>,
}

impl Regions {
    fn assignments(&self) -> impl Iterator<Item = (usize, Region)> + '_ {
        self.qm
            .iter()
            .map(|&i| (i, Region::Qm))
            .chain(self.pseudo_bond.iter().map(|&i| (i, Region::PseudoBond)))
            .chain(self.boundary.iter().map(|&i| (i, Region::Boundary)))
    }
}

/// One problem found while validating [`SimulationSettings`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettingsIssue {
    #[error("QM/MM calculations need at least one QM or pseudo-bond atom")]
    NoQmAtoms,
    #[error("QM/MM calculations need at least one MM or boundary atom")]
    NoMmAtoms,
    #[error("{potential} calculations need a QM wrapper")]
    MissingQmWrapper { potential: PotentialKind },
    #[error("{potential} calculations need an MM wrapper")]
    MissingMmWrapper { potential: PotentialKind },
    #[error("{wrapper} cannot run QM/MM optimizations with its native optimizer")]
    NativeOptimizerUnsupported { wrapper: &'static str },
    #[error("{wrapper} does not support pseudo-bond or boundary atoms")]
    CovalentBoundaryUnsupported { wrapper: &'static str },
    #[error("{wrapper} does not support the {potential} potential")]
    MultipolesUnsupported {
        wrapper: &'static str,
        potential: MmPotential,
    },
    #[error("NPT simulations need a periodic box")]
    MissingPeriodicBox,
    #[error("{region} atom index {index} is out of range for {atoms} atoms")]
    AtomOutOfRange {
        region: &'static str,
        index: usize,
        atoms: usize,
    },
    #[error("Atom {index} is listed in more than one region")]
    AtomInMultipleRegions { index: usize },
    #[error("Periodic box lengths must be positive, got {lengths:?}")]
    InvalidPeriodicBox { lengths: [f64; 3] },
    #[error("Structure has {found} replicas but the calculation needs {expected}")]
    ReplicaCount { found: usize, expected: usize },
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Invalid simulation settings: {}", join_issues(.issues))]
pub struct SettingsError {
    pub issues: Vec<SettingsIssue>,
}

fn join_issues(issues: &[SettingsIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Immutable description of one LICHEM run: level of theory, wrappers, calculation mode,
/// regions and resources.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub potential: PotentialKind,
    pub qm: Option<QmSettings>,
    pub mm: Option<MmSettings>,
    pub calculation: CalculationMode,
    pub periodic_box: Option<PeriodicBox>,
    pub regions: Regions,
    /// CPUs requested for each QM engine invocation.
    pub qm_cpus: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            potential: PotentialKind::default(),
            qm: None,
            mm: None,
            calculation: CalculationMode::default(),
            periodic_box: None,
            regions: Regions::default(),
            qm_cpus: 1,
        }
    }
}

impl SimulationSettings {
    /// Applies the silent corrections LICHEM makes to user input, logging each one.
    ///
    /// Step scales above 1 are clamped, a CPU count below 1 becomes 1, and ensemble NEB
    /// paths with an even bead count gain one bead so a central bead exists.
    pub fn normalized(mut self) -> Self {
        if let Some(scale) = self.calculation.step_scale_mut() {
            if *scale > 1.0 {
                warn!("Step scale {} is larger than 1; using 1.", scale);
                *scale = 1.0;
            }
        }
        if self.qm_cpus < 1 {
            warn!("CPU count {} is invalid; using 1.", self.qm_cpus);
            self.qm_cpus = 1;
        }
        if let CalculationMode::EnsembleReactionPath(path, _) = &mut self.calculation {
            if path.beads % 2 == 0 {
                warn!(
                    "Ensemble NEB needs an odd number of beads; increasing {} to {}.",
                    path.beads,
                    path.beads + 1
                );
                path.beads += 1;
            }
        }
        self
    }

    /// Checks the settings against a system of `atom_count` atoms.
    ///
    /// # Errors
    ///
    /// Returns every problem found, not just the first.
    pub fn validate(&self, atom_count: usize) -> Result<(), SettingsError> {
        let mut issues = Vec::new();

        if self.potential.needs_qm() && self.qm.is_none() {
            issues.push(SettingsIssue::MissingQmWrapper {
                potential: self.potential,
            });
        }
        if self.potential.needs_mm() && self.mm.is_none() {
            issues.push(SettingsIssue::MissingMmWrapper {
                potential: self.potential,
            });
        }

        if self.potential == PotentialKind::QmMm {
            self.check_regions(atom_count, &mut issues);
            if let Some(qm) = &self.qm {
                if matches!(self.calculation, CalculationMode::NativeOptimization(_))
                    && !qm.wrapper.supports_native_optimizer()
                {
                    issues.push(SettingsIssue::NativeOptimizerUnsupported {
                        wrapper: qm.wrapper.name(),
                    });
                }
                let covalent = self.regions.pseudo_bond.len() + self.regions.boundary.len();
                if covalent > 0 && !qm.wrapper.supports_covalent_boundary() {
                    issues.push(SettingsIssue::CovalentBoundaryUnsupported {
                        wrapper: qm.wrapper.name(),
                    });
                }
            }
        }
        self.check_frozen(atom_count, &mut issues);

        if let Some(mm) = &self.mm {
            if mm.potential.uses_multipoles() && !mm.wrapper.supports_multipoles() {
                issues.push(SettingsIssue::MultipolesUnsupported {
                    wrapper: mm.wrapper.name(),
                    potential: mm.potential,
                });
            }
        }

        if let CalculationMode::PathIntegral(pimc) = &self.calculation {
            if pimc.ensemble == Ensemble::Npt && self.periodic_box.is_none() {
                issues.push(SettingsIssue::MissingPeriodicBox);
            }
        }
        if let Some(pbc) = &self.periodic_box {
            if pbc.lengths.iter().any(|&l| l.is_nan() || l <= 0.0) {
                issues.push(SettingsIssue::InvalidPeriodicBox {
                    lengths: [pbc.lengths.x, pbc.lengths.y, pbc.lengths.z],
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(SettingsError { issues })
        }
    }

    fn check_regions(&self, atom_count: usize, issues: &mut Vec<SettingsIssue>) {
        let mut seen: HashMap<usize, Region> = HashMap::new();
        for (index, region) in self.regions.assignments() {
            if index >= atom_count {
                issues.push(SettingsIssue::AtomOutOfRange {
                    region: region_name(region),
                    index,
                    atoms: atom_count,
                });
                continue;
            }
            if let Some(previous) = seen.insert(index, region) {
                if previous != region {
                    issues.push(SettingsIssue::AtomInMultipleRegions { index });
                }
            }
        }

        let quantum = seen
            .values()
            .filter(|r| matches!(r, Region::Qm | Region::PseudoBond))
            .count();
        let classical = atom_count - quantum;
        if quantum < 1 {
            issues.push(SettingsIssue::NoQmAtoms);
        }
        if classical < 1 {
            issues.push(SettingsIssue::NoMmAtoms);
        }
    }

    fn check_frozen(&self, atom_count: usize, issues: &mut Vec<SettingsIssue>) {
        for &index in &self.regions.frozen {
            if index >= atom_count {
                issues.push(SettingsIssue::AtomOutOfRange {
                    region: "frozen",
                    index,
                    atoms: atom_count,
                });
            }
        }
    }

    /// Validates the settings, assigns regions and frozen flags, and expands the system to the
    /// calculation's bead count.
    ///
    /// A system that already carries exactly the required number of replicas (a bead structure
    /// file) is left as read; a single-replica system is replicated from bead 0.
    pub fn apply_to(&self, system: &mut QmmmSystem) -> Result<(), SettingsError> {
        self.validate(system.atom_count())?;

        let region_of = |index: usize| -> Region {
            match self.potential {
                PotentialKind::QmOnly => Region::Qm,
                PotentialKind::MmOnly => Region::Mm,
                PotentialKind::QmMm => self
                    .regions
                    .assignments()
                    .find(|&(i, _)| i == index)
                    .map_or(Region::Mm, |(_, r)| r),
            }
        };
        for index in 0..system.atom_count() {
            let region = region_of(index);
            let frozen = self.regions.frozen.contains(&index);
            if let Some(atom) = system.atom_mut(index) {
                atom.region = region;
                atom.frozen = frozen;
            }
        }

        let expected = self.calculation.bead_count();
        let found = system
            .replica_count()
            .map_err(|_| SettingsError {
                issues: vec![SettingsIssue::ReplicaCount { found: 0, expected }],
            })?;
        if found != expected {
            if found != 1 {
                return Err(SettingsError {
                    issues: vec![SettingsIssue::ReplicaCount { found, expected }],
                });
            }
            debug!("Replicating bead 0 to {} beads", expected);
            system
                .expand_replicas(expected)
                .map_err(|_| SettingsError {
                    issues: vec![SettingsIssue::ReplicaCount { found, expected }],
                })?;
        }
        Ok(())
    }
}

fn region_name(region: Region) -> &'static str {
    match region {
        Region::Qm => "QM",
        Region::Mm => "MM",
        Region::PseudoBond => "pseudo-bond",
        Region::Boundary => "boundary",
    }
}

impl fmt::Display for SimulationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Potential:        {}", self.potential)?;
        if let Some(qm) = &self.qm {
            write!(f, "QM wrapper:       {} ({}", qm.wrapper, qm.method)?;
            if let (true, Some(basis)) = (qm.method.uses_basis_set(), &qm.basis) {
                write!(f, "/{}", basis)?;
            }
            writeln!(
                f,
                ", charge {}, spin {}, memory {})",
                qm.charge, qm.spin, qm.memory
            )?;
        }
        if let Some(mm) = &self.mm {
            writeln!(f, "MM wrapper:       {} ({})", mm.wrapper, mm.potential)?;
        }
        writeln!(f, "Calculation:      {}", self.calculation.kind())?;
        writeln!(f, "Beads:            {}", self.calculation.bead_count())?;
        if let Some(ts) = self.calculation.transition_state_bead() {
            writeln!(f, "TS bead:          {}", ts)?;
        }
        if let Some(pbc) = &self.periodic_box {
            writeln!(
                f,
                "Periodic box:     {:.3} x {:.3} x {:.3} Å",
                pbc.lengths.x, pbc.lengths.y, pbc.lengths.z
            )?;
        }
        writeln!(
            f,
            "Regions:          {} QM, {} pseudo-bond, {} boundary, {} frozen",
            self.regions.qm.len(),
            self.regions.pseudo_bond.len(),
            self.regions.boundary.len(),
            self.regions.frozen.len()
        )?;
        write!(f, "QM CPUs:          {}", self.qm_cpus)
    }
}
