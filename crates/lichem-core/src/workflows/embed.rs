use crate::core::models::atom::{Atom, Region};
use crate::core::models::multipole::CartesianMultipole;
use crate::core::models::system::{LocalMultipoleStore, QmmmSystem, SystemError};
use crate::core::simulation::settings::{SettingsError, SimulationSettings};
use crate::engine::config::EmbeddingConfig;
use crate::engine::context::EmbeddingContext;
use crate::engine::error::ElectrostaticsError;
use crate::engine::field::GlobalElectrostaticField;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks;
use nalgebra::Point3;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    System(#[from] SystemError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("The {mode} calculation needs a bead structure with one position per atom and bead")]
    MissingBeadStructure { mode: String },
    #[error("Bead structure holds {found} beads, the calculation uses {expected}")]
    BeadCountMismatch { found: usize, expected: usize },
}

/// Builds a validated system from single-replica atoms and their local multipoles.
///
/// Settings assign regions and frozen flags and replicate bead 0 to the calculation's bead
/// count. `beads` holds per-atom bead positions; when present it replaces the replicated
/// coordinates, and reaction-path calculations require it.
#[instrument(skip_all, name = "system_setup")]
pub fn prepare_system(
    atoms: Vec<Atom>,
    multipoles: Vec<CartesianMultipole>,
    settings: &SimulationSettings,
    beads: Option<&[Vec<Point3<f64>>]>,
) -> Result<QmmmSystem, SetupError> {
    let mut system = QmmmSystem::new(atoms, LocalMultipoleStore::from_single_replica(multipoles))?;
    settings.apply_to(&mut system)?;
    let expected = system.replica_count()?;

    match beads {
        Some(beads) => {
            if let Some(found) = beads.iter().map(Vec::len).find(|&n| n != expected) {
                return Err(SetupError::BeadCountMismatch { found, expected });
            }
            for replica in 0..expected {
                let positions: Vec<Point3<f64>> =
                    beads.iter().map(|per_atom| per_atom[replica]).collect();
                system.set_replica_positions(replica, &positions)?;
            }
        }
        None if settings.calculation.requires_bead_structure() => {
            return Err(SetupError::MissingBeadStructure {
                mode: settings.calculation.kind().to_string(),
            });
        }
        None => {}
    }

    info!(
        atoms = system.atom_count(),
        qm_atoms = system.count_in_region(Region::Qm),
        mm_atoms = system.count_in_region(Region::Mm),
        replicas = expected,
        "System prepared."
    );
    Ok(system)
}

/// Computes the global electrostatic embedding field of `system` for all replicas.
#[instrument(skip_all, name = "embedding_workflow")]
pub fn run(
    system: &QmmmSystem,
    config: &EmbeddingConfig,
    reporter: &ProgressReporter,
) -> Result<GlobalElectrostaticField, ElectrostaticsError> {
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let context = EmbeddingContext::new(system, config, reporter)?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Electrostatics",
    });
    let field = tasks::electrostatics::run(&context)?;
    reporter.report(Progress::PhaseFinish);

    info!(
        atoms = field.atom_count(),
        replicas = field.replica_count(),
        "Embedding field complete."
    );
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::multipole::{CartesianMoments, LocalFrame};
    use crate::core::multipoles::layout::SiteLayout;
    use crate::core::simulation::mode::{
        CalculationMode, PathIntegralSettings, ReactionPathSettings,
    };
    use crate::core::simulation::settings::{
        MmSettings, PotentialKind, QmMemory, QmSettings, Regions,
    };
    use crate::core::simulation::wrappers::{MmPotential, MmWrapper, QmMethod, QmWrapper};
    use crate::engine::config::EmbeddingConfigBuilder;
    use nalgebra::Vector3;

    fn config() -> EmbeddingConfig {
        EmbeddingConfigBuilder::new()
            .layout(SiteLayout::Dodecahedron)
            .site_radius(0.5)
            .max_order(3)
            .sanity_checks(true)
            .tolerance(1e-8)
            .min_separation(1e-6)
            .min_sine(1e-6)
            .build()
            .unwrap()
    }

    fn methanol_fragment() -> (Vec<Atom>, Vec<CartesianMultipole>) {
        let atoms = vec![
            Atom::new("C", Point3::origin()),
            Atom::new("O", Point3::new(1.43, 0.0, 0.0)),
            Atom::new("H", Point3::new(-0.36, 1.03, 0.0)),
            Atom::new("H", Point3::new(1.75, -0.9, 0.0)),
        ];
        let mut oxygen = CartesianMoments::monopole(-0.6);
        oxygen.dipole = Vector3::new(0.0, 0.1, 0.25);
        let poles = vec![
            CartesianMultipole::point_charge(0.2),
            CartesianMultipole::new(oxygen, LocalFrame::new(0, 3)),
            CartesianMultipole::point_charge(0.0),
            CartesianMultipole::point_charge(0.4),
        ];
        (atoms, poles)
    }

    fn settings(calculation: CalculationMode) -> SimulationSettings {
        SimulationSettings {
            potential: PotentialKind::QmMm,
            qm: Some(QmSettings {
                wrapper: QmWrapper::Psi4,
                method: QmMethod::Named("HF".to_string()),
                basis: Some("cc-pVDZ".to_string()),
                memory: QmMemory::default(),
                charge: 0,
                spin: 1,
            }),
            mm: Some(MmSettings {
                wrapper: MmWrapper::Tinker,
                potential: MmPotential::Amoeba,
            }),
            calculation,
            regions: Regions {
                qm: vec![0],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn single_point_embeds_mm_atoms() {
        let (atoms, poles) = methanol_fragment();
        let system =
            prepare_system(atoms, poles, &settings(CalculationMode::SinglePoint), None).unwrap();
        assert_eq!(system.atom(0).unwrap().region, Region::Qm);

        let field = run(&system, &config(), &ProgressReporter::new()).unwrap();
        let charges: Vec<_> = field.embedding_charges(&system, 0).collect();
        // Twenty dodecahedron sites for each of the three MM atoms.
        assert_eq!(charges.len(), 60);
        let total: f64 = charges.iter().map(|(_, q)| q).sum();
        assert!((total - (-0.2)).abs() < 1e-12);
    }

    #[test]
    fn path_integral_replicates_beads() {
        let (atoms, poles) = methanol_fragment();
        let mode = CalculationMode::PathIntegral(PathIntegralSettings {
            beads: 3,
            ..Default::default()
        });
        let system = prepare_system(atoms, poles, &settings(mode), None).unwrap();
        let field = run(&system, &config(), &ProgressReporter::new()).unwrap();
        assert_eq!(field.replica_count(), 3);
        assert_eq!(field.state(1, 0), field.state(1, 2));
    }

    #[test]
    fn reaction_path_needs_bead_structure() {
        let mode = CalculationMode::ReactionPath(ReactionPathSettings {
            beads: 2,
            ..Default::default()
        });
        let (atoms, poles) = methanol_fragment();
        let err = prepare_system(atoms, poles, &settings(mode), None).unwrap_err();
        assert!(matches!(err, SetupError::MissingBeadStructure { .. }));

        let (atoms, poles) = methanol_fragment();
        let beads: Vec<Vec<Point3<f64>>> = atoms
            .iter()
            .map(|a| {
                let p = a.positions[0];
                vec![p, p + Vector3::new(0.0, 0.0, 0.1)]
            })
            .collect();
        let system = prepare_system(atoms, poles, &settings(mode), Some(&beads)).unwrap();
        assert_eq!(system.position(1, 1), Some(&Point3::new(1.43, 0.0, 0.1)));

        let (atoms, poles) = methanol_fragment();
        let short: Vec<Vec<Point3<f64>>> = beads.iter().map(|b| vec![b[0]]).collect();
        let err = prepare_system(atoms, poles, &settings(mode), Some(&short)).unwrap_err();
        assert!(matches!(
            err,
            SetupError::BeadCountMismatch {
                found: 1,
                expected: 2
            }
        ));
    }
}
