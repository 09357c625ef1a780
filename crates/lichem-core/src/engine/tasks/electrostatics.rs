use crate::core::models::system::SystemError;
use crate::core::multipoles::frame::DroppedMoments;
use crate::engine::context::EmbeddingContext;
use crate::engine::error::ElectrostaticsError;
use crate::engine::field::{AtomElectrostaticState, GlobalElectrostaticField};
use crate::engine::progress::Progress;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Converts, rotates and reduces the multipole of one atom in one replica.
pub fn compute_state(
    context: &EmbeddingContext,
    atom: usize,
    replica: usize,
) -> Result<AtomElectrostaticState, ElectrostaticsError> {
    let local = *context
        .system
        .multipoles()
        .get(atom, replica)
        .ok_or(SystemError::ReplicaOutOfRange {
            replica,
            count: context.system.multipoles().replica_count(atom),
        })?;

    let global = context
        .rotator
        .to_global(context.system, atom, replica, &local)?;
    let dropped = DroppedMoments::of(&local);
    let charges = context
        .reducer
        .reduce(&global)
        .map_err(|e| ElectrostaticsError::from_reduction(atom, replica, e))?;

    if context.config.checks.enabled {
        let tolerance = context.config.checks.tolerance;
        let check = |quantity: &'static str, error: f64| {
            if !(error <= tolerance) {
                Err(ElectrostaticsError::Tolerance {
                    atom,
                    replica,
                    quantity,
                    error,
                    tolerance,
                })
            } else {
                Ok(())
            }
        };
        check("rotated charge", (global.monopole - local.charge()).abs())?;
        check("site charge", (charges.total_charge() - local.charge()).abs())?;
        if charges.truncation.is_none() && context.reducer.max_order() >= 1 {
            check(
                "site dipole",
                (charges.dipole() - global.dipole_vector()).norm(),
            )?;
        }
    }

    Ok(AtomElectrostaticState {
        local,
        global,
        charges,
        dropped,
    })
}

/// Computes the embedding field for every atom and replica of the context's system.
///
/// On failure the error of the lowest `(atom, replica)` pair is returned, independent of how
/// the work was scheduled.
#[instrument(skip_all, name = "electrostatics_task")]
pub fn run(context: &EmbeddingContext) -> Result<GlobalElectrostaticField, ElectrostaticsError> {
    let replicas = context.system.replica_count()?;
    let atoms = context.system.atom_count();
    info!(
        atoms,
        replicas,
        layout = %context.reducer.layout(),
        max_order = context.reducer.max_order(),
        "Computing global electrostatic field."
    );
    if !context.reducer.is_exact_layout() {
        warn!(
            layout = %context.reducer.layout(),
            rank = context.reducer.layout_rank(),
            max_order = context.reducer.max_order(),
            "Site layout cannot represent every multipole of the requested order."
        );
    }

    let jobs: Vec<(usize, usize)> = (0..atoms)
        .flat_map(|atom| (0..replicas).map(move |replica| (atom, replica)))
        .collect();

    context.reporter.report(Progress::TaskStart {
        total_steps: jobs.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = jobs.iter();

    #[cfg(feature = "parallel")]
    let iterator = jobs.par_iter();

    let results: Vec<Result<AtomElectrostaticState, ElectrostaticsError>> = iterator
        .map(|&(atom, replica)| {
            let result = compute_state(context, atom, replica);
            context.reporter.report(Progress::TaskIncrement);
            result
        })
        .collect();

    context.reporter.report(Progress::TaskFinish);

    let mut states = Vec::with_capacity(atoms);
    let mut results = results.into_iter();
    for _ in 0..atoms {
        let per_atom = results
            .by_ref()
            .take(replicas)
            .collect::<Result<Vec<_>, _>>()?;
        states.push(per_atom);
    }
    let field = GlobalElectrostaticField::new(states, replicas);

    let truncated = field.truncations().count();
    if let Some((atom, replica, worst)) = field
        .truncations()
        .max_by(|a, b| a.2.max_error.total_cmp(&b.2.max_error))
    {
        warn!(
            truncated,
            atom,
            replica,
            "Truncated multipole reduction; worst case: {}",
            worst
        );
        context.reporter.report(Progress::Message(format!(
            "{} reductions truncated (worst: atom {}, replica {}: {})",
            truncated, atom, replica, worst
        )));
    }
    let dropped = field.dropped_moments().count();
    if let Some((atom, replica, worst)) = field
        .dropped_moments()
        .max_by(|a, b| a.2.dipole.total_cmp(&b.2.dipole))
    {
        warn!(
            dropped,
            atom,
            replica,
            "Atoms without a complete local frame embed their charge only; largest loss: {}",
            worst
        );
        context.reporter.report(Progress::Message(format!(
            "{} atom replicas lack a complete frame (worst: atom {}, replica {}: {})",
            dropped, atom, replica, worst
        )));
    }
    for replica in 0..replicas {
        debug!(replica, total_charge = field.total_charge(replica), "Replica field ready.");
    }

    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{Atom, Region};
    use crate::core::models::multipole::{CartesianMoments, CartesianMultipole, LocalFrame};
    use crate::core::models::system::{LocalMultipoleStore, QmmmSystem};
    use crate::core::multipoles::frame::FrameDefect;
    use crate::core::multipoles::layout::SiteLayout;
    use crate::engine::config::{EmbeddingConfig, EmbeddingConfigBuilder, SanityConfig};
    use crate::engine::progress::ProgressReporter;
    use nalgebra::{Matrix3, Point3, Vector3};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn config(layout: SiteLayout, max_order: usize, strict: bool) -> EmbeddingConfig {
        EmbeddingConfigBuilder::new()
            .layout(layout)
            .site_radius(0.5)
            .max_order(max_order)
            .strict(strict)
            .sanity_checks(true)
            .tolerance(1e-8)
            .min_separation(1e-6)
            .min_sine(1e-6)
            .build()
            .unwrap()
    }

    /// Bent water: oxygen carries a full multipole framed on both hydrogens.
    fn water() -> QmmmSystem {
        let atoms = vec![
            Atom::new("O", Point3::origin()),
            Atom::new("H", Point3::new(0.0, 0.0, 0.96)),
            Atom::new("H", Point3::new(0.93, 0.0, -0.24)),
        ];
        let mut oxygen = CartesianMoments::monopole(-0.8);
        oxygen.dipole = Vector3::new(0.05, 0.0, 0.3);
        oxygen.quadrupole = Matrix3::new(0.2, 0.0, 0.05, 0.0, -0.35, 0.0, 0.05, 0.0, 0.15);
        let poles = vec![
            CartesianMultipole::new(oxygen, LocalFrame::new(1, 2)),
            CartesianMultipole::point_charge(0.4),
            CartesianMultipole::point_charge(0.4),
        ];
        QmmmSystem::new(atoms, LocalMultipoleStore::from_single_replica(poles)).unwrap()
    }

    fn compute(
        system: &QmmmSystem,
        config: &EmbeddingConfig,
    ) -> Result<GlobalElectrostaticField, ElectrostaticsError> {
        let reporter = ProgressReporter::new();
        let context = EmbeddingContext::new(system, config, &reporter)?;
        run(&context)
    }

    #[test]
    fn field_conserves_charge_per_replica() {
        let mut system = water();
        system.expand_replicas(3).unwrap();
        let field = compute(&system, &config(SiteLayout::Dodecahedron, 3, false)).unwrap();

        assert_eq!(field.atom_count(), 3);
        assert_eq!(field.replica_count(), 3);
        for replica in 0..3 {
            assert!(field.total_charge(replica).abs() < 1e-12);
        }
        for atom in 0..3 {
            assert_eq!(field.state(atom, 2).unwrap().charges.len(), 20);
        }
        assert_eq!(field.truncations().count(), 0);
        assert_eq!(field.dropped_moments().count(), 0);
    }

    #[test]
    fn global_dipole_follows_the_frame() {
        let system = water();
        let field = compute(&system, &config(SiteLayout::Dodecahedron, 3, false)).unwrap();
        // Local z points at the first hydrogen, which lies on global +z.
        let oxygen = &field.state(0, 0).unwrap().global;
        let dipole = oxygen.dipole_vector();
        assert!((dipole.z - 0.3).abs() < 1e-10);
        assert!((dipole.x - 0.05).abs() < 1e-10);
        assert!(dipole.y.abs() < 1e-10);
    }

    #[test]
    fn embedding_charges_skip_qm_atoms() {
        let mut system = water();
        system.atom_mut(1).unwrap().region = Region::Qm;
        let field = compute(&system, &config(SiteLayout::Dodecahedron, 3, false)).unwrap();
        let charges: Vec<_> = field.embedding_charges(&system, 0).collect();
        assert_eq!(charges.len(), 40);
        let total: f64 = charges.iter().map(|(_, q)| q).sum();
        assert!((total - (-0.4)).abs() < 1e-12);
        let hydrogen: f64 = charges[20..].iter().map(|(_, q)| q).sum();
        assert!((hydrogen - 0.4).abs() < 1e-12);
        assert!(charges[20..].iter().all(|(_, q)| (q - 0.02).abs() < 1e-12));

        let records = field.global_pole_records(&system, 0);
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].element, "H");
        assert!((records[0].moments.charge + 0.8).abs() < 1e-12);
    }

    #[test]
    fn lowest_failing_atom_is_reported() {
        let atoms = vec![
            Atom::new("C", Point3::origin()),
            Atom::new("C", Point3::new(1.0, 0.0, 0.0)),
            Atom::new("C", Point3::new(2.0, 0.0, 0.0)),
        ];
        let mut dipole = CartesianMoments::monopole(0.0);
        dipole.dipole = Vector3::new(0.0, 0.0, 0.1);
        // Atoms 1 and 2 are framed on colinear neighbours.
        let poles = vec![
            CartesianMultipole::point_charge(0.1),
            CartesianMultipole::new(dipole, LocalFrame::new(0, 2)),
            CartesianMultipole::new(dipole, LocalFrame::new(1, 0)),
        ];
        let system =
            QmmmSystem::new(atoms, LocalMultipoleStore::from_single_replica(poles)).unwrap();
        for _ in 0..5 {
            let err = compute(&system, &config(SiteLayout::Dodecahedron, 3, false)).unwrap_err();
            assert_eq!(err.location(), Some((1, 0)));
            assert!(matches!(
                err,
                ElectrostaticsError::Geometry(ref g)
                    if matches!(g.defect, FrameDefect::ColinearReferences { .. })
            ));
        }
    }

    #[test]
    fn incomplete_frame_degrades_to_the_charge() {
        let base = water();
        let mut oxygen = *base.multipoles().get(0, 0).unwrap();
        oxygen.frame = LocalFrame {
            z_atom: Some(1),
            ..Default::default()
        };
        let poles = vec![
            oxygen,
            CartesianMultipole::point_charge(0.4),
            CartesianMultipole::point_charge(0.4),
        ];
        let system = QmmmSystem::new(
            base.atoms().to_vec(),
            LocalMultipoleStore::from_single_replica(poles),
        )
        .unwrap();

        let field = compute(&system, &config(SiteLayout::Dodecahedron, 3, true)).unwrap();
        let state = field.state(0, 0).unwrap();
        assert_eq!(state.global.dipole_vector(), Vector3::zeros());
        assert!((state.charges.total_charge() + 0.8).abs() < 1e-12);
        assert!(state.charges.dipole().norm() < 1e-12);

        let dropped: Vec<_> = field.dropped_moments().collect();
        assert_eq!(dropped.len(), 1);
        let (atom, replica, moments) = dropped[0];
        assert_eq!((atom, replica), (0, 0));
        assert!((moments.dipole - 0.05_f64.hypot(0.3)).abs() < 1e-12);
        assert!(moments.quadrupole > 0.0);
    }

    #[test]
    fn non_finite_geometry_fails_the_run() {
        let mut system = water();
        system.atom_mut(1).unwrap().positions[0] = Point3::new(f64::NAN, 0.0, 0.96);
        let err = compute(&system, &config(SiteLayout::Dodecahedron, 3, false)).unwrap_err();
        assert_eq!(err.location(), Some((0, 0)));
        assert!(matches!(
            err,
            ElectrostaticsError::Geometry(ref g)
                if g.defect == FrameDefect::NonFinitePosition { reference: 1 }
        ));
    }

    #[test]
    fn nan_tolerance_fails_the_checks() {
        let system = water();
        let config = EmbeddingConfig {
            checks: SanityConfig {
                enabled: true,
                tolerance: f64::NAN,
            },
            ..config(SiteLayout::Dodecahedron, 3, false)
        };
        let err = compute(&system, &config).unwrap_err();
        assert!(matches!(
            err,
            ElectrostaticsError::Tolerance {
                atom: 0,
                replica: 0,
                quantity: "rotated charge",
                ..
            }
        ));
    }

    #[test]
    fn truncation_is_reported_unless_strict() {
        let system = water();
        let field = compute(&system, &config(SiteLayout::Octahedron, 2, false)).unwrap();
        let (atom, replica, report) = field.truncations().next().unwrap();
        assert_eq!((atom, replica), (0, 0));
        assert_eq!(report.layout_rank, 6);
        assert!((field.total_charge(0)).abs() < 1e-12);

        let err = compute(&system, &config(SiteLayout::Octahedron, 2, true)).unwrap_err();
        assert!(matches!(
            err,
            ElectrostaticsError::UnderdeterminedReduction {
                atom: 0,
                replica: 0,
                layout: SiteLayout::Octahedron,
                ..
            }
        ));
    }

    #[test]
    fn progress_counts_every_atom_and_replica() {
        let mut system = water();
        system.expand_replicas(2).unwrap();
        let config = config(SiteLayout::Dodecahedron, 3, false);
        let steps = AtomicU64::new(0);
        let total = AtomicU64::new(0);
        let reporter = ProgressReporter::with_callback(Box::new(|event: Progress| match event {
            Progress::TaskStart { total_steps } => total.store(total_steps, Ordering::SeqCst),
            Progress::TaskIncrement => {
                steps.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }));
        let context = EmbeddingContext::new(&system, &config, &reporter).unwrap();
        run(&context).unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 6);
        assert_eq!(steps.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let mut system = water();
        system.expand_replicas(4).unwrap();
        let config = config(SiteLayout::Dodecahedron, 3, false);
        assert_eq!(compute(&system, &config).unwrap(), compute(&system, &config).unwrap());
    }
}
