use crate::core::io::embedding::GlobalPoleRecord;
use crate::core::models::charges::{PointChargeSet, TruncationReport};
use crate::core::models::multipole::CartesianMultipole;
use crate::core::models::reduced::ReducedMultipole;
use crate::core::models::system::QmmmSystem;
use crate::core::multipoles::frame::DroppedMoments;
use crate::core::multipoles::harmonics::spherical_to_cartesian;
use nalgebra::Point3;

/// The three representations of one atom's multipole in one replica.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomElectrostaticState {
    /// Local-frame Cartesian multipole as extracted from the force field.
    pub local: CartesianMultipole,
    /// Global-frame spherical-harmonic multipole.
    pub global: ReducedMultipole,
    /// Point charges reproducing `global`, offsets in bohr.
    pub charges: PointChargeSet,
    /// Moments lost because the local frame is incomplete.
    pub dropped: Option<DroppedMoments>,
}

/// Per-atom, per-replica electrostatic states for one geometry snapshot.
///
/// States are stored atom-major; every atom holds the same number of replicas.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlobalElectrostaticField {
    states: Vec<Vec<AtomElectrostaticState>>,
    replica_count: usize,
}

impl GlobalElectrostaticField {
    pub(crate) fn new(states: Vec<Vec<AtomElectrostaticState>>, replica_count: usize) -> Self {
        debug_assert!(states.iter().all(|s| s.len() == replica_count));
        Self {
            states,
            replica_count,
        }
    }

    pub fn atom_count(&self) -> usize {
        self.states.len()
    }

    pub fn replica_count(&self) -> usize {
        self.replica_count
    }

    pub fn state(&self, atom: usize, replica: usize) -> Option<&AtomElectrostaticState> {
        self.states.get(atom)?.get(replica)
    }

    /// Sum of every site charge in `replica`.
    pub fn total_charge(&self, replica: usize) -> f64 {
        self.states
            .iter()
            .filter_map(|s| s.get(replica))
            .map(|s| s.charges.total_charge())
            .sum()
    }

    /// Every reduction that could not reproduce the requested order exactly.
    pub fn truncations(&self) -> impl Iterator<Item = (usize, usize, &TruncationReport)> {
        self.states.iter().enumerate().flat_map(|(atom, replicas)| {
            replicas.iter().enumerate().filter_map(move |(replica, s)| {
                s.charges.truncation.as_ref().map(|t| (atom, replica, t))
            })
        })
    }

    /// Every atom replica whose higher moments were dropped for want of a complete frame.
    pub fn dropped_moments(&self) -> impl Iterator<Item = (usize, usize, &DroppedMoments)> {
        self.states.iter().enumerate().flat_map(|(atom, replicas)| {
            replicas
                .iter()
                .enumerate()
                .filter_map(move |(replica, s)| s.dropped.as_ref().map(|d| (atom, replica, d)))
        })
    }

    /// Absolute embedding charges (Ångström, e) of `replica` for every MM and boundary atom.
    pub fn embedding_charges<'a>(
        &'a self,
        system: &'a QmmmSystem,
        replica: usize,
    ) -> impl Iterator<Item = (Point3<f64>, f64)> + 'a {
        self.states
            .iter()
            .enumerate()
            .filter(move |(atom, _)| system.atom(*atom).is_some_and(|a| a.region.embeds()))
            .filter_map(move |(atom, replicas)| {
                let center = system.position(atom, replica)?;
                Some(replicas.get(replica)?.charges.placed_at(center))
            })
            .flatten()
    }

    /// Global-frame Cartesian multipoles of every atom in `replica`.
    pub fn global_pole_records(&self, system: &QmmmSystem, replica: usize) -> Vec<GlobalPoleRecord> {
        self.states
            .iter()
            .enumerate()
            .filter_map(|(atom, replicas)| {
                let state = replicas.get(replica)?;
                let source = system.atom(atom)?;
                Some(GlobalPoleRecord {
                    atom,
                    element: source.element.clone(),
                    position: *source.position(replica)?,
                    moments: spherical_to_cartesian(&state.global),
                })
            })
            .collect()
    }
}
