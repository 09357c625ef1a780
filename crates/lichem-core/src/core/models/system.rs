use super::atom::{Atom, Region};
use super::multipole::CartesianMultipole;
use crate::core::simulation::beads::replicate_per_bead;
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SystemError {
    #[error("System has {atoms} atoms but {multipoles} multipole entries")]
    AtomCountMismatch { atoms: usize, multipoles: usize },

    #[error(
        "Replica count mismatch for atom {atom}: {positions} positions but {multipoles} multipoles (expected {expected})"
    )]
    ReplicaMismatch {
        atom: usize,
        positions: usize,
        multipoles: usize,
        expected: usize,
    },

    #[error("Replica {replica} is out of range (system has {count} replicas)")]
    ReplicaOutOfRange { replica: usize, count: usize },

    #[error("Expected {expected} coordinates for the replica, got {found}")]
    CoordinateCountMismatch { expected: usize, found: usize },

    #[error("A system needs at least one replica")]
    NoReplicas,
}

/// Per-atom, per-replica local-frame multipoles, as produced by force-field extraction.
///
/// Entries are immutable after setup apart from bead expansion; every replica of an atom carries
/// the same local multipole and frame definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalMultipoleStore {
    entries: Vec<Vec<CartesianMultipole>>,
}

impl LocalMultipoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store with exactly one replica per atom.
    pub fn from_single_replica(multipoles: Vec<CartesianMultipole>) -> Self {
        Self {
            entries: multipoles.into_iter().map(|m| vec![m]).collect(),
        }
    }

    pub fn get(&self, atom: usize, replica: usize) -> Option<&CartesianMultipole> {
        self.entries.get(atom)?.get(replica)
    }

    pub fn atom_count(&self) -> usize {
        self.entries.len()
    }

    pub fn replica_count(&self, atom: usize) -> usize {
        self.entries.get(atom).map_or(0, Vec::len)
    }

    pub fn total_charge(&self, replica: usize) -> f64 {
        self.entries
            .iter()
            .filter_map(|r| r.get(replica))
            .map(CartesianMultipole::charge)
            .sum()
    }

    fn expand_replicas(&mut self, count: usize) {
        for replicas in &mut self.entries {
            if let Some(first) = replicas.first() {
                *replicas = replicate_per_bead(first, count);
            }
        }
    }
}

/// A QM/MM system: atoms with per-replica coordinates plus their local multipoles.
#[derive(Debug, Clone, PartialEq)]
pub struct QmmmSystem {
    atoms: Vec<Atom>,
    multipoles: LocalMultipoleStore,
}

impl QmmmSystem {
    /// Creates a system, checking that every atom has a multipole entry and that all per-atom
    /// replica arrays agree in length.
    pub fn new(atoms: Vec<Atom>, multipoles: LocalMultipoleStore) -> Result<Self, SystemError> {
        if atoms.len() != multipoles.atom_count() {
            return Err(SystemError::AtomCountMismatch {
                atoms: atoms.len(),
                multipoles: multipoles.atom_count(),
            });
        }
        let system = Self { atoms, multipoles };
        system.replica_count()?;
        Ok(system)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn atom_mut(&mut self, index: usize) -> Option<&mut Atom> {
        self.atoms.get_mut(index)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn multipoles(&self) -> &LocalMultipoleStore {
        &self.multipoles
    }

    pub fn position(&self, atom: usize, replica: usize) -> Option<&Point3<f64>> {
        self.atoms.get(atom)?.position(replica)
    }

    /// The common replica count of all per-atom arrays.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError::ReplicaMismatch`] naming the first atom whose positions or
    /// multipoles disagree with the first atom's replica count.
    pub fn replica_count(&self) -> Result<usize, SystemError> {
        let Some(first) = self.atoms.first() else {
            return Ok(0);
        };
        let expected = first.replica_count();
        if expected == 0 {
            return Err(SystemError::NoReplicas);
        }
        for (index, atom) in self.atoms.iter().enumerate() {
            let positions = atom.replica_count();
            let multipoles = self.multipoles.replica_count(index);
            if positions != expected || multipoles != expected {
                return Err(SystemError::ReplicaMismatch {
                    atom: index,
                    positions,
                    multipoles,
                    expected,
                });
            }
        }
        Ok(expected)
    }

    /// Duplicates bead 0 of every atom (coordinates and multipole) to `count` replicas.
    pub fn expand_replicas(&mut self, count: usize) -> Result<(), SystemError> {
        if count == 0 {
            return Err(SystemError::NoReplicas);
        }
        for atom in &mut self.atoms {
            if let Some(first) = atom.positions.first() {
                atom.positions = replicate_per_bead(first, count);
            }
        }
        self.multipoles.expand_replicas(count);
        Ok(())
    }

    /// Replaces the coordinates of one replica. Frozen atoms keep their bead-0 position.
    pub fn set_replica_positions(
        &mut self,
        replica: usize,
        positions: &[Point3<f64>],
    ) -> Result<(), SystemError> {
        let count = self.replica_count()?;
        if replica >= count {
            return Err(SystemError::ReplicaOutOfRange { replica, count });
        }
        if positions.len() != self.atoms.len() {
            return Err(SystemError::CoordinateCountMismatch {
                expected: self.atoms.len(),
                found: positions.len(),
            });
        }
        for (atom, position) in self.atoms.iter_mut().zip(positions) {
            atom.positions[replica] = if atom.frozen {
                atom.positions[0]
            } else {
                *position
            };
        }
        Ok(())
    }

    pub fn count_in_region(&self, region: Region) -> usize {
        self.atoms.iter().filter(|a| a.region == region).count()
    }
}
