/// Copies `seed` once per bead.
///
/// Used to expand bead-0 data (coordinates, multipoles, per-atom flags) to the replica count
/// of a path-integral or reaction-path calculation.
pub fn replicate_per_bead<T: Clone>(seed: &T, count: usize) -> Vec<T> {
    vec![seed.clone(); count]
}

/// Splits a flat, atom-major list of per-bead values into one `Vec` per atom.
///
/// Returns `None` when `values.len()` is not `atoms * beads`.
pub fn split_atom_major<T: Clone>(values: &[T], atoms: usize, beads: usize) -> Option<Vec<Vec<T>>> {
    if beads == 0 || values.len() != atoms * beads {
        return None;
    }
    Some(values.chunks(beads).map(<[T]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicate_produces_independent_copies() {
        let mut copies = replicate_per_bead(&vec![1, 2], 3);
        assert_eq!(copies.len(), 3);
        copies[0].push(3);
        assert_eq!(copies[1], vec![1, 2]);
        assert!(replicate_per_bead(&0.5, 0).is_empty());
    }

    #[test]
    fn split_atom_major_groups_beads_per_atom() {
        let flat = [10, 11, 12, 20, 21, 22];
        let split = split_atom_major(&flat, 2, 3).unwrap();
        assert_eq!(split, vec![vec![10, 11, 12], vec![20, 21, 22]]);
        assert!(split_atom_major(&flat, 4, 2).is_none());
        assert!(split_atom_major(&flat, 6, 0).is_none());
    }
}
