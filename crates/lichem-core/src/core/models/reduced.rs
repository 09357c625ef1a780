use nalgebra::Vector3;

/// The reference frame a set of multipole coefficients is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceFrame {
    /// The atom's local molecular frame, defined by its reference atoms.
    Local,
    /// The global laboratory frame of the simulation.
    Global,
}

/// Isotropic (trace) parts removed from the quadrupole and octupole before decomposition.
///
/// These do not contribute to the potential outside the charge distribution, but they are kept
/// so that the Cartesian moments can be reconstructed exactly.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoreCorrection {
    /// `Σ_a Q_aa`, the spherically symmetric second moment.
    pub second_moment: f64,
    /// `t_a = Σ_b O_abb`, transforms as a vector under rotation.
    pub third_moment: Vector3<f64>,
}

/// Real spherical-harmonic multipole coefficients up to the octupole.
///
/// Coefficients use Racah-normalized real regular solid harmonics. Within each order the
/// components are `[Q_l0, Q_l1c, Q_l1s, ..., Q_llc, Q_lls]`, so the dipole is stored as
/// `[μz, μx, μy]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReducedMultipole {
    pub frame: ReferenceFrame,
    pub monopole: f64,
    pub dipole: [f64; 3],
    pub quadrupole: [f64; 5],
    pub octupole: [f64; 7],
    pub core: CoreCorrection,
}

impl ReducedMultipole {
    pub const MAX_ORDER: usize = 3;

    pub fn monopole_only(charge: f64, frame: ReferenceFrame) -> Self {
        Self {
            frame,
            monopole: charge,
            dipole: [0.0; 3],
            quadrupole: [0.0; 5],
            octupole: [0.0; 7],
            core: CoreCorrection::default(),
        }
    }

    /// The coefficients of angular-momentum order `l`, or `None` above the octupole.
    pub fn order(&self, l: usize) -> Option<&[f64]> {
        match l {
            0 => Some(std::slice::from_ref(&self.monopole)),
            1 => Some(&self.dipole),
            2 => Some(&self.quadrupole),
            3 => Some(&self.octupole),
            _ => None,
        }
    }

    /// Iterates `(l, coefficient)` pairs over all orders up to `max_order`.
    pub fn coefficients(&self, max_order: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        (0..=max_order.min(Self::MAX_ORDER))
            .flat_map(move |l| self.order(l).unwrap_or(&[]).iter().map(move |&c| (l, c)))
    }

    /// All sixteen coefficients in order `l = 0..=3`.
    pub fn to_array(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        for (slot, (_, c)) in out.iter_mut().zip(self.coefficients(Self::MAX_ORDER)) {
            *slot = c;
        }
        out
    }

    /// Inverse of [`ReducedMultipole::to_array`].
    pub fn from_array(frame: ReferenceFrame, values: &[f64; 16], core: CoreCorrection) -> Self {
        let mut out = Self::monopole_only(values[0], frame);
        out.dipole.copy_from_slice(&values[1..4]);
        out.quadrupole.copy_from_slice(&values[4..9]);
        out.octupole.copy_from_slice(&values[9..16]);
        out.core = core;
        out
    }

    /// The dipole as a Cartesian vector `(μx, μy, μz)`.
    pub fn dipole_vector(&self) -> Vector3<f64> {
        Vector3::new(self.dipole[1], self.dipole[2], self.dipole[0])
    }

    /// Largest absolute difference between matching coefficients of two multipoles.
    pub fn max_deviation(&self, other: &Self) -> f64 {
        self.coefficients(Self::MAX_ORDER)
            .zip(other.coefficients(Self::MAX_ORDER))
            .map(|((_, a), (_, b))| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReducedMultipole {
        ReducedMultipole {
            frame: ReferenceFrame::Local,
            monopole: 0.5,
            dipole: [0.1, 0.2, 0.3],
            quadrupole: [1.0, 2.0, 3.0, 4.0, 5.0],
            octupole: [6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0],
            core: CoreCorrection::default(),
        }
    }

    #[test]
    fn orders_have_2l_plus_1_components() {
        let m = sample();
        for l in 0..=3 {
            assert_eq!(m.order(l).unwrap().len(), 2 * l + 1);
        }
        assert!(m.order(4).is_none());
    }

    #[test]
    fn coefficients_respect_max_order() {
        let m = sample();
        assert_eq!(m.coefficients(0).count(), 1);
        assert_eq!(m.coefficients(2).count(), 9);
        assert_eq!(m.coefficients(7).count(), 16);
    }

    #[test]
    fn dipole_vector_reorders_components() {
        assert_eq!(sample().dipole_vector(), Vector3::new(0.2, 0.3, 0.1));
    }

    #[test]
    fn array_form_preserves_order() {
        let m = sample();
        let values = m.to_array();
        assert_eq!(values[0], 0.5);
        assert_eq!(values[3], 0.3);
        assert_eq!(values[15], 12.0);
        assert_eq!(
            ReducedMultipole::from_array(m.frame, &values, m.core),
            m
        );
    }

    #[test]
    fn max_deviation_finds_largest_component_gap() {
        let a = sample();
        let mut b = sample();
        b.octupole[4] += 0.25;
        b.dipole[0] -= 0.1;
        assert!((a.max_deviation(&b) - 0.25).abs() < 1e-15);
    }
}
