use crate::core::units::BOHR_TO_ANGSTROM;
use nalgebra::{Point3, Vector3};
use std::fmt;

/// A single charge site of a point-charge constellation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointChargeSite {
    /// Offset from the atom centre in the global frame, in bohr.
    pub offset: Vector3<f64>,
    /// Charge in elementary charge units.
    pub charge: f64,
}

/// How far a reduced point-charge set falls short of the source moments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncationReport {
    /// Highest multipole order that was requested.
    pub requested_order: usize,
    /// Number of independent moment constraints the site layout can satisfy.
    pub layout_rank: usize,
    /// Number of moment constraints implied by the requested order.
    pub required_rank: usize,
    /// Largest absolute error of any reproduced spherical-harmonic coefficient.
    pub max_error: f64,
}

impl fmt::Display for TruncationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "order {} needs {} independent sites, layout provides {} (max coefficient error {:.3e})",
            self.requested_order, self.required_rank, self.layout_rank, self.max_error
        )
    }
}

/// The fixed, ordered set of point charges representing one atom's multipole field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointChargeSet {
    pub sites: Vec<PointChargeSite>,
    /// Present when the site layout cannot represent the requested order exactly.
    pub truncation: Option<TruncationReport>,
}

impl PointChargeSet {
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn total_charge(&self) -> f64 {
        self.sites.iter().map(|s| s.charge).sum()
    }

    /// `Σ q_i r_i` over the sites, in e·bohr.
    pub fn dipole(&self) -> Vector3<f64> {
        self.sites
            .iter()
            .fold(Vector3::zeros(), |acc, s| acc + s.offset * s.charge)
    }

    /// True unless a truncation report shows an error above `tolerance`.
    pub fn is_exact(&self, tolerance: f64) -> bool {
        self.truncation.is_none_or(|t| t.max_error <= tolerance)
    }

    /// Absolute site positions in Ångström for an atom centred at `center` (Ångström).
    pub fn placed_at(&self, center: &Point3<f64>) -> impl Iterator<Item = (Point3<f64>, f64)> + '_ {
        let center = *center;
        self.sites
            .iter()
            .map(move |s| (center + s.offset * BOHR_TO_ANGSTROM, s.charge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> PointChargeSet {
        PointChargeSet {
            sites: vec![
                PointChargeSite {
                    offset: Vector3::new(0.0, 0.0, 0.5),
                    charge: 0.5,
                },
                PointChargeSite {
                    offset: Vector3::new(0.0, 0.0, -0.5),
                    charge: -0.5,
                },
            ],
            truncation: None,
        }
    }

    #[test]
    fn dipole_and_total_charge() {
        let set = pair();
        assert_eq!(set.total_charge(), 0.0);
        assert!((set.dipole() - Vector3::new(0.0, 0.0, 0.5)).norm() < 1e-15);
        assert!(set.is_exact(0.0));
    }

    #[test]
    fn placed_at_converts_offsets_to_angstrom() {
        let set = pair();
        let placed: Vec<_> = set.placed_at(&Point3::new(1.0, 2.0, 3.0)).collect();
        assert_eq!(placed.len(), 2);
        assert!((placed[0].0.z - (3.0 + 0.5 * BOHR_TO_ANGSTROM)).abs() < 1e-14);
        assert_eq!(placed[1].1, -0.5);
    }

    #[test]
    fn truncation_within_tolerance_is_exact() {
        let mut set = pair();
        set.truncation = Some(TruncationReport {
            requested_order: 3,
            layout_rank: 6,
            required_rank: 16,
            max_error: 1e-14,
        });
        assert!(set.is_exact(1e-10));
        set.truncation.as_mut().unwrap().max_error = 0.1;
        assert!(!set.is_exact(1e-10));
    }
}
