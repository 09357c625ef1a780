use super::harmonics::{cartesian_to_spherical, spherical_to_cartesian};
use crate::core::models::multipole::{CartesianMultipole, LocalFrame};
use crate::core::models::reduced::{ReducedMultipole, ReferenceFrame};
use crate::core::models::system::QmmmSystem;
use nalgebra::{Matrix3, Point3, Rotation3, Vector3};
use std::fmt;
use thiserror::Error;

/// What is wrong with the reference geometry of a local frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameDefect {
    #[error("reference atom {reference} does not exist")]
    MissingReference { reference: usize },
    #[error("atom {reference} has a non-finite position")]
    NonFinitePosition { reference: usize },
    #[error("reference atom {reference} coincides with the frame origin ({distance:.3e} Å)")]
    CoincidentReference { reference: usize, distance: f64 },
    #[error("z and x reference atoms are colinear with the frame origin (sin θ = {sine:.3e})")]
    ColinearReferences { sine: f64 },
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Degenerate local frame for atom {atom} in replica {replica}: {defect}")]
pub struct GeometryError {
    pub atom: usize,
    pub replica: usize,
    pub defect: FrameDefect,
}

/// Norms of the moments discarded for an atom whose frame does not name both axis atoms.
///
/// Such an atom contributes only its charge; the norms size what the embedding loses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DroppedMoments {
    pub dipole: f64,
    pub quadrupole: f64,
    pub octupole: f64,
}

impl DroppedMoments {
    /// The moments `to_global` drops for `multipole`, or `None` when nothing is lost.
    pub fn of(multipole: &CartesianMultipole) -> Option<Self> {
        if multipole.frame.axes().is_some() || !multipole.moments.has_higher_orders() {
            return None;
        }
        let m = &multipole.moments;
        Some(Self {
            dipole: m.dipole.norm(),
            quadrupole: m.quadrupole.norm(),
            octupole: m.octupole.norm(),
        })
    }
}

impl fmt::Display for DroppedMoments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "|μ| = {:.3e}, |Θ| = {:.3e}, |Ω| = {:.3e}",
            self.dipole, self.quadrupole, self.octupole
        )
    }
}

/// The placement of a local frame in the global frame for one atom and replica.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    /// Proper rotation whose columns are the local x, y and z axes in global coordinates.
    pub rotation: Rotation3<f64>,
    /// Whether the chirality atom lies on the negative local y side, which mirrors the
    /// local multipole through the xz plane before rotation.
    pub mirrored: bool,
}

/// Rotates local-frame multipoles into the global frame using the z-then-x convention.
///
/// The local z axis points from the atom to its z reference atom; the local x axis is the
/// direction to the x reference atom with its z component removed; y completes a right-handed
/// frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRotator {
    min_separation: f64,
    min_sine: f64,
}

impl Default for FrameRotator {
    fn default() -> Self {
        Self::new(1e-6, 1e-6)
    }
}

impl FrameRotator {
    /// `min_separation` (Å) rejects reference atoms on top of the origin; `min_sine` rejects
    /// z and x bond vectors closer to parallel than `asin(min_sine)`.
    pub fn new(min_separation: f64, min_sine: f64) -> Self {
        Self {
            min_separation,
            min_sine,
        }
    }

    /// Builds the orientation of `frame` for `atom` in `replica`, or `None` when the frame
    /// does not name both axis atoms.
    pub fn orientation(
        &self,
        system: &QmmmSystem,
        atom: usize,
        replica: usize,
        frame: &LocalFrame,
    ) -> Result<Option<Orientation>, GeometryError> {
        let Some((z_atom, x_atom)) = frame.axes() else {
            return Ok(None);
        };
        let fail = |defect: FrameDefect| GeometryError {
            atom,
            replica,
            defect,
        };
        let position = |index: usize| checked_position(system, atom, replica, index);

        let origin = position(atom)?;
        let bond = |reference: usize| -> Result<Vector3<f64>, GeometryError> {
            let v = position(reference)? - origin;
            let distance = v.norm();
            // Negated so that a NaN distance or threshold fails.
            if !(distance >= self.min_separation) {
                return Err(fail(FrameDefect::CoincidentReference {
                    reference,
                    distance,
                }));
            }
            Ok(v / distance)
        };

        let z = bond(z_atom)?;
        let x_dir = bond(x_atom)?;
        let x_perp = x_dir - z * z.dot(&x_dir);
        let sine = x_perp.norm();
        if !(sine >= self.min_sine) {
            return Err(fail(FrameDefect::ColinearReferences { sine }));
        }
        let x = x_perp / sine;
        let y = z.cross(&x);

        let mirrored = match frame.chiral_atom {
            Some(chiral) => (position(chiral)? - origin).dot(&y) < 0.0,
            None => false,
        };

        let rotation = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[x, y, z]));
        Ok(Some(Orientation { rotation, mirrored }))
    }

    /// Expresses a local-frame multipole in the global frame.
    pub fn rotate(&self, local: &ReducedMultipole, orientation: &Orientation) -> ReducedMultipole {
        let source = if orientation.mirrored {
            mirrored_through_xz(local)
        } else {
            *local
        };
        let r = orientation.rotation.matrix();
        let mut moments = spherical_to_cartesian(&source);
        moments.dipole = r * moments.dipole;
        moments.quadrupole = r * moments.quadrupole * r.transpose();
        moments.octupole = moments.octupole.rotated(r);
        cartesian_to_spherical(&moments, ReferenceFrame::Global)
    }

    /// Converts one atom's local multipole for `replica` to global spherical harmonics.
    ///
    /// Atoms without a complete frame contribute their charge alone; any higher moments are
    /// dropped and can be sized with [`DroppedMoments::of`].
    pub fn to_global(
        &self,
        system: &QmmmSystem,
        atom: usize,
        replica: usize,
        multipole: &CartesianMultipole,
    ) -> Result<ReducedMultipole, GeometryError> {
        match self.orientation(system, atom, replica, &multipole.frame)? {
            Some(orientation) => {
                let local = cartesian_to_spherical(&multipole.moments, ReferenceFrame::Local);
                Ok(self.rotate(&local, &orientation))
            }
            None => {
                checked_position(system, atom, replica, atom)?;
                Ok(ReducedMultipole::monopole_only(
                    multipole.charge(),
                    ReferenceFrame::Global,
                ))
            }
        }
    }
}

/// Position of `index` in `replica`, rejected when absent or not finite.
fn checked_position(
    system: &QmmmSystem,
    atom: usize,
    replica: usize,
    index: usize,
) -> Result<Point3<f64>, GeometryError> {
    let fail = |defect: FrameDefect| GeometryError {
        atom,
        replica,
        defect,
    };
    let p = system
        .position(index, replica)
        .copied()
        .ok_or_else(|| fail(FrameDefect::MissingReference { reference: index }))?;
    if p.coords.iter().all(|c| c.is_finite()) {
        Ok(p)
    } else {
        Err(fail(FrameDefect::NonFinitePosition { reference: index }))
    }
}

/// Reflects `y → -y`: every sine-type coefficient changes sign.
fn mirrored_through_xz(local: &ReducedMultipole) -> ReducedMultipole {
    let mut out = *local;
    out.dipole[2] = -out.dipole[2];
    for i in [2, 4] {
        out.quadrupole[i] = -out.quadrupole[i];
    }
    for i in [2, 4, 6] {
        out.octupole[i] = -out.octupole[i];
    }
    out.core.third_moment.y = -out.core.third_moment.y;
    out
}
