use nalgebra::{Matrix3, Vector3};

/// Storage order of the ten unique components of a symmetric rank-3 tensor.
const OCTUPOLE_SLOTS: [(usize, usize, usize); 10] = [
    (0, 0, 0),
    (0, 0, 1),
    (0, 0, 2),
    (0, 1, 1),
    (0, 1, 2),
    (0, 2, 2),
    (1, 1, 1),
    (1, 1, 2),
    (1, 2, 2),
    (2, 2, 2),
];

#[inline]
fn slot(i: usize, j: usize, k: usize) -> usize {
    let mut idx = [i, j, k];
    idx.sort_unstable();
    match (idx[0], idx[1], idx[2]) {
        (0, 0, 0) => 0,
        (0, 0, 1) => 1,
        (0, 0, 2) => 2,
        (0, 1, 1) => 3,
        (0, 1, 2) => 4,
        (0, 2, 2) => 5,
        (1, 1, 1) => 6,
        (1, 1, 2) => 7,
        (1, 2, 2) => 8,
        _ => 9,
    }
}

#[inline]
fn delta(a: usize, b: usize) -> f64 {
    if a == b { 1.0 } else { 0.0 }
}

/// A fully symmetric rank-3 Cartesian tensor, stored as its ten unique components.
///
/// Components are ordered `xxx, xxy, xxz, xyy, xyz, xzz, yyy, yyz, yzz, zzz`. Any index
/// permutation addresses the same slot, so the tensor is symmetric by construction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Octupole {
    components: [f64; 10],
}

impl Octupole {
    pub fn zeros() -> Self {
        Self::default()
    }

    pub fn from_components(components: [f64; 10]) -> Self {
        Self { components }
    }

    /// Builds the symmetric tensor from a full 3×3×3 array by averaging over index permutations.
    pub fn from_full(full: &[[[f64; 3]; 3]; 3]) -> Self {
        let mut components = [0.0; 10];
        for (n, &(i, j, k)) in OCTUPOLE_SLOTS.iter().enumerate() {
            components[n] = (full[i][j][k]
                + full[i][k][j]
                + full[j][i][k]
                + full[j][k][i]
                + full[k][i][j]
                + full[k][j][i])
                / 6.0;
        }
        Self { components }
    }

    pub fn components(&self) -> &[f64; 10] {
        &self.components
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.components[slot(i, j, k)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f64) {
        self.components[slot(i, j, k)] = value;
    }

    /// Contraction over one index pair, `t_a = O_abb`.
    pub fn trace_vector(&self) -> Vector3<f64> {
        Vector3::from_fn(|a, _| (0..3).map(|b| self.get(a, b, b)).sum())
    }

    /// Splits the tensor into its traceless part and the trace vector that was removed.
    ///
    /// `O'_abc = O_abc - (δ_ab t_c + δ_ac t_b + δ_bc t_a) / 5`, which contracts to zero over
    /// every index pair.
    pub fn detraced(&self) -> (Self, Vector3<f64>) {
        let trace = self.trace_vector();
        (self.add_isotropic(&(-trace)), trace)
    }

    /// Inverse of [`Octupole::detraced`]: adds back the isotropic part carrying `trace`.
    pub fn with_trace(&self, trace: &Vector3<f64>) -> Self {
        self.add_isotropic(trace)
    }

    fn add_isotropic(&self, trace: &Vector3<f64>) -> Self {
        let mut out = *self;
        for (n, &(i, j, k)) in OCTUPOLE_SLOTS.iter().enumerate() {
            out.components[n] += (delta(i, j) * trace[k]
                + delta(i, k) * trace[j]
                + delta(j, k) * trace[i])
                / 5.0;
        }
        out
    }

    /// Applies `O'_abc = R_ai R_bj R_ck O_ijk`.
    pub fn rotated(&self, rotation: &Matrix3<f64>) -> Self {
        let mut out = Self::zeros();
        for (n, &(a, b, c)) in OCTUPOLE_SLOTS.iter().enumerate() {
            let mut sum = 0.0;
            for i in 0..3 {
                for j in 0..3 {
                    for k in 0..3 {
                        sum += rotation[(a, i)]
                            * rotation[(b, j)]
                            * rotation[(c, k)]
                            * self.get(i, j, k);
                    }
                }
            }
            out.components[n] = sum;
        }
        out
    }

    /// Euclidean norm over the ten unique components.
    pub fn norm(&self) -> f64 {
        self.components.iter().map(|c| c * c).sum::<f64>().sqrt()
    }
}

/// Frame-free Cartesian moments of a charge distribution about the atom centre, in atomic units.
///
/// `quadrupole` and `octupole` are primitive moments (`Σ q r_a r_b`, `Σ q r_a r_b r_c`); they
/// may carry a trace on input and are detraced by the spherical-harmonic conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianMoments {
    pub charge: f64,
    pub dipole: Vector3<f64>,
    pub quadrupole: Matrix3<f64>,
    pub octupole: Octupole,
}

impl Default for CartesianMoments {
    fn default() -> Self {
        Self::monopole(0.0)
    }
}

impl CartesianMoments {
    pub fn monopole(charge: f64) -> Self {
        Self {
            charge,
            dipole: Vector3::zeros(),
            quadrupole: Matrix3::zeros(),
            octupole: Octupole::zeros(),
        }
    }

    /// Builds moments from an explicit set of point charges at offsets from the centre.
    pub fn from_point_charges<'a, I>(charges: I) -> Self
    where
        I: IntoIterator<Item = (&'a Vector3<f64>, f64)>,
    {
        let mut moments = Self::monopole(0.0);
        for (r, q) in charges {
            moments.charge += q;
            moments.dipole += r * q;
            moments.quadrupole += r * r.transpose() * q;
            for (n, &(i, j, k)) in OCTUPOLE_SLOTS.iter().enumerate() {
                moments.octupole.components[n] += q * r[i] * r[j] * r[k];
            }
        }
        moments
    }

    fn higher_order_components(&self) -> impl Iterator<Item = &f64> {
        self.dipole
            .iter()
            .chain(self.quadrupole.iter())
            .chain(self.octupole.components())
    }

    /// Whether any dipole, quadrupole or octupole component is nonzero (NaN counts).
    pub fn has_higher_orders(&self) -> bool {
        self.higher_order_components().any(|&c| c != 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.charge.is_finite() && self.higher_order_components().all(|c| c.is_finite())
    }
}

/// Reference atoms defining an atom's local multipole frame (z-then-x convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalFrame {
    /// Atom whose bond vector defines the local z axis.
    pub z_atom: Option<usize>,
    /// Atom whose bond vector, orthogonalized against z, defines the local x axis.
    pub x_atom: Option<usize>,
    /// Optional atom fixing the handedness of the local y axis.
    pub chiral_atom: Option<usize>,
}

impl LocalFrame {
    pub fn new(z_atom: usize, x_atom: usize) -> Self {
        Self {
            z_atom: Some(z_atom),
            x_atom: Some(x_atom),
            chiral_atom: None,
        }
    }

    pub fn with_chirality(mut self, chiral_atom: usize) -> Self {
        self.chiral_atom = Some(chiral_atom);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.z_atom.is_some() && self.x_atom.is_some()
    }

    /// Returns the `(z, x)` reference atoms when the frame is fully defined.
    pub fn axes(&self) -> Option<(usize, usize)> {
        Some((self.z_atom?, self.x_atom?))
    }

    pub fn referenced_atoms(&self) -> impl Iterator<Item = usize> {
        [self.z_atom, self.x_atom, self.chiral_atom].into_iter().flatten()
    }
}

/// An atom's Cartesian multipole in its local molecular frame, plus the frame definition.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CartesianMultipole {
    pub moments: CartesianMoments,
    pub frame: LocalFrame,
}

impl CartesianMultipole {
    pub fn new(moments: CartesianMoments, frame: LocalFrame) -> Self {
        Self { moments, frame }
    }

    /// A bare point charge without a local frame.
    pub fn point_charge(charge: f64) -> Self {
        Self {
            moments: CartesianMoments::monopole(charge),
            frame: LocalFrame::default(),
        }
    }

    pub fn charge(&self) -> f64 {
        self.moments.charge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;

    fn sample_octupole() -> Octupole {
        Octupole::from_components([0.3, -0.2, 0.7, 0.1, 0.05, -0.4, 0.25, 0.6, -0.15, 0.9])
    }

    #[test]
    fn permuted_indices_address_same_component() {
        let o = sample_octupole();
        assert_eq!(o.get(0, 1, 2), o.get(2, 1, 0));
        assert_eq!(o.get(1, 0, 2), o.get(2, 0, 1));
        assert_eq!(o.get(0, 0, 1), o.get(1, 0, 0));
    }

    #[test]
    fn from_full_symmetrizes() {
        let mut full = [[[0.0; 3]; 3]; 3];
        full[0][1][2] = 6.0;
        let o = Octupole::from_full(&full);
        assert!((o.get(2, 1, 0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn detraced_tensor_has_zero_trace_and_restores() {
        let o = sample_octupole();
        let (traceless, trace) = o.detraced();
        assert!(traceless.trace_vector().norm() < 1e-14);
        assert!((trace - o.trace_vector()).norm() < 1e-15);

        let restored = traceless.with_trace(&trace);
        for (a, b) in restored.components().iter().zip(o.components()) {
            assert!((a - b).abs() < 1e-14);
        }
    }

    #[test]
    fn rotation_matches_point_charge_moments() {
        let sites = [
            Vector3::new(0.3, -0.1, 0.4),
            Vector3::new(-0.2, 0.5, 0.1),
            Vector3::new(0.0, -0.3, -0.6),
        ];
        let charges = [0.4, -0.7, 0.2];
        let rot = Rotation3::from_euler_angles(0.3, -1.1, 2.0);

        let before = CartesianMoments::from_point_charges(sites.iter().zip(charges));
        let rotated_sites: Vec<_> = sites.iter().map(|s| rot * s).collect();
        let after = CartesianMoments::from_point_charges(rotated_sites.iter().zip(charges));

        let o = before.octupole.rotated(rot.matrix());
        for (a, b) in o.components().iter().zip(after.octupole.components()) {
            assert!((a - b).abs() < 1e-14);
        }
    }

    #[test]
    fn frame_completeness_requires_both_axes() {
        assert!(LocalFrame::new(1, 2).is_complete());
        let z_only = LocalFrame {
            z_atom: Some(1),
            ..Default::default()
        };
        assert!(!z_only.is_complete());
        assert_eq!(z_only.axes(), None);
        assert_eq!(
            LocalFrame::new(1, 2)
                .with_chirality(3)
                .referenced_atoms()
                .collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn point_charge_has_no_higher_orders() {
        let pole = CartesianMultipole::point_charge(-0.8);
        assert_eq!(pole.charge(), -0.8);
        assert!(!pole.moments.has_higher_orders());
        assert!(pole.moments.is_finite());
    }

    #[test]
    fn nan_moments_are_not_finite_and_count_as_higher_orders() {
        let mut moments = CartesianMoments::monopole(0.1);
        moments.octupole.set(0, 1, 2, f64::NAN);
        assert!(moments.has_higher_orders());
        assert!(!moments.is_finite());

        let mut charge = CartesianMoments::monopole(f64::INFINITY);
        assert!(!charge.is_finite());
        charge.charge = 0.0;
        charge.dipole.y = f64::NAN;
        assert!(!charge.is_finite());
    }
}
