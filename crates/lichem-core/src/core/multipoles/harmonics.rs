use crate::core::models::multipole::{CartesianMoments, Octupole};
use crate::core::models::reduced::{CoreCorrection, ReducedMultipole, ReferenceFrame};
use nalgebra::{Matrix3, Vector3};

const SQRT_3: f64 = 1.732_050_807_568_877_2;
const SQRT_15: f64 = 3.872_983_346_207_417;
const SQRT_3_8: f64 = 0.612_372_435_695_794_5;
const SQRT_5_8: f64 = 0.790_569_415_042_094_8;

/// Racah-normalized real regular solid harmonics `R_lm(r)` for `l = 0..=3`.
///
/// The ordering matches [`ReducedMultipole::to_array`], so the multipole of a set of point
/// charges is `Σ q_i R(r_i)`.
pub fn solid_harmonics(r: &Vector3<f64>) -> [f64; 16] {
    let (x, y, z) = (r.x, r.y, r.z);
    let r2 = r.norm_squared();
    [
        1.0,
        z,
        x,
        y,
        (3.0 * z * z - r2) / 2.0,
        SQRT_3 * x * z,
        SQRT_3 * y * z,
        SQRT_3 / 2.0 * (x * x - y * y),
        SQRT_3 * x * y,
        (5.0 * z * z * z - 3.0 * z * r2) / 2.0,
        SQRT_3_8 * x * (5.0 * z * z - r2),
        SQRT_3_8 * y * (5.0 * z * z - r2),
        SQRT_15 / 2.0 * z * (x * x - y * y),
        SQRT_15 * x * y * z,
        SQRT_5_8 * (x * x * x - 3.0 * x * y * y),
        SQRT_5_8 * (3.0 * x * x * y - y * y * y),
    ]
}

/// Angular-momentum order of each entry of a [`solid_harmonics`] array.
pub const HARMONIC_ORDERS: [usize; 16] = [0, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3];

/// Number of coefficients of orders `0..=max_order`.
pub fn coefficient_count(max_order: usize) -> usize {
    let l = max_order.min(ReducedMultipole::MAX_ORDER) + 1;
    l * l
}

fn detrace_quadrupole(quadrupole: &Matrix3<f64>) -> (Matrix3<f64>, f64) {
    let symmetric = (quadrupole + quadrupole.transpose()) * 0.5;
    let trace = symmetric.trace();
    (symmetric - Matrix3::identity() * (trace / 3.0), trace)
}

/// Converts Cartesian moments to real spherical-harmonic coefficients.
///
/// The quadrupole and octupole are detraced first; the removed traces are kept in the
/// returned [`CoreCorrection`] so [`spherical_to_cartesian`] can restore them. The monopole and
/// dipole pass through unchanged.
pub fn cartesian_to_spherical(moments: &CartesianMoments, frame: ReferenceFrame) -> ReducedMultipole {
    let (q, second_moment) = detrace_quadrupole(&moments.quadrupole);
    let (o, third_moment) = moments.octupole.detraced();
    let mu = &moments.dipole;

    ReducedMultipole {
        frame,
        monopole: moments.charge,
        dipole: [mu.z, mu.x, mu.y],
        quadrupole: [
            1.5 * q[(2, 2)],
            SQRT_3 * q[(0, 2)],
            SQRT_3 * q[(1, 2)],
            SQRT_3 / 2.0 * (q[(0, 0)] - q[(1, 1)]),
            SQRT_3 * q[(0, 1)],
        ],
        octupole: [
            2.5 * o.get(2, 2, 2),
            5.0 * SQRT_3_8 * o.get(0, 2, 2),
            5.0 * SQRT_3_8 * o.get(1, 2, 2),
            SQRT_15 / 2.0 * (o.get(0, 0, 2) - o.get(1, 1, 2)),
            SQRT_15 * o.get(0, 1, 2),
            SQRT_5_8 * (o.get(0, 0, 0) - 3.0 * o.get(0, 1, 1)),
            SQRT_5_8 * (3.0 * o.get(0, 0, 1) - o.get(1, 1, 1)),
        ],
        core: CoreCorrection {
            second_moment,
            third_moment,
        },
    }
}

/// Rebuilds the traceless Cartesian quadrupole from its five spherical components.
fn quadrupole_from_spherical(c: &[f64; 5]) -> Matrix3<f64> {
    let zz = 2.0 * c[0] / 3.0;
    let xz = c[1] / SQRT_3;
    let yz = c[2] / SQRT_3;
    let xx = -c[0] / 3.0 + c[3] / SQRT_3;
    let yy = -c[0] / 3.0 - c[3] / SQRT_3;
    let xy = c[4] / SQRT_3;
    Matrix3::new(xx, xy, xz, xy, yy, yz, xz, yz, zz)
}

/// Rebuilds the traceless Cartesian octupole from its seven spherical components.
fn octupole_from_spherical(c: &[f64; 7]) -> Octupole {
    let zzz = 2.0 * c[0] / 5.0;
    let xzz = c[1] / (5.0 * SQRT_3_8);
    let yzz = c[2] / (5.0 * SQRT_3_8);
    let xxz = (-zzz + 2.0 * c[3] / SQRT_15) / 2.0;
    let yyz = (-zzz - 2.0 * c[3] / SQRT_15) / 2.0;
    let xyz = c[4] / SQRT_15;
    let a = c[5] / SQRT_5_8;
    let b = c[6] / SQRT_5_8;
    let xxx = (-3.0 * xzz + a) / 4.0;
    let xyy = (-xzz - a) / 4.0;
    let xxy = (b - yzz) / 4.0;
    let yyy = (-3.0 * yzz - b) / 4.0;
    Octupole::from_components([xxx, xxy, xxz, xyy, xyz, xzz, yyy, yyz, yzz, zzz])
}

/// Inverse of [`cartesian_to_spherical`], including the stored trace corrections.
pub fn spherical_to_cartesian(reduced: &ReducedMultipole) -> CartesianMoments {
    let core = &reduced.core;
    let quadrupole = quadrupole_from_spherical(&reduced.quadrupole)
        + Matrix3::identity() * (core.second_moment / 3.0);
    let octupole = octupole_from_spherical(&reduced.octupole).with_trace(&core.third_moment);
    CartesianMoments {
        charge: reduced.monopole,
        dipole: reduced.dipole_vector(),
        quadrupole,
        octupole,
    }
}
