//! The multipole transformation stages.
//!
//! A local Cartesian multipole is converted to real spherical harmonics ([`harmonics`]),
//! rotated into the global frame from the instantaneous reference-atom geometry ([`frame`]),
//! and reduced to a fixed constellation of point charges ([`reduction`]) laid out on one of
//! the polyhedra in [`layout`]. Each stage is a pure function of its inputs.

pub mod frame;
pub mod harmonics;
pub mod layout;
pub mod reduction;
