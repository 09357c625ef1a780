//! # Core Models Module
//!
//! Data structures describing a QM/MM system for the electrostatics pipeline.
//!
//! ## Key Components
//!
//! - [`atom`] - Atoms with region, frozen flag and one position per replica
//! - [`multipole`] - Local-frame Cartesian multipoles and their frame definitions
//! - [`reduced`] - Spherical-harmonic multipole coefficients with trace corrections
//! - [`charges`] - Point-charge constellations and truncation reports
//! - [`system`] - The system of atoms plus the per-replica local multipole store

pub mod atom;
pub mod charges;
pub mod multipole;
pub mod reduced;
pub mod system;
