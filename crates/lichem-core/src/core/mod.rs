//! # Core Module
//!
//! Data models, multipole mathematics, simulation settings and file adapters for LICHEM's
//! electrostatic embedding.
//!
//! ## Architecture
//!
//! - **System Representation** ([`models`]) - Atoms, replicas, local multipoles and point-charge sets
//! - **Multipole Transformations** ([`multipoles`]) - Spherical harmonics, frame rotation and charge reduction
//! - **Simulation Settings** ([`simulation`]) - Wrappers, calculation modes, regions and validation
//! - **File I/O** ([`io`]) - Structure files, pole tables and embedding output
//! - **Units** ([`units`]) - Conversion constants between Ångström, bohr and Debye-based units

pub mod io;
pub mod models;
pub mod multipoles;
pub mod simulation;
pub mod units;
