//! # LICHEM Core Library
//!
//! Electrostatic embedding for QM/MM simulations with polarizable multipole force fields.
//! Each classical atom carries a Cartesian multipole (charge through octupole) in a local
//! molecular frame; the library rotates it into the global frame and reduces it to a small set
//! of point charges that a quantum chemistry engine can consume as external charges.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Stateless data models (`QmmmSystem`, multipoles, point-charge
//!   sets), the spherical-harmonic conversion, frame rotation and charge reduction, simulation
//!   settings, and file adapters.
//!
//! - **[`engine`]: The Logic Core.** Run configuration, the shared embedding context and the
//!   parallel per-atom, per-replica electrostatics task producing a `GlobalElectrostaticField`.
//!
//! - **[`workflows`]: The Public API.** System preparation and the end-to-end embedding run.

pub mod core;
pub mod engine;
pub mod workflows;
