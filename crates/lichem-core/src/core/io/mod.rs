//! Readers and writers for the files that surround the electrostatics pipeline.
//!
//! Structures come from LICHEM XYZ files (one geometry, or one per bead for reaction paths),
//! local multipoles from CSV pole tables, and the results leave as plain embedding-charge
//! lists or global-multipole reports. All unit conversion to and from the internal atomic
//! units happens here.

pub mod embedding;
pub mod poles;
pub mod traits;
pub mod xyz;
