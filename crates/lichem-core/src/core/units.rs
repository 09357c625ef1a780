//! Unit conventions at the data-model boundary.
//!
//! Positions handed in by the simulation driver are in Ångström. Multipoles and point-charge
//! offsets are carried in atomic units throughout the electrostatics pipeline (charge in `e`,
//! lengths in bohr). Conversions happen only on ingestion and on emission.

pub const BOHR_TO_ANGSTROM: f64 = 0.529_177_210_903; // CODATA 2018
pub const ANGSTROM_TO_BOHR: f64 = 1.0 / BOHR_TO_ANGSTROM;

pub const DEBYE_TO_AU: f64 = 0.393_430_238_5; // e·a0 per Debye

/// One Buckingham (Debye·Å) in e·a0².
pub const BUCKINGHAM_TO_AU: f64 = DEBYE_TO_AU * ANGSTROM_TO_BOHR;

/// One Debye·Å² in e·a0³.
pub const DEBYE_ANGSTROM2_TO_AU: f64 = DEBYE_TO_AU * ANGSTROM_TO_BOHR * ANGSTROM_TO_BOHR;
