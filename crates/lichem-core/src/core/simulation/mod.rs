//! Simulation settings: level of theory, external engine wrappers, calculation mode, regions
//! and the resources they get.

pub mod beads;
pub mod mode;
pub mod settings;
pub mod threads;
pub mod wrappers;
