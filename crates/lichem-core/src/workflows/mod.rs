//! # Workflows Module
//!
//! High-level entry points that tie the [`core`](crate::core) models and the
//! [`engine`](crate::engine) together.
//!
//! - **Embedding Workflow** ([`embed`]) - assembles a validated multi-replica system from
//!   atoms, local multipoles and simulation settings, then computes the global point-charge
//!   embedding field for every replica.

pub mod embed;
