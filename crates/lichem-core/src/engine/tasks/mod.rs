//! Computational tasks run by the embedding workflow.
//!
//! [`electrostatics`] evaluates every `(atom, replica)` pair independently, in parallel when the
//! `parallel` feature is enabled, and assembles the results into a
//! [`GlobalElectrostaticField`](crate::engine::field::GlobalElectrostaticField).

pub mod electrostatics;
