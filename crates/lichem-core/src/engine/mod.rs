//! # Engine Module
//!
//! Stateful orchestration of the multipole pipeline for one geometry snapshot.
//!
//! The engine holds the immutable run configuration, prepares the shared frame rotator and
//! charge reducer, and drives the per-atom, per-replica electrostatics task that produces a
//! [`field::GlobalElectrostaticField`].
//!
//! - **Configuration** ([`config`]) - site layout, radius, order, strictness and check thresholds
//! - **Context** ([`context`]) - system, config and prepared solvers shared by all workers
//! - **Field** ([`field`]) - per-atom states and the embedding-charge views handed to QM engines
//! - **Progress Monitoring** ([`progress`]) - callback-based progress events
//! - **Error Handling** ([`error`]) - [`error::ElectrostaticsError`]

pub mod config;
pub mod context;
pub mod error;
pub mod field;
pub mod progress;
pub mod tasks;
