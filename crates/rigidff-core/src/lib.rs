//! # rigidff
//!
//! A classical molecular-mechanics force field for rigid-multibody dynamics
//! engines. Atoms are partitioned onto rigid bodies through a hierarchy of
//! clusters; at every dynamics step the library turns the current body
//! configurations into a total potential energy and one spatial force
//! (torque + linear force) per body, so that Newton–Euler integration of the
//! body states is consistent with the underlying atomic interactions.
//!
//! ## Architecture
//!
//! The library is split into two layers with a strict dependency direction:
//!
//! - **[`core`]: The Foundation.** Stateless data models (atoms, bonds,
//!   clusters, bodies, the [`core::models::system::MolecularSystem`] arena),
//!   immutable parameter catalogs, and pure energy/gradient kernels.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer that compiles the
//!   declared topology into per-atom and per-body caches (a one-time,
//!   idempotent "realize" pass) and accumulates forces and energy into
//!   caller-owned buffers at every step.
//!
//! The main entry point is [`engine::field::ForceField`], which owns a
//! parameter set and a molecular system, validates every argument eagerly,
//! and exposes the compile/evaluate cycle.

pub mod core;
pub mod engine;

pub use crate::core::forcefield::term::{EnergyTerm, SpatialForce};
pub use crate::engine::error::EngineError;
pub use crate::engine::field::ForceField;
