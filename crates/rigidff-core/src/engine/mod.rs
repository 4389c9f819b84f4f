//! # Engine Module
//!
//! The stateful layer of the force field: compiling the declared topology
//! into fast caches, and turning body configurations into forces and
//! energy at every dynamics step.
//!
//! ## Architecture
//!
//! - **Public Entry Point** ([`field`]) - [`field::ForceField`] owns the
//!   parameter set and the molecular system, validates every argument
//!   eagerly, and drives the compile/evaluate cycle
//! - **Compilation** ([`realize`]) - The one-shot, idempotent topological
//!   pass: per-pair vdW mixing tables, body atom lists, shortest-path
//!   neighbor tuples, cross-body interaction lists, bonded-parameter
//!   binding
//! - **Dynamics** ([`dynamics`]) - The per-step kernel accumulating bonded
//!   and nonbonded energy and per-body spatial forces
//! - **Error Handling** ([`error`]) - The aggregate [`error::EngineError`]
//!
//! The engine takes no locks and spawns no tasks; the only shared mutable
//! state on the dynamics path is the pair of caller-owned accumulators
//! passed into [`field::ForceField::evaluate`].

pub(crate) mod dynamics;
pub mod error;
pub mod field;
pub(crate) mod realize;
