//! Core data models for the molecular side of the force field.
//!
//! This module contains the structures that describe what the molecule *is*:
//! atoms with their bond graph, rigid clusters with local frames, the rigid
//! bodies of the surrounding multibody system, and the
//! [`system::MolecularSystem`] arena that owns all of them and enforces the
//! structural invariants.

pub mod atom;
pub mod body;
pub mod cluster;
pub mod ids;
pub mod system;
pub mod topology;
