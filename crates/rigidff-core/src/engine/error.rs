use crate::core::forcefield::params::{ClassPair, ClassQuad, ClassTriple, ParameterError};
use crate::core::models::ids::{AtomId, BodyId};
use crate::core::models::system::StructureError;
use thiserror::Error;

/// Errors surfaced by the force-field engine.
///
/// Parameter-table and structural violations are wrapped from the core
/// layer; the engine adds compilation failures (a bonded term used by the
/// molecule has no parameters; an atom never reached a body) and
/// evaluation-time buffer validation.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(
        "no bond stretch parameters are defined for atom class pair {key} \
         (needed by bonded atoms {atom1} and {atom2})"
    )]
    MissingStretch {
        key: ClassPair,
        atom1: AtomId,
        atom2: AtomId,
    },

    #[error(
        "no bond bend parameters are defined for atom class triple {key} \
         (needed by the angle centered on atom {center})"
    )]
    MissingBend { key: ClassTriple, center: AtomId },

    #[error(
        "no bond torsion parameters are defined for atom class quad {key} \
         (needed by the dihedral starting at atom {atom1})"
    )]
    MissingTorsion { key: ClassQuad, atom1: AtomId },

    #[error("body {body} has atoms but no configuration was supplied (got {supplied} transforms)")]
    MissingBodyTransform { body: BodyId, supplied: usize },

    #[error("the force buffer holds {supplied} entries but body {body} needs a slot")]
    ShortForceBuffer { body: BodyId, supplied: usize },
}
