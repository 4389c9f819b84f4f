use super::ids::{AtomId, BodyId, ClusterId};
use nalgebra::{Isometry3, Point3};
use std::collections::{BTreeMap, BTreeSet};

/// A named rigid grouping of atoms and child clusters with its own frame.
///
/// Clusters form the bridge between the declared molecule and the rigid
/// bodies of the multibody system: atoms are placed in clusters at fixed
/// stations, clusters are placed in other clusters with fixed transforms,
/// and a top-level cluster is finally attached to a body. All containment
/// is by id into the owning arena; back-references to parents are a plain
/// id set so the graph carries no ownership cycles.
///
/// The structural operations live on
/// [`MolecularSystem`](super::system::MolecularSystem), which can reach
/// every cluster involved in a placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    pub name: String,

    /// Atoms placed directly in this cluster, station in this cluster's
    /// frame.
    pub direct_atoms: BTreeMap<AtomId, Point3<f64>>,
    /// Child clusters placed directly in this cluster, with the transform
    /// from this cluster's frame to the child's frame.
    pub direct_clusters: BTreeMap<ClusterId, Isometry3<f64>>,
    /// Every atom contained transitively, with its station re-expressed in
    /// this cluster's frame. Kept up to date as atoms and clusters are
    /// placed.
    pub all_atoms: BTreeMap<AtomId, Point3<f64>>,
    /// Ids of the clusters this cluster has been placed in.
    pub parents: BTreeSet<ClusterId>,

    /// Set once this cluster (or an ancestor) is attached to a body.
    pub body: Option<BodyId>,
    /// This cluster's placement fixed in its body's frame.
    pub placement_b: Isometry3<f64>,
}

impl Cluster {
    pub fn new(id: ClusterId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            direct_atoms: BTreeMap::new(),
            direct_clusters: BTreeMap::new(),
            all_atoms: BTreeMap::new(),
            parents: BTreeSet::new(),
            body: None,
            placement_b: Isometry3::identity(),
        }
    }

    /// A cluster with no parents; only these may receive new placements.
    pub fn is_top_level(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_attached_to_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn contains_atom(&self, atom: AtomId) -> bool {
        self.all_atoms.contains_key(&atom)
    }
}
